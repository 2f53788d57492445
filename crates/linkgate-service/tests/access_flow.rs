//! End-to-end verification flows over in-memory stores.

mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Duration;

use common::{CLIENT_IP, Harness, start};
use linkgate_core::error::ErrorKind;
use linkgate_entity::permission::PasswordRecord;
use linkgate_service::ReasonCode;
use linkgate_service::access::IpRestrictionUpdate;

#[tokio::test]
async fn test_wrong_password_locks_after_five_attempts() {
    let h = Harness::new();
    h.share("R1", Some("Secret123!")).await;

    let first = h.verify("R1", Some("wrong")).await;
    assert!(!first.success);
    assert_eq!(first.reason_code, ReasonCode::InvalidPassword);
    assert_eq!(first.remaining_attempts, Some(4));
    assert_eq!(first.is_locked, None);

    for expected in [3, 2, 1] {
        let r = h.verify("R1", Some("wrong")).await;
        assert_eq!(r.remaining_attempts, Some(expected));
    }

    let fifth = h.verify("R1", Some("wrong")).await;
    assert!(!fifth.success);
    assert_eq!(fifth.reason_code, ReasonCode::InvalidPassword);
    assert_eq!(fifth.is_locked, Some(true));
    assert_eq!(fifth.remaining_attempts, Some(0));
    assert_eq!(fifth.lock_expiry, Some(start() + Duration::minutes(30)));

    let sixth = h.verify("R1", Some("Secret123!")).await;
    assert!(!sixth.success);
    assert_eq!(sixth.reason_code, ReasonCode::Locked);
    assert_eq!(sixth.remaining_attempts, Some(0));
    assert_eq!(sixth.lock_expiry, Some(start() + Duration::minutes(30)));
    assert_eq!(sixth.http_status(), 403);
}

#[tokio::test]
async fn test_lock_lapses_and_count_restarts() {
    let h = Harness::new();
    h.share("R1", Some("Secret123!")).await;
    for _ in 0..5 {
        h.verify("R1", Some("wrong")).await;
    }

    h.clock.advance(Duration::minutes(29));
    assert_eq!(h.verify("R1", Some("Secret123!")).await.reason_code, ReasonCode::Locked);

    h.clock.advance(Duration::minutes(1));
    let granted = h.verify("R1", Some("Secret123!")).await;
    assert!(granted.success);
    assert_eq!(granted.reason_code, ReasonCode::Granted);
    let summary = granted.resource_summary.unwrap();
    assert_eq!(summary.resource_id, "R1");
    assert_eq!(summary.expiration_date, start() + Duration::days(5));

    let next = h.verify("R1", Some("wrong")).await;
    assert_eq!(next.remaining_attempts, Some(4));
}

#[tokio::test]
async fn test_lapsed_lock_then_failure_counts_from_one() {
    let h = Harness::new();
    h.share("R1", Some("pw")).await;
    for _ in 0..5 {
        h.verify("R1", Some("wrong")).await;
    }
    h.clock.advance(Duration::minutes(31));

    let r = h.verify("R1", Some("wrong")).await;
    assert_eq!(r.reason_code, ReasonCode::InvalidPassword);
    assert_eq!(r.remaining_attempts, Some(4));
    let record = h.services.tracker.find("R1", CLIENT_IP).await.unwrap().unwrap();
    assert_eq!(record.attempt_count, 1);
    assert!(!record.is_locked);
}

#[tokio::test]
async fn test_success_resets_failures() {
    let h = Harness::new();
    h.share("R1", Some("pw")).await;
    h.verify("R1", Some("a")).await;
    h.verify("R1", Some("b")).await;

    assert!(h.verify("R1", Some("pw")).await.success);
    assert!(h.services.tracker.find("R1", CLIENT_IP).await.unwrap().is_none());
    assert_eq!(h.verify("R1", Some("c")).await.remaining_attempts, Some(4));
}

#[tokio::test]
async fn test_requesters_are_throttled_separately() {
    let h = Harness::new();
    h.share("R1", Some("pw")).await;
    for _ in 0..5 {
        h.verify_from("R1", Some("wrong"), "5.5.5.5").await;
    }
    assert_eq!(
        h.verify_from("R1", Some("pw"), "5.5.5.5").await.reason_code,
        ReasonCode::Locked
    );
    assert!(h.verify_from("R1", Some("pw"), "6.6.6.6").await.success);
}

#[tokio::test]
async fn test_missing_password() {
    let h = Harness::new();
    h.share("R1", Some("pw")).await;

    let none = h.verify("R1", None).await;
    assert_eq!(none.reason_code, ReasonCode::PasswordRequired);
    assert_eq!(none.remaining_attempts, Some(5));
    assert_eq!(none.http_status(), 401);

    h.verify("R1", Some("wrong")).await;
    h.verify("R1", Some("wrong")).await;
    let empty = h.verify("R1", Some("")).await;
    assert_eq!(empty.reason_code, ReasonCode::PasswordRequired);
    assert_eq!(empty.remaining_attempts, Some(3));

    // Asking without a password costs nothing.
    let record = h.services.tracker.find("R1", CLIENT_IP).await.unwrap().unwrap();
    assert_eq!(record.attempt_count, 2);
}

#[tokio::test]
async fn test_unprotected_share_is_granted_without_bookkeeping() {
    let h = Harness::new();
    h.share("OPEN", None).await;

    let r = h.verify("OPEN", Some("ignored")).await;
    assert!(r.success);
    assert_eq!(r.resource_summary.unwrap().resource_id, "OPEN");
    assert!(h.services.tracker.find("OPEN", CLIENT_IP).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_resource() {
    let h = Harness::new();
    let r = h.verify("nope", Some("pw")).await;
    assert_eq!(r.reason_code, ReasonCode::ResourceNotFound);
    assert_eq!(r.http_status(), 404);
}

#[tokio::test]
async fn test_missing_permission() {
    let h = Harness::new();
    h.services
        .stores
        .resources
        .create(&linkgate_entity::resource::ShareResource {
            id: "ORPHAN".to_string(),
            owner_id: "owner".to_string(),
            created_at: start(),
            expiration_date: start() + Duration::days(1),
            is_password_protected: true,
            permission_id: "ghost".to_string(),
        })
        .await
        .unwrap();

    let r = h.verify("ORPHAN", Some("pw")).await;
    assert_eq!(r.reason_code, ReasonCode::PermissionNotFound);
}

#[tokio::test]
async fn test_expired_link_is_not_penalized() {
    let h = Harness::new();
    h.share("R1", Some("pw")).await;

    h.clock.set(start() + Duration::days(5));
    assert!(h.verify("R1", Some("pw")).await.success);

    h.clock.advance(Duration::seconds(1));
    let r = h.verify("R1", Some("wrong")).await;
    assert_eq!(r.reason_code, ReasonCode::Expired);
    assert_eq!(r.http_status(), 403);
    assert!(h.services.tracker.find("R1", CLIENT_IP).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ip_allow_list() {
    let h = Harness::new();
    let (_, permission) = h.share("R1", Some("pw")).await;
    h.services
        .protection
        .update_ip_restriction(
            &permission.id,
            IpRestrictionUpdate {
                enabled: true,
                allowed_rules: vec!["192.168.1.0/24".to_string(), "10.20.*.*".to_string()],
            },
        )
        .await
        .unwrap();

    let denied = h.verify_from("R1", Some("pw"), "10.0.0.1").await;
    assert_eq!(denied.reason_code, ReasonCode::IpNotAllowed);
    assert_eq!(denied.remaining_attempts, Some(5));
    assert!(h.services.tracker.find("R1", "10.0.0.1").await.unwrap().is_none());

    assert!(h.verify_from("R1", Some("pw"), "192.168.1.42").await.success);
    assert!(h.verify_from("R1", Some("pw"), "10.20.30.40").await.success);
    assert!(h.verify_from("R1", Some("pw"), "::ffff:192.168.1.9").await.success);

    h.services
        .protection
        .update_ip_restriction(
            &permission.id,
            IpRestrictionUpdate {
                enabled: false,
                allowed_rules: vec!["192.168.1.0/24".to_string()],
            },
        )
        .await
        .unwrap();
    assert!(h.verify_from("R1", Some("pw"), "10.0.0.1").await.success);
}

#[tokio::test]
async fn test_ip_check_applies_to_unprotected_shares() {
    let h = Harness::new();
    let (_, permission) = h.share("OPEN", None).await;
    h.services
        .protection
        .update_ip_restriction(
            &permission.id,
            IpRestrictionUpdate {
                enabled: true,
                allowed_rules: vec!["203.0.113.7".to_string()],
            },
        )
        .await
        .unwrap();

    assert_eq!(
        h.verify_from("OPEN", None, "203.0.113.8").await.reason_code,
        ReasonCode::IpNotAllowed
    );
    assert!(h.verify_from("OPEN", None, "203.0.113.7").await.success);
}

#[tokio::test]
async fn test_legacy_password_is_upgraded() {
    let h = Harness::new();
    let permission = h
        .share_with_record(
            "LEGACY",
            PasswordRecord::Legacy {
                encoded: BASE64.encode("secret"),
            },
        )
        .await;

    assert!(!h.verify("LEGACY", Some("Secret")).await.success);
    assert!(h.verify("LEGACY", Some("secret")).await.success);
    h.services.evaluator.drain_upgrades().await;

    let upgraded = h.permission(&permission.id).await;
    assert!(matches!(upgraded.password, PasswordRecord::Salted { .. }));

    assert!(h.verify("LEGACY", Some("secret")).await.success);
    assert!(!h.verify("LEGACY", Some("c2VjcmV0")).await.success);
}

#[tokio::test]
async fn test_pending_upgrade_does_not_undo_password_change() {
    let h = Harness::new();
    let permission = h
        .share_with_record(
            "LEGACY",
            PasswordRecord::Legacy {
                encoded: BASE64.encode("secret"),
            },
        )
        .await;

    assert!(h.verify("LEGACY", Some("secret")).await.success);
    let changed = h
        .services
        .protection
        .change_password("LEGACY", Some("brand-new"))
        .await
        .unwrap();
    h.services.evaluator.drain_upgrades().await;

    let stored = h.permission(&permission.id).await;
    assert_eq!(stored.password, changed.password_record());
    assert!(!h.verify("LEGACY", Some("secret")).await.success);
    assert!(h.verify("LEGACY", Some("brand-new")).await.success);
}

#[tokio::test]
async fn test_protected_resource_without_password_is_an_error() {
    let h = Harness::new();
    h.share_with_record("BROKEN", PasswordRecord::Unprotected).await;

    let err = h
        .services
        .evaluator
        .verify_access("BROKEN", Some("pw"), CLIENT_IP)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedRecord);
}

#[tokio::test]
async fn test_changed_password_takes_effect() {
    let h = Harness::new();
    h.share("R1", Some("old")).await;
    h.services
        .protection
        .change_password("R1", Some("new"))
        .await
        .unwrap();

    assert!(!h.verify("R1", Some("old")).await.success);
    assert!(h.verify("R1", Some("new")).await.success);

    h.services.protection.change_password("R1", None).await.unwrap();
    assert!(h.verify("R1", None).await.success);
}

#[tokio::test]
async fn test_result_serializes_camel_case() {
    let h = Harness::new();
    h.share("R1", Some("Secret123!")).await;
    let r = h.verify("R1", Some("wrong")).await;
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["reasonCode"], "invalid_password");
    assert_eq!(json["remainingAttempts"], 4);
}

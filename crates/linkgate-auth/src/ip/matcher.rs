//! Allow-list evaluation.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, warn};

use linkgate_entity::permission::IpRestriction;

use super::rule::{IpRule, canonical};

/// How the allow-list step of a verification came out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum IpDecision {
    /// No restriction, a disabled one, or an empty rule list.
    Unrestricted,
    /// The requester matched the given rule.
    Matched {
        /// The first matching rule.
        rule: String,
    },
    /// The restriction is enforced and no rule matched.
    NotMatched,
    /// The restriction could not be evaluated and the request was let
    /// through anyway.
    FailedOpen {
        /// What went wrong.
        reason: String,
    },
}

impl IpDecision {
    /// Short name of the decision, without the rule or reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unrestricted => "unrestricted",
            Self::Matched { .. } => "matched",
            Self::NotMatched => "not_matched",
            Self::FailedOpen { .. } => "failed_open",
        }
    }

    /// Whether the request may proceed past the allow-list step.
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::NotMatched)
    }
}

/// Result of cleaning up a submitted rule list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRules {
    /// Rules to store, in submission order, without duplicates.
    pub rules: Vec<String>,
    /// Rule strings that failed to parse.
    pub rejected: Vec<String>,
    /// Valid rules dropped because the list was over the cap.
    pub truncated: usize,
}

/// A stored rule list, parsed once for repeated matching.
///
/// Rules that no longer parse are skipped with a warning.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    rules: Vec<IpRule>,
}

impl AllowList {
    /// Parse every rule of a stored list.
    pub fn parse(rules: &[String]) -> Self {
        let rules = rules
            .iter()
            .filter_map(|raw| match IpRule::parse(raw) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(rule = %raw, error = %e, "Skipping unparseable stored IP rule");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// The first rule `requester` matches.
    pub fn first_match(&self, requester: &str) -> Option<&IpRule> {
        let requester = requester.trim();
        let addr = requester.parse::<IpAddr>().ok().map(canonical);
        self.rules.iter().find(|rule| rule.matches(requester, addr))
    }
}

/// Parsed allow-lists keyed by permission id.
///
/// A list is reparsed only when the stored rules differ from the ones it
/// was built from.
#[derive(Debug, Default)]
pub struct AllowListCache {
    entries: DashMap<String, CachedList>,
}

#[derive(Debug)]
struct CachedList {
    source: Vec<String>,
    list: Arc<AllowList>,
}

impl AllowListCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate a stored restriction for `requester`.
    pub fn evaluate(&self, requester: &str, restriction: Option<&IpRestriction>) -> IpDecision {
        let Some(restriction) = restriction.filter(|r| r.is_enforced()) else {
            return IpDecision::Unrestricted;
        };

        match self.list_for(restriction).first_match(requester) {
            Some(rule) => IpDecision::Matched {
                rule: rule.as_str().to_string(),
            },
            None => IpDecision::NotMatched,
        }
    }

    /// Number of cached lists.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn list_for(&self, restriction: &IpRestriction) -> Arc<AllowList> {
        if let Some(cached) = self.entries.get(&restriction.permission_id) {
            if cached.source == restriction.allowed_rules {
                return Arc::clone(&cached.list);
            }
        }

        let list = Arc::new(AllowList::parse(&restriction.allowed_rules));
        self.entries.insert(
            restriction.permission_id.clone(),
            CachedList {
                source: restriction.allowed_rules.clone(),
                list: Arc::clone(&list),
            },
        );
        list
    }
}

/// One-shot allow-list helpers.
pub struct IpMatcher;

impl IpMatcher {
    /// Whether `requester` may pass an allow-list of `rules`.
    ///
    /// An empty list allows everyone. Otherwise rules are tried in order
    /// and the first match wins; a rule that no longer parses is skipped.
    pub fn is_allowed(requester: &str, rules: &[String]) -> bool {
        rules.is_empty() || Self::first_match(requester, rules).is_some()
    }

    /// The first rule in `rules` that `requester` matches.
    pub fn first_match(requester: &str, rules: &[String]) -> Option<String> {
        AllowList::parse(rules)
            .first_match(requester)
            .map(|rule| rule.as_str().to_string())
    }

    /// Trim, validate, de-duplicate, and cap a submitted rule list.
    ///
    /// Blank entries are dropped. Malformed entries are dropped and
    /// reported in [`NormalizedRules::rejected`]. At most `max_rules`
    /// rules are kept, the earliest first.
    pub fn normalize(rules: &[String], max_rules: usize) -> NormalizedRules {
        let mut seen = HashSet::new();
        let mut out = NormalizedRules::default();

        for raw in rules {
            if raw.trim().is_empty() {
                continue;
            }
            match IpRule::parse(raw) {
                Ok(rule) => {
                    let text = rule.as_str().to_string();
                    if !seen.insert(text.clone()) {
                        continue;
                    }
                    if out.rules.len() < max_rules {
                        out.rules.push(text);
                    } else {
                        out.truncated += 1;
                    }
                }
                Err(e) => {
                    debug!(rule = %raw.trim(), error = %e, "Dropping malformed IP rule");
                    out.rejected.push(raw.trim().to_string());
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rules(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn restriction(enabled: bool, list: &[&str]) -> IpRestriction {
        IpRestriction {
            permission_id: "P1".to_string(),
            enabled,
            allowed_rules: rules(list),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cidr_allows_member() {
        assert!(IpMatcher::is_allowed("192.168.1.42", &rules(&["192.168.1.0/24"])));
        assert!(!IpMatcher::is_allowed("10.0.0.5", &rules(&["192.168.1.0/24"])));
    }

    #[test]
    fn test_first_match_wins() {
        let list = rules(&["10.0.0.0/8", "10.0.0.5", "10.*.*.*"]);
        assert_eq!(
            IpMatcher::first_match("10.0.0.5", &list).as_deref(),
            Some("10.0.0.0/8")
        );
    }

    #[test]
    fn test_empty_rules_allow_everyone() {
        assert!(IpMatcher::is_allowed("1.2.3.4", &[]));
        assert!(IpMatcher::first_match("1.2.3.4", &[]).is_none());
    }

    #[test]
    fn test_wildcard_and_exact() {
        assert!(IpMatcher::is_allowed("192.168.5.9", &rules(&["192.168.*.*"])));
        assert!(!IpMatcher::is_allowed("10.0.0.1", &rules(&["192.168.1.0/24"])));
        assert!(IpMatcher::is_allowed("0:0:0:0:0:0:0:1", &rules(&["::1"])));
    }

    #[test]
    fn test_unparseable_requester_only_matches_text() {
        let list = rules(&["0.0.0.0/0", "unknown-host"]);
        assert!(!IpMatcher::is_allowed("not-an-ip", &list));
    }

    #[test]
    fn test_bad_stored_rule_is_skipped() {
        let list = rules(&["bogus", "1.2.3.4"]);
        assert!(IpMatcher::is_allowed("1.2.3.4", &list));
    }

    #[test]
    fn test_evaluate_unrestricted_cases() {
        let cache = AllowListCache::new();
        assert_eq!(cache.evaluate("1.2.3.4", None), IpDecision::Unrestricted);
        assert_eq!(
            cache.evaluate("1.2.3.4", Some(&restriction(false, &["9.9.9.9"]))),
            IpDecision::Unrestricted
        );
        assert_eq!(
            cache.evaluate("1.2.3.4", Some(&restriction(true, &[]))),
            IpDecision::Unrestricted
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evaluate_enforced() {
        let cache = AllowListCache::new();
        let r = restriction(true, &["192.168.1.0/24"]);
        assert_eq!(
            cache.evaluate("192.168.1.9", Some(&r)),
            IpDecision::Matched {
                rule: "192.168.1.0/24".to_string()
            }
        );
        let denied = cache.evaluate("8.8.8.8", Some(&r));
        assert_eq!(denied, IpDecision::NotMatched);
        assert!(!denied.is_allowed());
    }

    #[test]
    fn test_cache_parses_each_list_once() {
        let cache = AllowListCache::new();
        let first = restriction(true, &["10.*.*.*"]);
        let a = cache.list_for(&first);
        let b = cache.list_for(&first);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let changed = restriction(true, &["192.168.*.*"]);
        let c = cache.list_for(&changed);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.evaluate("10.1.2.3", Some(&changed)),
            IpDecision::NotMatched
        );
        assert!(cache.evaluate("192.168.4.5", Some(&changed)).is_allowed());
    }

    #[test]
    fn test_failed_open_is_allowed() {
        let decision = IpDecision::FailedOpen {
            reason: "store down".to_string(),
        };
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_normalize_dedupes_and_collects_rejects() {
        let out = IpMatcher::normalize(
            &rules(&[
                " 10.0.0.1 ",
                "10.0.0.1",
                "",
                "10.0.0.0/8",
                "nope",
                "10.0.0.0/8",
                "10.0.0.0/40",
            ]),
            100,
        );
        assert_eq!(out.rules, rules(&["10.0.0.1", "10.0.0.0/8"]));
        assert_eq!(out.rejected, rules(&["nope", "10.0.0.0/40"]));
        assert_eq!(out.truncated, 0);
    }

    #[test]
    fn test_normalize_caps_rule_count() {
        let many: Vec<String> = (0..105).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect();
        let out = IpMatcher::normalize(&many, 100);
        assert_eq!(out.rules.len(), 100);
        assert_eq!(out.truncated, 5);
        assert_eq!(out.rules[0], "10.0.0.0");
        assert_eq!(out.rules[99], "10.0.0.99");
    }
}

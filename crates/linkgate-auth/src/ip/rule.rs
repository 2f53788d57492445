//! Parsed allow-list rules.

use std::fmt;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use regex::Regex;

use linkgate_core::error::AppError;
use linkgate_core::result::AppResult;

/// One allow-list rule.
///
/// The raw text is kept next to the parsed form: a requester whose address
/// string equals the rule text matches regardless of the rule's kind.
#[derive(Debug, Clone)]
pub enum IpRule {
    /// A literal address.
    Exact {
        /// Canonical text of the address.
        raw: String,
        /// The parsed address.
        addr: IpAddr,
    },
    /// A CIDR block such as `10.0.0.0/8` or `2001:db8::/32`.
    Cidr {
        /// The block as written (trimmed).
        raw: String,
        /// The parsed block.
        network: IpNetwork,
    },
    /// An IPv4 pattern whose `*` octets stand for any digits.
    Wildcard {
        /// The pattern as written (trimmed).
        raw: String,
        /// Anchored regex compiled from the pattern.
        pattern: Regex,
    },
}

impl IpRule {
    /// Parse a rule string.
    pub fn parse(input: &str) -> AppResult<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(AppError::validation("IP rule must not be empty"));
        }

        if raw.contains('/') {
            return Self::parse_cidr(raw);
        }
        if raw.contains('*') {
            return Self::parse_wildcard(raw);
        }

        let addr: IpAddr = raw
            .parse()
            .map_err(|_| AppError::validation(format!("Invalid IP address: '{raw}'")))?;
        let addr = canonical(addr);
        Ok(Self::Exact {
            raw: addr.to_string(),
            addr,
        })
    }

    fn parse_cidr(raw: &str) -> AppResult<Self> {
        let (ip_part, prefix_part) = raw
            .split_once('/')
            .ok_or_else(|| AppError::validation(format!("Invalid CIDR block: '{raw}'")))?;
        if prefix_part.is_empty() || !prefix_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::validation(format!(
                "Invalid CIDR prefix in '{raw}'"
            )));
        }
        if ip_part.parse::<IpAddr>().is_err() {
            return Err(AppError::validation(format!(
                "Invalid CIDR address in '{raw}'"
            )));
        }
        let network: IpNetwork = raw
            .parse()
            .map_err(|e| AppError::validation(format!("Invalid CIDR block '{raw}': {e}")))?;
        Ok(Self::Cidr {
            raw: raw.to_string(),
            network,
        })
    }

    fn parse_wildcard(raw: &str) -> AppResult<Self> {
        let octets: Vec<&str> = raw.split('.').collect();
        if octets.len() != 4 {
            return Err(AppError::validation(format!(
                "Wildcard rule '{raw}' must have four octets"
            )));
        }

        let mut parts = Vec::with_capacity(4);
        for octet in &octets {
            if *octet == "*" {
                parts.push(r"\d+".to_string());
            } else if octet.parse::<u8>().is_ok() {
                parts.push(regex::escape(octet));
            } else {
                return Err(AppError::validation(format!(
                    "Invalid octet '{octet}' in wildcard rule '{raw}'"
                )));
            }
        }

        let pattern = Regex::new(&format!("^{}$", parts.join(r"\.")))
            .map_err(|e| AppError::internal(format!("Wildcard rule '{raw}' failed to compile: {e}")))?;
        Ok(Self::Wildcard {
            raw: raw.to_string(),
            pattern,
        })
    }

    /// The rule text as stored.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact { raw, .. } | Self::Cidr { raw, .. } | Self::Wildcard { raw, .. } => raw,
        }
    }

    /// Whether a requester matches this rule.
    ///
    /// `requester` is the address text as received; `addr` is its parsed
    /// form when it parses. Text equality is tried first, then the
    /// kind-specific check.
    pub fn matches(&self, requester: &str, addr: Option<IpAddr>) -> bool {
        if requester == self.as_str() {
            return true;
        }
        match self {
            Self::Exact { addr: rule_addr, .. } => addr.is_some_and(|a| a == *rule_addr),
            Self::Cidr { network, .. } => addr.is_some_and(|a| network.contains(a)),
            Self::Wildcard { pattern, .. } => {
                let text = match addr {
                    Some(a @ IpAddr::V4(_)) => a.to_string(),
                    _ => requester.to_string(),
                };
                pattern.is_match(&text)
            }
        }
    }
}

impl fmt::Display for IpRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) to IPv4.
pub fn canonical(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(s: &str) -> Option<IpAddr> {
        s.parse().ok().map(canonical)
    }

    #[test]
    fn test_parse_kinds() {
        assert!(matches!(IpRule::parse("10.0.0.1").unwrap(), IpRule::Exact { .. }));
        assert!(matches!(IpRule::parse("10.0.0.0/8").unwrap(), IpRule::Cidr { .. }));
        assert!(matches!(IpRule::parse("10.0.*.*").unwrap(), IpRule::Wildcard { .. }));
        assert!(matches!(IpRule::parse("2001:db8::/32").unwrap(), IpRule::Cidr { .. }));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "   ",
            "10.0.0",
            "300.1.1.1",
            "10.0.0.0/33",
            "10.0.0.0/",
            "10.0.0.0/x",
            "host/8",
            "10.*.*",
            "10.0.0.a*",
            "2001:db8::/129",
            "not-an-ip",
        ] {
            assert!(IpRule::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_exact_rule_is_canonicalized() {
        let rule = IpRule::parse(" 2001:DB8::1 ").unwrap();
        assert_eq!(rule.as_str(), "2001:db8::1");
        assert!(rule.matches("2001:db8:0:0:0:0:0:1", parsed("2001:db8:0:0:0:0:0:1")));
    }

    #[test]
    fn test_cidr_match() {
        let rule = IpRule::parse("192.168.1.0/24").unwrap();
        assert!(rule.matches("192.168.1.42", parsed("192.168.1.42")));
        assert!(!rule.matches("192.168.2.42", parsed("192.168.2.42")));
        assert!(!rule.matches("::1", parsed("::1")));
    }

    #[test]
    fn test_cidr_zero_prefix_matches_family() {
        let rule = IpRule::parse("0.0.0.0/0").unwrap();
        assert!(rule.matches("8.8.8.8", parsed("8.8.8.8")));
        assert!(!rule.matches("2001:db8::1", parsed("2001:db8::1")));
    }

    #[test]
    fn test_ipv6_cidr_match() {
        let rule = IpRule::parse("2001:db8::/32").unwrap();
        assert!(rule.matches("2001:db8:1::5", parsed("2001:db8:1::5")));
        assert!(!rule.matches("2001:db9::5", parsed("2001:db9::5")));
    }

    #[test]
    fn test_wildcard_match() {
        let rule = IpRule::parse("10.20.*.*").unwrap();
        assert!(rule.matches("10.20.3.4", parsed("10.20.3.4")));
        assert!(!rule.matches("10.21.3.4", parsed("10.21.3.4")));
        // Dots are literal.
        assert!(!rule.matches("10x20.3.4", None));
    }

    #[test]
    fn test_mapped_ipv6_requester() {
        let rule = IpRule::parse("192.168.1.0/24").unwrap();
        assert!(rule.matches("::ffff:192.168.1.7", parsed("::ffff:192.168.1.7")));
        let wildcard = IpRule::parse("192.168.*.*").unwrap();
        assert!(wildcard.matches("::ffff:192.168.1.7", parsed("::ffff:192.168.1.7")));
    }
}

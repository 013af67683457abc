//! Network attendance policy
//!
//! Decides whether an observed network qualifies for attendance. The
//! allow-list is a union of four entry kinds: SSID names, exact IPs,
//! textual IP prefixes, and CIDR blocks. Matching any one of them is
//! sufficient. An empty allow-list denies everything unless the service
//! runs in open mode.

use std::net::IpAddr;

use tracing::warn;

use crate::db::schemas::AllowedNetworksDoc;

/// Compiled allow-list, built once per decision from the stored document
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ssids: Vec<String>,
    ip_exact: Vec<IpAddr>,
    ip_prefixes: Vec<String>,
    cidrs: Vec<Cidr>,
    /// Accept everything when the list is empty
    open_mode: bool,
}

/// What the client reported about its network
#[derive(Debug, Clone, Default)]
pub struct ObservedNetwork {
    pub ip: Option<IpAddr>,
    pub ssid: Option<String>,
}

/// Outcome of a policy check, with the rule that matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed(MatchRule),
    Denied,
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allowed(_))
    }
}

/// Which kind of rule admitted the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRule {
    OpenMode,
    Ssid(String),
    IpExact(String),
    IpPrefix(String),
    IpCidr(String),
}

/// A parsed CIDR block
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cidr {
    text: String,
    network: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    /// Parse "a.b.c.d/len" or "v6/len". Bare addresses get a full-length
    /// prefix so "10.0.0.1" behaves like "10.0.0.1/32".
    fn parse(s: &str) -> Option<Self> {
        let (addr_part, len_part) = match s.split_once('/') {
            Some((a, l)) => (a, Some(l)),
            None => (s, None),
        };
        let network: IpAddr = addr_part.trim().parse().ok()?;
        let max_len = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix_len = match len_part {
            Some(l) => {
                let len: u8 = l.trim().parse().ok()?;
                if len > max_len {
                    return None;
                }
                len
            }
            None => max_len,
        };
        Some(Self {
            text: s.to_string(),
            network,
            prefix_len,
        })
    }

    fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                if self.prefix_len == 0 {
                    return true;
                }
                let mask = u32::MAX << (32 - u32::from(self.prefix_len));
                (u32::from(net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                if self.prefix_len == 0 {
                    return true;
                }
                let mask = u128::MAX << (128 - u128::from(self.prefix_len));
                (u128::from(net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

impl AllowList {
    /// Compile the stored document into a checkable list. Malformed
    /// entries are logged and skipped rather than failing the check.
    pub fn from_doc(doc: &AllowedNetworksDoc, open_mode: bool) -> Self {
        let mut ip_exact = Vec::new();
        for entry in &doc.ip_exact {
            match entry.trim().parse::<IpAddr>() {
                Ok(ip) => ip_exact.push(ip),
                Err(_) => warn!(entry = %entry, "skipping malformed exact IP entry"),
            }
        }

        let mut cidrs = Vec::new();
        for entry in &doc.ip_cidrs {
            match Cidr::parse(entry) {
                Some(cidr) => cidrs.push(cidr),
                None => warn!(entry = %entry, "skipping malformed CIDR entry"),
            }
        }

        Self {
            ssids: doc.ssids.clone(),
            ip_exact,
            ip_prefixes: doc.ip_prefixes.clone(),
            cidrs,
            open_mode,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ssids.is_empty()
            && self.ip_exact.is_empty()
            && self.ip_prefixes.is_empty()
            && self.cidrs.is_empty()
    }

    /// Check an observed network against every rule kind. Rules are a
    /// union with no precedence.
    pub fn check(&self, observed: &ObservedNetwork) -> PolicyDecision {
        if self.is_empty() {
            return if self.open_mode {
                PolicyDecision::Allowed(MatchRule::OpenMode)
            } else {
                PolicyDecision::Denied
            };
        }

        if let Some(ssid) = &observed.ssid {
            if let Some(hit) = self.ssids.iter().find(|s| s.as_str() == ssid) {
                return PolicyDecision::Allowed(MatchRule::Ssid(hit.clone()));
            }
        }

        if let Some(ip) = &observed.ip {
            if self.ip_exact.contains(ip) {
                return PolicyDecision::Allowed(MatchRule::IpExact(ip.to_string()));
            }

            let ip_text = ip.to_string();
            if let Some(prefix) = self
                .ip_prefixes
                .iter()
                .find(|p| ip_text.starts_with(p.as_str()))
            {
                return PolicyDecision::Allowed(MatchRule::IpPrefix(prefix.clone()));
            }

            if let Some(cidr) = self.cidrs.iter().find(|c| c.contains(ip)) {
                return PolicyDecision::Allowed(MatchRule::IpCidr(cidr.text.clone()));
            }
        }

        PolicyDecision::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::NetworkEntryKind;

    fn doc_with(kind: NetworkEntryKind, value: &str) -> AllowedNetworksDoc {
        let mut doc = AllowedNetworksDoc::empty();
        doc.add_entry(kind, value);
        doc
    }

    fn observed(ip: &str, ssid: Option<&str>) -> ObservedNetwork {
        ObservedNetwork {
            ip: Some(ip.parse().unwrap()),
            ssid: ssid.map(|s| s.to_string()),
        }
    }

    #[test]
    fn empty_list_denies_by_default() {
        let list = AllowList::from_doc(&AllowedNetworksDoc::empty(), false);
        assert_eq!(list.check(&observed("10.0.0.1", None)), PolicyDecision::Denied);
    }

    #[test]
    fn empty_list_allows_in_open_mode() {
        let list = AllowList::from_doc(&AllowedNetworksDoc::empty(), true);
        assert!(list.check(&observed("10.0.0.1", None)).is_allowed());
    }

    #[test]
    fn open_mode_is_ignored_when_rules_exist() {
        let doc = doc_with(NetworkEntryKind::Ssid, "Office-WiFi");
        let list = AllowList::from_doc(&doc, true);
        assert_eq!(list.check(&observed("10.0.0.1", Some("Home"))), PolicyDecision::Denied);
    }

    #[test]
    fn ssid_match_allows() {
        let doc = doc_with(NetworkEntryKind::Ssid, "Office-WiFi");
        let list = AllowList::from_doc(&doc, false);
        let decision = list.check(&observed("203.0.113.9", Some("Office-WiFi")));
        assert_eq!(
            decision,
            PolicyDecision::Allowed(MatchRule::Ssid("Office-WiFi".into()))
        );
    }

    #[test]
    fn exact_ip_match_allows() {
        let doc = doc_with(NetworkEntryKind::IpExact, "192.168.1.50");
        let list = AllowList::from_doc(&doc, false);
        assert!(list.check(&observed("192.168.1.50", None)).is_allowed());
        assert!(!list.check(&observed("192.168.1.51", None)).is_allowed());
    }

    #[test]
    fn prefix_match_is_textual() {
        let doc = doc_with(NetworkEntryKind::IpPrefix, "10.1.");
        let list = AllowList::from_doc(&doc, false);
        assert!(list.check(&observed("10.1.2.3", None)).is_allowed());
        // "10.10.x" does not start with "10.1." so it is rejected
        assert!(!list.check(&observed("10.10.0.1", None)).is_allowed());
    }

    #[test]
    fn cidr_boundaries() {
        let doc = doc_with(NetworkEntryKind::IpCidr, "192.168.1.0/24");
        let list = AllowList::from_doc(&doc, false);
        assert!(list.check(&observed("192.168.1.0", None)).is_allowed());
        assert!(list.check(&observed("192.168.1.255", None)).is_allowed());
        assert!(!list.check(&observed("192.168.2.0", None)).is_allowed());
        assert!(!list.check(&observed("192.168.0.255", None)).is_allowed());
    }

    #[test]
    fn ipv6_cidr_match() {
        let doc = doc_with(NetworkEntryKind::IpCidr, "2001:db8::/32");
        let list = AllowList::from_doc(&doc, false);
        assert!(list.check(&observed("2001:db8::1", None)).is_allowed());
        assert!(!list.check(&observed("2001:db9::1", None)).is_allowed());
    }

    #[test]
    fn cidr_family_mismatch_denies() {
        let doc = doc_with(NetworkEntryKind::IpCidr, "10.0.0.0/8");
        let list = AllowList::from_doc(&doc, false);
        assert!(!list.check(&observed("::1", None)).is_allowed());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let mut doc = AllowedNetworksDoc::empty();
        doc.add_entry(NetworkEntryKind::IpCidr, "not-a-cidr");
        doc.add_entry(NetworkEntryKind::IpCidr, "10.0.0.0/33");
        doc.add_entry(NetworkEntryKind::IpExact, "999.1.1.1");
        doc.add_entry(NetworkEntryKind::Ssid, "Lab");
        let list = AllowList::from_doc(&doc, false);
        assert!(list.check(&observed("10.0.0.1", Some("Lab"))).is_allowed());
        assert!(!list.check(&observed("10.0.0.1", None)).is_allowed());
    }

    #[test]
    fn missing_ip_can_still_match_ssid() {
        let doc = doc_with(NetworkEntryKind::Ssid, "Office-WiFi");
        let list = AllowList::from_doc(&doc, false);
        let net = ObservedNetwork {
            ip: None,
            ssid: Some("Office-WiFi".into()),
        };
        assert!(list.check(&net).is_allowed());
    }
}

//! Allowed networks schema
//!
//! A single document holds the whole allow-list. Every attendance
//! check-in reads it, so keeping it in one place makes edits atomic.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for the network allow-list
pub const ALLOWED_NETWORKS_COLLECTION: &str = "allowed_networks";

/// Fixed id of the singleton allow-list document
pub const ALLOWED_NETWORKS_KEY: &str = "default";

/// Which list an allow-list entry belongs to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetworkEntryKind {
    Ssid,
    IpExact,
    IpPrefix,
    IpCidr,
}

impl NetworkEntryKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ssid" => Some(NetworkEntryKind::Ssid),
            "ip_exact" => Some(NetworkEntryKind::IpExact),
            "ip_prefix" => Some(NetworkEntryKind::IpPrefix),
            "ip_cidr" => Some(NetworkEntryKind::IpCidr),
            _ => None,
        }
    }
}

/// Singleton allow-list document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AllowedNetworksDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Discriminator so the document can be fetched without its ObjectId
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub ssids: Vec<String>,

    #[serde(default)]
    pub ip_exact: Vec<String>,

    /// Dotted prefixes such as "10.0." matched against the textual IP
    #[serde(default)]
    pub ip_prefixes: Vec<String>,

    /// CIDR blocks such as "192.168.1.0/24"
    #[serde(default)]
    pub ip_cidrs: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl AllowedNetworksDoc {
    pub fn empty() -> Self {
        Self {
            key: ALLOWED_NETWORKS_KEY.to_string(),
            ..Default::default()
        }
    }

    fn list_mut(&mut self, kind: NetworkEntryKind) -> &mut Vec<String> {
        match kind {
            NetworkEntryKind::Ssid => &mut self.ssids,
            NetworkEntryKind::IpExact => &mut self.ip_exact,
            NetworkEntryKind::IpPrefix => &mut self.ip_prefixes,
            NetworkEntryKind::IpCidr => &mut self.ip_cidrs,
        }
    }

    /// Add an entry, ignoring duplicates. Returns whether it was new.
    pub fn add_entry(&mut self, kind: NetworkEntryKind, value: &str) -> bool {
        let list = self.list_mut(kind);
        if list.iter().any(|v| v == value) {
            return false;
        }
        list.push(value.to_string());
        true
    }

    /// Remove an entry. Returns whether it was present.
    pub fn remove_entry(&mut self, kind: NetworkEntryKind, value: &str) -> bool {
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|v| v != value);
        list.len() != before
    }
}

impl IntoIndexes for AllowedNetworksDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "key": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("key_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for AllowedNetworksDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_entry_dedupes() {
        let mut doc = AllowedNetworksDoc::empty();
        assert!(doc.add_entry(NetworkEntryKind::Ssid, "Office-WiFi"));
        assert!(!doc.add_entry(NetworkEntryKind::Ssid, "Office-WiFi"));
        assert_eq!(doc.ssids, vec!["Office-WiFi"]);
    }

    #[test]
    fn remove_entry_reports_presence() {
        let mut doc = AllowedNetworksDoc::empty();
        doc.add_entry(NetworkEntryKind::IpCidr, "10.0.0.0/8");
        assert!(doc.remove_entry(NetworkEntryKind::IpCidr, "10.0.0.0/8"));
        assert!(!doc.remove_entry(NetworkEntryKind::IpCidr, "10.0.0.0/8"));
    }
}

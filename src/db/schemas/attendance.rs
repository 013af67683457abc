//! Attendance event schema
//!
//! Each check-in or check-out is a separate event document. Daily
//! summaries are derived at read time from the event stream.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for attendance events
pub const ATTENDANCE_COLLECTION: &str = "attendance";

/// Kind of attendance event
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttendanceEvent {
    #[serde(rename = "check-in")]
    CheckIn,
    #[serde(rename = "check-out")]
    CheckOut,
}

impl AttendanceEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceEvent::CheckIn => "check-in",
            AttendanceEvent::CheckOut => "check-out",
        }
    }
}

/// Network observed at the moment of the event
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct NetworkInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// Attendance event document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AttendanceDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_email: String,

    pub event: AttendanceEvent,

    pub timestamp: DateTime,

    /// Calendar day of the event, "YYYY-MM-DD" in UTC
    pub day: String,

    #[serde(default)]
    pub network: NetworkInfo,
}

impl AttendanceDoc {
    pub fn new(
        user_email: String,
        event: AttendanceEvent,
        timestamp: DateTime,
        network: NetworkInfo,
    ) -> Self {
        let day = timestamp
            .to_chrono()
            .format("%Y-%m-%d")
            .to_string();
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_email,
            event,
            timestamp,
            day,
            network,
        }
    }
}

impl IntoIndexes for AttendanceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_email": 1, "day": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_day_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "timestamp": -1 },
                Some(
                    IndexOptions::builder()
                        .name("timestamp_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AttendanceDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_is_derived_from_timestamp() {
        // 2025-03-10T14:30:00Z
        let ts = DateTime::from_millis(1_741_617_000_000);
        let doc = AttendanceDoc::new(
            "intern@example.com".into(),
            AttendanceEvent::CheckIn,
            ts,
            NetworkInfo::default(),
        );
        assert_eq!(doc.day, "2025-03-10");
    }

    #[test]
    fn event_serializes_with_hyphen() {
        let v = serde_json::to_value(AttendanceEvent::CheckIn).unwrap();
        assert_eq!(v, serde_json::json!("check-in"));
        let v = serde_json::to_value(AttendanceEvent::CheckOut).unwrap();
        assert_eq!(v, serde_json::json!("check-out"));
    }
}

//! Meeting log schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for meeting logs
pub const MEETING_COLLECTION: &str = "meetings";

/// Record of a meeting room that was created or joined
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MeetingDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Display name as entered by the user
    pub room_name: String,

    /// Full join URL built from the slugified room name
    pub link: String,

    pub created_by: String,

    pub created_at: DateTime,
}

impl MeetingDoc {
    pub fn new(room_name: String, link: String, created_by: String, created_at: DateTime) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            room_name,
            link,
            created_by,
            created_at,
        }
    }
}

impl IntoIndexes for MeetingDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "created_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("created_at_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for MeetingDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! Chat schemas
//!
//! Two collections: rooms (group channels) and messages. A message
//! belongs either to a room (`room_id` set) or to a direct conversation
//! (`recipient` set), never both.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for chat rooms
pub const CHAT_ROOM_COLLECTION: &str = "chat_rooms";

/// Collection name for chat messages
pub const CHAT_MESSAGE_COLLECTION: &str = "chat_messages";

/// Group chat room document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatRoomDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_by: String,
}

impl ChatRoomDoc {
    pub fn new(name: String, description: Option<String>, created_by: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            description,
            created_by,
        }
    }
}

impl IntoIndexes for ChatRoomDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("room_name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ChatRoomDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Chat message document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatMessageDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub sender: String,

    pub sender_name: String,

    /// Direct message target, exclusive with `room_id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// Room the message was posted in, exclusive with `recipient`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    pub body: String,

    pub timestamp: DateTime,

    #[serde(default)]
    pub read: bool,
}

impl ChatMessageDoc {
    pub fn room_message(
        sender: String,
        sender_name: String,
        room_id: String,
        body: String,
        timestamp: DateTime,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            sender,
            sender_name,
            recipient: None,
            room_id: Some(room_id),
            body,
            timestamp,
            read: false,
        }
    }

    pub fn direct_message(
        sender: String,
        sender_name: String,
        recipient: String,
        body: String,
        timestamp: DateTime,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            sender,
            sender_name,
            recipient: Some(recipient),
            room_id: None,
            body,
            timestamp,
            read: false,
        }
    }
}

impl IntoIndexes for ChatMessageDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "room_id": 1, "timestamp": 1 },
                Some(
                    IndexOptions::builder()
                        .name("room_timestamp_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "sender": 1, "recipient": 1, "timestamp": 1 },
                Some(
                    IndexOptions::builder()
                        .name("direct_timestamp_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ChatMessageDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

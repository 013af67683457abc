//! Document schemas for the Waypoint store
//!
//! Every collection document carries a shared [`Metadata`] block and declares
//! its own indexes via [`crate::db::IntoIndexes`].

mod attendance;
mod chat;
mod meeting;
mod network;
mod progress;
mod task;
mod user;

pub use attendance::{AttendanceDoc, AttendanceEvent, NetworkInfo, ATTENDANCE_COLLECTION};
pub use chat::{
    ChatMessageDoc, ChatRoomDoc, CHAT_MESSAGE_COLLECTION, CHAT_ROOM_COLLECTION,
};
pub use meeting::{MeetingDoc, MEETING_COLLECTION};
pub use network::{
    AllowedNetworksDoc, NetworkEntryKind, ALLOWED_NETWORKS_COLLECTION, ALLOWED_NETWORKS_KEY,
};
pub use progress::{ProgressDoc, TaskStatus, PROGRESS_COLLECTION};
pub use task::{
    ResourceLink, TaskCategoryDoc, TaskDoc, CATEGORY_COLLECTION, TASK_COLLECTION,
};
pub use user::{UserDoc, UserRole, USER_COLLECTION};

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Bookkeeping shared by all documents: creation/update times and the
/// soft-delete marker the collection wrapper filters on.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh metadata stamped with the current time
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(DateTime::now()),
            created_at: Some(DateTime::now()),
        }
    }
}

//! Layered store
//!
//! All database access goes through this layer. Route handlers never
//! touch collections directly; they call store methods, which wrap the
//! typed collections with retry, validation, and cache invalidation.

mod attendance;
mod chat;
mod meetings;
mod networks;
mod progress;
mod tasks;
mod users;

pub use attendance::{AttendanceStats, DaySummary};
pub use chat::DirectConversation;
pub use meetings::slugify;
pub use tasks::{NewTask, TaskView};
pub use users::ImportReport;

use std::time::Duration;

use crate::db::mongo::{MongoClient, MongoCollection, RetryPolicy};
use crate::db::schemas::{
    AllowedNetworksDoc, AttendanceDoc, ChatMessageDoc, ChatRoomDoc, MeetingDoc, ProgressDoc,
    TaskCategoryDoc, TaskDoc, UserDoc, ALLOWED_NETWORKS_COLLECTION, ATTENDANCE_COLLECTION,
    CATEGORY_COLLECTION, CHAT_MESSAGE_COLLECTION, CHAT_ROOM_COLLECTION, MEETING_COLLECTION,
    PROGRESS_COLLECTION, TASK_COLLECTION, USER_COLLECTION,
};
use crate::metrics::MetricsCache;
use crate::types::Result;

/// Tunables the store needs beyond the database handle
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Accept attendance from any network while the allow-list is empty
    pub attendance_open: bool,
    /// Base URL meeting links are built from
    pub meeting_base_url: String,
    /// Maximum messages returned per chat query
    pub chat_history_limit: i64,
    /// Days of attendance history used for summaries and stats
    pub attendance_history_days: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            attendance_open: false,
            meeting_base_url: "https://virtual.swecha.org/room".to_string(),
            chat_history_limit: 50,
            attendance_history_days: 30,
        }
    }
}

/// Storage facade over every collection
#[derive(Clone)]
pub struct Store {
    pub(crate) users: MongoCollection<UserDoc>,
    pub(crate) tasks: MongoCollection<TaskDoc>,
    pub(crate) categories: MongoCollection<TaskCategoryDoc>,
    pub(crate) progress: MongoCollection<ProgressDoc>,
    pub(crate) attendance: MongoCollection<AttendanceDoc>,
    pub(crate) chat_rooms: MongoCollection<ChatRoomDoc>,
    pub(crate) chat_messages: MongoCollection<ChatMessageDoc>,
    pub(crate) meetings: MongoCollection<MeetingDoc>,
    pub(crate) networks: MongoCollection<AllowedNetworksDoc>,
    pub(crate) retry: RetryPolicy,
    pub(crate) cache: std::sync::Arc<MetricsCache>,
    pub(crate) settings: StoreSettings,
}

impl Store {
    /// Open every collection and apply indexes
    pub async fn new(
        client: &MongoClient,
        retry: RetryPolicy,
        settings: StoreSettings,
    ) -> Result<Self> {
        Ok(Self {
            users: client.collection(USER_COLLECTION).await?,
            tasks: client.collection(TASK_COLLECTION).await?,
            categories: client.collection(CATEGORY_COLLECTION).await?,
            progress: client.collection(PROGRESS_COLLECTION).await?,
            attendance: client.collection(ATTENDANCE_COLLECTION).await?,
            chat_rooms: client.collection(CHAT_ROOM_COLLECTION).await?,
            chat_messages: client.collection(CHAT_MESSAGE_COLLECTION).await?,
            meetings: client.collection(MEETING_COLLECTION).await?,
            networks: client.collection(ALLOWED_NETWORKS_COLLECTION).await?,
            retry,
            cache: std::sync::Arc::new(MetricsCache::new()),
            settings,
        })
    }

    /// Cache generation, bumped on progress and attendance writes
    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }
}

/// Build a retry policy from config values
pub fn retry_policy(max_attempts: u32, delay_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(delay_ms),
    }
}

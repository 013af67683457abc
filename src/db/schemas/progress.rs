//! Progress document schema
//!
//! One record per (user, task) pair, created lazily on the first status
//! change. Only the latest state is kept.
//!
//! Timestamp invariants:
//! - `completed_at` is set iff status is `done`
//! - `started_at` is set once, on the first transition to `in_progress` or
//!   `done`, and survives un-marking (`done` back to `in_progress`)

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for progress records
pub const PROGRESS_COLLECTION: &str = "progress";

/// Lifecycle status of a task for one user
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    /// Parse from the wire/storage form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(TaskStatus::NotStarted),
            "in_progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// Progress document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProgressDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_email: String,

    /// Hex ObjectId of the task
    pub task_id: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProgressDoc {
    /// Fresh record for a pair, before any transition is applied
    pub fn new(user_email: String, task_id: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_email,
            task_id,
            status: TaskStatus::NotStarted,
            started_at: None,
            completed_at: None,
            updated_at: None,
            submission_link: None,
            notes: None,
        }
    }

    /// Apply a status transition, maintaining the timestamp invariants.
    pub fn apply_status(&mut self, status: TaskStatus, now: DateTime) {
        match status {
            TaskStatus::NotStarted => {
                self.completed_at = None;
            }
            TaskStatus::InProgress => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
                // Un-marking a done task clears completion but keeps the start
                self.completed_at = None;
            }
            TaskStatus::Done => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
                if self.status != TaskStatus::Done {
                    self.completed_at = Some(now);
                }
            }
        }
        self.status = status;
        self.updated_at = Some(now);
    }

    /// Hours between start and completion, when both exist
    pub fn time_spent_hours(&self) -> Option<f64> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        let millis = completed.timestamp_millis() - started.timestamp_millis();
        if millis < 0 {
            return None;
        }
        Some(millis as f64 / 3_600_000.0)
    }
}

impl IntoIndexes for ProgressDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_email": 1, "task_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_task_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ProgressDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime {
        DateTime::from_millis(millis)
    }

    #[test]
    fn first_in_progress_sets_started_at_once() {
        let mut p = ProgressDoc::new("intern@example.com".into(), "abc".into());
        p.apply_status(TaskStatus::InProgress, at(1_000));
        assert_eq!(p.started_at, Some(at(1_000)));

        p.apply_status(TaskStatus::InProgress, at(5_000));
        assert_eq!(p.started_at, Some(at(1_000)));
    }

    #[test]
    fn completed_at_present_iff_done() {
        let mut p = ProgressDoc::new("intern@example.com".into(), "abc".into());
        p.apply_status(TaskStatus::InProgress, at(1_000));
        assert!(p.completed_at.is_none());

        p.apply_status(TaskStatus::Done, at(2_000));
        assert_eq!(p.completed_at, Some(at(2_000)));

        p.apply_status(TaskStatus::NotStarted, at(3_000));
        assert!(p.completed_at.is_none());
    }

    #[test]
    fn unmarking_preserves_started_at_and_clears_completion() {
        let mut p = ProgressDoc::new("intern@example.com".into(), "abc".into());
        p.apply_status(TaskStatus::InProgress, at(1_000));
        p.apply_status(TaskStatus::Done, at(7_200_000 + 1_000));
        assert!(p.time_spent_hours().is_some());

        p.apply_status(TaskStatus::InProgress, at(8_000_000));
        assert_eq!(p.started_at, Some(at(1_000)));
        assert!(p.completed_at.is_none());
        assert!(p.time_spent_hours().is_none());
    }

    #[test]
    fn time_spent_is_elapsed_hours() {
        let mut p = ProgressDoc::new("intern@example.com".into(), "abc".into());
        p.apply_status(TaskStatus::InProgress, at(0));
        p.apply_status(TaskStatus::Done, at(3 * 3_600_000));
        let hours = p.time_spent_hours().unwrap();
        assert!((hours - 3.0).abs() < 1e-9);
    }

    #[test]
    fn re_marking_done_keeps_original_completion() {
        let mut p = ProgressDoc::new("intern@example.com".into(), "abc".into());
        p.apply_status(TaskStatus::Done, at(1_000));
        p.apply_status(TaskStatus::Done, at(9_000));
        assert_eq!(p.completed_at, Some(at(1_000)));
    }
}

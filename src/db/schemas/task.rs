//! Task and task-category document schemas
//!
//! Tasks reference their prerequisites by id; the graph must stay acyclic
//! and the store rejects writes that would close a cycle.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for tasks
pub const TASK_COLLECTION: &str = "tasks";

/// Collection name for task categories
pub const CATEGORY_COLLECTION: &str = "task_categories";

/// Reference material attached to a task
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ResourceLink {
    pub title: String,
    pub url: String,
    /// link, document, video, ...
    #[serde(default = "default_link_kind")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_link_kind() -> String {
    "link".to_string()
}

/// Task document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TaskDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Category name
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub resources: Vec<ResourceLink>,

    /// Target user email, or "all"
    #[serde(default = "default_assigned_to")]
    pub assigned_to: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime>,

    /// Hex ObjectIds of tasks that must be done first
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

fn default_assigned_to() -> String {
    "all".to_string()
}

impl TaskDoc {
    /// Hex id of this task; empty string before insertion
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for TaskDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "assigned_to": 1 },
                Some(
                    IndexOptions::builder()
                        .name("assigned_to_index".to_string())
                        .build(),
                ),
            ),
            // Supports the dependents (reverse edge) query
            (
                doc! { "prerequisites": 1 },
                Some(
                    IndexOptions::builder()
                        .name("prerequisites_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for TaskDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// Task category document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TaskCategoryDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Hex color used by chart rendering
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#1E88E5".to_string()
}

impl TaskCategoryDoc {
    pub fn new(name: String, description: String, color: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            description,
            color,
        }
    }
}

impl IntoIndexes for TaskCategoryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("category_name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for TaskCategoryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

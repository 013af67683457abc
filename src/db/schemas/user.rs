//! User document schema
//!
//! A user is created on first login or via CSV roster import and is never
//! deleted in normal flow.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Role of a user within the program
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Intern,
    Mentor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Intern => "intern",
            UserRole::Mentor => "mentor",
        }
    }
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Unique identity
    pub email: String,

    /// Display name
    pub name: String,

    pub role: UserRole,

    /// College the intern belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,

    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime>,
}

impl UserDoc {
    pub fn new(
        email: String,
        name: String,
        role: UserRole,
        skills: Vec<String>,
        college: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email,
            name,
            role,
            college,
            skills,
            joined_at: Some(DateTime::now()),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "role": 1 },
                Some(IndexOptions::builder().name("role_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

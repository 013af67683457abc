//! Error types shared across Waypoint

use thiserror::Error;

/// Top-level error type for Waypoint operations
#[derive(Debug, Error)]
pub enum WaypointError {
    /// Storage failure (connection, query, serialization)
    #[error("Database error: {0}")]
    Database(String),

    /// A write was rejected because the input is malformed or references
    /// something that does not exist
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A prerequisite edge would close a cycle in the task graph
    #[error("Prerequisite cycle: {0}")]
    CycleDetected(String),

    /// A referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Assistant backend failure (the caller falls back to a canned reply)
    #[error("Assistant error: {0}")]
    Assistant(String),

    /// Bad configuration at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (listener bind, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, WaypointError>;

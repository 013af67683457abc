//! MongoDB storage layer

pub mod mongo;
pub mod schemas;

pub use mongo::{with_retry, IntoIndexes, MongoClient, MongoCollection, MutMetadata, RetryPolicy};

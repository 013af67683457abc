//! Waypoint - internship progress tracking service
//!
//! Task dependencies, progress metrics, network-gated attendance, chat,
//! meetings and an assistant, served over a single HTTP API backed by
//! MongoDB.

pub mod assistant;
pub mod config;
pub mod db;
pub mod metrics;
pub mod policy;
pub mod resolver;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use types::{Result, WaypointError};

//! Configuration for Waypoint
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Waypoint - internship progress tracking service
#[derive(Parser, Debug, Clone)]
#[command(name = "waypoint")]
#[command(about = "Internship progress tracking service")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "waypoint")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum attempts for a store operation before surfacing an error
    #[arg(long, env = "DB_MAX_RETRIES", default_value = "3")]
    pub db_max_retries: u32,

    /// Base delay between store retries in milliseconds (linear backoff)
    #[arg(long, env = "DB_RETRY_DELAY_MS", default_value = "1000")]
    pub db_retry_delay_ms: u64,

    /// Treat an empty/unset network allow-list as "allow everyone".
    /// Off by default; an empty allow-list denies attendance check-ins.
    #[arg(long, env = "ATTENDANCE_OPEN", default_value = "false")]
    pub attendance_open: bool,

    /// Base URL used to template video meeting links
    #[arg(long, env = "MEETING_BASE_URL", default_value = "https://virtual.swecha.org/room")]
    pub meeting_base_url: String,

    /// Assistant completion endpoint (Gemini-style generateContent URL).
    /// When unset, the assistant always answers with the canned fallback.
    #[arg(long, env = "ASSISTANT_URL")]
    pub assistant_url: Option<String>,

    /// API key for the assistant endpoint
    #[arg(long, env = "ASSISTANT_API_KEY")]
    pub assistant_api_key: Option<String>,

    /// Maximum chat messages returned per thread fetch
    #[arg(long, env = "CHAT_HISTORY_LIMIT", default_value = "50")]
    pub chat_history_limit: i64,

    /// Default look-back window for attendance history, in days
    #[arg(long, env = "ATTENDANCE_HISTORY_DAYS", default_value = "30")]
    pub attendance_history_days: i64,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.db_max_retries == 0 {
            return Err("DB_MAX_RETRIES must be at least 1".to_string());
        }
        if self.chat_history_limit <= 0 {
            return Err("CHAT_HISTORY_LIMIT must be positive".to_string());
        }
        if self.assistant_url.is_some() && self.assistant_api_key.is_none() {
            return Err("ASSISTANT_API_KEY is required when ASSISTANT_URL is set".to_string());
        }
        if self.meeting_base_url.is_empty() {
            return Err("MEETING_BASE_URL must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["waypoint"])
    }

    #[test]
    fn default_args_validate() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn assistant_url_requires_key() {
        let mut args = base_args();
        args.assistant_url = Some("https://example.test/v1beta/models/x:generateContent".into());
        assert!(args.validate().is_err());
        args.assistant_api_key = Some("key".into());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn zero_retries_rejected() {
        let mut args = base_args();
        args.db_max_retries = 0;
        assert!(args.validate().is_err());
    }
}

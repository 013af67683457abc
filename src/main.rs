//! Waypoint - internship progress tracking service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waypoint::{
    assistant::{Assistant, AssistantBackend, GeminiBackend},
    config::Args,
    db::MongoClient,
    server,
    store::{retry_policy, Store, StoreSettings},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("waypoint={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Waypoint - Internship Tracker");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Database: {}", args.mongodb_db);
    info!("Attendance open mode: {}", args.attendance_open);
    info!("Meeting base URL: {}", args.meeting_base_url);
    info!(
        "Assistant backend: {}",
        if args.assistant_url.is_some() {
            "gemini"
        } else {
            "canned only"
        }
    );
    info!("======================================");

    // Connect to MongoDB. Nothing works without the store, so a failed
    // connection is fatal.
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            client
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let settings = StoreSettings {
        attendance_open: args.attendance_open,
        meeting_base_url: args.meeting_base_url.clone(),
        chat_history_limit: args.chat_history_limit,
        attendance_history_days: args.attendance_history_days.max(1) as u32,
    };
    let retry = retry_policy(args.db_max_retries, args.db_retry_delay_ms);

    let store = match Store::new(&mongo, retry, settings).await {
        Ok(store) => {
            info!("Store initialized, indexes applied");
            store
        }
        Err(e) => {
            error!("Store initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    // Assistant backend is optional; without it the canned fallback
    // answers everything
    let backend: Option<Arc<dyn AssistantBackend>> =
        match (&args.assistant_url, &args.assistant_api_key) {
            (Some(url), Some(key)) => match GeminiBackend::new(url.clone(), key.clone()) {
                Ok(backend) => Some(Arc::new(backend)),
                Err(e) => {
                    warn!("Assistant backend unavailable, using canned replies: {}", e);
                    None
                }
            },
            _ => None,
        };
    let assistant = Assistant::new(backend);

    let state = Arc::new(server::AppState::new(args, mongo, store, assistant));

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}

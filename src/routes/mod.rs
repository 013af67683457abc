//! HTTP route handlers
//!
//! Handlers are thin: parse input, call the store, shape the JSON
//! reply. Read endpoints degrade to neutral defaults when the store
//! fails so the dashboard keeps rendering; writes surface errors.

pub mod assistant;
pub mod attendance;
pub mod chat;
pub mod health;
pub mod meetings;
pub mod networks;
pub mod progress;
pub mod tasks;
pub mod users;

pub use assistant::handle_assistant;
pub use attendance::{
    handle_attendance_event, handle_attendance_history, handle_attendance_stats,
    handle_attendance_today,
};
pub use chat::{
    handle_direct_get, handle_direct_post, handle_room_messages_get, handle_room_messages_post,
    handle_rooms_get, handle_rooms_post, handle_unread,
};
pub use health::{health_check, version_info};
pub use meetings::{handle_meeting_create, handle_meetings_recent};
pub use networks::{
    handle_network_entry_add, handle_network_entry_remove, handle_networks_get,
    handle_networks_replace,
};
pub use progress::{
    handle_college_leaderboard, handle_leaderboard, handle_metrics, handle_progress_get,
    handle_progress_post, handle_streak,
};
pub use tasks::{
    handle_bottlenecks, handle_categories_get, handle_categories_post, handle_category_delete,
    handle_task_delete, handle_task_get, handle_task_prerequisites, handle_tasks_get,
    handle_tasks_post,
};
pub use users::{handle_users_get, handle_users_import, handle_users_post};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::WaypointError;

/// JSON response with the standard headers
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json_body = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(json_body)))
        .unwrap()
}

/// Shape a store error into an HTTP error response
pub(crate) fn error_response(err: &WaypointError) -> Response<Full<Bytes>> {
    let status = match err {
        WaypointError::InvalidInput(_) | WaypointError::CycleDetected(_) => {
            StatusCode::BAD_REQUEST
        }
        WaypointError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = serde_json::json!({ "error": err.to_string() });
    json_response(status, &body)
}

/// Parse a JSON request body, shaping failures as 400s
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    body: &[u8],
) -> Result<T, Response<Full<Bytes>>> {
    serde_json::from_slice(body).map_err(|e| {
        let body = serde_json::json!({ "error": format!("invalid request body: {}", e) });
        json_response(StatusCode::BAD_REQUEST, &body)
    })
}

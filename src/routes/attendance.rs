//! Attendance endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;
use tracing::error;

use crate::db::schemas::{AttendanceEvent, NetworkInfo};
use crate::server::AppState;

use super::{error_response, json_response, parse_json};

/// POST /api/attendance/check-in and /api/attendance/check-out.
/// The body carries what the client observed about its network.
pub async fn handle_attendance_event(
    state: Arc<AppState>,
    user: &str,
    event: AttendanceEvent,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let network: NetworkInfo = if body.is_empty() {
        NetworkInfo::default()
    } else {
        match parse_json(body) {
            Ok(network) => network,
            Err(resp) => return resp,
        }
    };
    match state.store.record_attendance(user, event, network).await {
        Ok(record) => json_response(StatusCode::CREATED, &record),
        Err(e) => error_response(&e),
    }
}

/// GET /api/attendance/today
pub async fn handle_attendance_today(state: Arc<AppState>, user: &str) -> Response<Full<Bytes>> {
    match state.store.attendance_today(user).await {
        Ok(summary) => json_response(StatusCode::OK, &serde_json::json!({ "today": summary })),
        Err(e) => {
            error!(user = %user, error = %e, "attendance today failed, returning empty");
            json_response(StatusCode::OK, &serde_json::json!({ "today": null }))
        }
    }
}

/// GET /api/attendance/history
pub async fn handle_attendance_history(state: Arc<AppState>, user: &str) -> Response<Full<Bytes>> {
    match state.store.attendance_history(user).await {
        Ok(days) => json_response(StatusCode::OK, &days),
        Err(e) => {
            error!(user = %user, error = %e, "attendance history failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

/// GET /api/attendance/stats
pub async fn handle_attendance_stats(state: Arc<AppState>, user: &str) -> Response<Full<Bytes>> {
    match state.store.attendance_stats(user).await {
        Ok(stats) => json_response(StatusCode::OK, &stats),
        Err(e) => {
            error!(user = %user, error = %e, "attendance stats failed, returning zeros");
            json_response(
                StatusCode::OK,
                &crate::store::AttendanceStats::default(),
            )
        }
    }
}

//! Meeting endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::server::AppState;

use super::{error_response, json_response, parse_json};

const RECENT_MEETINGS_LIMIT: i64 = 20;

#[derive(Deserialize)]
struct NewMeeting {
    room_name: String,
}

/// POST /api/meetings - build the link and log the meeting
pub async fn handle_meeting_create(
    state: Arc<AppState>,
    user: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let input: NewMeeting = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.store.log_meeting(&input.room_name, user).await {
        Ok(meeting) => json_response(StatusCode::CREATED, &meeting),
        Err(e) => error_response(&e),
    }
}

/// GET /api/meetings/recent
pub async fn handle_meetings_recent(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.recent_meetings(RECENT_MEETINGS_LIMIT).await {
        Ok(meetings) => json_response(StatusCode::OK, &meetings),
        Err(e) => {
            error!(error = %e, "recent meetings failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

//! Assistant endpoint

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::server::AppState;
use crate::types::WaypointError;

use super::{error_response, json_response, parse_json};

#[derive(Deserialize)]
struct Question {
    question: String,
}

/// POST /api/assistant - ask the assistant a question. Never fails:
/// backend trouble falls back to canned guidance.
pub async fn handle_assistant(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let input: Question = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    if input.question.trim().is_empty() {
        return error_response(&WaypointError::InvalidInput(
            "question cannot be empty".into(),
        ));
    }
    let reply = state.assistant.reply(input.question.trim()).await;
    json_response(StatusCode::OK, &reply)
}

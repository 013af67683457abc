//! Chat endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::server::AppState;

use super::{error_response, json_response, parse_json};

/// GET /api/chat/rooms
pub async fn handle_rooms_get(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.list_rooms().await {
        Ok(rooms) => json_response(StatusCode::OK, &rooms),
        Err(e) => {
            error!(error = %e, "room list failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

#[derive(Deserialize)]
struct NewRoom {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

/// POST /api/chat/rooms
pub async fn handle_rooms_post(
    state: Arc<AppState>,
    user: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let input: NewRoom = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state
        .store
        .ensure_room(&input.name, input.description, user)
        .await
    {
        Ok(room) => json_response(StatusCode::CREATED, &room),
        Err(e) => error_response(&e),
    }
}

/// GET /api/chat/rooms/{id}/messages
pub async fn handle_room_messages_get(
    state: Arc<AppState>,
    room_id: &str,
) -> Response<Full<Bytes>> {
    match state.store.room_messages(room_id).await {
        Ok(messages) => json_response(StatusCode::OK, &messages),
        Err(e) => {
            error!(room = %room_id, error = %e, "room messages failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

#[derive(Deserialize)]
struct NewMessage {
    body: String,
}

/// POST /api/chat/rooms/{id}/messages
pub async fn handle_room_messages_post(
    state: Arc<AppState>,
    user: &str,
    room_id: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let input: NewMessage = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state
        .store
        .post_room_message(room_id, user, &input.body)
        .await
    {
        Ok(message) => json_response(StatusCode::CREATED, &message),
        Err(e) => error_response(&e),
    }
}

/// GET /api/chat/direct/{peer} - also marks the thread read
pub async fn handle_direct_get(
    state: Arc<AppState>,
    user: &str,
    peer: &str,
) -> Response<Full<Bytes>> {
    match state.store.direct_thread(user, peer).await {
        Ok(thread) => json_response(StatusCode::OK, &thread),
        Err(e) => error_response(&e),
    }
}

/// POST /api/chat/direct/{peer}
pub async fn handle_direct_post(
    state: Arc<AppState>,
    user: &str,
    peer: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let input: NewMessage = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.store.post_direct_message(user, peer, &input.body).await {
        Ok(message) => json_response(StatusCode::CREATED, &message),
        Err(e) => error_response(&e),
    }
}

/// GET /api/chat/unread
pub async fn handle_unread(state: Arc<AppState>, user: &str) -> Response<Full<Bytes>> {
    let unread = match state.store.unread_count(user).await {
        Ok(count) => count,
        Err(e) => {
            error!(user = %user, error = %e, "unread count failed, returning zero");
            0
        }
    };
    json_response(StatusCode::OK, &serde_json::json!({ "unread": unread }))
}

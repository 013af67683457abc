//! Network allow-list endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::db::schemas::{AllowedNetworksDoc, NetworkEntryKind};
use crate::server::AppState;
use crate::types::WaypointError;

use super::{error_response, json_response, parse_json};

/// GET /api/networks - the current allow-list
pub async fn handle_networks_get(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.allowed_networks().await {
        Ok(doc) => json_response(StatusCode::OK, &doc),
        Err(e) => {
            error!(error = %e, "allow-list read failed, returning empty");
            json_response(StatusCode::OK, &AllowedNetworksDoc::empty())
        }
    }
}

#[derive(Deserialize)]
struct EntryBody {
    kind: String,
    value: String,
}

fn parse_kind(kind: &str) -> Result<NetworkEntryKind, Response<Full<Bytes>>> {
    NetworkEntryKind::parse(kind).ok_or_else(|| {
        error_response(&WaypointError::InvalidInput(format!(
            "unknown entry kind {:?}, expected ssid, ip_exact, ip_prefix or ip_cidr",
            kind
        )))
    })
}

/// POST /api/networks/entries - add one allow-list entry
pub async fn handle_network_entry_add(
    state: Arc<AppState>,
    user: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let input: EntryBody = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let kind = match parse_kind(&input.kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state
        .store
        .add_network_entry(kind, &input.value, user)
        .await
    {
        Ok(doc) => json_response(StatusCode::OK, &doc),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/networks/entries - remove one allow-list entry
pub async fn handle_network_entry_remove(
    state: Arc<AppState>,
    user: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let input: EntryBody = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let kind = match parse_kind(&input.kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    match state
        .store
        .remove_network_entry(kind, &input.value, user)
        .await
    {
        Ok(doc) => json_response(StatusCode::OK, &doc),
        Err(e) => error_response(&e),
    }
}

/// PUT /api/networks - replace the whole allow-list
pub async fn handle_networks_replace(
    state: Arc<AppState>,
    user: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let replacement: AllowedNetworksDoc = match parse_json(body) {
        Ok(replacement) => replacement,
        Err(resp) => return resp,
    };
    match state.store.replace_networks(replacement, user).await {
        Ok(doc) => json_response(StatusCode::OK, &doc),
        Err(e) => error_response(&e),
    }
}

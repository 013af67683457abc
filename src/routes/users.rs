//! User endpoints and roster import

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::db::schemas::UserRole;
use crate::server::AppState;
use crate::types::WaypointError;

use super::{error_response, json_response, parse_json};

/// GET /api/users?role=intern|mentor
pub async fn handle_users_get(state: Arc<AppState>, role: Option<&str>) -> Response<Full<Bytes>> {
    let result = match role {
        Some("intern") => state.store.list_users_by_role(UserRole::Intern).await,
        Some("mentor") => state.store.list_users_by_role(UserRole::Mentor).await,
        Some(other) => {
            return error_response(&WaypointError::InvalidInput(format!(
                "unknown role {:?}",
                other
            )))
        }
        None => state.store.list_users().await,
    };
    match result {
        Ok(users) => json_response(StatusCode::OK, &users),
        Err(e) => {
            error!(error = %e, "user list failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

#[derive(Deserialize)]
struct NewUser {
    email: String,
    name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    college: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
}

/// POST /api/users - create a user, idempotent on email
pub async fn handle_users_post(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let input: NewUser = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let role = match input.role.as_deref() {
        Some("mentor") => UserRole::Mentor,
        Some("intern") | None => UserRole::Intern,
        Some(other) => {
            return error_response(&WaypointError::InvalidInput(format!(
                "unknown role {:?}",
                other
            )))
        }
    };
    match state
        .store
        .ensure_user(&input.email, &input.name, role, input.college, input.skills)
        .await
    {
        Ok(user) => json_response(StatusCode::CREATED, &user),
        Err(e) => error_response(&e),
    }
}

/// POST /api/users/import - CSV roster upload
pub async fn handle_users_import(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    if body.is_empty() {
        return error_response(&WaypointError::InvalidInput(
            "request body must contain CSV data".into(),
        ));
    }
    match state.store.import_roster_csv(body).await {
        Ok(report) => json_response(StatusCode::OK, &report),
        Err(e) => error_response(&e),
    }
}

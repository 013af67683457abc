//! Task and category endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::server::AppState;
use crate::store::NewTask;

use super::{error_response, json_response, parse_json};

/// GET /api/tasks - the caller's task list with gate state
pub async fn handle_tasks_get(state: Arc<AppState>, user: &str) -> Response<Full<Bytes>> {
    match state.store.tasks_for_user(user).await {
        Ok(tasks) => json_response(StatusCode::OK, &tasks),
        Err(e) => {
            error!(user = %user, error = %e, "task list failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

/// POST /api/tasks - create a task
pub async fn handle_tasks_post(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let input: NewTask = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state.store.create_task(input).await {
        Ok(id) => json_response(
            StatusCode::CREATED,
            &serde_json::json!({ "id": id.to_hex() }),
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /api/tasks/{id} - one task with its dependents
pub async fn handle_task_get(state: Arc<AppState>, task_id: &str) -> Response<Full<Bytes>> {
    let task = match state.store.task_by_id(task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            return error_response(&crate::types::WaypointError::NotFound(format!(
                "task {}",
                task_id
            )))
        }
        Err(e) => return error_response(&e),
    };
    let dependents = match state.store.dependents(task_id).await {
        Ok(dependents) => dependents,
        Err(e) => {
            error!(task = %task_id, error = %e, "dependents lookup failed");
            Vec::new()
        }
    };
    json_response(
        StatusCode::OK,
        &serde_json::json!({ "task": task, "dependents": dependents }),
    )
}

/// DELETE /api/tasks/{id}
pub async fn handle_task_delete(state: Arc<AppState>, task_id: &str) -> Response<Full<Bytes>> {
    match state.store.delete_task(task_id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": task_id })),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct PrerequisitesBody {
    prerequisites: Vec<String>,
}

/// PUT /api/tasks/{id}/prerequisites - replace the prerequisite list
pub async fn handle_task_prerequisites(
    state: Arc<AppState>,
    task_id: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let input: PrerequisitesBody = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state
        .store
        .set_prerequisites(task_id, &input.prerequisites)
        .await
    {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "updated": task_id })),
        Err(e) => error_response(&e),
    }
}

/// GET /api/tasks/bottlenecks - tasks the most work is waiting on
pub async fn handle_bottlenecks(state: Arc<AppState>, user_email: &str) -> Response<Full<Bytes>> {
    match state.store.bottlenecks(user_email).await {
        Ok(ranked) => json_response(StatusCode::OK, &ranked),
        Err(e) => {
            error!(error = %e, "bottleneck query failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

/// GET /api/categories
pub async fn handle_categories_get(state: Arc<AppState>) -> Response<Full<Bytes>> {
    match state.store.list_categories().await {
        Ok(categories) => json_response(StatusCode::OK, &categories),
        Err(e) => {
            error!(error = %e, "category list failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

#[derive(Deserialize)]
struct NewCategory {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    color: Option<String>,
}

/// POST /api/categories
pub async fn handle_categories_post(state: Arc<AppState>, body: &[u8]) -> Response<Full<Bytes>> {
    let input: NewCategory = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    match state
        .store
        .create_category(&input.name, &input.description, input.color)
        .await
    {
        Ok(id) => json_response(
            StatusCode::CREATED,
            &serde_json::json!({ "id": id.to_hex() }),
        ),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/categories/{name}
pub async fn handle_category_delete(state: Arc<AppState>, name: &str) -> Response<Full<Bytes>> {
    match state.store.delete_category(name).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": name })),
        Err(e) => error_response(&e),
    }
}

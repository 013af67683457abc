//! Progress, metrics and leaderboard endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::db::schemas::TaskStatus;
use crate::metrics::{PerformanceMetrics, Period};
use crate::server::AppState;
use crate::types::WaypointError;

use super::{error_response, json_response, parse_json};

#[derive(Deserialize)]
struct ProgressBody {
    task_id: String,
    status: String,
    #[serde(default)]
    submission_link: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// POST /api/progress - change a task's status for the caller
pub async fn handle_progress_post(
    state: Arc<AppState>,
    user: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let input: ProgressBody = match parse_json(body) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    let Some(status) = TaskStatus::parse(&input.status) else {
        return error_response(&WaypointError::InvalidInput(format!(
            "unknown status {:?}, expected not_started, in_progress or done",
            input.status
        )));
    };
    match state
        .store
        .set_progress(
            user,
            &input.task_id,
            status,
            input.submission_link,
            input.notes,
        )
        .await
    {
        Ok(record) => json_response(StatusCode::OK, &record),
        Err(e) => error_response(&e),
    }
}

/// GET /api/progress - the caller's progress records
pub async fn handle_progress_get(state: Arc<AppState>, user: &str) -> Response<Full<Bytes>> {
    match state.store.progress_for_user(user).await {
        Ok(records) => json_response(StatusCode::OK, &records),
        Err(e) => {
            error!(user = %user, error = %e, "progress list failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

fn period_from(query: Option<&str>) -> Period {
    query.and_then(Period::parse).unwrap_or(Period::Weekly)
}

/// GET /api/metrics?period=daily|weekly|monthly
pub async fn handle_metrics(
    state: Arc<AppState>,
    user: &str,
    period: Option<&str>,
) -> Response<Full<Bytes>> {
    let period = period_from(period);
    match state.store.performance(user, period).await {
        Ok(metrics) => json_response(StatusCode::OK, &metrics),
        Err(e) => {
            error!(user = %user, error = %e, "metrics failed, returning zeros");
            let empty = PerformanceMetrics {
                user_email: user.to_string(),
                period: Some(period),
                ..Default::default()
            };
            json_response(StatusCode::OK, &empty)
        }
    }
}

/// GET /api/streak
pub async fn handle_streak(state: Arc<AppState>, user: &str) -> Response<Full<Bytes>> {
    let streak = match state.store.streak(user).await {
        Ok(streak) => streak,
        Err(e) => {
            error!(user = %user, error = %e, "streak failed, returning zero");
            0
        }
    };
    json_response(StatusCode::OK, &serde_json::json!({ "streak_days": streak }))
}

/// GET /api/leaderboard?period=
pub async fn handle_leaderboard(
    state: Arc<AppState>,
    period: Option<&str>,
) -> Response<Full<Bytes>> {
    match state.store.leaderboard(period_from(period)).await {
        Ok(entries) => json_response(StatusCode::OK, &entries),
        Err(e) => {
            error!(error = %e, "leaderboard failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

/// GET /api/colleges/leaderboard?period=
pub async fn handle_college_leaderboard(
    state: Arc<AppState>,
    period: Option<&str>,
) -> Response<Full<Bytes>> {
    match state.store.college_leaderboard(period_from(period)).await {
        Ok(standings) => json_response(StatusCode::OK, &standings),
        Err(e) => {
            error!(error = %e, "college leaderboard failed, returning empty");
            json_response(StatusCode::OK, &Vec::<serde_json::Value>::new())
        }
    }
}

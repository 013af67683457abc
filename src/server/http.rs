//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Routing is a flat
//! match over (method, path); handlers live in `crate::routes`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::assistant::Assistant;
use crate::config::Args;
use crate::db::MongoClient;
use crate::db::schemas::AttendanceEvent;
use crate::routes;
use crate::store::Store;
use crate::types::WaypointError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub store: Store,
    pub assistant: Assistant,
}

impl AppState {
    pub fn new(args: Args, mongo: MongoClient, store: Store, assistant: Assistant) -> Self {
        Self {
            args,
            mongo,
            store,
            assistant,
        }
    }
}

/// Accept loop. Runs until the process is stopped.
pub async fn run(state: Arc<AppState>) -> Result<(), WaypointError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Waypoint listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());

    info!("[{}] {} {}", addr, method, path);

    // Caller identity comes from the gateway in front of us
    let user = req
        .headers()
        .get("x-user-email")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let body = if method == Method::GET || method == Method::OPTIONS {
        Bytes::new()
    } else {
        req.into_body().collect().await?.to_bytes()
    };

    let period = query_param(query.as_deref(), "period");
    let role = query_param(query.as_deref(), "role");

    // Routes that act on behalf of a user resolve the identity first
    macro_rules! ctx {
        () => {
            match &user {
                Some(user) => user.as_str(),
                None => {
                    return Ok(to_boxed(bad_request_response(
                        "x-user-email header required",
                    )))
                }
            }
        };
    }

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        // Tasks
        (Method::GET, "/api/tasks") => {
            to_boxed(routes::handle_tasks_get(Arc::clone(&state), ctx!()).await)
        }
        (Method::POST, "/api/tasks") => {
            to_boxed(routes::handle_tasks_post(Arc::clone(&state), &body).await)
        }
        (Method::GET, "/api/tasks/bottlenecks") => {
            to_boxed(routes::handle_bottlenecks(Arc::clone(&state), ctx!()).await)
        }
        (Method::PUT, p) if p.starts_with("/api/tasks/") && p.ends_with("/prerequisites") => {
            let id = p
                .strip_prefix("/api/tasks/")
                .and_then(|rest| rest.strip_suffix("/prerequisites"))
                .unwrap_or("");
            to_boxed(routes::handle_task_prerequisites(Arc::clone(&state), id, &body).await)
        }
        (Method::GET, p) if p.starts_with("/api/tasks/") => {
            let id = p.strip_prefix("/api/tasks/").unwrap_or("");
            to_boxed(routes::handle_task_get(Arc::clone(&state), id).await)
        }
        (Method::DELETE, p) if p.starts_with("/api/tasks/") => {
            let id = p.strip_prefix("/api/tasks/").unwrap_or("");
            to_boxed(routes::handle_task_delete(Arc::clone(&state), id).await)
        }

        // Categories
        (Method::GET, "/api/categories") => {
            to_boxed(routes::handle_categories_get(Arc::clone(&state)).await)
        }
        (Method::POST, "/api/categories") => {
            to_boxed(routes::handle_categories_post(Arc::clone(&state), &body).await)
        }
        (Method::DELETE, p) if p.starts_with("/api/categories/") => {
            let name = p.strip_prefix("/api/categories/").unwrap_or("");
            to_boxed(routes::handle_category_delete(Arc::clone(&state), name).await)
        }

        // Progress and metrics
        (Method::GET, "/api/progress") => {
            to_boxed(routes::handle_progress_get(Arc::clone(&state), ctx!()).await)
        }
        (Method::POST, "/api/progress") => {
            to_boxed(routes::handle_progress_post(Arc::clone(&state), ctx!(), &body).await)
        }
        (Method::GET, "/api/metrics") => {
            to_boxed(routes::handle_metrics(Arc::clone(&state), ctx!(), period.as_deref()).await)
        }
        (Method::GET, "/api/streak") => {
            to_boxed(routes::handle_streak(Arc::clone(&state), ctx!()).await)
        }
        (Method::GET, "/api/leaderboard") => {
            to_boxed(routes::handle_leaderboard(Arc::clone(&state), period.as_deref()).await)
        }
        (Method::GET, "/api/colleges/leaderboard") => {
            to_boxed(
                routes::handle_college_leaderboard(Arc::clone(&state), period.as_deref()).await,
            )
        }

        // Attendance
        (Method::POST, "/api/attendance/check-in") => to_boxed(
            routes::handle_attendance_event(
                Arc::clone(&state),
                ctx!(),
                AttendanceEvent::CheckIn,
                &body,
            )
            .await,
        ),
        (Method::POST, "/api/attendance/check-out") => to_boxed(
            routes::handle_attendance_event(
                Arc::clone(&state),
                ctx!(),
                AttendanceEvent::CheckOut,
                &body,
            )
            .await,
        ),
        (Method::GET, "/api/attendance/today") => {
            to_boxed(routes::handle_attendance_today(Arc::clone(&state), ctx!()).await)
        }
        (Method::GET, "/api/attendance/history") => {
            to_boxed(routes::handle_attendance_history(Arc::clone(&state), ctx!()).await)
        }
        (Method::GET, "/api/attendance/stats") => {
            to_boxed(routes::handle_attendance_stats(Arc::clone(&state), ctx!()).await)
        }

        // Network allow-list
        (Method::GET, "/api/networks") => {
            to_boxed(routes::handle_networks_get(Arc::clone(&state)).await)
        }
        (Method::PUT, "/api/networks") => {
            to_boxed(routes::handle_networks_replace(Arc::clone(&state), ctx!(), &body).await)
        }
        (Method::POST, "/api/networks/entries") => {
            to_boxed(routes::handle_network_entry_add(Arc::clone(&state), ctx!(), &body).await)
        }
        (Method::DELETE, "/api/networks/entries") => {
            to_boxed(routes::handle_network_entry_remove(Arc::clone(&state), ctx!(), &body).await)
        }

        // Chat
        (Method::GET, "/api/chat/rooms") => {
            to_boxed(routes::handle_rooms_get(Arc::clone(&state)).await)
        }
        (Method::POST, "/api/chat/rooms") => {
            to_boxed(routes::handle_rooms_post(Arc::clone(&state), ctx!(), &body).await)
        }
        (Method::GET, p) if p.starts_with("/api/chat/rooms/") && p.ends_with("/messages") => {
            let id = p
                .strip_prefix("/api/chat/rooms/")
                .and_then(|rest| rest.strip_suffix("/messages"))
                .unwrap_or("");
            to_boxed(routes::handle_room_messages_get(Arc::clone(&state), id).await)
        }
        (Method::POST, p) if p.starts_with("/api/chat/rooms/") && p.ends_with("/messages") => {
            let id = p
                .strip_prefix("/api/chat/rooms/")
                .and_then(|rest| rest.strip_suffix("/messages"))
                .unwrap_or("");
            to_boxed(
                routes::handle_room_messages_post(Arc::clone(&state), ctx!(), id, &body).await,
            )
        }
        (Method::GET, "/api/chat/unread") => {
            to_boxed(routes::handle_unread(Arc::clone(&state), ctx!()).await)
        }
        (Method::GET, p) if p.starts_with("/api/chat/direct/") => {
            let peer = p.strip_prefix("/api/chat/direct/").unwrap_or("");
            to_boxed(routes::handle_direct_get(Arc::clone(&state), ctx!(), peer).await)
        }
        (Method::POST, p) if p.starts_with("/api/chat/direct/") => {
            let peer = p.strip_prefix("/api/chat/direct/").unwrap_or("");
            to_boxed(routes::handle_direct_post(Arc::clone(&state), ctx!(), peer, &body).await)
        }

        // Meetings
        (Method::POST, "/api/meetings") => {
            to_boxed(routes::handle_meeting_create(Arc::clone(&state), ctx!(), &body).await)
        }
        (Method::GET, "/api/meetings/recent") => {
            to_boxed(routes::handle_meetings_recent(Arc::clone(&state)).await)
        }

        // Users
        (Method::GET, "/api/users") => {
            to_boxed(routes::handle_users_get(Arc::clone(&state), role.as_deref()).await)
        }
        (Method::POST, "/api/users") => {
            to_boxed(routes::handle_users_post(Arc::clone(&state), &body).await)
        }
        (Method::POST, "/api/users/import") => {
            to_boxed(routes::handle_users_import(Arc::clone(&state), &body).await)
        }

        // Assistant
        (Method::POST, "/api/assistant") => {
            to_boxed(routes::handle_assistant(Arc::clone(&state), &body).await)
        }

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// First value of a query parameter, percent-decoding skipped (values
/// here are plain tokens)
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Bad request response
fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Bad Request",
        "message": message
    });

    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_finds_first_match() {
        assert_eq!(
            query_param(Some("period=daily&role=intern"), "period").as_deref(),
            Some("daily")
        );
        assert_eq!(
            query_param(Some("period=daily"), "role"),
            None
        );
        assert_eq!(query_param(None, "period"), None);
    }
}

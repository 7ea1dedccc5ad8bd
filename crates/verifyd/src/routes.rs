//! HTTP routes
//!
//! Thin adapters between axum and the `Verifier`. Bodies are taken as raw
//! bytes so decode failures answer 400 with a JSON error instead of axum's
//! default rejection.
//!
//! | Route              | Caller      | Answers                          |
//! |--------------------|-------------|----------------------------------|
//! | `POST /worker`     | clients     | 200 record, 400, 500             |
//! | `POST /challenge`  | task queue  | 200, 404, 500, 502, 400          |
//! | `GET /healthz`     | probes      | 200 `ok`                         |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::warn;

use verifly_core::{CheckOutcome, VerificationRecord, Verifier};

#[derive(Clone)]
struct AppState {
    verifier: Arc<Verifier>,
}

/// Build the router, serving checks on `task_path`
///
/// `task_path` must have passed `SchedulerConfig::validate`, which keeps it
/// clear of the other routes.
pub fn router(verifier: Arc<Verifier>, task_path: &str) -> Router {
    Router::new()
        .route("/worker", post(submit))
        .route(task_path, post(check))
        .route("/healthz", get(healthz))
        .with_state(AppState { verifier })
}

async fn submit(State(state): State<AppState>, body: Bytes) -> Response {
    let record = match VerificationRecord::from_json(&body) {
        Ok(record) => record,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };

    match state.verifier.submit(record).await {
        Ok(submission) => (StatusCode::OK, Json(submission.record)).into_response(),
        Err(e) if e.is_client_error() => error_response(StatusCode::BAD_REQUEST, &e),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
    }
}

async fn check(State(state): State<AppState>, body: Bytes) -> Response {
    let record = match VerificationRecord::from_json(&body) {
        Ok(record) => record,
        Err(e) => {
            warn!("Rejected undecodable check task: {}", e);
            return error_response(StatusCode::BAD_REQUEST, &e);
        }
    };

    let outcome = state.verifier.perform_check(record).await;
    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match outcome {
        CheckOutcome::CheckFailed { error, .. } => error_response(status, &error),
        outcome => (status, Json(outcome.record().clone())).into_response(),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

fn error_response(status: StatusCode, error: &verifly_core::Error) -> Response {
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

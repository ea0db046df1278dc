//! Request handlers.
//!
//! Every request that is not an operational `/_edge` route goes through
//! [`render`], which hands it to the dispatcher. Delegate failures are
//! turned into HTTP errors here, at the hosting layer.

use std::error::Error as StdError;
use std::time::Instant;

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crag_edge_common::{RenderResponse, RuntimeError};

use crate::request::from_parts;
use crate::response::IntoAxumResponse;
use crate::state::AppState;

/// Render a request through the dispatcher.
///
/// This handler:
/// 1. Buffers the body up to the configured cap (413 past it, 400 if the
///    body stream fails)
/// 2. Converts the request without changing it
/// 3. Awaits the dispatcher's outcome
/// 4. Returns the rendered response, or an error response on failure
#[instrument(
    skip_all,
    fields(
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        uri = %request.uri(),
    )
)]
pub async fn render(State(state): State<AppState>, request: Request) -> Response<Body> {
    let start = Instant::now();
    let limit = state.max_body_bytes();

    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        warn!(limit, "Request body too large");
        return body_too_large(limit);
    }

    let body = match to_bytes(body, limit).await {
        Ok(body) => body,
        Err(e) if exceeds_limit(&e) => {
            warn!(limit, "Request body too large");
            return body_too_large(limit);
        }
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return RenderResponse::error(400, "Failed to read request body").into_axum_response();
        }
    };

    let result = state.dispatcher().serve(from_parts(&parts, body)).await;
    let duration = start.elapsed();

    match result {
        Ok(response) => {
            info!(
                status = response.status,
                duration_ms = duration.as_millis(),
                "Request rendered"
            );
            response.into_axum_response()
        }
        Err(e) => {
            error!(
                error = %e,
                duration_ms = duration.as_millis(),
                "Render failed"
            );
            error_to_response(&e).into_axum_response()
        }
    }
}

/// Whether a body error was caused by the size cap rather than the stream.
fn exceeds_limit(error: &axum::Error) -> bool {
    std::iter::successors(Some(error as &(dyn StdError + 'static)), |e| (*e).source())
        .any(|e| e.is::<LengthLimitError>())
}

fn body_too_large(limit: usize) -> Response<Body> {
    RenderResponse::error(413, &format!("Request body exceeds {limit} bytes")).into_axum_response()
}

/// Convert a delegate failure to an HTTP response.
fn error_to_response(error: &RuntimeError) -> RenderResponse {
    match error {
        RuntimeError::FuelExhausted => {
            RenderResponse::error(429, "Execution limit exceeded: fuel exhausted")
        }
        RuntimeError::ExecutionTimeout { duration_ms } => {
            RenderResponse::error(504, &format!("Execution timeout after {duration_ms}ms"))
        }
        RuntimeError::MemoryLimitExceeded { limit_mb } => {
            RenderResponse::error(507, &format!("Memory limit exceeded: {limit_mb}MB"))
        }
        _ => RenderResponse::error(500, "Internal server error"),
    }
}

/// Health check handler.
///
/// Returns 200 OK if the server is running.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ready",
        "bundle": state.bundle_hash(),
    });

    (StatusCode::OK, axum::Json(body))
}

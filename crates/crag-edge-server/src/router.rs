//! HTTP router configuration.
//!
//! This module provides functions to build the Axum router with all
//! necessary routes and middleware.

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{health_check, readiness_check, render};
use crate::state::AppState;

/// Prefix of the routes the edge host answers itself.
pub const OPERATIONAL_PREFIX: &str = "/_edge";

/// Build the main application router.
///
/// Routes:
/// - `GET /_edge/health` - Health check
/// - `GET /_edge/ready` - Readiness check
/// - anything else - Rendered by the dispatcher
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let operational_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check));

    Router::new()
        .nest(OPERATIONAL_PREFIX, operational_routes)
        .fallback(render)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use crag_edge_common::{RenderRequest, RenderResponse, RuntimeError};
    use tower::util::ServiceExt;

    use crate::dispatcher::RenderOutcome;
    use crate::response::IntoAxumResponse;

    fn site(request: RenderRequest) -> RenderOutcome {
        RenderOutcome::pending(async move {
            match request.path() {
                "/" => Ok(RenderResponse::html(200, "<main>Crags</main>")),
                "/echo" => Ok(RenderResponse::text(
                    200,
                    &format!(
                        "{} {}",
                        request.method,
                        String::from_utf8_lossy(request.body.as_deref().unwrap_or_default())
                    ),
                )),
                "/slow" => Err(RuntimeError::ExecutionTimeout { duration_ms: 5000 }),
                "/broken" => Err(RuntimeError::trap("unreachable")),
                _ => Ok(RenderResponse::html(404, "<main>Not found</main>")),
            }
        })
    }

    fn setup_router() -> Router {
        let state = AppState::new(Arc::new(site)).with_max_body_bytes(64);
        build_router(state, Duration::from_secs(30))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_edge/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_check() {
        let app = setup_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_edge/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "ready");
        assert!(body["bundle"].is_null());
    }

    #[tokio::test]
    async fn test_index_is_rendered() {
        let app = setup_router();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/html; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "<main>Crags</main>");
    }

    #[tokio::test]
    async fn test_missing_route_is_rendered_404() {
        let app = setup_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/missing-route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "<main>Not found</main>");
    }

    #[tokio::test]
    async fn test_body_is_forwarded() {
        let app = setup_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from("q=Frankenjura"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "POST q=Frankenjura");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let app = setup_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from(vec![b'x'; 65]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_delegate_timeout_is_504() {
        let app = setup_router();

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_delegate_trap_is_500() {
        let app = setup_router();

        let response = app
            .oneshot(Request::builder().uri("/broken").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            r#"{"error":"Internal server error"}"#
        );
    }

    #[tokio::test]
    async fn test_failing_body_stream_is_400() {
        let app = setup_router();
        let stream = futures_util::stream::iter(vec![
            Ok(bytes::Bytes::from_static(b"q=Frank")),
            Err(std::io::Error::other("client went away")),
        ]);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from_stream(stream))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_string(response).await,
            r#"{"error":"Failed to read request body"}"#
        );
    }

    #[tokio::test]
    async fn test_cors_requests_reach_the_handler_untouched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = move |_request: RenderRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            RenderOutcome::ready(
                RenderResponse::text(405, "Method not allowed").with_header("allow", "GET"),
            )
        };
        let app = build_router(AppState::new(Arc::new(handler)), Duration::from_secs(30));

        let preflight = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/zones")
                    .header("origin", "https://crags.example")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let get = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "https://crags.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let expected = RenderResponse::text(405, "Method not allowed")
            .with_header("allow", "GET")
            .into_axum_response();
        for response in [preflight, get] {
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.headers(), expected.headers());
        }
    }
}

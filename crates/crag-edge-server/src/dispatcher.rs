//! Edge request dispatcher.
//!
//! The dispatcher is a thin adapter: it hands each inbound request, as is,
//! to an injected [`RenderHandler`] and returns whatever that handler
//! produces. The handler may answer right away ([`RenderOutcome::Ready`]) or
//! with work still in flight ([`RenderOutcome::Pending`]); callers await
//! both the same way.
//!
//! ```ignore
//! let dispatcher = EdgeDispatcher::new(Arc::new(|request: RenderRequest| {
//!     RenderOutcome::ready(RenderResponse::html(200, "<main></main>"))
//! }));
//!
//! let response = dispatcher.dispatch(request).await?;
//! ```

use std::fmt;
use std::future::IntoFuture;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crag_edge_common::{RenderRequest, RenderResponse, RuntimeError};
use crag_edge_core::{BundleRunner, CompiledBundle};

/// A render that has not settled yet.
pub type RenderFuture =
    Pin<Box<dyn Future<Output = Result<RenderResponse, RuntimeError>> + Send + 'static>>;

/// The injected handler reference.
pub type SharedRenderHandler = Arc<dyn RenderHandler>;

/// What a [`RenderHandler`] returns: a response, or a pending computation
/// resolving to one.
pub enum RenderOutcome {
    /// The handler settled synchronously.
    Ready(Result<RenderResponse, RuntimeError>),
    /// The handler settles later.
    Pending(RenderFuture),
}

impl RenderOutcome {
    /// A settled, successful outcome.
    pub fn ready(response: RenderResponse) -> Self {
        Self::Ready(Ok(response))
    }

    /// A settled, failed outcome.
    pub fn failed(error: RuntimeError) -> Self {
        Self::Ready(Err(error))
    }

    /// Wrap a future as a pending outcome.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<RenderResponse, RuntimeError>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }

    /// Whether the outcome is already settled.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Wait for the outcome to settle.
    pub async fn resolve(self) -> Result<RenderResponse, RuntimeError> {
        self.await
    }
}

impl IntoFuture for RenderOutcome {
    type Output = Result<RenderResponse, RuntimeError>;
    type IntoFuture = RenderFuture;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(result) => Box::pin(std::future::ready(result)),
            Self::Pending(future) => future,
        }
    }
}

impl fmt::Debug for RenderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Anything that turns a request into a (possibly pending) response.
///
/// Closures with the right signature are handlers too, which keeps stubs in
/// tests to a single line.
pub trait RenderHandler: Send + Sync + 'static {
    /// Produce the response for `request`.
    fn render(&self, request: RenderRequest) -> RenderOutcome;
}

impl<F> RenderHandler for F
where
    F: Fn(RenderRequest) -> RenderOutcome + Send + Sync + 'static,
{
    fn render(&self, request: RenderRequest) -> RenderOutcome {
        self(request)
    }
}

/// Forwards requests to the injected handler, unchanged.
///
/// Cloning is cheap; every clone shares the same handler.
#[derive(Clone)]
pub struct EdgeDispatcher {
    handler: SharedRenderHandler,
}

impl EdgeDispatcher {
    /// Create a dispatcher around `handler`.
    pub fn new(handler: SharedRenderHandler) -> Self {
        Self { handler }
    }

    /// Hand `request` to the handler and return its outcome untouched.
    pub fn dispatch(&self, request: RenderRequest) -> RenderOutcome {
        self.handler.render(request)
    }

    /// Dispatch and wait for the outcome to settle.
    ///
    /// # Errors
    ///
    /// Whatever the handler fails with, unchanged.
    pub async fn serve(&self, request: RenderRequest) -> Result<RenderResponse, RuntimeError> {
        self.dispatch(request).await
    }
}

impl fmt::Debug for EdgeDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeDispatcher").finish_non_exhaustive()
    }
}

/// Renders every request with the prebuilt SSR bundle.
///
/// Always returns [`RenderOutcome::Pending`]: the render runs when the
/// outcome is awaited.
#[derive(Clone)]
pub struct WasmRenderHandler {
    runner: Arc<BundleRunner>,
    bundle: Arc<CompiledBundle>,
}

impl WasmRenderHandler {
    /// Create a handler for `bundle`, run with `runner`.
    pub fn new(runner: Arc<BundleRunner>, bundle: Arc<CompiledBundle>) -> Self {
        Self { runner, bundle }
    }

    /// Content hash of the bundle being served.
    pub fn bundle_hash(&self) -> &str {
        self.bundle.content_hash()
    }
}

impl RenderHandler for WasmRenderHandler {
    fn render(&self, request: RenderRequest) -> RenderOutcome {
        let runner = Arc::clone(&self.runner);
        let bundle = Arc::clone(&self.bundle);
        let render_id = Uuid::new_v4().to_string();

        debug!(render_id = %render_id, uri = %request.uri, "Scheduling bundle render");

        RenderOutcome::pending(async move {
            runner
                .render(&bundle, &request, render_id)
                .await
                .map(|output| output.response)
        })
    }
}

impl fmt::Debug for WasmRenderHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmRenderHandler")
            .field("bundle_hash", &self.bundle.content_hash())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    /// Mirrors the request back so the response proves what the handler saw.
    fn echo(request: RenderRequest) -> RenderResponse {
        let mut response = RenderResponse::text(200, &format!("{} {}", request.method, request.uri));
        response.headers.extend(request.headers);
        response.body.extend(request.body.unwrap_or_default());
        response
    }

    /// Stub handler for a tiny site: `/` renders, everything else is a 404.
    fn site(request: RenderRequest) -> RenderOutcome {
        let response = if request.path() == "/" {
            RenderResponse::html(200, "<!doctype html><main>Crags</main>")
        } else {
            RenderResponse::html(404, "<!doctype html><main>Not found</main>")
        };
        RenderOutcome::pending(async move { Ok(response) })
    }

    #[derive(Debug, thiserror::Error)]
    #[error("upstream zone API unreachable")]
    struct UpstreamDown;

    #[tokio::test]
    async fn test_pass_through_equivalence() {
        let dispatcher = EdgeDispatcher::new(Arc::new(|r: RenderRequest| RenderOutcome::ready(echo(r))));

        let requests = [
            RenderRequest::new("GET", "/"),
            RenderRequest::new("GET", "/zones/7?tab=parking").with_header("Accept", "text/html"),
            RenderRequest::new("POST", "/search")
                .with_header("content-type", "application/json")
                .with_header("X-Dup", "a")
                .with_header("x-dup", "b")
                .with_body(r#"{"q":"Frankenjura"}"#),
            RenderRequest::new("DELETE", "/favorites/3").with_body(vec![0u8, 159, 146, 150]),
        ];

        for request in requests {
            let direct = echo(request.clone());
            let dispatched = dispatcher.serve(request).await.unwrap();
            assert_eq!(dispatched, direct);
        }
    }

    #[tokio::test]
    async fn test_request_reaches_handler_unchanged() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let dispatcher = EdgeDispatcher::new(Arc::new(move |r: RenderRequest| {
            recorder.lock().unwrap().push(r);
            RenderOutcome::ready(RenderResponse::text(204, ""))
        }));

        let request = RenderRequest::new("PUT", "/parking/12")
            .with_header("Authorization", "Bearer t")
            .with_body("capacity=20");
        dispatcher.serve(request.clone()).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), &[request]);
    }

    #[tokio::test]
    async fn test_index_renders_verbatim() {
        let dispatcher = EdgeDispatcher::new(Arc::new(site));

        let response = dispatcher.serve(RenderRequest::new("GET", "/")).await.unwrap();

        assert_eq!(response, site_response("/").await);
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_missing_route_is_404_verbatim() {
        let dispatcher = EdgeDispatcher::new(Arc::new(site));

        let response = dispatcher
            .serve(RenderRequest::new("GET", "/missing-route"))
            .await
            .unwrap();

        assert_eq!(response, site_response("/missing-route").await);
        assert_eq!(response.status, 404);
    }

    async fn site_response(uri: &str) -> RenderResponse {
        site(RenderRequest::new("GET", uri)).await.unwrap()
    }

    #[tokio::test]
    async fn test_pending_rejection_keeps_error() {
        let dispatcher = EdgeDispatcher::new(Arc::new(|_r: RenderRequest| {
            RenderOutcome::pending(async { Err(RuntimeError::delegate(UpstreamDown)) })
        }));

        let outcome = dispatcher.dispatch(RenderRequest::new("GET", "/zones"));
        assert!(!outcome.is_ready());

        let error = outcome.await.unwrap_err();
        let RuntimeError::Delegate(source) = error else {
            panic!("expected delegate error, got {error:?}");
        };
        assert!(source.downcast_ref::<UpstreamDown>().is_some());
        assert_eq!(source.to_string(), "upstream zone API unreachable");
    }

    #[tokio::test]
    async fn test_runtime_errors_pass_through() {
        let dispatcher = EdgeDispatcher::new(Arc::new(|_r: RenderRequest| {
            RenderOutcome::failed(RuntimeError::ExecutionTimeout { duration_ms: 5000 })
        }));

        let result = dispatcher.serve(RenderRequest::new("GET", "/")).await;

        assert!(matches!(
            result,
            Err(RuntimeError::ExecutionTimeout { duration_ms: 5000 })
        ));
    }

    #[test]
    fn test_ready_outcome_is_returned_untouched() {
        let dispatcher = EdgeDispatcher::new(Arc::new(|_r: RenderRequest| {
            RenderOutcome::ready(RenderResponse::text(200, "sync"))
        }));

        let outcome = dispatcher.dispatch(RenderRequest::new("GET", "/"));
        assert!(outcome.is_ready());

        let response = tokio_test::block_on(outcome.resolve()).unwrap();
        assert_eq!(response.body, b"sync");
    }

    #[test]
    fn test_struct_handler() {
        struct Maintenance;

        impl RenderHandler for Maintenance {
            fn render(&self, _request: RenderRequest) -> RenderOutcome {
                RenderOutcome::ready(RenderResponse::text(503, "maintenance"))
            }
        }

        let dispatcher = EdgeDispatcher::new(Arc::new(Maintenance));
        let response = tokio_test::block_on(dispatcher.serve(RenderRequest::new("GET", "/"))).unwrap();
        assert_eq!(response.status, 503);
    }
}

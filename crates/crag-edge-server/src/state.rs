//! Shared application state.
//!
//! This module provides [`AppState`], which holds shared resources
//! across all HTTP request handlers.

use std::sync::Arc;

use crag_edge_common::{ExecutionConfig, RuntimeError};
use crag_edge_core::{CompiledBundle, WasmEngine};
use crag_edge_host::create_bundle_runner;

use crate::dispatcher::{EdgeDispatcher, SharedRenderHandler, WasmRenderHandler};

/// Default cap on buffered request bodies (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state across all request handlers.
///
/// This struct is cloned for each request, so it uses `Arc` for shared data.
#[derive(Clone)]
pub struct AppState {
    /// Dispatcher wrapping the render handler.
    dispatcher: EdgeDispatcher,

    /// Content hash of the served bundle, if the handler is a bundle.
    bundle_hash: Option<Arc<str>>,

    /// Largest request body buffered before rendering.
    max_body_bytes: usize,
}

impl AppState {
    /// Create state around an arbitrary render handler.
    pub fn new(handler: SharedRenderHandler) -> Self {
        Self {
            dispatcher: EdgeDispatcher::new(handler),
            bundle_hash: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Create state that renders every request with `bundle`.
    ///
    /// # Arguments
    ///
    /// * `engine` - The engine `bundle` was compiled with
    /// * `bundle` - The prebuilt SSR bundle
    /// * `exec_config` - Per-render limits
    ///
    /// # Errors
    ///
    /// Returns an error if host function registration fails.
    pub fn for_bundle(
        engine: &WasmEngine,
        bundle: CompiledBundle,
        exec_config: ExecutionConfig,
    ) -> Result<Self, RuntimeError> {
        let runner = Arc::new(create_bundle_runner(engine, exec_config)?);
        let handler = WasmRenderHandler::new(runner, Arc::new(bundle));
        let bundle_hash = Arc::from(handler.bundle_hash());

        let mut state = Self::new(Arc::new(handler));
        state.bundle_hash = Some(bundle_hash);
        Ok(state)
    }

    /// Set the request body cap.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Get the dispatcher.
    pub fn dispatcher(&self) -> &EdgeDispatcher {
        &self.dispatcher
    }

    /// Content hash of the served bundle.
    pub fn bundle_hash(&self) -> Option<&str> {
        self.bundle_hash.as_deref()
    }

    /// Largest request body buffered before rendering.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bundle_hash", &self.bundle_hash)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crag_edge_common::{EngineConfig, RenderRequest, RenderResponse};

    use crate::dispatcher::RenderOutcome;

    #[test]
    fn test_app_state_with_stub_handler() {
        let state = AppState::new(Arc::new(|_r: RenderRequest| {
            RenderOutcome::ready(RenderResponse::text(200, "OK"))
        }));

        assert!(state.bundle_hash().is_none());
        assert_eq!(state.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
        assert_eq!(state.with_max_body_bytes(10).max_body_bytes(), 10);
    }

    #[test]
    fn test_app_state_for_bundle() {
        let engine = WasmEngine::new(&EngineConfig {
            pooling_allocator: false,
            ..Default::default()
        })
        .unwrap();
        let wat = r#"(module (memory (export "memory") 1) (func (export "_start")))"#;
        let bundle = CompiledBundle::from_wat(engine.inner(), wat).unwrap();
        let hash = bundle.content_hash().to_string();

        let state = AppState::for_bundle(&engine, bundle, ExecutionConfig::default()).unwrap();
        assert_eq!(state.bundle_hash(), Some(hash.as_str()));
    }
}

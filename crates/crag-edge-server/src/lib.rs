//! Edge request dispatcher and HTTP server for crag-edge.
//!
//! Every inbound request is handed, unchanged, to a render handler (usually
//! the prebuilt SSR bundle) and its response is returned as is:
//!
//! - [`dispatcher`]: the pass-through [`EdgeDispatcher`] and the
//!   [`RenderHandler`] seam
//! - HTTP request/response conversion
//! - Operational health and readiness routes under `/_edge`
//!
//! # Quick Start
//!
//! ```ignore
//! use crag_edge_common::RuntimeConfig;
//! use crag_edge_core::{CompiledBundle, WasmEngine};
//! use crag_edge_server::{EdgeServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime_config = RuntimeConfig::default();
//!     let engine = WasmEngine::new(&runtime_config.engine)?;
//!     let bundle = CompiledBundle::from_file(engine.inner(), "dist/server.wasm")?;
//!
//!     let server = EdgeServer::for_bundle(
//!         engine,
//!         bundle,
//!         runtime_config.execution,
//!         ServerConfig::default(),
//!     )?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dispatcher;
pub mod handler;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

pub use dispatcher::{
    EdgeDispatcher, RenderFuture, RenderHandler, RenderOutcome, SharedRenderHandler,
    WasmRenderHandler,
};
pub use server::{EdgeServer, ServerConfig, TestHandle};
pub use state::AppState;

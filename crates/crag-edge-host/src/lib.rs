//! Host functions for the SSR bundle sandbox.
//!
//! The bundle sees exactly two host interfaces:
//!
//! - WASI preview1, backed by in-memory stdio pipes only (no files, no
//!   environment, no sockets)
//! - [`logging`]: `env.log` for structured logs from guest code
//!
//! Use [`create_bundle_runner`] to get a [`crag_edge_core::BundleRunner`]
//! with both registered.

pub mod linker;
pub mod logging;

pub use linker::{create_bundle_runner, register_all};
pub use logging::LoggingHost;

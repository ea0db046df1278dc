//! Wasmtime sandbox for the prebuilt SSR bundle.
//!
//! This crate runs the server-rendering bundle produced by the frontend
//! build, once per request, inside a restricted WebAssembly sandbox:
//! - [`WasmEngine`]: Configured Wasmtime engine with pooling allocator
//! - [`CompiledBundle`]: The compiled bundle, shared by all renders
//! - [`RenderContext`]: Per-render sandbox state (stdio pipes, logs, limits)
//! - [`BundleRunner`]: Render lifecycle management
//!
//! # Bundle ABI
//!
//! The bundle is a WASI preview1 command. The host writes the request as a
//! JSON document to stdin, runs `_start`, and reads a JSON response document
//! from stdout:
//!
//! ```text
//! stdin:  {"method":"GET","uri":"/zones/7","headers":[["accept","text/html"]]}
//! stdout: {"status":200,"headers":[["content-type","text/html"]],"body":"<!doctype html>..."}
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     WasmEngine                          │
//! │  (Shared across all requests, thread-safe)              │
//! │  - Pooling Allocator                                    │
//! │  - Epoch ticker                                         │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                   CompiledBundle                        │
//! │  (Loaded once at startup)                               │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │            Store<RenderContext> + Instance              │
//! │  (Per-request, isolated)                                │
//! │  - Fuel, memory and deadline limits                     │
//! │  - stdin/stdout/stderr pipes                            │
//! │  - Guest logs and metrics                               │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod bundle;
pub mod engine;
pub mod runner;
pub mod store;

pub use bundle::CompiledBundle;
pub use engine::{EpochTicker, WasmEngine};
pub use runner::{BundleRunner, RenderOutput};
pub use store::{ExecutionMetrics, LogEntry, LogLevel, MemoryLimitHit, RenderContext};

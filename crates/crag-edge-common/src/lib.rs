//! Common types, errors, and configuration for crag-edge.
//!
//! This crate provides shared functionality used across the crag-edge workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for the SSR sandbox and config file
//! - The request/response values exchanged with render handlers

pub mod config;
pub mod config_file;
pub mod error;
pub mod http;

pub use config::{EngineConfig, ExecutionConfig, RuntimeConfig};
pub use config_file::{BundleConfig, ConfigFile, ConfigFileError, ServerConfigFile};
pub use error::{BundleError, RuntimeError};
pub use http::{RenderRequest, RenderResponse};

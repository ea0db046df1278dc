//! Error types for crag-edge.
//!
//! This module defines a hierarchy of error types using `thiserror`:
//! - [`RuntimeError`]: Top-level errors, including every delegate failure
//!   raised while rendering a request
//! - [`BundleError`]: Violations of the SSR bundle ABI (stdin/stdout contract)

use std::io;

use thiserror::Error;

/// Top-level runtime errors.
///
/// A render handler reports failures as a `RuntimeError`. The dispatcher
/// never inspects or rewrites them; the HTTP layer decides how each variant
/// is surfaced to the client.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// WebAssembly compilation of the SSR bundle failed.
    #[error("Compilation failed: {reason}")]
    CompilationFailed {
        /// Description of the compilation failure.
        reason: String,
    },

    /// Rendering exceeded the configured deadline.
    #[error("Execution timeout after {duration_ms}ms")]
    ExecutionTimeout {
        /// The timeout duration in milliseconds.
        duration_ms: u64,
    },

    /// Rendering exhausted the configured fuel limit.
    #[error("Fuel exhausted: CPU limit exceeded")]
    FuelExhausted,

    /// Linear memory growth exceeded the configured limit.
    #[error("Memory limit exceeded: {limit_mb}MB")]
    MemoryLimitExceeded {
        /// The memory limit in megabytes.
        limit_mb: u32,
    },

    /// The bundle broke its I/O contract with the host.
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A WebAssembly trap occurred while rendering.
    #[error("Wasm trap: {message}")]
    Trap {
        /// Description of the trap.
        message: String,
    },

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Any other failure raised by an injected render handler.
    #[error("Render handler failed: {0}")]
    Delegate(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the SSR bundle's I/O contract.
///
/// The bundle receives a JSON request on stdin and must print a JSON
/// response on stdout. Anything else ends up here.
#[derive(Error, Debug)]
pub enum BundleError {
    /// The bundle could not be instantiated, e.g. an import has no host
    /// definition.
    #[error("Instantiation failed: {reason}")]
    Instantiation {
        /// Description of the instantiation failure.
        reason: String,
    },

    /// The bundle does not export the expected entry point.
    #[error("Entry point '{name}' not exported")]
    EntryPointMissing {
        /// Name of the missing export.
        name: String,
    },

    /// The request could not be encoded for the bundle.
    #[error("Failed to encode request: {reason}")]
    RequestEncoding {
        /// Description of the encoding failure.
        reason: String,
    },

    /// The bundle's stdout was not a valid response document.
    #[error("Invalid response from bundle: {reason}")]
    InvalidResponse {
        /// Description of the decoding failure.
        reason: String,
    },

    /// The bundle called `proc_exit` with a non-zero status.
    #[error("Bundle exited with status {code}")]
    NonZeroExit {
        /// The exit status reported by the guest.
        code: i32,
    },

    /// The WASI context for the bundle could not be prepared.
    #[error("WASI setup failed: {reason}")]
    WasiSetup {
        /// Description of the setup failure.
        reason: String,
    },
}

impl RuntimeError {
    /// Create a new `CompilationFailed` error.
    pub fn compilation_failed(reason: impl Into<String>) -> Self {
        Self::CompilationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `Trap` error.
    pub fn trap(message: impl Into<String>) -> Self {
        Self::Trap {
            message: message.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Wrap an arbitrary handler error.
    pub fn delegate(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Delegate(error.into())
    }

    /// Returns `true` if this error indicates a resource limit was exceeded.
    pub fn is_resource_limit(&self) -> bool {
        matches!(
            self,
            Self::FuelExhausted | Self::MemoryLimitExceeded { .. } | Self::ExecutionTimeout { .. }
        )
    }
}

impl BundleError {
    /// Create a new `InvalidResponse` error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::trap("unreachable");
        assert_eq!(err.to_string(), "Wasm trap: unreachable");

        let err = RuntimeError::FuelExhausted;
        assert_eq!(err.to_string(), "Fuel exhausted: CPU limit exceeded");
    }

    #[test]
    fn test_error_from_bundle() {
        let bundle_err = BundleError::NonZeroExit { code: 3 };
        let runtime_err: RuntimeError = bundle_err.into();

        assert!(matches!(
            runtime_err,
            RuntimeError::Bundle(BundleError::NonZeroExit { code: 3 })
        ));
        assert_eq!(
            runtime_err.to_string(),
            "Bundle error: Bundle exited with status 3"
        );
    }

    #[test]
    fn test_instantiation_is_not_a_compile_error() {
        let err: RuntimeError = BundleError::Instantiation {
            reason: "unknown import `env::fetch`".into(),
        }
        .into();

        assert!(!matches!(err, RuntimeError::CompilationFailed { .. }));
        assert_eq!(
            err.to_string(),
            "Bundle error: Instantiation failed: unknown import `env::fetch`"
        );
    }

    #[test]
    fn test_delegate_keeps_source() {
        let err = RuntimeError::delegate("upstream weather API unavailable");

        assert_eq!(
            err.to_string(),
            "Render handler failed: upstream weather API unavailable"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "upstream weather API unavailable");
    }

    #[test]
    fn test_is_resource_limit() {
        assert!(RuntimeError::FuelExhausted.is_resource_limit());
        assert!(RuntimeError::MemoryLimitExceeded { limit_mb: 128 }.is_resource_limit());
        assert!(RuntimeError::ExecutionTimeout { duration_ms: 100 }.is_resource_limit());
        assert!(!RuntimeError::trap("boom").is_resource_limit());
        assert!(!RuntimeError::delegate("boom").is_resource_limit());
    }
}

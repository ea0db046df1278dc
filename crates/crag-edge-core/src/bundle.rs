//! Loading the prebuilt SSR bundle.
//!
//! The bundle is produced by a separate frontend build and shipped as a
//! WebAssembly command module. [`CompiledBundle`] wraps the compiled
//! Wasmtime [`Module`] together with a content hash that identifies the
//! build being served.
//!
//! # Loading Strategies
//!
//! - **JIT**: Compile from `.wasm` bytes at startup
//! - **AOT**: Deserialize a `.cwasm` artifact precompiled by the same
//!   Wasmtime version (fast cold start)

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, instrument};
use wasmtime::{Engine, Module};

use crag_edge_common::RuntimeError;

/// Entry point every bundle must export (WASI command convention).
pub const ENTRY_POINT: &str = "_start";

/// A compiled SSR bundle.
///
/// Cheap to clone; the compiled code is shared.
#[derive(Clone)]
pub struct CompiledBundle {
    module: Module,

    /// Hash of the original bytes (or file stem for precompiled artifacts).
    content_hash: String,
}

impl CompiledBundle {
    /// Compile a bundle from WebAssembly bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid core module.
    #[instrument(skip(engine, bytes), fields(bytes_len = bytes.len()))]
    pub fn from_bytes(engine: &Engine, bytes: &[u8]) -> Result<Self, RuntimeError> {
        let start = Instant::now();

        Self::validate_wasm_header(bytes)?;

        let module = Module::new(engine, bytes).map_err(|e| {
            RuntimeError::compilation_failed(format!("Bundle compilation failed: {e}"))
        })?;

        let content_hash = compute_hash(bytes);

        info!(
            content_hash = %content_hash,
            duration_ms = start.elapsed().as_millis(),
            "SSR bundle compiled"
        );

        Ok(Self {
            module,
            content_hash,
        })
    }

    /// Read and compile a `.wasm` bundle from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or compiled.
    pub fn from_file(engine: &Engine, path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let bytes = std::fs::read(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "SSR bundle read");
        Self::from_bytes(engine, &bytes)
    }

    /// Load a precompiled bundle from disk.
    ///
    /// # Safety
    ///
    /// Deserializes machine code. Only load artifacts produced by
    /// `wasmtime compile` (or [`Engine::precompile_module`]) of the same
    /// Wasmtime version and engine settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be loaded or is incompatible.
    #[allow(unsafe_code)]
    #[instrument(skip(engine, path))]
    pub fn from_precompiled(engine: &Engine, path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let start = Instant::now();

        // SAFETY: artifacts come from our own frontend build pipeline
        let module = unsafe { Module::deserialize_file(engine, path) }.map_err(|e| {
            RuntimeError::compilation_failed(format!(
                "Failed to load precompiled bundle from {}: {e}",
                path.display()
            ))
        })?;

        // Filename convention: {hash}.cwasm
        let content_hash = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        debug!(
            path = %path.display(),
            content_hash = %content_hash,
            duration_us = start.elapsed().as_micros(),
            "Precompiled SSR bundle loaded"
        );

        Ok(Self {
            module,
            content_hash,
        })
    }

    /// Compile a bundle from WAT (WebAssembly Text Format).
    ///
    /// This is primarily for testing purposes.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails.
    #[instrument(skip(engine, wat))]
    pub fn from_wat(engine: &Engine, wat: &str) -> Result<Self, RuntimeError> {
        let module = Module::new(engine, wat).map_err(|e| {
            RuntimeError::compilation_failed(format!("WAT compilation failed: {e}"))
        })?;

        Ok(Self {
            module,
            content_hash: compute_hash(wat.as_bytes()),
        })
    }

    /// Get the content hash of this bundle.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Returns `true` if the bundle exports the render entry point.
    pub fn has_entry_point(&self) -> bool {
        self.module.get_export(ENTRY_POINT).is_some()
    }

    /// Get the compiled module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Validate WebAssembly header (magic number).
    fn validate_wasm_header(bytes: &[u8]) -> Result<(), RuntimeError> {
        if bytes.len() < 8 {
            return Err(RuntimeError::compilation_failed(
                "Invalid Wasm: file too small",
            ));
        }

        if &bytes[0..4] != b"\0asm" {
            return Err(RuntimeError::compilation_failed(
                "Invalid Wasm: bad magic number",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for CompiledBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledBundle")
            .field("content_hash", &self.content_hash)
            .finish_non_exhaustive()
    }
}

/// Compute a hash of the given bytes.
fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WasmEngine;
    use crag_edge_common::EngineConfig;

    // Empty module: magic + version
    const MINIMAL_WASM: &[u8] = &[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

    fn engine() -> WasmEngine {
        let config = EngineConfig {
            pooling_allocator: false,
            ..Default::default()
        };
        WasmEngine::new(&config).unwrap()
    }

    #[test]
    fn test_validate_wasm_header() {
        assert!(CompiledBundle::validate_wasm_header(MINIMAL_WASM).is_ok());
        assert!(CompiledBundle::validate_wasm_header(&[0x00, 0x61]).is_err());

        let bad_magic = &[0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        assert!(CompiledBundle::validate_wasm_header(bad_magic).is_err());
    }

    #[test]
    fn test_compute_hash() {
        assert_eq!(compute_hash(b"ssr"), compute_hash(b"ssr"));
        assert_ne!(compute_hash(b"ssr-v1"), compute_hash(b"ssr-v2"));
        assert_eq!(compute_hash(b"ssr").len(), 16);
    }

    #[test]
    fn test_from_bytes_without_entry_point() {
        let engine = engine();
        let bundle = CompiledBundle::from_bytes(engine.inner(), MINIMAL_WASM).unwrap();

        assert!(!bundle.has_entry_point());
        assert!(!bundle.content_hash().is_empty());
    }

    #[test]
    fn test_from_wat_with_entry_point() {
        let engine = engine();
        let bundle =
            CompiledBundle::from_wat(engine.inner(), r#"(module (func (export "_start")))"#)
                .unwrap();

        assert!(bundle.has_entry_point());
        assert!(format!("{bundle:?}").contains("content_hash"));
    }

    #[test]
    fn test_from_file_missing() {
        let engine = engine();
        let result = CompiledBundle::from_file(engine.inner(), "/nonexistent/ssr.wasm");
        assert!(matches!(result, Err(RuntimeError::Io(_))));
    }

    #[test]
    fn test_from_file() {
        let engine = engine();
        let path = std::env::temp_dir().join(format!("crag-edge-bundle-{}.wasm", std::process::id()));
        std::fs::write(&path, MINIMAL_WASM).unwrap();

        let bundle = CompiledBundle::from_file(engine.inner(), &path).unwrap();
        assert_eq!(bundle.content_hash(), compute_hash(MINIMAL_WASM));

        std::fs::remove_file(path).unwrap();
    }
}

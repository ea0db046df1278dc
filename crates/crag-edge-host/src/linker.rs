//! Host function registration for the bundle linker.

use crag_edge_common::{ExecutionConfig, RuntimeError};
use crag_edge_core::store::{MAX_LOG_MESSAGE_BYTES, RenderContext};
use crag_edge_core::{BundleRunner, WasmEngine};
use tracing::{debug, warn};
use wasmtime::{Caller, Linker};

use crate::logging::{LoggingHost, level_from_i32};

/// Create a [`BundleRunner`] with every host function registered.
///
/// # Errors
///
/// Returns an error if function registration fails.
pub fn create_bundle_runner(
    engine: &WasmEngine,
    exec_config: ExecutionConfig,
) -> Result<BundleRunner, RuntimeError> {
    let mut runner = BundleRunner::new(engine, exec_config);
    register_all(runner.linker_mut())?;
    Ok(runner)
}

/// Register all host functions on a linker.
///
/// - `wasi_snapshot_preview1::*` - stdio-only WASI
/// - `env::log` - Logging function for guest code
///
/// # Errors
///
/// Returns an error if function registration fails.
pub fn register_all(linker: &mut Linker<RenderContext>) -> Result<(), RuntimeError> {
    register_wasi(linker)?;
    register_logging(linker)?;
    Ok(())
}

/// Register WASI preview1.
///
/// What the guest can reach is decided by the context built in
/// [`RenderContext::new`]: stdio pipes, nothing else.
pub fn register_wasi(linker: &mut Linker<RenderContext>) -> Result<(), RuntimeError> {
    wasmtime_wasi::preview1::add_to_linker_async(linker, |ctx: &mut RenderContext| {
        ctx.wasi_mut()
    })
    .map_err(|e| RuntimeError::invalid_config(format!("Failed to register WASI: {e}")))
}

/// Register the logging host function.
///
/// Registers `env::log(level: i32, ptr: i32, len: i32)`.
///
/// # Memory Protocol
///
/// The guest passes:
/// - `level`: Log level (0=debug, 1=info, 2=warn, 3=error)
/// - `ptr`: Pointer to the message string in guest memory
/// - `len`: Length of the message in bytes (UTF-8)
///
/// At most [`MAX_LOG_MESSAGE_BYTES`] are copied out of guest memory; longer
/// messages are truncated. Calls past the per-render entry cap copy nothing.
pub fn register_logging(linker: &mut Linker<RenderContext>) -> Result<(), RuntimeError> {
    linker
        .func_wrap(
            "env",
            "log",
            |mut caller: Caller<'_, RenderContext>, level: i32, ptr: i32, len: i32| {
                let (Ok(start), Ok(len)) = (usize::try_from(ptr), usize::try_from(len)) else {
                    warn!(ptr, len, "Negative pointer or length in guest log");
                    return;
                };

                if caller.data().logs_full() {
                    caller.data_mut().log(level_from_i32(level), String::new());
                    return;
                }

                let Some(memory) = caller
                    .get_export("memory")
                    .and_then(wasmtime::Extern::into_memory)
                else {
                    warn!("Memory export not found in bundle");
                    return;
                };

                // Copy out before borrowing the context mutably
                let message = {
                    let data = memory.data(&caller);
                    let kept = len.min(MAX_LOG_MESSAGE_BYTES);
                    let Some(bytes) = start
                        .checked_add(len)
                        .filter(|&end| end <= data.len())
                        .and_then(|_| data.get(start..start + kept))
                    else {
                        warn!(
                            start,
                            len,
                            memory_size = data.len(),
                            "Guest log out of bounds"
                        );
                        return;
                    };
                    if kept < len {
                        debug!(len, kept, "Guest log message truncated");
                    }
                    String::from_utf8_lossy(bytes).into_owned()
                };

                LoggingHost::log(caller.data_mut(), level_from_i32(level), &message);
            },
        )
        .map_err(|e| {
            RuntimeError::invalid_config(format!("Failed to register log function: {e}"))
        })?;

    Ok(())
}

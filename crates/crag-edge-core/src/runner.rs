//! Running the SSR bundle for one request.
//!
//! [`BundleRunner`] handles the complete lifecycle of a render:
//!
//! 1. Encode the request as JSON for the guest's stdin
//! 2. Instantiate the bundle in a fresh store
//! 3. Run the `_start` entry point
//! 4. Decode the response document from the guest's stdout

use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};
use wasmtime::{Linker, Store, Trap};
use wasmtime_wasi::I32Exit;

use crate::bundle::{CompiledBundle, ENTRY_POINT};
use crate::store::{
    ExecutionMetrics, LogEntry, MemoryLimitHit, RenderContext, calculate_fuel_consumed,
    create_store, get_remaining_fuel,
};
use crate::WasmEngine;
use crag_edge_common::{
    BundleError, ExecutionConfig, RenderRequest, RenderResponse, RuntimeError,
};

/// The result of a successful render.
#[derive(Debug)]
pub struct RenderOutput {
    /// The response document printed by the bundle.
    pub response: RenderResponse,

    /// Logs emitted through the `env.log` import.
    pub logs: Vec<LogEntry>,

    /// Log calls past the per-render entry cap.
    pub dropped_logs: usize,

    /// Fuel and timing for this render.
    pub metrics: ExecutionMetrics,
}

/// Render lifecycle manager.
///
/// Holds the engine, the linker with host functions registered, and the
/// per-render limits. Each render uses its own [`Store`], so a runner can be
/// shared across any number of concurrent requests.
pub struct BundleRunner {
    engine: WasmEngine,
    linker: Linker<RenderContext>,
    exec_config: ExecutionConfig,
}

impl BundleRunner {
    /// Create a runner with an empty linker.
    ///
    /// Register host functions through [`BundleRunner::linker_mut`] before
    /// the first render.
    pub fn new(engine: &WasmEngine, exec_config: ExecutionConfig) -> Self {
        Self {
            engine: engine.clone(),
            linker: Linker::new(engine.inner()),
            exec_config,
        }
    }

    /// Get a mutable reference to the linker.
    pub fn linker_mut(&mut self) -> &mut Linker<RenderContext> {
        &mut self.linker
    }

    /// Get the engine.
    pub fn engine(&self) -> &WasmEngine {
        &self.engine
    }

    /// Get the execution configuration.
    pub fn exec_config(&self) -> &ExecutionConfig {
        &self.exec_config
    }

    /// Render one request with the bundle.
    ///
    /// # Errors
    ///
    /// Every failure of the bundle is reported here:
    /// - Instantiation fails or `_start` is missing
    /// - Fuel, memory or deadline limits are exceeded
    /// - The guest traps or exits with a non-zero status
    /// - The guest's stdout is not a response document
    #[instrument(skip_all, fields(request_id = %request_id, method = %request.method, uri = %request.uri))]
    pub async fn render(
        &self,
        bundle: &CompiledBundle,
        request: &RenderRequest,
        request_id: String,
    ) -> Result<RenderOutput, RuntimeError> {
        let start = Instant::now();

        let stdin = serde_json::to_vec(request).map_err(|e| BundleError::RequestEncoding {
            reason: e.to_string(),
        })?;

        let mut store = create_store(&self.engine, &self.exec_config, request_id, stdin)?;
        let initial_fuel = get_remaining_fuel(&store).unwrap_or(0);

        debug!("Instantiating SSR bundle");

        let instance = self
            .linker
            .instantiate_async(&mut store, bundle.module())
            .await
            .map_err(|e| BundleError::Instantiation {
                reason: e.to_string(),
            })?;

        let entry = instance
            .get_typed_func::<(), ()>(&mut store, ENTRY_POINT)
            .map_err(|_| BundleError::EntryPointMissing {
                name: ENTRY_POINT.to_string(),
            })?;

        let result = entry.call_async(&mut store, ()).await;

        let fuel_consumed = calculate_fuel_consumed(initial_fuel, &store);
        store.data_mut().metrics.fuel_consumed = fuel_consumed;
        store.data_mut().finalize_metrics();
        forward_stderr(&store);

        let duration = start.elapsed();

        if let Err(trap) = result {
            if let Some(failure) = classify_failure(&trap, &self.exec_config) {
                if failure.is_resource_limit() {
                    warn!(
                        duration_ms = duration.as_millis(),
                        fuel_consumed = fuel_consumed,
                        error = %failure,
                        "Render terminated: resource limit"
                    );
                } else {
                    error!(
                        duration_ms = duration.as_millis(),
                        fuel_consumed = fuel_consumed,
                        error = %failure,
                        "Render failed"
                    );
                }
                return Err(failure);
            }
        }

        let context = store.into_data();
        let response = parse_response(&context.stdout_contents())?;

        info!(
            status = response.status,
            duration_ms = duration.as_millis(),
            fuel_consumed = fuel_consumed,
            log_count = context.logs.len(),
            logs_dropped = context.dropped_logs,
            "Render completed"
        );

        Ok(RenderOutput {
            response,
            logs: context.logs,
            dropped_logs: context.dropped_logs,
            metrics: context.metrics,
        })
    }
}

/// Map a guest failure to a [`RuntimeError`].
///
/// Returns `None` for `proc_exit(0)`, which is how many WASI toolchains end
/// a successful command.
fn classify_failure(error: &wasmtime::Error, config: &ExecutionConfig) -> Option<RuntimeError> {
    if let Some(exit) = error.downcast_ref::<I32Exit>() {
        return (exit.0 != 0).then(|| BundleError::NonZeroExit { code: exit.0 }.into());
    }

    if error.downcast_ref::<MemoryLimitHit>().is_some() {
        return Some(RuntimeError::MemoryLimitExceeded {
            limit_mb: config.max_memory_mb,
        });
    }

    let trap = error.downcast_ref::<Trap>();
    match trap {
        Some(Trap::OutOfFuel) => return Some(RuntimeError::FuelExhausted),
        Some(Trap::Interrupt) => {
            return Some(RuntimeError::ExecutionTimeout {
                duration_ms: config.timeout_ms,
            });
        }
        _ => {}
    }

    Some(RuntimeError::trap(
        trap.map_or_else(|| error.to_string(), ToString::to_string),
    ))
}

/// Decode the response document from the guest's stdout.
fn parse_response(stdout: &[u8]) -> Result<RenderResponse, RuntimeError> {
    if stdout.is_empty() {
        return Err(BundleError::invalid_response("nothing written to stdout").into());
    }

    serde_json::from_slice(stdout)
        .map_err(|e| BundleError::invalid_response(e.to_string()).into())
}

/// Forward guest stderr to tracing, one event per line.
fn forward_stderr(store: &Store<RenderContext>) {
    let stderr = store.data().stderr_contents();
    if stderr.is_empty() {
        return;
    }

    let request_id = store.data().request_id.as_str();
    for line in String::from_utf8_lossy(&stderr).lines() {
        debug!(request_id, guest_stderr = true, "{}", line);
    }
}

impl std::fmt::Debug for BundleRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleRunner")
            .field("exec_config", &self.exec_config)
            .finish_non_exhaustive()
    }
}

//! Per-render sandbox state and store management.
//!
//! This module provides:
//! - [`RenderContext`]: Per-render state accessible from host functions
//! - [`LogEntry`] and [`LogLevel`]: Structured logging from guest code
//! - [`ExecutionMetrics`]: Performance metrics for each render

use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use wasmtime::{ResourceLimiter, Store};
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::pipe::{MemoryInputPipe, MemoryOutputPipe};
use wasmtime_wasi::preview1::WasiP1Ctx;

use crate::WasmEngine;
use crate::engine::FUEL_YIELD_INTERVAL;
use crag_edge_common::{ExecutionConfig, RuntimeError};

/// Largest response document a bundle may print.
pub const MAX_STDOUT_BYTES: usize = 16 * 1024 * 1024;

/// Guest stderr beyond this is discarded.
pub const MAX_STDERR_BYTES: usize = 64 * 1024;

/// Longest guest log message kept; the rest is cut off.
pub const MAX_LOG_MESSAGE_BYTES: usize = 4 * 1024;

/// Guest log entries kept per render. Later entries are counted and dropped.
pub const MAX_LOG_ENTRIES: usize = 256;

/// Per-render sandbox state.
///
/// Created for each request and dropped when the render completes, so no
/// state survives between requests.
///
/// The WASI context exposes only stdio: stdin carries the encoded request,
/// stdout collects the response document, stderr collects diagnostics.
/// No directories are preopened and no environment is inherited.
pub struct RenderContext {
    wasi: WasiP1Ctx,

    stdout: MemoryOutputPipe,

    stderr: MemoryOutputPipe,

    limiter: MemoryLimiter,

    /// Unique request identifier for tracing.
    pub request_id: String,

    /// Logs collected from guest code, at most [`MAX_LOG_ENTRIES`].
    pub logs: Vec<LogEntry>,

    /// Log entries refused because [`MAX_LOG_ENTRIES`] was reached.
    pub dropped_logs: usize,

    /// Execution metrics.
    pub metrics: ExecutionMetrics,

    start_time: Instant,
}

/// A single log entry from guest code.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level (debug, info, warn, error).
    pub level: LogLevel,

    /// Log message content.
    pub message: String,

    /// Timestamp when the log was recorded.
    pub timestamp: Instant,
}

/// Log level for guest logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug-level messages.
    Debug,
    /// Informational messages.
    Info,
    /// Warning messages.
    Warn,
    /// Error messages.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Render performance metrics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionMetrics {
    /// Fuel consumed during the render.
    pub fuel_consumed: u64,

    /// Total render duration.
    pub duration: Option<Duration>,
}

/// Trap raised when the guest grows linear memory past its cap.
#[derive(Debug, Error)]
#[error("memory grow to {desired} bytes exceeds the {limit} byte cap")]
pub struct MemoryLimitHit {
    /// Size the guest asked for.
    pub desired: usize,
    /// The per-render cap.
    pub limit: usize,
}

/// Caps linear memory growth. A refused grow traps instead of returning -1.
struct MemoryLimiter {
    max_bytes: usize,
}

impl ResourceLimiter for MemoryLimiter {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        if desired > self.max_bytes {
            return Err(MemoryLimitHit {
                desired,
                limit: self.max_bytes,
            }
            .into());
        }
        Ok(true)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        _desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok(true)
    }
}

impl RenderContext {
    /// Create a new render context.
    ///
    /// # Arguments
    ///
    /// * `request_id` - Unique identifier for this render (for tracing)
    /// * `stdin` - Bytes the guest reads from stdin
    /// * `max_memory_bytes` - Linear memory cap
    pub fn new(request_id: String, stdin: impl Into<Bytes>, max_memory_bytes: usize) -> Self {
        let stdout = MemoryOutputPipe::new(MAX_STDOUT_BYTES);
        let stderr = MemoryOutputPipe::new(MAX_STDERR_BYTES);

        let wasi = WasiCtxBuilder::new()
            .stdin(MemoryInputPipe::new(stdin))
            .stdout(stdout.clone())
            .stderr(stderr.clone())
            .build_p1();

        Self {
            wasi,
            stdout,
            stderr,
            limiter: MemoryLimiter {
                max_bytes: max_memory_bytes,
            },
            request_id,
            logs: Vec::new(),
            dropped_logs: 0,
            metrics: ExecutionMetrics::default(),
            start_time: Instant::now(),
        }
    }

    /// Add a log entry.
    ///
    /// Returns `false` and counts the entry in `dropped_logs` once the render
    /// already holds [`MAX_LOG_ENTRIES`].
    pub fn log(&mut self, level: LogLevel, message: String) -> bool {
        if self.logs_full() {
            self.dropped_logs += 1;
            return false;
        }

        self.logs.push(LogEntry {
            level,
            message,
            timestamp: Instant::now(),
        });
        true
    }

    /// Returns `true` once no more log entries will be kept.
    pub fn logs_full(&self) -> bool {
        self.logs.len() >= MAX_LOG_ENTRIES
    }

    /// The WASI preview1 context, for linking.
    pub fn wasi_mut(&mut self) -> &mut WasiP1Ctx {
        &mut self.wasi
    }

    /// Everything the guest has written to stdout so far.
    pub fn stdout_contents(&self) -> Bytes {
        self.stdout.contents()
    }

    /// Everything the guest has written to stderr so far.
    pub fn stderr_contents(&self) -> Bytes {
        self.stderr.contents()
    }

    /// Get elapsed time since the render started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Finalize metrics after the render.
    pub fn finalize_metrics(&mut self) {
        self.metrics.duration = Some(self.start_time.elapsed());
    }
}

/// Create a new Wasmtime store for one render.
///
/// # Arguments
///
/// * `engine` - The shared Wasmtime engine
/// * `config` - Execution configuration (fuel, memory, deadline)
/// * `request_id` - Unique request identifier
/// * `stdin` - The encoded request
///
/// # Errors
///
/// Returns an error if fuel or the yield interval cannot be set on the store.
pub fn create_store(
    engine: &WasmEngine,
    config: &ExecutionConfig,
    request_id: String,
    stdin: impl Into<Bytes>,
) -> Result<Store<RenderContext>, RuntimeError> {
    let context = RenderContext::new(request_id, stdin, config.max_memory_bytes());
    let mut store = Store::new(engine.inner(), context);

    store.limiter(|ctx| &mut ctx.limiter);

    // Fuel is always consumed by the engine; without metering the tank is
    // simply filled to the brim
    let fuel = if config.fuel_metering {
        config.max_fuel
    } else {
        u64::MAX
    };
    store
        .set_fuel(fuel)
        .map_err(|e| RuntimeError::invalid_config(format!("Failed to set fuel: {e}")))?;

    // Busy renders hand their worker back to the executor every interval
    store
        .fuel_async_yield_interval(Some(FUEL_YIELD_INTERVAL))
        .map_err(|e| {
            RuntimeError::invalid_config(format!("Failed to set yield interval: {e}"))
        })?;

    // Ticks are milliseconds, see `EPOCH_TICK`
    if engine.config().epoch_interruption {
        store.set_epoch_deadline(config.timeout_ms);
    }

    Ok(store)
}

/// Get remaining fuel from a store.
pub fn get_remaining_fuel(store: &Store<RenderContext>) -> Option<u64> {
    store.get_fuel().ok()
}

/// Calculate fuel consumed.
pub fn calculate_fuel_consumed(initial_fuel: u64, store: &Store<RenderContext>) -> u64 {
    let remaining = get_remaining_fuel(store).unwrap_or(0);
    initial_fuel.saturating_sub(remaining)
}

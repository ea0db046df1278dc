//! Wasmtime engine configuration and creation.
//!
//! The [`WasmEngine`] is the foundation of the SSR sandbox. It is:
//! - Thread-safe and shared across all renders
//! - Configured with pooling allocator for fast instantiation
//! - Set up with fuel metering and epoch interruption for resource limiting

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};
use wasmtime::{Config, Engine, InstanceAllocationStrategy, PoolingAllocationConfig};

use crag_edge_common::{EngineConfig, RuntimeError};

/// Interval between epoch increments. Store deadlines are expressed in
/// ticks, so one tick per millisecond makes `timeout_ms` a tick count.
pub const EPOCH_TICK: Duration = Duration::from_millis(1);

/// Fuel units a render may burn before yielding back to the async executor.
pub const FUEL_YIELD_INTERVAL: u64 = 10_000;

/// Thread-safe WebAssembly engine wrapper.
///
/// This struct wraps a Wasmtime [`Engine`] configured for running the SSR
/// bundle once per request. It contains no per-request state.
///
/// # Configuration
///
/// The engine is configured with:
/// - **Pooling Allocator**: Pre-allocates memory for render sandboxes
/// - **Fuel Metering**: Enables deterministic CPU limiting
/// - **Epoch Interruption**: Enforces the wall-clock render deadline
/// - **Async Support**: Renders yield to the tokio scheduler
///
/// # Example
///
/// ```ignore
/// use crag_edge_common::EngineConfig;
/// use crag_edge_core::WasmEngine;
///
/// let config = EngineConfig::default();
/// let engine = WasmEngine::new(&config)?;
/// let ticker = engine.spawn_epoch_ticker();
/// ```
#[derive(Clone)]
pub struct WasmEngine {
    engine: Arc<Engine>,
    config: EngineConfig,
}

impl WasmEngine {
    /// Create a new WebAssembly engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The Wasmtime configuration is invalid
    /// - The pooling allocator cannot be initialized
    pub fn new(config: &EngineConfig) -> Result<Self, RuntimeError> {
        let mut wasmtime_config = Config::new();

        // Renders run as tokio tasks
        wasmtime_config.async_support(true);

        wasmtime_config.consume_fuel(true);

        if config.epoch_interruption {
            wasmtime_config.epoch_interruption(true);
        }

        wasmtime_config.cranelift_opt_level(wasmtime::OptLevel::Speed);

        if config.pooling_allocator {
            let pooling_config = Self::create_pooling_config(config);

            wasmtime_config
                .allocation_strategy(InstanceAllocationStrategy::Pooling(pooling_config));

            info!(
                max_instances = config.max_instances,
                instance_memory_mb = config.instance_memory_mb,
                "Pooling allocator enabled"
            );
        }

        let engine = Engine::new(&wasmtime_config).map_err(|e| {
            RuntimeError::invalid_config(format!("Failed to create Wasmtime engine: {e}"))
        })?;

        info!("Wasmtime engine initialized");

        Ok(Self {
            engine: Arc::new(engine),
            config: config.clone(),
        })
    }

    /// Create pooling allocation configuration.
    fn create_pooling_config(config: &EngineConfig) -> PoolingAllocationConfig {
        let mut pooling = PoolingAllocationConfig::default();

        // Bundles are core modules: one instance, one memory and one table each
        pooling.total_core_instances(config.max_instances);
        pooling.total_memories(config.max_instances);
        pooling.total_tables(config.max_instances);

        let max_memory_bytes = (config.instance_memory_mb as usize) * 1024 * 1024;
        pooling.max_memory_size(max_memory_bytes);

        pooling
    }

    /// Get a reference to the inner Wasmtime engine.
    pub fn inner(&self) -> &Engine {
        &self.engine
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Increment the epoch counter.
    pub fn increment_epoch(&self) {
        self.engine.increment_epoch();
    }

    /// Start a dedicated thread that advances the epoch every
    /// [`EPOCH_TICK`].
    ///
    /// The thread runs outside the async runtime, so deadlines fire even
    /// when every worker is busy running guest code. It stops when the
    /// returned [`EpochTicker`] is stopped or dropped.
    pub fn spawn_epoch_ticker(&self) -> EpochTicker {
        let engine = self.engine.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let thread = thread::Builder::new()
            .name("crag-edge-epoch".to_string())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(EPOCH_TICK);
                    engine.increment_epoch();
                }
            });

        let thread = match thread {
            Ok(handle) => {
                debug!(tick_ms = EPOCH_TICK.as_millis(), "Epoch ticker started");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Failed to spawn epoch ticker; render deadlines are disabled");
                None
            }
        };

        EpochTicker { stop, thread }
    }

    /// Check if the pooling allocator is enabled.
    pub fn is_pooling_enabled(&self) -> bool {
        self.config.pooling_allocator
    }
}

/// Handle to the epoch ticker thread.
#[derive(Debug)]
pub struct EpochTicker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EpochTicker {
    /// Whether the ticker thread is still advancing the epoch.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the ticker and wait for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Epoch ticker thread panicked");
            }
        }
    }
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WasmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmEngine")
            .field("pooling_allocator", &self.config.pooling_allocator)
            .field("max_instances", &self.config.max_instances)
            .field("epoch_interruption", &self.config.epoch_interruption)
            .finish_non_exhaustive()
    }
}

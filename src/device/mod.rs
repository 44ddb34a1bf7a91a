//! CPU compute device.
//!
//! Mirrors the shape of a GPU compute API: named kernels are resolved into
//! pipelines, dispatches are encoded into command buffers and committed to
//! an in-order queue, and results live in host-visible buffers. Each
//! dispatch runs its per-cell work in parallel on a rayon pool.

mod buffer;
mod library;
mod queue;

use std::sync::Arc;

pub use buffer::DeviceBuffer;
pub use library::{Binding, Invocation, KernelFn, Library, Pipeline};
pub use queue::{CommandBuffer, CommandQueue, Committed};

/// Grid or thread-group extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Size {
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self { width, height, depth }
    }

    pub const fn count(&self) -> usize {
        self.width * self.height * self.depth
    }
}

/// Errors raised while bringing up the device or resolving kernels.
#[derive(Debug, thiserror::Error)]
pub enum DeviceInitializationError {
    #[error("failed to build compute thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to start command queue worker: {0}")]
    Worker(#[from] std::io::Error),
    #[error("invalid device configuration: {0}")]
    InvalidConfig(String),
    #[error("kernel `{0}` not found in device library")]
    MissingKernel(String),
}

/// Device bring-up settings.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Worker threads for per-cell parallelism; 0 picks the rayon default.
    pub threads: usize,
    /// Threads that execute in lockstep; sets the width of 2-D groups.
    pub execution_width: usize,
    pub max_threads_per_group: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            execution_width: 32,
            max_threads_per_group: 1024,
        }
    }
}

pub struct Device {
    pool: Arc<rayon::ThreadPool>,
    library: Library,
    config: DeviceConfig,
}

impl Device {
    pub fn new(config: DeviceConfig, library: Library) -> Result<Self, DeviceInitializationError> {
        if config.execution_width == 0 || config.max_threads_per_group < config.execution_width {
            return Err(DeviceInitializationError::InvalidConfig(format!(
                "execution width {} must be non-zero and at most {} threads per group",
                config.execution_width, config.max_threads_per_group
            )));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("dyeflow-compute-{i}"))
            .build()?;
        log::info!(
            "compute device up: {} threads, execution width {}, {} kernels",
            pool.current_num_threads(),
            config.execution_width,
            library.names().count()
        );
        Ok(Self {
            pool: Arc::new(pool),
            library,
            config,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Allocate a zero-filled buffer of `len` 32-bit elements.
    pub fn new_buffer(&self, len: usize) -> DeviceBuffer {
        DeviceBuffer::zeroed(len)
    }

    pub fn new_buffer_with_f32(&self, data: &[f32]) -> DeviceBuffer {
        DeviceBuffer::from_f32(data)
    }

    pub fn new_buffer_with_i32(&self, data: &[i32]) -> DeviceBuffer {
        DeviceBuffer::from_i32(data)
    }

    /// Resolve the kernel called `name` into a dispatchable pipeline.
    pub fn new_pipeline(&self, name: &str) -> Result<Pipeline, DeviceInitializationError> {
        let (name, entry) = self
            .library
            .get(name)
            .ok_or_else(|| DeviceInitializationError::MissingKernel(name.to_string()))?;
        Ok(Pipeline::new(
            name,
            entry,
            self.config.execution_width,
            self.config.max_threads_per_group,
        ))
    }

    pub fn new_command_queue(&self) -> Result<CommandQueue, DeviceInitializationError> {
        CommandQueue::spawn(Arc::clone(&self.pool))
    }
}

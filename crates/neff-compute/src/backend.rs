//! Compute backend trait and device description.

use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Describes a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub threads: usize,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Serial,
    Cpu,
}

/// Abstraction over where independent sweep tasks execute.
///
/// Implementations may run tasks in any order and on any thread; callers
/// that need ordered results must key them by the task index.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the backend.
    fn device_info(&self) -> DeviceInfo;

    /// Run `task(i)` once for every `i` in `0..n` and return when all finished.
    fn for_each_index(
        &self,
        n: usize,
        task: &(dyn Fn(usize) + Send + Sync),
    ) -> Result<(), ComputeError>;
}

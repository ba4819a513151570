//! # neff Compute
//!
//! Execution backends for the sweep driver. Grid points of a parameter sweep
//! are independent, so the driver hands the backend an index range and a
//! task; the backend decides where and in which order the tasks run.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Notes |
//! |---------|-------------|-------|
//! | Serial | always | Calling thread, index order |
//! | CPU (Rayon) | `cpu` (default) | Dedicated thread pool |

pub mod backend;
pub mod serial;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};
pub use serial::SerialBackend;

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;

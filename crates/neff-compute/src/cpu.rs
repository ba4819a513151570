//! CPU compute backend using Rayon for shared-memory parallelism.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};

/// CPU backend that spreads tasks over a dedicated Rayon thread pool.
pub struct CpuBackend {
    pool: ThreadPool,
    num_threads: usize,
}

impl CpuBackend {
    /// Create a backend using all available threads.
    pub fn new() -> Result<Self, ComputeError> {
        Self::with_threads(rayon::current_num_threads())
    }

    /// Create a backend with a specified thread count (0 = Rayon default).
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("neff-sweep-{i}"))
            .build()
            .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;
        let num_threads = pool.current_num_threads();
        Ok(Self { pool, num_threads })
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            threads: self.num_threads,
        }
    }

    fn for_each_index(
        &self,
        n: usize,
        task: &(dyn Fn(usize) + Send + Sync),
    ) -> Result<(), ComputeError> {
        self.pool
            .install(|| (0..n).into_par_iter().with_max_len(1).for_each(task));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn visits_every_index_once() {
        let backend = CpuBackend::with_threads(4).unwrap();
        assert_eq!(backend.device_info().threads, 4);
        let hits: Vec<AtomicUsize> = (0..64).map(|_| AtomicUsize::new(0)).collect();
        backend
            .for_each_index(hits.len(), &|i| {
                hits[i].fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
    }
}

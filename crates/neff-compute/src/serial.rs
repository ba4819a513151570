//! Single-threaded backend.

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo};

/// Runs tasks in index order on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial".into(),
            backend_type: BackendType::Serial,
            threads: 1,
        }
    }

    fn for_each_index(
        &self,
        n: usize,
        task: &(dyn Fn(usize) + Send + Sync),
    ) -> Result<(), ComputeError> {
        (0..n).for_each(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn runs_in_index_order() {
        let seen = Mutex::new(Vec::new());
        SerialBackend
            .for_each_index(4, &|i| seen.lock().unwrap().push(i))
            .unwrap();
        assert_eq!(seen.into_inner().unwrap(), vec![0, 1, 2, 3]);
    }
}

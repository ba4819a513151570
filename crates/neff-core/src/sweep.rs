//! Grid sweeps over a model's parameter space.
//!
//! The driver enumerates the grid for a [`SweepMode`], solves every point
//! through the model's cached adapter on a [`ComputeBackend`], and pairs
//! each output with its input by grid index, whatever order the backend
//! completes them in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use neff_compute::ComputeBackend;

use crate::error::ModelError;
use crate::model::{Model, WaveguideModel};
pub use crate::parameter::SweepMode;

/// What to do when a grid point fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure (by grid index).
    Abort,
    /// Log, record and continue. Setup errors still abort.
    #[default]
    Skip,
}

/// A grid point that produced no output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub index: usize,
    pub inputs: Vec<f64>,
    pub error: String,
}

/// Paired inputs and outputs of a sweep.
///
/// Each output row is `[re(neff_0) … re(neff_{m-1}), im(neff_0) … im(neff_{m-1})]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    /// Input column names, in vector order.
    pub names: Vec<String>,
    pub num_modes: usize,
    pub mode: SweepMode,
    /// Number of grid points attempted.
    pub grid_size: usize,
    pub inputs: Vec<Vec<f64>>,
    pub outputs: Vec<Vec<f64>>,
    pub failures: Vec<SweepFailure>,
}

impl SweepResult {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Output column names: `neff_re_k` then `neff_im_k`.
    pub fn output_names(&self) -> Vec<String> {
        (0..self.num_modes)
            .map(|k| format!("neff_re_{k}"))
            .chain((0..self.num_modes).map(|k| format!("neff_im_{k}")))
            .collect()
    }
}

pub struct SweepDriver {
    backend: Arc<dyn ComputeBackend>,
    policy: FailurePolicy,
}

impl SweepDriver {
    pub fn new(backend: Arc<dyn ComputeBackend>, policy: FailurePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Solve every grid point of `mode`.
    ///
    /// An abort always reports the lowest-index failing point, as a serial
    /// run would, however the backend schedules the work: points left
    /// unstarted by the cancellation are solved in grid order while the
    /// results are collected, up to the first failure.
    pub fn sweep(&self, model: &WaveguideModel, mode: SweepMode) -> Result<SweepResult, ModelError> {
        let grid = model.space().grid(mode);
        let n = grid.len();
        let device = self.backend.device_info();
        info!(
            "Sweeping {n} points ({mode:?}) on {} [{} threads]",
            device.name, device.threads
        );
        let start = Instant::now();

        let slots: Vec<OnceLock<Result<Vec<f64>, ModelError>>> = (0..n).map(|_| OnceLock::new()).collect();
        let cancelled = AtomicBool::new(false);
        let abort = self.policy == FailurePolicy::Abort;
        self.backend.for_each_index(n, &|i| {
            if cancelled.load(Ordering::Relaxed) {
                return;
            }
            let result = model.solve_vector(&grid[i]);
            if result.as_ref().is_err_and(|e| abort || !e.is_point_failure()) {
                cancelled.store(true, Ordering::Relaxed);
            }
            let _ = slots[i].set(result);
        })?;

        let mut result = SweepResult {
            names: model.space().names().iter().map(|s| s.to_string()).collect(),
            num_modes: model.num_modes(),
            mode,
            grid_size: n,
            inputs: Vec::with_capacity(n),
            outputs: Vec::with_capacity(n),
            failures: Vec::new(),
        };
        let mut outcomes: Vec<_> = slots.into_iter().map(OnceLock::into_inner).collect();
        for (index, inputs) in grid.into_iter().enumerate() {
            let outcome = match outcomes[index].take() {
                Some(outcome) => outcome,
                None => model.solve_vector(&inputs),
            };
            match outcome {
                Ok(outputs) => {
                    result.inputs.push(inputs);
                    result.outputs.push(outputs);
                }
                Err(e) if abort || !e.is_point_failure() => {
                    let not_run = outcomes[index + 1..].iter().filter(|o| o.is_none()).count();
                    warn!("Sweep stopped at point {index} of {n}; {not_run} later points were not run");
                    return Err(ModelError::SweepPoint {
                        index,
                        inputs,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!("Skipping sweep point {index} {inputs:?}: {e}");
                    result.failures.push(SweepFailure {
                        index,
                        inputs,
                        error: e.to_string(),
                    });
                }
            }
        }

        let adapter = model.adapter();
        info!(
            "Sweep finished in {:.2?}: {} ok, {} skipped (cache hits {}, misses {})",
            start.elapsed(),
            result.inputs.len(),
            result.failures.len(),
            adapter.hits(),
            adapter.misses()
        );
        Ok(result)
    }
}

//! Surrogates fitted to sweep results.
//!
//! A surrogate maps an input vector (ordered by
//! [`ParameterSpace::names`](crate::parameter::ParameterSpace::names)) to
//! each output column of a sweep: `re(neff_k)` for `k < m`, then `im(neff_k)`.

pub mod grid;
pub mod mlp;

pub use grid::GridInterpolator;
pub use mlp::{MlpConfig, MlpSurrogate};

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sweep::SweepResult;

#[derive(Debug, Error)]
pub enum SurrogateError {
    #[error("No samples to fit")]
    Empty,

    #[error("Expected {expected} inputs, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Output index {index} out of range ({len} outputs)")]
    OutputIndex { index: usize, len: usize },

    #[error("Samples do not form a complete grid: {found} unique points, {expected} expected")]
    IncompleteGrid { expected: usize, found: usize },

    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("Fit failed: {0}")]
    Fit(String),
}

/// A fitted approximation of the sweep outputs.
pub trait Surrogate: Send + Sync {
    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize;

    /// Value of output column `output` at `input`.
    fn evaluate(&self, output: usize, input: &[f64]) -> Result<f64, SurrogateError>;

    fn evaluate_all(&self, input: &[f64]) -> Result<Vec<f64>, SurrogateError> {
        (0..self.num_outputs())
            .map(|k| self.evaluate(k, input))
            .collect()
    }

    fn kind_name(&self) -> &str;
}

/// Selects the surrogate family fitted after a sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SurrogateKind {
    #[default]
    Grid,
    Mlp(MlpConfig),
}

/// Fit the selected surrogate to a sweep's successful points.
pub fn fit_surrogate(kind: &SurrogateKind, sweep: &SweepResult) -> Result<Arc<dyn Surrogate>, SurrogateError> {
    let surrogate: Arc<dyn Surrogate> = match kind {
        SurrogateKind::Grid => Arc::new(GridInterpolator::fit(&sweep.inputs, &sweep.outputs)?),
        SurrogateKind::Mlp(config) => {
            let mlp = MlpSurrogate::fit(&sweep.inputs, &sweep.outputs, config)?;
            info!("MLP training RMSE per output: {:.3?}", mlp.training_rmse());
            Arc::new(mlp)
        }
    };
    info!(
        "Fitted {} surrogate on {} samples ({} → {})",
        surrogate.kind_name(),
        sweep.len(),
        surrogate.num_inputs(),
        surrogate.num_outputs()
    );
    Ok(surrogate)
}

/// Shape checks shared by the fitters; returns `(num_inputs, num_outputs)`.
pub(crate) fn check_samples(inputs: &[Vec<f64>], outputs: &[Vec<f64>]) -> Result<(usize, usize), SurrogateError> {
    let (Some(first_in), Some(first_out)) = (inputs.first(), outputs.first()) else {
        return Err(SurrogateError::Empty);
    };
    if inputs.len() != outputs.len() {
        return Err(SurrogateError::Fit(format!(
            "{} input rows but {} output rows",
            inputs.len(),
            outputs.len()
        )));
    }
    let (d, m) = (first_in.len(), first_out.len());
    for (x, y) in inputs.iter().zip(outputs) {
        if x.len() != d {
            return Err(SurrogateError::DimensionMismatch { expected: d, got: x.len() });
        }
        if y.len() != m {
            return Err(SurrogateError::Fit(format!(
                "ragged outputs: {} vs {m} columns",
                y.len()
            )));
        }
        if !x.iter().all(|v| v.is_finite()) {
            return Err(SurrogateError::NonFinite("inputs"));
        }
        if !y.iter().all(|v| v.is_finite()) {
            return Err(SurrogateError::NonFinite("outputs"));
        }
    }
    Ok((d, m))
}

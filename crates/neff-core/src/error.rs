//! Top-level error type for model construction, sweeps and evaluation.

use thiserror::Error;

use neff_compute::ComputeError;
use neff_geometry::GeometryError;

use crate::parameter::ParameterError;
use crate::solver::SolveError;
use crate::surrogate::SurrogateError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Surrogate(#[from] SurrogateError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("Model has no fitted surrogate; run a sweep and fit first")]
    NotFitted,

    #[error("Invalid model input: {0}")]
    InvalidInput(String),

    #[error("Sweep result does not match the model: {0}")]
    Mismatch(String),

    #[error("Sweep point {index} {inputs:?} failed: {source}")]
    SweepPoint {
        index: usize,
        inputs: Vec<f64>,
        source: Box<ModelError>,
    },
}

impl ModelError {
    /// True for failures tied to one parameter point (non-physical geometry,
    /// no guided mode, material out of range) rather than to the setup.
    pub fn is_point_failure(&self) -> bool {
        match self {
            ModelError::Solve(e) => e.is_point_failure(),
            ModelError::Geometry(e) => e.is_point_failure(),
            _ => false,
        }
    }
}

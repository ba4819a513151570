//! Mode-solver abstraction.
//!
//! The [`ModeSolver`] trait is the seam between the sweep machinery and the
//! numerical method that computes effective indices. The in-tree
//! implementation is the [`EffectiveIndexSolver`]; external finite-element
//! solvers plug in behind the same trait and receive the mesh settings
//! carried by [`SolverSettings`].

pub mod eim;
pub mod slab;

pub use eim::EffectiveIndexSolver;

use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use neff_geometry::{CrossSection, GeometryError, LayerStack};
use neff_materials::MaterialError;

use crate::cache::CacheError;

/// Errors that can occur during a cross-section mode solve.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("Found {found} guided modes, {requested} requested")]
    NoGuidedMode { requested: usize, found: usize },

    #[error("Non-physical input: {0}")]
    NonPhysical(String),

    #[error("Unsupported by this solver: {0}")]
    Unsupported(String),

    #[error("Invalid solver settings: {0}")]
    InvalidSettings(String),

    #[error("Solver failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SolveError {
    /// True when the failure belongs to the parameter point rather than to
    /// the solver configuration or the cache.
    pub fn is_point_failure(&self) -> bool {
        match self {
            SolveError::NoGuidedMode { .. }
            | SolveError::NonPhysical(_)
            | SolveError::Failed(_) => true,
            SolveError::Geometry(e) => e.is_point_failure(),
            SolveError::Material(e) => matches!(e, MaterialError::OutOfRange { .. }),
            SolveError::Unsupported(_) | SolveError::InvalidSettings(_) | SolveError::Cache(_) => {
                false
            }
        }
    }
}

/// Mesh refinement for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshResolution {
    /// Target element size inside the layer (µm).
    pub resolution: f64,
    /// Distance over which the refinement relaxes (µm).
    pub distance: f64,
}

/// Numerical settings forwarded to the solver and folded into cache keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Finite-element order.
    pub order: u32,
    /// Bend radius (µm); `None` for a straight waveguide.
    pub radius: Option<f64>,
    /// Per-layer mesh resolution.
    pub resolutions: BTreeMap<String, MeshResolution>,
    /// Re-solve even when a cached result exists.
    pub overwrite: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            order: 1,
            radius: None,
            resolutions: BTreeMap::new(),
            overwrite: false,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<(), SolveError> {
        if self.order == 0 {
            return Err(SolveError::InvalidSettings("order must be at least 1".into()));
        }
        if let Some(r) = self.radius {
            if !(r.is_finite() && r > 0.0) {
                return Err(SolveError::InvalidSettings(format!(
                    "bend radius must be positive, got {r}"
                )));
            }
        }
        for (layer, res) in &self.resolutions {
            if !(res.resolution > 0.0 && res.distance >= 0.0) {
                return Err(SolveError::InvalidSettings(format!(
                    "mesh resolution for layer '{layer}' must be positive"
                )));
            }
        }
        Ok(())
    }
}

/// One cross-section solve.
#[derive(Debug, Clone, Copy)]
pub struct ModeRequest<'a> {
    pub cross_section: &'a CrossSection,
    pub layer_stack: &'a LayerStack,
    /// Vacuum wavelength (µm).
    pub wavelength: f64,
    pub num_modes: usize,
    pub settings: &'a SolverSettings,
}

/// The core trait that every mode-solving method implements.
pub trait ModeSolver: Send + Sync {
    /// Complex effective indices of the `num_modes` highest-index guided
    /// modes, sorted by descending real part.
    fn compute_cross_section_modes(&self, request: &ModeRequest<'_>) -> Result<Vec<Complex64>, SolveError>;

    /// Human-readable name of the method. Part of every cache key.
    fn method_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation() {
        assert!(SolverSettings::default().validate().is_ok());
        let bad = SolverSettings {
            order: 0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(SolveError::InvalidSettings(_))));
        let bad = SolverSettings {
            radius: Some(-5.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_point_failure_classification() {
        assert!(SolveError::NoGuidedMode { requested: 2, found: 1 }.is_point_failure());
        assert!(SolveError::NonPhysical("w".into()).is_point_failure());
        assert!(!SolveError::Unsupported("bend".into()).is_point_failure());
        assert!(!SolveError::Material(MaterialError::NotFound("x".into())).is_point_failure());
        assert!(!SolveError::Geometry(GeometryError::UnknownLayer {
            name: "slab90".into(),
            available: "core".into(),
        })
        .is_point_failure());
        assert!(SolveError::Geometry(GeometryError::InvalidDimension {
            what: "width".into(),
            value: -0.1,
        })
        .is_point_failure());
    }
}

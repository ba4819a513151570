//! The `Model` abstraction and the straight-waveguide model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use neff_geometry::{ComponentFactory, LayerStack};

use crate::adapter::ModeSolverAdapter;
use crate::error::ModelError;
use crate::parameter::{ParameterAssignment, ParameterSpace, LENGTH, LOSS, WAVELENGTH};
use crate::perturbation::{perturb, PerturbedInputs};
use crate::solver::SolverSettings;
use crate::sparams::{waveguide_sdict, SDict};
use crate::surrogate::{fit_surrogate, Surrogate, SurrogateKind};
use crate::sweep::SweepResult;

/// Model implementations selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Straight waveguide, one transmission entry per mode.
    #[default]
    Waveguide,
}

/// A parametric component: ground-truth solves and fast S-parameters.
pub trait Model: Send + Sync {
    fn family(&self) -> ModelFamily;

    fn space(&self) -> &ParameterSpace;

    /// Output vector from the mode solver (through its cache).
    fn solve(&self, inputs: &ParameterAssignment) -> Result<Vec<f64>, ModelError>;

    /// S-dictionary from the fitted surrogate.
    fn evaluate(&self, inputs: &ParameterAssignment) -> Result<SDict, ModelError>;
}

/// Straight waveguide whose modes are swept, fitted and evaluated.
pub struct WaveguideModel {
    space: ParameterSpace,
    factory: Arc<dyn ComponentFactory>,
    layer_stack: LayerStack,
    settings: SolverSettings,
    num_modes: usize,
    adapter: Arc<ModeSolverAdapter>,
    surrogate: Option<Arc<dyn Surrogate>>,
}

impl WaveguideModel {
    pub fn new(
        space: ParameterSpace,
        factory: Arc<dyn ComponentFactory>,
        layer_stack: LayerStack,
        settings: SolverSettings,
        num_modes: usize,
        adapter: Arc<ModeSolverAdapter>,
    ) -> Result<Self, ModelError> {
        if num_modes == 0 {
            return Err(ModelError::InvalidInput("num_modes must be at least 1".into()));
        }
        settings.validate()?;
        Ok(Self {
            space,
            factory,
            layer_stack,
            settings,
            num_modes,
            adapter,
            surrogate: None,
        })
    }

    pub fn num_modes(&self) -> usize {
        self.num_modes
    }

    /// Length of every output vector: real then imaginary parts.
    pub fn num_outputs(&self) -> usize {
        2 * self.num_modes
    }

    pub fn layer_stack(&self) -> &LayerStack {
        &self.layer_stack
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn adapter(&self) -> &ModeSolverAdapter {
        &self.adapter
    }

    pub fn surrogate(&self) -> Option<&Arc<dyn Surrogate>> {
        self.surrogate.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.surrogate.is_some()
    }

    /// Solver inputs for one assignment.
    pub fn perturbed(&self, inputs: &ParameterAssignment) -> Result<PerturbedInputs, ModelError> {
        perturb(&self.space, inputs, self.factory.as_ref(), &self.layer_stack)
    }

    /// [`Model::solve`] for a vector in [`ParameterSpace::names`] order.
    pub fn solve_vector(&self, values: &[f64]) -> Result<Vec<f64>, ModelError> {
        let assignment = self.space.assignment_from(values)?;
        self.solve(&assignment)
    }

    /// Fit a surrogate to `sweep`, replacing any previous fit.
    pub fn fit(&mut self, kind: &SurrogateKind, sweep: &SweepResult) -> Result<(), ModelError> {
        let names = self.space.names();
        if sweep.names.iter().map(String::as_str).ne(names.iter().copied()) {
            return Err(ModelError::Mismatch(format!(
                "sweep inputs {:?}, model inputs {:?}",
                sweep.names, names
            )));
        }
        if sweep.num_modes != self.num_modes {
            return Err(ModelError::Mismatch(format!(
                "sweep has {} modes, model {}",
                sweep.num_modes, self.num_modes
            )));
        }
        self.surrogate = Some(fit_surrogate(kind, sweep)?);
        Ok(())
    }

    /// Install an already fitted surrogate.
    pub fn set_surrogate(&mut self, surrogate: Arc<dyn Surrogate>) -> Result<(), ModelError> {
        if surrogate.num_inputs() != self.space.len() || surrogate.num_outputs() != self.num_outputs() {
            return Err(ModelError::Mismatch(format!(
                "surrogate maps {} → {}, model needs {} → {}",
                surrogate.num_inputs(),
                surrogate.num_outputs(),
                self.space.len(),
                self.num_outputs()
            )));
        }
        self.surrogate = Some(surrogate);
        Ok(())
    }

    /// Surrogate estimate of the real effective indices at `inputs`.
    pub fn predict_neffs(&self, inputs: &ParameterAssignment) -> Result<Vec<f64>, ModelError> {
        let surrogate = self.surrogate.as_ref().ok_or(ModelError::NotFitted)?;
        let vector = self.space.vector_from(inputs)?;
        (0..self.num_modes)
            .map(|k| Ok(surrogate.evaluate(k, &vector)?))
            .collect()
    }
}

impl Model for WaveguideModel {
    fn family(&self) -> ModelFamily {
        ModelFamily::Waveguide
    }

    fn space(&self) -> &ParameterSpace {
        &self.space
    }

    fn solve(&self, inputs: &ParameterAssignment) -> Result<Vec<f64>, ModelError> {
        let p = self.perturbed(inputs)?;
        let solved = self.adapter.solve(
            &p.component.cross_section,
            &p.layer_stack,
            p.wavelength,
            self.num_modes,
            &self.settings,
        )?;
        Ok(solved
            .neffs
            .iter()
            .map(|n| n.re)
            .chain(solved.neffs.iter().map(|n| n.im))
            .collect())
    }

    fn evaluate(&self, inputs: &ParameterAssignment) -> Result<SDict, ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        let wavelength = inputs.require(WAVELENGTH)?;
        if !(wavelength.is_finite() && wavelength > 0.0) {
            return Err(ModelError::InvalidInput(format!(
                "wavelength must be positive, got {wavelength}"
            )));
        }
        let length = inputs.require(LENGTH)?;
        let loss = inputs.require(LOSS)?;
        let neffs = self.predict_neffs(inputs)?;
        Ok(waveguide_sdict(&neffs, length, loss, wavelength))
    }
}

impl std::fmt::Debug for WaveguideModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveguideModel")
            .field("inputs", &self.space.names())
            .field("num_modes", &self.num_modes)
            .field("adapter", &self.adapter)
            .field("surrogate", &self.surrogate.as_ref().map(|s| s.kind_name().to_string()))
            .finish()
    }
}

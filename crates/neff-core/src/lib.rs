//! # neff Core
//!
//! Parameter-swept waveguide models: mode solving over a parameter grid,
//! surrogate fitting, and S-parameter evaluation for circuit simulation.
//!
//! ## Pipeline
//!
//! [`parameter::ParameterSpace`] → [`sweep::SweepDriver`] →
//! [`adapter::ModeSolverAdapter`] (cached) → [`surrogate`] fit →
//! [`model::WaveguideModel::evaluate`] (S-parameters).
//!
//! ## Modules
//!
//! - [`parameter`]: Named parameters, layer-thickness parameters, grids.
//! - [`perturbation`]: Parameter assignment → component + layer stack.
//! - [`solver`]: Mode-solver trait and the effective-index solver.
//! - [`cache`]: Content-addressed store for mode-solve results.
//! - [`adapter`]: Cached solver front-end.
//! - [`sweep`]: Grid sweeps over a parameter space.
//! - [`surrogate`]: Grid interpolation and MLP surrogates.
//! - [`sparams`]: Scattering dictionaries.
//! - [`model`]: The `Model` trait and the waveguide model.

pub mod adapter;
pub mod cache;
pub mod error;
pub mod model;
pub mod parameter;
pub mod perturbation;
pub mod solver;
pub mod sparams;
pub mod surrogate;
pub mod sweep;

pub use error::ModelError;

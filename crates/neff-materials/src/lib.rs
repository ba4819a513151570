//! # neff Materials
//!
//! Refractive-index providers used by the waveguide mode solvers. All
//! materials implement the [`MaterialProvider`](provider::MaterialProvider)
//! trait, which returns a complex index $\tilde{n} = n + ik$ at a vacuum
//! wavelength given in micrometres.
//!
//! ## Available providers
//!
//! | Provider | Module | Notes |
//! |----------|--------|-------|
//! | Sellmeier dispersion (Si, SiO₂, Si₃N₄) | [`sellmeier`] | Closed-form, lossless |
//! | Tabulated n/k data | [`tabulated`] | Natural cubic spline |
//! | Constant index | [`provider`] | Wavelength independent |
//!
//! Solvers look materials up by name through a [`library::MaterialLibrary`].

pub mod library;
pub mod provider;
pub mod sellmeier;
pub mod spline;
pub mod tabulated;

pub use library::MaterialLibrary;
pub use provider::{ConstantIndex, MaterialError, MaterialProvider};
pub use sellmeier::SellmeierMaterial;
pub use tabulated::TabulatedMaterial;

//! Material property provider trait.
//!
//! All material data sources implement [`MaterialProvider`], which returns
//! the complex refractive index at a vacuum wavelength in micrometres.

use num_complex::Complex64;
use thiserror::Error;

/// Errors from material providers.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Wavelength {wavelength_um} µm is outside the data range [{min}, {max}] µm")]
    OutOfRange {
        wavelength_um: f64,
        min: f64,
        max: f64,
    },

    #[error("Material not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    DataError(String),
}

/// Provides wavelength-dependent optical constants.
pub trait MaterialProvider: Send + Sync {
    /// Human-readable name of this material.
    fn name(&self) -> &str;

    /// Wavelength range over which the model is valid (µm).
    fn wavelength_range(&self) -> (f64, f64);

    /// Complex refractive index $\tilde{n} = n + ik$ at a given wavelength.
    fn refractive_index(&self, wavelength_um: f64) -> Result<Complex64, MaterialError>;

    /// Complex relative permittivity $\epsilon = \tilde{n}^2$.
    fn permittivity(&self, wavelength_um: f64) -> Result<Complex64, MaterialError> {
        let n = self.refractive_index(wavelength_um)?;
        Ok(n * n)
    }
}

/// Rejects wavelengths outside `range`.
pub(crate) fn check_range(wavelength_um: f64, range: (f64, f64)) -> Result<(), MaterialError> {
    let (min, max) = range;
    if !(wavelength_um >= min && wavelength_um <= max) {
        return Err(MaterialError::OutOfRange {
            wavelength_um,
            min,
            max,
        });
    }
    Ok(())
}

/// A wavelength-independent material (e.g. air or an idealised cladding).
#[derive(Debug, Clone)]
pub struct ConstantIndex {
    name: String,
    index: Complex64,
}

impl ConstantIndex {
    pub fn new(name: impl Into<String>, index: Complex64) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    /// Vacuum / air, n = 1.
    pub fn air() -> Self {
        Self::new("Air", Complex64::new(1.0, 0.0))
    }
}

impl MaterialProvider for ConstantIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    fn refractive_index(&self, wavelength_um: f64) -> Result<Complex64, MaterialError> {
        if !(wavelength_um > 0.0) {
            return Err(MaterialError::OutOfRange {
                wavelength_um,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(self.index)
    }
}

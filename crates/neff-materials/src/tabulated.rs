//! Tabulated optical constants interpolated with cubic splines.
//!
//! Measured n/k data is given at discrete wavelengths; natural cubic splines
//! give a smooth index in between, which keeps swept effective indices free
//! of kinks at the table knots.

use num_complex::Complex64;

use crate::provider::{check_range, MaterialError, MaterialProvider};
use crate::spline::CubicSpline;

/// Material defined by n(λ) and k(λ) tables.
pub struct TabulatedMaterial {
    name: String,
    spline_n: CubicSpline,
    spline_k: CubicSpline,
}

impl TabulatedMaterial {
    /// # Arguments
    /// * `wavelengths_um` - Strictly increasing wavelengths (µm).
    /// * `n` - Real index at each wavelength.
    /// * `k` - Extinction coefficient at each wavelength.
    pub fn new(
        name: impl Into<String>,
        wavelengths_um: Vec<f64>,
        n: Vec<f64>,
        k: Vec<f64>,
    ) -> Result<Self, MaterialError> {
        let name = name.into();
        if k.iter().any(|&v| v < 0.0) {
            return Err(MaterialError::DataError(format!(
                "{name}: extinction coefficient must be non-negative"
            )));
        }
        let spline_n = CubicSpline::new(wavelengths_um.clone(), n)?;
        let spline_k = CubicSpline::new(wavelengths_um, k)?;
        Ok(Self {
            name,
            spline_n,
            spline_k,
        })
    }
}

impl MaterialProvider for TabulatedMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.spline_n.domain()
    }

    fn refractive_index(&self, wavelength_um: f64) -> Result<Complex64, MaterialError> {
        check_range(wavelength_um, self.wavelength_range())?;
        let n = self.spline_n.evaluate(wavelength_um);
        let k = self.spline_k.evaluate(wavelength_um).max(0.0);
        Ok(Complex64::new(n, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lossy_polymer() -> TabulatedMaterial {
        TabulatedMaterial::new(
            "polymer",
            vec![1.50, 1.55, 1.60],
            vec![1.571, 1.570, 1.569],
            vec![1e-4, 2e-4, 3e-4],
        )
        .unwrap()
    }

    #[test]
    fn interpolates_between_knots() {
        let m = lossy_polymer();
        let n = m.refractive_index(1.525).unwrap();
        assert_relative_eq!(n.re, 1.5705, epsilon = 1e-6);
        assert_relative_eq!(n.im, 1.5e-4, epsilon = 1e-8);
    }

    #[test]
    fn enforces_table_range() {
        let m = lossy_polymer();
        assert!(m.refractive_index(1.7).is_err());
        assert_eq!(m.wavelength_range(), (1.50, 1.60));
    }

    #[test]
    fn rejects_negative_extinction() {
        assert!(TabulatedMaterial::new("bad", vec![1.0, 2.0], vec![1.5, 1.5], vec![0.0, -1.0]).is_err());
    }
}

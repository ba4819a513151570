//! Sellmeier dispersion models for common integrated-photonics materials.
//!
//! $$n^2(\lambda) = A + \sum_i \frac{B_i \lambda^2}{\lambda^2 - C_i}$$
//!
//! with $\lambda$ in micrometres and $C_i$ in µm².

use num_complex::Complex64;

use crate::provider::{check_range, MaterialError, MaterialProvider};

/// Lossless material described by a Sellmeier equation.
#[derive(Debug, Clone)]
pub struct SellmeierMaterial {
    name: String,
    a: f64,
    /// `(B_i, C_i)` pairs.
    terms: Vec<(f64, f64)>,
    range: (f64, f64),
}

impl SellmeierMaterial {
    pub fn new(name: impl Into<String>, a: f64, terms: Vec<(f64, f64)>, range: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            a,
            terms,
            range,
        }
    }

    /// Crystalline silicon, Tatian (1984) fit of Salzberg & Villa, 1.36–11 µm.
    pub fn silicon() -> Self {
        Self::new(
            "Si (Salzberg & Villa)",
            1.0,
            vec![
                (10.668_429_3, 0.301_516_485_f64.powi(2)),
                (0.003_043_474_8, 1.134_751_15_f64.powi(2)),
                (1.541_334_08, 1104.0_f64.powi(2)),
            ],
            (1.36, 11.0),
        )
    }

    /// Fused silica, Malitson (1965), 0.21–6.7 µm.
    pub fn silica() -> Self {
        Self::new(
            "SiO2 (Malitson)",
            1.0,
            vec![
                (0.696_166_3, 0.068_404_3_f64.powi(2)),
                (0.407_942_6, 0.116_241_4_f64.powi(2)),
                (0.897_479_4, 9.896_161_f64.powi(2)),
            ],
            (0.21, 6.7),
        )
    }

    /// Stoichiometric LPCVD silicon nitride, Luke et al. (2015), 0.31–5.504 µm.
    pub fn silicon_nitride() -> Self {
        Self::new(
            "Si3N4 (Luke)",
            1.0,
            vec![
                (3.0249, 0.135_340_6_f64.powi(2)),
                (40314.0, 1239.842_f64.powi(2)),
            ],
            (0.31, 5.504),
        )
    }
}

impl MaterialProvider for SellmeierMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.range
    }

    fn refractive_index(&self, wavelength_um: f64) -> Result<Complex64, MaterialError> {
        check_range(wavelength_um, self.range)?;
        let l2 = wavelength_um * wavelength_um;
        let n2 = self.a
            + self
                .terms
                .iter()
                .map(|&(b, c)| b * l2 / (l2 - c))
                .sum::<f64>();
        if n2 <= 0.0 {
            return Err(MaterialError::DataError(format!(
                "{}: negative n² = {n2:.4} at {wavelength_um} µm",
                self.name
            )));
        }
        Ok(Complex64::new(n2.sqrt(), 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn telecom_indices() {
        let si = SellmeierMaterial::silicon().refractive_index(1.55).unwrap();
        let sio2 = SellmeierMaterial::silica().refractive_index(1.55).unwrap();
        let sin = SellmeierMaterial::silicon_nitride().refractive_index(1.55).unwrap();
        assert_relative_eq!(si.re, 3.4777, epsilon = 2e-3);
        assert_relative_eq!(sio2.re, 1.4440, epsilon = 1e-3);
        assert_relative_eq!(sin.re, 1.9963, epsilon = 2e-3);
        assert_eq!(si.im, 0.0);
    }

    #[test]
    fn normal_dispersion_in_silica() {
        let sio2 = SellmeierMaterial::silica();
        let short = sio2.refractive_index(1.3).unwrap().re;
        let long = sio2.refractive_index(1.6).unwrap().re;
        assert!(short > long);
    }

    #[test]
    fn out_of_range_is_reported() {
        let err = SellmeierMaterial::silicon().refractive_index(0.8).unwrap_err();
        assert!(matches!(err, MaterialError::OutOfRange { .. }));
    }
}

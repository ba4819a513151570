//! Guided modes of a three-layer dielectric slab.
//!
//! For a core of index $n_1$ and thickness $d$ between a lower cladding $n_l$
//! and an upper cladding $n_u$, the $m$-th guided mode satisfies
//!
//! $$h d = m\pi + \arctan(\rho_l\, p / h) + \arctan(\rho_u\, q / h)$$
//!
//! with $h = k_0\sqrt{n_1^2 - n^2}$, $p = k_0\sqrt{n^2 - n_l^2}$,
//! $q = k_0\sqrt{n^2 - n_u^2}$, and $\rho = 1$ (TE) or $(n_1 / n_{l,u})^2$
//! (TM). The left side minus the right side decreases monotonically in $n$,
//! so each order has at most one root, found by bisection.

use std::f64::consts::PI;

/// Field polarization relative to the slab interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarization {
    /// Electric field parallel to the interfaces.
    Te,
    /// Magnetic field parallel to the interfaces.
    Tm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slab {
    pub core: f64,
    pub lower: f64,
    pub upper: f64,
    /// Core thickness (µm).
    pub thickness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlabMode {
    pub order: usize,
    pub neff: f64,
    /// Fraction of the mode power inside the core.
    pub confinement: f64,
}

const BISECTION_ITERATIONS: usize = 200;

impl Slab {
    /// The slab's guided modes, highest index first, at most `max_modes`.
    pub fn modes(&self, wavelength: f64, polarization: Polarization, max_modes: usize) -> Vec<SlabMode> {
        let n_lo = self.lower.max(self.upper);
        if self.thickness <= 0.0 || wavelength <= 0.0 || self.core <= n_lo {
            return Vec::new();
        }
        let k0 = 2.0 * PI / wavelength;

        let mut modes = Vec::new();
        for order in 0..max_modes {
            let f = |n: f64| self.mismatch(k0, n, order, polarization);
            if f(n_lo) <= 0.0 {
                break;
            }
            let (mut a, mut b) = (n_lo, self.core);
            for _ in 0..BISECTION_ITERATIONS {
                let c = 0.5 * (a + b);
                if f(c) > 0.0 {
                    a = c;
                } else {
                    b = c;
                }
                if b - a < 1e-15 {
                    break;
                }
            }
            let neff = 0.5 * (a + b);
            modes.push(SlabMode {
                order,
                neff,
                confinement: self.confinement(k0, neff, polarization),
            });
        }
        modes
    }

    pub fn fundamental(&self, wavelength: f64, polarization: Polarization) -> Option<SlabMode> {
        self.modes(wavelength, polarization, 1).into_iter().next()
    }

    fn rho(&self, polarization: Polarization) -> (f64, f64) {
        match polarization {
            Polarization::Te => (1.0, 1.0),
            Polarization::Tm => (
                (self.core / self.lower).powi(2),
                (self.core / self.upper).powi(2),
            ),
        }
    }

    fn wavenumbers(&self, k0: f64, n: f64) -> (f64, f64, f64) {
        let h = k0 * (self.core * self.core - n * n).max(0.0).sqrt();
        let p = k0 * (n * n - self.lower * self.lower).max(0.0).sqrt();
        let q = k0 * (n * n - self.upper * self.upper).max(0.0).sqrt();
        (h, p, q)
    }

    fn mismatch(&self, k0: f64, n: f64, order: usize, polarization: Polarization) -> f64 {
        let (h, p, q) = self.wavenumbers(k0, n);
        let (rl, ru) = self.rho(polarization);
        h * self.thickness - order as f64 * PI - (rl * p / h).atan() - (ru * q / h).atan()
    }

    /// Power fraction in the core from the closed-form field profile
    /// $\cos(h s - \varphi)$, $\tan\varphi = \rho_l p / h$.
    fn confinement(&self, k0: f64, n: f64, polarization: Polarization) -> f64 {
        let (h, p, q) = self.wavenumbers(k0, n);
        if h == 0.0 {
            return 1.0;
        }
        let (rl, _) = self.rho(polarization);
        let phi = (rl * p / h).atan();
        let d = self.thickness;
        let top = h * d - phi;
        let core = d / 2.0 + ((2.0 * top).sin() + (2.0 * phi).sin()) / (4.0 * h);
        let lower = if p > 0.0 { phi.cos().powi(2) / (2.0 * p) } else { f64::INFINITY };
        let upper = if q > 0.0 { top.cos().powi(2) / (2.0 * q) } else { f64::INFINITY };
        let total = core + lower + upper;
        if total.is_finite() {
            (core / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_symmetric_slab_mode_count() {
        // V = k0 (d/2) NA ≈ 7.02 → floor(2V/π) + 1 = 5 TE modes.
        let slab = Slab {
            core: 1.5,
            lower: 1.0,
            upper: 1.0,
            thickness: 2.0,
        };
        let modes = slab.modes(1.0, Polarization::Te, 20);
        assert_eq!(modes.len(), 5);
        for pair in modes.windows(2) {
            assert!(pair[0].neff > pair[1].neff);
        }
    }

    #[test]
    fn test_fundamental_satisfies_even_mode_equation() {
        let slab = Slab {
            core: 1.5,
            lower: 1.0,
            upper: 1.0,
            thickness: 2.0,
        };
        let m = slab.fundamental(1.0, Polarization::Te).unwrap();
        let k0 = 2.0 * PI;
        let h = k0 * (1.5f64.powi(2) - m.neff.powi(2)).sqrt();
        let p = k0 * (m.neff.powi(2) - 1.0).sqrt();
        assert_abs_diff_eq!((h * 1.0).tan(), p / h, epsilon = 1e-8);
        assert!(m.confinement > 0.9 && m.confinement <= 1.0);
    }

    #[test]
    fn test_tm_below_te() {
        let slab = Slab {
            core: 3.4777,
            lower: 1.444,
            upper: 1.444,
            thickness: 0.22,
        };
        let te = slab.fundamental(1.55, Polarization::Te).unwrap();
        let tm = slab.fundamental(1.55, Polarization::Tm).unwrap();
        assert!(te.neff > tm.neff);
        assert!(te.neff > 2.7 && te.neff < 3.0, "TE0 neff = {}", te.neff);
    }

    #[test]
    fn test_no_modes_without_index_contrast() {
        let slab = Slab {
            core: 1.4,
            lower: 1.444,
            upper: 1.0,
            thickness: 1.0,
        };
        assert!(slab.modes(1.55, Polarization::Te, 3).is_empty());
    }
}

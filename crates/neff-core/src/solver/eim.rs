//! Effective-index method for strip and rib waveguides.
//!
//! The 2D cross-section is reduced to two 1D slab problems. The vertical
//! slab (core layer between substrate and cladding) gives an effective index
//! for the core region, and one for the etched side regions of a rib. A
//! lateral slab of width `w` built from those indices then yields the modal
//! effective indices. Quasi-TE modes solve the vertical problem as TE and the
//! lateral one as TM; quasi-TM modes the reverse. Both families are merged
//! and sorted by descending index.
//!
//! When fewer guided modes exist than requested, the remainder is filled
//! with the lowest radiation modes of the background (the side regions),
//! discretised by a hard-walled window [`RADIATION_MARGIN`] wider than the
//! guide on each side. These sit below every guided index and vary smoothly
//! with the inputs, so a sweep keeps a fixed mode count across cutoffs.

use log::debug;
use num_complex::Complex64;

use neff_materials::MaterialLibrary;

use super::slab::{Polarization, Slab};
use super::{ModeRequest, ModeSolver, SolveError};

/// Lateral clearance (µm) between the guide and the window walls that
/// discretise the radiation continuum.
pub const RADIATION_MARGIN: f64 = 2.0;

/// Analytic mode solver; needs no mesh, so mesh settings only enter the cache key.
#[derive(Debug, Clone)]
pub struct EffectiveIndexSolver {
    materials: MaterialLibrary,
}

impl EffectiveIndexSolver {
    pub fn new(materials: MaterialLibrary) -> Self {
        Self { materials }
    }

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    fn index(&self, material: &str, wavelength: f64) -> Result<Complex64, SolveError> {
        Ok(self.materials.get(material)?.refractive_index(wavelength)?)
    }
}

impl Default for EffectiveIndexSolver {
    fn default() -> Self {
        Self::new(MaterialLibrary::builtin())
    }
}

impl ModeSolver for EffectiveIndexSolver {
    fn compute_cross_section_modes(&self, request: &ModeRequest<'_>) -> Result<Vec<Complex64>, SolveError> {
        let xs = request.cross_section;
        let wl = request.wavelength;
        if let Some(radius) = request.settings.radius {
            return Err(SolveError::Unsupported(format!(
                "bent waveguides (radius {radius} µm)"
            )));
        }
        if request.num_modes == 0 {
            return Err(SolveError::InvalidSettings("num_modes must be at least 1".into()));
        }
        if !(wl.is_finite() && wl > 0.0) {
            return Err(SolveError::NonPhysical(format!("wavelength {wl}")));
        }
        if !(xs.width.is_finite() && xs.width > 0.0) {
            return Err(SolveError::NonPhysical(format!("waveguide width {}", xs.width)));
        }

        let stack = request.layer_stack;
        let core = stack.get(&xs.core_layer)?;
        if core.thickness <= 0.0 {
            return Err(SolveError::NonPhysical(format!(
                "core thickness {}",
                core.thickness
            )));
        }
        let slab_thickness = match &xs.slab_layer {
            Some(name) => {
                let t = stack.get(name)?.thickness;
                if t < 0.0 || t >= core.thickness {
                    return Err(SolveError::NonPhysical(format!(
                        "slab thickness {t} must lie in [0, {})",
                        core.thickness
                    )));
                }
                t
            }
            None => 0.0,
        };

        let n_core = self.index(&core.material, wl)?;
        let n_clad = self.index(&stack.get(&xs.cladding_layer)?.material, wl)?;
        let n_sub = self.index(&stack.get(&xs.substrate_layer)?.material, wl)?;
        let outside = if n_clad.re >= n_sub.re { n_clad } else { n_sub };

        let mut modes: Vec<Complex64> = Vec::new();
        // Highest side-region index over both families, with its extinction.
        let mut background: Option<Complex64> = None;
        for (vertical, lateral) in [
            (Polarization::Te, Polarization::Tm),
            (Polarization::Tm, Polarization::Te),
        ] {
            let core_slab = Slab {
                core: n_core.re,
                lower: n_sub.re,
                upper: n_clad.re,
                thickness: core.thickness,
            };
            let Some(v) = core_slab.fundamental(wl, vertical) else {
                continue;
            };
            let side = if slab_thickness > 0.0 {
                Slab {
                    thickness: slab_thickness,
                    ..core_slab
                }
                .fundamental(wl, vertical)
                .map(|m| {
                    let k = m.confinement * n_core.im + (1.0 - m.confinement) * n_clad.im;
                    Complex64::new(m.neff, k)
                })
            } else {
                None
            };
            let side = side.unwrap_or(outside);
            let n_side = side.re;
            if background.map_or(true, |b| side.re > b.re) {
                background = Some(side);
            }

            let lateral_slab = Slab {
                core: v.neff,
                lower: n_side,
                upper: n_side,
                thickness: xs.width,
            };
            for m in lateral_slab.modes(wl, lateral, request.num_modes) {
                let gamma = v.confinement * m.confinement;
                let k = gamma * n_core.im + (1.0 - gamma) * n_clad.im;
                modes.push(Complex64::new(m.neff, k));
            }
        }

        let guided = modes.len();
        debug!(
            "EIM w={:.4} t={:.4} λ={:.4}: {} guided modes",
            xs.width,
            core.thickness,
            wl,
            guided
        );
        let Some(background) = background.filter(|_| guided > 0) else {
            return Err(SolveError::NoGuidedMode {
                requested: request.num_modes,
                found: 0,
            });
        };
        if guided < request.num_modes {
            let window = xs.width + 2.0 * RADIATION_MARGIN;
            let tail = radiation_modes(background, wl, window, request.num_modes - guided);
            if tail.len() < request.num_modes - guided {
                return Err(SolveError::NoGuidedMode {
                    requested: request.num_modes,
                    found: guided + tail.len(),
                });
            }
            modes.extend(tail);
        }

        modes.sort_by(|a, b| b.re.total_cmp(&a.re));
        modes.truncate(request.num_modes);
        Ok(modes)
    }

    fn method_name(&self) -> &str {
        "effective-index"
    }
}

/// Lowest `count` modes of a uniform medium between hard walls `window`
/// apart: `n_j² = n² - (jλ / 2W)²`, stopping where the index would vanish.
fn radiation_modes(background: Complex64, wavelength: f64, window: f64, count: usize) -> Vec<Complex64> {
    (1..=count)
        .map_while(|j| {
            let kx = j as f64 * wavelength / (2.0 * window);
            let n2 = background.re * background.re - kx * kx;
            (n2 > 0.0).then(|| Complex64::new(n2.sqrt(), background.im))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolverSettings;
    use approx::assert_relative_eq;
    use neff_geometry::{CrossSection, LayerStack};

    fn solve(xs: &CrossSection, stack: &LayerStack, num_modes: usize) -> Result<Vec<Complex64>, SolveError> {
        let settings = SolverSettings::default();
        EffectiveIndexSolver::default().compute_cross_section_modes(&ModeRequest {
            cross_section: xs,
            layer_stack: stack,
            wavelength: 1.55,
            num_modes,
            settings: &settings,
        })
    }

    #[test]
    fn test_strip_fundamental_in_range() {
        let stack = LayerStack::default_soi();
        let modes = solve(&CrossSection::strip(0.5), &stack, 2).unwrap();
        assert_eq!(modes.len(), 2);
        assert!(modes[0].re > 2.2 && modes[0].re < 2.9, "neff = {}", modes[0].re);
        assert!(modes[0].re >= modes[1].re);
        assert!(modes[1].re > 1.444);
        // Lossless Sellmeier materials.
        assert_eq!(modes[0].im, 0.0);
    }

    #[test]
    fn test_neff_grows_with_width() {
        let stack = LayerStack::default_soi();
        let narrow = solve(&CrossSection::strip(0.45), &stack, 1).unwrap();
        let wide = solve(&CrossSection::strip(0.8), &stack, 1).unwrap();
        assert!(wide[0].re > narrow[0].re);
    }

    #[test]
    fn test_rib_above_strip() {
        let stack = LayerStack::default_soi();
        let strip = solve(&CrossSection::strip(0.5), &stack, 1).unwrap();
        let rib = solve(&CrossSection::rib(0.5), &stack, 1).unwrap();
        assert!(rib[0].re > strip[0].re);
    }

    #[test]
    fn test_errors() {
        let stack = LayerStack::default_soi();
        assert!(matches!(
            solve(&CrossSection::strip(0.0), &stack, 1),
            Err(SolveError::NonPhysical(_))
        ));
        // Core below its surroundings guides nothing.
        let inverted = stack.clone().with_layer("core", neff_geometry::LayerLevel::new(0.22, 0.0, "sio2"));
        assert!(matches!(
            solve(&CrossSection::strip(0.5), &inverted, 2),
            Err(SolveError::NoGuidedMode { requested: 2, found: 0 })
        ));
        // More modes than the radiation window holds.
        assert!(matches!(
            solve(&CrossSection::strip(0.5), &stack, 40),
            Err(SolveError::NoGuidedMode { requested: 40, .. })
        ));

        let thin = stack.with_thickness("core", 0.0).unwrap();
        assert!(matches!(
            solve(&CrossSection::strip(0.5), &thin, 1),
            Err(SolveError::NonPhysical(_))
        ));

        let settings = SolverSettings {
            radius: Some(10.0),
            ..Default::default()
        };
        let err = EffectiveIndexSolver::default()
            .compute_cross_section_modes(&ModeRequest {
                cross_section: &CrossSection::strip(0.5),
                layer_stack: &stack,
                wavelength: 1.55,
                num_modes: 1,
                settings: &settings,
            })
            .unwrap_err();
        assert!(matches!(err, SolveError::Unsupported(_)));
    }

    #[test]
    fn test_missing_modes_filled_below_cutoff() {
        let stack = LayerStack::default_soi();
        let xs = CrossSection::rib(0.5);
        let modes = solve(&xs, &stack, 4).unwrap();
        assert_eq!(modes.len(), 4);
        assert!(modes.windows(2).all(|w| w[0].re >= w[1].re));
        assert!(modes[0].re > 2.2);
        for n in &modes {
            assert!(n.re > 0.0 && n.re.is_finite());
            assert!(n.im.is_finite() && n.im >= 0.0);
        }
        assert_eq!(solve(&xs, &stack, 4).unwrap(), modes);

        let many = solve(&CrossSection::strip(0.5), &stack, 6).unwrap();
        assert_eq!(many.len(), 6);
        assert!(many.windows(2).all(|w| w[0].re >= w[1].re));
        // The filled tail lies inside the oxide continuum.
        assert!(many[5].re < 1.445);
        assert!(many[5].re > 1.0);
    }

    #[test]
    fn test_radiation_modes_descend_and_stop() {
        let n = Complex64::new(1.444, 1e-6);
        let tail = radiation_modes(n, 1.55, 4.5, 3);
        assert_eq!(tail.len(), 3);
        assert!(tail[0].re < n.re);
        assert!(tail.windows(2).all(|w| w[0].re > w[1].re));
        assert_relative_eq!(tail[0].re, (1.444f64.powi(2) - (1.55f64 / 9.0).powi(2)).sqrt(), epsilon = 1e-12);
        assert_eq!(tail[2].im, 1e-6);

        // A narrow window runs out of modes.
        assert!(radiation_modes(n, 1.55, 0.5, 5).len() < 5);
    }

    #[test]
    fn test_unknown_material() {
        let stack = LayerStack::default_soi().with_layer(
            "core",
            neff_geometry::LayerLevel::new(0.22, 0.0, "unobtainium"),
        );
        assert!(matches!(
            solve(&CrossSection::strip(0.5), &stack, 1),
            Err(SolveError::Material(_))
        ));
    }
}

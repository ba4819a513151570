//! Cached front-end to a [`ModeSolver`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, trace, warn};
use num_complex::Complex64;
use serde::Serialize;

use neff_geometry::{CrossSection, LayerStack};

use crate::cache::{CacheEntry, CacheKey, ModeCache};
use crate::solver::{MeshResolution, ModeRequest, ModeSolver, SolveError, SolverSettings};

/// Bumped whenever the meaning of a cached entry changes.
const CACHE_FORMAT: u32 = 2;

/// Everything that determines a solve result, in canonical order.
#[derive(Serialize)]
struct KeyInputs<'a> {
    format: u32,
    solver: &'a str,
    cross_section: &'a CrossSection,
    layer_stack: &'a LayerStack,
    wavelength: f64,
    num_modes: usize,
    order: u32,
    radius: Option<f64>,
    resolutions: &'a BTreeMap<String, MeshResolution>,
}

/// Outcome of one adapter call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSolveResult {
    pub neffs: Vec<Complex64>,
    pub key: CacheKey,
    pub from_cache: bool,
}

/// Solves cross-sections through a cache.
pub struct ModeSolverAdapter {
    solver: Arc<dyn ModeSolver>,
    cache: Arc<dyn ModeCache>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ModeSolverAdapter {
    pub fn new(solver: Arc<dyn ModeSolver>, cache: Arc<dyn ModeCache>) -> Self {
        Self {
            solver,
            cache,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn solver(&self) -> &dyn ModeSolver {
        self.solver.as_ref()
    }

    pub fn cache(&self) -> &dyn ModeCache {
        self.cache.as_ref()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Cache key for a request. Settings `overwrite` does not take part.
    pub fn cache_key(&self, request: &ModeRequest<'_>) -> Result<CacheKey, SolveError> {
        Ok(self.key_inputs(request)?.0)
    }

    /// Key plus the canonical inputs it was hashed from.
    fn key_inputs(&self, request: &ModeRequest<'_>) -> Result<(CacheKey, String), SolveError> {
        let inputs = KeyInputs {
            format: CACHE_FORMAT,
            solver: self.solver.method_name(),
            cross_section: request.cross_section,
            layer_stack: request.layer_stack,
            wavelength: request.wavelength,
            num_modes: request.num_modes,
            order: request.settings.order,
            radius: request.settings.radius,
            resolutions: &request.settings.resolutions,
        };
        let json = CacheKey::canonical(&inputs)?;
        Ok((CacheKey::from_canonical(&json), json))
    }

    /// Complex effective indices for a cross-section, served from the cache
    /// unless `settings.overwrite` is set.
    pub fn solve(
        &self,
        cross_section: &CrossSection,
        layer_stack: &LayerStack,
        wavelength: f64,
        num_modes: usize,
        settings: &SolverSettings,
    ) -> Result<ModeSolveResult, SolveError> {
        settings.validate()?;
        if num_modes == 0 {
            return Err(SolveError::InvalidSettings("num_modes must be at least 1".into()));
        }
        if !(wavelength.is_finite() && wavelength > 0.0) {
            return Err(SolveError::NonPhysical(format!("wavelength {wavelength}")));
        }
        let request = ModeRequest {
            cross_section,
            layer_stack,
            wavelength,
            num_modes,
            settings,
        };
        let (key, inputs) = self.key_inputs(&request)?;

        if !settings.overwrite {
            if let Some(entry) = self.cache.get(&key)? {
                if entry.inputs != inputs {
                    warn!("cache entry {key} was stored for different inputs; re-solving");
                } else if entry.neffs.len() == num_modes {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!("cache hit {key}");
                    return Ok(ModeSolveResult {
                        neffs: entry.neffs,
                        key,
                        from_cache: true,
                    });
                } else {
                    debug!(
                        "cache entry {key} holds {} modes, {num_modes} requested; re-solving",
                        entry.neffs.len()
                    );
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let neffs = self.solver.compute_cross_section_modes(&request)?;
        if neffs.len() != num_modes {
            return Err(SolveError::Failed(format!(
                "{} returned {} modes, {num_modes} requested",
                self.solver.method_name(),
                neffs.len()
            )));
        }
        if let Some(bad) = neffs.iter().find(|n| !(n.re.is_finite() && n.im.is_finite()) || n.re < 0.0) {
            return Err(SolveError::NonPhysical(format!("effective index {bad}")));
        }

        let entry = CacheEntry {
            inputs,
            neffs,
            solver: self.solver.method_name().to_string(),
            mesh_filename: key.mesh_filename(),
        };
        self.cache.put(&key, &entry)?;
        debug!("solved and cached {key} ({})", self.cache.describe());
        Ok(ModeSolveResult {
            neffs: entry.neffs,
            key,
            from_cache: false,
        })
    }
}

impl std::fmt::Debug for ModeSolverAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeSolverAdapter")
            .field("solver", &self.solver.method_name())
            .field("cache", &self.cache.describe())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

//! End-to-end sweeps with the effective-index solver: a strip guide over an
//! on-disk cache, and a multimode rib guide fitted and evaluated to an
//! S-dictionary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use num_complex::Complex64;

use neff_compute::CpuBackend;
use neff_core::adapter::ModeSolverAdapter;
use neff_core::cache::{DiskCache, MemoryCache};
use neff_core::model::{Model, WaveguideModel};
use neff_core::parameter::{
    LayerStackThickness, NamedParameter, ParameterAssignment, ParameterSpace, SweepMode, LENGTH,
    LOSS, WAVELENGTH,
};
use neff_core::solver::{EffectiveIndexSolver, ModeRequest, ModeSolver, SolveError, SolverSettings};
use neff_core::surrogate::SurrogateKind;
use neff_core::sweep::{FailurePolicy, SweepDriver};
use neff_core::ModelError;
use neff_geometry::{CrossSection, GeometryError, LayerStack, StraightFactory};

/// Counts calls reaching the wrapped solver.
struct Counting {
    inner: EffectiveIndexSolver,
    calls: AtomicUsize,
}

impl ModeSolver for Counting {
    fn compute_cross_section_modes(&self, request: &ModeRequest<'_>) -> Result<Vec<Complex64>, SolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compute_cross_section_modes(request)
    }

    fn method_name(&self) -> &str {
        self.inner.method_name()
    }
}

fn build(cache_dir: &std::path::Path) -> (Arc<Counting>, WaveguideModel) {
    let stack = LayerStack::default_soi();
    let space = ParameterSpace::builder(&stack)
        .trainable("width", NamedParameter::new(0.45, 0.7, 0.5, 0.05).unwrap())
        .trainable(WAVELENGTH, NamedParameter::new(1.5, 1.6, 1.55, 0.05).unwrap())
        .fixed(LENGTH, NamedParameter::fixed(100.0))
        .fixed(LOSS, NamedParameter::fixed(0.002))
        .thickness(
            "core_thickness",
            LayerStackThickness::new("core", NamedParameter::new(0.21, 0.23, 0.22, 0.01).unwrap()),
        )
        .build()
        .unwrap();
    let solver = Arc::new(Counting {
        inner: EffectiveIndexSolver::default(),
        calls: AtomicUsize::new(0),
    });
    let cache = Arc::new(DiskCache::open(cache_dir).unwrap());
    let model = WaveguideModel::new(
        space,
        Arc::new(StraightFactory::new(CrossSection::strip(0.5))),
        stack,
        SolverSettings::default(),
        2,
        Arc::new(ModeSolverAdapter::new(solver.clone(), cache)),
    )
    .unwrap();
    (solver, model)
}

#[test]
fn test_eim_sweep_is_physical_and_cached() {
    let dir = tempfile::tempdir().unwrap();
    let (solver, mut model) = build(dir.path());
    let driver = SweepDriver::new(Arc::new(CpuBackend::with_threads(2).unwrap()), FailurePolicy::Abort);

    let sweep = driver.sweep(&model, SweepMode::Steps).unwrap();
    // 6 widths × 3 wavelengths × 3 thicknesses.
    assert_eq!(sweep.len(), 54);
    assert_eq!(solver.calls.load(Ordering::SeqCst), 54);
    assert_eq!(DiskCache::open(dir.path()).unwrap().len().unwrap(), 54);

    for (x, y) in sweep.inputs.iter().zip(&sweep.outputs) {
        assert!(y[0] > 1.444 && y[0] < 3.48, "neff {} at {x:?}", y[0]);
        assert!(y[0] >= y[1]);
    }

    // Wider cores confine more: neff grows along the width axis.
    let fundamental = |w: f64| {
        sweep
            .inputs
            .iter()
            .zip(&sweep.outputs)
            .find(|(x, _)| (x[0] - w).abs() < 1e-9 && (x[1] - 1.55).abs() < 1e-9 && (x[4] - 0.22).abs() < 1e-9)
            .map(|(_, y)| y[0])
            .unwrap()
    };
    assert!(fundamental(0.7) > fundamental(0.5));

    // A second sweep is served entirely from disk.
    let again = driver.sweep(&model, SweepMode::Steps).unwrap();
    assert_eq!(solver.calls.load(Ordering::SeqCst), 54);
    assert_eq!(again.outputs, sweep.outputs);

    model.fit(&SurrogateKind::Grid, &sweep).unwrap();
    let at_grid = model.space().assignment_from(&sweep.inputs[7]).unwrap();
    let predicted = model.predict_neffs(&at_grid).unwrap();
    assert_eq!(predicted[0], sweep.outputs[7][0]);

    let sdict = model.evaluate(&model.space().nominal()).unwrap();
    assert_eq!(sdict.len(), 4);
    let t = sdict[&("o1@0".to_string(), "o2@0".to_string())];
    assert_abs_diff_eq!(t.norm(), 10f64.powf(-0.002 * 100.0 / 20.0), epsilon = 1e-12);
}

#[test]
fn test_reopened_cache_skips_solver() {
    let dir = tempfile::tempdir().unwrap();
    let (first, model) = build(dir.path());
    let driver = SweepDriver::new(Arc::new(CpuBackend::with_threads(2).unwrap()), FailurePolicy::Abort);
    let a = driver.sweep(&model, SweepMode::Corners).unwrap();
    assert_eq!(first.calls.load(Ordering::SeqCst), 8);

    let (second, model) = build(dir.path());
    let b = driver.sweep(&model, SweepMode::Corners).unwrap();
    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    assert_eq!(a.outputs, b.outputs);
}

/// Rib guide with four modes over width and wavelength; length 10 µm, loss 1 dB/µm.
fn rib_model(stack: LayerStack) -> WaveguideModel {
    let space = ParameterSpace::builder(&stack)
        .trainable("width", NamedParameter::new(0.3, 1.0, 0.5, 0.1).unwrap())
        .trainable(WAVELENGTH, NamedParameter::new(1.545, 1.555, 1.55, 0.005).unwrap())
        .fixed(LENGTH, NamedParameter::fixed(10.0))
        .fixed(LOSS, NamedParameter::fixed(1.0))
        .thickness(
            "core_thickness",
            LayerStackThickness::new("core", NamedParameter::fixed(0.22)),
        )
        .build()
        .unwrap();
    WaveguideModel::new(
        space,
        Arc::new(StraightFactory::new(CrossSection::rib(0.5))),
        stack,
        SolverSettings::default(),
        4,
        Arc::new(ModeSolverAdapter::new(
            Arc::new(EffectiveIndexSolver::default()),
            Arc::new(MemoryCache::new()),
        )),
    )
    .unwrap()
}

#[test]
fn test_multimode_rib_corners_fit_and_evaluate() {
    let mut model = rib_model(LayerStack::default_soi());
    let driver = SweepDriver::new(Arc::new(CpuBackend::with_threads(2).unwrap()), FailurePolicy::Skip);

    // The narrow corners guide fewer than four modes; the rest are filled.
    let sweep = driver.sweep(&model, SweepMode::Corners).unwrap();
    assert_eq!(sweep.len(), 4);
    assert!(sweep.failures.is_empty());
    for y in &sweep.outputs {
        assert_eq!(y.len(), 8);
        assert!(y[..4].windows(2).all(|w| w[0] >= w[1]));
        assert!(y[0] > 2.0);
        assert!(y[4..].iter().all(|k| k.is_finite() && *k >= 0.0));
    }

    let direct = model.solve_vector(&[0.5, 1.55, 10.0, 1.0, 0.22]).unwrap();
    assert_eq!(direct.len(), 8);
    assert!(direct[..4].windows(2).all(|w| w[0] >= w[1]));

    model.fit(&SurrogateKind::Grid, &sweep).unwrap();
    let query = ParameterAssignment::new()
        .with("width", 0.5)
        .with(WAVELENGTH, 1.55)
        .with(LENGTH, 10.0)
        .with(LOSS, 1.0)
        .with("core_thickness", 0.22);
    let sdict = model.evaluate(&query).unwrap();
    assert_eq!(sdict.len(), 8);
    for ((a, b), t) in &sdict {
        assert_eq!(sdict[&(b.clone(), a.clone())], *t);
        assert_abs_diff_eq!(t.norm(), 10f64.powf(-0.5), epsilon = 1e-12);
    }
    assert!(sdict.contains_key(&("o1@3".to_string(), "o2@3".to_string())));
}

#[test]
fn test_missing_slab_layer_aborts_skipping_sweep() {
    let stack = LayerStack::default_soi().filtered(&["box", "core", "clad"]).unwrap();
    let model = rib_model(stack);
    let driver = SweepDriver::new(Arc::new(CpuBackend::with_threads(2).unwrap()), FailurePolicy::Skip);

    match driver.sweep(&model, SweepMode::Corners).unwrap_err() {
        ModelError::SweepPoint { index, source, .. } => {
            assert_eq!(index, 0);
            assert!(matches!(
                *source,
                ModelError::Solve(SolveError::Geometry(GeometryError::UnknownLayer { ref name, .. }))
                    if name == "slab90"
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

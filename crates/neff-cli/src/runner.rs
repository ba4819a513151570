//! Job runner: builds the model from a configuration, sweeps, fits and
//! evaluates the requested query points.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::debug;
use num_complex::Complex64;

use neff_compute::{ComputeBackend, ComputeError, CpuBackend, SerialBackend};
use neff_core::adapter::ModeSolverAdapter;
use neff_core::cache::{DiskCache, MemoryCache, ModeCache};
use neff_core::model::{Model, ModelFamily, WaveguideModel};
use neff_core::parameter::{LayerStackThickness, ParameterAssignment, ParameterSpace};
use neff_core::solver::{EffectiveIndexSolver, ModeSolver, SolverSettings};
use neff_core::sparams::SDict;
use neff_core::sweep::{SweepDriver, SweepResult};
use neff_geometry::{LayerStack, StraightFactory};
use neff_materials::{ConstantIndex, MaterialLibrary, TabulatedMaterial};

use crate::config::{JobConfig, MaterialConfig, ParameterKind, SweepConfig};

/// Everything a job produces.
pub struct JobOutput {
    pub sweep: SweepResult,
    /// One S-dictionary per `[[query]]` entry, with the full assignment used.
    pub queries: Vec<(ParameterAssignment, SDict)>,
}

/// Run a full job: sweep, fit the surrogate and evaluate every query.
pub fn run(job: &JobConfig) -> Result<JobOutput> {
    let mut model = build_model(job)?;
    let backend = create_backend(&job.sweep)?;
    let driver = SweepDriver::new(backend, job.sweep.failure_policy);

    let space = model.space();
    println!(
        "Parameters: {} ({} grid points, {:?})",
        space.names().join(", "),
        space.grid_size(job.sweep.mode),
        job.sweep.mode
    );
    let sweep = driver.sweep(&model, job.sweep.mode)?;
    println!(
        "Sweep: {} points solved, {} failed",
        sweep.len(),
        sweep.failures.len()
    );
    for failure in &sweep.failures {
        println!("  point {} {:?}: {}", failure.index, failure.inputs, failure.error);
    }

    let adapter = model.adapter();
    println!(
        "Mode cache ({}): {} hits, {} misses",
        adapter.cache().describe(),
        adapter.hits(),
        adapter.misses()
    );

    if job.query.is_empty() {
        return Ok(JobOutput {
            sweep,
            queries: Vec::new(),
        });
    }

    model
        .fit(&job.surrogate, &sweep)
        .context("fitting surrogate")?;
    if let Some(s) = model.surrogate() {
        println!("Surrogate: {}", s.kind_name());
    }

    let mut queries = Vec::with_capacity(job.query.len());
    for (i, query) in job.query.iter().enumerate() {
        let assignment = query_assignment(model.space(), query)
            .with_context(|| format!("query {i}"))?;
        let sdict = model
            .evaluate(&assignment)
            .with_context(|| format!("evaluating query {i}"))?;
        queries.push((assignment, sdict));
    }
    Ok(JobOutput { sweep, queries })
}

/// Assemble the model a job describes. No solving happens here.
pub fn build_model(job: &JobConfig) -> Result<WaveguideModel> {
    let layer_stack = build_layer_stack(job)?;
    let space = build_space(job, &layer_stack)?;
    let materials = build_materials(job)?;

    let solver: Arc<dyn ModeSolver> = match job.solver.method.as_str() {
        "eim" => Arc::new(EffectiveIndexSolver::new(materials)),
        other => bail!("unknown solver method '{other}' (available: eim)"),
    };
    let cache: Arc<dyn ModeCache> = match &job.solver.cache_dir {
        Some(dir) => Arc::new(DiskCache::open(job.resolve(dir))?),
        None => Arc::new(MemoryCache::new()),
    };
    let settings = SolverSettings {
        order: job.solver.order,
        radius: job.solver.radius,
        resolutions: job.solver.resolutions.clone(),
        overwrite: job.solver.overwrite,
    };
    debug!(
        "Building {:?} model: solver {}, cache {}",
        job.model.family,
        solver.method_name(),
        cache.describe()
    );
    let adapter = Arc::new(ModeSolverAdapter::new(solver, cache));

    let model = match job.model.family {
        ModelFamily::Waveguide => WaveguideModel::new(
            space,
            Arc::new(StraightFactory::new(job.model.cross_section.clone())),
            layer_stack,
            settings,
            job.model.num_modes,
            adapter,
        )?,
    };
    Ok(model)
}

fn build_layer_stack(job: &JobConfig) -> Result<LayerStack> {
    let mut stack = match job.layer_stack.preset.as_str() {
        "soi" => LayerStack::default_soi(),
        "none" => LayerStack::new(),
        other => bail!("unknown layer stack preset '{other}' (available: soi, none)"),
    };
    for (name, level) in &job.layer_stack.layers {
        stack.layers.insert(name.clone(), level.clone());
    }
    if stack.layers.is_empty() {
        bail!("layer stack is empty");
    }
    Ok(stack)
}

fn build_space(job: &JobConfig, layer_stack: &LayerStack) -> Result<ParameterSpace> {
    let mut builder = ParameterSpace::builder(layer_stack);
    for p in &job.parameters {
        let parameter = p.named_parameter()?;
        builder = match p.kind {
            ParameterKind::Trainable => builder.trainable(&p.name, parameter),
            ParameterKind::Litho => builder.litho(&p.name, parameter),
            ParameterKind::Fixed => builder.fixed(&p.name, parameter),
            ParameterKind::Thickness => {
                let layer = p
                    .layer
                    .as_deref()
                    .with_context(|| format!("thickness parameter '{}' needs a `layer`", p.name))?;
                builder.thickness(&p.name, LayerStackThickness::new(layer, parameter))
            }
        };
    }
    Ok(builder.build()?)
}

fn build_materials(job: &JobConfig) -> Result<MaterialLibrary> {
    let mut lib = MaterialLibrary::builtin();
    for (id, material) in &job.materials {
        match material {
            MaterialConfig::Constant { n, k } => {
                lib.insert(id, ConstantIndex::new(id, Complex64::new(*n, *k)));
            }
            MaterialConfig::Table { file } => {
                let path = job.resolve(file);
                lib.insert(id, load_nk_table(id, &path)?);
            }
        }
    }
    Ok(lib)
}

/// Read a `wavelength_um,n,k` CSV. Comment lines start with `#`; a
/// non-numeric first row is taken as a header.
pub fn load_nk_table(name: &str, path: &Path) -> Result<TabulatedMaterial> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading material table {}", path.display()))?;
    let (mut wl, mut n, mut k) = (Vec::new(), Vec::new(), Vec::new());
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let parsed: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
        match parsed {
            Ok(v) if v.len() == 3 => {
                wl.push(v[0]);
                n.push(v[1]);
                k.push(v[2]);
            }
            Err(_) if wl.is_empty() => continue,
            _ => bail!(
                "{}:{}: expected `wavelength_um,n,k`",
                path.display(),
                lineno + 1
            ),
        }
    }
    debug!("Loaded {} n/k rows for '{name}' from {}", wl.len(), path.display());
    TabulatedMaterial::new(name, wl, n, k)
        .with_context(|| format!("material table {}", path.display()))
}

/// Nominal assignment overridden by the query's values.
pub fn query_assignment(
    space: &ParameterSpace,
    query: &std::collections::BTreeMap<String, f64>,
) -> Result<ParameterAssignment> {
    let mut assignment = space.nominal();
    for (name, &value) in query {
        if space.index_of(name).is_none() {
            bail!(
                "unknown parameter '{name}' (declared: {})",
                space.names().join(", ")
            );
        }
        assignment.insert(name.clone(), value);
    }
    Ok(assignment)
}

/// Write the sweep as CSV: inputs then `neff_re_k`, `neff_im_k` columns.
pub fn write_sweep_csv(sweep: &SweepResult, path: &Path, job: &JobConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;

    writeln!(file, "# neff parameter sweep")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# solver: {}", job.solver.method)?;
    writeln!(file, "# mode: {:?}", sweep.mode)?;
    writeln!(file, "# points: {} of {}", sweep.len(), sweep.grid_size)?;
    for failure in &sweep.failures {
        writeln!(
            file,
            "# failed {} {:?}: {}",
            failure.index, failure.inputs, failure.error
        )?;
    }
    writeln!(file, "#")?;

    let header: Vec<String> = sweep
        .names
        .iter()
        .cloned()
        .chain(sweep.output_names())
        .collect();
    writeln!(file, "{}", header.join(","))?;
    for (x, y) in sweep.inputs.iter().zip(&sweep.outputs) {
        let row: Vec<String> = x.iter().chain(y).map(|v| format!("{v:.12e}")).collect();
        writeln!(file, "{}", row.join(","))?;
    }

    println!("Sweep written to: {}", path.display());
    Ok(())
}

/// Write the sweep as JSON.
pub fn write_sweep_json(sweep: &SweepResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(sweep).context("Failed to serialise sweep")?;
    std::fs::write(path, json)?;
    println!("JSON written to: {}", path.display());
    Ok(())
}

/// Write every query's S-dictionary, one row per port pair.
pub fn write_sdict_csv(queries: &[(ParameterAssignment, SDict)], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;

    writeln!(file, "# neff S-parameters")?;
    for (i, (assignment, _)) in queries.iter().enumerate() {
        let values: Vec<String> = assignment
            .iter()
            .map(|(name, v)| format!("{name}={v}"))
            .collect();
        writeln!(file, "# query {i}: {}", values.join(" "))?;
    }
    writeln!(file, "#")?;
    writeln!(file, "query,port_in,port_out,re,im,abs,phase_rad")?;
    for (i, (_, sdict)) in queries.iter().enumerate() {
        for ((p_in, p_out), s) in sdict {
            writeln!(
                file,
                "{},{},{},{:.12e},{:.12e},{:.12e},{:.12e}",
                i,
                p_in,
                p_out,
                s.re,
                s.im,
                s.norm(),
                s.arg()
            )?;
        }
    }

    println!("S-parameters written to: {}", path.display());
    Ok(())
}

/// Select a compute backend from `[sweep]`.
pub fn create_backend(sweep: &SweepConfig) -> Result<Arc<dyn ComputeBackend>> {
    let backend: Arc<dyn ComputeBackend> = match sweep.backend.as_str() {
        "serial" => Arc::new(SerialBackend),
        "cpu" | "auto" => match sweep.threads {
            Some(n) => Arc::new(CpuBackend::with_threads(n)?),
            None => Arc::new(CpuBackend::new()?),
        },
        other => {
            return Err(ComputeError::Unavailable(format!(
                "'{other}' (available: auto, cpu, serial)"
            ))
            .into())
        }
    };
    let info = backend.device_info();
    println!("Backend: {} [{} threads]", info.name, info.threads);
    Ok(backend)
}

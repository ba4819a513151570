//! TOML configuration deserialisation for sweep jobs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;

use neff_core::model::ModelFamily;
use neff_core::parameter::{NamedParameter, SweepMode};
use neff_core::solver::MeshResolution;
use neff_core::surrogate::SurrogateKind;
use neff_core::sweep::FailurePolicy;
use neff_geometry::{CrossSection, LayerLevel};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub layer_stack: LayerStackConfig,
    /// Extra materials, by identifier.
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialConfig>,
    /// Declaration order fixes the input-vector order.
    pub parameters: Vec<ParameterConfig>,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub surrogate: SurrogateKind,
    /// Points at which to evaluate the fitted model. Unlisted parameters
    /// take their nominal value.
    #[serde(default)]
    pub query: Vec<BTreeMap<String, f64>>,
    #[serde(default)]
    pub output: OutputConfig,
    /// Directory of the job file; relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub family: ModelFamily,
    #[serde(default = "default_num_modes")]
    pub num_modes: usize,
    pub cross_section: CrossSection,
}

fn default_num_modes() -> usize {
    1
}

/// Layer stack: a preset plus per-layer overrides.
#[derive(Debug, Deserialize)]
pub struct LayerStackConfig {
    /// `"soi"` or `"none"`.
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default)]
    pub layers: BTreeMap<String, LayerLevel>,
}

impl Default for LayerStackConfig {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            layers: BTreeMap::new(),
        }
    }
}

fn default_preset() -> String {
    "soi".into()
}

/// A user material: constant index or an n/k table file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MaterialConfig {
    Constant {
        n: f64,
        #[serde(default)]
        k: f64,
    },
    /// CSV with columns `wavelength_um,n,k`.
    Table { file: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Trainable,
    Litho,
    Fixed,
    Thickness,
}

/// One `[[parameters]]` entry.
#[derive(Debug, Deserialize)]
pub struct ParameterConfig {
    pub name: String,
    pub kind: ParameterKind,
    /// Target layer of a thickness parameter.
    pub layer: Option<String>,
    /// Shorthand for a pinned parameter.
    pub value: Option<f64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// Defaults to `min_value`.
    pub nominal_value: Option<f64>,
    /// Defaults to the full range.
    pub step: Option<f64>,
}

impl ParameterConfig {
    pub fn named_parameter(&self) -> anyhow::Result<NamedParameter> {
        if let Some(v) = self.value {
            return Ok(NamedParameter::fixed(v));
        }
        let (Some(min), Some(max)) = (self.min_value, self.max_value) else {
            bail!(
                "parameter '{}' needs either `value` or both `min_value` and `max_value`",
                self.name
            );
        };
        let nominal = self.nominal_value.unwrap_or(min);
        let step = self
            .step
            .unwrap_or(if max > min { max - min } else { 1.0 });
        NamedParameter::new(min, max, nominal, step)
            .with_context(|| format!("parameter '{}'", self.name))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Only `"eim"` (effective-index method) is built in.
    pub method: String,
    pub order: u32,
    pub radius: Option<f64>,
    pub overwrite: bool,
    pub resolutions: BTreeMap<String, MeshResolution>,
    /// On-disk cache directory; in-memory when unset.
    pub cache_dir: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: "eim".into(),
            order: 1,
            radius: None,
            overwrite: false,
            resolutions: BTreeMap::new(),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub mode: SweepMode,
    pub failure_policy: FailurePolicy,
    /// `"auto"`, `"cpu"` or `"serial"`.
    pub backend: String,
    /// CPU worker threads; all cores when unset.
    pub threads: Option<usize>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            mode: SweepMode::Steps,
            failure_policy: FailurePolicy::Skip,
            backend: "auto".into(),
            threads: None,
        }
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to also save the sweep as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}

impl JobConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Parse a job from TOML text.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut config = parse_config(&content).with_context(|| format!("parsing {}", path.display()))?;
    config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
[model]
num_modes = 2
cross_section = { width = 0.5 }

[[parameters]]
name = "width"
kind = "trainable"
min_value = 0.45
max_value = 0.6
nominal_value = 0.5
step = 0.05

[[parameters]]
name = "wavelength"
kind = "trainable"
value = 1.55

[[parameters]]
name = "length"
kind = "fixed"
value = 10.0

[[parameters]]
name = "loss"
kind = "fixed"
value = 0.0

[surrogate]
kind = "mlp"
hidden = 8

[[query]]
width = 0.52
"#;

    #[test]
    fn test_parse_minimal_job() {
        let job = parse_config(JOB).unwrap();
        assert_eq!(job.model.num_modes, 2);
        assert_eq!(job.model.cross_section.core_layer, "core");
        assert_eq!(job.parameters.len(), 4);
        assert_eq!(job.parameters[0].name, "width");
        assert_eq!(job.parameters[3].kind, ParameterKind::Fixed);
        assert_eq!(job.layer_stack.preset, "soi");
        assert_eq!(job.solver.method, "eim");
        assert_eq!(job.sweep.failure_policy, FailurePolicy::Skip);
        match &job.surrogate {
            SurrogateKind::Mlp(c) => {
                assert_eq!(c.hidden, 8);
                assert_eq!(c.epochs, neff_core::surrogate::MlpConfig::default().epochs);
            }
            other => panic!("unexpected surrogate {other:?}"),
        }
        assert_eq!(job.query[0]["width"], 0.52);
        assert_eq!(job.output.directory, "./output");
    }

    #[test]
    fn test_named_parameter_defaults() {
        let job = parse_config(JOB).unwrap();
        let p = job.parameters[0].named_parameter().unwrap();
        assert_eq!((p.min_value(), p.max_value(), p.nominal_value()), (0.45, 0.6, 0.5));
        let fixed = job.parameters[1].named_parameter().unwrap();
        assert!(fixed.is_fixed());
    }

    #[test]
    fn test_incomplete_parameter_rejected() {
        let p = ParameterConfig {
            name: "gap".into(),
            kind: ParameterKind::Trainable,
            layer: None,
            value: None,
            min_value: Some(0.1),
            max_value: None,
            nominal_value: None,
            step: None,
        };
        let err = p.named_parameter().unwrap_err();
        assert!(err.to_string().contains("gap"));
    }

    #[test]
    fn test_material_configs() {
        let job = parse_config(&format!(
            "{JOB}\n[materials]\nmysin = {{ n = 2.0 }}\nmeasured = {{ file = \"nk.csv\" }}\n"
        ))
        .unwrap();
        assert!(matches!(job.materials["mysin"], MaterialConfig::Constant { n, k } if n == 2.0 && k == 0.0));
        assert!(matches!(&job.materials["measured"], MaterialConfig::Table { file } if file == Path::new("nk.csv")));
    }

    #[test]
    fn test_bundled_job_parses() {
        let job = parse_config(include_str!("../jobs/strip_waveguide.toml")).unwrap();
        assert_eq!(job.parameters.len(), 5);
        assert_eq!(job.parameters[4].layer.as_deref(), Some("core"));
        assert_eq!(job.query.len(), 3);
        assert_eq!(job.solver.cache_dir.as_deref(), Some(Path::new(".neff-cache")));
        assert!(job.output.save_json);
    }
}

//! Parameter space descriptors.
//!
//! A [`ParameterSpace`] declares every input of a model: trainable geometry
//! and lithography parameters (swept), non-trainable parameters (held at their
//! nominal value during sweeps), and layer-thickness parameters bound to a
//! layer of the [`LayerStack`]. The declaration order fixes the layout of
//! every input vector the model produces or consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use neff_geometry::LayerStack;

/// Solver input: vacuum wavelength (µm).
pub const WAVELENGTH: &str = "wavelength";
/// Evaluator input: waveguide length (µm).
pub const LENGTH: &str = "length";
/// Evaluator input: propagation loss (dB per µm).
pub const LOSS: &str = "loss";

/// Errors raised while declaring parameters or mapping values onto them.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("Parameter '{name}': min_value {min} > max_value {max}")]
    InvalidBounds { name: String, min: f64, max: f64 },

    #[error("Parameter '{name}': nominal value {nominal} outside [{min}, {max}]")]
    NominalOutOfRange {
        name: String,
        nominal: f64,
        min: f64,
        max: f64,
    },

    #[error("Parameter '{name}': step must be positive, got {step}")]
    InvalidStep { name: String, step: f64 },

    #[error("Parameter '{name}': non-finite value")]
    NonFinite { name: String },

    #[error("Parameter '{0}' declared more than once")]
    Duplicate(String),

    #[error("Thickness parameter '{name}' targets unknown layer '{layer}'")]
    UnknownLayer { name: String, layer: String },

    #[error("Missing parameter '{0}'")]
    MissingParameter(String),

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Parameter '{0}' is reserved for the evaluator and must be non-trainable")]
    ReservedTrainable(String),

    #[error("Parameter '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("Expected {expected} values, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// A bounded scalar parameter with a nominal value and sweep step.
///
/// Only constructed through [`new`](Self::new), [`fixed`](Self::fixed) or
/// validated deserialisation, so `min ≤ nominal ≤ max` and `step > 0` hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParameterBounds")]
pub struct NamedParameter {
    min_value: f64,
    max_value: f64,
    nominal_value: f64,
    step: f64,
}

/// Unchecked wire form of a [`NamedParameter`].
#[derive(Deserialize)]
struct ParameterBounds {
    min_value: f64,
    max_value: f64,
    nominal_value: f64,
    step: f64,
}

impl TryFrom<ParameterBounds> for NamedParameter {
    type Error = ParameterError;

    fn try_from(b: ParameterBounds) -> Result<Self, Self::Error> {
        Self::new(b.min_value, b.max_value, b.nominal_value, b.step)
    }
}

impl NamedParameter {
    pub fn new(min: f64, max: f64, nominal: f64, step: f64) -> Result<Self, ParameterError> {
        let p = Self {
            min_value: min,
            max_value: max,
            nominal_value: nominal,
            step,
        };
        p.validate("unnamed")?;
        Ok(p)
    }

    /// A parameter pinned to a single value.
    pub fn fixed(value: f64) -> Self {
        Self {
            min_value: value,
            max_value: value,
            nominal_value: value,
            step: 1.0,
        }
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn nominal_value(&self) -> f64 {
        self.nominal_value
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn is_fixed(&self) -> bool {
        self.min_value == self.max_value
    }

    /// Check the invariants `min ≤ nominal ≤ max`, `step > 0`, all finite.
    pub fn validate(&self, name: &str) -> Result<(), ParameterError> {
        let finite = [self.min_value, self.max_value, self.nominal_value, self.step]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(ParameterError::NonFinite { name: name.into() });
        }
        if self.min_value > self.max_value {
            return Err(ParameterError::InvalidBounds {
                name: name.into(),
                min: self.min_value,
                max: self.max_value,
            });
        }
        if self.nominal_value < self.min_value || self.nominal_value > self.max_value {
            return Err(ParameterError::NominalOutOfRange {
                name: name.into(),
                nominal: self.nominal_value,
                min: self.min_value,
                max: self.max_value,
            });
        }
        if self.step <= 0.0 {
            return Err(ParameterError::InvalidStep {
                name: name.into(),
                step: self.step,
            });
        }
        Ok(())
    }

    /// Distinct bounds: `[min, max]`, or `[min]` when pinned.
    pub fn corner_values(&self) -> Vec<f64> {
        if self.is_fixed() {
            vec![self.min_value]
        } else {
            vec![self.min_value, self.max_value]
        }
    }

    /// `min, min + step, …` up to `max` inclusive. `max` is appended when the
    /// stride does not land on it.
    pub fn step_values(&self) -> Vec<f64> {
        if self.is_fixed() {
            return vec![self.min_value];
        }
        let span = self.max_value - self.min_value;
        let tol = 1e-9 * span.abs().max(self.step);
        let n = ((span + tol) / self.step).floor() as usize;
        let mut values: Vec<f64> = (0..=n)
            .map(|i| (self.min_value + i as f64 * self.step).min(self.max_value))
            .collect();
        match values.last() {
            Some(&last) if (self.max_value - last).abs() <= tol => {
                // Snap the final stride onto the bound.
                if let Some(v) = values.last_mut() {
                    *v = self.max_value;
                }
            }
            _ => values.push(self.max_value),
        }
        values
    }
}

/// A parameter that overrides the thickness of one layer of the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStackThickness {
    pub layer: String,
    pub parameter: NamedParameter,
}

impl LayerStackThickness {
    pub fn new(layer: impl Into<String>, parameter: NamedParameter) -> Self {
        Self {
            layer: layer.into(),
            parameter,
        }
    }
}

/// How a parameter's value reaches the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRole {
    /// Passed to the component factory (or consumed as a reserved name).
    Geometry,
    /// Passed to the component factory as a lithography bias.
    Litho,
    /// Overrides the thickness of a layer.
    Thickness { layer: String },
}

/// Declaration group, which fixes the position in the input vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterGroup {
    Trainable,
    NonTrainable,
    Thickness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub name: String,
    pub parameter: NamedParameter,
    pub role: ParameterRole,
    pub group: ParameterGroup,
}

impl ParameterEntry {
    /// Whether sweeps span this parameter's range.
    pub fn is_swept(&self) -> bool {
        self.group != ParameterGroup::NonTrainable
    }
}

/// Which points of each range a sweep visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Distinct `{min, max}` of every swept parameter.
    Corners,
    /// The full stepped range of every swept parameter.
    #[default]
    Steps,
}

/// A mapping from parameter name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterAssignment(BTreeMap<String, f64>);

impl ParameterAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<f64, ParameterError> {
        self.get(name)
            .ok_or_else(|| ParameterError::MissingParameter(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ParameterAssignment {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The validated, ordered set of model inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpace {
    entries: Vec<ParameterEntry>,
}

impl ParameterSpace {
    pub fn builder(layer_stack: &LayerStack) -> ParameterSpaceBuilder<'_> {
        ParameterSpaceBuilder {
            layer_stack,
            trainable: Vec::new(),
            fixed: Vec::new(),
            thickness: Vec::new(),
        }
    }

    /// Entries in input-vector order.
    pub fn entries(&self) -> &[ParameterEntry] {
        &self.entries
    }

    /// Names in input-vector order: trainable, non-trainable, thickness.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn entry(&self, name: &str) -> Option<&ParameterEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// The assignment holding every parameter at its nominal value.
    pub fn nominal(&self) -> ParameterAssignment {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.parameter.nominal_value))
            .collect()
    }

    /// Cartesian product of per-parameter values in [`names`](Self::names)
    /// order, last axis varying fastest.
    pub fn grid(&self, mode: SweepMode) -> Vec<Vec<f64>> {
        let axes: Vec<Vec<f64>> = self.entries.iter().map(|e| axis_values(e, mode)).collect();
        axes.iter().fold(vec![Vec::new()], |acc, values| {
            let mut next = Vec::with_capacity(acc.len() * values.len());
            for prefix in &acc {
                for &v in values {
                    let mut point = prefix.clone();
                    point.push(v);
                    next.push(point);
                }
            }
            next
        })
    }

    /// Number of points [`grid`](Self::grid) would produce.
    pub fn grid_size(&self, mode: SweepMode) -> usize {
        self.entries
            .iter()
            .map(|e| axis_values(e, mode).len())
            .product()
    }

    /// Order an assignment into an input vector. The assignment must name
    /// exactly the declared parameters.
    pub fn vector_from(&self, assignment: &ParameterAssignment) -> Result<Vec<f64>, ParameterError> {
        if let Some((unknown, _)) = assignment.iter().find(|(k, _)| self.index_of(k).is_none()) {
            return Err(ParameterError::UnknownParameter(unknown.to_string()));
        }
        self.entries
            .iter()
            .map(|e| {
                let v = assignment.require(&e.name)?;
                if !v.is_finite() {
                    return Err(ParameterError::NonFinite {
                        name: e.name.clone(),
                    });
                }
                Ok(v)
            })
            .collect()
    }

    /// Inverse of [`vector_from`](Self::vector_from).
    pub fn assignment_from(&self, values: &[f64]) -> Result<ParameterAssignment, ParameterError> {
        if values.len() != self.entries.len() {
            return Err(ParameterError::LengthMismatch {
                expected: self.entries.len(),
                got: values.len(),
            });
        }
        Ok(self
            .entries
            .iter()
            .zip(values)
            .map(|(e, &v)| (e.name.clone(), v))
            .collect())
    }
}

fn axis_values(entry: &ParameterEntry, mode: SweepMode) -> Vec<f64> {
    if !entry.is_swept() {
        return vec![entry.parameter.nominal_value];
    }
    match mode {
        SweepMode::Corners => entry.parameter.corner_values(),
        SweepMode::Steps => entry.parameter.step_values(),
    }
}

/// Collects declarations and validates them against a layer stack.
pub struct ParameterSpaceBuilder<'a> {
    layer_stack: &'a LayerStack,
    trainable: Vec<(String, NamedParameter, ParameterRole)>,
    fixed: Vec<(String, NamedParameter)>,
    thickness: Vec<(String, LayerStackThickness)>,
}

impl<'a> ParameterSpaceBuilder<'a> {
    pub fn trainable(mut self, name: impl Into<String>, parameter: NamedParameter) -> Self {
        self.trainable
            .push((name.into(), parameter, ParameterRole::Geometry));
        self
    }

    /// A trainable lithography bias, forwarded to the factory separately
    /// from the geometry parameters.
    pub fn litho(mut self, name: impl Into<String>, parameter: NamedParameter) -> Self {
        self.trainable.push((name.into(), parameter, ParameterRole::Litho));
        self
    }

    pub fn fixed(mut self, name: impl Into<String>, parameter: NamedParameter) -> Self {
        self.fixed.push((name.into(), parameter));
        self
    }

    pub fn thickness(mut self, name: impl Into<String>, thickness: LayerStackThickness) -> Self {
        self.thickness.push((name.into(), thickness));
        self
    }

    pub fn build(self) -> Result<ParameterSpace, ParameterError> {
        let mut entries = Vec::new();
        for (name, parameter, role) in self.trainable {
            if name == LENGTH || name == LOSS {
                return Err(ParameterError::ReservedTrainable(name));
            }
            entries.push(ParameterEntry {
                name,
                parameter,
                role,
                group: ParameterGroup::Trainable,
            });
        }
        for (name, parameter) in self.fixed {
            entries.push(ParameterEntry {
                name,
                parameter,
                role: ParameterRole::Geometry,
                group: ParameterGroup::NonTrainable,
            });
        }
        for (name, t) in self.thickness {
            if !self.layer_stack.contains(&t.layer) {
                return Err(ParameterError::UnknownLayer {
                    name,
                    layer: t.layer,
                });
            }
            entries.push(ParameterEntry {
                name,
                parameter: t.parameter,
                role: ParameterRole::Thickness { layer: t.layer },
                group: ParameterGroup::Thickness,
            });
        }

        let mut seen = std::collections::BTreeSet::new();
        for e in &entries {
            e.parameter.validate(&e.name)?;
            if !seen.insert(e.name.as_str()) {
                return Err(ParameterError::Duplicate(e.name.clone()));
            }
        }

        let space = ParameterSpace { entries };
        for required in [WAVELENGTH, LENGTH, LOSS] {
            match space.entry(required) {
                None => return Err(ParameterError::MissingParameter(required.into())),
                Some(e) if matches!(e.role, ParameterRole::Thickness { .. }) => {
                    return Err(ParameterError::Invalid {
                        name: required.into(),
                        reason: "reserved name cannot be a layer thickness".into(),
                    })
                }
                Some(_) => {}
            }
        }
        if space
            .entry(WAVELENGTH)
            .is_some_and(|e| e.parameter.min_value <= 0.0)
        {
            return Err(ParameterError::Invalid {
                name: WAVELENGTH.into(),
                reason: "must be positive".into(),
            });
        }
        for e in &space.entries {
            if let ParameterRole::Thickness { .. } = e.role {
                if e.parameter.min_value <= 0.0 {
                    return Err(ParameterError::Invalid {
                        name: e.name.clone(),
                        reason: "layer thickness must be positive".into(),
                    });
                }
            }
        }
        Ok(space)
    }
}

//! Layered material stacks.
//!
//! A [`LayerStack`] maps layer names to [`LayerLevel`]s. Perturbations (for
//! example sweeping the core thickness) always return a modified copy so a
//! base stack can be shared between concurrent sweep points.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Physical properties of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerLevel {
    /// Thickness (µm).
    pub thickness: f64,
    /// Bottom of the layer (µm).
    pub zmin: f64,
    /// Material identifier, resolved by a material library.
    pub material: String,
}

impl LayerLevel {
    pub fn new(thickness: f64, zmin: f64, material: impl Into<String>) -> Self {
        Self {
            thickness,
            zmin,
            material: material.into(),
        }
    }

    /// Top of the layer (µm).
    pub fn zmax(&self) -> f64 {
        self.zmin + self.thickness
    }
}

/// Named layers composing a physical cross-section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    pub layers: BTreeMap<String, LayerLevel>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_layer(mut self, name: impl Into<String>, level: LayerLevel) -> Self {
        self.layers.insert(name.into(), level);
        self
    }

    /// 220 nm silicon-on-insulator: `box`, `core`, `slab90` and `clad`.
    pub fn default_soi() -> Self {
        Self::new()
            .with_layer("box", LayerLevel::new(2.0, -2.0, "sio2"))
            .with_layer("core", LayerLevel::new(0.22, 0.0, "si"))
            .with_layer("slab90", LayerLevel::new(0.09, 0.0, "si"))
            .with_layer("clad", LayerLevel::new(2.0, 0.0, "sio2"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&LayerLevel, GeometryError> {
        self.layers.get(name).ok_or_else(|| self.unknown(name))
    }

    /// Copy containing only the named layers.
    pub fn filtered<S: AsRef<str>>(&self, names: &[S]) -> Result<LayerStack, GeometryError> {
        let mut layers = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            layers.insert(name.to_string(), self.get(name)?.clone());
        }
        Ok(LayerStack { layers })
    }

    /// Copy of this stack with the thickness of `name` replaced.
    pub fn with_thickness(&self, name: &str, thickness: f64) -> Result<LayerStack, GeometryError> {
        if !thickness.is_finite() {
            return Err(GeometryError::InvalidDimension {
                what: format!("thickness of layer '{name}'"),
                value: thickness,
            });
        }
        let mut copy = self.clone();
        match copy.layers.get_mut(name) {
            Some(level) => level.thickness = thickness,
            None => return Err(self.unknown(name)),
        }
        Ok(copy)
    }

    fn unknown(&self, name: &str) -> GeometryError {
        GeometryError::UnknownLayer {
            name: name.to_string(),
            available: self.layers.keys().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

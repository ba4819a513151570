//! Waveguide cross-sections and the factories that build them.
//!
//! A component factory turns the geometric (and lithographic) subset of a
//! parameter assignment into a [`Component`] whose [`CrossSection`] is what
//! the mode solver sees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Parameter name → value, as handed to component factories.
pub type ParamValues = BTreeMap<String, f64>;

/// Transverse geometry of a strip or rib waveguide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    /// Core width (µm).
    pub width: f64,
    /// Layer holding the waveguide core.
    #[serde(default = "default_core_layer")]
    pub core_layer: String,
    /// Partially etched slab layer; `None` for a strip waveguide.
    #[serde(default)]
    pub slab_layer: Option<String>,
    /// Layer above the core.
    #[serde(default = "default_cladding_layer")]
    pub cladding_layer: String,
    /// Layer below the core.
    #[serde(default = "default_substrate_layer")]
    pub substrate_layer: String,
}

fn default_core_layer() -> String {
    "core".into()
}
fn default_cladding_layer() -> String {
    "clad".into()
}
fn default_substrate_layer() -> String {
    "box".into()
}

impl CrossSection {
    /// Fully etched strip waveguide in the `core` layer.
    pub fn strip(width: f64) -> Self {
        Self {
            width,
            core_layer: default_core_layer(),
            slab_layer: None,
            cladding_layer: default_cladding_layer(),
            substrate_layer: default_substrate_layer(),
        }
    }

    /// Rib waveguide with a `slab90` partial etch.
    pub fn rib(width: f64) -> Self {
        Self {
            slab_layer: Some("slab90".into()),
            ..Self::strip(width)
        }
    }

    /// Layers this cross-section refers to.
    pub fn layer_names(&self) -> Vec<&str> {
        let mut names = vec![
            self.core_layer.as_str(),
            self.cladding_layer.as_str(),
            self.substrate_layer.as_str(),
        ];
        if let Some(slab) = &self.slab_layer {
            names.push(slab.as_str());
        }
        names
    }
}

/// A built component; the mode solver only consumes its cross-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub cross_section: CrossSection,
}

/// Builds a component from the geometric and lithographic parameter subsets.
pub trait ComponentFactory: Send + Sync {
    fn build(&self, geometry: &ParamValues, litho: &ParamValues) -> Result<Component, GeometryError>;
}

impl<F> ComponentFactory for F
where
    F: Fn(&ParamValues, &ParamValues) -> Result<Component, GeometryError> + Send + Sync,
{
    fn build(&self, geometry: &ParamValues, litho: &ParamValues) -> Result<Component, GeometryError> {
        self(geometry, litho)
    }
}

/// Straight waveguide whose width follows the `width` parameter.
///
/// The litho parameter `dilation` biases each sidewall outward, so the drawn
/// width becomes `width + 2 * dilation`.
#[derive(Debug, Clone)]
pub struct StraightFactory {
    pub template: CrossSection,
}

impl StraightFactory {
    pub fn new(template: CrossSection) -> Self {
        Self { template }
    }
}

impl ComponentFactory for StraightFactory {
    fn build(&self, geometry: &ParamValues, litho: &ParamValues) -> Result<Component, GeometryError> {
        let width = geometry.get("width").copied().unwrap_or(self.template.width);
        let dilation = litho.get("dilation").copied().unwrap_or(0.0);
        let effective = width + 2.0 * dilation;
        if !effective.is_finite() || effective < 0.0 {
            return Err(GeometryError::InvalidDimension {
                what: "waveguide width after dilation".into(),
                value: effective,
            });
        }
        Ok(Component {
            name: format!("straight_w{effective:.4}"),
            cross_section: CrossSection {
                width: effective,
                ..self.template.clone()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, f64)]) -> ParamValues {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn straight_factory_applies_width_and_dilation() {
        let factory = StraightFactory::new(CrossSection::rib(0.5));
        let c = factory
            .build(&values(&[("width", 0.6)]), &values(&[("dilation", 0.01)]))
            .unwrap();
        assert!((c.cross_section.width - 0.62).abs() < 1e-12);
        assert_eq!(c.cross_section.slab_layer.as_deref(), Some("slab90"));
    }

    #[test]
    fn straight_factory_rejects_negative_width() {
        let factory = StraightFactory::new(CrossSection::strip(0.5));
        let err = factory
            .build(&values(&[("width", 0.1)]), &values(&[("dilation", -0.1)]))
            .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidDimension { .. }));
    }

    #[test]
    fn closures_are_factories() {
        let factory = |g: &ParamValues, _: &ParamValues| -> Result<Component, GeometryError> {
            let width = *g
                .get("w")
                .ok_or_else(|| GeometryError::MissingParameter("w".into()))?;
            Ok(Component {
                name: "custom".into(),
                cross_section: CrossSection::strip(width),
            })
        };
        let c = factory.build(&values(&[("w", 1.0)]), &ParamValues::new()).unwrap();
        assert_eq!(c.cross_section.width, 1.0);
        assert!(factory.build(&ParamValues::new(), &ParamValues::new()).is_err());
    }
}

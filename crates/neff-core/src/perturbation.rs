//! Mapping a parameter assignment onto solver inputs.

use neff_geometry::{Component, ComponentFactory, LayerStack, ParamValues};

use crate::error::ModelError;
use crate::parameter::{ParameterAssignment, ParameterRole, ParameterSpace, LENGTH, LOSS, WAVELENGTH};

/// Everything the mode solver needs for one parameter point.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbedInputs {
    pub component: Component,
    pub layer_stack: LayerStack,
    pub wavelength: f64,
}

/// An assignment split by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleSplit {
    pub geometry: ParamValues,
    pub litho: ParamValues,
    /// `(layer, thickness)` overrides in declaration order.
    pub thickness: Vec<(String, f64)>,
}

/// Partition an assignment by parameter role. Reserved names stay out of
/// the geometry set.
pub fn split_roles(
    space: &ParameterSpace,
    assignment: &ParameterAssignment,
) -> Result<RoleSplit, ModelError> {
    let values = space.vector_from(assignment)?;
    let mut split = RoleSplit::default();
    for (entry, value) in space.entries().iter().zip(values) {
        match &entry.role {
            ParameterRole::Geometry => {
                if ![WAVELENGTH, LENGTH, LOSS].contains(&entry.name.as_str()) {
                    split.geometry.insert(entry.name.clone(), value);
                }
            }
            ParameterRole::Litho => {
                split.litho.insert(entry.name.clone(), value);
            }
            ParameterRole::Thickness { layer } => split.thickness.push((layer.clone(), value)),
        }
    }
    Ok(split)
}

/// Build the component and the perturbed layer stack for `assignment`.
/// The base stack is never modified.
pub fn perturb(
    space: &ParameterSpace,
    assignment: &ParameterAssignment,
    factory: &dyn ComponentFactory,
    base_stack: &LayerStack,
) -> Result<PerturbedInputs, ModelError> {
    let split = split_roles(space, assignment)?;
    let wavelength = assignment.require(WAVELENGTH)?;
    if wavelength <= 0.0 {
        return Err(ModelError::InvalidInput(format!(
            "wavelength must be positive, got {wavelength}"
        )));
    }

    let component = factory.build(&split.geometry, &split.litho)?;
    let mut layer_stack = base_stack.clone();
    for (layer, thickness) in &split.thickness {
        layer_stack = layer_stack.with_thickness(layer, *thickness)?;
    }

    Ok(PerturbedInputs {
        component,
        layer_stack,
        wavelength,
    })
}

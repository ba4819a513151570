//! # neff Geometry
//!
//! Geometry handling for the neff toolkit:
//!
//! - **Layer stacks** ([`layer_stack`]): named material layers with thickness
//!   and z-position; perturbed by copy, never in place.
//! - **Cross-sections and components** ([`component`]): the transverse
//!   waveguide geometry handed to mode solvers, built by component factories
//!   from swept parameter values.
//! - **Transformations** ([`transform`]): 2D rigid-body transforms.
//! - **Layouts** ([`layout`]): cells with named ports, placed by resolving an
//!   explicit port-connection graph; includes the Mach–Zehnder interferometer.

pub mod component;
pub mod error;
pub mod layer_stack;
pub mod layout;
pub mod transform;

pub use component::{Component, ComponentFactory, CrossSection, ParamValues, StraightFactory};
pub use error::{GeometryError, LayoutError};
pub use layer_stack::{LayerLevel, LayerStack};
pub use transform::Transform;

//! Error types for geometry construction and layout resolution.

use thiserror::Error;

/// Errors raised while building cross-sections and layer stacks.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Layer '{name}' not found in layer stack (available: {available})")]
    UnknownLayer { name: String, available: String },

    #[error("Invalid {what}: {value}")]
    InvalidDimension { what: String, value: f64 },

    #[error("Component parameter '{0}' is required")]
    MissingParameter(String),
}

impl GeometryError {
    /// True when only the dimensions given for one parameter point are at
    /// fault. Unknown layers and missing parameters are configuration
    /// mistakes that no other point can avoid.
    pub fn is_point_failure(&self) -> bool {
        matches!(self, GeometryError::InvalidDimension { .. })
    }
}

/// Errors raised while placing instances of a layout graph.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Layout infeasible: {0}")]
    Infeasible(String),

    #[error("Duplicate instance name '{0}'")]
    DuplicateInstance(String),

    #[error("Unknown instance '{0}'")]
    UnknownInstance(String),

    #[error("Cell '{cell}' has no port '{port}'")]
    UnknownPort { cell: String, port: String },

    #[error("Instance '{0}' is not connected to the root instance")]
    Unplaced(String),

    #[error("Layout graph has no root instance")]
    NoRoot,

    #[error(
        "Connection {child}.{child_port} -> {parent}.{parent_port} is misaligned by {offset:.3e} µm / {angle:.3e}°"
    )]
    Misaligned {
        child: String,
        child_port: String,
        parent: String,
        parent_port: String,
        offset: f64,
        angle: f64,
    },

    #[error("Negative length {length} for cell '{cell}'")]
    NegativeLength { cell: String, length: f64 },
}

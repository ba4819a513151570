//! Port-based layout assembly.
//!
//! Cells expose named [`Port`]s. A [`LayoutGraph`] lists instances of cells
//! and the port-to-port connections between them; [`LayoutGraph::resolve`]
//! walks the graph from a root instance and computes every instance's rigid
//! placement so that connected ports coincide and face each other.

pub mod cell;
pub mod graph;
pub mod mzi;
pub mod port;

pub use cell::{bend_circular, mmi1x2, straight, Cell, MmiParams};
pub use graph::{Connection, Layout, LayoutGraph, PlacedInstance};
pub use mzi::{mzi, MziLayout, MziParams};
pub use port::{rename_ports_by_orientation, Port};

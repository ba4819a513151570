//! Explicit instance/connection graph and its placement solver.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::debug;

use crate::error::LayoutError;
use crate::layout::cell::Cell;
use crate::layout::port::Port;
use crate::transform::{normalize_angle, Transform};

const POSITION_TOL: f64 = 1e-6;
const ANGLE_TOL: f64 = 1e-6;

/// `child.child_port` attaches to `parent.parent_port`.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub child: String,
    pub child_port: String,
    pub parent: String,
    pub parent_port: String,
}

/// Unplaced description of a layout.
#[derive(Debug, Clone, Default)]
pub struct LayoutGraph {
    instances: Vec<(String, Arc<Cell>)>,
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
    root: Option<String>,
}

impl LayoutGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instance(&mut self, name: impl Into<String>, cell: Arc<Cell>) -> Result<(), LayoutError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(LayoutError::DuplicateInstance(name));
        }
        self.index.insert(name.clone(), self.instances.len());
        self.instances.push((name, cell));
        Ok(())
    }

    /// Records that `child_port` of `child` sits on `parent_port` of `parent`.
    pub fn connect(
        &mut self,
        child: &str,
        child_port: &str,
        parent: &str,
        parent_port: &str,
    ) -> Result<(), LayoutError> {
        self.cell(child)?.port(child_port)?;
        self.cell(parent)?.port(parent_port)?;
        self.connections.push(Connection {
            child: child.to_string(),
            child_port: child_port.to_string(),
            parent: parent.to_string(),
            parent_port: parent_port.to_string(),
        });
        Ok(())
    }

    /// The root is placed with the identity transform.
    pub fn set_root(&mut self, name: &str) -> Result<(), LayoutError> {
        self.cell(name)?;
        self.root = Some(name.to_string());
        Ok(())
    }

    pub fn cell(&self, name: &str) -> Result<&Arc<Cell>, LayoutError> {
        self.index
            .get(name)
            .map(|&i| &self.instances[i].1)
            .ok_or_else(|| LayoutError::UnknownInstance(name.to_string()))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Places every instance by breadth-first traversal from the root.
    ///
    /// Each connection is used once to place the not-yet-placed end; a
    /// connection whose two ends were both placed through other paths is
    /// checked for alignment instead.
    pub fn resolve(&self) -> Result<Layout, LayoutError> {
        let root = self.root.as_deref().ok_or(LayoutError::NoRoot)?;
        let mut placement: HashMap<&str, Transform> = HashMap::new();
        placement.insert(root, Transform::default());

        let mut used = vec![false; self.connections.len()];
        let mut queue = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            for (ci, conn) in self.connections.iter().enumerate() {
                if used[ci] {
                    continue;
                }
                let (fixed, fixed_port, moving, moving_port) = if conn.parent == current {
                    (&conn.parent, &conn.parent_port, &conn.child, &conn.child_port)
                } else if conn.child == current {
                    (&conn.child, &conn.child_port, &conn.parent, &conn.parent_port)
                } else {
                    continue;
                };
                used[ci] = true;

                let anchor = self.cell(fixed)?.port(fixed_port)?.transformed(&placement[fixed.as_str()]);
                let port = self.cell(moving)?.port(moving_port)?;

                if let Some(existing) = placement.get(moving.as_str()) {
                    check_alignment(conn, &anchor, &port.transformed(existing))?;
                    continue;
                }

                let t = attach(port, &anchor);
                debug!("placed {moving} via {moving}.{moving_port} -> {fixed}.{fixed_port}");
                placement.insert(moving.as_str(), t);
                queue.push_back(moving.as_str());
            }
        }

        let mut instances = Vec::with_capacity(self.instances.len());
        for (name, cell) in &self.instances {
            let transform = placement
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| LayoutError::Unplaced(name.clone()))?;
            instances.push(PlacedInstance {
                name: name.clone(),
                cell: Arc::clone(cell),
                transform,
            });
        }
        let index = self.index.clone();
        Ok(Layout { instances, index })
    }
}

/// Transform bringing `port` (cell-local) onto `anchor`, facing it.
fn attach(port: &Port, anchor: &Port) -> Transform {
    let rotation = Transform::rotation(anchor.orientation + 180.0 - port.orientation);
    let rotated = rotation.apply(&port.position);
    rotation.then(&Transform::translation(
        anchor.position[0] - rotated[0],
        anchor.position[1] - rotated[1],
    ))
}

fn check_alignment(conn: &Connection, a: &Port, b: &Port) -> Result<(), LayoutError> {
    let offset = ((a.position[0] - b.position[0]).powi(2) + (a.position[1] - b.position[1]).powi(2)).sqrt();
    let facing = normalize_angle(a.orientation - b.orientation - 180.0);
    let angle = facing.min(360.0 - facing);
    if offset > POSITION_TOL || angle > ANGLE_TOL {
        return Err(LayoutError::Misaligned {
            child: conn.child.clone(),
            child_port: conn.child_port.clone(),
            parent: conn.parent.clone(),
            parent_port: conn.parent_port.clone(),
            offset,
            angle,
        });
    }
    Ok(())
}

/// An instance with its resolved placement.
#[derive(Debug, Clone)]
pub struct PlacedInstance {
    pub name: String,
    pub cell: Arc<Cell>,
    pub transform: Transform,
}

impl PlacedInstance {
    /// Port in layout coordinates.
    pub fn port(&self, name: &str) -> Result<Port, LayoutError> {
        Ok(self.cell.port(name)?.transformed(&self.transform))
    }

    pub fn ports(&self) -> Vec<Port> {
        self.cell.ports.iter().map(|p| p.transformed(&self.transform)).collect()
    }
}

/// A fully placed layout.
#[derive(Debug, Clone)]
pub struct Layout {
    instances: Vec<PlacedInstance>,
    index: HashMap<String, usize>,
}

impl Layout {
    pub fn instances(&self) -> &[PlacedInstance] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Result<&PlacedInstance, LayoutError> {
        self.index
            .get(name)
            .map(|&i| &self.instances[i])
            .ok_or_else(|| LayoutError::UnknownInstance(name.to_string()))
    }

    pub fn port(&self, instance: &str, port: &str) -> Result<Port, LayoutError> {
        self.instance(instance)?.port(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::cell::{bend_circular, straight};

    #[test]
    fn chain_of_straights_lines_up() {
        let mut g = LayoutGraph::new();
        g.add_instance("a", Arc::new(straight(2.0, 0.5).unwrap())).unwrap();
        g.add_instance("b", Arc::new(straight(3.0, 0.5).unwrap())).unwrap();
        g.connect("b", "W0", "a", "E0").unwrap();
        g.set_root("a").unwrap();
        let layout = g.resolve().unwrap();
        let end = layout.port("b", "E0").unwrap();
        assert_eq!(end.position, [5.0, 0.0]);
        assert_eq!(end.orientation, 0.0);
    }

    #[test]
    fn bend_turns_the_route_north() {
        let mut g = LayoutGraph::new();
        g.add_instance("s", Arc::new(straight(1.0, 0.5).unwrap())).unwrap();
        g.add_instance("b", Arc::new(bend_circular(5.0, 0.5).unwrap())).unwrap();
        g.add_instance("up", Arc::new(straight(2.0, 0.5).unwrap())).unwrap();
        g.connect("b", "W0", "s", "E0").unwrap();
        g.connect("up", "W0", "b", "N0").unwrap();
        g.set_root("s").unwrap();
        let layout = g.resolve().unwrap();
        let top = layout.port("up", "E0").unwrap();
        assert!((top.position[0] - 6.0).abs() < 1e-12);
        assert!((top.position[1] - 7.0).abs() < 1e-12);
        assert_eq!(top.direction(), Some('N'));
    }

    #[test]
    fn parent_can_be_placed_from_child() {
        let mut g = LayoutGraph::new();
        g.add_instance("a", Arc::new(straight(2.0, 0.5).unwrap())).unwrap();
        g.add_instance("b", Arc::new(straight(3.0, 0.5).unwrap())).unwrap();
        g.connect("b", "W0", "a", "E0").unwrap();
        g.set_root("b").unwrap();
        let layout = g.resolve().unwrap();
        assert_eq!(layout.port("a", "W0").unwrap().position, [-2.0, 0.0]);
    }

    #[test]
    fn detects_misaligned_loop() {
        let mut g = LayoutGraph::new();
        g.add_instance("a", Arc::new(straight(2.0, 0.5).unwrap())).unwrap();
        g.add_instance("b", Arc::new(straight(3.0, 0.5).unwrap())).unwrap();
        g.connect("b", "W0", "a", "E0").unwrap();
        g.connect("b", "E0", "a", "W0").unwrap();
        g.set_root("a").unwrap();
        assert!(matches!(g.resolve(), Err(LayoutError::Misaligned { .. })));
    }

    #[test]
    fn reports_disconnected_and_unknown() {
        let mut g = LayoutGraph::new();
        g.add_instance("a", Arc::new(straight(2.0, 0.5).unwrap())).unwrap();
        g.add_instance("lonely", Arc::new(straight(1.0, 0.5).unwrap())).unwrap();
        assert!(matches!(g.resolve(), Err(LayoutError::NoRoot)));
        g.set_root("a").unwrap();
        assert!(matches!(g.resolve(), Err(LayoutError::Unplaced(n)) if n == "lonely"));
        assert!(g.connect("a", "N0", "lonely", "W0").is_err());
        assert!(g.add_instance("a", Arc::new(straight(1.0, 0.5).unwrap())).is_err());
    }
}

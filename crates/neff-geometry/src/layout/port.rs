//! Optical ports: a position, an outward-facing orientation and a width.

use serde::{Deserialize, Serialize};

use crate::transform::{normalize_angle, Transform};

/// A named port. `orientation` points out of the cell (degrees, 0 = east).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    /// Centre of the port (µm).
    pub position: [f64; 2],
    pub orientation: f64,
    /// Waveguide width at the port (µm).
    pub width: f64,
}

impl Port {
    pub fn new(name: impl Into<String>, position: [f64; 2], orientation: f64, width: f64) -> Self {
        Self {
            name: name.into(),
            position,
            orientation: normalize_angle(orientation),
            width,
        }
    }

    pub fn transformed(&self, t: &Transform) -> Port {
        Port {
            name: self.name.clone(),
            position: t.apply(&self.position),
            orientation: t.rotate_angle(self.orientation),
            width: self.width,
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Port {
        Port {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Compass prefix for the orientation (`E`, `N`, `W`, `S`), `None` for
    /// off-axis ports.
    pub fn direction(&self) -> Option<char> {
        let a = self.orientation;
        let near = |target: f64| (a - target).abs() < 1e-6;
        if near(0.0) {
            Some('E')
        } else if near(90.0) {
            Some('N')
        } else if near(180.0) {
            Some('W')
        } else if near(270.0) {
            Some('S')
        } else {
            None
        }
    }
}

/// Renames ports to `E0, E1, …`, `N0, …`, `W0, …`, `S0, …`.
///
/// East/west ports are numbered by increasing y, north/south ports by
/// increasing x. Off-axis ports keep their names.
pub fn rename_ports_by_orientation(ports: &[Port]) -> Vec<Port> {
    let mut renamed = Vec::with_capacity(ports.len());
    for dir in ['E', 'N', 'W', 'S'] {
        let mut group: Vec<&Port> = ports.iter().filter(|p| p.direction() == Some(dir)).collect();
        let axis = if dir == 'E' || dir == 'W' { 1 } else { 0 };
        group.sort_by(|a, b| a.position[axis].total_cmp(&b.position[axis]));
        renamed.extend(
            group
                .into_iter()
                .enumerate()
                .map(|(i, p)| p.renamed(format!("{dir}{i}"))),
        );
    }
    renamed.extend(ports.iter().filter(|p| p.direction().is_none()).cloned());
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renaming_sorts_by_position() {
        let ports = vec![
            Port::new("a", [5.0, 1.0], 0.0, 0.5),
            Port::new("b", [5.0, -1.0], 0.0, 0.5),
            Port::new("c", [0.0, 0.0], 180.0, 0.5),
            Port::new("d", [2.0, 3.0], 90.0, 0.5),
        ];
        let renamed = rename_ports_by_orientation(&ports);
        let find = |n: &str| renamed.iter().find(|p| p.name == n).unwrap().position;
        assert_eq!(find("E0"), [5.0, -1.0]);
        assert_eq!(find("E1"), [5.0, 1.0]);
        assert_eq!(find("W0"), [0.0, 0.0]);
        assert_eq!(find("N0"), [2.0, 3.0]);
    }

    #[test]
    fn transformed_port_rotates_orientation() {
        let p = Port::new("o1", [1.0, 0.0], 0.0, 0.5).transformed(&Transform::rotation(90.0));
        assert_eq!(p.position, [0.0, 1.0]);
        assert_eq!(p.direction(), Some('N'));
    }
}

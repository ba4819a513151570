//! Primitive cells: straights, bends and a 1x2 MMI splitter.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::layout::port::Port;

/// A reusable layout cell with named ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
    pub ports: Vec<Port>,
    /// Optical path length through the cell (µm), for two-port waveguides.
    pub length: Option<f64>,
}

impl Cell {
    pub fn port(&self, name: &str) -> Result<&Port, LayoutError> {
        self.ports
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| LayoutError::UnknownPort {
                cell: self.name.clone(),
                port: name.to_string(),
            })
    }
}

/// Straight waveguide along +x: `W0` at the origin, `E0` at `(length, 0)`.
pub fn straight(length: f64, width: f64) -> Result<Cell, LayoutError> {
    let name = format!("straight_L{length:.3}_W{width:.3}");
    if length < 0.0 {
        return Err(LayoutError::NegativeLength { cell: name, length });
    }
    Ok(Cell {
        name,
        ports: vec![
            Port::new("W0", [0.0, 0.0], 180.0, width),
            Port::new("E0", [length, 0.0], 0.0, width),
        ],
        length: Some(length),
    })
}

/// 90° circular bend turning left: enters at `W0` (origin, heading east) and
/// leaves at `N0` = `(radius, radius)` heading north.
pub fn bend_circular(radius: f64, width: f64) -> Result<Cell, LayoutError> {
    let name = format!("bend_R{radius:.3}_W{width:.3}");
    if radius <= 0.0 {
        return Err(LayoutError::NegativeLength { cell: name, length: radius });
    }
    Ok(Cell {
        name,
        ports: vec![
            Port::new("W0", [0.0, 0.0], 180.0, width),
            Port::new("N0", [radius, radius], 90.0, width),
        ],
        length: Some(FRAC_PI_2 * radius),
    })
}

/// Geometry of a 1x2 multimode-interference splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmiParams {
    /// Access waveguide width (µm).
    pub width: f64,
    pub width_taper: f64,
    pub length_taper: f64,
    pub length_mmi: f64,
    pub width_mmi: f64,
    /// Gap between the output tapers (µm).
    pub gap_mmi: f64,
}

impl Default for MmiParams {
    fn default() -> Self {
        Self {
            width: 0.5,
            width_taper: 1.0,
            length_taper: 10.0,
            length_mmi: 5.5,
            width_mmi: 2.5,
            gap_mmi: 0.25,
        }
    }
}

impl MmiParams {
    /// Vertical distance between the two output ports.
    pub fn port_separation(&self) -> f64 {
        self.gap_mmi + self.width_taper
    }
}

/// 1x2 MMI: input `W0`, outputs `E0` (lower) and `E1` (upper).
pub fn mmi1x2(p: &MmiParams) -> Result<Cell, LayoutError> {
    let name = format!("mmi1x2_L{:.3}_G{:.3}", p.length_mmi, p.gap_mmi);
    if p.port_separation() + p.width_taper > p.width_mmi + 1e-12 {
        return Err(LayoutError::Infeasible(format!(
            "{name}: output tapers ({:.3} µm apart, {:.3} µm wide) do not fit in width_mmi {:.3} µm",
            p.port_separation(),
            p.width_taper,
            p.width_mmi
        )));
    }
    let x_out = p.length_mmi + p.length_taper;
    let half = p.port_separation() / 2.0;
    Ok(Cell {
        name,
        ports: vec![
            Port::new("W0", [-p.length_taper, 0.0], 180.0, p.width),
            Port::new("E0", [x_out, -half], 0.0, p.width),
            Port::new("E1", [x_out, half], 0.0, p.width),
        ],
        length: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_rejects_negative_length() {
        assert!(straight(-1.0, 0.5).is_err());
        assert_eq!(straight(3.0, 0.5).unwrap().port("E0").unwrap().position, [3.0, 0.0]);
    }

    #[test]
    fn mmi_ports() {
        let cell = mmi1x2(&MmiParams::default()).unwrap();
        let e0 = cell.port("E0").unwrap();
        let e1 = cell.port("E1").unwrap();
        assert!((e1.position[1] - e0.position[1] - 1.25).abs() < 1e-12);
        assert!(cell.port("S0").is_err());
    }

    #[test]
    fn mmi_rejects_overlapping_tapers() {
        let p = MmiParams {
            width_mmi: 1.5,
            ..MmiParams::default()
        };
        assert!(matches!(mmi1x2(&p), Err(LayoutError::Infeasible(_))));
    }
}

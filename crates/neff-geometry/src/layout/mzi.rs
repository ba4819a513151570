//! Mach–Zehnder interferometer layout.
//!
//! ```text
//!                __Lx__
//!               |      |
//!               Ly     Lyr
//!               |      |
//!     splitter==|      |==combiner
//!               |      |
//!               Ly     Lyr
//!               |      |
//!               | delta_length/2
//!               |      |
//!               |__Lx__|
//! ```
//!
//! The combiner is placed rotated by 180°, so its outputs face the arms. When
//! splitter and combiner have different output spacings the right-hand
//! verticals absorb half of the difference (`Lyr = Ly + (dl - dr) / 2`).

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::layout::cell::{bend_circular, mmi1x2, straight, Cell, MmiParams};
use crate::layout::graph::{Layout, LayoutGraph, PlacedInstance};
use crate::layout::port::{rename_ports_by_orientation, Port};

const SPLITTER: &str = "splitter";
const COMBINER: &str = "combiner";

const TOP_ARM: [&str; 7] = [
    "top_bend_in",
    "top_rise",
    "top_bend_over",
    "top_across",
    "top_bend_down",
    "top_fall",
    "top_bend_out",
];

const BOTTOM_ARM: [&str; 9] = [
    "bot_bend_in",
    "bot_fall",
    "bot_delta_fall",
    "bot_bend_under",
    "bot_across",
    "bot_bend_up",
    "bot_delta_rise",
    "bot_rise",
    "bot_bend_out",
];

/// MZI parameters (µm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MziParams {
    /// Extra vertical length of the bottom arm.
    pub delta_length: f64,
    /// Vertical length shared by both arms.
    pub length_y: f64,
    /// Horizontal length of both arms.
    pub length_x: f64,
    pub bend_radius: f64,
    /// Waveguide width.
    pub width: f64,
    pub splitter: MmiParams,
    /// Defaults to the splitter geometry.
    pub combiner: Option<MmiParams>,
    /// If false the splitter is left out and the two bend inputs become ports.
    pub with_splitter: bool,
}

impl Default for MziParams {
    fn default() -> Self {
        Self {
            delta_length: 10.0,
            length_y: 0.1,
            length_x: 0.1,
            bend_radius: 10.0,
            width: 0.5,
            splitter: MmiParams::default(),
            combiner: None,
            with_splitter: true,
        }
    }
}

/// A resolved MZI.
#[derive(Debug, Clone)]
pub struct MziLayout {
    layout: Layout,
    ports: Vec<Port>,
    with_splitter: bool,
}

impl MziLayout {
    /// Outer ports, named by orientation.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Instances belonging to the component (the splitter is omitted when
    /// `with_splitter` is false; it is still used as the placement anchor).
    pub fn instances(&self) -> impl Iterator<Item = &PlacedInstance> {
        let with_splitter = self.with_splitter;
        self.layout
            .instances()
            .iter()
            .filter(move |i| with_splitter || i.name != SPLITTER)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Waveguide lengths of the (top, bottom) arms between splitter and combiner.
    pub fn arm_lengths(&self) -> Result<(f64, f64), LayoutError> {
        let sum = |names: &[&str]| -> Result<f64, LayoutError> {
            names.iter().try_fold(0.0, |acc, n| {
                Ok(acc + self.layout.instance(n)?.cell.length.unwrap_or(0.0))
            })
        };
        Ok((sum(&TOP_ARM)?, sum(&BOTTOM_ARM)?))
    }
}

fn output_spacing(cell: &Cell) -> Result<f64, LayoutError> {
    Ok((cell.port("E1")?.position[1] - cell.port("E0")?.position[1]).abs())
}

/// Builds and places the MZI.
///
/// Fails with [`LayoutError::Infeasible`] when the combiner/splitter spacing
/// difference would make the right-hand verticals non-positive.
pub fn mzi(params: &MziParams) -> Result<MziLayout, LayoutError> {
    let splitter = Arc::new(mmi1x2(&params.splitter)?);
    let combiner = match &params.combiner {
        Some(p) => Arc::new(mmi1x2(p)?),
        None => Arc::clone(&splitter),
    };

    let dl = output_spacing(&splitter)?;
    let dr = output_spacing(&combiner)?;
    let offset = dl - dr;
    if offset + params.length_y <= 0.0 {
        return Err(LayoutError::Infeasible(format!(
            "splitter/combiner port offset difference ({offset:.4}) + length_y ({:.4}) must be > 0",
            params.length_y
        )));
    }

    let w = params.width;
    let bend = Arc::new(bend_circular(params.bend_radius, w)?);
    let rise = Arc::new(straight(params.length_y, w)?);
    let fall_right = Arc::new(straight(params.length_y + offset / 2.0, w)?);
    let delta = Arc::new(straight(params.delta_length / 2.0, w)?);
    let across = Arc::new(straight(params.length_x, w)?);

    let mut g = LayoutGraph::new();
    g.add_instance(SPLITTER, splitter)?;
    g.add_instance(COMBINER, combiner)?;
    g.set_root(SPLITTER)?;

    let top_cells = [&bend, &rise, &bend, &across, &bend, &fall_right, &bend];
    for (name, cell) in TOP_ARM.iter().zip(top_cells) {
        g.add_instance(*name, Arc::clone(cell))?;
    }
    let bottom_cells = [
        &bend, &rise, &delta, &bend, &across, &bend, &delta, &fall_right, &bend,
    ];
    for (name, cell) in BOTTOM_ARM.iter().zip(bottom_cells) {
        g.add_instance(*name, Arc::clone(cell))?;
    }

    // top arm
    g.connect("top_bend_in", "W0", SPLITTER, "E1")?;
    g.connect("top_rise", "W0", "top_bend_in", "N0")?;
    g.connect("top_bend_over", "N0", "top_rise", "E0")?;
    g.connect("top_across", "W0", "top_bend_over", "W0")?;
    g.connect("top_bend_down", "N0", "top_across", "E0")?;
    g.connect("top_fall", "W0", "top_bend_down", "W0")?;
    g.connect("top_bend_out", "W0", "top_fall", "E0")?;
    g.connect(COMBINER, "E0", "top_bend_out", "N0")?;

    // bottom arm
    g.connect("bot_bend_in", "N0", SPLITTER, "E0")?;
    g.connect("bot_fall", "W0", "bot_bend_in", "W0")?;
    g.connect("bot_delta_fall", "W0", "bot_fall", "E0")?;
    g.connect("bot_bend_under", "W0", "bot_delta_fall", "E0")?;
    g.connect("bot_across", "W0", "bot_bend_under", "N0")?;
    g.connect("bot_bend_up", "W0", "bot_across", "E0")?;
    g.connect("bot_delta_rise", "W0", "bot_bend_up", "N0")?;
    g.connect("bot_rise", "W0", "bot_delta_rise", "E0")?;
    g.connect("bot_bend_out", "N0", "bot_rise", "E0")?;
    // closes the loop; checked for alignment
    g.connect("bot_bend_out", "W0", COMBINER, "E1")?;

    let layout = g.resolve()?;

    let mut ports = Vec::new();
    if params.with_splitter {
        ports.extend(
            layout
                .instance(SPLITTER)?
                .ports()
                .into_iter()
                .filter(|p| p.direction() == Some('W')),
        );
    } else {
        ports.push(layout.port("top_bend_in", "W0")?.renamed("W1"));
        ports.push(layout.port("bot_bend_in", "N0")?.renamed("W0"));
    }
    ports.extend(
        layout
            .instance(COMBINER)?
            .ports()
            .into_iter()
            .enumerate()
            .filter(|(_, p)| p.direction() == Some('E'))
            .map(|(i, p)| p.renamed(format!("E{i}"))),
    );
    let ports = rename_ports_by_orientation(&ports);
    debug!(
        "mzi: {} instances, ports {:?}",
        layout.instances().len(),
        ports.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
    );

    Ok(MziLayout {
        layout,
        ports,
        with_splitter: params.with_splitter,
    })
}

//! Integration tests for the Mach–Zehnder layout graph.

use approx::assert_relative_eq;

use neff_geometry::layout::{mzi, MmiParams, MziParams};
use neff_geometry::LayoutError;

#[test]
fn arm_difference_equals_delta_length() {
    let params = MziParams {
        delta_length: 25.0,
        length_y: 2.0,
        length_x: 4.0,
        ..MziParams::default()
    };
    let layout = mzi(&params).unwrap();
    let (top, bottom) = layout.arm_lengths().unwrap();
    assert_relative_eq!(bottom - top, 25.0, epsilon = 1e-9);
}

#[test]
fn default_mzi_has_one_input_and_one_output() {
    let layout = mzi(&MziParams::default()).unwrap();
    let names: Vec<&str> = layout.ports().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["E0", "W0"]);

    let w0 = layout.port("W0").unwrap();
    let e0 = layout.port("E0").unwrap();
    assert_eq!(w0.direction(), Some('W'));
    assert_eq!(e0.direction(), Some('E'));
    // Symmetric splitter and combiner keep input and output on the same axis.
    assert_relative_eq!(w0.position[1], e0.position[1], epsilon = 1e-9);
    assert!(e0.position[0] > w0.position[0]);
}

#[test]
fn output_sits_after_four_bends_and_the_crossing() {
    let params = MziParams::default();
    let layout = mzi(&params).unwrap();
    let mmi = &params.splitter;
    let splitter_out = mmi.length_mmi + mmi.length_taper;
    // splitter body, four bend radii, the horizontal, then the flipped combiner
    let expected_x = splitter_out
        + 4.0 * params.bend_radius
        + params.length_x
        + splitter_out
        + mmi.length_taper;
    let e0 = layout.port("E0").unwrap();
    assert_relative_eq!(e0.position[0], expected_x, epsilon = 1e-9);
}

#[test]
fn without_splitter_exposes_both_arm_inputs() {
    let params = MziParams {
        with_splitter: false,
        ..MziParams::default()
    };
    let layout = mzi(&params).unwrap();
    let w0 = layout.port("W0").unwrap();
    let w1 = layout.port("W1").unwrap();
    assert!(w1.position[1] > w0.position[1]);
    assert!(layout.instances().all(|i| i.name != "splitter"));
    assert_eq!(layout.instances().count(), 17);
}

#[test]
fn different_combiner_shifts_the_right_verticals() {
    let params = MziParams {
        length_y: 1.0,
        combiner: Some(MmiParams {
            gap_mmi: 0.75,
            width_mmi: 3.0,
            ..MmiParams::default()
        }),
        ..MziParams::default()
    };
    let layout = mzi(&params).unwrap();
    let (top, bottom) = layout.arm_lengths().unwrap();
    assert_relative_eq!(bottom - top, params.delta_length, epsilon = 1e-9);
}

#[test]
fn infeasible_combiner_offset_fails_fast() {
    let params = MziParams {
        length_y: 0.1,
        combiner: Some(MmiParams {
            gap_mmi: 1.0,
            width_mmi: 4.0,
            ..MmiParams::default()
        }),
        ..MziParams::default()
    };
    match mzi(&params) {
        Err(LayoutError::Infeasible(msg)) => {
            assert!(msg.contains("length_y"), "{msg}");
        }
        other => panic!("expected infeasible layout, got {other:?}"),
    }
}

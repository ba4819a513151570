//! Scattering dictionaries.
//!
//! An [`SDict`] maps `(input port, output port)` pairs to complex
//! transmission coefficients. Port names carry the mode index as
//! `"<port>@<mode>"`, so a two-port waveguide with `m` modes has `2m` entries
//! once made reciprocal.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use num_complex::Complex64;

pub type SDict = BTreeMap<(String, String), Complex64>;

/// `"o1@0"`-style label for mode `mode` at `port`.
pub fn port_label(port: &str, mode: usize) -> String {
    format!("{port}@{mode}")
}

/// Copy of `sdict` with every `(a, b)` entry mirrored to `(b, a)`.
/// Existing reverse entries are kept.
pub fn reciprocal(sdict: &SDict) -> SDict {
    let mut out = sdict.clone();
    for ((a, b), value) in sdict {
        out.entry((b.clone(), a.clone())).or_insert(*value);
    }
    out
}

/// Straight-section transmission: amplitude $10^{-\alpha L / 20}$ and phase
/// $2\pi n_\text{eff} L / \lambda$.
pub fn propagation(neff: f64, length: f64, loss_db_per_um: f64, wavelength: f64) -> Complex64 {
    let phase = 2.0 * PI * neff * length / wavelength;
    let amplitude = 10f64.powf(-loss_db_per_um * length / 20.0);
    Complex64::from_polar(amplitude, phase)
}

/// Two-port (`o1`, `o2`) waveguide S-dictionary, one entry pair per mode.
pub fn waveguide_sdict(neffs: &[f64], length: f64, loss_db_per_um: f64, wavelength: f64) -> SDict {
    let forward: SDict = neffs
        .iter()
        .enumerate()
        .map(|(k, &neff)| {
            (
                (port_label("o1", k), port_label("o2", k)),
                propagation(neff, length, loss_db_per_um, wavelength),
            )
        })
        .collect();
    reciprocal(&forward)
}

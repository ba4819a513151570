//! N-linear interpolation on a rectilinear grid.

use super::{check_samples, Surrogate, SurrogateError};

/// Interpolates sweep outputs over the grid recovered from the sample inputs.
///
/// Axes holding a single value are ignored. Queries outside the grid box are
/// clamped to it; results there are not an extrapolation and should not be
/// relied on.
#[derive(Debug, Clone)]
pub struct GridInterpolator {
    axes: Vec<Vec<f64>>,
    strides: Vec<usize>,
    /// `values[output][flat index]`, last axis fastest.
    values: Vec<Vec<f64>>,
}

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * (1.0 + a.abs().max(b.abs()))
}

fn locate(axis: &[f64], x: f64) -> Option<usize> {
    let i = axis.partition_point(|&a| a < x && !same(a, x));
    (i < axis.len() && same(axis[i], x)).then_some(i)
}

impl GridInterpolator {
    pub fn fit(inputs: &[Vec<f64>], outputs: &[Vec<f64>]) -> Result<Self, SurrogateError> {
        let (d, m) = check_samples(inputs, outputs)?;

        let axes: Vec<Vec<f64>> = (0..d)
            .map(|j| {
                let mut axis: Vec<f64> = inputs.iter().map(|x| x[j]).collect();
                axis.sort_by(f64::total_cmp);
                axis.dedup_by(|a, b| same(*a, *b));
                axis
            })
            .collect();

        let mut strides = vec![1; d];
        for j in (0..d.saturating_sub(1)).rev() {
            strides[j] = strides[j + 1] * axes[j + 1].len();
        }
        let expected: usize = axes.iter().map(Vec::len).product();

        let mut filled = vec![false; expected];
        let mut values = vec![vec![0.0; expected]; m];
        for (x, y) in inputs.iter().zip(outputs) {
            let mut flat = 0;
            for ((axis, &stride), &v) in axes.iter().zip(&strides).zip(x) {
                // Every coordinate came from this axis, so it is always found.
                flat += locate(axis, v).unwrap_or(0) * stride;
            }
            if !filled[flat] {
                filled[flat] = true;
                for (k, &v) in y.iter().enumerate() {
                    values[k][flat] = v;
                }
            }
        }
        let found = filled.iter().filter(|&&f| f).count();
        if found != expected || inputs.len() != expected {
            return Err(SurrogateError::IncompleteGrid { expected, found });
        }

        Ok(Self {
            axes,
            strides,
            values,
        })
    }

    /// Sorted unique values per input dimension.
    pub fn axes(&self) -> &[Vec<f64>] {
        &self.axes
    }
}

impl Surrogate for GridInterpolator {
    fn num_inputs(&self) -> usize {
        self.axes.len()
    }

    fn num_outputs(&self) -> usize {
        self.values.len()
    }

    fn evaluate(&self, output: usize, input: &[f64]) -> Result<f64, SurrogateError> {
        if input.len() != self.axes.len() {
            return Err(SurrogateError::DimensionMismatch {
                expected: self.axes.len(),
                got: input.len(),
            });
        }
        let table = self.values.get(output).ok_or(SurrogateError::OutputIndex {
            index: output,
            len: self.values.len(),
        })?;
        if !input.iter().all(|v| v.is_finite()) {
            return Err(SurrogateError::NonFinite("query"));
        }

        let mut base = 0;
        // (stride, fraction) of each non-degenerate axis.
        let mut active: Vec<(usize, f64)> = Vec::new();
        for ((axis, &stride), &x) in self.axes.iter().zip(&self.strides).zip(input) {
            let n = axis.len();
            if n < 2 {
                continue;
            }
            let x = x.clamp(axis[0], axis[n - 1]);
            let i = axis.partition_point(|&a| a <= x).saturating_sub(1).min(n - 2);
            let t = (x - axis[i]) / (axis[i + 1] - axis[i]);
            base += i * stride;
            active.push((stride, t));
        }

        let mut sum = 0.0;
        for corner in 0..(1usize << active.len()) {
            let mut weight = 1.0;
            let mut flat = base;
            for (bit, &(stride, t)) in active.iter().enumerate() {
                if (corner >> bit) & 1 == 1 {
                    weight *= t;
                    flat += stride;
                } else {
                    weight *= 1.0 - t;
                }
            }
            if weight != 0.0 {
                sum += weight * table[flat];
            }
        }
        Ok(sum)
    }

    fn kind_name(&self) -> &str {
        "grid"
    }
}

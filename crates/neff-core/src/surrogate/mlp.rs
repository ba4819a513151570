//! Neural-network surrogate.
//!
//! Each output column is modelled as a least-squares linear baseline plus a
//! one-hidden-layer tanh network fitted to the baseline's residual:
//!
//! $$y(\mathbf{x}) = \mathbf{c}\cdot\hat{\mathbf{x}} + c_0 + \mu + \sigma\,
//! \left(\mathbf{w}_2 \cdot \tanh(W_1^\top \hat{\mathbf{x}} + \mathbf{b}_1) + b_2\right)$$
//!
//! Inputs $\hat{\mathbf{x}}$ are scaled per axis to $[-1, 1]$ over the
//! training range; residuals are standardised by their mean $\mu$ and
//! standard deviation $\sigma$. Training is full-batch Adam on the mean
//! squared error from a seeded initialisation, so fits are reproducible.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array, Array1, Array2, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{check_samples, Surrogate, SurrogateError};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;

/// Training hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// Hidden-layer width.
    pub hidden: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Seed for weight initialisation.
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden: 16,
            epochs: 3000,
            learning_rate: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
struct Network {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array1<f64>,
    b2: f64,
}

impl Network {
    fn forward(&self, x: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
        let hidden = (x.dot(&self.w1) + &self.b1).mapv(f64::tanh);
        let out = hidden.dot(&self.w2) + self.b2;
        (hidden, out)
    }
}

/// Fitted model of one output column.
#[derive(Debug, Clone)]
struct Head {
    /// Linear coefficients on the scaled inputs, intercept last.
    coef: Vec<f64>,
    mean: f64,
    scale: f64,
    network: Option<Network>,
}

#[derive(Debug, Clone)]
pub struct MlpSurrogate {
    lo: Vec<f64>,
    span: Vec<f64>,
    heads: Vec<Head>,
    training_rmse: Vec<f64>,
}

impl MlpSurrogate {
    pub fn fit(inputs: &[Vec<f64>], outputs: &[Vec<f64>], config: &MlpConfig) -> Result<Self, SurrogateError> {
        let (d, m) = check_samples(inputs, outputs)?;
        if config.hidden == 0 || !(config.learning_rate.is_finite() && config.learning_rate > 0.0) {
            return Err(SurrogateError::Fit(
                "hidden width and learning rate must be positive".into(),
            ));
        }
        let n = inputs.len();

        let mut lo = vec![f64::INFINITY; d];
        let mut hi = vec![f64::NEG_INFINITY; d];
        for x in inputs {
            for ((l, h), &v) in lo.iter_mut().zip(hi.iter_mut()).zip(x) {
                *l = l.min(v);
                *h = h.max(v);
            }
        }
        let span: Vec<f64> = lo.iter().zip(&hi).map(|(l, h)| h - l).collect();

        let mut surrogate = Self {
            lo,
            span,
            heads: Vec::with_capacity(m),
            training_rmse: Vec::with_capacity(m),
        };
        let x = Array2::from_shape_fn((n, d), |(i, j)| surrogate.scale_input(j, inputs[i][j]));
        let design = DMatrix::from_fn(n, d + 1, |i, j| if j < d { x[[i, j]] } else { 1.0 });
        let svd = design.clone().svd(true, true);

        for k in 0..m {
            let y = DVector::from_iterator(n, outputs.iter().map(|row| row[k]));
            let coef = svd
                .solve(&y, 1e-12)
                .map_err(|e| SurrogateError::Fit(e.to_string()))?;
            let residual = &y - &design * &coef;

            let mean = residual.mean();
            let std = (residual.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
            let (scale, network) = if std < 1e-12 {
                (1.0, None)
            } else {
                let z = Array1::from_iter(residual.iter().map(|r| (r - mean) / std));
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(k as u64));
                (std, Some(train(&x, &z, config, &mut rng)))
            };
            surrogate.heads.push(Head {
                coef: coef.iter().copied().collect(),
                mean,
                scale,
                network,
            });
        }

        for k in 0..m {
            let mut sq = 0.0;
            for (row, out) in inputs.iter().zip(outputs) {
                sq += (surrogate.predict(k, row) - out[k]).powi(2);
            }
            surrogate.training_rmse.push((sq / n as f64).sqrt());
        }
        Ok(surrogate)
    }

    /// Root-mean-square training residual of each output column.
    pub fn training_rmse(&self) -> &[f64] {
        &self.training_rmse
    }

    fn scale_input(&self, j: usize, v: f64) -> f64 {
        if self.span[j] > 0.0 {
            2.0 * (v - self.lo[j]) / self.span[j] - 1.0
        } else {
            0.0
        }
    }

    fn predict(&self, output: usize, input: &[f64]) -> f64 {
        let head = &self.heads[output];
        let d = input.len();
        let x = Array2::from_shape_fn((1, d), |(_, j)| self.scale_input(j, input[j]));
        let linear = (0..d).map(|j| head.coef[j] * x[[0, j]]).sum::<f64>() + head.coef[d];
        let correction = match &head.network {
            Some(net) => net.forward(&x).1[0],
            None => 0.0,
        };
        linear + head.mean + head.scale * correction
    }
}

fn adam_step<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    lr: f64,
    t: i32,
) {
    let (c1, c2) = (1.0 - BETA1.powi(t), 1.0 - BETA2.powi(t));
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            *p -= lr * (*m / c1) / ((*v / c2).sqrt() + ADAM_EPS);
        });
}

fn train(x: &Array2<f64>, z: &Array1<f64>, config: &MlpConfig, rng: &mut StdRng) -> Network {
    let (n, d) = x.dim();
    let h = config.hidden;
    let limit = (1.0 / d.max(1) as f64).sqrt();
    let mut net = Network {
        w1: Array2::from_shape_fn((d, h), |_| rng.gen_range(-limit..limit)),
        b1: Array1::from_shape_fn(h, |_| rng.gen_range(-0.5..0.5)),
        w2: Array1::from_shape_fn(h, |_| rng.gen_range(-0.1..0.1)),
        b2: 0.0,
    };

    let (mut m_w1, mut v_w1) = (Array2::zeros((d, h)), Array2::zeros((d, h)));
    let (mut m_b1, mut v_b1) = (Array1::zeros(h), Array1::zeros(h));
    let (mut m_w2, mut v_w2) = (Array1::zeros(h), Array1::zeros(h));
    let (mut m_b2, mut v_b2) = (0.0, 0.0);

    for epoch in 1..=config.epochs {
        let t = epoch.min(i32::MAX as usize) as i32;
        let (hidden, out) = net.forward(x);
        let g_out = (out - z).mapv(|e| 2.0 * e / n as f64);

        let g_w2 = hidden.t().dot(&g_out);
        let g_b2 = g_out.sum();
        let g_pre = (&g_out.view().insert_axis(Axis(1)) * &net.w2.view().insert_axis(Axis(0)))
            * hidden.mapv(|a| 1.0 - a * a);
        let g_w1 = x.t().dot(&g_pre);
        let g_b1 = g_pre.sum_axis(Axis(0));

        let lr = config.learning_rate;
        adam_step(&mut net.w1, &g_w1, &mut m_w1, &mut v_w1, lr, t);
        adam_step(&mut net.b1, &g_b1, &mut m_b1, &mut v_b1, lr, t);
        adam_step(&mut net.w2, &g_w2, &mut m_w2, &mut v_w2, lr, t);

        m_b2 = BETA1 * m_b2 + (1.0 - BETA1) * g_b2;
        v_b2 = BETA2 * v_b2 + (1.0 - BETA2) * g_b2 * g_b2;
        net.b2 -= lr * (m_b2 / (1.0 - BETA1.powi(t))) / ((v_b2 / (1.0 - BETA2.powi(t))).sqrt() + ADAM_EPS);
    }
    net
}

impl Surrogate for MlpSurrogate {
    fn num_inputs(&self) -> usize {
        self.lo.len()
    }

    fn num_outputs(&self) -> usize {
        self.heads.len()
    }

    fn evaluate(&self, output: usize, input: &[f64]) -> Result<f64, SurrogateError> {
        if input.len() != self.lo.len() {
            return Err(SurrogateError::DimensionMismatch {
                expected: self.lo.len(),
                got: input.len(),
            });
        }
        if output >= self.heads.len() {
            return Err(SurrogateError::OutputIndex {
                index: output,
                len: self.heads.len(),
            });
        }
        if !input.iter().all(|v| v.is_finite()) {
            return Err(SurrogateError::NonFinite("query"));
        }
        Ok(self.predict(output, input))
    }

    fn kind_name(&self) -> &str {
        "mlp"
    }
}

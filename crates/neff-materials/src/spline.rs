//! Natural cubic spline used to interpolate tabulated optical constants.

use crate::provider::MaterialError;

/// A natural cubic spline through $(x_i, y_i)$ with continuous first and
/// second derivatives and zero curvature at both ends.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots.
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Builds the spline. `xs` must be strictly increasing and at least two
    /// points long, and `ys` must have the same length.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, MaterialError> {
        if xs.len() != ys.len() {
            return Err(MaterialError::DataError(format!(
                "spline knots ({}) and values ({}) differ in length",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(MaterialError::DataError(
                "spline needs at least 2 data points".into(),
            ));
        }
        if let Some(i) = (1..xs.len()).find(|&i| !(xs[i] > xs[i - 1])) {
            return Err(MaterialError::DataError(format!(
                "spline knots must be strictly increasing (index {i})"
            )));
        }

        let n = xs.len();
        let mut y2s = vec![0.0; n];
        let mut u = vec![0.0; n - 1];

        // Tridiagonal forward sweep.
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * y2s[i - 1] + 2.0;
            y2s[i] = (sig - 1.0) / p;
            let slope_delta = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * slope_delta / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }

        for k in (0..n - 2).rev() {
            y2s[k + 1] = y2s[k + 1] * y2s[k + 2] + u[k + 1];
        }

        Ok(Self { xs, ys, y2s })
    }

    /// First and last knot.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluates the spline. Outside the knots the boundary cubic is used.
    pub fn evaluate(&self, x: f64) -> f64 {
        let lo = match self.xs.partition_point(|&k| k <= x) {
            0 => 0,
            i => (i - 1).min(self.xs.len() - 2),
        };
        let hi = lo + 1;

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;

        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * h * h / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn passes_through_knots() {
        let xs = vec![1.2, 1.4, 1.55, 1.7, 2.0];
        let ys = vec![3.52, 3.49, 3.476, 3.47, 3.46];
        let spline = CubicSpline::new(xs.clone(), ys.clone()).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_relative_eq!(spline.evaluate(*x), *y, epsilon = 1e-10);
        }
    }

    #[test]
    fn reproduces_straight_line() {
        let xs = vec![0.0, 1.0, 2.0, 3.0];
        let ys = vec![1.0, 3.0, 5.0, 7.0];
        let spline = CubicSpline::new(xs, ys).unwrap();
        assert_relative_eq!(spline.evaluate(1.5), 4.0, epsilon = 1e-12);
        assert_relative_eq!(spline.evaluate(2.25), 5.5, epsilon = 1e-12);
    }

    #[test]
    fn rejects_unsorted_knots() {
        assert!(CubicSpline::new(vec![1.0, 0.5, 2.0], vec![0.0; 3]).is_err());
        assert!(CubicSpline::new(vec![1.0], vec![0.0]).is_err());
        assert!(CubicSpline::new(vec![1.0, 2.0], vec![0.0]).is_err());
    }
}

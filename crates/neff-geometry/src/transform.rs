//! 2D rigid-body transformations for placing layout instances.
//!
//! Rotations by multiples of 90° are built from exact matrices so that port
//! positions chained through many instances do not accumulate rounding noise.

use nalgebra::{Matrix2, Vector2};

/// A rigid transformation: rotation followed by translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// 2x2 rotation matrix.
    pub matrix: Matrix2<f64>,
    /// Translation vector (µm).
    pub translation: Vector2<f64>,
    /// Rotation angle (degrees, normalised to [0, 360)).
    pub angle: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Matrix2::identity(),
            translation: Vector2::zeros(),
            angle: 0.0,
        }
    }
}

/// Normalises an angle in degrees to [0, 360).
pub fn normalize_angle(deg: f64) -> f64 {
    let a = deg.rem_euclid(360.0);
    if (360.0 - a).abs() < 1e-9 {
        0.0
    } else {
        a
    }
}

fn rotation_matrix(deg: f64) -> Matrix2<f64> {
    let a = normalize_angle(deg);
    let quarter = a / 90.0;
    if (quarter - quarter.round()).abs() < 1e-12 {
        let (c, s) = match quarter.round() as i64 % 4 {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
        return Matrix2::new(c, -s, s, c);
    }
    let (s, c) = a.to_radians().sin_cos();
    Matrix2::new(c, -s, s, c)
}

impl Transform {
    /// Pure translation.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            translation: Vector2::new(dx, dy),
            ..Self::default()
        }
    }

    /// Counter-clockwise rotation about the origin.
    pub fn rotation(deg: f64) -> Self {
        Self {
            matrix: rotation_matrix(deg),
            translation: Vector2::zeros(),
            angle: normalize_angle(deg),
        }
    }

    /// Apply this transformation to a point.
    pub fn apply(&self, point: &[f64; 2]) -> [f64; 2] {
        let v = self.matrix * Vector2::new(point[0], point[1]) + self.translation;
        [v.x, v.y]
    }

    /// Rotate a direction angle (degrees).
    pub fn rotate_angle(&self, deg: f64) -> f64 {
        normalize_angle(deg + self.angle)
    }

    /// Compose two transforms: self followed by other.
    pub fn then(&self, other: &Transform) -> Transform {
        Transform {
            matrix: other.matrix * self.matrix,
            translation: other.matrix * self.translation + other.translation,
            angle: normalize_angle(self.angle + other.angle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turns_are_exact() {
        let t = Transform::rotation(90.0);
        assert_eq!(t.apply(&[1.0, 0.0]), [0.0, 1.0]);
        let t = Transform::rotation(-90.0);
        assert_eq!(t.angle, 270.0);
        assert_eq!(t.apply(&[1.0, 0.0]), [0.0, -1.0]);
    }

    #[test]
    fn rotate_then_translate() {
        let t = Transform::rotation(180.0).then(&Transform::translation(1.0, 2.0));
        assert_eq!(t.apply(&[1.0, 1.0]), [0.0, 1.0]);
        assert_eq!(t.rotate_angle(90.0), 270.0);
    }

    #[test]
    fn arbitrary_angle() {
        let t = Transform::rotation(45.0);
        let p = t.apply(&[1.0, 0.0]);
        let h = 0.5_f64.sqrt();
        assert!((p[0] - h).abs() < 1e-12 && (p[1] - h).abs() < 1e-12);
        assert_eq!(normalize_angle(-360.0), 0.0);
    }
}

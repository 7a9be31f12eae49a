use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Number of coefficients in the full rational model.
pub const RATIONAL_COEFF_COUNT: usize = 8;

pub trait DistortionModel<S: RealField + Copy> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S>;
    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S>;
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct NoDistortion;

impl<S: RealField + Copy> DistortionModel<S> for NoDistortion {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S> {
        *n_undist
    }

    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S> {
        *n_dist
    }
}

/// Rational radial + tangential lens distortion.
///
/// ```text
/// radial = (1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)
/// x_d = x radial + 2 p1 x y + p2 (r² + 2 x²)
/// y_d = y radial + p1 (r² + 2 y²) + 2 p2 x y
/// ```
///
/// With `k4 = k5 = k6 = 0` this reduces to the five-coefficient
/// radial-tangential model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RationalDistortion<S: RealField + Copy> {
    pub k1: S,
    pub k2: S,
    pub p1: S,
    pub p2: S,
    pub k3: S,
    pub k4: S,
    pub k5: S,
    pub k6: S,
}

impl<S: RealField + Copy> RationalDistortion<S> {
    /// Coefficients in `[k1, k2, p1, p2, k3, k4, k5, k6]` order.
    pub fn coeffs(&self) -> [S; RATIONAL_COEFF_COUNT] {
        [
            self.k1, self.k2, self.p1, self.p2, self.k3, self.k4, self.k5, self.k6,
        ]
    }

    /// Build from a coefficient slice in `[k1, k2, p1, p2, k3, k4, k5, k6]` order.
    ///
    /// Shorter slices are zero-padded, extra entries are ignored.
    pub fn from_coeffs(coeffs: &[S]) -> Self {
        let at = |i: usize| coeffs.get(i).copied().unwrap_or_else(S::zero);
        Self {
            k1: at(0),
            k2: at(1),
            p1: at(2),
            p2: at(3),
            k3: at(4),
            k4: at(5),
            k5: at(6),
            k6: at(7),
        }
    }

    fn distort_impl(&self, x: S, y: S) -> (S, S) {
        let one = S::one();
        let two = one + one;
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let num = one + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let den = one + self.k4 * r2 + self.k5 * r4 + self.k6 * r6;
        let radial = num / den;

        let xy = x * y;
        let x_tan = two * self.p1 * xy + self.p2 * (r2 + two * x * x);
        let y_tan = self.p1 * (r2 + two * y * y) + two * self.p2 * xy;

        (x * radial + x_tan, y * radial + y_tan)
    }
}

impl<S: RealField + Copy> DistortionModel<S> for RationalDistortion<S> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S> {
        let (xd, yd) = self.distort_impl(n_undist.x, n_undist.y);
        Vector2::new(xd, yd)
    }

    /// Fixed-point inversion; converges for the moderate distortion seen on
    /// ordinary lenses.
    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S> {
        let mut x = n_dist.x;
        let mut y = n_dist.y;
        for _ in 0..20 {
            let (xd, yd) = self.distort_impl(x, y);
            x = x - (xd - n_dist.x);
            y = y - (yd - n_dist.y);
        }
        Vector2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_coeffs_pads_and_truncates() {
        let short = RationalDistortion::from_coeffs(&[0.1, 0.2, 0.3]);
        assert_eq!(short.coeffs(), [0.1, 0.2, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let long: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let trimmed = RationalDistortion::from_coeffs(&long);
        assert_eq!(trimmed.coeffs(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn zero_coefficients_are_identity() {
        let d = RationalDistortion::<f64>::default();
        let n = Vector2::new(0.3, -0.2);
        assert_eq!(d.distort(&n), n);
    }

    #[test]
    fn denominator_terms_shrink_radius() {
        let plain = RationalDistortion::<f64>::default();
        let rational = RationalDistortion {
            k4: 0.5,
            ..Default::default()
        };
        let n = Vector2::new(0.4, 0.0);
        assert!(rational.distort(&n).x < plain.distort(&n).x);
    }
}

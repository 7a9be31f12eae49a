//! Mathematical utilities and type definitions.
//!
//! This module provides the fundamental types used throughout the workspace
//! and the axis-angle (Rodrigues) conversions used to exchange poses with the
//! solver.

use nalgebra::{
    Isometry3, Matrix3, Matrix3x4, Point2, Point3, Rotation3, UnitQuaternion, Vector2, Vector3,
};

pub mod coordinate_utils;

pub use coordinate_utils::{normalized_to_pixel, pixel_to_normalized};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 3×4 matrix with [`Real`] entries (projection / extrinsic matrices).
pub type Mat34 = Matrix3x4<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Convert a 2D point in Euclidean coordinates into homogeneous coordinates.
///
/// Given a point `p = (x, y)`, returns the homogeneous vector `(x, y, 1)`.
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Convert a 3D homogeneous vector back to a 2D point.
///
/// The input is interpreted as `(x, y, w)` and the result is `(x / w, y / w)`.
/// The caller is responsible for ensuring that `w != 0`.
pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Convert an axis-angle vector (direction = axis, norm = angle in radians)
/// into a 3×3 rotation matrix.
///
/// This is the Rodrigues formula
/// `R = I + sin(θ) [k]ₓ + (1 − cos(θ)) [k]ₓ²`; a zero vector maps to identity.
pub fn rodrigues_to_matrix(rvec: &Vec3) -> Mat3 {
    let theta = rvec.norm();
    if theta < 1e-12 {
        // First-order expansion keeps the map smooth around zero.
        return Mat3::identity() + rvec.cross_matrix();
    }
    let k = rvec / theta;
    let kx = k.cross_matrix();
    Mat3::identity() + kx * theta.sin() + kx * kx * (1.0 - theta.cos())
}

/// Convert a rotation matrix into an axis-angle vector.
///
/// The input is re-orthonormalised before conversion, so slightly noisy
/// rotation estimates are accepted.
pub fn matrix_to_rodrigues(r: &Mat3) -> Vec3 {
    let rot = Rotation3::from_matrix(r);
    rot.scaled_axis()
}

/// Build an [`Iso3`] (target → camera) from an axis-angle rotation and a translation.
pub fn iso_from_rvec_tvec(rvec: &Vec3, tvec: &Vec3) -> Iso3 {
    Iso3::from_parts((*tvec).into(), UnitQuaternion::from_scaled_axis(*rvec))
}

/// Split an [`Iso3`] into axis-angle rotation and translation vectors.
pub fn rvec_tvec_from_iso(iso: &Iso3) -> (Vec3, Vec3) {
    (iso.rotation.scaled_axis(), iso.translation.vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rodrigues_zero_is_identity() {
        let r = rodrigues_to_matrix(&Vec3::zeros());
        assert_relative_eq!(r, Mat3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn rodrigues_quarter_turn_about_z() {
        let r = rodrigues_to_matrix(&Vec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        let x = r * Vec3::x();
        assert_relative_eq!(x, Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn rodrigues_matches_nalgebra_rotation() {
        let rvec = Vec3::new(0.3, -0.2, 0.7);
        let ours = rodrigues_to_matrix(&rvec);
        let theirs = Rotation3::from_scaled_axis(rvec).into_inner();
        assert_relative_eq!(ours, theirs, epsilon = 1e-12);

        let back = matrix_to_rodrigues(&ours);
        assert_relative_eq!(back, rvec, epsilon = 1e-12);
    }
}

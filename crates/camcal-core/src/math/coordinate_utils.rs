//! Coordinate transformation utilities for camera projection.
//!
//! Conversions between pixel coordinates and normalized camera coordinates,
//! plus the combined distort/undistort helpers used by image remapping.

use crate::{DistortionModel, Mat3, Pt2, Real, Vec2, Vec3};

/// Convert pixel coordinates to normalized coordinates using intrinsics.
///
/// Applies `K⁻¹` to move the pixel onto the normalized image plane (Z=1 in
/// the camera frame). Returns `None` if `K` is singular.
pub fn pixel_to_normalized(pixel: Pt2, intrinsics: &Mat3) -> Option<Vec2> {
    let k_inv = intrinsics.try_inverse()?;
    let v = k_inv * Vec3::new(pixel.x, pixel.y, 1.0);
    Some(Vec2::new(v.x / v.z, v.y / v.z))
}

/// Convert normalized coordinates to pixel coordinates using intrinsics.
pub fn normalized_to_pixel(normalized: Vec2, intrinsics: &Mat3) -> Pt2 {
    let v = intrinsics * Vec3::new(normalized.x, normalized.y, 1.0);
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Undistort a pixel to normalized coordinates.
///
/// 1. `n = K⁻¹ [u, v, 1]ᵀ`
/// 2. `n_undist = distortion.undistort(n)`
pub fn undistort_pixel<D: DistortionModel<Real>>(
    pixel: Pt2,
    intrinsics: &Mat3,
    distortion: &D,
) -> Option<Vec2> {
    let normalized = pixel_to_normalized(pixel, intrinsics)?;
    Some(distortion.undistort(&normalized))
}

/// Apply distortion to normalized coordinates and convert to pixels.
///
/// Inverse of [`undistort_pixel`] up to the convergence of the iterative
/// undistortion.
pub fn distort_to_pixel<D: DistortionModel<Real>>(
    normalized: Vec2,
    intrinsics: &Mat3,
    distortion: &D,
) -> Pt2 {
    let distorted = distortion.distort(&normalized);
    normalized_to_pixel(distorted, intrinsics)
}

use camcal_core::{Iso3, Mat3, Real};
use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanarPoseError {
    #[error("intrinsics matrix is singular")]
    SingularIntrinsics,
    #[error("homography columns have zero norm")]
    Degenerate,
    #[error("svd failed")]
    SvdFailed,
}

/// Estimate pose of a planar board (Z=0) relative to camera, given intrinsics K
/// and homography H (plane -> image).
///
/// Returns an Iso3 that maps board coordinates into camera coordinates. The
/// sign of the scale is chosen so the board lies in front of the camera.
pub fn estimate_planar_pose_from_h(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, PlanarPoseError> {
    let k_inv = kmtx
        .try_inverse()
        .ok_or(PlanarPoseError::SingularIntrinsics)?;

    let k_inv_h1 = k_inv * hmtx.column(0);
    let k_inv_h2 = k_inv * hmtx.column(1);
    let k_inv_h3 = k_inv * hmtx.column(2);

    // Scale factor λ: normalize first two columns (average for robustness)
    let mean_norm = (k_inv_h1.norm() + k_inv_h2.norm()) * 0.5;
    if mean_norm <= f64::EPSILON {
        return Err(PlanarPoseError::Degenerate);
    }
    let mut lambda = 1.0 / mean_norm;
    if k_inv_h3.z < 0.0 {
        lambda = -lambda;
    }

    let r1 = lambda * k_inv_h1;
    let r2 = lambda * k_inv_h2;
    let r3 = r1.cross(&r2);

    let r_mat = Matrix3::<Real>::from_columns(&[r1, r2, r3]);

    // Project onto SO(3) (polar decomposition via SVD)
    let svd = r_mat.svd(true, true);
    let mut u = svd.u.ok_or(PlanarPoseError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PlanarPoseError::SvdFailed)?;
    if (u * v_t).determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    let r_orth = u * v_t;

    let t_vec: Vector3<Real> = lambda * k_inv_h3;
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Ok(Iso3::from_parts(Translation3::from(t_vec), rot))
}

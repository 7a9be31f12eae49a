//! Derived calibration quantities: projection matrix and reprojection error.

use camcal_core::{rodrigues_to_matrix, Mat3, Mat34, Pt2, Pt3, Real, Vec3};
use camcal_optim::project_points;
use nalgebra::Matrix3x4;

/// `P = [K | 0] · [R(rvec) | tvec]`, with `[R | t]` padded to 4x4.
pub fn projection_matrix(camera_matrix: &Mat3, rvec: &Vec3, tvec: &Vec3) -> Mat34 {
    let mut k0 = Matrix3x4::zeros();
    k0.fixed_view_mut::<3, 3>(0, 0).copy_from(camera_matrix);

    let mut rt = nalgebra::Matrix4::identity();
    rt.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&rodrigues_to_matrix(rvec));
    rt.fixed_view_mut::<3, 1>(0, 3).copy_from(tvec);

    k0 * rt
}

/// Per-view `‖predicted − observed‖₂ / N` and the mean over views.
///
/// The norm is taken over the whole stacked residual of a view, so this is
/// not the per-point RMS; it matches the classic OpenCV tutorial metric.
pub fn reprojection_error(
    object_points: &[Pt3],
    image_points: &[Vec<Pt2>],
    camera_matrix: &Mat3,
    dist_coeffs: &[Real],
    rvecs: &[Vec3],
    tvecs: &[Vec3],
) -> (Real, Vec<Real>) {
    let per_view: Vec<Real> = image_points
        .iter()
        .zip(rvecs.iter().zip(tvecs))
        .map(|(observed, (r, t))| {
            let predicted = project_points(object_points, r, t, camera_matrix, dist_coeffs);
            let sq: Real = predicted
                .iter()
                .zip(observed)
                .map(|(p, o)| (p - o).norm_squared())
                .sum();
            sq.sqrt() / observed.len().max(1) as Real
        })
        .collect();
    let mean = if per_view.is_empty() {
        0.0
    } else {
        per_view.iter().sum::<Real>() / per_view.len() as Real
    };
    (mean, per_view)
}

//! Synthetic planar target helpers.
//!
//! Builds planar point grids (Z=0), generates camera poses looking at the
//! grid, and projects the grid through a [`Camera`].

use crate::{models::DistortionModel, Camera, Iso3, Pt2, Pt3, Real};
use nalgebra::{Translation3, UnitQuaternion, Vector3};

/// Generate a planar grid of 3D points (Z=0) with `nx * ny` points.
///
/// Points are ordered with the X index varying fastest:
/// `(0,0,0), (s,0,0), ..., ((nx-1)s,0,0), (0,s,0), ...`.
pub fn grid_points(nx: usize, ny: usize, spacing: Real) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(nx.saturating_mul(ny));
    for j in 0..ny {
        for i in 0..nx {
            points.push(Pt3::new(i as Real * spacing, j as Real * spacing, 0.0));
        }
    }
    points
}

/// Generate `n_views` poses with a yaw rotation around the +Y axis and a Z translation ramp.
pub fn poses_yaw_y_z(
    n_views: usize,
    yaw_start_rad: Real,
    yaw_step_rad: Real,
    z_start: Real,
    z_step: Real,
) -> Vec<Iso3> {
    (0..n_views)
        .map(|view_idx| {
            let yaw = yaw_start_rad + yaw_step_rad * view_idx as Real;
            let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 1.0, 0.0) * yaw);
            let translation = Vector3::new(0.0, 0.0, z_start + z_step * view_idx as Real);
            Iso3::from_parts(Translation3::from(translation), rotation)
        })
        .collect()
}

/// Generate `n_views` deterministic poses with tilt about both in-plane axes.
///
/// Zhang's method needs views whose board planes are not parallel; this
/// cycles through tilts of up to ~0.45 rad on X and Y, a small roll, and a
/// distance ramp around `distance`. The board origin is offset so a board of
/// a few hundred units stays near the optical axis.
pub fn varied_poses(n_views: usize, distance: Real) -> Vec<Iso3> {
    (0..n_views)
        .map(|v| {
            let t = v as Real;
            let rx = 0.45 * (0.9 * t + 0.3).sin();
            let ry = 0.45 * (1.3 * t + 1.1).cos();
            let rz = 0.1 * (0.7 * t).sin();
            let rotation = UnitQuaternion::from_euler_angles(rx, ry, rz);
            let z = distance * (1.0 + 0.15 * (0.5 * t).sin());
            let translation = Vector3::new(
                -0.2 * distance + 0.05 * distance * (1.7 * t).sin(),
                -0.12 * distance + 0.05 * distance * (1.1 * t).cos(),
                z,
            );
            Iso3::from_parts(Translation3::from(translation), rotation)
        })
        .collect()
}

/// Project a planar target into the camera, requiring every point to be projectable.
///
/// `cam_from_target` must map target-frame points into the camera frame.
/// Returns `None` if any point lies behind the camera.
pub fn project_view_all<D>(
    camera: &Camera<Real, D>,
    cam_from_target: &Iso3,
    target_points: &[Pt3],
) -> Option<Vec<Pt2>>
where
    D: DistortionModel<Real>,
{
    target_points
        .iter()
        .map(|pw| {
            let pc = cam_from_target.transform_point(pw);
            camera.project_point(&pc).map(Pt2::from)
        })
        .collect()
}

/// Project multiple views, requiring every point to be projectable in every view.
pub fn project_views_all<D>(
    camera: &Camera<Real, D>,
    target_points: &[Pt3],
    cam_from_target: &[Iso3],
) -> Option<Vec<Vec<Pt2>>>
where
    D: DistortionModel<Real>,
{
    cam_from_target
        .iter()
        .map(|pose| project_view_all(camera, pose, target_points))
        .collect()
}

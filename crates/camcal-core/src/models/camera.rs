use nalgebra::{Point3, RealField, Vector2, Vector3};

use super::{DistortionModel, FxFyCxCySkew, IntrinsicsModel, RationalDistortion};
use crate::{iso_from_rvec_tvec, Pt3, Real, Vec3};

/// Pinhole camera with a pluggable lens distortion stage.
///
/// `pixel = K(distortion(x / z, y / z))`
#[derive(Clone, Debug)]
pub struct Camera<S, D>
where
    S: RealField + Copy,
    D: DistortionModel<S>,
{
    pub k: FxFyCxCySkew<S>,
    pub dist: D,
}

/// The camera model produced by calibration.
pub type PinholeCamera = Camera<Real, RationalDistortion<Real>>;

impl<S, D> Camera<S, D>
where
    S: RealField + Copy,
    D: DistortionModel<S>,
{
    pub fn new(k: FxFyCxCySkew<S>, dist: D) -> Self {
        Self { k, dist }
    }

    /// Project a camera-frame point. Points on or behind the image plane
    /// return `None`.
    pub fn project_point_c(&self, p_c: &Vector3<S>) -> Option<Vector2<S>> {
        if p_c.z <= S::zero() {
            return None;
        }
        let n_u = Vector2::new(p_c.x / p_c.z, p_c.y / p_c.z);
        let n_d = self.dist.distort(&n_u);
        Some(self.k.to_pixel(&n_d))
    }

    pub fn project_point(&self, p_c: &Point3<S>) -> Option<Vector2<S>> {
        self.project_point_c(&p_c.coords)
    }

    /// Unit ray through a pixel, in the camera frame.
    pub fn backproject_pixel(&self, px: &Vector2<S>) -> Vector3<S> {
        let n_d = self.k.from_pixel(px);
        let n_u = self.dist.undistort(&n_d);
        let dir = Vector3::new(n_u.x, n_u.y, S::one());
        dir.normalize()
    }
}

impl<D: DistortionModel<Real>> Camera<Real, D> {
    /// Project target-frame points through an axis-angle pose.
    ///
    /// Points behind the camera yield `None` in their slot.
    pub fn project_with_pose(
        &self,
        rvec: &Vec3,
        tvec: &Vec3,
        points: &[Pt3],
    ) -> Vec<Option<Vector2<Real>>> {
        let pose = iso_from_rvec_tvec(rvec, tvec);
        points
            .iter()
            .map(|pw| self.project_point(&pose.transform_point(pw)))
            .collect()
    }
}

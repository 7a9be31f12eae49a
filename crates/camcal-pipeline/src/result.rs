use crate::types::ImageSize;
use camcal_core::{Mat3, Mat34, Real};
use serde::{Deserialize, Serialize};

/// Output of a successful [`CalibrationSession::finish`](crate::CalibrationSession::finish).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub image_width: u32,
    pub image_height: u32,
    pub camera_matrix: Mat3,
    /// `k1 k2 p1 p2 k3 [k4 k5 k6]` as estimated by the solver.
    pub distortion_coefficients: Vec<Real>,
    /// Identity for a monocular camera.
    pub rectification_matrix: Mat3,
    /// `[K|0]·[R|t]` of the first accepted view.
    pub projection_matrix: Mat34,
    /// Mean over views of the stacked residual norm divided by the corner count.
    pub reprojection_error: Real,
    /// Per-point RMS reprojection error reported by the solver.
    pub rms: Real,
    pub per_view_errors: Vec<Real>,
}

impl CalibrationResult {
    pub fn image_size(&self) -> ImageSize {
        (self.image_width, self.image_height)
    }
}

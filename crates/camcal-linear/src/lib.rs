//! Closed-form initialisation for planar chessboard calibration.
//!
//! - [`dlt_homography`]: normalized DLT plane-to-image homography.
//! - [`estimate_intrinsics_from_homographies`]: Zhang's closed-form K.
//! - [`estimate_planar_pose_from_h`]: board pose from H and K.
//!
//! These provide the starting point that `camcal-optim` refines.

pub mod math;

mod homography;
mod planar_pose;
mod zhang_intrinsics;

pub use homography::*;
pub use planar_pose::*;
pub use zhang_intrinsics::*;

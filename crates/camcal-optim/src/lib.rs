//! Non-linear refinement and the planar camera calibration solver.
//!
//! [`calibrate_camera`] chains the closed-form initialisation from
//! `camcal-linear` with a Levenberg–Marquardt refinement of intrinsics, a
//! rational lens distortion model and per-view board poses.

pub mod backend_lm;
pub mod calibrate;
pub mod planar_intrinsics;
mod traits;

pub use backend_lm::LmBackend;
pub use calibrate::{
    calibrate_camera, project_points, CalibrateOptions, CalibrationOutput, SolveError,
    MIN_SOLVER_VIEWS,
};
pub use planar_intrinsics::DistortionKind;
pub use traits::*;

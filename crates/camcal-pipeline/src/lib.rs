//! Interactive chessboard calibration workflow.
//!
//! A [`CalibrationSession`] accumulates chessboard observations captured
//! from an [`ImageSource`], refines their corners to sub-pixel accuracy and,
//! once enough views are collected, runs the planar calibration solver from
//! `camcal-optim`. The result can be written as a camera-info YAML record.
//!
//! ```no_run
//! use camcal_pipeline::{
//!     write_camera_info, CalibrationSession, CalibrationTarget, HttpSnapshotSource,
//!     WriterOptions, DEFAULT_SNAPSHOT_URL,
//! };
//! # fn detector(_: &image::GrayImage, _: (u32, u32)) -> Option<Vec<camcal_core::Pt2>> { None }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let target = CalibrationTarget::new(9, 6, 25.0)?;
//! let mut session = CalibrationSession::start(target)?;
//! let timeout = std::time::Duration::from_secs(5);
//! let mut source = HttpSnapshotSource::new(DEFAULT_SNAPSHOT_URL, timeout);
//!
//! while !session.is_ready() {
//!     let outcome = session.capture_and_detect(&mut source, &detector)?;
//!     if outcome.found {
//!         session.accept_last_capture()?;
//!     }
//! }
//! let result = session.finish()?;
//! write_camera_info(&result, ".", &WriterOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod preview;
pub mod projection;
pub mod registry;
pub mod result;
pub mod session;
pub mod source;
pub mod subpix;
pub mod target;
pub mod types;
pub mod undistort;
pub mod writer;

pub use config::{CalibrationConfig, OutputConfig, SourceConfig};
#[cfg(feature = "detect")]
pub use detect::CalibTargetsDetector;
pub use detect::{order_grid_corners, ChessboardDetector};
pub use error::{CalibrationError, FetchError};
pub use preview::{encode_jpeg, render_preview};
pub use projection::{projection_matrix, reprojection_error};
pub use registry::{SessionId, SessionRegistry, SharedSession};
pub use result::CalibrationResult;
pub use session::{CalibrationSession, SessionOptions, DEFAULT_MIN_VIEWS, MAX_LOG_ENTRIES};
pub use source::{
    fetch_with_retry, DirectorySource, HttpSnapshotSource, ImageSource, RetryPolicy,
    DEFAULT_SNAPSHOT_URL,
};
pub use subpix::{refine_corner_subpix, refine_corners_subpix, SubpixCriteria};
pub use target::CalibrationTarget;
pub use types::{Capture, CaptureOutcome, ImageSize, LogEntry, Observation};
pub use undistort::{init_undistort_map, remap, undistort_image, UndistortMap};
pub use writer::{
    camera_info_file_name, read_camera_info, write_camera_info, CameraInfo, DistortionLabel,
    MatrixRecord, WriteError, WriterOptions,
};

// Re-export the solver surface so callers need only this crate.
pub use camcal_optim::{calibrate_camera, project_points, CalibrateOptions, DistortionKind};

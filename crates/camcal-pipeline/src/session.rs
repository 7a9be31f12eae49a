//! The calibration session: accumulates chessboard views and runs the solve.

use crate::detect::ChessboardDetector;
use crate::error::CalibrationError;
use crate::projection::{projection_matrix, reprojection_error};
use crate::result::CalibrationResult;
use crate::source::{fetch_with_retry, ImageSource, RetryPolicy};
use crate::subpix::{refine_corners_subpix, SubpixCriteria};
use crate::target::CalibrationTarget;
use crate::types::{Capture, CaptureOutcome, ImageSize, LogEntry, Observation};
use camcal_core::{Mat3, Pt2, Pt3};
use camcal_optim::{calibrate_camera, CalibrateOptions, MIN_SOLVER_VIEWS};
use image::DynamicImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Views required before [`CalibrationSession::finish`] is allowed.
pub const DEFAULT_MIN_VIEWS: usize = 25;

/// Oldest log entries are dropped beyond this many.
pub const MAX_LOG_ENTRIES: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Clamped to at least [`MIN_SOLVER_VIEWS`].
    pub min_views: usize,
    pub subpix: SubpixCriteria,
    pub retry: RetryPolicy,
    pub solver: CalibrateOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            min_views: DEFAULT_MIN_VIEWS,
            subpix: SubpixCriteria::default(),
            retry: RetryPolicy::default(),
            solver: CalibrateOptions::default(),
        }
    }
}

/// Accumulated chessboard observations for one camera.
///
/// All observations share one resolution; a view at a different resolution
/// is rejected with [`CalibrationError::ResolutionMismatch`]. Operations
/// that fail leave the observations untouched.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    target: CalibrationTarget,
    object_points: Vec<Pt3>,
    observations: Vec<Observation>,
    resolution: Option<ImageSize>,
    last_capture: Option<Capture>,
    last_capture_accepted: bool,
    options: SessionOptions,
    log: Vec<LogEntry>,
}

impl CalibrationSession {
    /// Start a session with default options.
    pub fn start(target: CalibrationTarget) -> Result<Self, CalibrationError> {
        Self::with_options(target, SessionOptions::default())
    }

    pub fn with_options(
        target: CalibrationTarget,
        mut options: SessionOptions,
    ) -> Result<Self, CalibrationError> {
        target.validate()?;
        if options.min_views < MIN_SOLVER_VIEWS {
            warn!(
                "min_views {} below solver minimum, using {}",
                options.min_views, MIN_SOLVER_VIEWS
            );
            options.min_views = MIN_SOLVER_VIEWS;
        }
        let mut session = Self {
            target,
            object_points: target.object_points(),
            observations: Vec::new(),
            resolution: None,
            last_capture: None,
            last_capture_accepted: false,
            options,
            log: Vec::new(),
        };
        session.record(LogEntry::success_with_notes(
            "start",
            format!(
                "{}x{} corners, square {}",
                target.pattern_width, target.pattern_height, target.square_size
            ),
        ));
        Ok(session)
    }

    /// Reset all accumulated state and switch to a new target.
    pub fn reset(&mut self, target: CalibrationTarget) -> Result<(), CalibrationError> {
        target.validate()?;
        self.target = target;
        self.object_points = target.object_points();
        self.observations.clear();
        self.resolution = None;
        self.last_capture = None;
        self.last_capture_accepted = false;
        self.record(LogEntry::success("reset"));
        info!(
            "calibration session reset for {}x{} board",
            target.pattern_width, target.pattern_height
        );
        Ok(())
    }

    /// Drop every observation, keeping the current target.
    pub fn restart(&mut self) {
        let target = self.target;
        self.observations.clear();
        self.resolution = None;
        self.last_capture = None;
        self.last_capture_accepted = false;
        self.object_points = target.object_points();
        self.record(LogEntry::success("restart"));
        info!("calibration session restarted");
    }

    pub fn target(&self) -> &CalibrationTarget {
        &self.target
    }

    pub fn object_points(&self) -> &[Pt3] {
        &self.object_points
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    /// Working resolution, set by the first accepted observation.
    pub fn resolution(&self) -> Option<ImageSize> {
        self.resolution
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn min_views(&self) -> usize {
        self.options.min_views
    }

    pub fn last_capture(&self) -> Option<&Capture> {
        self.last_capture.as_ref()
    }

    /// Most recent operations, oldest first, at most [`MAX_LOG_ENTRIES`].
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Hand the log to the caller and start a fresh one.
    pub fn take_log(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.log)
    }

    fn record(&mut self, entry: LogEntry) {
        if self.log.len() >= MAX_LOG_ENTRIES {
            let excess = self.log.len() + 1 - MAX_LOG_ENTRIES;
            self.log.drain(..excess);
        }
        self.log.push(entry);
    }

    /// Fetch a frame and look for the chessboard in it.
    ///
    /// The frame becomes the last capture (used by previews and
    /// [`CalibrationSession::accept_last_capture`]); accepted observations are
    /// not touched.
    pub fn capture_and_detect<S, D>(
        &mut self,
        source: &mut S,
        detector: &D,
    ) -> Result<CaptureOutcome, CalibrationError>
    where
        S: ImageSource + ?Sized,
        D: ChessboardDetector + ?Sized,
    {
        let frame = match fetch_with_retry(source, &self.options.retry) {
            Ok(frame) => frame,
            Err(e) => {
                self.record(LogEntry::failure("capture", e.to_string()));
                return Err(e.into());
            }
        };
        Ok(self.detect_frame(frame, detector))
    }

    /// Run detection and sub-pixel refinement on an already fetched frame.
    pub fn detect_frame<D>(&mut self, frame: DynamicImage, detector: &D) -> CaptureOutcome
    where
        D: ChessboardDetector + ?Sized,
    {
        let gray = frame.to_luma8();
        let expected = self.target.corner_count();
        let corners = detector
            .detect(&gray, self.target.pattern_size())
            .filter(|c| {
                if c.len() != expected {
                    warn!("detector returned {} corners, expected {expected}", c.len());
                }
                c.len() == expected
            })
            .map(|c| refine_corners_subpix(&gray, &c, &self.options.subpix));

        let outcome = CaptureOutcome {
            found: corners.is_some(),
            corners: corners.clone(),
            image_size: gray.dimensions(),
        };
        debug!(
            "capture {}x{}: chessboard {}",
            outcome.image_size.0,
            outcome.image_size.1,
            if outcome.found { "found" } else { "not found" }
        );
        self.last_capture = Some(Capture {
            frame,
            gray,
            corners,
        });
        self.last_capture_accepted = false;
        outcome
    }

    /// Append an observation. Returns the new observation count.
    pub fn accept(
        &mut self,
        corners: Vec<Pt2>,
        image_size: ImageSize,
    ) -> Result<usize, CalibrationError> {
        let expected = self.target.corner_count();
        if corners.len() != expected {
            let err = CalibrationError::CornerCountMismatch {
                expected,
                got: corners.len(),
            };
            self.record(LogEntry::failure("accept", err.to_string()));
            return Err(err);
        }
        if let Some(res) = self.resolution {
            if res != image_size {
                let err = CalibrationError::ResolutionMismatch {
                    expected: res,
                    got: image_size,
                };
                warn!("{err}");
                self.record(LogEntry::failure("accept", err.to_string()));
                return Err(err);
            }
        }

        self.resolution = Some(image_size);
        self.observations.push(Observation {
            corners,
            image_size,
        });
        let count = self.observations.len();
        info!("accepted view {count} ({} left)", self.amount_left());
        self.record(LogEntry::success_with_notes("accept", format!("view {count}")));
        Ok(count)
    }

    /// Accept the corners of the last capture.
    ///
    /// Fails with [`CalibrationError::NoPendingCapture`] when there is no
    /// capture, it had no chessboard, or it was already accepted.
    pub fn accept_last_capture(&mut self) -> Result<usize, CalibrationError> {
        let pending = match (&self.last_capture, self.last_capture_accepted) {
            (Some(capture), false) => capture
                .corners
                .clone()
                .map(|c| (c, capture.image_size())),
            _ => None,
        };
        let Some((corners, size)) = pending else {
            self.record(LogEntry::failure(
                "accept",
                CalibrationError::NoPendingCapture.to_string(),
            ));
            return Err(CalibrationError::NoPendingCapture);
        };
        let count = self.accept(corners, size)?;
        self.last_capture_accepted = true;
        Ok(count)
    }

    /// Remove the most recent observation. Returns `false` if there was none.
    pub fn delete_last(&mut self) -> bool {
        match self.observations.pop() {
            Some(_) => {
                if self.observations.is_empty() {
                    self.resolution = None;
                }
                info!("deleted last view, {} remain", self.observations.len());
                self.record(LogEntry::success("delete_last"));
                true
            }
            None => {
                info!("no views to delete");
                self.record(LogEntry::success_with_notes("delete_last", "nothing to delete"));
                false
            }
        }
    }

    /// Views still needed, or the current count once the minimum is reached.
    pub fn amount_left(&self) -> usize {
        let count = self.observations.len();
        if count < self.options.min_views {
            self.options.min_views - count
        } else {
            count
        }
    }

    pub fn is_ready(&self) -> bool {
        self.observations.len() >= self.options.min_views
    }

    /// Solve for intrinsics and distortion from the accepted views.
    ///
    /// Every call runs a fresh solve. The observations are kept either way,
    /// so after a failure more views can be added before retrying.
    pub fn finish(&mut self) -> Result<CalibrationResult, CalibrationError> {
        let have = self.observations.len();
        let need = self.options.min_views;
        let resolution = match self.resolution {
            Some(res) if have >= need => res,
            _ => {
                let err = CalibrationError::InsufficientData { have, need };
                self.record(LogEntry::failure("finish", err.to_string()));
                return Err(err);
            }
        };

        let object_points = vec![self.object_points.clone(); have];
        let image_points: Vec<Vec<Pt2>> = self
            .observations
            .iter()
            .map(|o| o.corners.clone())
            .collect();

        info!(
            "calibrating from {have} views at {}x{} ({:?} distortion)",
            resolution.0, resolution.1, self.options.solver.distortion
        );
        let solved = match calibrate_camera(
            &object_points,
            &image_points,
            resolution,
            &self.options.solver,
        ) {
            Ok(out) => out,
            Err(e) => {
                warn!("calibration failed: {e}");
                self.record(LogEntry::failure("finish", e.to_string()));
                return Err(e.into());
            }
        };

        let projection =
            projection_matrix(&solved.camera_matrix, &solved.rvecs[0], &solved.tvecs[0]);
        let (error, per_view_errors) = reprojection_error(
            &self.object_points,
            &image_points,
            &solved.camera_matrix,
            &solved.dist_coeffs,
            &solved.rvecs,
            &solved.tvecs,
        );

        info!("calibration finished, reprojection error {error:.5}");
        self.record(LogEntry::success_with_notes(
            "finish",
            format!("reprojection error {error:.5}, rms {:.4}px", solved.rms),
        ));

        Ok(CalibrationResult {
            image_width: resolution.0,
            image_height: resolution.1,
            camera_matrix: solved.camera_matrix,
            distortion_coefficients: solved.dist_coeffs,
            rectification_matrix: Mat3::identity(),
            projection_matrix: projection,
            reprojection_error: error,
            rms: solved.rms,
            per_view_errors,
        })
    }
}

use crate::types::ImageSize;
use camcal_optim::SolveError;
use thiserror::Error;

/// Failure to obtain a frame from an [`ImageSource`](crate::ImageSource).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network hiccup or undecodable payload; worth retrying.
    #[error("transient capture failure: {0}")]
    Transient(String),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image source exhausted")]
    Exhausted,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture unavailable after {attempts} attempts: {last_error}")]
    CaptureUnavailable { attempts: u32, last_error: String },
}

impl FetchError {
    /// Whether [`fetch_with_retry`](crate::fetch_with_retry) should try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_) | FetchError::Decode(_))
    }
}

/// Errors surfaced by [`CalibrationSession`](crate::CalibrationSession).
///
/// Everything except [`CalibrationError::InvalidTarget`] is recoverable: the
/// session is left unchanged and the caller may continue.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("invalid calibration target: {0}")]
    InvalidTarget(String),
    #[error("frame resolution {got:?} differs from the session resolution {expected:?}")]
    ResolutionMismatch { expected: ImageSize, got: ImageSize },
    #[error("expected {expected} corners, got {got}")]
    CornerCountMismatch { expected: usize, got: usize },
    #[error("no chessboard capture pending")]
    NoPendingCapture,
    #[error("not enough observations: have {have}, need {need}")]
    InsufficientData { have: usize, need: usize },
    #[error("calibration solve failed")]
    SolveFailed(#[from] SolveError),
    #[error(transparent)]
    Capture(#[from] FetchError),
}

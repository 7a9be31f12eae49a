//! Session bookkeeping types: observations, captures and the operation log.

use camcal_core::Pt2;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Image size as `(width, height)` in pixels.
pub type ImageSize = (u32, u32);

/// One accepted chessboard view.
///
/// Object points are shared by all observations of a session and live on the
/// session's target, so an observation only keeps its image corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub corners: Vec<Pt2>,
    pub image_size: ImageSize,
}

/// The most recent frame grabbed by
/// [`CalibrationSession::capture_and_detect`](crate::CalibrationSession::capture_and_detect).
#[derive(Debug, Clone)]
pub struct Capture {
    pub frame: DynamicImage,
    pub gray: GrayImage,
    /// Refined corners, `None` when no chessboard was found.
    pub corners: Option<Vec<Pt2>>,
}

impl Capture {
    pub fn found(&self) -> bool {
        self.corners.is_some()
    }

    pub fn image_size(&self) -> ImageSize {
        self.gray.dimensions()
    }
}

/// Result of a single capture attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    pub found: bool,
    pub corners: Option<Vec<Pt2>>,
    pub image_size: ImageSize,
}

/// Lightweight operation log entry.
///
/// Captures basic information about operations performed on a session.
/// Intended for debugging and audit trail, not for replay/undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unix timestamp of the operation (seconds since epoch).
    pub timestamp: u64,

    /// Operation name (e.g., "accept", "delete_last", "finish").
    pub operation: String,

    /// Whether the operation succeeded.
    pub success: bool,

    /// Optional notes or error message.
    pub notes: Option<String>,
}

impl LogEntry {
    pub fn success(operation: impl Into<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            operation: operation.into(),
            success: true,
            notes: None,
        }
    }

    pub fn success_with_notes(operation: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            operation: operation.into(),
            success: true,
            notes: Some(notes.into()),
        }
    }

    pub fn failure(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            timestamp: current_timestamp(),
            operation: operation.into(),
            success: false,
            notes: Some(error.into()),
        }
    }
}

//! File-level configuration for a calibration run.

use crate::session::{SessionOptions, DEFAULT_MIN_VIEWS};
use crate::source::{RetryPolicy, DEFAULT_SNAPSHOT_URL};
use crate::subpix::SubpixCriteria;
use crate::writer::{DistortionLabel, WriterOptions};
use camcal_optim::CalibrateOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    /// Per-request timeout.
    pub timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SNAPSHOT_URL.to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub camera_name: String,
    pub distortion_label: DistortionLabel,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let writer = WriterOptions::default();
        Self {
            dir: PathBuf::from("."),
            camera_name: writer.camera_name,
            distortion_label: writer.distortion_label,
        }
    }
}

impl OutputConfig {
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            camera_name: self.camera_name.clone(),
            distortion_label: self.distortion_label,
        }
    }
}

/// Everything a calibration run needs apart from the target itself.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub source: SourceConfig,
    pub retry: RetryPolicy,
    pub subpix: SubpixCriteria,
    pub solve: CalibrateOptions,
    pub output: OutputConfig,
    pub min_views: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            retry: RetryPolicy::default(),
            subpix: SubpixCriteria::default(),
            solve: CalibrateOptions::default(),
            output: OutputConfig::default(),
            min_views: DEFAULT_MIN_VIEWS,
        }
    }
}

impl CalibrationConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            min_views: self.min_views,
            subpix: self.subpix,
            retry: self.retry,
            solver: self.solve,
        }
    }
}

//! Camera-info YAML record (ROS `camera_calibration_parsers` layout).

use crate::result::CalibrationResult;
use camcal_core::{Mat3, Mat34, Real};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of distortion coefficients always written to the record.
pub const CAMERA_INFO_DIST_COEFFS: usize = 8;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{name} must be {rows}x{cols} with {} entries, got {got}", rows * cols)]
    Shape {
        name: &'static str,
        rows: usize,
        cols: usize,
        got: usize,
    },
}

/// Value written to `distortion_model`.
///
/// The solver estimates the rational model, but consumers of these files
/// have historically been handed `plumb_bob`, so that stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionLabel {
    #[default]
    PlumbBob,
    RationalPolynomial,
}

impl DistortionLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            DistortionLabel::PlumbBob => "plumb_bob",
            DistortionLabel::RationalPolynomial => "rational_polynomial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    pub camera_name: String,
    pub distortion_label: DistortionLabel,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            camera_name: "raspicam".to_string(),
            distortion_label: DistortionLabel::default(),
        }
    }
}

/// Row-major matrix block: `{rows, cols, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRecord {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Real>,
}

impl MatrixRecord {
    fn from_row_major(rows: usize, cols: usize, data: Vec<Real>) -> Self {
        Self { rows, cols, data }
    }

    fn check(&self, name: &'static str, rows: usize, cols: usize) -> Result<(), WriteError> {
        if self.rows != rows || self.cols != cols || self.data.len() != rows * cols {
            return Err(WriteError::Shape {
                name,
                rows,
                cols,
                got: self.data.len(),
            });
        }
        Ok(())
    }
}

/// On-disk calibration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub image_width: u32,
    pub image_height: u32,
    pub camera_name: String,
    pub camera_matrix: MatrixRecord,
    pub distortion_model: String,
    pub distortion_coefficients: MatrixRecord,
    pub rectification_matrix: MatrixRecord,
    pub projection_matrix: MatrixRecord,
}

/// Pad with zeros or truncate to exactly [`CAMERA_INFO_DIST_COEFFS`] entries.
pub fn fit_dist_coeffs(coeffs: &[Real]) -> Vec<Real> {
    let mut out: Vec<Real> = coeffs.iter().copied().take(CAMERA_INFO_DIST_COEFFS).collect();
    out.resize(CAMERA_INFO_DIST_COEFFS, 0.0);
    out
}

fn mat3_row_major(m: &Mat3) -> Vec<Real> {
    m.transpose().iter().copied().collect()
}

fn mat34_row_major(m: &Mat34) -> Vec<Real> {
    m.transpose().iter().copied().collect()
}

impl CameraInfo {
    pub fn from_result(result: &CalibrationResult, options: &WriterOptions) -> Self {
        Self {
            image_width: result.image_width,
            image_height: result.image_height,
            camera_name: options.camera_name.clone(),
            camera_matrix: MatrixRecord::from_row_major(
                3,
                3,
                mat3_row_major(&result.camera_matrix),
            ),
            distortion_model: options.distortion_label.as_str().to_string(),
            distortion_coefficients: MatrixRecord::from_row_major(
                1,
                CAMERA_INFO_DIST_COEFFS,
                fit_dist_coeffs(&result.distortion_coefficients),
            ),
            rectification_matrix: MatrixRecord::from_row_major(
                3,
                3,
                mat3_row_major(&result.rectification_matrix),
            ),
            projection_matrix: MatrixRecord::from_row_major(
                3,
                4,
                mat34_row_major(&result.projection_matrix),
            ),
        }
    }

    /// Check every block has the shape the format prescribes.
    pub fn validate(&self) -> Result<(), WriteError> {
        self.camera_matrix.check("camera_matrix", 3, 3)?;
        self.distortion_coefficients
            .check("distortion_coefficients", 1, CAMERA_INFO_DIST_COEFFS)?;
        self.rectification_matrix.check("rectification_matrix", 3, 3)?;
        self.projection_matrix.check("projection_matrix", 3, 4)?;
        Ok(())
    }

    pub fn camera_matrix(&self) -> Mat3 {
        Mat3::from_row_slice(&self.camera_matrix.data)
    }

    pub fn rectification_matrix(&self) -> Mat3 {
        Mat3::from_row_slice(&self.rectification_matrix.data)
    }

    pub fn projection_matrix(&self) -> Mat34 {
        Mat34::from_row_slice(&self.projection_matrix.data)
    }

    pub fn dist_coeffs(&self) -> &[Real] {
        &self.distortion_coefficients.data
    }

    pub fn to_yaml(&self) -> Result<String, WriteError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self, WriteError> {
        let info: CameraInfo = serde_yaml::from_str(text)?;
        info.validate()?;
        Ok(info)
    }
}

/// `camera_info_{width}x{height}.yaml`
pub fn camera_info_file_name(width: u32, height: u32) -> String {
    format!("camera_info_{width}x{height}.yaml")
}

/// Write the record for `result` into `dir`; returns the file path.
pub fn write_camera_info(
    result: &CalibrationResult,
    dir: impl AsRef<Path>,
    options: &WriterOptions,
) -> Result<PathBuf, WriteError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|source| WriteError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(camera_info_file_name(result.image_width, result.image_height));
    let yaml = CameraInfo::from_result(result, options).to_yaml()?;
    std::fs::write(&path, yaml).map_err(|source| WriteError::Io {
        path: path.clone(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(path)
}

pub fn read_camera_info(path: impl AsRef<Path>) -> Result<CameraInfo, WriteError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    CameraInfo::from_yaml(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(coeffs: Vec<Real>) -> CalibrationResult {
        CalibrationResult {
            image_width: 640,
            image_height: 480,
            camera_matrix: Mat3::new(612.5, 0.0, 318.25, 0.0, 608.125, 243.5, 0.0, 0.0, 1.0),
            distortion_coefficients: coeffs,
            rectification_matrix: Mat3::identity(),
            projection_matrix: Mat34::new(
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
            ),
            reprojection_error: 0.01,
            rms: 0.2,
            per_view_errors: vec![0.01],
        }
    }

    #[test]
    fn coefficients_are_padded_or_truncated_to_eight() {
        assert_eq!(fit_dist_coeffs(&[1.0, 2.0]), vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let long: Vec<Real> = (0..14).map(|v| v as Real).collect();
        assert_eq!(fit_dist_coeffs(&long), long[..8].to_vec());
    }

    #[test]
    fn matrices_are_row_major() {
        let info = CameraInfo::from_result(&sample_result(vec![0.0; 5]), &WriterOptions::default());
        assert_eq!(info.camera_matrix.data[2], 318.25);
        assert_eq!(info.camera_matrix.data[3], 0.0);
        assert_eq!(
            info.projection_matrix.data,
            (1..=12).map(|v| v as Real).collect::<Vec<_>>()
        );
        assert_eq!(
            info.rectification_matrix.data,
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(info.distortion_model, "plumb_bob");
        assert_eq!(info.camera_name, "raspicam");
        assert_eq!(info.distortion_coefficients.cols, 8);
    }

    #[test]
    fn written_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result(vec![-0.1, 0.01, 1e-4, -2e-4, 0.0, 0.3, -0.02, 0.001]);
        let opts = WriterOptions {
            camera_name: "front".into(),
            distortion_label: DistortionLabel::RationalPolynomial,
        };
        let path = write_camera_info(&result, dir.path(), &opts).unwrap();
        assert!(path.ends_with("camera_info_640x480.yaml"));

        let info = read_camera_info(&path).unwrap();
        assert_eq!(info.image_width, 640);
        assert_eq!(info.image_height, 480);
        assert_eq!(info.camera_matrix(), result.camera_matrix);
        assert_eq!(info.projection_matrix(), result.projection_matrix);
        assert_eq!(info.rectification_matrix(), Mat3::identity());
        assert_eq!(info.dist_coeffs(), &result.distortion_coefficients[..]);
        assert_eq!(info.distortion_model, "rational_polynomial");
    }

    #[test]
    fn malformed_records_are_rejected() {
        let info = CameraInfo::from_result(&sample_result(vec![0.0; 8]), &WriterOptions::default());
        let mut yaml: serde_yaml::Value = serde_yaml::to_value(&info).unwrap();
        yaml["camera_matrix"]["data"] = serde_yaml::to_value(vec![1.0, 2.0]).unwrap();
        let text = serde_yaml::to_string(&yaml).unwrap();
        assert!(matches!(
            CameraInfo::from_yaml(&text),
            Err(WriteError::Shape { name: "camera_matrix", .. })
        ));
    }
}

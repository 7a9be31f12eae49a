//! Chessboard corner detection.
//!
//! Detection itself is pluggable through [`ChessboardDetector`]. With the
//! `detect` feature an adapter over the `calib-targets` ChESS chessboard
//! detector is available as [`CalibTargetsDetector`].

use camcal_core::Pt2;
use image::GrayImage;

/// Finds the inner corners of a `(width, height)` chessboard.
///
/// Implementations return exactly `width * height` corners ordered with the
/// width index varying fastest, or `None` when the full board is not visible.
pub trait ChessboardDetector {
    fn detect(&self, gray: &GrayImage, pattern_size: (u32, u32)) -> Option<Vec<Pt2>>;
}

impl<F> ChessboardDetector for F
where
    F: Fn(&GrayImage, (u32, u32)) -> Option<Vec<Pt2>>,
{
    fn detect(&self, gray: &GrayImage, pattern_size: (u32, u32)) -> Option<Vec<Pt2>> {
        self(gray, pattern_size)
    }
}

/// Arrange grid-labelled corners `(i, j, position)` into row-major order.
///
/// Labels may start at any offset and the detector may report the board
/// transposed; both are normalized. Returns `None` unless every one of the
/// `width * height` cells is present exactly once.
pub fn order_grid_corners(
    labelled: &[(i64, i64, Pt2)],
    (width, height): (u32, u32),
) -> Option<Vec<Pt2>> {
    let (w, h) = (width as i64, height as i64);
    if labelled.len() != (w * h) as usize {
        return None;
    }
    let min_i = labelled.iter().map(|c| c.0).min()?;
    let min_j = labelled.iter().map(|c| c.1).min()?;
    let span_i = labelled.iter().map(|c| c.0).max()? - min_i + 1;
    let span_j = labelled.iter().map(|c| c.1).max()? - min_j + 1;

    let transpose = if (span_i, span_j) == (w, h) {
        false
    } else if (span_i, span_j) == (h, w) {
        true
    } else {
        return None;
    };

    let mut slots: Vec<Option<Pt2>> = vec![None; labelled.len()];
    for &(i, j, p) in labelled {
        let (x, y) = if transpose {
            (j - min_j, i - min_i)
        } else {
            (i - min_i, j - min_j)
        };
        let slot = slots.get_mut((y * w + x) as usize)?;
        if slot.replace(p).is_some() {
            return None;
        }
    }
    slots.into_iter().collect()
}

#[cfg(feature = "detect")]
pub use self::calib_targets_adapter::CalibTargetsDetector;

#[cfg(feature = "detect")]
mod calib_targets_adapter {
    use super::{order_grid_corners, ChessboardDetector};
    use calib_targets::{detect, ChessboardParams};
    use camcal_core::Pt2;
    use chess_corners::ChessConfig;
    use image::GrayImage;
    use log::debug;

    /// ChESS corner detector + chessboard grid assembly from `calib-targets`.
    #[derive(Default)]
    pub struct CalibTargetsDetector {
        pub chess: ChessConfig,
    }

    impl ChessboardDetector for CalibTargetsDetector {
        fn detect(&self, gray: &GrayImage, (width, height): (u32, u32)) -> Option<Vec<Pt2>> {
            let params = ChessboardParams {
                expected_rows: Some(height),
                expected_cols: Some(width),
                ..ChessboardParams::default()
            };
            let detection = detect::detect_chessboard(gray, &self.chess, params)?;

            let labelled: Vec<(i64, i64, Pt2)> = detection
                .detection
                .corners
                .iter()
                .filter_map(|corner| {
                    let grid = corner.grid.as_ref()?;
                    Some((
                        grid.i as i64,
                        grid.j as i64,
                        Pt2::new(corner.position.x as f64, corner.position.y as f64),
                    ))
                })
                .collect();
            debug!("chessboard detector labelled {} corners", labelled.len());
            order_grid_corners(&labelled, (width, height))
        }
    }
}

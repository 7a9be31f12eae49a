//! Offline calibration from a directory of saved photos.

use anyhow::{bail, Context, Result};
use camcal_pipeline::{
    CalibrationError, CalibrationResult, CalibrationSession, CalibrationTarget, ChessboardDetector,
    DirectorySource, FetchError, ImageSource, SessionOptions,
};
use log::{info, warn};
use std::path::Path;

/// Detect the board in every image of `dir` and calibrate from the hits.
///
/// Images without a board, unreadable files and frames at a resolution
/// other than the first accepted one are skipped with a warning.
pub fn calibrate_directory<D>(
    dir: &Path,
    target: CalibrationTarget,
    options: SessionOptions,
    detector: &D,
) -> Result<CalibrationResult>
where
    D: ChessboardDetector + ?Sized,
{
    let mut source =
        DirectorySource::open(dir).with_context(|| format!("listing {}", dir.display()))?;
    if source.is_empty() {
        bail!("no jpg/png images in {}", dir.display());
    }
    info!("calibrating from {} images in {}", source.len(), dir.display());

    let mut session = CalibrationSession::with_options(target, options)?;
    loop {
        let frame = match source.fetch_frame() {
            Ok(frame) => frame,
            Err(FetchError::Exhausted) => break,
            Err(e) => {
                warn!("skipping unreadable image: {e}");
                continue;
            }
        };
        let name = source
            .current_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        if !session.detect_frame(frame, detector).found {
            warn!("{name}: chessboard not found");
            continue;
        }
        match session.accept_last_capture() {
            Ok(count) => info!("{name}: accepted ({count})"),
            Err(e @ CalibrationError::ResolutionMismatch { .. }) => warn!("{name}: {e}"),
            Err(e) => return Err(e.into()),
        }
    }

    if session.observation_count() == 0 {
        bail!("chessboard not found in any image of {}", dir.display());
    }
    session.finish().context("calibration failed")
}

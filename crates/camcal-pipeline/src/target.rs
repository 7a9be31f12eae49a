use crate::error::CalibrationError;
use camcal_core::{Pt3, Real};
use serde::{Deserialize, Serialize};

/// Chessboard geometry: inner-corner counts and square size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTarget {
    /// Inner corners along the board X axis.
    pub pattern_width: u32,
    /// Inner corners along the board Y axis.
    pub pattern_height: u32,
    /// Edge length of one square, in the unit the translations are reported in.
    pub square_size: Real,
}

impl CalibrationTarget {
    pub fn new(
        pattern_width: u32,
        pattern_height: u32,
        square_size: Real,
    ) -> Result<Self, CalibrationError> {
        let target = Self {
            pattern_width,
            pattern_height,
            square_size,
        };
        target.validate()?;
        Ok(target)
    }

    /// Targets deserialized from config bypass [`CalibrationTarget::new`].
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.pattern_width < 2 || self.pattern_height < 2 {
            return Err(CalibrationError::InvalidTarget(format!(
                "pattern must be at least 2x2 inner corners, got {}x{}",
                self.pattern_width, self.pattern_height
            )));
        }
        if !(self.square_size.is_finite() && self.square_size > 0.0) {
            return Err(CalibrationError::InvalidTarget(format!(
                "square size must be positive, got {}",
                self.square_size
            )));
        }
        Ok(())
    }

    /// `(width, height)` as passed to the chessboard detector.
    pub fn pattern_size(&self) -> (u32, u32) {
        (self.pattern_width, self.pattern_height)
    }

    pub fn corner_count(&self) -> usize {
        self.pattern_width as usize * self.pattern_height as usize
    }

    /// Board-frame corner coordinates on the z = 0 plane.
    ///
    /// The width index varies fastest: `(0,0), (s,0), .., (0,s), ..`, the same
    /// order detectors report corners in.
    pub fn object_points(&self) -> Vec<Pt3> {
        let s = self.square_size;
        (0..self.pattern_height)
            .flat_map(|j| {
                (0..self.pattern_width).map(move |i| Pt3::new(i as Real * s, j as Real * s, 0.0))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_points_vary_width_fastest() {
        let t = CalibrationTarget::new(3, 2, 25.0).unwrap();
        let pts = t.object_points();
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[1], Pt3::new(25.0, 0.0, 0.0));
        assert_eq!(pts[2], Pt3::new(50.0, 0.0, 0.0));
        assert_eq!(pts[3], Pt3::new(0.0, 25.0, 0.0));
        assert!(pts.iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn invalid_targets_fail_fast() {
        for (w, h, s) in [
            (1, 6, 25.0),
            (9, 0, 25.0),
            (9, 6, 0.0),
            (9, 6, -1.0),
            (9, 6, f64::NAN),
        ] {
            assert!(
                matches!(
                    CalibrationTarget::new(w, h, s),
                    Err(CalibrationError::InvalidTarget(_))
                ),
                "({w}, {h}, {s}) accepted"
            );
        }
    }
}

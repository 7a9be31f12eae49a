//! Deterministic synthetic data generation helpers.
//!
//! Building blocks for synthetic chessboard calibration problems used in
//! tests across the workspace:
//! - planar target point grids,
//! - pose generators that keep the board in front of the camera,
//! - projection helpers producing per-view pixel lists.
//!
//! # Example
//!
//! ```
//! use camcal_core::{synthetic::planar, Camera, FxFyCxCySkew, RationalDistortion};
//!
//! let k = FxFyCxCySkew { fx: 800.0, fy: 800.0, cx: 320.0, cy: 240.0, skew: 0.0 };
//! let cam = Camera::new(k, RationalDistortion::default());
//!
//! let board = planar::grid_points(9, 6, 25.0);
//! let poses = planar::varied_poses(5, 500.0);
//! let views = planar::project_views_all(&cam, &board, &poses).unwrap();
//! assert_eq!(views.len(), 5);
//! ```

pub mod planar;

//! Core math and geometry primitives for `camcal`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...) and Rodrigues
//!   conversions,
//! - the pinhole camera model with rational lens distortion,
//! - deterministic synthetic chessboard data for tests.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ (x / z, y / z)`

/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion utilities.
pub mod models;
/// Synthetic planar targets and poses.
pub mod synthetic;

pub use math::*;
pub use models::*;

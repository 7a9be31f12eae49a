//! Basic example of a calibration session on synthetic chessboard views.
//!
//! This example shows:
//! - Starting a session for a 9x6 board
//! - Accepting views until the session is ready
//! - Finishing the calibration
//! - Writing the camera-info YAML record
//!
//! Run with: cargo run --example session_basic

use camcal_core::{synthetic::planar, Camera, FxFyCxCySkew, RationalDistortion};
use camcal_pipeline::{write_camera_info, CalibrationSession, CalibrationTarget, WriterOptions};

fn main() -> anyhow::Result<()> {
    println!("=== Calibration session example ===\n");

    let k = FxFyCxCySkew {
        fx: 612.0,
        fy: 608.0,
        cx: 318.0,
        cy: 243.0,
        skew: 0.0,
    };
    let dist = RationalDistortion {
        k1: -0.08,
        k2: 0.02,
        ..Default::default()
    };
    let camera = Camera::new(k, dist);

    let target = CalibrationTarget::new(9, 6, 25.0)?;
    let mut session = CalibrationSession::start(target)?;
    println!("Session started, {} views needed", session.amount_left());

    let poses = planar::varied_poses(session.min_views(), 550.0);
    let views = planar::project_views_all(&camera, target.object_points().as_slice(), &poses)
        .ok_or_else(|| anyhow::anyhow!("board left the image"))?;
    for corners in views {
        session.accept(corners, (640, 480))?;
    }
    println!("Accepted {} views", session.observation_count());

    let result = session.finish()?;
    let km = result.camera_matrix;
    println!(
        "fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
        km[(0, 0)],
        km[(1, 1)],
        km[(0, 2)],
        km[(1, 2)]
    );
    println!("distortion: {:?}", result.distortion_coefficients);
    println!("reprojection error: {:.2e}", result.reprojection_error);

    let dir = std::env::temp_dir();
    let path = write_camera_info(&result, &dir, &WriterOptions::default())?;
    println!("\nWrote {}", path.display());
    Ok(())
}

//! Synthetic chessboard calibration: generate noise-free views from a known
//! camera and check the solver recovers it.

use approx::assert_relative_eq;
use camcal_core::{synthetic::planar, Camera, FxFyCxCySkew, Pt2, RationalDistortion, Real};
use camcal_optim::{calibrate_camera, project_points, CalibrateOptions, DistortionKind};

fn ground_truth_k() -> FxFyCxCySkew<Real> {
    FxFyCxCySkew {
        fx: 612.0,
        fy: 608.0,
        cx: 318.0,
        cy: 243.0,
        skew: 0.0,
    }
}

fn synthetic_views(
    dist: RationalDistortion<Real>,
    n_views: usize,
) -> (Vec<Vec<camcal_core::Pt3>>, Vec<Vec<Pt2>>) {
    let cam = Camera::new(ground_truth_k(), dist);
    let board = planar::grid_points(9, 6, 25.0);
    let poses = planar::varied_poses(n_views, 550.0);
    let images = planar::project_views_all(&cam, &board, &poses).unwrap();
    (vec![board; n_views], images)
}

#[test]
fn recovers_pinhole_camera_without_distortion() {
    let (obj, img) = synthetic_views(RationalDistortion::default(), 25);
    let out = calibrate_camera(&obj, &img, (640, 480), &CalibrateOptions::default()).unwrap();

    let k = ground_truth_k().k_matrix();
    assert_relative_eq!(out.camera_matrix, k, epsilon = 1e-3);
    assert_eq!(out.dist_coeffs.len(), 8);
    for c in &out.dist_coeffs {
        assert!(c.abs() < 1e-5, "coeffs = {:?}", out.dist_coeffs);
    }
    assert!(out.rms < 1e-6, "rms = {}", out.rms);
    assert_eq!(out.rvecs.len(), 25);
    assert_eq!(out.tvecs.len(), 25);
}

#[test]
fn recovers_basic_distortion() {
    let dist = RationalDistortion {
        k1: -0.12,
        k2: 0.03,
        p1: 1e-3,
        p2: -8e-4,
        ..Default::default()
    };
    let (obj, img) = synthetic_views(dist, 15);
    let opts = CalibrateOptions {
        distortion: DistortionKind::Basic,
        ..Default::default()
    };
    let out = calibrate_camera(&obj, &img, (640, 480), &opts).unwrap();

    assert_eq!(out.dist_coeffs.len(), 5);
    assert!((out.dist_coeffs[0] - dist.k1).abs() < 1e-4, "{:?}", out.dist_coeffs);
    assert!((out.dist_coeffs[2] - dist.p1).abs() < 1e-5, "{:?}", out.dist_coeffs);
    assert!((out.dist_coeffs[3] - dist.p2).abs() < 1e-5, "{:?}", out.dist_coeffs);
    assert!((out.camera_matrix[(0, 0)] - 612.0).abs() < 0.1);
    assert!(out.rms < 1e-4, "rms = {}", out.rms);
}

#[test]
fn rational_model_fits_wide_angle_distortion() {
    let dist = RationalDistortion {
        k1: 0.3,
        k2: -0.05,
        k4: 0.6,
        k5: 0.02,
        ..Default::default()
    };
    let (obj, img) = synthetic_views(dist, 25);
    let out = calibrate_camera(&obj, &img, (640, 480), &CalibrateOptions::default()).unwrap();

    assert_eq!(out.dist_coeffs.len(), 8);
    assert!(out.rms < 1e-3, "rms = {}", out.rms);
    assert!((out.camera_matrix[(0, 2)] - 318.0).abs() < 2.0);
    assert!((out.camera_matrix[(1, 2)] - 243.0).abs() < 2.0);

    // The solved model must reproduce the observations.
    let pred = project_points(
        &obj[0],
        &out.rvecs[0],
        &out.tvecs[0],
        &out.camera_matrix,
        &out.dist_coeffs,
    );
    for (p, o) in pred.iter().zip(&img[0]) {
        assert!((p - o).norm() < 1e-2);
    }
}

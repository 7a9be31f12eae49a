//! End-to-end planar camera calibration: closed-form initialisation followed
//! by joint Levenberg–Marquardt refinement.

use crate::backend_lm::LmBackend;
use crate::planar_intrinsics::{
    refine_planar_intrinsics, DistortionKind, PlanarEstimate, PlanarIntrinsicsProblem,
    PlanarViewObservations,
};
use crate::{NllsProblem, SolveOptions, SolveReport};
use camcal_core::{
    rvec_tvec_from_iso, Camera, FxFyCxCySkew, Mat3, Pt2, Pt3, RationalDistortion, Real, Vec3,
};
use camcal_linear::{
    dlt_homography, estimate_intrinsics_from_homographies, estimate_planar_pose_from_h,
    HomographyError, IntrinsicsInitError, PlanarPoseError,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fewest views for which Zhang's closed-form solution is determined.
pub const MIN_SOLVER_VIEWS: usize = 3;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("need at least {min} views, got {got}")]
    NotEnoughViews { got: usize, min: usize },
    #[error("object/image view count mismatch: {object} vs {image}")]
    ViewCountMismatch { object: usize, image: usize },
    #[error("view {view}: {object} object points vs {image} image points")]
    PointCountMismatch {
        view: usize,
        object: usize,
        image: usize,
    },
    #[error("view {view}: object points are not on the z = 0 plane")]
    NonPlanarTarget { view: usize },
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("view {view}: homography estimation failed")]
    Homography {
        view: usize,
        #[source]
        source: HomographyError,
    },
    #[error("intrinsics initialisation failed")]
    Intrinsics(#[from] IntrinsicsInitError),
    #[error("view {view}: pose initialisation failed")]
    Pose {
        view: usize,
        #[source]
        source: PlanarPoseError,
    },
    #[error("solver produced a non-finite solution ({0})")]
    Diverged(String),
}

/// Options for [`calibrate_camera`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrateOptions {
    pub distortion: DistortionKind,
    #[serde(flatten)]
    pub solve: SolveOptions,
}

/// Solved camera model and per-view extrinsics.
#[derive(Debug, Clone)]
pub struct CalibrationOutput {
    pub camera_matrix: Mat3,
    /// `k1 k2 p1 p2 k3 [k4 k5 k6]`, length set by the distortion model.
    pub dist_coeffs: Vec<Real>,
    pub rvecs: Vec<Vec3>,
    pub tvecs: Vec<Vec3>,
    /// Root mean square reprojection error over all points, in pixels.
    pub rms: Real,
    pub report: SolveReport,
}

/// Calibrate a pinhole camera with lens distortion from planar target views.
///
/// `object_points[i]` and `image_points[i]` are the corresponding board
/// points (z = 0) and pixels of view `i`.
pub fn calibrate_camera(
    object_points: &[Vec<Pt3>],
    image_points: &[Vec<Pt2>],
    image_size: (u32, u32),
    opts: &CalibrateOptions,
) -> Result<CalibrationOutput, SolveError> {
    let views = collect_views(object_points, image_points, image_size)?;
    let initial = initial_estimate(&views, image_size)?;
    debug!(
        "initial intrinsics: fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
        initial.camera.k.fx, initial.camera.k.fy, initial.camera.k.cx, initial.camera.k.cy
    );

    let problem = PlanarIntrinsicsProblem::new(views, opts.distortion);
    let (estimate, report) = refine_planar_intrinsics(&LmBackend, &problem, &initial, &opts.solve);

    let residuals = problem.residuals(&problem.pack(&estimate));
    let n_points = (problem.residual_dim() / 2).max(1);
    let rms = (residuals.norm_squared() / n_points as Real).sqrt();
    if !rms.is_finite() {
        return Err(SolveError::Diverged(report.termination));
    }
    if !report.converged {
        warn!("calibration solver stopped early: {}", report.termination);
    }

    let nd = opts.distortion.num_coeffs();
    let dist_coeffs = estimate.camera.dist.coeffs()[..nd].to_vec();
    info!(
        "calibrated {} views: fx={:.2} fy={:.2} cx={:.2} cy={:.2} rms={:.4}px",
        estimate.rvecs.len(),
        estimate.camera.k.fx,
        estimate.camera.k.fy,
        estimate.camera.k.cx,
        estimate.camera.k.cy,
        rms
    );

    Ok(CalibrationOutput {
        camera_matrix: estimate.camera.k.k_matrix(),
        dist_coeffs,
        rvecs: estimate.rvecs,
        tvecs: estimate.tvecs,
        rms,
        report,
    })
}

fn collect_views(
    object_points: &[Vec<Pt3>],
    image_points: &[Vec<Pt2>],
    (width, height): (u32, u32),
) -> Result<Vec<PlanarViewObservations>, SolveError> {
    if width == 0 || height == 0 {
        return Err(SolveError::InvalidImageSize { width, height });
    }
    if object_points.len() != image_points.len() {
        return Err(SolveError::ViewCountMismatch {
            object: object_points.len(),
            image: image_points.len(),
        });
    }
    if object_points.len() < MIN_SOLVER_VIEWS {
        return Err(SolveError::NotEnoughViews {
            got: object_points.len(),
            min: MIN_SOLVER_VIEWS,
        });
    }

    object_points
        .iter()
        .zip(image_points)
        .enumerate()
        .map(|(view, (obj, img))| {
            if obj.len() != img.len() {
                return Err(SolveError::PointCountMismatch {
                    view,
                    object: obj.len(),
                    image: img.len(),
                });
            }
            if obj.iter().any(|p| p.z.abs() > 1e-9) {
                return Err(SolveError::NonPlanarTarget { view });
            }
            Ok(PlanarViewObservations {
                points_3d: obj.clone(),
                points_2d: img.clone(),
            })
        })
        .collect()
}

/// Zhang initialisation: per-view homographies, closed-form K, then poses.
fn initial_estimate(
    views: &[PlanarViewObservations],
    (width, height): (u32, u32),
) -> Result<PlanarEstimate, SolveError> {
    let homographies = views
        .iter()
        .enumerate()
        .map(|(view, obs)| {
            let plane: Vec<Pt2> = obs.points_3d.iter().map(|p| Pt2::new(p.x, p.y)).collect();
            dlt_homography(&plane, &obs.points_2d)
                .map_err(|source| SolveError::Homography { view, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut k = estimate_intrinsics_from_homographies(&homographies)?;
    k.skew = 0.0;

    let (w, h) = (width as Real, height as Real);
    if !(0.0..=w).contains(&k.cx) || !(0.0..=h).contains(&k.cy) {
        warn!(
            "closed-form principal point ({:.1}, {:.1}) outside the image, using the image centre",
            k.cx, k.cy
        );
        k.cx = 0.5 * w;
        k.cy = 0.5 * h;
    }

    let kmtx = k.k_matrix();
    let (rvecs, tvecs): (Vec<Vec3>, Vec<Vec3>) = homographies
        .iter()
        .enumerate()
        .map(|(view, hmtx)| {
            estimate_planar_pose_from_h(&kmtx, hmtx)
                .map(|iso| rvec_tvec_from_iso(&iso))
                .map_err(|source| SolveError::Pose { view, source })
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .unzip();

    Ok(PlanarEstimate {
        camera: Camera::new(k, RationalDistortion::default()),
        rvecs,
        tvecs,
    })
}

/// Project board points through a pose, intrinsics and distortion.
///
/// `dist_coeffs` uses `k1 k2 p1 p2 k3 k4 k5 k6` order; shorter lists are
/// zero-padded. Points behind the camera project to NaN.
pub fn project_points(
    object_points: &[Pt3],
    rvec: &Vec3,
    tvec: &Vec3,
    camera_matrix: &Mat3,
    dist_coeffs: &[Real],
) -> Vec<Pt2> {
    let camera = Camera::new(
        FxFyCxCySkew::from_k_matrix(camera_matrix),
        RationalDistortion::from_coeffs(dist_coeffs),
    );
    camera
        .project_with_pose(rvec, tvec, object_points)
        .into_iter()
        .map(|px| px.map_or(Pt2::new(Real::NAN, Real::NAN), Pt2::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcal_core::synthetic::planar;

    #[test]
    fn rejects_too_few_views() {
        let board = planar::grid_points(4, 3, 1.0);
        let img = vec![Pt2::new(0.0, 0.0); board.len()];
        let err = calibrate_camera(
            &[board.clone(), board],
            &[img.clone(), img],
            (640, 480),
            &CalibrateOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::NotEnoughViews { got: 2, min: 3 }));
    }

    #[test]
    fn rejects_mismatched_point_counts() {
        let board = planar::grid_points(4, 3, 1.0);
        let img = vec![Pt2::new(0.0, 0.0); board.len() - 1];
        let err = calibrate_camera(
            &vec![board; 3],
            &vec![img; 3],
            (640, 480),
            &CalibrateOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::PointCountMismatch { view: 0, .. }));
    }

    #[test]
    fn rejects_non_planar_points() {
        let mut board = planar::grid_points(4, 3, 1.0);
        board[5].z = 0.5;
        let img = vec![Pt2::new(0.0, 0.0); board.len()];
        let err = calibrate_camera(
            &vec![board; 3],
            &vec![img; 3],
            (640, 480),
            &CalibrateOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::NonPlanarTarget { view: 0 }));
    }

    #[test]
    fn degenerate_views_fail_instead_of_panicking() {
        let board = planar::grid_points(4, 3, 1.0);
        let img = vec![Pt2::new(10.0, 10.0); board.len()];
        let result = calibrate_camera(
            &vec![board; 3],
            &vec![img; 3],
            (640, 480),
            &CalibrateOptions::default(),
        );
        assert!(matches!(result, Err(SolveError::Homography { view: 0, .. })));
    }

    #[test]
    fn project_points_matches_pinhole_without_distortion() {
        let k = Mat3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0);
        let pts = [Pt3::new(0.1, -0.2, 0.0), Pt3::new(0.0, 0.0, 0.0)];
        let out = project_points(&pts, &Vec3::zeros(), &Vec3::new(0.0, 0.0, 2.0), &k, &[]);
        assert!((out[0] - Pt2::new(345.0, 190.0)).norm() < 1e-12);
        assert!((out[1] - Pt2::new(320.0, 240.0)).norm() < 1e-12);
    }
}

//! Joint refinement of intrinsics, lens distortion and per-view board poses.
//!
//! Parameter layout:
//!
//! ```text
//! [fx, fy, cx, cy, d_0 .. d_{m-1}, (rx, ry, rz, tx, ty, tz) per view]
//! ```
//!
//! where `m` is 8 for [`DistortionKind::Rational`] (`k1 k2 p1 p2 k3 k4 k5 k6`)
//! and 5 for [`DistortionKind::Basic`] (`k1 k2 p1 p2 k3`). Skew is fixed at 0.

use crate::traits::fd_step;
use crate::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
use camcal_core::{
    rodrigues_to_matrix, Camera, FxFyCxCySkew, PinholeCamera, Pt2, Pt3, RationalDistortion, Real,
    Vec3,
};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

const INTRINSICS_DIM: usize = 4;
const POSE_DIM: usize = 6;

/// Residual assigned to a point that ends up behind the camera.
const BEHIND_CAMERA_RESIDUAL: Real = 1e4;

/// Lens distortion model estimated by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionKind {
    /// Five coefficients `k1 k2 p1 p2 k3`.
    Basic,
    /// Eight coefficients `k1 k2 p1 p2 k3 k4 k5 k6`.
    #[default]
    Rational,
}

impl DistortionKind {
    pub fn num_coeffs(self) -> usize {
        match self {
            DistortionKind::Basic => 5,
            DistortionKind::Rational => 8,
        }
    }
}

/// Observations for a single image/view of the planar target.
#[derive(Debug, Clone)]
pub struct PlanarViewObservations {
    /// 3D points in board coordinates (z = 0).
    pub points_3d: Vec<Pt3>,
    /// Corresponding detected image points (pixels).
    pub points_2d: Vec<Pt2>,
}

impl PlanarViewObservations {
    pub fn len(&self) -> usize {
        self.points_3d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_3d.is_empty()
    }
}

/// Initial / refined state of the planar calibration problem.
#[derive(Debug, Clone)]
pub struct PlanarEstimate {
    pub camera: PinholeCamera,
    pub rvecs: Vec<Vec3>,
    pub tvecs: Vec<Vec3>,
}

/// Non-linear refinement problem for planar intrinsics (and per-view poses).
#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsProblem {
    pub views: Vec<PlanarViewObservations>,
    pub distortion: DistortionKind,
}

impl PlanarIntrinsicsProblem {
    pub fn new(views: Vec<PlanarViewObservations>, distortion: DistortionKind) -> Self {
        Self { views, distortion }
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    fn pose_offset(&self, view: usize) -> usize {
        INTRINSICS_DIM + self.distortion.num_coeffs() + POSE_DIM * view
    }

    pub fn param_dim(&self) -> usize {
        self.pose_offset(self.num_views())
    }

    pub fn residual_dim(&self) -> usize {
        self.views.iter().map(|v| 2 * v.len()).sum()
    }

    /// Pack an estimate into the parameter vector.
    pub fn pack(&self, estimate: &PlanarEstimate) -> DVector<Real> {
        let mut x = DVector::zeros(self.param_dim());
        let k = &estimate.camera.k;
        x[0] = k.fx;
        x[1] = k.fy;
        x[2] = k.cx;
        x[3] = k.cy;

        let coeffs = estimate.camera.dist.coeffs();
        let nd = self.distortion.num_coeffs();
        x.rows_mut(INTRINSICS_DIM, nd)
            .copy_from_slice(&coeffs[..nd]);

        for (i, (r, t)) in estimate.rvecs.iter().zip(&estimate.tvecs).enumerate() {
            let idx = self.pose_offset(i);
            x.fixed_rows_mut::<3>(idx).copy_from(r);
            x.fixed_rows_mut::<3>(idx + 3).copy_from(t);
        }
        x
    }

    /// Decode the parameter vector into camera + per-view poses.
    pub fn decode(&self, x: &DVector<Real>) -> PlanarEstimate {
        let camera = self.decode_camera(x);
        let (rvecs, tvecs): (Vec<Vec3>, Vec<Vec3>) = (0..self.num_views())
            .map(|i| self.decode_pose(x, i))
            .unzip();
        PlanarEstimate {
            camera,
            rvecs,
            tvecs,
        }
    }

    fn decode_camera(&self, x: &DVector<Real>) -> PinholeCamera {
        let k = FxFyCxCySkew {
            fx: x[0],
            fy: x[1],
            cx: x[2],
            cy: x[3],
            skew: 0.0,
        };
        let nd = self.distortion.num_coeffs();
        let coeffs: Vec<Real> = x.rows(INTRINSICS_DIM, nd).iter().copied().collect();
        Camera::new(k, RationalDistortion::from_coeffs(&coeffs))
    }

    fn decode_pose(&self, x: &DVector<Real>, view: usize) -> (Vec3, Vec3) {
        let idx = self.pose_offset(view);
        (
            x.fixed_rows::<3>(idx).into_owned(),
            x.fixed_rows::<3>(idx + 3).into_owned(),
        )
    }

    /// Residuals (`observed − predicted`) of one view, written into `out`.
    fn view_residuals(
        &self,
        camera: &PinholeCamera,
        rvec: &Vec3,
        tvec: &Vec3,
        view: &PlanarViewObservations,
        out: &mut [Real],
    ) {
        let rot = rodrigues_to_matrix(rvec);
        for (j, (pw, meas)) in view.points_3d.iter().zip(&view.points_2d).enumerate() {
            let pc = rot * pw.coords + tvec;
            match camera.project_point_c(&pc) {
                Some(px) => {
                    out[2 * j] = meas.x - px.x;
                    out[2 * j + 1] = meas.y - px.y;
                }
                None => {
                    out[2 * j] = BEHIND_CAMERA_RESIDUAL;
                    out[2 * j + 1] = BEHIND_CAMERA_RESIDUAL;
                }
            }
        }
    }

    fn view_row_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.views.len());
        let mut acc = 0;
        for v in &self.views {
            offsets.push(acc);
            acc += 2 * v.len();
        }
        offsets
    }
}

impl NllsProblem for PlanarIntrinsicsProblem {
    fn num_params(&self) -> usize {
        self.param_dim()
    }

    fn num_residuals(&self) -> usize {
        self.residual_dim()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let camera = self.decode_camera(x);
        let mut r = DVector::zeros(self.residual_dim());
        let mut offset = 0;
        for (i, view) in self.views.iter().enumerate() {
            let (rvec, tvec) = self.decode_pose(x, i);
            let rows = 2 * view.len();
            self.view_residuals(
                &camera,
                &rvec,
                &tvec,
                view,
                &mut r.as_mut_slice()[offset..offset + rows],
            );
            offset += rows;
        }
        r
    }

    /// Central differences exploiting the block structure: camera columns
    /// touch every row, pose columns only the rows of their own view.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let m = self.residual_dim();
        let n = x.len();
        let mut j = DMatrix::zeros(m, n);
        let mut x_pert = x.clone();

        let n_cam = INTRINSICS_DIM + self.distortion.num_coeffs();
        for k in 0..n_cam {
            let h = fd_step(x[k]);
            x_pert[k] = x[k] + h;
            let r_plus = self.residuals(&x_pert);
            x_pert[k] = x[k] - h;
            let r_minus = self.residuals(&x_pert);
            x_pert[k] = x[k];
            j.set_column(k, &((r_plus - r_minus) / (2.0 * h)));
        }

        let camera = self.decode_camera(x);
        let offsets = self.view_row_offsets();
        for (i, view) in self.views.iter().enumerate() {
            let rows = 2 * view.len();
            let row0 = offsets[i];
            let mut r_plus = vec![0.0; rows];
            let mut r_minus = vec![0.0; rows];
            let (rvec, tvec) = self.decode_pose(x, i);
            let mut pose = [rvec.x, rvec.y, rvec.z, tvec.x, tvec.y, tvec.z];
            for p in 0..POSE_DIM {
                let base = pose[p];
                let h = fd_step(base);

                pose[p] = base + h;
                let (rv, tv) = split_pose(&pose);
                self.view_residuals(&camera, &rv, &tv, view, &mut r_plus);

                pose[p] = base - h;
                let (rv, tv) = split_pose(&pose);
                self.view_residuals(&camera, &rv, &tv, view, &mut r_minus);

                pose[p] = base;

                let col = self.pose_offset(i) + p;
                for row in 0..rows {
                    j[(row0 + row, col)] = (r_plus[row] - r_minus[row]) / (2.0 * h);
                }
            }
        }
        j
    }
}

fn split_pose(p: &[Real; 6]) -> (Vec3, Vec3) {
    (Vec3::new(p[0], p[1], p[2]), Vec3::new(p[3], p[4], p[5]))
}

/// Refine camera intrinsics, distortion & per-view poses from an initial estimate.
pub fn refine_planar_intrinsics<B: NllsSolverBackend>(
    backend: &B,
    problem: &PlanarIntrinsicsProblem,
    initial: &PlanarEstimate,
    opts: &SolveOptions,
) -> (PlanarEstimate, SolveReport) {
    let x0 = problem.pack(initial);
    let (x_opt, report) = backend.solve(problem, x0, opts);
    (problem.decode(&x_opt), report)
}

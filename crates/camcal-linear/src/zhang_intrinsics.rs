use camcal_core::{FxFyCxCySkew, Mat3, Real};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntrinsicsInitError {
    #[error("need at least 3 homographies for intrinsics estimation, got {0}")]
    NotEnoughViews(usize),
    #[error("degenerate view configuration (board planes too similar)")]
    Degenerate,
    #[error("svd failed")]
    SvdFailed,
}

/// Build the 6-vector v_ij(H) as in Zhang's method.
/// `i`, `j` are 0-based column indices of H.
fn v_ij(hmtx: &Mat3, i: usize, j: usize) -> nalgebra::SVector<Real, 6> {
    let hi = hmtx.column(i);
    let hj = hmtx.column(j);

    nalgebra::SVector::<Real, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Estimate camera intrinsics K from a set of plane homographies H_k using
/// Zhang's closed-form solution (no distortion).
///
/// Requires at least 3 homographies from non-parallel board planes.
pub fn estimate_intrinsics_from_homographies(
    hmtxs: &[Mat3],
) -> Result<FxFyCxCySkew<Real>, IntrinsicsInitError> {
    if hmtxs.len() < 3 {
        return Err(IntrinsicsInitError::NotEnoughViews(hmtxs.len()));
    }

    let m = hmtxs.len();
    let mut vmtx = DMatrix::<Real>::zeros(2 * m, 6);

    for (k, hmtx) in hmtxs.iter().enumerate() {
        // Scale-normalize each H so that no view dominates the system.
        let hmtx = hmtx / hmtx.norm();
        let v11 = v_ij(&hmtx, 0, 0);
        let v22 = v_ij(&hmtx, 1, 1);
        let v12 = v_ij(&hmtx, 0, 1);

        vmtx.row_mut(2 * k).copy_from(&v12.transpose());
        vmtx.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    // Solve V b = 0 via SVD: singular vector of the smallest singular value.
    let svd = vmtx.svd(false, true);
    // b must be the only null direction; repeated board poses leave several.
    let sv = &svd.singular_values;
    if sv[sv.len() - 2] <= 1e-10 * sv[0] {
        return Err(IntrinsicsInitError::Degenerate);
    }
    let v_t = svd.v_t.ok_or(IntrinsicsInitError::SvdFailed)?;
    let b = v_t.row(v_t.nrows() - 1);

    let b11 = b[0];
    let b12 = b[1];
    let b22 = b[2];
    let b13 = b[3];
    let b23 = b[4];
    let b33 = b[5];

    // From Zhang's paper:
    //
    // v0 = (B12 B13 - B11 B23) / (B11 B22 - B12^2)
    // λ = B33 - (B13^2 + v0 (B12 B13 - B11 B23)) / B11
    // α = sqrt(λ / B11)
    // β = sqrt(λ B11 / (B11 B22 - B12^2))
    // γ = -B12 α^2 β / λ
    // u0 = γ v0 / β - B13 α^2 / λ

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    let denom_rel = if denom_norm > 0.0 {
        denom.abs() / denom_norm
    } else {
        0.0
    };
    if denom_rel <= 1e-6 {
        return Err(IntrinsicsInitError::Degenerate);
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;

    // b is only known up to sign: lambda follows b11, denom does not.
    if lambda.signum() != b11.signum() || denom <= 0.0 {
        return Err(IntrinsicsInitError::Degenerate);
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    let intr = FxFyCxCySkew {
        fx: alpha,
        fy: beta,
        cx: u0,
        cy: v0,
        skew: gamma,
    };
    if ![intr.fx, intr.fy, intr.cx, intr.cy, intr.skew]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(IntrinsicsInitError::Degenerate);
    }
    Ok(intr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, Vector3};

    fn make_kmtx() -> (FxFyCxCySkew<Real>, Mat3) {
        let intr = FxFyCxCySkew {
            fx: 900.0,
            fy: 880.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.0,
        };
        let kmtx = Matrix3::new(
            intr.fx, intr.skew, intr.cx, 0.0, intr.fy, intr.cy, 0.0, 0.0, 1.0,
        );
        (intr, kmtx)
    }

    fn synthetic_homography(kmtx: &Mat3, rot: Rotation3<Real>, t: Vector3<Real>) -> Mat3 {
        let iso = Isometry3::from_parts(Translation3::from(t), rot.into());

        // For Z=0 plane, H = K [r1 r2 t]
        let binding = iso.rotation.to_rotation_matrix();
        let r_mat = binding.matrix();

        let mut hmtx = Mat3::zeros();
        hmtx.set_column(0, &(kmtx * r_mat.column(0)));
        hmtx.set_column(1, &(kmtx * r_mat.column(1)));
        hmtx.set_column(2, &(kmtx * t));
        hmtx
    }

    #[test]
    fn intrinsics_from_homographies_recovers_kmtx() {
        let (intr_gt, kmtx) = make_kmtx();

        let hmts: Vec<Mat3> = vec![
            synthetic_homography(
                &kmtx,
                Rotation3::from_euler_angles(0.1, 0.0, 0.05),
                Vector3::new(0.1, -0.05, 1.0),
            ),
            synthetic_homography(
                &kmtx,
                Rotation3::from_euler_angles(-0.05, 0.15, -0.1),
                Vector3::new(-0.05, 0.1, 1.2),
            ),
            synthetic_homography(
                &kmtx,
                Rotation3::from_euler_angles(0.2, -0.1, 0.0),
                Vector3::new(0.0, 0.0, 0.9),
            ),
        ];

        let intr_est = estimate_intrinsics_from_homographies(&hmts).unwrap();

        assert!((intr_est.fx - intr_gt.fx).abs() < 5.0, "fx mismatch");
        assert!((intr_est.fy - intr_gt.fy).abs() < 5.0, "fy mismatch");
        assert!((intr_est.cx - intr_gt.cx).abs() < 10.0, "cx mismatch");
        assert!((intr_est.cy - intr_gt.cy).abs() < 10.0, "cy mismatch");
        assert!(intr_est.skew.abs() < 1e-3, "skew not ~0: {}", intr_est.skew);
    }

    #[test]
    fn recovers_kmtx_from_many_exact_views() {
        let (intr_gt, kmtx) = make_kmtx();
        let hmts: Vec<Mat3> = (0..6)
            .map(|i| {
                let t = i as Real;
                synthetic_homography(
                    &kmtx,
                    Rotation3::from_euler_angles(0.3 - 0.1 * t, -0.25 + 0.1 * t, 0.05 * t),
                    Vector3::new(-0.1 + 0.04 * t, 0.05 - 0.02 * t, 0.9 + 0.1 * t),
                )
            })
            .collect();

        // Whichever sign the SVD picks for b, the estimate must come out.
        let est = estimate_intrinsics_from_homographies(&hmts).unwrap();
        assert!((est.fx - intr_gt.fx).abs() < 1e-2, "fx {}", est.fx);
        assert!((est.fy - intr_gt.fy).abs() < 1e-2, "fy {}", est.fy);
        assert!((est.cx - intr_gt.cx).abs() < 1e-2, "cx {}", est.cx);
        assert!((est.cy - intr_gt.cy).abs() < 1e-2, "cy {}", est.cy);
        assert!(est.skew.abs() < 1e-3, "skew {}", est.skew);
    }

    #[test]
    fn repeated_board_pose_is_degenerate() {
        let (_, kmtx) = make_kmtx();
        let h = synthetic_homography(
            &kmtx,
            Rotation3::from_euler_angles(0.2, -0.1, 0.05),
            Vector3::new(0.05, -0.02, 1.1),
        );
        assert!(matches!(
            estimate_intrinsics_from_homographies(&vec![h; 25]),
            Err(IntrinsicsInitError::Degenerate)
        ));
    }

    #[test]
    fn too_few_views_is_an_error() {
        let (_, kmtx) = make_kmtx();
        let h = synthetic_homography(
            &kmtx,
            Rotation3::from_euler_angles(0.1, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        assert!(matches!(
            estimate_intrinsics_from_homographies(&[h, h]),
            Err(IntrinsicsInitError::NotEnoughViews(2))
        ));
    }
}

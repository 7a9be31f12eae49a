use crate::math::normalize_points_2d;
use camcal_core::{Mat3, Pt2};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("point count mismatch: {world} plane points vs {image} image points")]
    CountMismatch { world: usize, image: usize },
    #[error("degenerate point configuration")]
    Degenerate,
    #[error("svd failed")]
    SvdFailed,
}

/// Estimate H such that x' ~ H x using the normalized DLT.
///
/// Both point sets are Hartley-normalized before building the design matrix;
/// the result is denormalized and scaled so that `H[2,2] = 1`.
pub fn dlt_homography(world: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = world.len();
    if image.len() != n {
        return Err(HomographyError::CountMismatch {
            world: n,
            image: image.len(),
        });
    }
    if n < 4 {
        return Err(HomographyError::NotEnoughPoints(n));
    }

    let (world_n, t_world) = normalize_points_2d(world).ok_or(HomographyError::Degenerate)?;
    let (image_n, t_image) = normalize_points_2d(image).ok_or(HomographyError::Degenerate)?;

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);

    for (i, (pw, pi)) in world_n.iter().zip(image_n.iter()).enumerate() {
        let x = pw.x;
        let y = pw.y;
        let u = pi.x;
        let v = pi.y;

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // A is 2n x 9; thin SVD only yields 9 rows of V^T when 2n >= 9.
    let rows = a.nrows();
    if rows < 9 {
        a = a.insert_rows(rows, 9 - rows, 0.0);
    }

    // Solve A h = 0 via SVD (smallest singular value)
    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
    let h = v_t.row(v_t.nrows() - 1);

    let mut h_norm = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_norm[(r, c)] = h[3 * r + c];
        }
    }

    let t_image_inv = t_image
        .try_inverse()
        .ok_or(HomographyError::Degenerate)?;
    let mut h_mat = t_image_inv * h_norm * t_world;

    // normalise such that H[2,2] = 1
    let scale = h_mat[(2, 2)];
    if scale.abs() <= f64::EPSILON {
        return Err(HomographyError::Degenerate);
    }
    h_mat /= scale;

    Ok(h_mat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_homography() {
        let w = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        let img = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(2.0, 0.0),
            Pt2::new(2.0, 2.0),
            Pt2::new(0.0, 2.0),
        ];

        let h = dlt_homography(&w, &img).unwrap();
        let s = h[(0, 0)];
        assert!((s - 2.0).abs() < 1e-6);
    }

    #[test]
    fn recovers_projective_map_on_large_coordinates() {
        let h_gt = Mat3::new(1.2, 0.1, 320.0, -0.05, 0.9, 240.0, 1e-4, -2e-4, 1.0);
        let mut world = Vec::new();
        let mut image = Vec::new();
        for j in 0..6 {
            for i in 0..9 {
                let p = Pt2::new(i as f64 * 25.0, j as f64 * 25.0);
                let q = h_gt * p.to_homogeneous();
                world.push(p);
                image.push(Pt2::new(q.x / q.z, q.y / q.z));
            }
        }

        let h = dlt_homography(&world, &image).unwrap();
        assert!((h - h_gt).abs().max() < 1e-6, "H = {h}");
    }

    #[test]
    fn four_points_pad_the_system_to_nine_rows() {
        let h_gt = Mat3::new(0.8, -0.2, 10.0, 0.15, 1.1, -4.0, 2e-3, -1e-3, 1.0);
        let world = [
            Pt2::new(0.0, 0.0),
            Pt2::new(50.0, 0.0),
            Pt2::new(50.0, 30.0),
            Pt2::new(0.0, 30.0),
        ];
        let image: Vec<Pt2> = world
            .iter()
            .map(|p| {
                let q = h_gt * p.to_homogeneous();
                Pt2::new(q.x / q.z, q.y / q.z)
            })
            .collect();

        let h = dlt_homography(&world, &image).unwrap();
        assert!((h - h_gt).abs().max() < 1e-6, "H = {h}");
    }

    #[test]
    fn rejects_too_few_points() {
        let pts = vec![Pt2::new(0.0, 0.0); 3];
        assert!(matches!(
            dlt_homography(&pts, &pts),
            Err(HomographyError::NotEnoughPoints(3))
        ));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let a = vec![Pt2::new(0.0, 0.0); 4];
        let b = vec![Pt2::new(0.0, 0.0); 5];
        assert!(matches!(
            dlt_homography(&a, &b),
            Err(HomographyError::CountMismatch { world: 4, image: 5 })
        ));
    }
}

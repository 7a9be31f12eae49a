//! Numerical conditioning helpers shared by the linear solvers.

use camcal_core::{Mat3, Pt2};

/// Hartley normalization for 2D points.
///
/// Centers points at the origin and scales so that the mean distance from
/// the origin is `√2`.
///
/// Returns the normalized points and the 3x3 transform `T` such that
/// `p_norm = T * p_homogeneous`, or `None` if the input is empty or all points
/// coincide.
///
/// # References
///
/// Hartley & Zisserman, "Multiple View Geometry in Computer Vision", 2nd ed.,
/// Algorithm 4.2 (Normalized DLT)
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let cx = sx / n;
    let cy = sy / n;

    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    if mean_dist <= f64::EPSILON {
        return None;
    }

    let scale = (2.0_f64).sqrt() / mean_dist;
    let t = Mat3::new(
        scale,
        0.0,
        -scale * cx,
        0.0,
        scale,
        -scale * cy,
        0.0,
        0.0,
        1.0,
    );

    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * scale, (p.y - cy) * scale))
        .collect();

    Some((norm, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_points_are_centered_with_unit_scale() {
        let pts = vec![
            Pt2::new(100.0, 200.0),
            Pt2::new(150.0, 250.0),
            Pt2::new(120.0, 220.0),
            Pt2::new(90.0, 260.0),
        ];
        let (norm, t) = normalize_points_2d(&pts).unwrap();

        let cx: f64 = norm.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy: f64 = norm.iter().map(|p| p.y).sum::<f64>() / 4.0;
        assert!(cx.abs() < 1e-12 && cy.abs() < 1e-12);

        let mean: f64 = norm.iter().map(|p| p.coords.norm()).sum::<f64>() / 4.0;
        assert!((mean - 2.0_f64.sqrt()).abs() < 1e-12);

        let mapped = t * pts[1].to_homogeneous();
        assert!((mapped.x - norm[1].x).abs() < 1e-12);
    }

    #[test]
    fn coincident_points_are_rejected() {
        let pts = vec![Pt2::new(1.0, 1.0); 5];
        assert!(normalize_points_2d(&pts).is_none());
    }
}

//! Sub-pixel chessboard corner refinement.
//!
//! At a saddle point every image gradient in the neighbourhood is orthogonal
//! to the vector from the corner to the gradient's pixel. Refinement solves
//! the weighted least-squares system
//!
//! ```text
//! Σ w g gᵀ · q = Σ w g gᵀ · p
//! ```
//!
//! for the corner `q` and iterates until the update is below `epsilon`.

use camcal_core::{Pt2, Real};
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Window and stop criteria for [`refine_corners_subpix`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubpixCriteria {
    /// Half side of the search window; the window is `2 * half_window + 1` wide.
    pub half_window: u32,
    pub max_iters: u32,
    /// Stop once a corner moves less than this many pixels in one iteration.
    pub epsilon: Real,
}

impl Default for SubpixCriteria {
    fn default() -> Self {
        Self {
            half_window: 11,
            max_iters: 30,
            epsilon: 1e-3,
        }
    }
}

/// Bilinear intensity lookup with clamped borders.
fn sample(gray: &GrayImage, x: Real, y: Real) -> Real {
    let (w, h) = gray.dimensions();
    let max_x = (w - 1) as Real;
    let max_y = (h - 1) as Real;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x0 = x0 as u32;
    let y0 = y0 as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let p = |x, y| gray.get_pixel(x, y).0[0] as Real;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Refine one corner; returns the input when the system is singular or the
/// estimate drifts out of the search window.
pub fn refine_corner_subpix(gray: &GrayImage, corner: Pt2, criteria: &SubpixCriteria) -> Pt2 {
    if gray.width() < 2 || gray.height() < 2 {
        return corner;
    }
    let hw = criteria.half_window.max(1) as i32;
    let hw_f = hw as Real;
    let eps2 = criteria.epsilon * criteria.epsilon;

    let mut q = corner;
    for _ in 0..criteria.max_iters.max(1) {
        let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
        let (mut bb1, mut bb2) = (0.0, 0.0);

        for dy in -hw..=hw {
            let wy = (-(dy as Real / hw_f).powi(2)).exp();
            for dx in -hw..=hw {
                let wx = (-(dx as Real / hw_f).powi(2)).exp();
                let weight = wx * wy;
                let px = q.x + dx as Real;
                let py = q.y + dy as Real;

                let gx = 0.5 * (sample(gray, px + 1.0, py) - sample(gray, px - 1.0, py));
                let gy = 0.5 * (sample(gray, px, py + 1.0) - sample(gray, px, py - 1.0));

                let gxx = gx * gx * weight;
                let gxy = gx * gy * weight;
                let gyy = gy * gy * weight;

                a += gxx;
                b += gxy;
                c += gyy;
                bb1 += gxx * dx as Real + gxy * dy as Real;
                bb2 += gxy * dx as Real + gyy * dy as Real;
            }
        }

        let det = a * c - b * b;
        if det.abs() <= Real::EPSILON * (a * c).abs().max(1.0) {
            break;
        }
        let sx = (c * bb1 - b * bb2) / det;
        let sy = (a * bb2 - b * bb1) / det;
        q = Pt2::new(q.x + sx, q.y + sy);
        if sx * sx + sy * sy <= eps2 {
            break;
        }
    }

    if (q.x - corner.x).abs() > hw_f || (q.y - corner.y).abs() > hw_f || !q.x.is_finite() {
        return corner;
    }
    q
}

/// Refine every corner independently.
pub fn refine_corners_subpix(
    gray: &GrayImage,
    corners: &[Pt2],
    criteria: &SubpixCriteria,
) -> Vec<Pt2> {
    corners
        .iter()
        .map(|&c| refine_corner_subpix(gray, c, criteria))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Anti-aliased 2x2 checker with its saddle at `(cx, cy)`.
    fn checker(cx: Real, cy: Real) -> GrayImage {
        let ss = 8;
        GrayImage::from_fn(64, 64, |x, y| {
            let mut acc = 0.0;
            for sy in 0..ss {
                for sx in 0..ss {
                    let px = x as Real + (sx as Real + 0.5) / ss as Real - 0.5;
                    let py = y as Real + (sy as Real + 0.5) / ss as Real - 0.5;
                    if (px < cx) == (py < cy) {
                        acc += 1.0;
                    }
                }
            }
            Luma([(40.0 + 180.0 * acc / (ss * ss) as Real).round() as u8])
        })
    }

    #[test]
    fn converges_to_saddle_point() {
        let gray = checker(31.3, 30.6);
        let criteria = SubpixCriteria {
            half_window: 5,
            ..Default::default()
        };
        let refined = refine_corner_subpix(&gray, Pt2::new(30.0, 32.0), &criteria);
        assert!((refined.x - 31.3).abs() < 0.1, "x = {}", refined.x);
        assert!((refined.y - 30.6).abs() < 0.1, "y = {}", refined.y);
    }

    #[test]
    fn flat_image_leaves_corner_unchanged() {
        let gray = GrayImage::from_pixel(32, 32, Luma([128]));
        let c = Pt2::new(10.2, 11.7);
        assert_eq!(
            refine_corner_subpix(&gray, c, &SubpixCriteria::default()),
            c
        );
    }
}

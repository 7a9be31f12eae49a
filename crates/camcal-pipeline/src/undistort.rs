//! Image undistortion with a calibrated camera.
//!
//! The output keeps the input's `K`; every output pixel is mapped through the
//! distortion model back into the source frame and sampled bilinearly.

use crate::writer::CameraInfo;
use camcal_core::math::coordinate_utils::distort_to_pixel;
use camcal_core::{pixel_to_normalized, Mat3, Pt2, RationalDistortion, Real};
use image::{DynamicImage, Rgb, RgbImage};

/// Per-pixel source coordinates, row-major, `NaN` where unmapped.
#[derive(Debug, Clone)]
pub struct UndistortMap {
    pub width: u32,
    pub height: u32,
    pub xmap: Vec<f32>,
    pub ymap: Vec<f32>,
}

pub fn init_undistort_map(k: &Mat3, dist_coeffs: &[Real], size: (u32, u32)) -> UndistortMap {
    let (width, height) = size;
    let dist = RationalDistortion::from_coeffs(dist_coeffs);
    let n = (width as usize) * (height as usize);
    let mut xmap = Vec::with_capacity(n);
    let mut ymap = Vec::with_capacity(n);

    for v in 0..height {
        for u in 0..width {
            match pixel_to_normalized(Pt2::new(u as Real, v as Real), k) {
                Some(normalized) => {
                    let src = distort_to_pixel(normalized, k, &dist);
                    xmap.push(src.x as f32);
                    ymap.push(src.y as f32);
                }
                None => {
                    xmap.push(f32::NAN);
                    ymap.push(f32::NAN);
                }
            }
        }
    }

    UndistortMap {
        width,
        height,
        xmap,
        ymap,
    }
}

fn sample_rgb(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = img.dimensions();
    if !x.is_finite() || !y.is_finite() || x < -0.5 || y < -0.5 {
        return Rgb([0, 0, 0]);
    }
    let (x, y) = (x.max(0.0), y.max(0.0));
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 >= w || y0 >= h {
        return Rgb([0, 0, 0]);
    }
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0).0;
    let p10 = img.get_pixel(x1, y0).0;
    let p01 = img.get_pixel(x0, y1).0;
    let p11 = img.get_pixel(x1, y1).0;
    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

pub fn remap(img: &DynamicImage, map: &UndistortMap) -> RgbImage {
    let src = img.to_rgb8();
    RgbImage::from_fn(map.width, map.height, |u, v| {
        let idx = (v as usize) * (map.width as usize) + u as usize;
        sample_rgb(&src, map.xmap[idx], map.ymap[idx])
    })
}

/// Undistort `img` using the intrinsics and coefficients of `info`.
pub fn undistort_image(img: &DynamicImage, info: &CameraInfo) -> RgbImage {
    let map = init_undistort_map(
        &info.camera_matrix(),
        info.dist_coeffs(),
        (img.width(), img.height()),
    );
    remap(img, &map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k() -> Mat3 {
        Mat3::new(300.0, 0.0, 80.0, 0.0, 300.0, 60.0, 0.0, 0.0, 1.0)
    }

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(160, 120, |u, v| {
            Rgb([u as u8, v as u8, 200])
        }))
    }

    #[test]
    fn zero_distortion_is_identity() {
        let img = gradient();
        let map = init_undistort_map(&k(), &[0.0; 8], (160, 120));
        let out = remap(&img, &map);
        assert_eq!(out, img.to_rgb8());
    }

    #[test]
    fn barrel_distortion_pulls_corners_inward() {
        let map = init_undistort_map(&k(), &[-0.3, 0.0, 0.0, 0.0, 0.0], (160, 120));
        // principal point stays fixed
        let c = 60 * 160 + 80;
        assert!((map.xmap[c] - 80.0).abs() < 1e-4);
        assert!((map.ymap[c] - 60.0).abs() < 1e-4);
        // the top-left output pixel samples closer to the centre
        assert!(map.xmap[0] > 0.0 && map.ymap[0] > 0.0);
    }

    #[test]
    fn out_of_frame_samples_are_black() {
        let img = gradient();
        let map = UndistortMap {
            width: 1,
            height: 1,
            xmap: vec![-5.0],
            ymap: vec![500.0],
        };
        assert_eq!(*remap(&img, &map).get_pixel(0, 0), Rgb([0, 0, 0]));
    }
}

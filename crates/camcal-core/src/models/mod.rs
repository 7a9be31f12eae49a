//! Camera model building blocks.
//!
//! A camera is composed of two stages applied after the pinhole division:
//!
//! 1. `DistortionModel`: radial/tangential distortion in normalized space.
//! 2. `IntrinsicsModel`: normalized coordinates to pixels (K matrix).
//!
//! `pixel = intrinsics(distortion(x / z, y / z))`

mod camera;
mod distortion;
mod intrinsics;

pub use camera::*;
pub use distortion::*;
pub use intrinsics::*;

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Vector2, Vector3};

    fn camera() -> PinholeCamera {
        Camera::new(
            FxFyCxCySkew {
                fx: 800.0,
                fy: 810.0,
                cx: 640.0,
                cy: 360.0,
                skew: 0.0,
            },
            RationalDistortion {
                k1: -0.05,
                k2: 0.01,
                ..Default::default()
            },
        )
    }

    #[test]
    fn roundtrip_backproject_project() {
        let cam = camera();
        let px = Vector2::new(1000.0, 200.0);
        let ray = cam.backproject_pixel(&px);
        let p = ray * 2.5;
        let px2 = cam.project_point_c(&p).unwrap();

        let err = (px2 - px).norm();
        assert!(err < 1e-6, "err={err}");
    }

    #[test]
    fn points_behind_camera_are_not_projected() {
        let cam = camera();
        assert!(cam.project_point_c(&Vector3::new(0.1, 0.1, -1.0)).is_none());
        assert!(cam.project_point_c(&Vector3::new(0.1, 0.1, 0.0)).is_none());
    }

    #[test]
    fn k_matrix_roundtrip() {
        let k = camera().k;
        assert_eq!(FxFyCxCySkew::from_k_matrix(&k.k_matrix()), k);
    }
}

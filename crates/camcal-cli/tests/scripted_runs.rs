//! The capture loop and the directory batch mode driven end to end with a
//! scripted detector over synthetic corners.

use camcal_cli::{calibrate_directory, run_repl, ReplExit, ReplOptions};
use camcal_core::{synthetic::planar, Camera, FxFyCxCySkew, Pt2, RationalDistortion};
use camcal_pipeline::{
    read_camera_info, CalibrateOptions, CalibrationSession, CalibrationTarget, DistortionKind,
    FetchError, ImageSource, RetryPolicy, SessionOptions, WriterOptions,
};
use image::{DynamicImage, GrayImage, Luma};
use std::cell::Cell;

fn target() -> CalibrationTarget {
    CalibrationTarget::new(9, 6, 25.0).unwrap()
}

fn views(n: usize) -> Vec<Vec<Pt2>> {
    let k = FxFyCxCySkew {
        fx: 600.0,
        fy: 600.0,
        cx: 320.0,
        cy: 240.0,
        skew: 0.0,
    };
    let cam = Camera::new(k, RationalDistortion::default());
    let poses = planar::varied_poses(n, 550.0);
    planar::project_views_all(&cam, &target().object_points(), &poses).unwrap()
}

fn options(min_views: usize) -> SessionOptions {
    SessionOptions {
        min_views,
        retry: RetryPolicy {
            max_attempts: 1,
            delay_ms: 0,
        },
        solver: CalibrateOptions {
            distortion: DistortionKind::Basic,
            ..Default::default()
        },
        ..Default::default()
    }
}

struct Flat;

impl ImageSource for Flat {
    fn fetch_frame(&mut self) -> Result<DynamicImage, FetchError> {
        Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(640, 480, Luma([120]))))
    }
}

#[test]
fn scripted_repl_session_writes_camera_info_and_photos() {
    let views = views(6);
    let next = Cell::new(0usize);
    let detector = |_: &GrayImage, _: (u32, u32)| -> Option<Vec<Pt2>> {
        let n = next.get();
        next.set(n + 1);
        views.get(n).cloned()
    };

    let dir = tempfile::tempdir().unwrap();
    let opts = ReplOptions {
        output_dir: dir.path().to_path_buf(),
        writer: WriterOptions::default(),
        saving_mode: true,
    };
    let mut session = CalibrationSession::with_options(target(), options(5)).unwrap();
    let script = "help\nfinish\ncatch\n\ndelete\ncatch\ncatch\ncatch\nbogus\ncatch\nfinish\ncatch\n";
    let mut out = Vec::new();

    let exit = run_repl(
        &mut session,
        &mut Flat,
        &detector,
        script.as_bytes(),
        &mut out,
        &opts,
    )
    .unwrap();
    let out = String::from_utf8(out).unwrap();

    let expected = dir.path().join("camera_info_640x480.yaml");
    assert_eq!(exit, ReplExit::Finished(expected.clone()));
    assert!(out.contains("Not enough images, now 0 (5 required)"), "{out}");
    assert!(out.contains("Image added, now 2"));
    assert!(out.contains("Deleted previous"));
    assert!(out.contains("Unknown command"));
    assert!(out.contains("Calibration successful"));
    // the trailing catch is never reached
    assert_eq!(next.get(), 6);

    let info = read_camera_info(&expected).unwrap();
    assert_eq!(info.image_width, 640);
    assert_eq!(info.dist_coeffs().len(), 8);
    for i in 0..6 {
        assert!(dir.path().join(format!("photo{i}.jpg")).exists());
    }
}

#[test]
fn stop_and_end_of_input_both_stop() {
    let never = |_: &GrayImage, _: (u32, u32)| -> Option<Vec<Pt2>> { None };
    let opts = ReplOptions {
        output_dir: std::env::temp_dir(),
        writer: WriterOptions::default(),
        saving_mode: false,
    };
    let mut session = CalibrationSession::with_options(target(), options(5)).unwrap();

    let mut out = Vec::new();
    let input = "catch\nstop\ncatch\n".as_bytes();
    let exit = run_repl(&mut session, &mut Flat, &never, input, &mut out, &opts).unwrap();
    assert_eq!(exit, ReplExit::Stopped);
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Chessboard not found, now 0"));
    assert!(out.ends_with("Stopped\n"));

    let exit = run_repl(&mut session, &mut Flat, &never, "delete\n".as_bytes(), Vec::new(), &opts)
        .unwrap();
    assert_eq!(exit, ReplExit::Stopped);
}

#[test]
fn directory_batch_skips_foreign_resolutions() {
    let views = views(6);
    let dir = tempfile::tempdir().unwrap();
    for i in 0..6 {
        GrayImage::from_pixel(640, 480, Luma([100]))
            .save(dir.path().join(format!("a{i}.png")))
            .unwrap();
    }
    GrayImage::from_pixel(320, 240, Luma([100]))
        .save(dir.path().join("b_small.png"))
        .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    let next = Cell::new(0usize);
    let detector = |_: &GrayImage, _: (u32, u32)| -> Option<Vec<Pt2>> {
        let n = next.get();
        next.set(n + 1);
        // the small frame gets full-size corners too
        views.get(n.min(5)).cloned()
    };

    let result = calibrate_directory(dir.path(), target(), options(5), &detector).unwrap();
    assert_eq!((result.image_width, result.image_height), (640, 480));
    assert_eq!(next.get(), 7);
    assert!(result.reprojection_error < 1e-4, "{}", result.reprojection_error);
}

#[test]
fn directory_without_images_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let never = |_: &GrayImage, _: (u32, u32)| -> Option<Vec<Pt2>> { None };
    let err = calibrate_directory(dir.path(), target(), options(5), &never).unwrap_err();
    assert!(err.to_string().contains("no jpg/png images"));
}

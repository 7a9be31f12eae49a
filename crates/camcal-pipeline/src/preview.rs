//! Annotated JPEG preview of the last capture.

use crate::types::Capture;
use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::io::Cursor;

pub const PREVIEW_WIDTH: u32 = 640;
pub const PREVIEW_HEIGHT: u32 = 480;

const FOUND: Rgb<u8> = Rgb([0, 220, 0]);
const MISSING: Rgb<u8> = Rgb([230, 0, 0]);

/// Draw the capture's corners onto a copy of its frame.
///
/// Found boards get green circles joined row by row in detection order.
/// Frames without a board get a red border.
pub fn annotate_capture(capture: &Capture, pattern_width: u32) -> RgbImage {
    let mut canvas = capture.frame.to_rgb8();
    let (w, h) = canvas.dimensions();
    let radius = ((w.min(h) / 120).max(3)) as i32;

    match capture.corners.as_deref() {
        Some(corners) => {
            for (idx, c) in corners.iter().enumerate() {
                let centre = (c.x.round() as i32, c.y.round() as i32);
                draw_hollow_circle_mut(&mut canvas, centre, radius, FOUND);
                let Some(next) = corners.get(idx + 1) else {
                    continue;
                };
                if pattern_width > 0 && (idx as u32 + 1) % pattern_width == 0 {
                    continue;
                }
                draw_line_segment_mut(
                    &mut canvas,
                    (c.x as f32, c.y as f32),
                    (next.x as f32, next.y as f32),
                    FOUND,
                );
            }
        }
        None => {
            let border = (radius as u32).max(1);
            for inset in 0..border {
                if w <= 2 * inset || h <= 2 * inset {
                    break;
                }
                let rect =
                    Rect::at(inset as i32, inset as i32).of_size(w - 2 * inset, h - 2 * inset);
                draw_hollow_rect_mut(&mut canvas, rect, MISSING);
            }
        }
    }
    canvas
}

/// Annotated frame resized to 640x480 and encoded as JPEG.
pub fn render_preview(
    capture: &Capture,
    pattern_width: u32,
) -> Result<Vec<u8>, image::ImageError> {
    let annotated = annotate_capture(capture, pattern_width);
    let resized = image::imageops::resize(
        &annotated,
        PREVIEW_WIDTH,
        PREVIEW_HEIGHT,
        FilterType::Triangle,
    );
    encode_jpeg(&DynamicImage::ImageRgb8(resized))
}

/// JPEG bytes of `frame` as-is.
pub fn encode_jpeg(frame: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Cursor::new(Vec::new());
    frame.to_rgb8().write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcal_core::Pt2;
    use image::GrayImage;

    fn capture(corners: Option<Vec<Pt2>>) -> Capture {
        let gray = GrayImage::from_pixel(320, 240, image::Luma([128]));
        Capture {
            frame: DynamicImage::ImageLuma8(gray.clone()),
            gray,
            corners,
        }
    }

    #[test]
    fn found_corners_are_green() {
        let cap = capture(Some(vec![Pt2::new(100.0, 100.0), Pt2::new(140.0, 100.0)]));
        let img = annotate_capture(&cap, 2);
        // circle of radius 3 around (100, 100)
        assert_eq!(*img.get_pixel(103, 100), FOUND);
        assert_eq!(*img.get_pixel(0, 0), Rgb([128, 128, 128]));
    }

    #[test]
    fn missing_board_gets_red_border() {
        let img = annotate_capture(&capture(None), 9);
        assert_eq!(*img.get_pixel(0, 0), MISSING);
        assert_eq!(*img.get_pixel(160, 120), Rgb([128, 128, 128]));
    }

    #[test]
    fn preview_is_a_640x480_jpeg() {
        let bytes = render_preview(&capture(None), 9).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (PREVIEW_WIDTH, PREVIEW_HEIGHT));
    }
}

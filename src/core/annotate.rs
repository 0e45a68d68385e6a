use crate::core::estimator::Measurement;
use crate::models::PixelPoint;
use image::{Rgb, RgbImage};
use std::path::Path;

pub const HEAD_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const FOOT_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const MARKER_RADIUS: i64 = 5;

/// Draw filled markers at the measured head and foot positions
pub fn draw_keypoints(image: &mut RgbImage, measurement: &Measurement) {
    draw_disc(image, measurement.head, MARKER_RADIUS, HEAD_COLOR);
    draw_disc(image, measurement.foot, MARKER_RADIUS, FOOT_COLOR);
}

/// Annotate a copy of `image` and write it as PNG to `path`
pub fn save_annotated(
    image: &RgbImage,
    measurement: &Measurement,
    path: &Path,
) -> Result<(), image::ImageError> {
    let mut canvas = image.clone();
    draw_keypoints(&mut canvas, measurement);
    canvas.save_with_format(path, image::ImageFormat::Png)
}

fn draw_disc(image: &mut RgbImage, center: PixelPoint, radius: i64, color: Rgb<u8>) {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (x, y) = (center.x + dx, center.y + dy);
            if (0..width).contains(&x) && (0..height).contains(&y) {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

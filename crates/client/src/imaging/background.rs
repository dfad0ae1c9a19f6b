//! Background color estimation and removal.
//!
//! The background is estimated by averaging pixels from the image edges,
//! then every pixel within `tolerance` (Euclidean RGB distance) of that
//! color gets its alpha lowered. Pixels farther away are left untouched.
use image::RgbaImage;

use giftlist_core::BgSample;

/// An RGB triple.
pub type Rgb = [u8; 3];

/// Fraction of full opacity reached by a pixel sitting exactly at the
/// tolerance boundary. Keeps every in-tolerance pixel strictly below its
/// original alpha when that alpha is opaque.
pub const EDGE_SOFTNESS: f64 = 0.8;

/// Sample points for `mode`. Empty for an image without pixels.
fn sample_points(width: u32, height: u32, mode: BgSample) -> Vec<(u32, u32)> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    match mode {
        BgSample::Corners => {
            let corners = [(0, 0), (width - 1, 0), (0, height - 1), (width - 1, height - 1)];
            corners
                .into_iter()
                .flat_map(|(x, y)| [(x, y), ((x + 1).min(width - 1), y), (x, (y + 1).min(height - 1))])
                .collect()
        }
        BgSample::Border => {
            let step_x = (width / 16).max(1) as usize;
            let step_y = (height / 16).max(1) as usize;
            let mut points = Vec::new();

            for x in (0..width).step_by(step_x) {
                points.push((x, 0));
                points.push((x, height - 1));
            }
            for y in (0..height).step_by(step_y) {
                points.push((0, y));
                points.push((width - 1, y));
            }

            points
        }
    }
}

/// Estimate the background color as the rounded per-channel mean of the
/// sampled edge pixels. Returns `None` for an empty image.
///
/// `Corners` takes three pixels at each corner (the corner and its inward
/// horizontal and vertical neighbours). `Border` walks the top and bottom
/// rows and the left and right columns with a stride of one sixteenth of the
/// dimension, at least 1.
pub fn sample_background(image: &RgbaImage, mode: BgSample) -> Option<Rgb> {
    let (width, height) = image.dimensions();
    let points = sample_points(width, height, mode);

    if points.is_empty() {
        return None;
    }

    let mut sums = [0u64; 3];
    for &(x, y) in &points {
        let pixel = image.get_pixel(x, y);
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(channel);
        }
    }

    let count = points.len() as f64;
    Some(sums.map(|sum| (sum as f64 / count).round().clamp(0.0, 255.0) as u8))
}

/// Euclidean distance between two colors in RGB space.
pub fn color_distance(a: Rgb, b: Rgb) -> f64 {
    let [dr, dg, db] = [0, 1, 2].map(|i| f64::from(a[i]) - f64::from(b[i]));
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Alpha for a pixel `distance` away from the background.
///
/// Outside the tolerance the original alpha is returned. Inside it the
/// target alpha grows linearly from 0 at the background color to
/// `EDGE_SOFTNESS` of full opacity at the boundary, and the result never
/// exceeds `original`.
pub fn feathered_alpha(distance: f64, tolerance: f64, original: u8) -> u8 {
    if distance > tolerance {
        return original;
    }

    let ratio = if tolerance > 0.0 { distance / tolerance } else { 0.0 };
    let target = (255.0 * ratio * EDGE_SOFTNESS).round().clamp(0.0, 255.0) as u8;

    original.min(target)
}

/// Lower the alpha of every pixel within `tolerance` of `background`.
/// Color channels are never modified. Returns the number of pixels whose
/// alpha changed.
pub fn remove_background(image: &mut RgbaImage, background: Rgb, tolerance: f64) -> usize {
    let mut changed = 0;

    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let alpha = feathered_alpha(color_distance([r, g, b], background), tolerance, a);
        if alpha != a {
            pixel.0[3] = alpha;
            changed += 1;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn framed(width: u32, height: u32, frame: Rgba<u8>, fill: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if x == 0 || y == 0 || x == width - 1 || y == height - 1 { frame } else { fill }
        })
    }

    #[test]
    fn test_sample_uniform_border() {
        let image = framed(40, 30, WHITE, RED);
        assert_eq!(sample_background(&image, BgSample::Border), Some([255, 255, 255]));
    }

    #[test]
    fn test_sample_corners_uses_corner_neighbourhood() {
        let mut image = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([120, 0, 0, 255]));

        let bg = sample_background(&image, BgSample::Corners).unwrap();
        assert_eq!(bg, [10, 0, 0]);
    }

    #[test]
    fn test_sample_corners_ignores_interior() {
        let image = framed(10, 10, WHITE, RED);
        assert_eq!(sample_background(&image, BgSample::Corners), Some([255, 255, 255]));
    }

    #[test]
    fn test_sample_single_pixel_image() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        assert_eq!(sample_background(&image, BgSample::Corners), Some([10, 20, 30]));
        assert_eq!(sample_background(&image, BgSample::Border), Some([10, 20, 30]));
    }

    #[test]
    fn test_sample_empty_image() {
        let image = RgbaImage::new(0, 0);
        assert_eq!(sample_background(&image, BgSample::Corners), None);
        assert_eq!(sample_background(&image, BgSample::Border), None);
    }

    #[test]
    fn test_border_stride() {
        assert_eq!(sample_points(32, 16, BgSample::Border).len(), 2 * 16 + 2 * 16);
        assert_eq!(sample_points(8, 8, BgSample::Border).len(), 4 * 8);
        assert_eq!(sample_points(8, 8, BgSample::Corners).len(), 12);
    }

    #[test]
    fn test_color_distance() {
        assert_eq!(color_distance([0, 0, 0], [0, 0, 0]), 0.0);
        assert_eq!(color_distance([255, 255, 255], [255, 255, 220]), 35.0);
        assert!((color_distance([0, 0, 0], [255, 255, 255]) - 441.672_955_930_063_7).abs() < 1e-9);
    }

    #[test]
    fn test_feathered_alpha_bounds() {
        assert_eq!(feathered_alpha(0.0, 35.0, 255), 0);
        assert_eq!(feathered_alpha(35.0, 35.0, 255), 204);
        assert_eq!(feathered_alpha(35.1, 35.0, 255), 255);
        assert_eq!(feathered_alpha(0.0, 0.0, 255), 0);
        assert_eq!(feathered_alpha(1.0, 0.0, 255), 255);
    }

    #[test]
    fn test_feathered_alpha_never_raises() {
        for original in [0u8, 10, 100, 203, 255] {
            for distance in [0.0, 5.0, 17.5, 34.9, 35.0, 60.0] {
                assert!(feathered_alpha(distance, 35.0, original) <= original);
            }
        }
    }

    #[test]
    fn test_feathered_alpha_monotone_in_distance() {
        let mut last = 0;
        for step in 0..=35 {
            let alpha = feathered_alpha(f64::from(step), 35.0, 255);
            assert!(alpha >= last);
            last = alpha;
        }
    }

    #[test]
    fn test_remove_background_only_touches_alpha() {
        let mut image = framed(10, 10, WHITE, RED);
        let before = image.clone();

        let changed = remove_background(&mut image, [255, 255, 255], 35.0);

        assert_eq!(changed, 36);
        for (after, original) in image.pixels().zip(before.pixels()) {
            assert_eq!(after.0[..3], original.0[..3]);
            assert!(after.0[3] <= original.0[3]);
        }
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(5, 5).0[3], 255);
    }

    #[test]
    fn test_remove_background_tolerance_boundary() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 220, 255]));
        remove_background(&mut image, [255, 255, 255], 35.0);
        assert!(image.get_pixel(0, 0).0[3] < 255);

        let mut image = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 220, 255]));
        remove_background(&mut image, [255, 255, 255], 34.99);
        assert_eq!(image.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_remove_background_zero_tolerance_only_exact_matches() {
        let mut image = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { WHITE } else { Rgba([254, 255, 255, 255]) });
        remove_background(&mut image, [255, 255, 255], 0.0);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(1, 0).0[3], 255);
    }
}

// src/color_analysis.rs
//
// Team colour support for player detections.
//
// The colour classifier returns a raw reference colour for a cropped player
// region; this module snaps it to a fixed palette of named colours so that
// team labels are comparable across frames.

use crate::interface::ColorClassifier;
use crate::types::Frame;
use anyhow::{bail, Result};
use image::{Rgb, RgbImage};
use tracing::debug;

// ============================================================================
// NAMED PALETTE
// ============================================================================

/// Named team colours, channels in (B, G, R) order to match what a
/// `ColorClassifier` returns. Declaration order breaks distance ties.
pub const NAMED_COLORS: [(&str, [u8; 3]); 9] = [
    ("blue", [128, 0, 0]),
    ("green", [0, 128, 0]),
    ("red", [0, 0, 255]),
    ("cyan", [192, 192, 0]),
    ("magenta", [192, 0, 192]),
    ("yellow", [0, 192, 192]),
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("gray", [128, 128, 128]),
];

/// Group key used for players whose colour could not be resolved.
pub const UNKNOWN_COLOR: &str = "unknown";

/// Nearest named colour by Euclidean distance in channel space.
pub fn nearest_named_color(color: [u8; 3]) -> &'static str {
    let mut best_name = UNKNOWN_COLOR;
    let mut best_dist = f32::INFINITY;

    for (name, reference) in NAMED_COLORS.iter() {
        let dist = color
            .iter()
            .zip(reference.iter())
            .map(|(&a, &b)| (a as f32 - b as f32).powi(2))
            .sum::<f32>()
            .sqrt();
        if dist < best_dist {
            best_dist = dist;
            best_name = name;
        }
    }

    best_name
}

// ============================================================================
// CROPPING
// ============================================================================

/// Crop `bbox` out of the frame, clamped to the frame bounds.
///
/// Returns `None` when the frame carries no pixels or the clamped region
/// is empty.
pub fn crop_region(frame: &Frame, bbox: &[f32; 4]) -> Option<RgbImage> {
    if !frame.has_pixels() {
        return None;
    }

    let width = frame.width as u32;
    let height = frame.height as u32;

    let x1 = bbox[0].max(0.0) as u32;
    let y1 = bbox[1].max(0.0) as u32;
    let x2 = (bbox[2].min(width as f32).max(0.0) as u32).min(width);
    let y2 = (bbox[3].min(height as f32).max(0.0) as u32).min(height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    // has_pixels() guarantees the buffer covers width * height * 3 bytes
    let stride = frame.width * 3;
    Some(RgbImage::from_fn(x2 - x1, y2 - y1, |x, y| {
        let i = (y1 + y) as usize * stride + (x1 + x) as usize * 3;
        Rgb([frame.data[i], frame.data[i + 1], frame.data[i + 2]])
    }))
}

// ============================================================================
// HSV CONVERSION
// ============================================================================

/// Convert RGB to HSV.
/// Returns (H: 0-360, S: 0-100, V: 0-255).
#[inline]
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let r_n = r / 255.0;
    let g_n = g / 255.0;
    let b_n = b / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    let h = if delta < 1e-6 {
        0.0
    } else if (max - r_n).abs() < 1e-6 {
        60.0 * (((g_n - b_n) / delta) % 6.0)
    } else if (max - g_n).abs() < 1e-6 {
        60.0 * (((b_n - r_n) / delta) + 2.0)
    } else {
        60.0 * (((r_n - g_n) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max < 1e-6 { 0.0 } else { (delta / max) * 100.0 };

    (h, s, max * 255.0)
}

// ============================================================================
// BUILT-IN CLASSIFIER
// ============================================================================

/// Average jersey colour of a player crop.
///
/// Only the upper part of the box is sampled (legs and turf dominate the
/// lower half) and dark pixels are dropped as shadow.
#[derive(Debug, Clone)]
pub struct MeanColorClassifier {
    /// Fraction of the crop height, from the top, that is sampled
    pub jersey_fraction: f32,
    /// Pixels with HSV value below this are ignored
    pub min_value: f32,
}

impl Default for MeanColorClassifier {
    fn default() -> Self {
        Self {
            jersey_fraction: 0.5,
            min_value: 40.0,
        }
    }
}

impl ColorClassifier for MeanColorClassifier {
    fn classify(&self, region: &RgbImage) -> Result<[u8; 3]> {
        let (w, h) = region.dimensions();
        let rows = ((h as f32 * self.jersey_fraction).ceil() as u32).clamp(1, h.max(1));

        let mut sum = [0f64; 3];
        let mut samples: u64 = 0;

        for y in 0..rows.min(h) {
            for x in 0..w {
                let Rgb([r, g, b]) = *region.get_pixel(x, y);
                let (_, _, v) = rgb_to_hsv(r as f32, g as f32, b as f32);
                if v < self.min_value {
                    continue;
                }
                sum[0] += b as f64;
                sum[1] += g as f64;
                sum[2] += r as f64;
                samples += 1;
            }
        }

        if samples == 0 {
            bail!("no usable pixels in {}x{} region", w, h);
        }

        let n = samples as f64;
        let color = [
            (sum[0] / n).round() as u8,
            (sum[1] / n).round() as u8,
            (sum[2] / n).round() as u8,
        ];
        debug!("Mean jersey colour {:?} from {} samples", color, samples);
        Ok(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: usize, height: usize, rgb: [u8; 3]) -> Frame {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Frame {
            frame_number: 0,
            data,
            width,
            height,
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_nearest_exact_palette_entries() {
        for (name, color) in NAMED_COLORS.iter() {
            assert_eq!(nearest_named_color(*color), *name);
        }
    }

    #[test]
    fn test_nearest_approximate() {
        assert_eq!(nearest_named_color([5, 10, 250]), "red");
        assert_eq!(nearest_named_color([240, 10, 5]), "blue");
        assert_eq!(nearest_named_color([240, 240, 250]), "white");
        assert_eq!(nearest_named_color([10, 10, 10]), "black");
    }

    #[test]
    fn test_nearest_tie_goes_to_first_declared() {
        // Equidistant from blue (128,0,0) and black (0,0,0)
        assert_eq!(nearest_named_color([64, 0, 0]), "blue");
    }

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = solid_frame(100, 80, [10, 20, 30]);
        let crop = crop_region(&frame, &[-20.0, -10.0, 40.0, 30.0]).unwrap();
        assert_eq!(crop.dimensions(), (40, 30));

        let crop = crop_region(&frame, &[90.0, 70.0, 150.0, 200.0]).unwrap();
        assert_eq!(crop.dimensions(), (10, 10));
    }

    #[test]
    fn test_crop_empty_region() {
        let frame = solid_frame(100, 80, [10, 20, 30]);
        assert!(crop_region(&frame, &[120.0, 10.0, 160.0, 40.0]).is_none());
        assert!(crop_region(&frame, &[50.0, 50.0, 50.0, 60.0]).is_none());
    }

    #[test]
    fn test_crop_without_pixels() {
        let frame = Frame::blank(3, 0.1);
        assert!(crop_region(&frame, &[0.0, 0.0, 10.0, 10.0]).is_none());
    }

    #[test]
    fn test_mean_classifier_returns_bgr() {
        let frame = solid_frame(20, 20, [200, 30, 10]);
        let crop = crop_region(&frame, &[0.0, 0.0, 20.0, 20.0]).unwrap();
        let color = MeanColorClassifier::default().classify(&crop).unwrap();
        assert_eq!(color, [10, 30, 200]);
    }

    #[test]
    fn test_crop_copies_the_right_pixels() {
        let mut frame = solid_frame(10, 10, [0, 0, 0]);
        // Mark pixel (x=6, y=3)
        let i = (3 * 10 + 6) * 3;
        frame.data[i..i + 3].copy_from_slice(&[1, 2, 3]);
        let crop = crop_region(&frame, &[5.0, 2.0, 8.0, 6.0]).unwrap();
        assert_eq!(crop.dimensions(), (3, 4));
        assert_eq!(*crop.get_pixel(1, 1), Rgb([1, 2, 3]));
        assert_eq!(*crop.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_jersey_colours_get_their_names() {
        let classifier = MeanColorClassifier::default();
        let cases = [
            ([220, 20, 20], "red"),
            ([20, 20, 220], "blue"),
            ([20, 200, 200], "cyan"),
            ([200, 200, 20], "yellow"),
            ([20, 130, 20], "green"),
        ];
        for (rgb, name) in cases {
            let frame = solid_frame(20, 20, rgb);
            let crop = crop_region(&frame, &[0.0, 0.0, 20.0, 20.0]).unwrap();
            let color = classifier.classify(&crop).unwrap();
            assert_eq!(nearest_named_color(color), name, "rgb {:?}", rgb);
        }
    }

    #[test]
    fn test_mean_classifier_rejects_dark_region() {
        let frame = solid_frame(20, 20, [5, 5, 5]);
        let crop = crop_region(&frame, &[0.0, 0.0, 20.0, 20.0]).unwrap();
        assert!(MeanColorClassifier::default().classify(&crop).is_err());
    }

    #[test]
    fn test_hsv_pure_colors() {
        let (h, s, v) = rgb_to_hsv(255.0, 0.0, 0.0);
        assert!(h.abs() < 0.1);
        assert!((s - 100.0).abs() < 0.1);
        assert!((v - 255.0).abs() < 0.1);

        let (h, _, _) = rgb_to_hsv(0.0, 255.0, 0.0);
        assert!((h - 120.0).abs() < 0.1);
    }
}

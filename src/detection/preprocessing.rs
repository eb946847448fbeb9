use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::separable_filter_equal;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::map::map_colors;

use crate::config::EdgeConfig;

/// 5-tap Gaussian used when the sigma is left to be derived from the kernel size
const GAUSSIAN_5: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// tan(22.5 deg) in Q15
const TAN_22_5_Q15: i64 = 13573;

/// Convert image to grayscale with BT.601 weights (14-bit fixed point, rounded)
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    map_colors(&rgb, |p| {
        let [r, g, b] = p.0.map(u32::from);
        Luma([((r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14) as u8])
    })
}

/// 5x5 Gaussian blur, applied as two 1-D passes
pub fn apply_blur(img: &GrayImage) -> GrayImage {
    separable_filter_equal(img, &GAUSSIAN_5[..])
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EdgeState {
    Suppressed,
    Weak,
    Strong,
}

/// Canny edge detector on an already smoothed image. Output pixels are 0 or 255.
///
/// Gradients are 3x3 Sobel, strength is `|gx| + |gy|`, and a pixel is kept
/// when it is a local maximum across the edge (direction quantized to 0, 45,
/// 90 or 135 degrees) and connected to a pixel above `high_threshold` through
/// pixels above `low_threshold`. No further smoothing is applied here.
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    let (w, h) = (width as usize, height as usize);
    let gx = horizontal_sobel(img);
    let gy = vertical_sobel(img);
    let (gx, gy) = (gx.as_raw(), gy.as_raw());

    let magnitude: Vec<i32> = gx
        .iter()
        .zip(gy.iter())
        .map(|(&dx, &dy)| i32::from(dx).abs() + i32::from(dy).abs())
        .collect();
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            magnitude[y as usize * w + x as usize]
        }
    };

    let low = low_threshold.floor() as i32;
    let high = high_threshold.floor() as i32;
    let mut state = vec![EdgeState::Suppressed; w * h];
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let m = magnitude[idx];
            if m <= low {
                continue;
            }

            let (dx, dy) = (i64::from(gx[idx]), i64::from(gy[idx]));
            let (xi, yi) = (x as isize, y as isize);
            let tg22x = dx.abs() * TAN_22_5_Q15;
            let ay = dy.abs() << 15;

            let is_max = if ay < tg22x {
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else if ay > tg22x + (dx.abs() << 16) {
                m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
            } else {
                let s = if (dx ^ dy) < 0 { -1 } else { 1 };
                m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
            };

            if !is_max {
                continue;
            }
            if m > high {
                state[idx] = EdgeState::Strong;
                stack.push((x, y));
            } else {
                state[idx] = EdgeState::Weak;
            }
        }
    }

    // Hysteresis: grow strong edges through 8-connected weak ones
    while let Some((x, y)) = stack.pop() {
        for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                let n = ny * w + nx;
                if state[n] == EdgeState::Weak {
                    state[n] = EdgeState::Strong;
                    stack.push((nx, ny));
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let edge = state[y as usize * w + x as usize] == EdgeState::Strong;
        Luma([if edge { 255 } else { 0 }])
    })
}

/// Grayscale, blur and Canny in one call
pub fn extract_edges(img: &DynamicImage, config: &EdgeConfig) -> GrayImage {
    let gray = to_grayscale(img);
    let blurred = apply_blur(&gray);
    detect_edges(&blurred, config.low_threshold, config.high_threshold)
}

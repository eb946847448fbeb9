use image::{Rgb, RgbImage};
use imageproc::map::map_colors2;
use tracing::warn;

use crate::config::OverlayConfig;
use crate::models::LaneLines;

/// Paint a segment of the given width with round caps. Coordinates may lie
/// far outside the canvas; only the visible part is touched.
pub fn draw_thick_line_mut(canvas: &mut RgbImage, line: [i32; 4], thickness: u32, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let [x1, y1, x2, y2] = line.map(|v| v as f64);
    let radius = thickness as f64 / 2.0;

    let min_x = (x1.min(x2) - radius).floor().max(0.0);
    let max_x = (x1.max(x2) + radius).ceil().min(width as f64 - 1.0);
    let min_y = (y1.min(y2) - radius).floor().max(0.0);
    let max_y = (y1.max(y2) + radius).ceil().min(height as f64 - 1.0);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let (dx, dy) = (x2 - x1, y2 - y1);
    let length_sq = dx * dx + dy * dy;
    let radius_sq = radius * radius;

    for y in min_y as u32..=max_y as u32 {
        for x in min_x as u32..=max_x as u32 {
            let (px, py) = (x as f64, y as f64);
            // Closest point on the segment
            let t = if length_sq > 0.0 {
                (((px - x1) * dx + (py - y1) * dy) / length_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (cx, cy) = (x1 + t * dx, y1 + t * dy);
            if (px - cx).powi(2) + (py - cy).powi(2) <= radius_sq {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

/// Black canvas of the given size with every drawable lane line painted on it
pub fn draw_lane_lines(
    width: u32,
    height: u32,
    lanes: &LaneLines,
    config: &OverlayConfig,
) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    let color = Rgb(config.color);

    for lane in lanes.iter() {
        match lane.to_pixels() {
            Some(pixels) => draw_thick_line_mut(&mut canvas, pixels, config.thickness, color),
            None => warn!(?lane, "skipping lane line with coordinates that do not fit in i32"),
        }
    }
    canvas
}

/// `frame_weight * frame + overlay_weight * canvas + gamma`, rounded and
/// saturated per channel. None when the rasters differ in size.
pub fn blend(frame: &RgbImage, canvas: &RgbImage, config: &OverlayConfig) -> Option<RgbImage> {
    if frame.dimensions() != canvas.dimensions() {
        return None;
    }

    let mix = |f: u8, c: u8| {
        let v = config.frame_weight * f as f32 + config.overlay_weight * c as f32 + config.gamma;
        v.round().clamp(0.0, 255.0) as u8
    };

    Some(map_colors2(frame, canvas, |f: Rgb<u8>, c: Rgb<u8>| {
        Rgb([mix(f[0], c[0]), mix(f[1], c[1]), mix(f[2], c[2])])
    }))
}

/// Draw the lanes and blend them onto the frame. Falls back to a copy of the
/// frame if the canvas does not match it.
pub fn render_overlay(
    frame: &RgbImage,
    lanes: &LaneLines,
    config: &OverlayConfig,
) -> RgbImage {
    let (width, height) = frame.dimensions();
    let canvas = draw_lane_lines(width, height, lanes, config);

    match blend(frame, &canvas, config) {
        Some(combined) => combined,
        None => {
            warn!(
                frame = ?frame.dimensions(),
                canvas = ?canvas.dimensions(),
                "shape mismatch, returning frame without overlay"
            );
            frame.clone()
        }
    }
}

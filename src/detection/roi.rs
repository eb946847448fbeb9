use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::config::RoiConfig;

/// Triangle vertices for a frame of the given size. Coordinates are
/// truncated to whole pixels; the base lies on row `height`.
pub fn roi_vertices(width: u32, height: u32, config: &RoiConfig) -> [Point<i32>; 3] {
    let w = width as f32;
    let h = height as f32;
    [
        Point::new((w * config.bottom_left_x) as i32, height as i32),
        Point::new((w * config.bottom_right_x) as i32, height as i32),
        Point::new((w * config.apex_x) as i32, (h * config.apex_y) as i32),
    ]
}

/// Mask with 255 inside the road triangle and 0 elsewhere
pub fn region_mask(width: u32, height: u32, config: &RoiConfig) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return mask;
    }

    let vertices = roi_vertices(width, height, config);
    // The polygon filler rejects an explicitly closed path
    if vertices[0] != vertices[2] {
        draw_polygon_mut(&mut mask, &vertices, Luma([255u8]));
    }
    mask
}

/// Zero every edge pixel outside the road triangle
pub fn apply_region_mask(edges: &GrayImage, config: &RoiConfig) -> GrayImage {
    let (width, height) = edges.dimensions();
    let mask = region_mask(width, height, config);

    let mut masked = GrayImage::new(width, height);
    for ((out, edge), keep) in masked.pixels_mut().zip(edges.pixels()).zip(mask.pixels()) {
        out[0] = edge[0] & keep[0];
    }
    masked
}

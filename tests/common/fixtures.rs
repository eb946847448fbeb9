use image::{Luma, Rgb, RgbImage, GrayImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

pub const LANE_FRAME_WIDTH: u32 = 1280;
pub const LANE_FRAME_HEIGHT: u32 = 960;

/// Left marking centerline: y = -x + 1330
pub const LEFT_TRUTH: (f64, f64) = (-1.0, 1330.0);
/// Right marking centerline: y = x + 50
pub const RIGHT_TRUTH: (f64, f64) = (1.0, 50.0);

/// All-black frame
pub fn black_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::new(width, height)
}

/// Frame filled with one gray level
pub fn flat_frame(width: u32, height: u32, level: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([level, level, level]))
}

/// Busy deterministic texture, useful for shape checks
pub fn textured_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
    })
}

/// Black road with two white 45 degree markings converging towards the
/// centre, both well inside the road triangle.
///
/// Left marking runs (380, 950) -> (600, 730), right marking
/// (900, 950) -> (680, 730); each is 10 px wide horizontally.
pub fn lane_frame() -> RgbImage {
    lane_frame_with_color(Rgb([255, 255, 255]))
}

/// Same road as [`lane_frame`] with markings painted in `color`
pub fn lane_frame_with_color(color: Rgb<u8>) -> RgbImage {
    let mut frame = black_frame(LANE_FRAME_WIDTH, LANE_FRAME_HEIGHT);

    let left = [
        Point::new(375, 950),
        Point::new(385, 950),
        Point::new(605, 730),
        Point::new(595, 730),
    ];
    let right = [
        Point::new(895, 950),
        Point::new(905, 950),
        Point::new(685, 730),
        Point::new(675, 730),
    ];
    draw_polygon_mut(&mut frame, &left, color);
    draw_polygon_mut(&mut frame, &right, color);
    frame
}

/// Vertical step: columns left of `split` are 0, the rest `level`
pub fn step_edge_image(width: u32, height: u32, split: u32, level: u8) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| Luma([if x < split { 0 } else { level }]))
}

/// Edge map with a single horizontal run on row `y` covering `xs`
pub fn edge_map_with_row(
    width: u32,
    height: u32,
    y: u32,
    xs: impl IntoIterator<Item = u32>,
) -> GrayImage {
    let mut edges = GrayImage::new(width, height);
    for x in xs {
        edges.put_pixel(x, y, Luma([255u8]));
    }
    edges
}

/// x of `y = slope * x + intercept` at row `y`
pub fn truth_x(truth: (f64, f64), y: f64) -> f64 {
    (y - truth.1) / truth.0
}

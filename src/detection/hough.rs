//! Progressive probabilistic Hough transform.
//!
//! Edge pixels vote one at a time. As soon as a pixel pushes some
//! (rho, theta) cell over the vote threshold, the detector walks the
//! corresponding line through the edge map in both directions, bridging
//! short gaps, and reports the run as a segment if it is long enough. Pixels
//! that belong to a reported segment are removed from the map and their
//! votes withdrawn, so each pixel contributes to at most one segment.
//!
//! Pixels are visited in raster order, which keeps the output a pure function
//! of the input.

use image::GrayImage;
use std::f64::consts::PI;

use crate::config::HoughConfig;
use crate::models::LineSegment;

/// Fixed-point precision used while stepping along a line
const SHIFT: u32 = 16;

struct Accumulator {
    /// (cos, sin) of every angle bin, pre-divided by rho
    trig: Vec<(f64, f64)>,
    num_rho: i64,
    votes: Vec<i32>,
}

impl Accumulator {
    fn new(width: u32, height: u32, rho: f64, theta: f64) -> Self {
        let num_angle = ((PI / theta).round() as usize).max(1);
        let num_rho = ((((width as f64 + height as f64) * 2.0 + 1.0) / rho).round() as i64).max(1);
        let irho = 1.0 / rho;
        let trig = (0..num_angle)
            .map(|n| {
                let angle = n as f64 * theta;
                (angle.cos() * irho, angle.sin() * irho)
            })
            .collect();

        Self {
            trig,
            num_rho,
            votes: vec![0; num_angle * num_rho as usize],
        }
    }

    fn cell(&self, n: usize, x: i64, y: i64) -> Option<usize> {
        let (c, s) = self.trig[n];
        let r = (x as f64 * c + y as f64 * s).round() as i64 + (self.num_rho - 1) / 2;
        (0..self.num_rho)
            .contains(&r)
            .then(|| n * self.num_rho as usize + r as usize)
    }

    /// Add the pixel's votes; returns the strongest (votes, angle bin) it touched
    fn vote(&mut self, x: i64, y: i64) -> (i32, usize) {
        let mut best = (i32::MIN, 0);
        for n in 0..self.trig.len() {
            if let Some(idx) = self.cell(n, x, y) {
                self.votes[idx] += 1;
                if self.votes[idx] > best.0 {
                    best = (self.votes[idx], n);
                }
            }
        }
        best
    }

    fn withdraw(&mut self, x: i64, y: i64) {
        for n in 0..self.trig.len() {
            if let Some(idx) = self.cell(n, x, y) {
                self.votes[idx] -= 1;
            }
        }
    }
}

/// Fixed-point walker along one direction of a detected line
#[derive(Clone, Copy)]
struct Walker {
    x: i64,
    y: i64,
    dx: i64,
    dy: i64,
    /// Major axis is x: x advances by one pixel per step
    x_major: bool,
}

impl Walker {
    fn start(x: i64, y: i64, cos_t: f64, sin_t: f64) -> Self {
        let a = -sin_t;
        let b = cos_t;
        let one = (1i64 << SHIFT) as f64;
        let half = 1i64 << (SHIFT - 1);

        if a.abs() > b.abs() {
            Self {
                x,
                y: (y << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                x_major: true,
            }
        } else {
            Self {
                x: (x << SHIFT) + half,
                y,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                x_major: false,
            }
        }
    }

    fn reversed(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            ..self
        }
    }

    fn pixel(&self) -> (i64, i64) {
        if self.x_major {
            (self.x, self.y >> SHIFT)
        } else {
            (self.x >> SHIFT, self.y)
        }
    }

    fn advance(&mut self) {
        self.x += self.dx;
        self.y += self.dy;
    }
}

/// Edge pixels still available for voting or segment extraction
struct EdgeMask {
    width: i64,
    height: i64,
    set: Vec<bool>,
}

impl EdgeMask {
    fn index(&self, (x, y): (i64, i64)) -> Option<usize> {
        (x >= 0 && x < self.width && y >= 0 && y < self.height)
            .then(|| (y * self.width + x) as usize)
    }
}

/// Detect line segments in a binary edge map
pub fn detect_segments(edges: &GrayImage, config: &HoughConfig) -> Vec<LineSegment> {
    let (width, height) = edges.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut accumulator =
        Accumulator::new(width, height, config.rho, config.theta_degrees.to_radians());
    let mut mask = EdgeMask {
        width: width as i64,
        height: height as i64,
        set: vec![false; width as usize * height as usize],
    };

    let mut points = Vec::new();
    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel[0] != 0 {
            mask.set[y as usize * width as usize + x as usize] = true;
            points.push((x as i64, y as i64));
        }
    }

    let max_gap = config.max_line_gap as i64;
    let min_length = config.min_line_length as i64;
    let mut segments = Vec::new();

    for (x, y) in points {
        if !mask.set[(y * mask.width + x) as usize] {
            continue;
        }

        let (max_votes, max_n) = accumulator.vote(x, y);
        if max_votes < config.threshold {
            continue;
        }

        let (cos_t, sin_t) = accumulator.trig[max_n];
        let forward = Walker::start(x, y, cos_t, sin_t);
        let walkers = [forward, forward.reversed()];

        // Find the last edge pixel in each direction before the gap gets too wide
        let mut line_end = [(x, y); 2];
        for (k, start) in walkers.iter().enumerate() {
            let mut walker = *start;
            let mut gap = 0;
            loop {
                let pixel = walker.pixel();
                let Some(idx) = mask.index(pixel) else { break };
                if mask.set[idx] {
                    gap = 0;
                    line_end[k] = pixel;
                } else {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
                walker.advance();
            }
        }

        let good_line = (line_end[1].0 - line_end[0].0).abs() >= min_length
            || (line_end[1].1 - line_end[0].1).abs() >= min_length;

        // Consume the pixels along the run so they cannot seed another segment
        for (k, start) in walkers.iter().enumerate() {
            let mut walker = *start;
            loop {
                let pixel = walker.pixel();
                let Some(idx) = mask.index(pixel) else { break };
                if mask.set[idx] {
                    if good_line {
                        accumulator.withdraw(pixel.0, pixel.1);
                    }
                    mask.set[idx] = false;
                }
                if pixel == line_end[k] {
                    break;
                }
                walker.advance();
            }
        }

        if good_line {
            segments.push(LineSegment::new(
                line_end[0].0 as f64,
                line_end[0].1 as f64,
                line_end[1].0 as f64,
                line_end[1].1 as f64,
            ));
        }
    }

    segments
}

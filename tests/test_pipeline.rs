//! End-to-end tests for the lane pipeline.
//!
//! Tests cover:
//! - Output shape for arbitrary inputs
//! - Two synthetic lane markings against known ground truth
//! - Featureless frames (pure blend, no overlay)
//! - Determinism across runs
//! - Per-stage debug output

mod common;

use common::*;
use image::Rgb;
use lanesight::detection::steps::GrayscaleStep;
use lanesight::{MetadataValue, Pipeline, PipelineContext, PipelineStep};
use std::sync::Arc;

/// Stage that always panics, standing in for a faulty image routine
struct PanickingStep;

impl PipelineStep for PanickingStep {
    fn process(
        &self,
        _data: PipelineData,
        _context: &PipelineContext,
    ) -> anyhow::Result<PipelineData> {
        panic!("stage blew up");
    }

    fn name(&self) -> &str {
        "Panicking"
    }
}

#[test]
fn test_output_matches_input_dimensions() -> anyhow::Result<()> {
    let detector = LaneDetector::default();

    for (width, height) in [(1, 1), (3, 2), (17, 5), (64, 48), (320, 240)] {
        let frame = textured_frame(width, height);
        let output = detector.detect_lanes(&frame);
        assert_eq!(output.dimensions(), (width, height));
    }

    Ok(())
}

#[test]
fn test_empty_frame_is_returned_unchanged() -> anyhow::Result<()> {
    let detector = LaneDetector::default();
    let frame = black_frame(0, 0);

    // analyze refuses, detect_lanes falls back to the input
    assert!(detector.analyze(&frame).is_err());
    let output = detector.detect_lanes(&frame);
    assert_eq!(output.dimensions(), (0, 0));

    Ok(())
}

#[test]
fn test_two_markings_yield_left_and_right_lanes() -> anyhow::Result<()> {
    // 1. Run the pipeline on the synthetic road
    let detector = LaneDetector::default();
    let frame = lane_frame();
    let result = detector.analyze(&frame)?;

    assert!(!result.segments.is_empty(), "expected Hough segments");
    assert_eq!(result.lanes.count(), 2);

    // 2. Both lines span the bottom row up to 60% of the height
    let left = result.lanes.left.expect("left lane");
    let right = result.lanes.right.expect("right lane");
    let bottom = LANE_FRAME_HEIGHT as f64;
    let horizon = (bottom * 0.6).trunc();
    for lane in [&left, &right] {
        assert_eq!(lane.y1, bottom);
        assert_eq!(lane.y2, horizon);
    }

    // 3. Endpoints sit close to the marking centerlines
    let tolerance = 12.0;
    for (lane, truth) in [(&left, LEFT_TRUTH), (&right, RIGHT_TRUTH)] {
        let dx1 = (lane.x1 - truth_x(truth, lane.y1)).abs();
        let dx2 = (lane.x2 - truth_x(truth, lane.y2)).abs();
        assert!(dx1 <= tolerance, "bottom x off by {dx1}: {lane:?}");
        assert!(dx2 <= tolerance, "top x off by {dx2}: {lane:?}");
    }

    // 4. The overlay is green along the left lane
    let output = result.image.to_rgb8();
    let mid_y = ((left.y1 + left.y2) / 2.0) as u32;
    let mid_x = ((left.x1 + left.x2) / 2.0) as u32;
    let pixel = output.get_pixel(mid_x, mid_y);
    assert_eq!(pixel[1], 255, "expected saturated green at lane midpoint, got {pixel:?}");

    Ok(())
}

#[test]
fn test_panicking_stage_returns_input_frame() -> anyhow::Result<()> {
    let pipeline = Pipeline::new()
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(PanickingStep));
    let detector = LaneDetector::from_pipeline(pipeline);
    let frame = lane_frame();

    let output = detector.detect_lanes(&frame);
    assert_eq!(output.as_raw(), frame.as_raw());

    Ok(())
}

#[test]
fn test_moderate_contrast_markings_yield_both_lanes() -> anyhow::Result<()> {
    // Gray 80 on black: the marking edges sit well above the 150 high threshold
    let detector = LaneDetector::default();
    let result = detector.analyze(&lane_frame_with_color(Rgb([80, 80, 80])))?;

    assert!(result.get_int("edge_pixels").unwrap_or(0) > 0);
    let left = result.lanes.left.expect("left lane");
    let right = result.lanes.right.expect("right lane");

    let tolerance = 12.0;
    for (lane, truth) in [(&left, LEFT_TRUTH), (&right, RIGHT_TRUTH)] {
        let dx1 = (lane.x1 - truth_x(truth, lane.y1)).abs();
        assert!(dx1 <= tolerance, "bottom x off by {dx1}: {lane:?}");
    }

    Ok(())
}

#[test]
fn test_black_frame_is_only_scaled_and_offset() -> anyhow::Result<()> {
    let detector = LaneDetector::default();
    let frame = black_frame(160, 120);

    let result = detector.analyze(&frame)?;
    assert!(result.segments.is_empty());
    assert!(result.lanes.is_empty());
    assert_eq!(result.get_int("segment_count"), Some(0));
    assert_eq!(result.get_bool("has_left"), Some(false));

    // 0.8 * 0 + 1
    let output = detector.detect_lanes(&frame);
    assert!(output.pixels().all(|p| p.0 == [1, 1, 1]));

    Ok(())
}

#[test]
fn test_flat_frame_blend_values() -> anyhow::Result<()> {
    let detector = LaneDetector::default();

    // 0.8 * 100 + 1 = 81, 0.8 * 255 + 1 = 205
    let gray = detector.detect_lanes(&flat_frame(40, 30, 100));
    assert!(gray.pixels().all(|p| p.0 == [81, 81, 81]));

    let white = detector.detect_lanes(&flat_frame(40, 30, 255));
    assert!(white.pixels().all(|p| p.0 == [205, 205, 205]));

    Ok(())
}

#[test]
fn test_repeated_runs_are_bit_identical() -> anyhow::Result<()> {
    let detector = LaneDetector::default();
    let frame = lane_frame();

    let first = detector.detect_lanes(&frame);
    let second = detector.detect_lanes(&frame);
    assert_eq!(first.as_raw(), second.as_raw());

    // A fresh detector gives the same answer too
    let third = LaneDetector::default().detect_lanes(&frame);
    assert_eq!(first.as_raw(), third.as_raw());

    Ok(())
}

#[test]
fn test_input_frame_is_not_modified() -> anyhow::Result<()> {
    let detector = LaneDetector::default();
    let frame = lane_frame();
    let before = frame.clone();

    let _ = detector.detect_lanes(&frame);
    assert_eq!(frame.as_raw(), before.as_raw());

    Ok(())
}

#[test]
fn test_pipeline_stage_order() -> anyhow::Result<()> {
    let detector = LaneDetector::default();
    assert_eq!(
        detector.pipeline().step_names(),
        vec![
            "Grayscale Conversion",
            "Gaussian Blur",
            "Edge Detection",
            "Region Of Interest",
            "Hough Lines",
            "Line Averaging",
            "Overlay",
        ]
    );

    // Stopping after the ROI stage leaves a masked single-channel edge map
    let partial = detector.pipeline().run_partial(lane_frame(), 4)?;
    assert!(partial.image.as_luma8().is_some());
    assert!(partial.segments.is_empty());
    assert!(matches!(partial.metadata.get("edge_pixels"), Some(MetadataValue::Int(n)) if *n > 0));

    Ok(())
}

#[test]
fn test_debug_output_writes_one_image_per_stage() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("stages");

    let detector = LaneDetector::default().with_debug(debug_dir.clone())?;
    detector.analyze(&lane_frame())?;

    let mut names: Vec<String> = std::fs::read_dir(&debug_dir)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    names.sort();

    assert_eq!(names.len(), 8);
    assert_eq!(names[0], "00_input.png");
    assert_eq!(names[4], "04_region_of_interest.png");
    assert_eq!(names[7], "07_overlay.png");

    Ok(())
}

#[test]
fn test_debug_directory_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    let result = LaneDetector::default().with_debug(dir.path().to_path_buf());
    assert!(result.is_err());

    Ok(())
}

#[test]
fn test_custom_config_changes_detection() -> anyhow::Result<()> {
    // A vote threshold no marking can reach suppresses every lane
    let mut config = LaneConfig::default();
    config.hough.threshold = 10_000;
    let detector = LaneDetector::new(config);

    let result = detector.analyze(&lane_frame())?;
    assert!(result.segments.is_empty());
    assert!(result.lanes.is_empty());

    Ok(())
}

use crate::config::{AveragingConfig, HoughConfig, OverlayConfig, RoiConfig};
use crate::detection::{averaging, hough, overlay, preprocessing, roi};
use crate::pipeline::{MetadataValue, PipelineContext, PipelineData, PipelineStep};
use anyhow::Result;
use image::DynamicImage;
use tracing::debug;

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let gray = preprocessing::to_grayscale(&data.image);
        Ok(data.with_image(DynamicImage::ImageLuma8(gray)))
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Apply the 5x5 Gaussian blur
pub struct BlurStep;

impl PipelineStep for BlurStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let gray = data.image.to_luma8();
        let blurred = preprocessing::apply_blur(&gray);
        Ok(data.with_image(DynamicImage::ImageLuma8(blurred)))
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Detect edges using Canny
pub struct EdgeDetectionStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl PipelineStep for EdgeDetectionStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let gray = data.image.to_luma8();
        let edges = preprocessing::detect_edges(&gray, self.low_threshold, self.high_threshold);
        let edge_pixels = edges.pixels().filter(|p| p[0] != 0).count() as i64;
        debug!(edge_pixels, "edge map computed");

        Ok(data
            .with_image(DynamicImage::ImageLuma8(edges))
            .with_metadata("edge_pixels", MetadataValue::Int(edge_pixels)))
    }

    fn name(&self) -> &str {
        "Edge Detection"
    }
}

/// Keep only edges inside the road triangle
pub struct RegionOfInterestStep {
    pub roi: RoiConfig,
}

impl PipelineStep for RegionOfInterestStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let edges = data.image.to_luma8();
        let masked = roi::apply_region_mask(&edges, &self.roi);
        Ok(data.with_image(DynamicImage::ImageLuma8(masked)))
    }

    fn name(&self) -> &str {
        "Region Of Interest"
    }
}

/// Probabilistic Hough over the masked edge map.
/// The working raster is passed through unchanged.
pub struct HoughLinesStep {
    pub hough: HoughConfig,
}

impl PipelineStep for HoughLinesStep {
    fn process(&self, mut data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let edges = data.image.to_luma8();
        data.segments = hough::detect_segments(&edges, &self.hough);
        debug!(segments = data.segments.len(), "hough segments detected");

        let count = data.segments.len() as i64;
        Ok(data.with_metadata("segment_count", MetadataValue::Int(count)))
    }

    fn name(&self) -> &str {
        "Hough Lines"
    }
}

/// Reduce the raw segments to at most one line per side
pub struct LineAveragingStep {
    pub averaging: AveragingConfig,
}

impl PipelineStep for LineAveragingStep {
    fn process(&self, mut data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let height = data.original.height();
        let horizon_ratio = self.averaging.horizon_ratio;
        data.lanes = averaging::average_slope_intercept(height, &data.segments, horizon_ratio);
        debug!(lanes = data.lanes.count(), "lane lines averaged");

        let has_left = data.lanes.left.is_some();
        let has_right = data.lanes.right.is_some();
        Ok(data
            .with_metadata("has_left", MetadataValue::Bool(has_left))
            .with_metadata("has_right", MetadataValue::Bool(has_right)))
    }

    fn name(&self) -> &str {
        "Line Averaging"
    }
}

/// Draw the lane lines and blend them onto the original frame
pub struct OverlayStep {
    pub overlay: OverlayConfig,
}

impl PipelineStep for OverlayStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let combined = overlay::render_overlay(&data.original, &data.lanes, &self.overlay);
        Ok(data.with_image(DynamicImage::ImageRgb8(combined)))
    }

    fn name(&self) -> &str {
        "Overlay"
    }
}

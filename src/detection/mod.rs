pub mod preprocessing;
pub mod roi;
pub mod hough;
pub mod averaging;
pub mod overlay;
pub mod steps;

use anyhow::{bail, Result};
use image::RgbImage;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, error, warn};

use crate::config::LaneConfig;
use crate::pipeline::{Pipeline, PipelineData};

/// Stateless lane detector. One instance can serve any number of frames
/// and threads; nothing is carried from one call to the next.
#[derive(Clone)]
pub struct LaneDetector {
    pipeline: Pipeline,
}

impl LaneDetector {
    pub fn new(config: LaneConfig) -> Self {
        Self::from_pipeline(build_standard_pipeline(&config))
    }

    /// Wrap a custom pipeline. Its last step must leave an RGB frame in
    /// `PipelineData::image`.
    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Save every stage's raster to `output_dir` while processing
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.pipeline = self.pipeline.with_debug(output_dir)?;
        Ok(self)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the full pipeline and keep every intermediate result
    pub fn analyze(&self, frame: &RgbImage) -> Result<PipelineData> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            bail!("cannot process an empty {}x{} frame", width, height);
        }
        self.pipeline.run(frame.clone())
    }

    /// Annotated copy of `frame`. Never fails: if any stage errors or
    /// panics, the input frame comes back unchanged.
    pub fn detect_lanes(&self, frame: &RgbImage) -> RgbImage {
        match panic::catch_unwind(AssertUnwindSafe(|| self.analyze(frame))) {
            Ok(Ok(data)) => {
                debug!(lanes = data.lanes.count(), "frame processed");
                data.image.into_rgb8()
            }
            Ok(Err(err)) => {
                warn!("Error processing frame: {err:#}");
                frame.clone()
            }
            Err(_) => {
                error!("lane pipeline panicked, returning original frame");
                frame.clone()
            }
        }
    }
}

impl Default for LaneDetector {
    fn default() -> Self {
        Self::new(LaneConfig::default())
    }
}

/// Build the standard lane pipeline using the composable pipeline system
pub fn build_standard_pipeline(config: &LaneConfig) -> Pipeline {
    use crate::detection::steps::*;
    use std::sync::Arc;

    Pipeline::new()
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(BlurStep))
        .add_step(Arc::new(EdgeDetectionStep {
            low_threshold: config.edges.low_threshold,
            high_threshold: config.edges.high_threshold,
        }))
        .add_step(Arc::new(RegionOfInterestStep { roi: config.roi.clone() }))
        .add_step(Arc::new(HoughLinesStep { hough: config.hough.clone() }))
        .add_step(Arc::new(LineAveragingStep { averaging: config.averaging.clone() }))
        .add_step(Arc::new(OverlayStep { overlay: config.overlay.clone() }))
}

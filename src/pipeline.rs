use image::{DynamicImage, RgbImage};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use tracing::debug;

use crate::models::{LaneLines, LineSegment};

/// Data that flows through the pipeline for a single frame
#[derive(Clone)]
pub struct PipelineData {
    /// Working raster of the current stage (color, grayscale or edge map)
    pub image: DynamicImage,

    /// The untouched input frame, shared with every stage
    pub original: Arc<RgbImage>,

    /// Segments found by the line detector
    pub segments: Vec<LineSegment>,

    /// Averaged lane lines
    pub lanes: LaneLines,

    /// Per-stage measurements (e.g. "edge_pixels", "segment_count")
    pub metadata: HashMap<String, MetadataValue>,
}

/// Metadata value types
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
}

impl PipelineData {
    /// Start a frame. The working raster is a private copy of the input.
    pub fn from_frame(frame: RgbImage) -> Self {
        let original = Arc::new(frame.clone());
        Self {
            image: DynamicImage::ImageRgb8(frame),
            original,
            segments: Vec::new(),
            lanes: LaneLines::default(),
            metadata: HashMap::new(),
        }
    }

    /// Replace the working raster, keeping everything else
    pub fn with_image(mut self, image: DynamicImage) -> Self {
        self.image = image;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.metadata.get(key) {
            Some(MetadataValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key) {
            Some(MetadataValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for per-stage images
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// A single stage of the lane pipeline
pub trait PipelineStep: Send + Sync {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData>;

    /// Human-readable name for this step (used in logs and debug file names)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
#[derive(Clone)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order on one frame
    pub fn run(&self, input: RgbImage) -> Result<PipelineData> {
        self.run_partial(input, self.steps.len())
    }

    /// Run only the first `num_steps` steps (useful for inspecting intermediate rasters)
    pub fn run_partial(&self, input: RgbImage, num_steps: usize) -> Result<PipelineData> {
        let mut data = PipelineData::from_frame(input);
        self.save_debug_output(&data, 0, "input")?;

        for (idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!(step = step.name(), "running step {}", idx + 1);
            data = step.process(data, &self.context)?;
            self.save_debug_output(&data, idx + 1, step.name())?;
        }

        Ok(data)
    }

    fn save_debug_output(&self, data: &PipelineData, index: usize, step_name: &str) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        let filename = format!(
            "{:02}_{}.png",
            index,
            step_name.to_lowercase().replace(' ', "_")
        );
        let output_path = debug_config.output_dir.join(&filename);
        data.image
            .save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        debug!("saved debug image {}", filename);

        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

pub mod codec;
pub mod config;
pub mod detection;
pub mod models;
pub mod pipeline;
pub mod server;

pub use config::LaneConfig;
pub use detection::LaneDetector;
pub use models::{FitParams, LaneLine, LaneLines, LaneSide, LineSegment};
pub use pipeline::{
    Pipeline, PipelineData, PipelineStep, PipelineContext, MetadataValue, DebugConfig
};

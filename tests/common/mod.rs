mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from lanesight for tests
pub use lanesight::{
    FitParams, LaneConfig, LaneDetector, LaneLine, LaneLines, LineSegment, PipelineData,
};

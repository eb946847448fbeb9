use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every tunable constant of the lane pipeline and the transport.
/// Defaults reproduce the hand-tuned values the detector was built around.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub edges: EdgeConfig,
    pub roi: RoiConfig,
    pub hough: HoughConfig,
    pub averaging: AveragingConfig,
    pub overlay: OverlayConfig,
    pub server: ServerConfig,
}

/// Canny thresholds applied after the 5x5 blur
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            low_threshold: 50.0,
            high_threshold: 150.0,
        }
    }
}

/// Triangle vertices as fractions of frame width/height.
/// The two base vertices sit on the bottom row of the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub bottom_left_x: f32,
    pub bottom_right_x: f32,
    pub apex_x: f32,
    pub apex_y: f32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            bottom_left_x: 0.2,
            bottom_right_x: 0.8,
            apex_x: 0.5,
            apex_y: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughConfig {
    /// Distance resolution in pixels
    pub rho: f64,
    /// Angle resolution in degrees
    pub theta_degrees: f64,
    /// Minimum accumulator votes for a line
    pub threshold: i32,
    pub min_line_length: i32,
    pub max_line_gap: i32,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            rho: 2.0,
            theta_degrees: 1.0,
            threshold: 100,
            min_line_length: 40,
            max_line_gap: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AveragingConfig {
    /// Upper end of the drawn lane, as a fraction of frame height
    pub horizon_ratio: f64,
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self { horizon_ratio: 0.6 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub color: [u8; 3],
    pub thickness: u32,
    pub frame_weight: f32,
    pub overlay_weight: f32,
    pub gamma: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            thickness: 10,
            frame_weight: 0.8,
            overlay_weight: 1.0,
            gamma: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Origins allowed to open a WebSocket; empty allows any
    pub allowed_origins: Vec<String>,
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5001".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            jpeg_quality: 95,
        }
    }
}

impl LaneConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: LaneConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let e = &self.edges;
        if !(e.low_threshold >= 0.0 && e.low_threshold <= e.high_threshold) {
            bail!(
                "edges: need 0 <= low_threshold <= high_threshold, got {} / {}",
                e.low_threshold,
                e.high_threshold
            );
        }

        let r = &self.roi;
        for (name, v) in [
            ("bottom_left_x", r.bottom_left_x),
            ("bottom_right_x", r.bottom_right_x),
            ("apex_x", r.apex_x),
            ("apex_y", r.apex_y),
        ] {
            if !(0.0..=1.0).contains(&v) {
                bail!("roi.{name} must be within 0..=1, got {v}");
            }
        }

        let h = &self.hough;
        if !(h.rho > 0.0 && h.rho.is_finite()) {
            bail!("hough.rho must be positive, got {}", h.rho);
        }
        if !(h.theta_degrees > 0.0 && h.theta_degrees <= 180.0) {
            bail!("hough.theta_degrees must be within (0, 180], got {}", h.theta_degrees);
        }
        if h.threshold <= 0 || h.min_line_length < 0 || h.max_line_gap < 0 {
            bail!("hough: threshold must be positive and lengths non-negative");
        }

        if !(0.0..=1.0).contains(&self.averaging.horizon_ratio) {
            bail!(
                "averaging.horizon_ratio must be within 0..=1, got {}",
                self.averaging.horizon_ratio
            );
        }

        if self.overlay.thickness == 0 {
            bail!("overlay.thickness must be at least 1");
        }
        if !(1..=100).contains(&self.server.jpeg_quality) {
            bail!("server.jpeg_quality must be within 1..=100");
        }

        Ok(())
    }
}

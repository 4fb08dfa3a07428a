//! Configuration loading for Lakshya

use crate::error::{ApproachError, Result};
use crate::geometry::FrameIds;
use crate::types::GazePosition;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LakshyaConfig {
    #[serde(default)]
    pub frames: FrameIds,
    #[serde(default)]
    pub approach: ApproachConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Standoff pose generation
#[derive(Clone, Debug, Deserialize)]
pub struct ApproachConfig {
    /// Distance kept between robot and object in meters (default: 1.0)
    #[serde(default = "default_safe_distance")]
    pub safe_distance: f64,

    /// Angle added per retry around the object in degrees (default: 30.0)
    #[serde(default = "default_increase_degrees")]
    pub increase_degrees: f64,

    /// Re-read the robot pose before each retry candidate (default: false)
    #[serde(default)]
    pub requery_robot_pose: bool,
}

impl Default for ApproachConfig {
    fn default() -> Self {
        Self {
            safe_distance: default_safe_distance(),
            increase_degrees: default_increase_degrees(),
            requery_robot_pose: false,
        }
    }
}

/// Gaze scan
#[derive(Clone, Debug, Deserialize)]
pub struct SearchConfig {
    /// Head settle time before each finder query in seconds (default: 4.0)
    #[serde(default = "default_wait_for_search")]
    pub wait_for_search_secs: f64,

    /// Wait after a positive finder reply in seconds (default: 0.5)
    #[serde(default = "default_confirm_delay")]
    pub confirm_delay_secs: f64,

    /// Head positions, scanned in order
    #[serde(default = "GazePosition::default_scan")]
    pub positions: Vec<GazePosition>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            wait_for_search_secs: default_wait_for_search(),
            confirm_delay_secs: default_confirm_delay(),
            positions: GazePosition::default_scan(),
        }
    }
}

/// Control loop timing
#[derive(Clone, Debug, Deserialize)]
pub struct TimingConfig {
    /// Control loop period in milliseconds (default: 100)
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Navigation status poll interval in milliseconds (default: 200)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

// Default value functions
fn default_safe_distance() -> f64 {
    1.0
}
fn default_increase_degrees() -> f64 {
    30.0
}
fn default_wait_for_search() -> f64 {
    4.0
}
fn default_confirm_delay() -> f64 {
    0.5
}
fn default_period_ms() -> u64 {
    100
}
fn default_poll_interval_ms() -> u64 {
    200
}

impl LakshyaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ApproachError::Config(format!("Failed to read config file: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: LakshyaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let approach = &self.approach;
        if !(approach.safe_distance > 0.0) {
            return Err(ApproachError::Config(format!(
                "safe_distance must be positive, got {}",
                approach.safe_distance
            )));
        }
        if !(approach.increase_degrees > 0.0 && approach.increase_degrees <= 180.0) {
            return Err(ApproachError::Config(format!(
                "increase_degrees must be in (0, 180], got {}",
                approach.increase_degrees
            )));
        }

        let search = &self.search;
        if search.positions.is_empty() {
            return Err(ApproachError::Config(
                "search.positions must not be empty".to_string(),
            ));
        }
        for (name, secs) in [
            ("wait_for_search_secs", search.wait_for_search_secs),
            ("confirm_delay_secs", search.confirm_delay_secs),
        ] {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(ApproachError::Config(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    name, secs
                )));
            }
        }

        if self.timing.period_ms == 0 || self.timing.poll_interval_ms == 0 {
            return Err(ApproachError::Config(
                "timing intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.search.wait_for_search_secs)
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_secs_f64(self.search.confirm_delay_secs)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.timing.period_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timing.poll_interval_ms)
    }
}

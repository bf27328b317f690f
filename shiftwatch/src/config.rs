// THEORY:
// All tunables of the monitor live in one immutable `MonitorConfig` that is
// built once (defaults, then an optional TOML file, then CLI overrides),
// validated, and handed by reference to every stage at construction time.
// No stage owns a mutable copy of a threshold.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MOTION_THRESHOLD: f64 = 25.0;
pub const DEFAULT_MIN_AREA: f64 = 1000.0;
pub const DEFAULT_KERNEL_SIZE: u32 = 5;
pub const DEFAULT_HISTORY: u32 = 500;
pub const DEFAULT_VAR_THRESHOLD: f64 = 16.0;
pub const DEFAULT_IDLE_THRESHOLD_SECS: f64 = 5.0;
pub const DEFAULT_FRAME_INTERVAL_SECS: f64 = 1.0 / 30.0;
pub const DEFAULT_DURATION_SECS: u64 = 60;

/// Top-level configuration for one monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    pub detection: DetectionConfig,
    pub background: BackgroundConfig,
    pub timing: TimingConfig,
    pub session: SessionConfig,
}

/// Blob extraction and activity classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Motion-density cutoff in percent. A blob is active when its density is
    /// strictly greater than `motion_threshold / 100`.
    pub motion_threshold: f64,
    /// Minimum contour area in pixels. Blobs with `area <= min_area` are dropped.
    pub min_area: f64,
    /// Side length of the elliptical structuring element used for noise cleanup.
    pub kernel_size: u32,
}

/// Gaussian-mixture background model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Number of frames that make up the learning window.
    pub history: u32,
    /// Squared Mahalanobis distance under which a pixel matches a background mode.
    pub var_threshold: f64,
    /// Mark shadow pixels separately so they can be dropped from the mask.
    pub detect_shadows: bool,
}

/// Time accounting for the temporal aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Continuous idle time (seconds) required before idle time starts accruing.
    pub idle_threshold_secs: f64,
    /// Fixed time credited per observed frame. Not derived from real frame timing.
    pub frame_interval_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wall-clock length of a session in seconds.
    pub duration_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
            kernel_size: DEFAULT_KERNEL_SIZE,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            history: DEFAULT_HISTORY,
            var_threshold: DEFAULT_VAR_THRESHOLD,
            detect_shadows: true,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            idle_threshold_secs: DEFAULT_IDLE_THRESHOLD_SECS,
            frame_interval_secs: DEFAULT_FRAME_INTERVAL_SECS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

impl MonitorConfig {
    /// Builds a configuration from an optional TOML file, falling back to
    /// defaults for anything the file leaves out. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a TOML file without validating it, so callers can layer
    /// overrides on top before calling [`MonitorConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: MonitorConfig = toml::from_str(&raw).map_err(|source| MonitorError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        if !d.motion_threshold.is_finite() || !(0.0..=100.0).contains(&d.motion_threshold) {
            return Err(MonitorError::Config(format!(
                "detection.motion_threshold must be within 0..=100, got {}",
                d.motion_threshold
            )));
        }
        if !d.min_area.is_finite() || d.min_area < 0.0 {
            return Err(MonitorError::Config(format!(
                "detection.min_area must be a non-negative number, got {}",
                d.min_area
            )));
        }
        if d.kernel_size == 0 || d.kernel_size % 2 == 0 {
            return Err(MonitorError::Config(format!(
                "detection.kernel_size must be odd and non-zero, got {}",
                d.kernel_size
            )));
        }

        let b = &self.background;
        if b.history == 0 {
            return Err(MonitorError::Config("background.history must be at least 1".into()));
        }
        if !b.var_threshold.is_finite() || b.var_threshold <= 0.0 {
            return Err(MonitorError::Config(format!(
                "background.var_threshold must be positive, got {}",
                b.var_threshold
            )));
        }

        let t = &self.timing;
        if !t.idle_threshold_secs.is_finite() || t.idle_threshold_secs < 0.0 {
            return Err(MonitorError::Config(format!(
                "timing.idle_threshold_secs must be non-negative, got {}",
                t.idle_threshold_secs
            )));
        }
        if !t.frame_interval_secs.is_finite() || t.frame_interval_secs <= 0.0 {
            return Err(MonitorError::Config(format!(
                "timing.frame_interval_secs must be positive, got {}",
                t.frame_interval_secs
            )));
        }

        if self.session.duration_secs == 0 {
            return Err(MonitorError::Config("session.duration_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session.duration_secs)
    }

    /// The density above which a blob counts as active (`motion_threshold / 100`).
    pub fn motion_cutoff(&self) -> f64 {
        self.detection.motion_threshold / 100.0
    }
}

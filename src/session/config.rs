use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::foundation::core::Fps;
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::time::rate::Ease;

/// Session-wide defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Frame rate used for frame/time conversions.
    pub fps: Fps,
    /// Run time of animations that do not set one, in seconds.
    pub default_run_time: f64,
    /// Rate curve of animations that do not set one.
    pub default_rate: Ease,
    /// Lag ratio of animation groups that do not set one.
    pub default_lag_ratio: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            default_run_time: 1.0,
            default_rate: Ease::Smooth,
            default_lag_ratio: 0.0,
        }
    }
}

impl TimelineConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> KinemaResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| KinemaError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load, parse and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> KinemaResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            KinemaError::validation(format!("open timeline config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Parse and validate a JSON config from a reader.
    pub fn from_reader(r: impl Read) -> KinemaResult<Self> {
        let cfg: Self = serde_json::from_reader(r).map_err(|e| KinemaError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> KinemaResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| KinemaError::serde(e.to_string()))
    }

    /// Check value ranges.
    pub fn validate(&self) -> KinemaResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if !(self.default_run_time.is_finite() && self.default_run_time > 0.0) {
            return Err(KinemaError::validation(
                "default_run_time must be finite and > 0",
            ));
        }
        if !(self.default_lag_ratio.is_finite() && self.default_lag_ratio >= 0.0) {
            return Err(KinemaError::validation(
                "default_lag_ratio must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;

//! Tracker configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::tracker::kalman_filter::KalmanConfig;

/// Configuration for the BYTETracker.
///
/// Field names serialize in kebab-case (`frame-rate`, `track-buffer`, ...).
/// The first five fields are required when loading from JSON; the rest fall
/// back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackerConfig {
    pub frame_rate: u32,
    /// Frames a lost track is retained at 30 fps
    pub track_buffer: u32,
    /// Weight of the previous size in the (w, h) low-pass filter
    pub wh_smooth_factor: f32,
    /// Detections at or above this score take part in the first association
    pub track_thresh: f32,
    /// Minimum score for a leftover detection to start a new track
    pub high_thresh: f32,
    /// Cost ceiling (1 - IoU) of the first association
    #[serde(default = "default_match_thresh")]
    pub match_thresh: f32,
    /// Detections at or below this score are ignored entirely
    #[serde(default = "default_low_thresh")]
    pub low_thresh: f32,
    #[serde(default)]
    pub kalman: KalmanConfig,
}

fn default_match_thresh() -> f32 {
    0.8
}

fn default_low_thresh() -> f32 {
    0.1
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            track_buffer: 30,
            wh_smooth_factor: 0.9,
            track_thresh: 0.5,
            high_thresh: 0.6,
            match_thresh: default_match_thresh(),
            low_thresh: default_low_thresh(),
            kalman: KalmanConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Frames a lost track is kept before it is retired.
    pub fn max_time_lost(&self) -> u32 {
        (self.frame_rate as f32 / 30.0 * self.track_buffer as f32) as u32
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(TrackerError::invalid_config("frame-rate must be positive"));
        }

        let unit = [
            ("wh-smooth-factor", self.wh_smooth_factor),
            ("track-thresh", self.track_thresh),
            ("high-thresh", self.high_thresh),
            ("match-thresh", self.match_thresh),
            ("low-thresh", self.low_thresh),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::invalid_config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.high_thresh < self.track_thresh {
            return Err(TrackerError::invalid_config(format!(
                "high-thresh ({}) must not be below track-thresh ({})",
                self.high_thresh, self.track_thresh
            )));
        }
        if self.low_thresh > self.track_thresh {
            return Err(TrackerError::invalid_config(format!(
                "low-thresh ({}) must not exceed track-thresh ({})",
                self.low_thresh, self.track_thresh
            )));
        }

        let weights = [
            ("std-weight-position", self.kalman.std_weight_position),
            ("std-weight-velocity", self.kalman.std_weight_velocity),
        ];
        for (name, value) in weights {
            if !(value.is_finite() && value > 0.0) {
                return Err(TrackerError::invalid_config(format!(
                    "kalman {name} must be finite and positive, got {value}"
                )));
            }
        }

        Ok(())
    }
}

use crate::domain::time_range::DEFAULT_DURATION_MINUTES;
use serde::{Deserialize, Serialize};

/// Numeric knobs for the hour window and the block layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineConfig {
    /// Pixels per hour.
    pub hour_height: f64,
    /// Floor for a block's rendered height.
    pub min_block_height: f64,
    pub default_duration_min: u32,
    pub default_start_hour: u32,
    pub default_end_hour: u32,
    pub padding_hours: u32,
    pub min_visible_hours: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            hour_height: 60.0,
            min_block_height: 44.0,
            default_duration_min: DEFAULT_DURATION_MINUTES,
            default_start_hour: 8,
            default_end_hour: 20,
            padding_hours: 1,
            min_visible_hours: 4,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.hour_height.is_finite() || self.hour_height <= 0.0 {
            return Err("timeline.hour_height must be > 0".to_string());
        }
        if !self.min_block_height.is_finite() || self.min_block_height < 0.0 {
            return Err("timeline.min_block_height must be >= 0".to_string());
        }
        if self.default_duration_min == 0 || self.default_duration_min > 1440 {
            return Err("timeline.default_duration_min must be in 1..=1440".to_string());
        }
        if self.padding_hours > 24 {
            return Err("timeline.padding_hours must be <= 24".to_string());
        }
        if self.default_start_hour >= self.default_end_hour {
            return Err("timeline.default_start_hour must be < timeline.default_end_hour".to_string());
        }
        if self.default_end_hour > 24 {
            return Err("timeline.default_end_hour must be <= 24".to_string());
        }
        if self.min_visible_hours == 0 || self.min_visible_hours > 24 {
            return Err("timeline.min_visible_hours must be in 1..=24".to_string());
        }
        Ok(())
    }

    pub fn pixels_per_minute(&self) -> f64 {
        self.hour_height / 60.0
    }
}

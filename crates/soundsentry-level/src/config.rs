use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_RATE_HZ};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// dB level above which the alarm fires
    pub threshold_db: f32,
    /// Minimum spacing between two alarms, in seconds
    pub cooldown_secs: f32,
    /// Audio sampling rate
    pub sample_rate_hz: u32,
    /// Samples per buffer read
    pub chunk_size: usize,
    /// Seconds between level checks
    pub update_interval_secs: f32,
    /// Seconds the alarm tone plays
    pub alarm_duration_secs: f32,
    /// Input device index; None selects the host default
    pub device_index: Option<usize>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold_db: 70.0,
            cooldown_secs: 3.0,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            chunk_size: DEFAULT_CHUNK_SIZE,
            update_interval_secs: 0.5,
            alarm_duration_secs: 1.0,
            device_index: None,
        }
    }
}

impl MonitorConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs_f32(self.update_interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f32(self.cooldown_secs)
    }

    pub fn alarm_duration(&self) -> Duration {
        Duration::from_secs_f32(self.alarm_duration_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold_db.is_finite() || self.threshold_db < 0.0 {
            return Err(format!("threshold_db must be finite and >= 0, got {}", self.threshold_db));
        }
        if !self.cooldown_secs.is_finite() || self.cooldown_secs < 0.0 {
            return Err(format!("cooldown_secs must be finite and >= 0, got {}", self.cooldown_secs));
        }
        if !self.update_interval_secs.is_finite() || self.update_interval_secs <= 0.0 {
            return Err(format!(
                "update_interval_secs must be finite and > 0, got {}",
                self.update_interval_secs
            ));
        }
        if !self.alarm_duration_secs.is_finite() || self.alarm_duration_secs <= 0.0 {
            return Err(format!(
                "alarm_duration_secs must be finite and > 0, got {}",
                self.alarm_duration_secs
            ));
        }
        if self.chunk_size == 0 {
            return Err("chunk_size must be non-zero".to_string());
        }
        if self.sample_rate_hz == 0 {
            return Err("sample_rate_hz must be non-zero".to_string());
        }
        Ok(())
    }
}

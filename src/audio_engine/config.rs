//! Engine configuration.
//!
//! Every field has a documented default, so a partial (or empty) JSON document is a
//! valid configuration. Values are clamped into range by [`EngineConfig::sanitized`]
//! before the engine uses them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio_engine::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_MAX_VOICES, DELAY_CAPACITY_SECONDS, DELAY_FEEDBACK,
    DELAY_OUTPUT_GAIN, DELAY_TAP_SECONDS, FEEDBACK_MAX, REVERB_CAPACITY_SECONDS,
    REVERB_FEEDBACK, REVERB_OUTPUT_GAIN, REVERB_TAP_SECONDS, SAMPLE_RATE,
};
use crate::audio_engine::errors::ConfigError;

/// Parameters of one feedback line (delay or reverb).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectLineConfig {
    /// Length of the circular buffer in seconds.
    pub capacity_seconds: f32,
    /// Distance of the read tap behind the write cursor, in seconds.
    pub tap_seconds: f32,
    /// Gain applied to the tapped signal when it is written back.
    pub feedback: f32,
    /// Gain applied to the tapped signal when it is added to the output.
    pub output_gain: f32,
}

impl EffectLineConfig {
    /// Default delay settings.
    pub fn delay() -> Self {
        Self {
            capacity_seconds: DELAY_CAPACITY_SECONDS,
            tap_seconds: DELAY_TAP_SECONDS,
            feedback: DELAY_FEEDBACK,
            output_gain: DELAY_OUTPUT_GAIN,
        }
    }

    /// Default reverb settings.
    pub fn reverb() -> Self {
        Self {
            capacity_seconds: REVERB_CAPACITY_SECONDS,
            tap_seconds: REVERB_TAP_SECONDS,
            feedback: REVERB_FEEDBACK,
            output_gain: REVERB_OUTPUT_GAIN,
        }
    }

    /// Buffer length in frames at the engine sample rate (at least one frame).
    pub fn capacity_frames(&self) -> usize {
        whole_frames(self.capacity_seconds).max(1)
    }

    /// Tap distance in frames, kept within `1..=capacity_frames`.
    pub fn tap_frames(&self) -> usize {
        whole_frames(self.tap_seconds).clamp(1, self.capacity_frames())
    }

    fn sanitized(self, fallback: Self) -> Self {
        let finite_or = |value: f32, default: f32| if value.is_finite() { value } else { default };
        Self {
            capacity_seconds: finite_or(self.capacity_seconds, fallback.capacity_seconds).max(0.0),
            tap_seconds: finite_or(self.tap_seconds, fallback.tap_seconds).max(0.0),
            feedback: finite_or(self.feedback, fallback.feedback).clamp(0.0, FEEDBACK_MAX),
            output_gain: finite_or(self.output_gain, fallback.output_gain).max(0.0),
        }
    }
}

impl Default for EffectLineConfig {
    fn default() -> Self {
        Self::delay()
    }
}

/// Runtime configuration of an [`Engine`](crate::audio_engine::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Preferred device block size; also the size of the pre-allocated scratch buses.
    pub block_size: usize,
    /// Number of voice slots in the render context.
    pub max_voices: usize,
    /// Apply `tanh` saturation to the final mix.
    pub soft_clip: bool,
    /// Delay line settings.
    pub delay: EffectLineConfig,
    /// Reverb line settings.
    pub reverb: EffectLineConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_voices: DEFAULT_MAX_VOICES,
            soft_clip: false,
            delay: EffectLineConfig::delay(),
            reverb: EffectLineConfig::reverb(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Returns a copy with every value clamped into its valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            block_size: self.block_size.max(1),
            max_voices: self.max_voices.max(1),
            soft_clip: self.soft_clip,
            delay: self.delay.sanitized(EffectLineConfig::delay()),
            reverb: self.reverb.sanitized(EffectLineConfig::reverb()),
        }
    }
}

/// Converts seconds to whole frames at the engine sample rate, rounding to nearest.
pub fn seconds_to_frames(seconds: f32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (f64::from(seconds) * f64::from(SAMPLE_RATE)).round() as usize
}

// Effect line lengths truncate, like the tap arithmetic of the device backends.
fn whole_frames(seconds: f32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (f64::from(seconds) * f64::from(SAMPLE_RATE)) as usize
}

//! Serializable pad state and engine snapshots.
//!
//! The snapshot is the engine's sub-document of a session file. It is versioned and every
//! field defaults when missing, so older and newer session files load without special cases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::audio_engine::errors::StateError;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Per-pad processing applied to the raw sample to obtain the playable one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadProcessingState {
    /// Trim start as a fraction of the raw sample length.
    pub trim_start: f64,
    /// Trim end as a fraction of the raw sample length.
    pub trim_end: f64,
    /// Play the trimmed slice backwards.
    pub reverse: bool,
    /// Scale the slice to a fixed peak.
    pub normalized: bool,
}

impl Default for PadProcessingState {
    fn default() -> Self {
        Self {
            trim_start: 0.0,
            trim_end: 1.0,
            reverse: false,
            normalized: false,
        }
    }
}

impl PadProcessingState {
    /// Returns a copy with both trim points clamped into `[0, 1]`.
    ///
    /// Non-finite trim points fall back to the full range.
    pub fn clamped(self) -> Self {
        let clamp = |value: f64, default: f64| {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                default
            }
        };
        Self {
            trim_start: clamp(self.trim_start, 0.0),
            trim_end: clamp(self.trim_end, 1.0),
            ..self
        }
    }
}

/// Snapshot of every loaded pad: its source file and processing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSnapshot {
    pub version: u32,
    pub paths: BTreeMap<usize, String>,
    pub states: BTreeMap<usize, PadProcessingState>,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            paths: BTreeMap::new(),
            states: BTreeMap::new(),
        }
    }
}

impl EngineSnapshot {
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }
}

//! Voice management for real-time audio mixing.
//!
//! This module provides the [`Voice`] struct which represents a single playing
//! pad sample with its current playback state, and the [`VoiceRequest`] the control
//! context sends to start one.
//!
//! Voices are managed by the [`VoiceMixer`](crate::audio_engine::mixer::VoiceMixer) and
//! represent individual instances of playing samples with independent read cursors, gains
//! and effect sends.

use crate::audio_engine::config::seconds_to_frames;
use crate::audio_engine::constants::clamp_level;
use crate::messages::SampleBuffer;

/// Parameters of a pad trigger, resolved on the control side.
#[derive(Debug, Clone)]
pub struct VoiceRequest {
    /// Pad that was triggered.
    pub pad_id: usize,
    /// Processed sample current at trigger time.
    pub sample: SampleBuffer,
    /// Linear gain (0.0 to 1.0).
    pub gain: f32,
    /// Reverb send level (0.0 to 1.0).
    pub reverb_send: f32,
    /// Delay send level (0.0 to 1.0).
    pub delay_send: f32,
    /// Frames to wait before the first sample is mixed.
    pub start_delay_frames: usize,
}

impl VoiceRequest {
    /// Builds a request, clamping levels into range and converting the start offset to frames.
    pub fn new(
        pad_id: usize,
        sample: SampleBuffer,
        velocity: f32,
        reverb_send: f32,
        delay_send: f32,
        start_offset_seconds: f32,
    ) -> Self {
        Self {
            pad_id,
            sample,
            gain: clamp_level(velocity),
            reverb_send: clamp_level(reverb_send),
            delay_send: clamp_level(delay_send),
            start_delay_frames: seconds_to_frames(start_offset_seconds),
        }
    }
}

/// A single voice in the mixer, representing a playing pad sample.
#[derive(Debug)]
pub struct Voice {
    /// ID of the pad being played.
    pub pad_id: usize,

    /// The sample buffer being played.
    pub sample: SampleBuffer,

    /// Current playback position in frames.
    pub read_position: usize,

    /// Gain multiplier for this voice (0.0 to 1.0).
    pub gain: f32,

    /// Reverb send level (0.0 to 1.0).
    pub reverb_send: f32,

    /// Delay send level (0.0 to 1.0).
    pub delay_send: f32,

    /// Frames remaining before playback begins.
    pub start_delay_frames: usize,
}

impl Voice {
    /// Creates a voice positioned at the start of its sample.
    pub fn new(request: VoiceRequest) -> Self {
        Self {
            pad_id: request.pad_id,
            sample: request.sample,
            read_position: 0,
            gain: request.gain,
            reverb_send: request.reverb_send,
            delay_send: request.delay_send,
            start_delay_frames: request.start_delay_frames,
        }
    }

    /// Frames left to play.
    pub fn remaining_frames(&self) -> usize {
        self.sample.frames().saturating_sub(self.read_position)
    }

    /// Whether the voice has played its whole sample.
    pub fn is_finished(&self) -> bool {
        self.remaining_frames() == 0
    }
}

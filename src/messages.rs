//! Message definitions for communication between the control and real-time audio threads.
//!
//! This module defines the enums that serve as the wire format for messages passed through the
//! ring buffers between the control context and the render callback.

use std::sync::Arc;

use crate::audio_engine::voice::VoiceRequest;

/// Immutable interleaved sample data shared between the sample store and playing voices.
///
/// Cloning is a reference-count bump; the data is freed when the last handle drops.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub channels: usize,
    pub samples: Arc<[f32]>,
}

impl SampleBuffer {
    /// Wraps interleaved samples.
    pub fn new(channels: usize, samples: Vec<f32>) -> Self {
        Self {
            channels,
            samples: Arc::from(samples.into_boxed_slice()),
        }
    }

    /// Number of frames in the buffer.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// Whether this handle is the only one keeping the data alive.
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.samples) == 1
    }
}

/// Message that is emitted from the audio thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioMessage {
    /// The driver flagged an underrun/overrun for the given callback.
    DeviceStatus { callback: u64 },

    /// A trigger arrived while every voice slot was busy and was discarded.
    VoiceDropped { pad_id: usize },

    /// The driver asked for more frames than the scratch buses hold; the block was chunked.
    OversizeBlock { frames: usize, chunk: usize },

    /// All voices were flushed in response to [`ControlMessage::StopAll`].
    Flushed { voices: usize },
}

/// Message that is emitted from the control side.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Start a new voice.
    ///
    /// The request carries the sample buffer that was current when the pad was triggered.
    Trigger(VoiceRequest),

    /// Silence and release every active voice.
    StopAll(),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_buffer_frames() {
        let buffer = SampleBuffer::new(2, vec![0.0; 10]);
        assert_eq!(buffer.frames(), 5);

        let empty = SampleBuffer::new(0, vec![]);
        assert_eq!(empty.frames(), 0);
    }

    #[test]
    fn test_sample_buffer_uniqueness() {
        let buffer = SampleBuffer::new(2, vec![0.5, -0.5]);
        assert!(buffer.is_unique());

        let shared = buffer.clone();
        assert!(!buffer.is_unique());
        drop(shared);
        assert!(buffer.is_unique());
    }
}

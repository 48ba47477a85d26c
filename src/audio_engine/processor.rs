//! Derives a pad's playable sample from its raw sample and processing state.

use crate::audio_engine::constants::{NORMALIZE_PEAK, WAVEFORM_SCALE};
use crate::audio_engine::snapshot::PadProcessingState;
use crate::messages::SampleBuffer;

/// Frame range `[start, end)` selected by the trim points.
///
/// An empty or inverted selection falls back to the whole sample.
pub fn trim_range(frames: usize, state: &PadProcessingState) -> (usize, usize) {
    let start = (frames as f64 * state.trim_start).floor() as usize;
    let end = (frames as f64 * state.trim_end).floor() as usize;
    let end = end.min(frames);

    if start >= end { (0, frames) } else { (start, end) }
}

/// Applies trim, reverse and normalize (in that order) to `raw`.
pub fn process_sample(raw: &SampleBuffer, state: &PadProcessingState) -> SampleBuffer {
    let channels = raw.channels.max(1);
    let (start, end) = trim_range(raw.frames(), state);

    let mut samples = raw.samples[start * channels..end * channels].to_vec();

    if state.reverse {
        reverse_frames(&mut samples, channels);
    }

    if state.normalized {
        normalize(&mut samples, NORMALIZE_PEAK);
    }

    SampleBuffer::new(channels, samples)
}

/// Reverses the frame order of interleaved samples, keeping channels in place.
pub fn reverse_frames(samples: &mut [f32], channels: usize) {
    let frames = samples.len() / channels;
    for i in 0..frames / 2 {
        let j = frames - 1 - i;
        for ch in 0..channels {
            samples.swap(i * channels + ch, j * channels + ch);
        }
    }
}

/// Scales all samples uniformly so the peak absolute amplitude equals `peak`.
///
/// Silent input is left untouched.
pub fn normalize(samples: &mut [f32], peak: f32) {
    let max = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if max <= 0.0 || !max.is_finite() {
        return;
    }

    let gain = peak / max;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

/// Renders samples to the 16-bit range used by waveform displays.
pub fn to_waveform(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s * WAVEFORM_SCALE) as i16)
        .collect()
}

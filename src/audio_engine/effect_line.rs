//! Fixed-capacity feedback lines used for the delay and reverb effects.
//!
//! Both effects are the same structure: a circular stereo buffer with a read tap a fixed
//! distance behind the write cursor. Each frame the tapped value is read first, the send
//! input plus the tapped value times `feedback` is written, and the tapped value (scaled by
//! `output_gain`) is added to the output. The "reverb" is this single tap with a short
//! distance and high feedback.

use crate::audio_engine::config::EffectLineConfig;
use crate::audio_engine::constants::{CHANNELS, FEEDBACK_MAX};

pub struct FeedbackLine {
    buffer: Vec<f32>,
    capacity_frames: usize,
    write_cursor: usize,
    tap_frames: usize,
    feedback: f32,
    output_gain: f32,
}

impl FeedbackLine {
    /// Creates a silent line. `tap_frames` is kept within `1..=capacity_frames`.
    pub fn new(capacity_frames: usize, tap_frames: usize, feedback: f32, output_gain: f32) -> Self {
        let capacity_frames = capacity_frames.max(1);
        Self {
            buffer: vec![0.0; capacity_frames * CHANNELS],
            capacity_frames,
            write_cursor: 0,
            tap_frames: tap_frames.clamp(1, capacity_frames),
            feedback: if feedback.is_finite() {
                feedback.clamp(0.0, FEEDBACK_MAX)
            } else {
                0.0
            },
            output_gain,
        }
    }

    pub fn from_config(config: &EffectLineConfig) -> Self {
        Self::new(
            config.capacity_frames(),
            config.tap_frames(),
            config.feedback,
            config.output_gain,
        )
    }

    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    pub fn tap_frames(&self) -> usize {
        self.tap_frames
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Feeds `input` (interleaved stereo send bus) through the line and adds the tapped
    /// signal to `output`.
    ///
    /// The block is worked in chunks no longer than the tap distance so that a short tap
    /// reads what this same block wrote, exactly as a frame-by-frame line would.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let frames = input.len().min(output.len()) / CHANNELS;

        let mut done = 0;
        while done < frames {
            let chunk = (frames - done).min(self.tap_frames);
            let range = done * CHANNELS..(done + chunk) * CHANNELS;
            self.process_chunk(&input[range.clone()], &mut output[range], chunk);
            done += chunk;
        }
    }

    fn process_chunk(&mut self, input: &[f32], output: &mut [f32], frames: usize) {
        let capacity = self.capacity_frames;
        let mut read_pos = (self.write_cursor + capacity - self.tap_frames) % capacity;
        let mut write_pos = self.write_cursor;

        // Contiguous runs: a run ends wherever the read or the write side wraps.
        let mut done = 0;
        while done < frames {
            let run = (frames - done)
                .min(capacity - read_pos)
                .min(capacity - write_pos);

            let src = read_pos * CHANNELS;
            let dst = write_pos * CHANNELS;
            let io = done * CHANNELS;
            for i in 0..run * CHANNELS {
                let tapped = self.buffer[src + i];
                self.buffer[dst + i] = input[io + i] + tapped * self.feedback;
                output[io + i] += tapped * self.output_gain;
            }

            done += run;
            read_pos = (read_pos + run) % capacity;
            write_pos = (write_pos + run) % capacity;
        }

        self.write_cursor = write_pos;
    }

    #[cfg(test)]
    fn seek(&mut self, write_cursor: usize) {
        self.write_cursor = write_cursor % self.capacity_frames;
    }
}

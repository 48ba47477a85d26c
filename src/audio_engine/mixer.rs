//! Real-time voice mixer.
//!
//! This module provides the [`VoiceMixer`] which owns every sounding
//! [`Voice`](crate::audio_engine::voice::Voice) and renders them, per block, into a dry bus and
//! two effect send buses. The mixer lives on the render context; the control context only
//! reaches it through [`ControlMessage`](crate::messages::ControlMessage)s drained by the
//! render callback.
//!
//! All storage (voice slots and buses) is allocated in [`VoiceMixer::new`]; rendering never
//! allocates.

use rtrb::Producer;

use crate::audio_engine::constants::CHANNELS;
use crate::audio_engine::voice::{Voice, VoiceRequest};
use crate::messages::SampleBuffer;

/// Interleaved stereo buses produced by one [`VoiceMixer::render_block`] call.
pub struct MixBuses<'a> {
    /// Sum of every voice scaled by its gain.
    pub dry: &'a [f32],
    /// Sum of every voice scaled by gain and reverb send.
    pub reverb: &'a [f32],
    /// Sum of every voice scaled by gain and delay send.
    pub delay: &'a [f32],
}

/// Fixed-capacity polyphonic sample mixer.
pub struct VoiceMixer {
    /// Largest block, in frames, the buses can hold.
    capacity_frames: usize,

    /// Voice pool; `None` marks a free slot.
    voices: Vec<Option<Voice>>,

    dry: Vec<f32>,
    reverb: Vec<f32>,
    delay: Vec<f32>,

    /// Hands the buffers of finished and rejected voices back to the control context.
    retired: Option<Producer<SampleBuffer>>,
}

impl VoiceMixer {
    /// Creates a mixer with `max_voices` slots and buses sized for `capacity_frames` frames.
    pub fn new(max_voices: usize, capacity_frames: usize) -> Self {
        let capacity_frames = capacity_frames.max(1);
        Self {
            capacity_frames,
            voices: std::iter::repeat_with(|| None).take(max_voices.max(1)).collect(),
            dry: vec![0.0; capacity_frames * CHANNELS],
            reverb: vec![0.0; capacity_frames * CHANNELS],
            delay: vec![0.0; capacity_frames * CHANNELS],
            retired: None,
        }
    }

    /// Routes released sample buffers to `retired` instead of freeing them on this thread.
    pub fn with_retired_sink(mut self, retired: Producer<SampleBuffer>) -> Self {
        self.retired = Some(retired);
        self
    }

    /// Largest number of frames a single [`render_block`](Self::render_block) call renders.
    pub fn capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    /// Number of voices currently sounding or waiting for their start offset.
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    /// Starts a voice in the first free slot.
    ///
    /// Hands the request back when every slot is busy or the sample is unusable, so the
    /// caller can retire its buffer.
    pub fn start_voice(&mut self, request: VoiceRequest) -> Result<(), VoiceRequest> {
        if request.sample.channels != CHANNELS || request.sample.frames() == 0 {
            return Err(request);
        }

        match self.voices.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(Voice::new(request));
                Ok(())
            }
            // No free voice slot: drop deterministically.
            None => Err(request),
        }
    }

    /// Passes `sample` to the retired sink, if one is attached.
    pub fn retire_sample(&mut self, sample: SampleBuffer) {
        retire(&mut self.retired, sample);
    }

    /// Stops all active voices, returning how many were sounding.
    pub fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for slot in &mut self.voices {
            if let Some(voice) = slot.take() {
                retire(&mut self.retired, voice.sample);
                stopped += 1;
            }
        }
        stopped
    }

    /// Mixes the next `frames` frames of every voice.
    ///
    /// `frames` is capped at [`capacity_frames`](Self::capacity_frames). A voice whose start
    /// offset lies beyond this block only counts its offset down; a voice starting inside the
    /// block is mixed from its offset to the block end; a voice that reaches the end of its
    /// sample is released.
    pub fn render_block(&mut self, frames: usize) -> MixBuses<'_> {
        let frames = frames.min(self.capacity_frames);
        let len = frames * CHANNELS;

        let Self {
            voices,
            dry,
            reverb,
            delay,
            retired,
            ..
        } = self;

        dry[..len].fill(0.0);
        reverb[..len].fill(0.0);
        delay[..len].fill(0.0);

        for slot in voices.iter_mut() {
            let Some(voice) = slot.as_mut() else {
                continue;
            };

            if voice.start_delay_frames >= frames {
                voice.start_delay_frames -= frames;
                continue;
            }

            let offset = voice.start_delay_frames;
            voice.start_delay_frames = 0;

            let count = (frames - offset).min(voice.remaining_frames());
            let src_start = voice.read_position * CHANNELS;
            let src = &voice.sample.samples[src_start..src_start + count * CHANNELS];
            let dst = offset * CHANNELS..(offset + count) * CHANNELS;

            for (((d, r), e), s) in dry[dst.clone()]
                .iter_mut()
                .zip(&mut reverb[dst.clone()])
                .zip(&mut delay[dst])
                .zip(src)
            {
                let chunk = s * voice.gain;
                *d += chunk;
                *r += chunk * voice.reverb_send;
                *e += chunk * voice.delay_send;
            }

            voice.read_position += count;

            if voice.is_finished() {
                if let Some(voice) = slot.take() {
                    retire(retired, voice.sample);
                }
            }
        }

        MixBuses {
            dry: &dry[..len],
            reverb: &reverb[..len],
            delay: &delay[..len],
        }
    }
}

fn retire(retired: &mut Option<Producer<SampleBuffer>>, sample: SampleBuffer) {
    // Whether this is the last reference is only known once the control side drops it.
    if let Some(producer) = retired {
        // A full ring leaves the buffer to be freed here.
        let _ = producer.push(sample);
    }
}

#[cfg(test)]
mod tests {
    use rtrb::RingBuffer;

    use super::*;

    fn constant_sample(frames: usize, value: f32) -> SampleBuffer {
        SampleBuffer::new(CHANNELS, vec![value; frames * CHANNELS])
    }

    fn ramp_sample(frames: usize) -> SampleBuffer {
        let samples = (0..frames * CHANNELS)
            .map(|i| i as f32 / (frames * CHANNELS) as f32)
            .collect();
        SampleBuffer::new(CHANNELS, samples)
    }

    fn request(sample: &SampleBuffer, gain: f32) -> VoiceRequest {
        VoiceRequest::new(0, sample.clone(), gain, 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_mixer_creation() {
        let mixer = VoiceMixer::new(8, 256);
        assert_eq!(mixer.capacity_frames(), 256);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_render_silence() {
        let mut mixer = VoiceMixer::new(8, 100);
        let buses = mixer.render_block(100);

        assert_eq!(buses.dry.len(), 200);
        assert!(buses.dry.iter().all(|&s| s == 0.0));
        assert!(buses.reverb.iter().all(|&s| s == 0.0));
        assert!(buses.delay.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_applies_gain_and_sends() {
        let mut mixer = VoiceMixer::new(8, 16);
        let sample = constant_sample(16, 0.5);
        mixer.start_voice(VoiceRequest::new(0, sample, 0.5, 0.5, 1.0, 0.0)).unwrap();

        let buses = mixer.render_block(16);
        assert!(buses.dry.iter().all(|&s| (s - 0.25).abs() < 1e-6));
        assert!(buses.reverb.iter().all(|&s| (s - 0.125).abs() < 1e-6));
        assert!(buses.delay.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_voice_is_released_when_sample_ends() {
        let mut mixer = VoiceMixer::new(8, 16);
        mixer.start_voice(request(&constant_sample(10, 0.5), 1.0)).unwrap();

        let buses = mixer.render_block(16);
        assert!(buses.dry[..20].iter().all(|&s| s == 0.5));
        assert!(buses.dry[20..].iter().all(|&s| s == 0.0));
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_voice_spans_blocks() {
        let sample = ramp_sample(24);
        let mut mixer = VoiceMixer::new(8, 10);
        mixer.start_voice(request(&sample, 1.0)).unwrap();

        let mut rendered = Vec::new();
        for _ in 0..3 {
            rendered.extend_from_slice(mixer.render_block(10).dry);
        }

        assert_eq!(&rendered[..48], &sample.samples[..]);
        assert!(rendered[48..].iter().all(|&s| s == 0.0));
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_partial_start_delay_mixes_from_offset() {
        let sample = constant_sample(100, 1.0);
        let mut mixer = VoiceMixer::new(8, 8);
        let mut req = request(&sample, 1.0);
        req.start_delay_frames = 3;
        mixer.start_voice(req).unwrap();

        let buses = mixer.render_block(8);
        assert!(buses.dry[..6].iter().all(|&s| s == 0.0));
        assert!(buses.dry[6..].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_start_delay_beyond_block_is_counted_down() {
        let sample = ramp_sample(20);
        let mut mixer = VoiceMixer::new(8, 8);
        let mut req = request(&sample, 1.0);
        req.start_delay_frames = 11;
        mixer.start_voice(req).unwrap();

        let first = mixer.render_block(8).dry.to_vec();
        assert!(first.iter().all(|&s| s == 0.0));
        assert_eq!(mixer.active_voices(), 1);

        let second = mixer.render_block(8).dry.to_vec();
        assert!(second[..6].iter().all(|&s| s == 0.0));
        assert_eq!(&second[6..], &sample.samples[..10]);
    }

    #[test]
    fn test_same_pad_twice_is_additive() {
        let sample = ramp_sample(32);

        let mut single = VoiceMixer::new(8, 32);
        single.start_voice(request(&sample, 0.7)).unwrap();
        let alone = single.render_block(32).dry.to_vec();

        let mut double = VoiceMixer::new(8, 32);
        double.start_voice(request(&sample, 0.7)).unwrap();
        double.start_voice(request(&sample, 0.7)).unwrap();
        let both = double.render_block(32).dry.to_vec();

        for (a, b) in alone.iter().zip(&both) {
            assert_eq!(a + a, *b);
        }
    }

    #[test]
    fn test_voice_limit() {
        let mut mixer = VoiceMixer::new(4, 16);
        let sample = constant_sample(100, 0.1);

        let started = (0..6)
            .filter(|_| mixer.start_voice(request(&sample, 1.0)).is_ok())
            .count();

        assert_eq!(started, 4);
        assert_eq!(mixer.active_voices(), 4);
    }

    #[test]
    fn test_rejects_empty_sample() {
        let mut mixer = VoiceMixer::new(4, 16);
        let rejected = mixer
            .start_voice(request(&SampleBuffer::new(CHANNELS, vec![]), 1.0))
            .unwrap_err();
        assert_eq!(rejected.sample.frames(), 0);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_stop_all() {
        let mut mixer = VoiceMixer::new(4, 16);
        let sample = constant_sample(100, 0.1);
        mixer.start_voice(request(&sample, 1.0)).unwrap();
        mixer.start_voice(request(&sample, 1.0)).unwrap();

        assert_eq!(mixer.stop_all(), 2);
        assert_eq!(mixer.active_voices(), 0);
        assert!(mixer.render_block(16).dry.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_block_caps_at_capacity() {
        let mut mixer = VoiceMixer::new(4, 8);
        assert_eq!(mixer.render_block(100).dry.len(), 16);
    }

    #[test]
    fn test_every_finished_buffer_is_retired() {
        let (producer, mut consumer) = RingBuffer::new(4);
        let mut mixer = VoiceMixer::new(4, 16).with_retired_sink(producer);

        // The store still owns this one.
        let kept = constant_sample(4, 0.1);
        mixer.start_voice(request(&kept, 1.0)).unwrap();
        // Nobody else owns this one.
        mixer
            .start_voice(request(&constant_sample(4, 0.2), 1.0))
            .unwrap();

        mixer.render_block(16);
        assert_eq!(mixer.active_voices(), 0);

        let first = consumer.pop().unwrap();
        let second = consumer.pop().unwrap();
        assert!(consumer.pop().is_err());
        assert_eq!(first.samples[0], 0.1);
        assert_eq!(second.samples[0], 0.2);
        assert!(!kept.is_unique());

        drop(first);
        assert!(kept.is_unique());
    }

    #[test]
    fn test_rejected_request_is_handed_back() {
        let (producer, mut consumer) = RingBuffer::new(4);
        let mut mixer = VoiceMixer::new(1, 16).with_retired_sink(producer);
        let sample = constant_sample(100, 0.3);

        mixer.start_voice(request(&sample, 1.0)).unwrap();
        let rejected = mixer
            .start_voice(request(&constant_sample(8, 0.4), 1.0))
            .unwrap_err();
        mixer.retire_sample(rejected.sample);

        let retired = consumer.pop().unwrap();
        assert_eq!(retired.samples[0], 0.4);
        assert!(retired.is_unique());
        assert_eq!(mixer.active_voices(), 1);
    }
}

//! Render-context entry point.
//!
//! [`RenderCallback`] owns everything the device callback touches: the voice mixer, the two
//! feedback lines and the ring endpoints to the control context. One call to
//! [`RenderCallback::process`] fills one driver block. Nothing in here allocates, locks or logs.

use rtrb::{Consumer, Producer};

use crate::audio_engine::config::EngineConfig;
use crate::audio_engine::constants::CHANNELS;
use crate::audio_engine::effect_line::FeedbackLine;
use crate::audio_engine::mixer::VoiceMixer;
use crate::messages::{AudioMessage, ControlMessage, SampleBuffer};

pub struct RenderCallback {
    mixer: VoiceMixer,
    delay: FeedbackLine,
    reverb: FeedbackLine,
    control: Consumer<ControlMessage>,
    messages: Producer<AudioMessage>,
    soft_clip: bool,
    callbacks: u64,
}

impl RenderCallback {
    /// Builds the render state for `config`. All buffers are allocated here.
    pub fn new(
        config: &EngineConfig,
        control: Consumer<ControlMessage>,
        messages: Producer<AudioMessage>,
        retired: Producer<SampleBuffer>,
    ) -> Self {
        Self {
            mixer: VoiceMixer::new(config.max_voices, config.block_size).with_retired_sink(retired),
            delay: FeedbackLine::from_config(&config.delay),
            reverb: FeedbackLine::from_config(&config.reverb),
            control,
            messages,
            soft_clip: config.soft_clip,
            callbacks: 0,
        }
    }

    /// Number of voices currently held by the mixer.
    pub fn active_voices(&self) -> usize {
        self.mixer.active_voices()
    }

    /// Fills `out` (interleaved stereo) with the next block.
    ///
    /// `device_status` is set when the driver reported an underrun or overrun since the
    /// previous call; the block is rendered regardless.
    pub fn process(&mut self, out: &mut [f32], device_status: bool) {
        self.callbacks = self.callbacks.wrapping_add(1);
        if device_status {
            self.report(AudioMessage::DeviceStatus {
                callback: self.callbacks,
            });
        }

        self.drain_control();

        out.fill(0.0);

        let chunk_frames = self.mixer.capacity_frames();
        let frames = out.len() / CHANNELS;
        if frames > chunk_frames {
            self.report(AudioMessage::OversizeBlock {
                frames,
                chunk: chunk_frames,
            });
        }

        for chunk in out.chunks_mut(chunk_frames * CHANNELS) {
            self.render_chunk(chunk);
        }

        if self.soft_clip {
            for sample in out.iter_mut() {
                *sample = sample.tanh();
            }
        }
    }

    fn drain_control(&mut self) {
        while let Ok(message) = self.control.pop() {
            match message {
                ControlMessage::Trigger(request) => {
                    if let Err(rejected) = self.mixer.start_voice(request) {
                        let pad_id = rejected.pad_id;
                        self.mixer.retire_sample(rejected.sample);
                        self.report(AudioMessage::VoiceDropped { pad_id });
                    }
                }
                ControlMessage::StopAll() => {
                    let voices = self.mixer.stop_all();
                    self.report(AudioMessage::Flushed { voices });
                }
            }
        }
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        let frames = out.len() / CHANNELS;
        let buses = self.mixer.render_block(frames);

        for (o, d) in out.iter_mut().zip(buses.dry) {
            *o += d;
        }
        self.delay.process(buses.delay, out);
        self.reverb.process(buses.reverb, out);
    }

    fn report(&mut self, message: AudioMessage) {
        // A full ring drops the report; the block must still complete.
        let _ = self.messages.push(message);
    }
}

//! Audio Engine Module
//!
//! This module provides the real-time pad playback engine.
//! It is organized into sub-modules, each with a specific responsibility:
//!
//! - [`audio_stream`]: CPAL device binding and logger setup
//! - [`callback`]: the render-context entry point
//! - [`config`]: engine configuration
//! - [`constants`]: fixed engine contract and defaults
//! - [`errors`]: error types
//! - [`sample_store`]: per-pad raw/processed samples and processing state
//! - [`processor`]: trim/reverse/normalize
//! - [`voice`] and [`mixer`]: polyphonic voice mixing
//! - [`effect_line`]: delay and reverb feedback lines
//! - [`snapshot`]: serializable pad state
//!
//! The [`Engine`] struct is the control-context façade over these components.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use cpal::Stream;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::audio_engine::audio_stream::create_audio_stream;
use crate::audio_engine::callback::RenderCallback;
use crate::audio_engine::constants::{
    AUDIO_QUEUE_CAPACITY, CONTROL_QUEUE_CAPACITY, RETIRED_QUEUE_CAPACITY,
};
use crate::audio_engine::voice::VoiceRequest;
use crate::messages::{AudioMessage, ControlMessage, SampleBuffer};

pub mod audio_stream;
pub mod callback;
pub mod channels;
pub mod config;
pub mod constants;
pub mod effect_line;
pub mod errors;
pub mod mixer;
pub mod processor;
pub mod sample_loader;
pub mod sample_store;
pub mod snapshot;
pub mod voice;

pub use config::{EffectLineConfig, EngineConfig};
pub use errors::{
    ConfigError, DeviceInitError, DirectoryListError, EngineError, SampleLoadError, StateError,
};
pub use sample_store::SampleStore;
pub use snapshot::{EngineSnapshot, PadProcessingState};

/// How long [`Engine::stop`] waits for the render context to flush its voices.
const FLUSH_TIMEOUT: Duration = Duration::from_millis(200);

/// Lifecycle of the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed; no device. The renderer can be driven with [`Engine::render_offline`].
    Idle,
    /// The device callback is firing.
    Running,
    /// The device was released (explicitly or by a device error). Terminal.
    Stopped,
}

/// Pad playback engine.
///
/// All methods run on the control context. The render context is reached only through the
/// lock-free rings created in [`Engine::with_config`].
pub struct Engine {
    config: EngineConfig,
    store: SampleStore,
    control: Producer<ControlMessage>,
    messages: Consumer<AudioMessage>,
    retired: Consumer<SampleBuffer>,
    /// Held while idle; moved into the device callback on start.
    renderer: Option<RenderCallback>,
    stream: Option<Stream>,
    device_failed: Arc<AtomicBool>,
    stopped: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an idle engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an idle engine. Every buffer the render context uses is allocated here.
    pub fn with_config(config: EngineConfig) -> Self {
        let config = config.sanitized();

        let (control, control_rx) = RingBuffer::new(CONTROL_QUEUE_CAPACITY);
        let (messages_tx, messages) = RingBuffer::new(AUDIO_QUEUE_CAPACITY);
        let (retired_tx, retired) = RingBuffer::new(RETIRED_QUEUE_CAPACITY);
        let renderer = RenderCallback::new(&config, control_rx, messages_tx, retired_tx);

        Self {
            config,
            store: SampleStore::new(),
            control,
            messages,
            retired,
            renderer: Some(renderer),
            stream: None,
            device_failed: Arc::new(AtomicBool::new(false)),
            stopped: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        if self.stopped || self.device_failed.load(Ordering::Acquire) {
            EngineState::Stopped
        } else if self.stream.is_some() {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    /// Opens the output device and starts rendering.
    ///
    /// A device that cannot be opened leaves the engine stopped.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state() {
            EngineState::Running => return Err(EngineError::AlreadyRunning),
            EngineState::Stopped => return Err(EngineError::Stopped),
            EngineState::Idle => {}
        }

        let renderer = self.renderer.take().ok_or(EngineError::Stopped)?;
        match create_audio_stream(
            renderer,
            self.config.block_size,
            Arc::clone(&self.device_failed),
        ) {
            Ok(stream) => {
                self.stream = Some(stream);
                log::info!("Audio engine running");
                Ok(())
            }
            Err(err) => {
                self.stopped = true;
                log::error!("Failed to start audio engine: {err}");
                Err(err.into())
            }
        }
    }

    /// Flushes all voices and releases the device. Safe to call in any state.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }

        if self.stream.is_some() && !self.device_failed.load(Ordering::Acquire) {
            self.flush_voices();
        }

        self.stream = None;
        self.renderer = None;
        self.stopped = true;
        self.poll_messages();
        log::info!("Audio engine stopped");
    }

    fn flush_voices(&mut self) {
        if self.control.push(ControlMessage::StopAll()).is_err() {
            log::warn!("Control queue full; releasing device without flushing voices");
            return;
        }

        let deadline = Instant::now() + FLUSH_TIMEOUT;
        while Instant::now() < deadline {
            while let Ok(message) = self.messages.pop() {
                let flushed = matches!(message, AudioMessage::Flushed { .. });
                log_audio_message(&message);
                if flushed {
                    return;
                }
            }
            thread::sleep(Duration::from_millis(2));
        }
        log::warn!("Render context did not acknowledge the flush in time");
    }

    /// Drains render-context reports into the log and frees retired sample buffers.
    pub fn poll_messages(&mut self) {
        while let Ok(message) = self.messages.pop() {
            log_audio_message(&message);
        }
        while let Ok(buffer) = self.retired.pop() {
            drop(buffer);
        }
    }

    /// Loads a sample file into a pad. Failures are logged; the pad keeps its previous sample.
    pub fn load_sample(&mut self, pad: usize, path: &Path, display_name: Option<&str>) {
        self.poll_messages();
        if let Err(err) = self.store.load(pad, path, display_name) {
            log::warn!("Failed to load {} into pad {pad}: {err}", path.display());
        }
    }

    /// Triggers a pad. A pad without a sample is ignored.
    ///
    /// Levels are clamped into `[0, 1]`; `sample_offset_seconds` delays the voice start.
    pub fn play(
        &mut self,
        pad: usize,
        velocity: f32,
        reverb_send: f32,
        delay_send: f32,
        sample_offset_seconds: f32,
    ) {
        self.poll_messages();
        if self.state() == EngineState::Stopped {
            log::debug!("Ignoring trigger on pad {pad}: engine stopped");
            return;
        }

        let Some(sample) = self.store.processed(pad) else {
            log::debug!("Pad {pad} has no sample; ignoring trigger");
            return;
        };

        let request = VoiceRequest::new(
            pad,
            sample,
            velocity,
            reverb_send,
            delay_send,
            sample_offset_seconds,
        );
        if self.control.push(ControlMessage::Trigger(request)).is_err() {
            log::warn!("Control queue full; dropping trigger on pad {pad}");
        }
    }

    pub fn set_trim(&mut self, pad: usize, start: f64, end: f64) {
        self.poll_messages();
        self.store.set_trim(pad, start, end);
    }

    pub fn toggle_reverse(&mut self, pad: usize) {
        self.poll_messages();
        self.store.toggle_reverse(pad);
    }

    pub fn toggle_normalize(&mut self, pad: usize) {
        self.poll_messages();
        self.store.toggle_normalize(pad);
    }

    /// Loads the next (`direction > 0`) or previous sibling sample file. Failures are logged.
    pub fn cycle_sample(&mut self, pad: usize, direction: i32) {
        self.poll_messages();
        match self.store.cycle_sample(pad, direction) {
            Ok(path) => log::debug!("Pad {pad} cycled to {}", path.display()),
            Err(err) => log::warn!("Failed to cycle sample on pad {pad}: {err}"),
        }
    }

    pub fn waveform(&self, pad: usize) -> Option<Vec<i16>> {
        self.store.waveform(pad)
    }

    pub fn pad_state(&self, pad: usize) -> Option<PadProcessingState> {
        self.store.pad_state(pad)
    }

    pub fn pad_name(&self, pad: usize) -> Option<&str> {
        self.store.pad_name(pad)
    }

    /// Paths and processing states of every loaded pad.
    pub fn state_snapshot(&self) -> EngineSnapshot {
        self.store.snapshot()
    }

    /// Reloads the samples of `snapshot` and reapplies their states. Failures are logged.
    pub fn load_state(&mut self, snapshot: &EngineSnapshot) {
        self.poll_messages();
        for (pad, err) in self.store.restore(snapshot) {
            log::warn!("Skipping pad {pad} while restoring state: {err}");
        }
    }

    /// Silences every sounding voice at the start of the next block.
    pub fn stop_all(&mut self) {
        self.poll_messages();
        if self.control.push(ControlMessage::StopAll()).is_err() {
            log::warn!("Control queue full; dropping stop request");
        }
    }

    /// Renders the next block into `out` without a device.
    ///
    /// Only available while [`EngineState::Idle`]; the caller takes the driver's place.
    pub fn render_offline(&mut self, out: &mut [f32]) -> Result<(), EngineError> {
        let renderer = match self.state() {
            EngineState::Idle => self.renderer.as_mut().ok_or(EngineError::Stopped)?,
            EngineState::Running => return Err(EngineError::NotIdle),
            EngineState::Stopped => return Err(EngineError::Stopped),
        };
        renderer.process(out, false);
        self.poll_messages();
        Ok(())
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SampleStore {
        &mut self.store
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.stream.is_some() {
            self.stop();
        }
    }
}

fn log_audio_message(message: &AudioMessage) {
    match message {
        AudioMessage::DeviceStatus { callback } => {
            log::warn!("Audio device reported an underrun/overrun (callback {callback})");
        }
        AudioMessage::VoiceDropped { pad_id } => {
            log::warn!("Voice pool full; dropped trigger on pad {pad_id}");
        }
        AudioMessage::OversizeBlock { frames, chunk } => {
            log::debug!("Driver block of {frames} frames rendered in chunks of {chunk}");
        }
        AudioMessage::Flushed { voices } => {
            log::debug!("Flushed {voices} voices");
        }
    }
}

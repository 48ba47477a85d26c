//! Audio Stream Module
//!
//! This module binds the render callback to the output device:
//! - Logger setup
//! - Stream configuration (fixed sample rate, channel count and block size)
//! - Device error reporting back to the control context

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig, StreamError};
use env_logger::{Builder, Env};

use crate::audio_engine::callback::RenderCallback;
use crate::audio_engine::constants::{CHANNELS, SAMPLE_RATE};
use crate::audio_engine::errors::DeviceInitError;

/// Setup and configure the logger for audio operations
pub fn setup_logger() {
    // Default to `info`; override via `RUST_LOG`, e.g. `RUST_LOG=debug` when troubleshooting.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// Opens the default output device and starts `renderer` on it.
///
/// `device_failed` is raised when the device goes away while the stream is running.
pub fn create_audio_stream(
    mut renderer: RenderCallback,
    block_size: usize,
    device_failed: Arc<AtomicBool>,
) -> Result<Stream, DeviceInitError> {
    setup_logger();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(DeviceInitError::NoDevice)?;

    let stream_config = StreamConfig {
        channels: CHANNELS as u16,
        sample_rate: SAMPLE_RATE,
        buffer_size: BufferSize::Fixed(u32::try_from(block_size).unwrap_or(u32::MAX)),
    };

    log::info!(
        "Starting audio engine... ({} ch@{} Hz, {} frames per block)",
        CHANNELS,
        SAMPLE_RATE,
        block_size
    );

    // Set by the error callback, consumed by the next render call.
    let xrun = Arc::new(AtomicBool::new(false));
    let xrun_flag = Arc::clone(&xrun);

    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let status = xrun.swap(false, Ordering::Relaxed);
            renderer.process(data, status);
        },
        move |err| {
            log::error!("Audio stream error: {}", err);
            match err {
                StreamError::DeviceNotAvailable => device_failed.store(true, Ordering::Release),
                _ => xrun_flag.store(true, Ordering::Relaxed),
            }
        },
        None,
    )?;

    stream.play()?;
    Ok(stream)
}

//! Audio-specific error types.

use thiserror::Error;

/// Errors that can occur while loading audio files.
#[derive(Debug, Error)]
pub enum SampleLoadError {
    /// Failed to open the audio file.
    #[error("failed to open file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the audio file.
    #[error("failed to decode audio file: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// Audio file has no default track.
    #[error("audio file has no default track")]
    NoDefaultTrack,

    /// Audio file is missing channel information.
    #[error("audio file is missing channel information")]
    MissingChannels,

    /// Unsupported channel mapping configuration.
    #[error("unsupported channel layout: file has {file_channels} channels (only mono and stereo supported)")]
    UnsupportedChannels {
        /// Number of channels in the source file.
        file_channels: usize,
    },

    /// The file decoded to zero frames.
    #[error("audio file contains no audio frames")]
    Empty,

    /// The pad id is outside the pad range.
    #[error("pad {pad} out of range")]
    PadOutOfRange { pad: usize },
}

/// Errors raised while cycling a pad through the sample files next to its current one.
#[derive(Debug, Error)]
pub enum DirectoryListError {
    /// The pad has no sample file to cycle from.
    #[error("pad {pad} has no loaded sample")]
    NotLoaded { pad: usize },

    /// The current sample path has no parent directory.
    #[error("sample path has no parent directory")]
    NoParent,

    /// Listing the directory failed.
    #[error("failed to list sample directory: {0}")]
    Io(#[from] std::io::Error),

    /// The directory contains no file with the current extension.
    #[error("no sibling sample files found")]
    NoSiblings,

    /// The selected sibling could not be loaded.
    #[error("failed to load sibling sample: {0}")]
    Load(#[from] SampleLoadError),
}

/// Errors raised while opening the audio output device.
#[derive(Debug, Error)]
pub enum DeviceInitError {
    /// The host exposes no default output device.
    #[error("no audio output device found")]
    NoDevice,

    /// The device refused the requested stream configuration.
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// The stream was built but could not be started.
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Errors raised by the engine's lifecycle operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The output device could not be opened.
    #[error(transparent)]
    Device(#[from] DeviceInitError),

    /// `start` was called while the engine is already running.
    #[error("audio engine already running")]
    AlreadyRunning,

    /// The engine was stopped and cannot be restarted.
    #[error("audio engine has been stopped")]
    Stopped,

    /// Offline rendering requires the engine to be idle.
    #[error("offline rendering is only available while the engine is idle")]
    NotIdle,
}

/// Errors raised while loading an engine configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document is not valid.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while (de)serializing an engine snapshot.
#[derive(Debug, Error)]
pub enum StateError {
    /// The snapshot document is not valid JSON of the expected shape.
    #[error("failed to parse engine state: {0}")]
    Parse(#[from] serde_json::Error),
}

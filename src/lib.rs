pub mod audio_engine;
pub mod messages;

#[cfg(feature = "python")]
mod python;

pub use audio_engine::{
    EffectLineConfig, Engine, EngineConfig, EngineSnapshot, EngineState, PadProcessingState,
};

/// The Python module implemented in Rust.
#[cfg(feature = "python")]
#[pyo3::pymodule]
mod groovebox_audio {
    #[pymodule_export]
    use super::python::AudioEngine;
}

//! Python bindings for the engine.

use std::path::PathBuf;

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::audio_engine::audio_stream::setup_logger;
use crate::audio_engine::{Engine, EngineSnapshot, PadProcessingState};

/// AudioEngine drives the pad sampler on the default output device.
#[pyclass(unsendable)]
pub struct AudioEngine {
    engine: Engine,
}

#[pymethods]
impl AudioEngine {
    #[new]
    pub fn new() -> Self {
        setup_logger();
        Self {
            engine: Engine::new(),
        }
    }

    /// Open the output device and start rendering.
    pub fn start(&mut self) -> PyResult<()> {
        self.engine
            .start()
            .map_err(|e| PyRuntimeError::new_err(format!("Failed to start audio engine: {e}")))
    }

    /// Flush every voice and release the output device.
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    #[pyo3(signature = (pad_id, path, display_name=None))]
    pub fn load_sample(&mut self, pad_id: usize, path: PathBuf, display_name: Option<String>) {
        self.engine
            .load_sample(pad_id, &path, display_name.as_deref());
    }

    #[pyo3(signature = (pad_id, velocity=1.0, reverb_send=0.0, delay_send=0.0, sample_offset=0.0))]
    pub fn play(
        &mut self,
        pad_id: usize,
        velocity: f32,
        reverb_send: f32,
        delay_send: f32,
        sample_offset: f32,
    ) {
        self.engine
            .play(pad_id, velocity, reverb_send, delay_send, sample_offset);
    }

    pub fn set_trim(&mut self, pad_id: usize, start: f64, end: f64) {
        self.engine.set_trim(pad_id, start, end);
    }

    pub fn toggle_reverse(&mut self, pad_id: usize) {
        self.engine.toggle_reverse(pad_id);
    }

    pub fn toggle_normalize(&mut self, pad_id: usize) {
        self.engine.toggle_normalize(pad_id);
    }

    pub fn cycle_sample(&mut self, pad_id: usize, direction: i32) {
        self.engine.cycle_sample(pad_id, direction);
    }

    /// Interleaved stereo 16-bit waveform of the processed sample, or None.
    pub fn get_waveform(&self, pad_id: usize) -> Option<Vec<i16>> {
        self.engine.waveform(pad_id)
    }

    pub fn get_pad_state<'py>(
        &self,
        py: Python<'py>,
        pad_id: usize,
    ) -> PyResult<Option<Bound<'py, PyDict>>> {
        self.engine
            .pad_state(pad_id)
            .map(|state| pad_state_to_dict(py, &state))
            .transpose()
    }

    /// `{"paths": {pad: path}, "states": {pad: {...}}}` for every loaded pad.
    pub fn get_state<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let snapshot = self.engine.state_snapshot();

        let paths = PyDict::new(py);
        for (pad, path) in &snapshot.paths {
            paths.set_item(*pad, path)?;
        }
        let states = PyDict::new(py);
        for (pad, state) in &snapshot.states {
            states.set_item(*pad, pad_state_to_dict(py, state)?)?;
        }

        let dict = PyDict::new(py);
        dict.set_item("paths", paths)?;
        dict.set_item("states", states)?;
        Ok(dict)
    }

    /// Restore a dict produced by `get_state`. Pad keys may be ints or numeric strings.
    pub fn load_state(&mut self, state: &Bound<'_, PyDict>) -> PyResult<()> {
        let snapshot = snapshot_from_dict(state)?;
        self.engine.load_state(&snapshot);
        Ok(())
    }

    /// Silence every sounding voice.
    pub fn stop_all(&mut self) {
        self.engine.stop_all();
    }
}

/// Entries with an unusable key or malformed fields are skipped.
fn snapshot_from_dict(state: &Bound<'_, PyDict>) -> PyResult<EngineSnapshot> {
    let mut snapshot = EngineSnapshot::default();

    if let Some(paths) = state.get_item("paths")? {
        let paths = paths.extract::<Bound<'_, PyDict>>()?;
        for (key, value) in paths.iter() {
            if let (Some(pad), Ok(path)) = (pad_key(&key), value.extract::<String>()) {
                snapshot.paths.insert(pad, path);
            }
        }
    }

    if let Some(states) = state.get_item("states")? {
        let states = states.extract::<Bound<'_, PyDict>>()?;
        for (key, value) in states.iter() {
            let Some(pad) = pad_key(&key) else {
                continue;
            };
            let Ok(fields) = value.extract::<Bound<'_, PyDict>>() else {
                continue;
            };
            let Ok(pad_state) = pad_state_from_dict(&fields) else {
                log::debug!("Skipping malformed state for pad {pad}");
                continue;
            };
            snapshot.states.insert(pad, pad_state);
        }
    }

    Ok(snapshot)
}

fn pad_key(key: &Bound<'_, PyAny>) -> Option<usize> {
    key.extract::<usize>()
        .ok()
        .or_else(|| key.extract::<String>().ok()?.trim().parse().ok())
}

fn pad_state_to_dict<'py>(
    py: Python<'py>,
    state: &PadProcessingState,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("trim_start", state.trim_start)?;
    dict.set_item("trim_end", state.trim_end)?;
    dict.set_item("reverse", state.reverse)?;
    dict.set_item("normalized", state.normalized)?;
    Ok(dict)
}

fn pad_state_from_dict(dict: &Bound<'_, PyDict>) -> PyResult<PadProcessingState> {
    let mut state = PadProcessingState::default();
    if let Some(value) = dict.get_item("trim_start")? {
        state.trim_start = value.extract()?;
    }
    if let Some(value) = dict.get_item("trim_end")? {
        state.trim_end = value.extract()?;
    }
    if let Some(value) = dict.get_item("reverse")? {
        state.reverse = value.extract()?;
    }
    if let Some(value) = dict.get_item("normalized")? {
        state.normalized = value.extract()?;
    }
    Ok(state)
}

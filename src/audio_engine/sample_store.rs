//! Per-pad sample storage.
//!
//! The [`SampleStore`] lives on the control context. For every pad it keeps the raw decoded
//! sample, the processing state, and the processed sample derived from both. The processed
//! sample is a [`SampleBuffer`] handle: replacing it never disturbs voices that are still
//! reading an older version.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::audio_engine::constants::NUM_PADS;
use crate::audio_engine::errors::{DirectoryListError, SampleLoadError};
use crate::audio_engine::processor::{process_sample, to_waveform};
use crate::audio_engine::sample_loader::decode_audio_file_to_sample_buffer;
use crate::audio_engine::snapshot::{EngineSnapshot, PadProcessingState};
use crate::messages::SampleBuffer;

struct LoadedPad {
    raw: SampleBuffer,
    processed: SampleBuffer,
    state: PadProcessingState,
    path: PathBuf,
    name: String,
}

impl LoadedPad {
    fn reprocess(&mut self) {
        self.processed = process_sample(&self.raw, &self.state);
    }
}

pub struct SampleStore {
    pads: Vec<Option<LoadedPad>>,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore {
    pub fn new() -> Self {
        Self {
            pads: std::iter::repeat_with(|| None).take(NUM_PADS).collect(),
        }
    }

    /// Decodes `path` into `pad`, resetting its processing state.
    ///
    /// `name` is the display name; the file stem is used when it is `None`. On failure the
    /// pad keeps whatever it held before.
    pub fn load(
        &mut self,
        pad: usize,
        path: &Path,
        name: Option<&str>,
    ) -> Result<(), SampleLoadError> {
        if pad >= NUM_PADS {
            return Err(SampleLoadError::PadOutOfRange { pad });
        }

        let raw = decode_audio_file_to_sample_buffer(path)?;
        let state = PadProcessingState::default();
        let processed = process_sample(&raw, &state);
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| display_name_for(path));

        log::info!(
            "Loaded '{}' into pad {} ({} frames)",
            name,
            pad,
            raw.frames()
        );

        self.pads[pad] = Some(LoadedPad {
            raw,
            processed,
            state,
            path: path.to_path_buf(),
            name,
        });
        Ok(())
    }

    /// Whether `pad` holds a sample.
    pub fn is_loaded(&self, pad: usize) -> bool {
        self.pad(pad).is_some()
    }

    /// Sets the trim window, clamping both points into `[0, 1]`.
    ///
    /// Returns `false` when the pad has no sample.
    pub fn set_trim(&mut self, pad: usize, start: f64, end: f64) -> bool {
        self.update(pad, |state| {
            state.trim_start = start;
            state.trim_end = end;
        })
    }

    pub fn toggle_reverse(&mut self, pad: usize) -> bool {
        self.update(pad, |state| state.reverse = !state.reverse)
    }

    pub fn toggle_normalize(&mut self, pad: usize) -> bool {
        self.update(pad, |state| state.normalized = !state.normalized)
    }

    /// Replaces the whole processing state of a loaded pad.
    pub fn apply_state(&mut self, pad: usize, state: PadProcessingState) -> bool {
        self.update(pad, |current| *current = state)
    }

    fn update(&mut self, pad: usize, edit: impl FnOnce(&mut PadProcessingState)) -> bool {
        let Some(loaded) = self.pads.get_mut(pad).and_then(Option::as_mut) else {
            log::debug!("Pad {pad} has no sample; ignoring edit");
            return false;
        };

        edit(&mut loaded.state);
        loaded.state = loaded.state.clamped();
        loaded.reprocess();
        true
    }

    /// Loads the next (`direction > 0`) or previous sample file in the current file's
    /// directory, wrapping around. Returns the path that was loaded.
    ///
    /// Siblings are the files sharing the current extension (case-insensitively), ordered by
    /// file name. If the current file has disappeared, the first sibling is chosen.
    pub fn cycle_sample(
        &mut self,
        pad: usize,
        direction: i32,
    ) -> Result<PathBuf, DirectoryListError> {
        let current = self
            .pad(pad)
            .map(|loaded| loaded.path.clone())
            .ok_or(DirectoryListError::NotLoaded { pad })?;

        let siblings = list_siblings(&current)?;
        let next = match siblings.iter().position(|p| p.file_name() == current.file_name()) {
            Some(index) => {
                let len = siblings.len() as i64;
                let index = (index as i64 + i64::from(direction)).rem_euclid(len);
                &siblings[index as usize]
            }
            None => &siblings[0],
        };

        self.load(pad, next, None)?;
        Ok(next.clone())
    }

    /// The processed sample of `pad`, as a shared handle.
    pub fn processed(&self, pad: usize) -> Option<SampleBuffer> {
        self.pad(pad).map(|loaded| loaded.processed.clone())
    }

    /// The processed sample rendered to 16-bit range (interleaved stereo).
    pub fn waveform(&self, pad: usize) -> Option<Vec<i16>> {
        self.pad(pad).map(|loaded| to_waveform(&loaded.processed.samples))
    }

    pub fn pad_state(&self, pad: usize) -> Option<PadProcessingState> {
        self.pad(pad).map(|loaded| loaded.state)
    }

    pub fn pad_name(&self, pad: usize) -> Option<&str> {
        self.pad(pad).map(|loaded| loaded.name.as_str())
    }

    pub fn pad_path(&self, pad: usize) -> Option<&Path> {
        self.pad(pad).map(|loaded| loaded.path.as_path())
    }

    /// File paths and processing states of every loaded pad.
    pub fn snapshot(&self) -> EngineSnapshot {
        let mut snapshot = EngineSnapshot::default();
        for (pad, loaded) in self.loaded() {
            snapshot
                .paths
                .insert(pad, loaded.path.to_string_lossy().into_owned());
            snapshot.states.insert(pad, loaded.state);
        }
        snapshot
    }

    /// Reloads every path in `snapshot`, then applies every state whose pad holds a sample.
    ///
    /// Entries that fail are skipped; their errors are returned alongside the pad id.
    pub fn restore(&mut self, snapshot: &EngineSnapshot) -> Vec<(usize, SampleLoadError)> {
        let mut failures = Vec::new();
        for (&pad, path) in &snapshot.paths {
            if let Err(err) = self.load(pad, Path::new(path), None) {
                failures.push((pad, err));
            }
        }

        for (&pad, &state) in &snapshot.states {
            if self.is_loaded(pad) {
                self.apply_state(pad, state);
            }
        }
        failures
    }

    fn pad(&self, pad: usize) -> Option<&LoadedPad> {
        self.pads.get(pad).and_then(Option::as_ref)
    }

    fn loaded(&self) -> impl Iterator<Item = (usize, &LoadedPad)> {
        self.pads
            .iter()
            .enumerate()
            .filter_map(|(pad, loaded)| loaded.as_ref().map(|loaded| (pad, loaded)))
    }
}

fn display_name_for(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_else(|| path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

fn list_siblings(current: &Path) -> Result<Vec<PathBuf>, DirectoryListError> {
    let dir = match current.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => return Err(DirectoryListError::NoParent),
    };
    let extension = current.extension().map(lowercase);

    let mut siblings = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map(lowercase) == extension {
            siblings.push(path);
        }
    }

    if siblings.is_empty() {
        return Err(DirectoryListError::NoSiblings);
    }
    siblings.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(siblings)
}

fn lowercase(extension: &OsStr) -> String {
    extension.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_engine::sample_loader::tests::write_pcm16_wav;

    fn write_wav(dir: &Path, name: &str, values: &[i16]) -> PathBuf {
        let path = dir.join(name);
        write_pcm16_wav(&path, 2, 44_100, values).unwrap();
        path
    }

    fn ramp(frames: usize) -> Vec<i16> {
        (0..frames * 2).map(|i| (i * 100) as i16).collect()
    }

    #[test]
    fn test_load_sets_default_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "kick.wav", &ramp(10));

        let mut store = SampleStore::new();
        store.load(3, &path, None).unwrap();

        assert!(store.is_loaded(3));
        assert_eq!(store.pad_state(3), Some(PadProcessingState::default()));
        assert_eq!(store.pad_name(3), Some("kick"));
        assert_eq!(store.processed(3).unwrap().frames(), 10);
        assert_eq!(store.waveform(3).unwrap().len(), 20);
    }

    #[test]
    fn test_load_custom_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "kick.wav", &ramp(4));

        let mut store = SampleStore::new();
        store.load(0, &path, Some("Big Kick")).unwrap();
        assert_eq!(store.pad_name(0), Some("Big Kick"));
    }

    #[test]
    fn test_failed_load_keeps_previous_sample() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "kick.wav", &ramp(10));

        let mut store = SampleStore::new();
        store.load(1, &path, None).unwrap();
        let result = store.load(1, &tmp.path().join("missing.wav"), None);

        assert!(matches!(result, Err(SampleLoadError::Io(_))));
        assert_eq!(store.pad_path(1), Some(path.as_path()));
        assert_eq!(store.processed(1).unwrap().frames(), 10);
    }

    #[test]
    fn test_load_pad_out_of_range() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "kick.wav", &ramp(4));

        let mut store = SampleStore::new();
        let result = store.load(NUM_PADS, &path, None);
        assert!(matches!(result, Err(SampleLoadError::PadOutOfRange { pad: NUM_PADS })));
    }

    #[test]
    fn test_edits_on_empty_pad_are_noops() {
        let mut store = SampleStore::new();
        assert!(!store.set_trim(0, 0.2, 0.8));
        assert!(!store.toggle_reverse(0));
        assert!(!store.toggle_normalize(0));
        assert!(!store.toggle_reverse(NUM_PADS + 5));
        assert!(store.pad_state(0).is_none());
        assert!(store.waveform(0).is_none());
    }

    #[test]
    fn test_set_trim_clamps_and_reprocesses() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "kick.wav", &ramp(100));

        let mut store = SampleStore::new();
        store.load(0, &path, None).unwrap();
        assert!(store.set_trim(0, -1.0, 0.5));

        let state = store.pad_state(0).unwrap();
        assert_eq!(state.trim_start, 0.0);
        assert_eq!(state.trim_end, 0.5);
        assert_eq!(store.processed(0).unwrap().frames(), 50);
    }

    #[test]
    fn test_inverted_trim_yields_full_sample() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "kick.wav", &ramp(100));

        let mut store = SampleStore::new();
        store.load(0, &path, None).unwrap();
        store.set_trim(0, 0.9, 0.1);
        assert_eq!(store.processed(0).unwrap().frames(), 100);
    }

    #[test]
    fn test_replacing_processed_keeps_old_handle_valid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "kick.wav", &ramp(100));

        let mut store = SampleStore::new();
        store.load(0, &path, None).unwrap();
        let before = store.processed(0).unwrap();
        store.toggle_reverse(0);

        let after = store.processed(0).unwrap();
        assert_eq!(before.frames(), 100);
        assert_eq!(before.samples[0], after.samples[198]);
        assert!(before.is_unique());
    }

    #[test]
    fn test_toggle_reverse_twice_restores() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "kick.wav", &ramp(33));

        let mut store = SampleStore::new();
        store.load(0, &path, None).unwrap();
        let original = store.waveform(0).unwrap();
        store.toggle_reverse(0);
        assert_ne!(store.waveform(0).unwrap(), original);
        store.toggle_reverse(0);
        assert_eq!(store.waveform(0).unwrap(), original);
    }

    #[test]
    fn test_cycle_sample_wraps_both_ways() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_wav(tmp.path(), "a.wav", &ramp(4));
        let b = write_wav(tmp.path(), "b.WAV", &ramp(5));
        let c = write_wav(tmp.path(), "c.wav", &ramp(6));
        std::fs::write(tmp.path().join("notes.txt"), b"not audio").unwrap();

        let mut store = SampleStore::new();
        store.load(2, &c, None).unwrap();
        store.toggle_reverse(2);

        assert_eq!(store.cycle_sample(2, 1).unwrap(), a);
        assert_eq!(store.pad_state(2), Some(PadProcessingState::default()));
        assert_eq!(store.processed(2).unwrap().frames(), 4);

        assert_eq!(store.cycle_sample(2, -1).unwrap(), c);
        assert_eq!(store.cycle_sample(2, -1).unwrap(), b);
        assert_eq!(store.pad_name(2), Some("b"));
    }

    #[test]
    fn test_cycle_sample_falls_back_to_first_sibling() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_wav(tmp.path(), "a.wav", &ramp(4));
        let gone = write_wav(tmp.path(), "gone.wav", &ramp(4));

        let mut store = SampleStore::new();
        store.load(0, &gone, None).unwrap();
        std::fs::remove_file(&gone).unwrap();

        assert_eq!(store.cycle_sample(0, 1).unwrap(), a);
    }

    #[test]
    fn test_cycle_sample_errors() {
        let mut store = SampleStore::new();
        assert!(matches!(
            store.cycle_sample(0, 1),
            Err(DirectoryListError::NotLoaded { pad: 0 })
        ));

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("kit");
        std::fs::create_dir(&dir).unwrap();
        let path = write_wav(&dir, "only.wav", &ramp(4));
        store.load(0, &path, None).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(
            store.cycle_sample(0, 1),
            Err(DirectoryListError::Io(_))
        ));
        assert_eq!(store.pad_path(0), Some(path.as_path()));
    }

    #[test]
    fn test_snapshot_and_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let kick = write_wav(tmp.path(), "kick.wav", &ramp(100));
        let snare = write_wav(tmp.path(), "snare.wav", &ramp(50));

        let mut store = SampleStore::new();
        store.load(0, &kick, None).unwrap();
        store.load(5, &snare, None).unwrap();
        store.set_trim(0, 0.25, 0.75);
        store.toggle_normalize(5);
        let snapshot = store.snapshot();

        assert_eq!(snapshot.paths.len(), 2);
        assert_eq!(snapshot.states[&0].trim_start, 0.25);

        let mut restored = SampleStore::new();
        let failures = restored.restore(&snapshot);
        assert!(failures.is_empty());
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.waveform(0), store.waveform(0));
        assert_eq!(restored.waveform(5), store.waveform(5));
    }

    #[test]
    fn test_restore_skips_missing_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let kick = write_wav(tmp.path(), "kick.wav", &ramp(10));

        let mut snapshot = EngineSnapshot::default();
        snapshot
            .paths
            .insert(0, kick.to_string_lossy().into_owned());
        snapshot.paths.insert(
            1,
            tmp.path().join("missing.wav").to_string_lossy().into_owned(),
        );
        let reversed = PadProcessingState {
            reverse: true,
            ..Default::default()
        };
        snapshot.states.insert(0, reversed);
        snapshot.states.insert(1, reversed);
        snapshot.states.insert(9, reversed);

        let mut store = SampleStore::new();
        let failures = store.restore(&snapshot);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert_eq!(store.pad_state(0), Some(reversed));
        assert!(!store.is_loaded(1));
        assert!(!store.is_loaded(9));
    }
}

//! Audio engine configuration constants and limits.

/// Fixed engine sample rate in Hz. Loaded files are never resampled.
pub const SAMPLE_RATE: u32 = 44_100;

/// Number of output channels (interleaved stereo).
pub const CHANNELS: usize = 2;

/// Total number of pads.
pub const NUM_PADS: usize = 16;

/// Preferred number of frames per device callback.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Default size of the render-context voice pool.
pub const DEFAULT_MAX_VOICES: usize = 64;

/// Capacity of the control -> render message ring.
pub const CONTROL_QUEUE_CAPACITY: usize = 1024;

/// Capacity of the render -> control message ring.
pub const AUDIO_QUEUE_CAPACITY: usize = 256;

/// Capacity of the ring that hands retired sample buffers back to the control context.
pub const RETIRED_QUEUE_CAPACITY: usize = 256;

/// Peak amplitude a normalized sample is scaled to.
pub const NORMALIZE_PEAK: f32 = 0.95;

/// Scale used when rendering a processed sample to the 16-bit waveform view.
pub const WAVEFORM_SCALE: f32 = 32_767.0;

/// Minimum trigger gain / send level.
pub const LEVEL_MIN: f32 = 0.0;

/// Maximum trigger gain / send level.
pub const LEVEL_MAX: f32 = 1.0;

/// Largest feedback coefficient an effect line accepts.
pub const FEEDBACK_MAX: f32 = 0.999;

/// Default delay line length in seconds.
pub const DELAY_CAPACITY_SECONDS: f32 = 2.0;

/// Default delay tap (a dotted eighth at 120 BPM).
pub const DELAY_TAP_SECONDS: f32 = 0.375;

/// Default delay feedback.
pub const DELAY_FEEDBACK: f32 = 0.5;

/// Default delay return level.
pub const DELAY_OUTPUT_GAIN: f32 = 1.0;

/// Default reverb line length in seconds.
pub const REVERB_CAPACITY_SECONDS: f32 = 3.0;

/// Default reverb early-reflection tap.
pub const REVERB_TAP_SECONDS: f32 = 0.1;

/// Default reverb feedback.
pub const REVERB_FEEDBACK: f32 = 0.8;

/// Default reverb return level.
pub const REVERB_OUTPUT_GAIN: f32 = 0.5;

/// Clamps a gain or send level into `[LEVEL_MIN, LEVEL_MAX]`; non-finite values become silence.
pub fn clamp_level(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(LEVEL_MIN, LEVEL_MAX)
    } else {
        LEVEL_MIN
    }
}

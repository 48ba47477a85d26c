//! Audio file loading and decoding functionality.
//!
//! This module decodes audio files into stereo sample buffers for the sample store. Files are
//! taken at face value: no resampling is performed, so a file recorded at a rate other than
//! [`SAMPLE_RATE`] plays back at the engine rate (faster or slower than recorded).

use std::fs::File;
use std::path::Path;
use symphonia::core::{
    audio::SampleBuffer as SymphoniaSampleBuffer, codecs::DecoderOptions,
    errors::Error as SymphoniaError, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use crate::audio_engine::channels::map_to_stereo;
use crate::audio_engine::constants::{CHANNELS, SAMPLE_RATE};
use crate::audio_engine::errors::SampleLoadError;
use crate::messages::SampleBuffer;

/// Decodes an audio file into an interleaved stereo sample buffer.
///
/// # Errors
///
/// - File not found or cannot be opened
/// - Audio format not recognized or corrupted
/// - More than two channels
/// - No audio frames at all
pub fn decode_audio_file_to_sample_buffer(path: &Path) -> Result<SampleBuffer, SampleLoadError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or(SampleLoadError::NoDefaultTrack)?;
    let track_id = track.id;
    let file_channels = track
        .codec_params
        .channels
        .ok_or(SampleLoadError::MissingChannels)?
        .count();

    if let Some(file_rate_hz) = track.codec_params.sample_rate {
        if file_rate_hz != SAMPLE_RATE {
            log::debug!(
                "{} is {} Hz; playing at {} Hz without resampling",
                path.display(),
                file_rate_hz,
                SAMPLE_RATE
            );
        }
    }

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut decoded: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(SampleLoadError::Decode(err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = decoder.decode(&packet)?;
        let spec = *audio_buf.spec();
        let duration = audio_buf.capacity() as u64;

        let mut sample_buf = SymphoniaSampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        decoded.extend_from_slice(sample_buf.samples());
    }

    let mapped = map_to_stereo(decoded, file_channels)?;
    if mapped.len() < CHANNELS {
        return Err(SampleLoadError::Empty);
    }

    Ok(SampleBuffer::new(CHANNELS, mapped))
}

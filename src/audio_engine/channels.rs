use crate::audio_engine::constants::CHANNELS;
use crate::audio_engine::errors::SampleLoadError;

/// Maps decoded interleaved samples onto the engine's stereo layout.
///
/// Currently supports:
/// - Mono (1 channel) → Stereo: duplicates the mono signal to both channels
/// - Stereo: no conversion needed
///
/// Anything wider than stereo is rejected rather than downmixed.
pub fn map_to_stereo(samples: Vec<f32>, file_channels: usize) -> Result<Vec<f32>, SampleLoadError> {
    match file_channels {
        CHANNELS => Ok(samples),
        1 => {
            let mut out = Vec::with_capacity(samples.len() * CHANNELS);
            for s in samples {
                out.push(s);
                out.push(s);
            }
            Ok(out)
        }
        _ => Err(SampleLoadError::UnsupportedChannels { file_channels }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_mono_to_stereo() {
        let input = vec![0.5, -0.3, 0.8];
        let output = map_to_stereo(input, 1).unwrap();

        assert_eq!(output.len(), 6); // 3 frames × 2 channels
        assert_eq!(output, vec![0.5, 0.5, -0.3, -0.3, 0.8, 0.8]);
    }

    #[test]
    fn test_map_stereo_unchanged() {
        let input = vec![0.5, -0.3, 0.8, 0.2];
        let output = map_to_stereo(input.clone(), 2).unwrap();

        assert_eq!(output, input);
    }

    #[test]
    fn test_map_multichannel_unsupported() {
        let input = vec![0.5, -0.3, 0.8, 0.2];
        let result = map_to_stereo(input, 4);

        assert!(matches!(
            result,
            Err(SampleLoadError::UnsupportedChannels { file_channels: 4 })
        ));
    }
}

//! WAV decoding.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use super::AudioClip;
use crate::error::{MediaError, MediaResult};

/// Decode an in-memory WAV file into a normalized [`AudioClip`].
///
/// Integer PCM is scaled by `2^(bits - 1)`; float PCM is kept as is.
pub fn decode_wav(bytes: &[u8]) -> MediaResult<AudioClip> {
    let reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| MediaError::invalid_audio(format!("Not a readable WAV file: {}", e)))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| MediaError::invalid_audio(format!("Corrupt WAV samples: {}", e)))?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(MediaError::invalid_audio(format!(
                    "Unsupported bit depth: {}",
                    spec.bits_per_sample
                )));
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| MediaError::invalid_audio(format!("Corrupt WAV samples: {}", e)))?
        }
    };

    if samples.is_empty() {
        return Err(MediaError::invalid_audio("WAV file contains no samples"));
    }

    debug!(
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "Decoded WAV"
    );

    AudioClip::new(samples, spec.channels, spec.sample_rate)
}

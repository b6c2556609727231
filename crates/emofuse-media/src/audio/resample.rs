//! Offline sample-rate conversion for whole clips.

use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Input frames per resampler call.
const CHUNK_SIZE: usize = 1024;

/// FFT sub-chunks per chunk.
const SUB_CHUNKS: usize = 2;

/// Resample a mono waveform from `from_rate` to `to_rate`.
///
/// The output has `ceil(len * to_rate / from_rate)` samples and is aligned
/// with the input: the resampler's startup delay is trimmed.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> MediaResult<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(MediaError::invalid_audio("Sample rate must be positive"));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        1,
    )
    .map_err(|e| MediaError::internal(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).ceil() as usize;
    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);
    let resample_err = |e: rubato::ResampleError| MediaError::internal(format!("Resampling failed: {}", e));

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let wave_in: [&[f32]; 1] = [&samples[pos..pos + n]];
        let chunk = resampler
            .process(&wave_in[..], None)
            .map_err(resample_err)?;
        output.extend_from_slice(&chunk[0]);
        pos += n;
    }

    if pos < samples.len() {
        let wave_in: [&[f32]; 1] = [&samples[pos..]];
        let chunk = resampler
            .process_partial(Some(&wave_in[..]), None)
            .map_err(resample_err)?;
        output.extend_from_slice(&chunk[0]);
    }

    // Drain the delay line
    while output.len() < expected + delay {
        let chunk = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(resample_err)?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    let resampled: Vec<f32> = output.into_iter().skip(delay).take(expected).collect();

    debug!(
        "Resampled {} -> {} samples ({} Hz -> {} Hz)",
        samples.len(),
        resampled.len(),
        from_rate,
        to_rate
    );
    Ok(resampled)
}

//! Audio decoding and feature extraction for the voice classifier.

pub mod decode;
pub mod features;
pub mod resample;

pub use decode::decode_wav;
pub use features::{FeatureConfig, FeatureExtractor};
pub use resample::resample;

use crate::error::{MediaError, MediaResult};

/// A decoded waveform.
///
/// Samples are interleaved `f32` in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioClip {
    /// Create a clip from interleaved samples.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> MediaResult<Self> {
        if channels == 0 {
            return Err(MediaError::invalid_audio("Audio has no channels"));
        }
        if sample_rate == 0 {
            return Err(MediaError::invalid_audio("Audio sample rate is zero"));
        }
        if samples.len() % channels as usize != 0 {
            return Err(MediaError::invalid_audio(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Create a single-channel clip.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> MediaResult<Self> {
        Self::new(samples, 1, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Downmix to one channel by averaging.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

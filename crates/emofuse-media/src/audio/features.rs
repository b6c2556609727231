//! Mel spectrogram + MFCC features for the voice classifier.
//!
//! The classifier was trained on a 64-band mel power spectrogram stacked on
//! top of 40 MFCCs, both framed with a 400-point Hann window and a hop of
//! 200 samples at 16 kHz. The layout is `[n_mels + n_mfcc, frames]`.

use std::f64::consts::PI;
use std::sync::Arc;

use emofuse_models::Modality;
use ndarray::{concatenate, Array2, Axis};
use realfft::{num_complex::Complex, RealFftPlanner, RealToComplex};

use crate::error::{MediaError, MediaResult};

/// Feature extraction parameters.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    /// Bands of the mel spectrogram block
    pub n_mels: usize,
    /// Coefficients of the MFCC block
    pub n_mfcc: usize,
    /// Mel bands the MFCCs are computed from
    pub mfcc_mels: usize,
    /// Dynamic range kept when converting mel power to dB
    pub top_db: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            n_fft: 400,
            hop_length: 200,
            n_mels: 64,
            n_mfcc: 40,
            mfcc_mels: 128,
            top_db: 80.0,
        }
    }
}

/// Precomputed window, filterbanks and FFT plan.
pub struct FeatureExtractor {
    config: FeatureConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    /// `[n_mels, n_freqs]`
    mel_filterbank: Array2<f32>,
    /// `[mfcc_mels, n_freqs]`
    mfcc_filterbank: Array2<f32>,
    /// `[n_mfcc, mfcc_mels]`
    dct: Array2<f32>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        let n_freqs = config.n_fft / 2 + 1;
        let sample_rate = config.sample_rate as f64;

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        Self {
            fft,
            window: hann_window(config.n_fft),
            mel_filterbank: mel_filterbank(config.n_mels, n_freqs, sample_rate),
            mfcc_filterbank: mel_filterbank(config.mfcc_mels, n_freqs, sample_rate),
            dct: dct_matrix(config.n_mfcc, config.mfcc_mels),
            config,
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Shortest waveform that yields features.
    pub fn min_samples(&self) -> usize {
        self.config.n_fft
    }

    /// Frames produced for `len` samples (centered framing).
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.config.hop_length
    }

    /// Rows of the feature matrix.
    pub fn feature_dim(&self) -> usize {
        self.config.n_mels + self.config.n_mfcc
    }

    /// Power spectrogram `[n_fft / 2 + 1, frames]`.
    pub fn power_spectrogram(&self, samples: &[f32]) -> MediaResult<Array2<f32>> {
        if samples.len() < self.min_samples() {
            return Err(MediaError::classification_failed(
                Modality::Audio,
                format!(
                    "Audio too short: {} samples, need at least {}",
                    samples.len(),
                    self.min_samples()
                ),
            ));
        }

        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let padded = reflect_pad(samples, n_fft / 2);
        let n_frames = 1 + (padded.len() - n_fft) / hop;
        let n_freqs = n_fft / 2 + 1;

        let mut spec = Array2::<f32>::zeros((n_freqs, n_frames));
        let mut input = vec![0.0f32; n_fft];
        let mut output = vec![Complex::new(0.0f32, 0.0); n_freqs];

        for frame in 0..n_frames {
            let start = frame * hop;
            for (dst, (&s, &w)) in input
                .iter_mut()
                .zip(padded[start..start + n_fft].iter().zip(&self.window))
            {
                *dst = s * w;
            }

            self.fft.process(&mut input, &mut output).map_err(|e| {
                MediaError::classification_failed(Modality::Audio, format!("FFT failed: {}", e))
            })?;

            for (bin, c) in output.iter().enumerate() {
                spec[[bin, frame]] = c.norm_sqr();
            }
        }

        Ok(spec)
    }

    /// Stacked features `[n_mels + n_mfcc, frames]`.
    pub fn extract(&self, samples: &[f32]) -> MediaResult<Array2<f32>> {
        let power = self.power_spectrogram(samples)?;

        let mel = self.mel_filterbank.dot(&power);
        let mfcc_mel = self.mfcc_filterbank.dot(&power);
        let mfcc = self.dct.dot(&power_to_db(&mfcc_mel, self.config.top_db));

        concatenate(Axis(0), &[mel.view(), mfcc.view()]).map_err(|e| {
            MediaError::classification_failed(
                Modality::Audio,
                format!("Feature stacking failed: {}", e),
            )
        })
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

/// HTK mel scale.
fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Periodic Hann window.
fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos()) as f32)
        .collect()
}

/// Triangular filters between 0 Hz and Nyquist, `[n_mels, n_freqs]`.
fn mel_filterbank(n_mels: usize, n_freqs: usize, sample_rate: f64) -> Array2<f32> {
    let nyquist = sample_rate / 2.0;
    let mel_max = hz_to_mel(nyquist);

    let hz_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    let bin_hz = |bin: usize| {
        if n_freqs > 1 {
            nyquist * bin as f64 / (n_freqs - 1) as f64
        } else {
            0.0
        }
    };

    Array2::from_shape_fn((n_mels, n_freqs), |(m, bin)| {
        let f = bin_hz(bin);
        let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
        let rising = (f - left) / (center - left);
        let falling = (right - f) / (right - center);
        rising.min(falling).max(0.0) as f32
    })
}

/// Orthonormal DCT-II, `[n_out, n_in]`.
fn dct_matrix(n_out: usize, n_in: usize) -> Array2<f32> {
    let scale = (2.0 / n_in as f64).sqrt();
    Array2::from_shape_fn((n_out, n_in), |(k, n)| {
        let mut v = (PI / n_in as f64 * (n as f64 + 0.5) * k as f64).cos() * scale;
        if k == 0 {
            v /= 2.0_f64.sqrt();
        }
        v as f32
    })
}

/// Power to decibels, floored at `max - top_db`.
fn power_to_db(power: &Array2<f32>, top_db: f32) -> Array2<f32> {
    const AMIN: f32 = 1e-10;
    let db = power.mapv(|p| 10.0 * p.max(AMIN).log10());
    let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - top_db;
    db.mapv(|v| v.max(floor))
}

/// Mirror `pad` samples at each end, excluding the edge sample.
fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let len = samples.len();
    let mut out = Vec::with_capacity(len + 2 * pad);
    out.extend((1..=pad).rev().map(|i| samples[i.min(len - 1)]));
    out.extend_from_slice(samples);
    out.extend((0..pad).map(|i| samples[len.saturating_sub(2 + i)]));
    out
}

//! Spectral front-end (spec §4.2): PCM samples to a log-mel
//! spectrogram. Hand-rolled on top of `rustfft` — no mel/STFT crate is
//! present anywhere in the retrieved corpus, so the STFT and mel
//! filterbank are implemented directly, the same way `openmeters` and
//! `kannaka-memory`'s `audio` feature build their own spectral
//! transforms on top of `rustfft`/`realfft`.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::{DB_FLOOR, FMAX, FMIN, HOP_SIZE, MEL_BANDS, SAMPLE_RATE, WINDOW_SIZE};

/// A `bands x frames` matrix of dB-normalised mel energies, row-major
/// by band (spec §3: "256 mel bins x T time frames").
#[derive(Clone, Debug)]
pub struct Matrix {
    bands: usize,
    frames: usize,
    data: Vec<f32>,
}

impl Matrix {
    fn zeros(bands: usize, frames: usize) -> Self {
        Matrix {
            bands,
            frames,
            data: vec![0.0; bands * frames],
        }
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn get(&self, band: usize, frame: usize) -> f32 {
        self.data[band * self.frames + frame]
    }

    #[inline]
    fn set(&mut self, band: usize, frame: usize, value: f32) {
        self.data[band * self.frames + frame] = value;
    }

    pub fn max(&self) -> f32 {
        self.data.iter().cloned().fold(f32::MIN, f32::max)
    }
}

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos())
        .collect()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank: `MEL_BANDS` rows, one column per FFT bin
/// (`window_size / 2 + 1`), covering `[FMIN, FMAX]` Hz.
fn mel_filterbank(window_size: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let n_fft_bins = window_size / 2 + 1;
    let mel_min = hz_to_mel(FMIN);
    let mel_max = hz_to_mel(FMAX);
    let mel_points: Vec<f32> = (0..MEL_BANDS + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (MEL_BANDS + 1) as f32)
        .collect();
    let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz(m)).collect();
    let bin_points: Vec<f32> = hz_points
        .iter()
        .map(|&hz| hz * window_size as f32 / sample_rate as f32)
        .collect();

    let mut filters = vec![vec![0.0f32; n_fft_bins]; MEL_BANDS];
    for band in 0..MEL_BANDS {
        let left = bin_points[band];
        let center = bin_points[band + 1];
        let right = bin_points[band + 2];
        for (bin, slot) in filters[band].iter_mut().enumerate() {
            let bin = bin as f32;
            if bin >= left && bin <= center && center > left {
                *slot = (bin - left) / (center - left);
            } else if bin > center && bin <= right && right > center {
                *slot = (right - bin) / (right - center);
            }
        }
    }
    filters
}

/// `pcm -> Matrix[256, T]` (spec §4.2).
///
/// `pcm` must already be mono at `SAMPLE_RATE` Hz (the Decoder Adapter
/// guarantees this). Frames shorter than `WINDOW_SIZE` are padded with
/// silence rather than dropped, so very short clips still produce a
/// (possibly single-frame) spectrogram.
pub fn spectrogram(pcm: &[f32]) -> Matrix {
    let window = hann_window(WINDOW_SIZE);
    let filterbank = mel_filterbank(WINDOW_SIZE, SAMPLE_RATE);

    let frames = if pcm.is_empty() {
        0
    } else {
        1 + pcm.len().saturating_sub(1) / HOP_SIZE
    };
    let mut matrix = Matrix::zeros(MEL_BANDS, frames);
    if frames == 0 {
        return matrix;
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(WINDOW_SIZE);
    let n_fft_bins = WINDOW_SIZE / 2 + 1;

    let mut buffer = vec![Complex::new(0.0f32, 0.0); WINDOW_SIZE];
    for frame_idx in 0..frames {
        let start = frame_idx * HOP_SIZE;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = start
                .checked_add(i)
                .and_then(|idx| pcm.get(idx))
                .copied()
                .unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process(&mut buffer);

        let power: Vec<f32> = buffer[..n_fft_bins].iter().map(|c| c.norm_sqr()).collect();
        for (band, filter) in filterbank.iter().enumerate() {
            let energy: f32 = power.iter().zip(filter.iter()).map(|(p, w)| p * w).sum();
            matrix.set(band, frame_idx, energy);
        }
    }

    // dB relative to the matrix-wide maximum (spec §4.2).
    let max_energy = matrix.max().max(1e-12);
    for v in matrix.data.iter_mut() {
        let ratio = (*v).max(0.0) / max_energy;
        *v = (10.0 * ratio.max(1e-12).log10()).max(DB_FLOOR);
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pcm_produces_empty_matrix() {
        let m = spectrogram(&[]);
        assert_eq!(m.frames(), 0);
        assert_eq!(m.bands(), MEL_BANDS);
    }

    #[test]
    fn short_pcm_still_produces_one_frame() {
        let pcm = vec![0.1f32; 100];
        let m = spectrogram(&pcm);
        assert_eq!(m.frames(), 1);
    }

    #[test]
    fn constant_signal_has_bounded_db_values() {
        let pcm = vec![0.0f32; WINDOW_SIZE * 3];
        let m = spectrogram(&pcm);
        for band in 0..m.bands() {
            for frame in 0..m.frames() {
                let v = m.get(band, frame);
                assert!(v.is_finite());
                assert!(v <= 0.0);
            }
        }
    }

    #[test]
    fn tone_produces_energy_concentrated_near_its_frequency() {
        let freq = 1000.0f32;
        let n = WINDOW_SIZE * 4;
        let pcm: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect();
        let m = spectrogram(&pcm);
        assert!(m.frames() > 0);
        // every frame should have a finite max (i.e. peak detection has
        // something non-degenerate to work with downstream).
        for frame in 0..m.frames() {
            let max = (0..m.bands()).map(|b| m.get(b, frame)).fold(f32::MIN, f32::max);
            assert!(max.is_finite());
        }
    }
}

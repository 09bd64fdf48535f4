use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Anything that can copy the latest frequency snapshot into a byte buffer
///
/// The render loop reads through this seam so tests can substitute a
/// scripted source for the live analyzer.
pub trait SnapshotSource {
    fn fill_frequency_bytes(&mut self, out: &mut [u8]);
}

/// Computes frequency snapshots from the most recent window of audio
///
/// Holds the last `window_size` captured samples; on demand, applies a Hann
/// window, runs a forward FFT and scales the first `window_size / 2` bin
/// magnitudes into unsigned bytes. No history beyond the current window is
/// retained.
pub struct SpectrumAnalyzer {
    window_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    ring: VecDeque<f32>,
    scratch: Vec<Complex<f32>>,
}

// Scaling applied to bin magnitudes before the byte conversion; the square
// root keeps quiet input visible, like the bar scaling in the renderer.
const MAGNITUDE_AMPLIFICATION: f32 = 1.5;

impl SpectrumAnalyzer {
    pub fn new(window_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);

        // Hann window coefficients: 0.5 * (1 - cos(2π * i / (N-1))),
        // applied to reduce spectral leakage
        let window = (0..window_size)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (window_size - 1) as f32).cos())
            })
            .collect();

        Self {
            window_size,
            fft,
            window,
            ring: VecDeque::with_capacity(window_size),
            scratch: vec![Complex { re: 0.0, im: 0.0 }; window_size],
        }
    }

    /// Number of frequency bins a snapshot holds
    pub fn bin_count(&self) -> usize {
        self.window_size / 2
    }

    /// Feeds captured samples, keeping only the most recent window
    pub fn feed(&mut self, samples: &[f32]) {
        for &sample in samples {
            if self.ring.len() == self.window_size {
                self.ring.pop_front();
            }
            self.ring.push_back(sample);
        }
    }
}

impl SnapshotSource for SpectrumAnalyzer {
    fn fill_frequency_bytes(&mut self, out: &mut [u8]) {
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = self.ring.get(i).copied().unwrap_or(0.0);
            *slot = Complex {
                re: sample * self.window[i],
                im: 0.0,
            };
        }

        self.fft.process(&mut self.scratch);

        let bins = self.bin_count();
        let norm = 2.0 / self.window_size as f32;
        for (i, slot) in out.iter_mut().enumerate().take(bins) {
            let magnitude = self.scratch[i].norm() * norm;
            let scaled = (magnitude.sqrt() * MAGNITUDE_AMPLIFICATION).min(1.0);
            *slot = (scaled * 255.0) as u8;
        }
        for slot in out.iter_mut().skip(bins) {
            *slot = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_count_is_half_the_window() {
        for window_size in [64usize, 128, 256, 512] {
            assert_eq!(SpectrumAnalyzer::new(window_size).bin_count(), window_size / 2);
        }
    }

    #[test]
    fn silence_produces_zero_snapshot() {
        let mut analyzer = SpectrumAnalyzer::new(256);
        analyzer.feed(&vec![0.0; 256]);
        let mut out = vec![0xffu8; analyzer.bin_count()];
        analyzer.fill_frequency_bytes(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn sine_peaks_in_the_matching_bin() {
        let window_size = 256;
        let target_bin = 16;
        let mut analyzer = SpectrumAnalyzer::new(window_size);

        let samples: Vec<f32> = (0..window_size)
            .map(|i| {
                (2.0 * std::f32::consts::PI * target_bin as f32 * i as f32 / window_size as f32)
                    .sin()
            })
            .collect();
        analyzer.feed(&samples);

        let mut out = vec![0u8; analyzer.bin_count()];
        analyzer.fill_frequency_bytes(&mut out);

        let peak = out
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, target_bin);
        assert!(out[target_bin] > 0);
    }

    #[test]
    fn feed_keeps_only_the_latest_window() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        analyzer.feed(&vec![1.0; 64]);
        analyzer.feed(&vec![0.0; 64]);
        let mut out = vec![0u8; analyzer.bin_count()];
        analyzer.fill_frequency_bytes(&mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn overlong_output_buffer_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        analyzer.feed(&vec![0.5; 64]);
        let mut out = vec![0xffu8; 64]; // twice the bin count
        analyzer.fill_frequency_bytes(&mut out);
        assert!(out.iter().skip(32).all(|&b| b == 0));
    }
}

//! # Spectral Analyser Module
//!
//! A rolling-window spectrum analyser that turns a live sample stream into the
//! per-bin decibel snapshots the chord pipeline consumes. It behaves like a
//! browser `AnalyserNode`:
//!
//! ## Features
//! - Keeps the most recent `transform_size` samples
//! - Blackman windowing before the forward FFT (RustFFT)
//! - Magnitudes scaled by `1 / N` and smoothed across snapshots
//! - Decibel conversion with a configurable floor

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::analysis::SpectrumSource;
use crate::config::AnalysisConfig;
use crate::error::{ChordError, Result};

/// Applies a Blackman window (alpha = 0.16) in place.
fn apply_blackman_window(buffer: &mut [Complex<f32>]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let a0 = 0.42;
    let a1 = 0.5;
    let a2 = 0.08;
    let denom = n as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let phase = 2.0 * std::f32::consts::PI * i as f32 / denom;
        let w = a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos();
        sample.re *= w;
    }
}

/// Streaming spectrum analyser over a fixed-size rolling window.
pub struct Analyser {
    sample_rate: f64,
    transform_size: usize,
    smoothing_time_constant: f32,
    min_decibels: f32,
    fft: Arc<dyn Fft<f32>>,
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for Analyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyser")
            .field("sample_rate", &self.sample_rate)
            .field("transform_size", &self.transform_size)
            .field("smoothing_time_constant", &self.smoothing_time_constant)
            .finish()
    }
}

impl Analyser {
    /// Creates an analyser whose window starts out as silence.
    pub fn new(
        transform_size: usize,
        sample_rate: f64,
        smoothing_time_constant: f64,
        min_decibels: f64,
    ) -> Result<Self> {
        if transform_size < 2 || !transform_size.is_power_of_two() {
            return Err(ChordError::InvalidTransformSize(transform_size));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ChordError::InvalidSampleRate(sample_rate));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(transform_size);

        Ok(Self {
            sample_rate,
            transform_size,
            smoothing_time_constant: smoothing_time_constant.clamp(0.0, 1.0) as f32,
            min_decibels: min_decibels as f32,
            fft,
            samples: std::iter::repeat_n(0.0, transform_size).collect(),
            smoothed: vec![0.0; transform_size / 2],
            scratch: vec![Complex { re: 0.0, im: 0.0 }; transform_size],
        })
    }

    /// Creates an analyser from the session config.
    pub fn from_config(config: &AnalysisConfig, sample_rate: f64) -> Result<Self> {
        Self::new(
            config.transform_size,
            sample_rate,
            config.smoothing_time_constant,
            config.min_decibels,
        )
    }

    /// Appends samples, discarding the oldest so the window stays `transform_size` long.
    pub fn push_samples(&mut self, data: &[f32]) {
        let skip = data.len().saturating_sub(self.transform_size);
        for &sample in &data[skip..] {
            if self.samples.len() == self.transform_size {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// Runs one transform and updates the smoothed magnitude state.
    fn update_spectrum(&mut self) {
        for (slot, &sample) in self.scratch.iter_mut().zip(self.samples.iter()) {
            *slot = Complex { re: sample, im: 0.0 };
        }
        apply_blackman_window(&mut self.scratch);
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.transform_size as f32;
        let tau = self.smoothing_time_constant;
        for (smoothed, c) in self.smoothed.iter_mut().zip(self.scratch.iter()) {
            let magnitude = c.norm() * scale;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }
    }
}

impl SpectrumSource for Analyser {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn transform_size(&self) -> usize {
        self.transform_size
    }

    fn read_frequency_db(&mut self, out: &mut [f32]) {
        self.update_spectrum();
        let floor = self.min_decibels;
        for (db, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            let value = 20.0 * magnitude.log10();
            *db = if value.is_finite() { value.max(floor) } else { floor };
        }
    }

    fn read_time_domain(&mut self, out: &mut [f32]) {
        for (slot, &sample) in out.iter_mut().zip(self.samples.iter()) {
            *slot = sample;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn silence_sits_at_the_floor() {
        let mut analyser = Analyser::new(1024, 44100.0, 0.0, -100.0).unwrap();
        let mut db = vec![0.0; 512];
        analyser.read_frequency_db(&mut db);
        assert!(db.iter().all(|&v| v == -100.0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyser = Analyser::new(4096, 44100.0, 0.0, -100.0).unwrap();
        analyser.push_samples(&sine(440.0, 44100.0, 4096, 0.5));
        let mut db = vec![0.0; 2048];
        analyser.read_frequency_db(&mut db);
        let peak_bin = db
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let expected = (440.0 * 4096.0 / 44100.0_f32).round() as usize;
        assert!(peak_bin.abs_diff(expected) <= 1, "peak at {peak_bin}, expected {expected}");
        assert!(db[peak_bin] > -60.0);
    }

    #[test]
    fn window_keeps_latest_samples() {
        let mut analyser = Analyser::new(4, 8000.0, 0.0, -100.0).unwrap();
        analyser.push_samples(&[1.0, 2.0, 3.0]);
        analyser.push_samples(&[4.0, 5.0, 6.0, 7.0, 8.0]);
        let mut time = [0.0; 4];
        analyser.read_time_domain(&mut time);
        assert_eq!(time, [5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn smoothing_blends_snapshots() {
        let mut analyser = Analyser::new(1024, 44100.0, 0.5, -200.0).unwrap();
        analyser.push_samples(&sine(1000.0, 44100.0, 1024, 0.5));
        let mut first = vec![0.0; 512];
        analyser.read_frequency_db(&mut first);
        let mut second = vec![0.0; 512];
        analyser.read_frequency_db(&mut second);
        // Same input twice: the smoothed magnitude climbs from 0.5x to 0.75x.
        let bin = (1000.0 * 1024.0 / 44100.0_f32).round() as usize;
        let gain_db = second[bin] - first[bin];
        assert!((gain_db - 20.0 * 1.5f32.log10()).abs() < 0.01);
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert!(Analyser::new(1000, 44100.0, 0.3, -100.0).is_err());
    }
}

//! # Chroma Module
//!
//! Folds a decibel magnitude spectrum into a 12-element pitch-class energy
//! vector. A [`ChromaMap`] assigns each usable frequency bin to exactly one
//! pitch class; [`extract_chroma`] sums linear magnitudes per class.
//!
//! Two vector forms exist and are kept as distinct types: [`RawChroma`]
//! (linear magnitude sums, unnormalized) and [`NormalizedChroma`] (unit L2
//! norm). The matcher needs both.

use crate::config::{MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ, NORMALIZATION_EPSILON};
use crate::error::{ChordError, Result};
use crate::tuning::{PITCH_CLASS_COUNT, PitchClass, pitch_class_of_frequency};

/// Unnormalized per-pitch-class energy for one tick. All components are >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawChroma(pub [f64; PITCH_CLASS_COUNT]);

/// Chroma scaled to unit L2 norm (or all zeros).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedChroma(pub [f64; PITCH_CLASS_COUNT]);

impl RawChroma {
    pub fn zero() -> Self {
        RawChroma([0.0; PITCH_CLASS_COUNT])
    }

    pub fn values(&self) -> &[f64; PITCH_CLASS_COUNT] {
        &self.0
    }

    /// Largest component.
    pub fn peak(&self) -> f64 {
        self.0.iter().copied().fold(0.0, f64::max)
    }

    pub fn l2_norm(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Divides by `norm + 1e-10`; the epsilon keeps an all-zero vector finite.
    pub fn normalize(&self) -> NormalizedChroma {
        let norm = self.l2_norm() + NORMALIZATION_EPSILON;
        NormalizedChroma(self.0.map(|v| v / norm))
    }

    /// Each component divided by the peak (floored at 1e-6), for bar displays.
    pub fn relative_levels(&self) -> [f64; PITCH_CLASS_COUNT] {
        let max = self.peak().max(1e-6);
        self.0.map(|v| v / max)
    }
}

impl NormalizedChroma {
    pub fn values(&self) -> &[f64; PITCH_CLASS_COUNT] {
        &self.0
    }
}

/// Immutable bin -> pitch-class table for one (transform size, sample rate) pair.
///
/// Index `i` holds the pitch class that bin `i` contributes to, or `None` for
/// bin 0 and for bins whose centre frequency falls outside the usable band.
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaMap {
    transform_size: usize,
    sample_rate: f64,
    bins: Vec<Option<PitchClass>>,
}

impl ChromaMap {
    /// Builds the map over the default 20 Hz - 5 kHz band.
    pub fn new(transform_size: usize, sample_rate: f64) -> Result<Self> {
        Self::with_band(transform_size, sample_rate, MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)
    }

    /// Builds the map for a custom band. Frequencies strictly outside
    /// `[min_hz, max_hz]` contribute to no pitch class.
    pub fn with_band(
        transform_size: usize,
        sample_rate: f64,
        min_hz: f64,
        max_hz: f64,
    ) -> Result<Self> {
        if transform_size < 2 || !transform_size.is_power_of_two() {
            return Err(ChordError::InvalidTransformSize(transform_size));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ChordError::InvalidSampleRate(sample_rate));
        }

        let bin_count = transform_size / 2;
        let mut bins = vec![None; bin_count];
        for (i, slot) in bins.iter_mut().enumerate().skip(1) {
            let freq = i as f64 * sample_rate / transform_size as f64;
            if freq < min_hz || freq > max_hz {
                continue;
            }
            *slot = Some(pitch_class_of_frequency(freq));
        }

        let mapped = bins.iter().filter(|b| b.is_some()).count();
        log::debug!(
            "Built chroma map: {} of {} bins mapped (size={}, rate={} Hz)",
            mapped,
            bin_count,
            transform_size,
            sample_rate
        );

        Ok(Self {
            transform_size,
            sample_rate,
            bins,
        })
    }

    pub fn transform_size(&self) -> usize {
        self.transform_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of bins a magnitude snapshot is expected to carry (`transform_size / 2`).
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// The pitch class bin `bin` contributes to, if any.
    pub fn pitch_class(&self, bin: usize) -> Option<PitchClass> {
        self.bins.get(bin).copied().flatten()
    }
}

/// Sums the linear magnitude (`10^(dB/20)`) of every mapped bin into its pitch class.
///
/// Bins past the end of the map are ignored. The result is deliberately left
/// unnormalized.
pub fn extract_chroma(magnitudes_db: &[f32], map: &ChromaMap) -> RawChroma {
    let mut chroma = [0.0; PITCH_CLASS_COUNT];
    for (db, pc) in magnitudes_db.iter().zip(map.bins.iter()) {
        if let Some(pc) = pc {
            chroma[pc.index()] += 10f64.powf(*db as f64 / 20.0);
        }
    }
    RawChroma(chroma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_deterministic() {
        let a = ChromaMap::new(8192, 44100.0).unwrap();
        let b = ChromaMap::new(8192, 44100.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.bin_count(), 4096);
    }

    #[test]
    fn out_of_band_bins_are_unmapped() {
        let map = ChromaMap::new(8192, 48000.0).unwrap();
        for bin in 0..map.bin_count() {
            let freq = bin as f64 * 48000.0 / 8192.0;
            let in_band = bin > 0 && (20.0..=5000.0).contains(&freq);
            assert_eq!(map.pitch_class(bin).is_some(), in_band, "bin {bin} at {freq} Hz");
        }
    }

    #[test]
    fn a440_bin_maps_to_a() {
        // 440 * 8192 / 44100 ~= 81.7, so bin 82 (~441.4 Hz) is nearest.
        let map = ChromaMap::new(8192, 44100.0).unwrap();
        assert_eq!(map.pitch_class(82).map(|pc| pc.name()), Some("A"));
        assert_eq!(map.pitch_class(0), None);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(
            ChromaMap::new(1000, 44100.0),
            Err(ChordError::InvalidTransformSize(1000))
        ));
        assert!(matches!(
            ChromaMap::new(1024, 0.0),
            Err(ChordError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn extraction_sums_linear_magnitudes() {
        let map = ChromaMap::new(8192, 44100.0).unwrap();
        let mut db = vec![f32::NEG_INFINITY; map.bin_count()];
        db[82] = 0.0; // A, magnitude 1.0
        db[0] = 0.0; // unmapped DC bin is skipped
        let chroma = extract_chroma(&db, &map);
        assert!((chroma.values()[9] - 1.0).abs() < 1e-12);
        assert!((chroma.values().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn minus_twenty_db_is_a_tenth() {
        let map = ChromaMap::new(8192, 44100.0).unwrap();
        let mut db = vec![f32::NEG_INFINITY; map.bin_count()];
        db[82] = -20.0;
        let chroma = extract_chroma(&db, &map);
        assert!((chroma.values()[9] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn normalize_yields_unit_norm() {
        let raw = RawChroma([3.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let norm = raw.normalize();
        let l2: f64 = norm.values().iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((l2 - 1.0).abs() < 1e-9);
        assert_eq!(RawChroma::zero().normalize(), NormalizedChroma([0.0; 12]));
    }
}

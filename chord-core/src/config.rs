//! Configuration parameters for chord analysis.
//!
//! The defaults are the fixed constants of the detector. A config is read once
//! when a session starts and is not mutated afterwards.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChordError, Result};

/// Time between analysis ticks.
pub const ANALYSIS_INTERVAL_MS: u64 = 100;
/// Ticks whose loudest bin is below this level are treated as silence.
pub const SILENCE_THRESHOLD_DB: f64 = -60.0;
/// Minimum cosine similarity for a match to be reported.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;
/// Number of raw labels the smoother votes over.
pub const SMOOTHER_WINDOW: usize = 5;
/// A pitch class is active above this fraction of the tick's peak energy.
pub const ACTIVE_NOTE_RATIO: f64 = 0.3;
/// Lower edge of the usable frequency band.
pub const MIN_FREQUENCY_HZ: f64 = 20.0;
/// Upper edge of the usable frequency band.
pub const MAX_FREQUENCY_HZ: f64 = 5000.0;
/// Chroma peaks below this are treated as zero energy.
pub const ZERO_ENERGY_EPSILON: f64 = 1e-6;
/// Added to the L2 norm before dividing.
pub const NORMALIZATION_EPSILON: f64 = 1e-10;
/// Reported loudness when the time-domain window is all zeros.
pub const SILENT_RMS_DB: f64 = -100.0;

/// Default spectral snapshot size (samples per transform).
pub const DEFAULT_TRANSFORM_SIZE: usize = 8192;
/// Default analyser smoothing between successive snapshots.
pub const DEFAULT_SMOOTHING_TIME_CONSTANT: f64 = 0.3;
/// Floor applied when converting magnitudes to decibels.
pub const DEFAULT_MIN_DECIBELS: f64 = -100.0;

/// Analysis configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Milliseconds between ticks (default: 100)
    pub interval_ms: u64,

    /// Silence gate on the peak spectral bin, in dB (default: -60.0)
    pub silence_threshold_db: f64,

    /// Best-match score below which "no chord" is reported (default: 0.7)
    pub confidence_threshold: f64,

    /// Smoother window size in ticks (default: 5)
    pub smoother_window: usize,

    /// Active-note threshold as a fraction of peak chroma (default: 0.3)
    pub active_note_ratio: f64,

    /// Usable band lower edge in Hz (default: 20.0)
    pub min_frequency_hz: f64,

    /// Usable band upper edge in Hz (default: 5000.0)
    pub max_frequency_hz: f64,

    // Analyser (input collaborator) parameters
    /// Samples per spectral snapshot, a power of two (default: 8192)
    pub transform_size: usize,

    /// Exponential smoothing between snapshots, in [0, 1) (default: 0.3)
    pub smoothing_time_constant: f64,

    /// Decibel floor for silent bins (default: -100.0)
    pub min_decibels: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval_ms: ANALYSIS_INTERVAL_MS,
            silence_threshold_db: SILENCE_THRESHOLD_DB,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            smoother_window: SMOOTHER_WINDOW,
            active_note_ratio: ACTIVE_NOTE_RATIO,
            min_frequency_hz: MIN_FREQUENCY_HZ,
            max_frequency_hz: MAX_FREQUENCY_HZ,
            transform_size: DEFAULT_TRANSFORM_SIZE,
            smoothing_time_constant: DEFAULT_SMOOTHING_TIME_CONSTANT,
            min_decibels: DEFAULT_MIN_DECIBELS,
        }
    }
}

impl AnalysisConfig {
    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(invalid("interval_ms must be positive"));
        }
        if self.smoother_window == 0 {
            return Err(invalid("smoother_window must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(invalid("confidence_threshold must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.active_note_ratio) {
            return Err(invalid("active_note_ratio must be in [0, 1]"));
        }
        if !(self.min_frequency_hz >= 0.0 && self.min_frequency_hz < self.max_frequency_hz) {
            return Err(invalid("frequency band must satisfy 0 <= min < max"));
        }
        if self.transform_size < 2 || !self.transform_size.is_power_of_two() {
            return Err(ChordError::InvalidTransformSize(self.transform_size));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(invalid("smoothing_time_constant must be in [0, 1)"));
        }
        if !self.silence_threshold_db.is_finite() || !self.min_decibels.is_finite() {
            return Err(invalid("decibel levels must be finite"));
        }
        Ok(())
    }

    /// Loads and validates a config from a JSON file. Missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: AnalysisConfig = serde_json::from_str(&data)?;
        config.validate()?;
        log::info!("Loaded analysis config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Writes the config as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}

fn invalid(msg: &str) -> ChordError {
    ChordError::InvalidConfig(msg.to_string())
}

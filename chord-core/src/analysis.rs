//! # Analysis Orchestrator Module
//!
//! Runs one synchronous analysis pass per tick: loudness metering, the silence
//! gate, then chroma extraction, template matching and smoothing. Each pass
//! produces a [`ChordFrame`] for whatever renders results.
//!
//! ## Tick flow
//! - IDLE -> timer fires -> silence check
//! - SILENT: emit a zeroed frame, smoother untouched
//! - ACTIVE: extract -> match -> smooth -> emit
//!
//! Ticks never overlap: [`run_session`] drives them from a single thread and
//! every pass completes before the next timer message is read.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::chord::{ChordId, NO_CHORD_LABEL, TemplateLibrary};
use crate::chroma::{ChromaMap, RawChroma, extract_chroma};
use crate::config::{AnalysisConfig, SILENT_RMS_DB};
use crate::error::{ChordError, Result};
use crate::matcher::{ChordDetection, ChordMatcher};
use crate::smoothing::ChordSmoother;
use crate::tuning::PITCH_CLASS_COUNT;

/// A live source of spectral and time-domain snapshots.
///
/// Implemented by the audio front end; the analyzer only reads from it.
pub trait SpectrumSource {
    /// Sample rate in Hz.
    fn sample_rate(&self) -> f64;

    /// Samples per spectral snapshot (a power of two).
    fn transform_size(&self) -> usize;

    /// Fills `out` (length `transform_size / 2`) with per-bin magnitudes in dB.
    fn read_frequency_db(&mut self, out: &mut [f32]);

    /// Fills `out` (length `transform_size`) with the latest samples in [-1, 1].
    fn read_time_domain(&mut self, out: &mut [f32]);
}

/// Everything emitted for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordFrame {
    /// Stable chord label, or `"N/C"`.
    pub chord: String,
    /// Best-match cosine similarity in [0, 1].
    pub confidence: f64,
    /// Active pitch-class names in chromatic order.
    pub active_notes: Vec<&'static str>,
    /// Raw chroma vector for visualisation.
    pub chroma: [f64; PITCH_CLASS_COUNT],
    /// Root-mean-square of the time-domain window.
    pub rms: f64,
    /// `rms` in dB, or -100 when the window is all zeros.
    pub rms_db: f64,
    /// Loudest spectral bin in dB.
    pub peak_db: f64,
    /// Whether the silence gate fired.
    pub silent: bool,
}

impl ChordFrame {
    fn silent(rms: f64, rms_db: f64, peak_db: f64) -> Self {
        Self {
            chord: NO_CHORD_LABEL.to_string(),
            confidence: 0.0,
            active_notes: Vec::new(),
            chroma: [0.0; PITCH_CLASS_COUNT],
            rms,
            rms_db,
            peak_db,
            silent: true,
        }
    }

    /// Level meter position: -60 dB..0 dB mapped linearly onto [0, 1].
    pub fn level(&self) -> f64 {
        ((self.rms_db + 60.0) / 60.0).clamp(0.0, 1.0)
    }

    /// Chroma scaled so the strongest class is 1.0.
    pub fn chroma_levels(&self) -> [f64; PITCH_CLASS_COUNT] {
        RawChroma(self.chroma).relative_levels()
    }
}

/// Per-session analysis state: the chroma map, thresholds and the smoother.
///
/// The template library is borrowed, so any number of analyzers can share one.
#[derive(Debug)]
pub struct ChordAnalyzer<'lib> {
    library: &'lib TemplateLibrary,
    chroma_map: ChromaMap,
    matcher: ChordMatcher,
    smoother: ChordSmoother,
    silence_threshold_db: f64,
    frequency_db: Vec<f32>,
    time_domain: Vec<f32>,
}

impl<'lib> ChordAnalyzer<'lib> {
    /// Builds a session for a source with the given transform size and rate.
    pub fn new(
        config: &AnalysisConfig,
        library: &'lib TemplateLibrary,
        transform_size: usize,
        sample_rate: f64,
    ) -> Result<Self> {
        config.validate()?;
        let chroma_map = ChromaMap::with_band(
            transform_size,
            sample_rate,
            config.min_frequency_hz,
            config.max_frequency_hz,
        )?;

        log::info!(
            "Starting chord analysis session ({} Hz, transform size {})",
            sample_rate,
            transform_size
        );

        Ok(Self {
            library,
            chroma_map,
            matcher: ChordMatcher::from_config(config),
            smoother: ChordSmoother::new(config.smoother_window),
            silence_threshold_db: config.silence_threshold_db,
            frequency_db: vec![0.0; transform_size / 2],
            time_domain: vec![0.0; transform_size],
        })
    }

    /// Builds a session sized for `source`.
    pub fn for_source<S: SpectrumSource + ?Sized>(
        config: &AnalysisConfig,
        library: &'lib TemplateLibrary,
        source: &S,
    ) -> Result<Self> {
        Self::new(config, library, source.transform_size(), source.sample_rate())
    }

    pub fn chroma_map(&self) -> &ChromaMap {
        &self.chroma_map
    }

    pub fn smoother(&self) -> &ChordSmoother {
        &self.smoother
    }

    /// Reads one pair of snapshots from `source` and analyses them.
    pub fn tick<S: SpectrumSource + ?Sized>(&mut self, source: &mut S) -> ChordFrame {
        let mut time_domain = std::mem::take(&mut self.time_domain);
        let mut frequency_db = std::mem::take(&mut self.frequency_db);
        source.read_time_domain(&mut time_domain);
        source.read_frequency_db(&mut frequency_db);
        let frame = self.analyze(&frequency_db, &time_domain);
        self.time_domain = time_domain;
        self.frequency_db = frequency_db;
        frame
    }

    /// Analyses one frequency snapshot (dB per bin) and time-domain window.
    ///
    /// Snapshots shorter than expected are analysed as given; missing bins
    /// contribute nothing.
    pub fn analyze(&mut self, frequency_db: &[f32], time_domain: &[f32]) -> ChordFrame {
        if frequency_db.len() != self.chroma_map.bin_count() {
            log::warn!(
                "{}",
                ChordError::SnapshotLength {
                    expected: self.chroma_map.bin_count(),
                    got: frequency_db.len(),
                }
            );
        }

        let (rms, rms_db) = rms_level(time_domain);
        let peak_db = frequency_db
            .iter()
            .map(|&v| v as f64)
            .fold(f64::NEG_INFINITY, f64::max);

        if peak_db.is_nan() || peak_db < self.silence_threshold_db {
            log::trace!("Silent tick (peak {:.1} dB)", peak_db);
            return ChordFrame::silent(rms, rms_db, peak_db);
        }

        let chroma = extract_chroma(frequency_db, &self.chroma_map);
        let detection = self.matcher.detect(&chroma, self.library);
        let stable = self.smoother.push(detection.chord);

        log::debug!(
            "Tick: raw={} stable={} confidence={:.3} peak={:.1} dB",
            detection.label(),
            label_of(stable),
            detection.confidence,
            peak_db
        );

        build_frame(stable, &detection, chroma, rms, rms_db, peak_db)
    }
}

fn label_of(id: Option<ChordId>) -> String {
    id.map(|id| id.label())
        .unwrap_or_else(|| NO_CHORD_LABEL.to_string())
}

fn build_frame(
    stable: Option<ChordId>,
    detection: &ChordDetection,
    chroma: RawChroma,
    rms: f64,
    rms_db: f64,
    peak_db: f64,
) -> ChordFrame {
    ChordFrame {
        chord: label_of(stable),
        confidence: detection.confidence,
        active_notes: detection.active_notes.iter().map(|pc| pc.name()).collect(),
        chroma: chroma.0,
        rms,
        rms_db,
        peak_db,
        silent: false,
    }
}

/// RMS of a sample window and its level in dB (-100 for a zero window).
pub fn rms_level(samples: &[f32]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, SILENT_RMS_DB);
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum / samples.len() as f64).sqrt();
    let rms_db = if rms > 0.0 {
        20.0 * rms.log10()
    } else {
        SILENT_RMS_DB
    };
    (rms, rms_db)
}

/// Drives `analyzer` on a fixed interval until shutdown.
///
/// Before each tick, `prepare` is called with the source so pending audio can
/// be pushed into it. Frames go to `frames`; the loop stops on a shutdown
/// message, when `shutdown` disconnects, or when `frames` has no receiver.
pub fn run_session<S, F>(
    analyzer: &mut ChordAnalyzer<'_>,
    source: &mut S,
    interval: Duration,
    mut prepare: F,
    frames: &Sender<ChordFrame>,
    shutdown: &Receiver<()>,
) where
    S: SpectrumSource + ?Sized,
    F: FnMut(&mut S),
{
    let ticker = crossbeam_channel::tick(interval);
    log::info!("Analysis loop running every {:?}", interval);

    loop {
        crossbeam_channel::select! {
            recv(ticker) -> msg => {
                let Ok(scheduled) = msg else { break };
                let lag = Instant::now().saturating_duration_since(scheduled);
                if lag > interval {
                    log::warn!("Tick started {:?} late", lag);
                }
                prepare(source);
                let frame = analyzer.tick(source);
                if frames.send(frame).is_err() {
                    log::info!("Frame receiver dropped, stopping analysis loop");
                    break;
                }
            },
            recv(shutdown) -> _ => {
                log::info!("Received shutdown signal");
                break;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_zero_window_is_sentinel() {
        assert_eq!(rms_level(&[0.0; 64]), (0.0, -100.0));
        assert_eq!(rms_level(&[]), (0.0, -100.0));
    }

    #[test]
    fn rms_of_full_scale_square_is_zero_db() {
        let samples: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let (rms, rms_db) = rms_level(&samples);
        assert!((rms - 1.0).abs() < 1e-12);
        assert!(rms_db.abs() < 1e-9);
    }

    #[test]
    fn level_maps_minus_sixty_to_zero() {
        let mut frame = ChordFrame::silent(0.0, -60.0, -120.0);
        assert_eq!(frame.level(), 0.0);
        frame.rms_db = -30.0;
        assert!((frame.level() - 0.5).abs() < 1e-12);
        frame.rms_db = 6.0;
        assert_eq!(frame.level(), 1.0);
    }

    #[test]
    fn silent_frame_has_zero_chroma() {
        let config = AnalysisConfig::default();
        let mut analyzer =
            ChordAnalyzer::new(&config, TemplateLibrary::shared(), 1024, 44100.0).unwrap();
        let frame = analyzer.analyze(&vec![-90.0; 512], &vec![0.0; 1024]);
        assert!(frame.silent);
        assert_eq!(frame.chord, "N/C");
        assert_eq!(frame.confidence, 0.0);
        assert_eq!(frame.chroma, [0.0; 12]);
        assert!(analyzer.smoother().is_empty());
    }
}

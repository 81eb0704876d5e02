//! # Chord Matcher Module
//!
//! Scores a chroma vector against every template in the library and reports
//! the best match, a confidence score and the set of active pitch classes.
//!
//! Degenerate input never fails: near-zero energy and weak matches both come
//! back as "no chord" with a well-defined confidence.

use crate::chord::{ChordId, NO_CHORD_LABEL, TemplateLibrary};
use crate::chroma::RawChroma;
use crate::config::{ACTIVE_NOTE_RATIO, AnalysisConfig, CONFIDENCE_THRESHOLD, ZERO_ENERGY_EPSILON};
use crate::tuning::{PITCH_CLASS_COUNT, PitchClass};

/// Outcome of matching one chroma vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordDetection {
    /// Best template, or `None` when silent or below the confidence threshold.
    pub chord: Option<ChordId>,
    /// Cosine similarity of the best template, in [0, 1].
    pub confidence: f64,
    /// Pitch classes whose raw energy exceeds the active-note threshold.
    pub active_notes: Vec<PitchClass>,
}

impl ChordDetection {
    pub fn no_chord() -> Self {
        Self {
            chord: None,
            confidence: 0.0,
            active_notes: Vec::new(),
        }
    }

    pub fn label(&self) -> String {
        self.chord
            .map(|id| id.label())
            .unwrap_or_else(|| NO_CHORD_LABEL.to_string())
    }
}

/// Template matcher thresholds. The library is passed per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordMatcher {
    pub confidence_threshold: f64,
    pub active_note_ratio: f64,
}

impl Default for ChordMatcher {
    fn default() -> Self {
        Self {
            confidence_threshold: CONFIDENCE_THRESHOLD,
            active_note_ratio: ACTIVE_NOTE_RATIO,
        }
    }
}

impl ChordMatcher {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            active_note_ratio: config.active_note_ratio,
        }
    }

    /// Finds the best-matching template for a raw chroma vector.
    ///
    /// 1. Silence gate: a peak below 1e-6 returns "no chord" with confidence 0.
    /// 2. Normalizes and scores every template by dot product (both unit norm).
    ///    Ties keep the earliest template in library order.
    /// 3. Active notes come from the raw vector, not the normalized one.
    /// 4. A best score under the confidence threshold reports "no chord" but
    ///    keeps the score and the active notes.
    pub fn detect(&self, raw: &RawChroma, library: &TemplateLibrary) -> ChordDetection {
        let peak = raw.peak();
        if peak < ZERO_ENERGY_EPSILON {
            return ChordDetection::no_chord();
        }

        let normalized = raw.normalize();

        let mut best: Option<(ChordId, f64)> = None;
        for template in library.iter() {
            let score = dot(normalized.values(), &template.vector);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((template.id, score)),
            }
        }

        let active_notes = active_notes(raw, self.active_note_ratio);

        let Some((id, score)) = best else {
            return ChordDetection {
                chord: None,
                confidence: 0.0,
                active_notes,
            };
        };
        let confidence = score.clamp(0.0, 1.0);

        ChordDetection {
            chord: (score >= self.confidence_threshold).then_some(id),
            confidence,
            active_notes,
        }
    }
}

/// Matches with the default thresholds.
pub fn detect_chord(raw: &RawChroma, library: &TemplateLibrary) -> ChordDetection {
    ChordMatcher::default().detect(raw, library)
}

/// Pitch classes whose raw value strictly exceeds `ratio * peak`, in chromatic order.
pub fn active_notes(raw: &RawChroma, ratio: f64) -> Vec<PitchClass> {
    let threshold = ratio * raw.peak();
    PitchClass::all()
        .filter(|pc| raw.values()[pc.index()] > threshold)
        .collect()
}

/// Cosine similarity of two 12-vectors; 0 if either has zero norm.
pub fn cosine_similarity(a: &[f64; PITCH_CLASS_COUNT], b: &[f64; PITCH_CLASS_COUNT]) -> f64 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

fn dot(a: &[f64; PITCH_CLASS_COUNT], b: &[f64; PITCH_CLASS_COUNT]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

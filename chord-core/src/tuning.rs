//! # Musical Tuning Module
//!
//! Pitch-class vocabulary and the equal-temperament conversions the chroma
//! stage relies on. All conversions use A4 = 440 Hz (MIDI note 69).
//!
//! ## Features
//! - 12-tone chromatic pitch-class names (sharps only)
//! - Frequency to continuous MIDI pitch number
//! - Frequency to octave-independent pitch class

use std::fmt;

/// Reference frequency for A4 in Hz.
pub const A4_FREQUENCY: f64 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI: f64 = 69.0;

/// Number of pitch classes in the chromatic scale.
pub const PITCH_CLASS_COUNT: usize = 12;

/// Canonical pitch-class names, indexed by pitch class (C = 0).
pub const NOTE_NAMES: [&str; PITCH_CLASS_COUNT] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// An octave-independent note category in [0, 11].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PitchClass(u8);

impl PitchClass {
    /// Builds a pitch class from any integer, wrapping into [0, 11].
    ///
    /// The double modulo keeps the result non-negative for negative inputs
    /// (pitch numbers below MIDI 0).
    pub fn wrapping(value: i64) -> Self {
        let pc = ((value % 12) + 12) % 12;
        PitchClass(pc as u8)
    }

    /// Returns the pitch class for an index in [0, 11], or `None` otherwise.
    pub fn new(index: u8) -> Option<Self> {
        (index < PITCH_CLASS_COUNT as u8).then_some(PitchClass(index))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.index()]
    }

    /// Transposes upward by `semitones`, wrapping at the octave.
    pub fn transpose(self, semitones: u8) -> Self {
        PitchClass((self.0 + semitones % 12) % 12)
    }

    /// Iterates all twelve pitch classes in chromatic order starting at C.
    pub fn all() -> impl Iterator<Item = PitchClass> {
        (0..PITCH_CLASS_COUNT as u8).map(PitchClass)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Converts a frequency in Hz to a continuous MIDI pitch number.
///
/// `midi = 12 * log2(freq / 440) + 69`
pub fn frequency_to_midi(freq: f64) -> f64 {
    12.0 * (freq / A4_FREQUENCY).log2() + A4_MIDI
}

/// Maps a frequency to the pitch class of its nearest equal-tempered note.
pub fn pitch_class_of_frequency(freq: f64) -> PitchClass {
    let midi = frequency_to_midi(freq).round() as i64;
    PitchClass::wrapping(midi)
}

//! # Chord Vocabulary Module
//!
//! The fixed chord vocabulary: twelve interval shapes ([`ChordQuality`])
//! transposed to twelve roots gives 144 chords, each identified by a compact
//! [`ChordId`]. The [`TemplateLibrary`] holds one unit-norm chroma template
//! per chord and is built once, then shared read-only.

use std::fmt;

use once_cell::sync::Lazy;

use crate::tuning::{PITCH_CLASS_COUNT, PitchClass};

/// Number of chord qualities in the vocabulary.
pub const QUALITY_COUNT: usize = 12;

/// Number of templates: every root times every quality.
pub const TEMPLATE_COUNT: usize = PITCH_CLASS_COUNT * QUALITY_COUNT;

/// Label reported when no chord is recognised.
pub const NO_CHORD_LABEL: &str = "N/C";

/// A named interval shape. Declaration order is the enumeration order of the
/// template library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordQuality {
    Major,
    Minor,
    Dominant7,
    Major7,
    Minor7,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Diminished7,
    MinorMajor7,
    Augmented7,
}

impl ChordQuality {
    pub const ALL: [ChordQuality; QUALITY_COUNT] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Dominant7,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::Sus2,
        ChordQuality::Sus4,
        ChordQuality::Diminished7,
        ChordQuality::MinorMajor7,
        ChordQuality::Augmented7,
    ];

    /// Semitone offsets from the root.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Diminished7 => &[0, 3, 6, 9],
            ChordQuality::MinorMajor7 => &[0, 3, 7, 11],
            ChordQuality::Augmented7 => &[0, 4, 8, 10],
        }
    }

    /// Label suffix appended to the root name; empty for major.
    pub fn suffix(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Diminished7 => "dim7",
            ChordQuality::MinorMajor7 => "m(maj7)",
            ChordQuality::Augmented7 => "aug7",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A chord in the fixed vocabulary, packed as `root * 12 + quality`.
///
/// Values 0..144 follow template library order, so comparing ids compares
/// enumeration position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChordId(u8);

impl ChordId {
    pub fn new(root: PitchClass, quality: ChordQuality) -> Self {
        ChordId((root.index() * QUALITY_COUNT + quality.index()) as u8)
    }

    /// Rebuilds an id from its packed index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < TEMPLATE_COUNT).then_some(ChordId(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn root(self) -> PitchClass {
        PitchClass::wrapping((self.index() / QUALITY_COUNT) as i64)
    }

    pub fn quality(self) -> ChordQuality {
        ChordQuality::ALL[self.index() % QUALITY_COUNT]
    }

    /// Root name followed by the quality suffix, e.g. `"C#m7"`.
    pub fn label(self) -> String {
        format!("{}{}", self.root().name(), self.quality().suffix())
    }

    /// Parses a label such as `"F#maj7"` back into an id.
    pub fn parse(label: &str) -> Option<Self> {
        TEMPLATE_LIBRARY
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.id)
    }
}

impl fmt::Display for ChordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root().name(), self.quality().suffix())
    }
}

/// One chord's expected chroma shape.
#[derive(Debug, Clone)]
pub struct ChordTemplate {
    pub id: ChordId,
    pub label: String,
    /// Unit L2 norm indicator vector over the chord's pitch classes.
    pub vector: [f64; PITCH_CLASS_COUNT],
}

impl ChordTemplate {
    /// Builds the template for `quality` on `root`.
    pub fn new(root: PitchClass, quality: ChordQuality) -> Self {
        let mut vector = [0.0; PITCH_CLASS_COUNT];
        for &offset in quality.intervals() {
            vector[root.transpose(offset).index()] = 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        for v in vector.iter_mut() {
            *v /= norm;
        }

        let id = ChordId::new(root, quality);
        Self {
            id,
            label: id.label(),
            vector,
        }
    }
}

/// The 144 chord templates in fixed order: all qualities for root C, then C#, and so on.
///
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: Vec<ChordTemplate>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        let templates = PitchClass::all()
            .flat_map(|root| {
                ChordQuality::ALL
                    .iter()
                    .map(move |&quality| ChordTemplate::new(root, quality))
            })
            .collect();
        Self { templates }
    }

    /// The process-wide library, built on first use.
    pub fn shared() -> &'static TemplateLibrary {
        &TEMPLATE_LIBRARY
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: ChordId) -> &ChordTemplate {
        &self.templates[id.index()]
    }

    /// Templates in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &ChordTemplate> {
        self.templates.iter()
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Statically built template library, shared read-only by every session.
static TEMPLATE_LIBRARY: Lazy<TemplateLibrary> = Lazy::new(TemplateLibrary::new);

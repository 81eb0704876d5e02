// chord-core/src/lib.rs

//! The core logic for the live chord detector.
//! This crate turns periodic spectrum snapshots into a stabilized chord
//! label, a confidence score and the set of active pitch classes. It is
//! completely headless and contains no rendering code.

pub mod analysis;
pub mod audio;
pub mod chord;
pub mod chroma;
pub mod config;
pub mod error;
pub mod fft;
pub mod matcher;
pub mod smoothing;
pub mod tuning;

pub use analysis::{ChordAnalyzer, ChordFrame, SpectrumSource};
pub use chord::{ChordId, ChordQuality, TemplateLibrary};
pub use config::AnalysisConfig;
pub use error::{ChordError, Result};

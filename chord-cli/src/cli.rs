//! Command-line argument parsing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use chord_core::AnalysisConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "chordwatch")]
#[command(about = "Recognise the chord currently sounding in live audio", long_about = None)]
pub struct Args {
    /// Analyse a WAV file instead of listening to the microphone
    #[arg(long, short, value_name = "WAV")]
    pub input: Option<PathBuf>,

    /// Load analysis settings from a JSON file
    #[arg(long, short, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long, short, value_name = "SECONDS")]
    pub duration: Option<f64>,

    /// Print one JSON object per frame instead of a text line
    #[arg(long)]
    pub json: bool,

    /// Write the effective settings to a JSON file and exit
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<PathBuf>,
}

impl Args {
    /// Loads the config file if one was given, otherwise the defaults.
    pub fn load_config(&self) -> Result<AnalysisConfig> {
        match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display())),
            None => Ok(AnalysisConfig::default()),
        }
    }
}

//! Text rendering of analysis frames.
//!
//! One line per tick: time, chord, confidence, a level meter, a 12-cell
//! chroma strip and the active notes. `--json` switches to serde output.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;

use chord_core::analysis::ChordFrame;
use chord_core::tuning::NOTE_NAMES;

/// Block glyphs from empty to full, used for the chroma strip.
const LEVEL_GLYPHS: [char; 8] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '█'];
const METER_WIDTH: usize = 10;

/// Writes frames to stdout as text or JSON lines.
pub struct FramePrinter {
    json: bool,
    out: io::Stdout,
}

impl FramePrinter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            out: io::stdout(),
        }
    }

    pub fn print(&mut self, frame: &ChordFrame, elapsed: Duration) -> Result<()> {
        let line = if self.json {
            serde_json::to_string(frame)?
        } else {
            render_line(frame, elapsed)
        };
        let mut handle = self.out.lock();
        writeln!(handle, "{}", line)?;
        handle.flush()?;
        Ok(())
    }
}

/// Formats one frame, e.g. `  1.20s  Am       93%  [######    ] |▁ ▂ █|  A C E`.
pub fn render_line(frame: &ChordFrame, elapsed: Duration) -> String {
    let confidence = (frame.confidence * 100.0).round() as u32;
    let notes = if frame.active_notes.is_empty() {
        "-".to_string()
    } else {
        frame.active_notes.join(" ")
    };
    format!(
        "{:>7.2}s  {:<8} {:>3}%  [{}] |{}|  {}",
        elapsed.as_secs_f64(),
        frame.chord,
        confidence,
        level_meter(frame.level()),
        chroma_strip(frame),
        notes
    )
}

fn level_meter(level: f64) -> String {
    let filled = (level * METER_WIDTH as f64).round() as usize;
    let filled = filled.min(METER_WIDTH);
    format!("{}{}", "#".repeat(filled), " ".repeat(METER_WIDTH - filled))
}

fn chroma_strip(frame: &ChordFrame) -> String {
    if frame.silent {
        return " ".repeat(NOTE_NAMES.len());
    }
    let top = LEVEL_GLYPHS.len() - 1;
    frame
        .chroma_levels()
        .iter()
        .map(|&level| LEVEL_GLYPHS[((level * top as f64).round() as usize).min(top)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(chord: &str, confidence: f64, rms_db: f64) -> ChordFrame {
        let mut chroma = [0.0; 12];
        chroma[0] = 1.0;
        chroma[4] = 0.5;
        chroma[7] = 1.0;
        ChordFrame {
            chord: chord.to_string(),
            confidence,
            active_notes: vec!["C", "E", "G"],
            chroma,
            rms: 0.1,
            rms_db,
            peak_db: -12.0,
            silent: false,
        }
    }

    #[test]
    fn line_shows_chord_and_notes() {
        let line = render_line(&frame("C", 0.934, -30.0), Duration::from_millis(1200));
        assert!(line.contains("1.20s"));
        assert!(line.contains("C "));
        assert!(line.contains("93%"));
        assert!(line.contains("[#####     ]"));
        assert!(line.ends_with("C E G"));
    }

    #[test]
    fn strip_scales_to_peak() {
        let strip = chroma_strip(&frame("C", 1.0, -10.0));
        let cells: Vec<char> = strip.chars().collect();
        assert_eq!(cells.len(), 12);
        assert_eq!(cells[0], '█');
        assert_eq!(cells[4], '▄');
        assert_eq!(cells[1], ' ');
    }

    #[test]
    fn json_frame_has_fields() {
        let value = serde_json::to_value(frame("Am", 0.8, -20.0)).unwrap();
        assert_eq!(value["chord"], "Am");
        assert_eq!(value["active_notes"][1], "E");
        assert_eq!(value["chroma"].as_array().unwrap().len(), 12);
    }
}

//! End-to-end tests for the tick pipeline.
//!
//! A scripted spectrum source drives the analyzer with hand-built decibel
//! snapshots; the analyser tests synthesize sine chords and run the full
//! sample -> spectrum -> chord path.

use std::f32::consts::PI;
use std::time::Duration;

use chord_core::analysis::{ChordAnalyzer, SpectrumSource, run_session};
use chord_core::chroma::ChromaMap;
use chord_core::config::AnalysisConfig;
use chord_core::fft::Analyser;
use chord_core::tuning::pitch_class_of_frequency;
use chord_core::TemplateLibrary;

const TRANSFORM_SIZE: usize = 8192;
const SAMPLE_RATE: f64 = 44100.0;

/// Replays a fixed list of dB snapshots, repeating the last one.
struct ScriptedSource {
    frames: Vec<Vec<f32>>,
    next: usize,
}

impl ScriptedSource {
    fn new(frames: Vec<Vec<f32>>) -> Self {
        Self { frames, next: 0 }
    }
}

impl SpectrumSource for ScriptedSource {
    fn sample_rate(&self) -> f64 {
        SAMPLE_RATE
    }

    fn transform_size(&self) -> usize {
        TRANSFORM_SIZE
    }

    fn read_frequency_db(&mut self, out: &mut [f32]) {
        let idx = self.next.min(self.frames.len() - 1);
        out.copy_from_slice(&self.frames[idx]);
        self.next += 1;
    }

    fn read_time_domain(&mut self, out: &mut [f32]) {
        out.fill(0.1);
    }
}

/// A snapshot with one 0 dB bin per listed pitch class (near octave 4) and
/// -120 dB elsewhere.
fn snapshot_with(pitch_classes: &[usize]) -> Vec<f32> {
    let map = ChromaMap::new(TRANSFORM_SIZE, SAMPLE_RATE).unwrap();
    let mut db = vec![-120.0; TRANSFORM_SIZE / 2];
    for &pc in pitch_classes {
        let freq = 261.63 * 2f64.powf(pc as f64 / 12.0);
        let bin = (freq * TRANSFORM_SIZE as f64 / SAMPLE_RATE).round() as usize;
        assert_eq!(map.pitch_class(bin).map(|p| p.index()), Some(pc));
        db[bin] = 0.0;
    }
    db
}

fn silent_snapshot() -> Vec<f32> {
    vec![-120.0; TRANSFORM_SIZE / 2]
}

fn chord_signal(freqs: &[f32], sample_rate: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate;
            freqs.iter().map(|f| 0.3 * (2.0 * PI * f * t).sin()).sum()
        })
        .collect()
}

#[test]
fn scripted_c_major_is_reported() {
    let config = AnalysisConfig::default();
    let mut source = ScriptedSource::new(vec![snapshot_with(&[0, 4, 7])]);
    let mut analyzer =
        ChordAnalyzer::for_source(&config, TemplateLibrary::shared(), &source).unwrap();

    let frame = analyzer.tick(&mut source);
    assert!(!frame.silent);
    assert_eq!(frame.chord, "C");
    assert!((frame.confidence - 1.0).abs() < 1e-6);
    assert_eq!(frame.active_notes, vec!["C", "E", "G"]);
    assert!((frame.chroma[0] - 1.0).abs() < 1e-3);
}

#[test]
fn silence_resets_output_but_not_smoother() {
    let config = AnalysisConfig::default();
    let mut source = ScriptedSource::new(vec![
        snapshot_with(&[9, 0, 4]),
        snapshot_with(&[9, 0, 4]),
        snapshot_with(&[9, 0, 4]),
        silent_snapshot(),
        snapshot_with(&[7, 11, 2]),
    ]);
    let mut analyzer =
        ChordAnalyzer::for_source(&config, TemplateLibrary::shared(), &source).unwrap();

    for _ in 0..3 {
        assert_eq!(analyzer.tick(&mut source).chord, "Am");
    }

    let silent = analyzer.tick(&mut source);
    assert!(silent.silent);
    assert_eq!(silent.chord, "N/C");
    assert_eq!(silent.confidence, 0.0);
    assert_eq!(silent.chroma, [0.0; 12]);
    assert!(silent.active_notes.is_empty());

    // One G tick cannot outvote the Am history.
    assert_eq!(analyzer.tick(&mut source).chord, "Am");
}

#[test]
fn flicker_is_suppressed() {
    let config = AnalysisConfig::default();
    let c = snapshot_with(&[0, 4, 7]);
    let g = snapshot_with(&[7, 11, 2]);
    let mut source = ScriptedSource::new(vec![c.clone(), c.clone(), g, c.clone(), c]);
    let mut analyzer =
        ChordAnalyzer::for_source(&config, TemplateLibrary::shared(), &source).unwrap();

    let labels: Vec<String> = (0..5).map(|_| analyzer.tick(&mut source).chord).collect();
    assert_eq!(labels, vec!["C", "C", "C", "C", "C"]);
}

#[test]
fn weak_match_reports_no_chord_with_score() {
    let config = AnalysisConfig::default();
    let mut source = ScriptedSource::new(vec![snapshot_with(&(0..12).collect::<Vec<_>>())]);
    let mut analyzer =
        ChordAnalyzer::for_source(&config, TemplateLibrary::shared(), &source).unwrap();

    let frame = analyzer.tick(&mut source);
    assert_eq!(frame.chord, "N/C");
    assert!(frame.confidence > 0.0 && frame.confidence < 0.7);
    assert_eq!(frame.active_notes.len(), 12);
}

#[test]
fn analyser_recognises_synthesized_c_major() {
    let config = AnalysisConfig::default();
    let mut analyser = Analyser::from_config(&config, SAMPLE_RATE).unwrap();
    let mut analyzer =
        ChordAnalyzer::for_source(&config, TemplateLibrary::shared(), &analyser).unwrap();

    let signal = chord_signal(&[261.63, 329.63, 392.0], SAMPLE_RATE as f32, TRANSFORM_SIZE * 2);
    let hop = TRANSFORM_SIZE / 2;
    let mut last = None;
    for chunk in signal.chunks(hop) {
        analyser.push_samples(chunk);
        last = Some(analyzer.tick(&mut analyser));
    }

    let frame = last.unwrap();
    assert_eq!(frame.chord, "C");
    assert!(frame.confidence > 0.9, "confidence {}", frame.confidence);
    assert_eq!(frame.active_notes, vec!["C", "E", "G"]);
    assert!(frame.rms_db > -20.0 && frame.rms_db < 0.0);
}

#[test]
fn analyser_silence_is_gated() {
    let config = AnalysisConfig::default();
    let mut analyser = Analyser::from_config(&config, SAMPLE_RATE).unwrap();
    let mut analyzer =
        ChordAnalyzer::for_source(&config, TemplateLibrary::shared(), &analyser).unwrap();

    analyser.push_samples(&vec![0.0; TRANSFORM_SIZE]);
    let frame = analyzer.tick(&mut analyser);
    assert!(frame.silent);
    assert_eq!(frame.rms_db, -100.0);
    assert_eq!(frame.level(), 0.0);
}

#[test]
fn session_loop_emits_frames_until_shutdown() {
    let config = AnalysisConfig::default();
    let mut source = ScriptedSource::new(vec![snapshot_with(&[2, 5, 9])]);
    let mut analyzer =
        ChordAnalyzer::for_source(&config, TemplateLibrary::shared(), &source).unwrap();

    let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            run_session(
                &mut analyzer,
                &mut source,
                Duration::from_millis(5),
                |_| {},
                &frame_tx,
                &shutdown_rx,
            );
        });

        for _ in 0..3 {
            let frame = frame_rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(frame.chord, "Dm");
        }
        shutdown_tx.send(()).unwrap();
    });
}

#[test]
fn bins_map_to_nearest_pitch_class() {
    let map = ChromaMap::new(TRANSFORM_SIZE, SAMPLE_RATE).unwrap();
    for bin in 1..map.bin_count() {
        let freq = bin as f64 * SAMPLE_RATE / TRANSFORM_SIZE as f64;
        let expected = (20.0..=5000.0)
            .contains(&freq)
            .then(|| pitch_class_of_frequency(freq));
        assert_eq!(map.pitch_class(bin), expected);
    }
}

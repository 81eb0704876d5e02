//! # Chordwatch - Live Chord Detector
//!
//! Command-line front end for the chord detector. Listens to the default
//! microphone (or replays a WAV file) and prints the recognised chord,
//! confidence, active notes and a chroma strip once per analysis tick.
//!
//! ## Architecture
//! - **Main Thread**: argument parsing and frame rendering
//! - **Audio Thread**: capture, spectral analysis and the tick loop
//! - **Communication**: Crossbeam channels for samples, frames and shutdown

mod cli;
mod display;

use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};

use chord_core::analysis::{ChordAnalyzer, ChordFrame, run_session};
use chord_core::audio::{self, downmix};
use chord_core::fft::Analyser;
use chord_core::{AnalysisConfig, TemplateLibrary};

use cli::Args;
use display::FramePrinter;

/// Audio worker thread management structure.
///
/// Owns the capture and analysis thread and a way to shut it down.
struct AudioWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AudioWorker {
    /// Spawns the capture + analysis thread. Frames arrive on `frame_tx`.
    fn start(config: AnalysisConfig, frame_tx: Sender<ChordFrame>) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let thread_handle = thread::spawn(move || {
            log::debug!("[AUDIO-THREAD] Starting audio thread...");
            if let Err(e) = run_live_session(&config, &frame_tx, &shutdown_rx) {
                log::error!("[AUDIO-THREAD] Fatal error: {:#}", e);
            }
            log::debug!("[AUDIO-THREAD] Audio thread finished");
        });

        Self {
            shutdown_tx,
            thread_handle: Some(thread_handle),
        }
    }

    fn stop(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Audio thread panicked");
            }
        }
    }
}

/// Captures from the microphone and runs the tick loop until shutdown.
fn run_live_session(
    config: &AnalysisConfig,
    frame_tx: &Sender<ChordFrame>,
    shutdown_rx: &Receiver<()>,
) -> Result<()> {
    let (raw_audio_tx, raw_audio_rx) = crossbeam_channel::bounded::<Vec<f32>>(256);
    let (stream, sample_rate) = audio::start_audio_capture(raw_audio_tx)?;

    let mut analyser = Analyser::from_config(config, sample_rate as f64)?;
    let mut analyzer = ChordAnalyzer::for_source(config, TemplateLibrary::shared(), &analyser)?;

    run_session(
        &mut analyzer,
        &mut analyser,
        Duration::from_millis(config.interval_ms),
        |analyser| {
            for chunk in raw_audio_rx.try_iter() {
                analyser.push_samples(&chunk);
            }
        },
        frame_tx,
        shutdown_rx,
    );

    log::debug!("[AUDIO-THREAD] Stopping stream...");
    if let Err(e) = stream.pause() {
        log::warn!("[AUDIO-THREAD] Error pausing stream: {}", e);
    }
    drop(stream);
    Ok(())
}

/// Listens to the microphone, printing frames for `duration` (or forever).
fn listen(config: AnalysisConfig, duration: Option<Duration>, printer: &mut FramePrinter) -> Result<()> {
    let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
    let worker = AudioWorker::start(config, frame_tx);
    let started = Instant::now();

    loop {
        let remaining = match duration {
            Some(limit) => match limit.checked_sub(started.elapsed()) {
                Some(rest) => rest,
                None => break,
            },
            None => Duration::from_secs(3600),
        };
        match frame_rx.recv_timeout(remaining) {
            Ok(frame) => printer.print(&frame, started.elapsed())?,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if duration.is_some() {
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                worker.stop();
                return Err(anyhow!("audio thread stopped; see log for details"));
            }
        }
    }

    worker.stop();
    Ok(())
}

/// Replays a WAV file through the pipeline, one tick per analysis interval of audio.
fn analyze_file(
    path: &Path,
    config: &AnalysisConfig,
    duration: Option<Duration>,
    printer: &mut FramePrinter,
) -> Result<()> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };
    let samples = downmix(&interleaved, channels);

    log::info!(
        "Analysing {} ({} Hz, {} channel(s), {:.1}s)",
        path.display(),
        spec.sample_rate,
        channels,
        samples.len() as f64 / spec.sample_rate as f64
    );

    let mut analyser = Analyser::from_config(config, spec.sample_rate as f64)?;
    let mut analyzer = ChordAnalyzer::for_source(config, TemplateLibrary::shared(), &analyser)?;

    let hop = ((spec.sample_rate as u64 * config.interval_ms) / 1000).max(1) as usize;
    let limit = duration.map(|d| d.as_secs_f64());
    for (i, chunk) in samples.chunks(hop).enumerate() {
        let position = Duration::from_millis(config.interval_ms * (i as u64 + 1));
        if limit.is_some_and(|l| position.as_secs_f64() > l) {
            break;
        }
        analyser.push_samples(chunk);
        let frame = analyzer.tick(&mut analyser);
        printer.print(&frame, position)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = args.load_config()?;
    if let Some(path) = &args.write_config {
        config.save(path)?;
        log::info!("Wrote config to {}", path.display());
        return Ok(());
    }

    let duration = args.duration.map(Duration::from_secs_f64);
    let mut printer = FramePrinter::new(args.json);

    match &args.input {
        Some(path) => analyze_file(path, &config, duration, &mut printer),
        None => listen(config, duration, &mut printer),
    }
}

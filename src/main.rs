use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use parlo::assistant::{DisplayState, SilenceDetector, VoiceAssistant};
use parlo::cli::{self, Args, Mode};
use parlo::config::read_app_config;
use parlo::cycle_stats::{CycleStats, StatsReporter};
use parlo::recorder::ChunkRecorder;
use parlo::scene::Scene;
use parlo::session::{CaptureHooks, SilenceHook, Visualizer};
use parlo::speech::PiperSpeech;
use parlo::transcription::HttpTranscriber;
use parlo::ui::{self, UiHandles};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    cli::init_logging(&args);

    let config = read_app_config();
    let running = Arc::new(AtomicBool::new(true));
    let bin_count = config.bin_count();

    match args.mode {
        Mode::Visualize => {
            log::info!("Starting visualizer ({} bins)", bin_count);
            let visualizer = Visualizer::new(config.clone(), CaptureHooks::default());
            let scene = Scene::bars(config.visualizer.clone());
            ui::run(
                visualizer,
                scene,
                &config.keyboard_shortcuts,
                running,
                UiHandles::default(),
                bin_count,
            )
        }
        Mode::Assist => {
            log::info!(
                "Starting assistant against {}",
                config.transcription.endpoint
            );

            // Provision the fallback voice up front; speak-time failures
            // only restart the cycle, so a missing voice here is not fatal
            let fallback = config.speech.fallback_voice.clone();
            if let Err(e) = parlo::download::ensure_voice(&fallback).await {
                log::warn!("Could not provision voice {}: {:#}", fallback, e);
            }

            let recorder = Arc::new(Mutex::new(ChunkRecorder::new(config.sample_rate as u32)));
            let silence = Arc::new(Mutex::new(SilenceDetector::new(&config.silence)));
            let display = Arc::new(RwLock::new(DisplayState::Listening));
            let recording = Arc::new(AtomicBool::new(false));
            let stats = Arc::new(Mutex::new(CycleStats::new()));
            let (stop_tx, stop_rx) = mpsc::channel(4);

            let archive_dir = if config.save_recordings {
                Some(recordings_dir())
            } else {
                None
            };

            let transcriber = HttpTranscriber::new(config.transcription.endpoint.clone());
            let speaker = PiperSpeech::new(&config.speech);
            let assistant = VoiceAssistant::new(
                transcriber,
                speaker,
                recorder.clone(),
                silence.clone(),
                display.clone(),
                running.clone(),
                recording.clone(),
                stop_rx,
                stats.clone(),
                archive_dir,
            );

            StatsReporter::new(stats, running.clone(), config.log_stats_enabled)
                .start_periodic_reporting();
            tokio::spawn(assistant.run());

            let hooks = CaptureHooks {
                recorder: Some(recorder),
                silence: Some(SilenceHook {
                    detector: silence,
                    stop_tx: stop_tx.clone(),
                }),
            };
            let visualizer = Visualizer::new(config.clone(), hooks);
            let scene = Scene::wave(config.visualizer.clone());
            let handles = UiHandles {
                display: Some(display),
                recording: Some(recording),
                stop_tx: Some(stop_tx),
            };
            ui::run(
                visualizer,
                scene,
                &config.keyboard_shortcuts,
                running,
                handles,
                bin_count,
            )
        }
    }
}

fn recordings_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(format!("{}/.cache/parlo/recordings", home)),
        Err(_) => PathBuf::from("recordings"),
    }
}

//! Integration tests for the listening → processing → speaking cycle,
//! driven with scripted transcriber and speaker implementations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use parlo::assistant::{DisplayState, SilenceDetector, StopReason, VoiceAssistant};
use parlo::config::SilenceConfig;
use parlo::cycle_stats::CycleStats;
use parlo::recorder::ChunkRecorder;
use parlo::speech::Speak;
use parlo::transcription::{Transcribe, Transcription};

struct StubTranscriber {
    response: Option<Transcription>,
    delay: Duration,
    calls: Arc<Mutex<usize>>,
}

impl Transcribe for StubTranscriber {
    async fn transcribe(&self, _wav: Vec<u8>) -> anyhow::Result<Transcription> {
        *self.calls.lock() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.response {
            Some(t) => Ok(t.clone()),
            None => Err(anyhow::anyhow!("endpoint unreachable")),
        }
    }
}

struct SpySpeaker {
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl Speak for SpySpeaker {
    async fn speak(&self, text: &str, language: &str) -> anyhow::Result<()> {
        self.calls
            .lock()
            .push((text.to_string(), language.to_string()));
        Ok(())
    }
}

struct Cycle {
    recorder: Arc<Mutex<ChunkRecorder>>,
    display: Arc<RwLock<DisplayState>>,
    running: Arc<AtomicBool>,
    recording: Arc<AtomicBool>,
    stop_tx: mpsc::Sender<StopReason>,
    stats: Arc<Mutex<CycleStats>>,
    speaker_calls: Arc<Mutex<Vec<(String, String)>>>,
    transcribe_calls: Arc<Mutex<usize>>,
    task: tokio::task::JoinHandle<()>,
}

fn spawn_cycle(response: Option<Transcription>, delay: Duration) -> Cycle {
    let transcribe_calls = Arc::new(Mutex::new(0));
    let speaker_calls = Arc::new(Mutex::new(Vec::new()));

    let transcriber = StubTranscriber {
        response,
        delay,
        calls: transcribe_calls.clone(),
    };
    let speaker = SpySpeaker {
        calls: speaker_calls.clone(),
    };

    let recorder = Arc::new(Mutex::new(ChunkRecorder::new(16000)));
    let silence = Arc::new(Mutex::new(SilenceDetector::new(&SilenceConfig::default())));
    let display = Arc::new(RwLock::new(DisplayState::Listening));
    let running = Arc::new(AtomicBool::new(true));
    let recording = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(Mutex::new(CycleStats::new()));
    let (stop_tx, stop_rx) = mpsc::channel(4);

    let assistant = VoiceAssistant::new(
        transcriber,
        speaker,
        recorder.clone(),
        silence,
        display.clone(),
        running.clone(),
        recording.clone(),
        stop_rx,
        stats.clone(),
        None,
    );
    let task = tokio::spawn(assistant.run());

    Cycle {
        recorder,
        display,
        running,
        recording,
        stop_tx,
        stats,
        speaker_calls,
        transcribe_calls,
        task,
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}

async fn shutdown(cycle: Cycle) {
    cycle.running.store(false, Ordering::Relaxed);
    drop(cycle.stop_tx);
    tokio::time::timeout(Duration::from_secs(1), cycle.task)
        .await
        .expect("cycle task did not stop")
        .expect("cycle task panicked");
}

/// Records a chunk and ends the listening phase
async fn speak_and_stop(cycle: &Cycle) {
    wait_until(|| cycle.recording.load(Ordering::Relaxed)).await;
    cycle.recorder.lock().push(&[0.2; 512]);
    cycle.stop_tx.send(StopReason::Manual).await.unwrap();
}

#[tokio::test]
async fn transcription_failure_restarts_listening_without_speaking() {
    let cycle = spawn_cycle(None, Duration::ZERO);

    speak_and_stop(&cycle).await;

    wait_until(|| *cycle.transcribe_calls.lock() == 1).await;
    wait_until(|| cycle.recording.load(Ordering::Relaxed)).await;

    assert_eq!(*cycle.display.read(), DisplayState::Listening);
    assert!(cycle.speaker_calls.lock().is_empty());
    assert_eq!(cycle.stats.lock().transcription_failures, 1);
    assert_eq!(cycle.stats.lock().cycles_completed, 0);

    shutdown(cycle).await;
}

#[tokio::test]
async fn successful_transcription_is_spoken_then_listening_resumes() {
    let cycle = spawn_cycle(
        Some(Transcription {
            text: "hello".to_string(),
            language: "en-US".to_string(),
        }),
        Duration::ZERO,
    );

    speak_and_stop(&cycle).await;

    wait_until(|| !cycle.speaker_calls.lock().is_empty()).await;
    assert_eq!(
        cycle.speaker_calls.lock().clone(),
        vec![("hello".to_string(), "en-US".to_string())]
    );

    // speech completion re-enters listening
    wait_until(|| cycle.recording.load(Ordering::Relaxed)).await;
    assert_eq!(*cycle.display.read(), DisplayState::Listening);
    assert_eq!(cycle.stats.lock().cycles_completed, 1);

    shutdown(cycle).await;
}

#[tokio::test]
async fn the_cycle_restarts_indefinitely() {
    let cycle = spawn_cycle(
        Some(Transcription {
            text: "again".to_string(),
            language: "en-GB".to_string(),
        }),
        Duration::ZERO,
    );

    for round in 1..=3 {
        speak_and_stop(&cycle).await;
        wait_until(|| cycle.speaker_calls.lock().len() == round).await;
        wait_until(|| cycle.recording.load(Ordering::Relaxed)).await;
    }

    assert_eq!(cycle.stats.lock().cycles_completed, 3);

    shutdown(cycle).await;
}

#[tokio::test]
async fn empty_recording_never_reaches_the_endpoint() {
    let cycle = spawn_cycle(
        Some(Transcription {
            text: "unused".to_string(),
            language: "en-GB".to_string(),
        }),
        Duration::ZERO,
    );

    wait_until(|| cycle.recording.load(Ordering::Relaxed)).await;
    cycle.stop_tx.send(StopReason::Manual).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(*cycle.transcribe_calls.lock(), 0);
    assert!(cycle.speaker_calls.lock().is_empty());
    assert!(cycle.recording.load(Ordering::Relaxed));

    shutdown(cycle).await;
}

#[tokio::test]
async fn in_flight_request_completes_after_a_shutdown_request() {
    let cycle = spawn_cycle(
        Some(Transcription {
            text: "late".to_string(),
            language: "en-GB".to_string(),
        }),
        Duration::from_millis(100),
    );

    speak_and_stop(&cycle).await;
    wait_until(|| *cycle.transcribe_calls.lock() == 1).await;

    // request a stop while the transcription is in flight: the pending
    // request is not cancelled and its result is still applied
    cycle.running.store(false, Ordering::Relaxed);

    wait_until(|| !cycle.speaker_calls.lock().is_empty()).await;
    assert_eq!(cycle.speaker_calls.lock()[0].0, "late");

    shutdown(cycle).await;
}

#[tokio::test]
async fn silence_stop_reason_also_ends_the_recording() {
    let cycle = spawn_cycle(
        Some(Transcription {
            text: "quiet".to_string(),
            language: "en-GB".to_string(),
        }),
        Duration::ZERO,
    );

    wait_until(|| cycle.recording.load(Ordering::Relaxed)).await;
    cycle.recorder.lock().push(&[0.3; 256]);
    cycle.stop_tx.send(StopReason::Silence).await.unwrap();

    wait_until(|| !cycle.speaker_calls.lock().is_empty()).await;
    assert_eq!(cycle.speaker_calls.lock()[0].0, "quiet");

    shutdown(cycle).await;
}

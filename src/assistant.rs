use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::config::SilenceConfig;
use crate::cycle_stats::CycleStats;
use crate::recorder::ChunkRecorder;
use crate::speech::Speak;
use crate::transcription::Transcribe;

/// Which affordance the UI shows for the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Listening,
    Processing,
    Speaking,
}

/// Why a recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The user ended the recording
    Manual,
    /// The silence auto-stop triggered
    Silence,
}

/// Mean absolute amplitude of one capture block
pub fn mean_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}

/// Ends a recording after sustained quiet
///
/// Counts consecutive capture blocks below the threshold; only arms once
/// speech has been heard at all, so a recording never ends before the user
/// said anything. Disabled detectors never fire.
pub struct SilenceDetector {
    enabled: bool,
    threshold: f32,
    hangover_frames: usize,
    quiet_run: usize,
    heard_speech: bool,
}

impl SilenceDetector {
    pub fn new(config: &SilenceConfig) -> Self {
        Self {
            enabled: config.enabled,
            threshold: config.threshold,
            hangover_frames: config.hangover_frames,
            quiet_run: 0,
            heard_speech: false,
        }
    }

    /// Clears state for a fresh recording
    pub fn reset(&mut self) {
        self.quiet_run = 0;
        self.heard_speech = false;
    }

    /// Observes one block's level; returns true when the stop should fire
    pub fn observe(&mut self, level: f32) -> bool {
        if !self.enabled {
            return false;
        }
        if level >= self.threshold {
            self.heard_speech = true;
            self.quiet_run = 0;
            return false;
        }
        if !self.heard_speech {
            return false;
        }
        self.quiet_run += 1;
        if self.quiet_run >= self.hangover_frames {
            self.quiet_run = 0;
            self.heard_speech = false;
            true
        } else {
            false
        }
    }
}

/// Drives the listening → processing → speaking cycle
///
/// One task owns the whole cycle and awaits each stage in turn, so at most
/// one transcription request is in flight at any time. Any failure after
/// listening falls straight back to a fresh listening phase; the cycle has
/// no terminal state and runs until the running flag clears or the stop
/// channel closes.
pub struct VoiceAssistant<T, S> {
    transcriber: T,
    speaker: S,
    recorder: Arc<Mutex<ChunkRecorder>>,
    silence: Arc<Mutex<SilenceDetector>>,
    display: Arc<RwLock<DisplayState>>,
    running: Arc<AtomicBool>,
    recording: Arc<AtomicBool>,
    stop_rx: mpsc::Receiver<StopReason>,
    stats: Arc<Mutex<CycleStats>>,
    archive_dir: Option<PathBuf>,
}

impl<T: Transcribe, S: Speak> VoiceAssistant<T, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transcriber: T,
        speaker: S,
        recorder: Arc<Mutex<ChunkRecorder>>,
        silence: Arc<Mutex<SilenceDetector>>,
        display: Arc<RwLock<DisplayState>>,
        running: Arc<AtomicBool>,
        recording: Arc<AtomicBool>,
        stop_rx: mpsc::Receiver<StopReason>,
        stats: Arc<Mutex<CycleStats>>,
        archive_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            transcriber,
            speaker,
            recorder,
            silence,
            display,
            running,
            recording,
            stop_rx,
            stats,
            archive_dir,
        }
    }

    pub async fn run(mut self) {
        log::info!("Voice cycle started");

        while self.running.load(Ordering::Relaxed) {
            // Listening
            *self.display.write() = DisplayState::Listening;
            self.silence.lock().reset();
            self.recorder.lock().begin();
            self.recording.store(true, Ordering::Relaxed);

            let Some(reason) = self.stop_rx.recv().await else {
                break;
            };
            self.recording.store(false, Ordering::Relaxed);
            let captured = self.recorder.lock().finish();
            log::debug!(
                "Recording ended ({:?}, {:.2}s)",
                reason,
                captured.duration_seconds()
            );

            if captured.is_empty() {
                continue;
            }

            if let Some(dir) = &self.archive_dir {
                if let Err(e) = captured.save_archive(dir) {
                    log::warn!("Failed to archive recording: {:#}", e);
                }
            }

            // Processing
            *self.display.write() = DisplayState::Processing;
            let wav = match captured.to_wav_bytes() {
                Ok(wav) => wav,
                Err(e) => {
                    log::warn!("Failed to encode recording: {:#}", e);
                    continue;
                }
            };

            let request_start = Instant::now();
            let transcription = match self.transcriber.transcribe(wav).await {
                Ok(t) => {
                    self.stats.lock().record_success(
                        request_start.elapsed().as_secs_f32(),
                        captured.duration_seconds() as f32,
                    );
                    t
                }
                Err(e) => {
                    self.stats.lock().record_failure();
                    log::warn!("Transcription failed, restarting cycle: {:#}", e);
                    continue;
                }
            };
            log::info!(
                "Transcribed ({}): {}",
                transcription.language,
                transcription.text
            );

            // Speaking; playback completion (or failure) re-enters listening
            *self.display.write() = DisplayState::Speaking;
            if let Err(e) = self
                .speaker
                .speak(&transcription.text, &transcription.language)
                .await
            {
                log::warn!("Speech synthesis failed: {:#}", e);
            }
        }

        self.recording.store(false, Ordering::Relaxed);
        log::info!("Voice cycle stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(enabled: bool) -> SilenceDetector {
        SilenceDetector::new(&SilenceConfig {
            enabled,
            threshold: 0.1,
            hangover_frames: 3,
        })
    }

    #[test]
    fn disabled_detector_never_fires() {
        let mut d = detector(false);
        d.observe(0.5);
        for _ in 0..100 {
            assert!(!d.observe(0.0));
        }
    }

    #[test]
    fn fires_after_hangover_quiet_blocks() {
        let mut d = detector(true);
        assert!(!d.observe(0.5)); // speech heard
        assert!(!d.observe(0.0));
        assert!(!d.observe(0.0));
        assert!(d.observe(0.0)); // third quiet block
    }

    #[test]
    fn does_not_arm_before_speech() {
        let mut d = detector(true);
        for _ in 0..10 {
            assert!(!d.observe(0.0));
        }
    }

    #[test]
    fn loud_block_resets_the_quiet_run() {
        let mut d = detector(true);
        d.observe(0.5);
        d.observe(0.0);
        d.observe(0.0);
        d.observe(0.5); // interrupts the run
        assert!(!d.observe(0.0));
        assert!(!d.observe(0.0));
        assert!(d.observe(0.0));
    }

    #[test]
    fn reset_disarms_the_detector() {
        let mut d = detector(true);
        d.observe(0.5);
        d.observe(0.0);
        d.reset();
        assert!(!d.observe(0.0));
        assert!(!d.observe(0.0));
        assert!(!d.observe(0.0));
    }

    #[test]
    fn mean_level_of_empty_input_is_zero() {
        assert_eq!(mean_level(&[]), 0.0);
        assert!((mean_level(&[0.5, -0.5]) - 0.5).abs() < f32::EPSILON);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::analyzer::SpectrumAnalyzer;
use crate::assistant::{mean_level, SilenceDetector, StopReason};
use crate::audio_capture::AudioCapture;
use crate::canvas::Canvas;
use crate::config::AppConfig;
use crate::recorder::ChunkRecorder;
use crate::render_loop::{FrameScheduler, RenderLoop};
use crate::scene::Scene;

/// Failure to acquire the microphone
#[derive(Debug)]
pub enum CaptureError {
    /// No usable input device, or the host refused the stream
    PermissionDenied(anyhow::Error),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::PermissionDenied(e) => {
                write!(f, "Microphone access denied or unavailable: {}", e)
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// Outcome of one teardown step
#[derive(Debug)]
pub struct TeardownStep {
    pub name: &'static str,
    pub error: Option<String>,
}

/// Collected outcomes of a session teardown
///
/// Teardown is best-effort: every step runs regardless of earlier failures
/// and its result lands here instead of being swallowed.
#[derive(Debug, Default)]
pub struct TeardownReport {
    steps: Vec<TeardownStep>,
}

impl TeardownReport {
    pub fn record(&mut self, name: &'static str, result: Result<(), anyhow::Error>) {
        self.steps.push(TeardownStep {
            name,
            error: result.err().map(|e| e.to_string()),
        });
    }

    pub fn record_ok(&mut self, name: &'static str) {
        self.steps.push(TeardownStep { name, error: None });
    }

    pub fn steps(&self) -> &[TeardownStep] {
        &self.steps
    }

    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }

    pub fn failures(&self) -> Vec<&TeardownStep> {
        self.steps.iter().filter(|s| s.error.is_some()).collect()
    }

    /// Logs every failed step
    pub fn log(&self) {
        for step in self.failures() {
            if let Some(error) = &step.error {
                log::warn!("Teardown step '{}' failed: {}", step.name, error);
            }
        }
    }
}

/// Optional sinks the capture feed forwards into
#[derive(Default)]
pub struct CaptureHooks {
    /// Recorder accumulating chunks while the assistant listens
    pub recorder: Option<Arc<Mutex<ChunkRecorder>>>,
    /// Silence auto-stop wiring
    pub silence: Option<SilenceHook>,
}

#[derive(Clone)]
pub struct SilenceHook {
    pub detector: Arc<Mutex<SilenceDetector>>,
    pub stop_tx: mpsc::Sender<StopReason>,
}

/// One active capture pipeline: stream → analyzer → render loop
///
/// All resources are created together in `Visualizer::start` and released
/// together in `Visualizer::stop`.
struct CaptureSession {
    stream: AudioCapture,
    analyzer: Arc<Mutex<SpectrumAnalyzer>>,
    feed_task: JoinHandle<()>,
    render: RenderLoop,
    active: Arc<AtomicBool>,
}

/// Owns the capture session and drives the render loop over it
pub struct Visualizer {
    config: AppConfig,
    hooks: CaptureHooks,
    session: Option<CaptureSession>,
}

impl Visualizer {
    pub fn new(config: AppConfig, hooks: CaptureHooks) -> Self {
        Self {
            config,
            hooks,
            session: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Acquires the microphone and builds the capture pipeline
    ///
    /// A second call while a session is active is a no-op; there is exactly
    /// one session at a time.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.session.is_some() {
            return Ok(());
        }

        let analyzer = Arc::new(Mutex::new(SpectrumAnalyzer::new(self.config.window_size)));
        let bin_count = analyzer.lock().bin_count();
        let active = Arc::new(AtomicBool::new(true));
        let (tx, mut rx) = mpsc::channel::<Vec<f32>>(10);

        let mut stream = AudioCapture::new();
        stream
            .start(&self.config, tx, active.clone())
            .map_err(CaptureError::PermissionDenied)?;

        let analyzer_feed = analyzer.clone();
        let recorder = self.hooks.recorder.clone();
        let silence = self.hooks.silence.clone();
        let feed_task = tokio::spawn(async move {
            while let Some(samples) = rx.recv().await {
                analyzer_feed.lock().feed(&samples);

                if let Some(recorder) = &recorder {
                    let recording_active = {
                        let mut recorder = recorder.lock();
                        recorder.push(&samples);
                        recorder.is_active()
                    };
                    if recording_active {
                        if let Some(hook) = &silence {
                            if hook.detector.lock().observe(mean_level(&samples)) {
                                if let Err(e) = hook.stop_tx.try_send(StopReason::Silence) {
                                    log::debug!("Could not deliver silence stop: {}", e);
                                }
                            }
                        }
                    }
                }
            }
            log::debug!("Capture feed drained");
        });

        self.session = Some(CaptureSession {
            stream,
            analyzer,
            feed_task,
            render: RenderLoop::new(bin_count, self.config.visualizer.phase_step),
            active,
        });
        log::info!("Capture session started ({} bins)", bin_count);
        Ok(())
    }

    /// Runs one render loop iteration against the live analyzer
    pub fn frame(
        &mut self,
        scheduler: &mut dyn FrameScheduler,
        canvas: &mut dyn Canvas,
        scene: &Scene,
    ) {
        if let Some(session) = self.session.as_mut() {
            let CaptureSession {
                analyzer, render, ..
            } = session;
            let mut analyzer = analyzer.lock();
            render.frame(scheduler, &mut *analyzer, canvas, scene);
        }
    }

    /// Tears the session down, releasing every resource
    ///
    /// Idempotent: with no active session this is a no-op returning an
    /// empty report. Each teardown step is isolated so one failure doesn't
    /// block the others; all outcomes are collected and logged.
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) -> TeardownReport {
        let mut report = TeardownReport::default();
        let Some(mut session) = self.session.take() else {
            return report;
        };
        session.active.store(false, Ordering::Relaxed);

        session.render.cancel_pending(scheduler);
        report.record_ok("cancel render frame");

        report.record("stop input stream", session.stream.stop());

        drop(session.analyzer);
        report.record_ok("release analyzer");
        session.feed_task.abort();
        report.record_ok("abort sample feed");

        report.record("close audio context", session.stream.close());

        report.log();
        log::info!("Capture session stopped");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_loop::FrameHandle;

    #[derive(Default)]
    struct SpyScheduler {
        cancelled: Vec<FrameHandle>,
    }

    impl FrameScheduler for SpyScheduler {
        fn schedule(&mut self) -> FrameHandle {
            1
        }

        fn cancel(&mut self, handle: FrameHandle) {
            self.cancelled.push(handle);
        }
    }

    #[test]
    fn stop_without_a_session_is_a_no_op() {
        let mut visualizer = Visualizer::new(AppConfig::default(), CaptureHooks::default());
        let mut scheduler = SpyScheduler::default();

        let first = visualizer.stop(&mut scheduler);
        let second = visualizer.stop(&mut scheduler);

        assert!(first.steps().is_empty());
        assert!(second.steps().is_empty());
        assert!(scheduler.cancelled.is_empty());
        assert!(!visualizer.is_active());
    }

    #[test]
    fn report_collects_every_step_despite_failures() {
        let mut report = TeardownReport::default();
        report.record("first", Err(anyhow::anyhow!("boom")));
        report.record_ok("second");
        report.record("third", Err(anyhow::anyhow!("bang")));
        report.record_ok("fourth");

        assert_eq!(report.steps().len(), 4);
        assert!(!report.is_clean());
        assert_eq!(report.failures().len(), 2);
        assert_eq!(report.steps()[1].name, "second");
        assert!(report.steps()[3].error.is_none());
    }

    #[test]
    fn clean_report_has_no_failures() {
        let mut report = TeardownReport::default();
        report.record_ok("only");
        assert!(report.is_clean());
        assert!(report.failures().is_empty());
    }
}

pub mod analyzer;
pub mod assistant;
pub mod audio_capture;
pub mod canvas;
pub mod cli;
pub mod config;
pub mod cycle_stats;
pub mod download;
pub mod prelude;
pub mod recorder;
pub mod render_loop;
pub mod scene;
pub mod session;
pub mod speech;
pub mod transcription;
pub mod ui;

// Re-export key components for easier access
pub use analyzer::{SnapshotSource, SpectrumAnalyzer};
pub use assistant::{DisplayState, SilenceDetector, StopReason, VoiceAssistant};
pub use audio_capture::AudioCapture;
pub use canvas::Canvas;
pub use config::read_app_config;
pub use cycle_stats::{CycleStats, StatsReporter};
pub use recorder::{ChunkRecorder, Recording};
pub use render_loop::{FrameScheduler, RenderLoop};
pub use scene::Scene;
pub use session::{CaptureHooks, CaptureError, TeardownReport, Visualizer};
pub use speech::{PiperSpeech, Speak};
pub use transcription::{HttpTranscriber, Transcribe, Transcription};

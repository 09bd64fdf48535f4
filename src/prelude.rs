// Re-export common types and functions for easier imports
pub use crate::assistant::{DisplayState, StopReason};
pub use crate::config::{read_app_config, AppConfig};
pub use crate::session::{CaptureError, TeardownReport, Visualizer};
pub use crate::transcription::Transcription;

// Re-export common external dependencies
pub use anyhow::{anyhow, Context, Result};
pub use serde::{Deserialize, Serialize};
pub use std::path::PathBuf;
pub use std::sync::Arc;
pub use std::time::Duration;

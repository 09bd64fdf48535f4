use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

/// Transcription endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// URL the recorded audio is POSTed to
    pub endpoint: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/api/handle_transcription".to_string(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Maps a language tag (as returned by the transcription endpoint)
    /// to a piper voice id, e.g. "en-GB" -> "en_GB-alan-medium"
    pub voices: HashMap<String, String>,
    /// Voice used when the returned language has no mapping
    pub fallback_voice: String,
    /// Playback sample rate of the configured voices in Hz
    pub output_sample_rate: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let mut voices = HashMap::new();
        voices.insert("en-GB".to_string(), "en_GB-alan-medium".to_string());
        voices.insert("en-US".to_string(), "en_US-amy-medium".to_string());
        Self {
            voices,
            fallback_voice: "en_GB-alan-medium".to_string(),
            output_sample_rate: 22050, // Piper voices are commonly 22050 Hz
        }
    }
}

/// Visual tuning for the bar and wave rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizerConfig {
    /// Fraction of a bar slot left empty between neighbouring bars
    pub bar_gap_ratio: f32,
    /// Top color of the bar gradient (RGBA, 0.0-1.0)
    pub gradient_top: [f32; 4],
    /// Bottom color of the bar gradient (RGBA, 0.0-1.0)
    pub gradient_bottom: [f32; 4],
    /// Vertical scale of the wave relative to half the surface height
    pub wave_amplitude: f32,
    /// Phase advance per rendered frame, in radians
    pub phase_step: f32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            bar_gap_ratio: 0.15,
            gradient_top: [0.820, 0.553, 0.553, 1.0],
            gradient_bottom: [0.839, 0.145, 0.024, 1.0],
            wave_amplitude: 0.6,
            phase_step: 0.12,
        }
    }
}

/// Silence-based auto-stop for the assistant cycle
///
/// Disabled by default; when enabled, a recording ends automatically after
/// `hangover_frames` consecutive capture buffers stay below `threshold`
/// mean absolute amplitude (once speech has been heard at all).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilenceConfig {
    pub enabled: bool,
    /// Mean absolute amplitude below which a buffer counts as silent
    pub threshold: f32,
    /// Number of consecutive silent buffers before the stop triggers
    pub hangover_frames: usize,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.015,
            hangover_frames: 25, // ~1.6s of 1024-sample buffers at 16kHz
        }
    }
}

/// Configuration for keyboard shortcuts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardShortcuts {
    /// Key that toggles capture / ends the current recording
    pub toggle_recording: String,
    /// Key to exit the application
    pub exit_application: String,
}

impl Default for KeyboardShortcuts {
    fn default() -> Self {
        Self {
            toggle_recording: "Space".to_string(),
            exit_application: "Escape".to_string(),
        }
    }
}

impl KeyboardShortcuts {
    /// Convert a key string to a KeyCode
    pub fn to_key_code(&self, key_str: &str) -> Option<KeyCode> {
        match key_str {
            "KeyR" => Some(KeyCode::KeyR),
            "KeyS" => Some(KeyCode::KeyS),
            "KeyV" => Some(KeyCode::KeyV),
            "Space" => Some(KeyCode::Space),
            "Escape" => Some(KeyCode::Escape),
            "Enter" => Some(KeyCode::Enter),
            "Tab" => Some(KeyCode::Tab),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audio sample rate in Hz used for capture and recording
    pub sample_rate: usize,
    /// The capture block size in samples, as delivered by the input stream
    pub buffer_size: usize,
    /// Analysis window size in samples (power of two); the frequency
    /// snapshot holds window_size / 2 bins
    pub window_size: usize,
    /// Whether to log cycle statistics periodically
    pub log_stats_enabled: bool,
    /// Whether to archive each finished recording as a WAV file
    pub save_recordings: bool,
    /// Transcription endpoint configuration
    pub transcription: TranscriptionConfig,
    /// Speech synthesis configuration
    pub speech: SpeechConfig,
    /// Visual tuning
    pub visualizer: VisualizerConfig,
    /// Silence auto-stop configuration
    pub silence: SilenceConfig,
    /// Keyboard shortcuts configuration
    pub keyboard_shortcuts: KeyboardShortcuts,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            buffer_size: 1024,
            window_size: 256, // 128 frequency bins
            log_stats_enabled: false,
            save_recordings: false,
            transcription: TranscriptionConfig::default(),
            speech: SpeechConfig::default(),
            visualizer: VisualizerConfig::default(),
            silence: SilenceConfig::default(),
            keyboard_shortcuts: KeyboardShortcuts::default(),
        }
    }
}

impl AppConfig {
    /// Number of frequency bins a snapshot of this configuration holds
    pub fn bin_count(&self) -> usize {
        self.window_size / 2
    }
}

/// Helper function to read the application configuration
pub fn read_app_config() -> AppConfig {
    read_config_from("config.json")
}

/// Reads a configuration file, falling back to defaults on any failure
pub fn read_config_from(path: &str) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str(&config_str) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to parse {}: {}. Using default configuration.", path, e);
                AppConfig::default()
            }
        },
        Err(e) => {
            log::debug!("Failed to read {}: {}. Using default configuration.", path, e);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_serde() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sample_rate, config.sample_rate);
        assert_eq!(parsed.window_size, config.window_size);
        assert_eq!(parsed.transcription.endpoint, config.transcription.endpoint);
        assert_eq!(parsed.speech.fallback_voice, config.speech.fallback_voice);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("parlo_bad_config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = read_config_from(path.to_str().unwrap());
        assert_eq!(config.window_size, AppConfig::default().window_size);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = read_config_from("/nonexistent/parlo/config.json");
        assert_eq!(config.buffer_size, AppConfig::default().buffer_size);
    }

    #[test]
    fn bin_count_is_half_the_window() {
        for window_size in [64usize, 128, 256, 512, 1024] {
            let config = AppConfig {
                window_size,
                ..AppConfig::default()
            };
            assert_eq!(config.bin_count(), window_size / 2);
        }
    }

    #[test]
    fn shortcut_keys_resolve() {
        let shortcuts = KeyboardShortcuts::default();
        assert!(shortcuts.to_key_code(&shortcuts.toggle_recording).is_some());
        assert!(shortcuts.to_key_code(&shortcuts.exit_application).is_some());
        assert!(shortcuts.to_key_code("NoSuchKey").is_none());
    }
}

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use piper_rs::synth::PiperSpeechSynthesizer;
use portaudio as pa;

use crate::config::SpeechConfig;
use crate::download;

/// Frames written to the output stream per blocking call
const PLAYBACK_FRAMES: usize = 1024;

/// Speaks a transcribed response in the detected language
///
/// Resolves when playback has finished, so the cycle can simply await it
/// before re-entering the listening state.
#[allow(async_fn_in_trait)]
pub trait Speak {
    async fn speak(&self, text: &str, language: &str) -> Result<()>;
}

/// Maps a language tag from the transcription response to a piper voice id
#[derive(Debug, Clone)]
pub struct VoiceMap {
    voices: HashMap<String, String>,
    fallback: String,
}

impl VoiceMap {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            voices: config.voices.clone(),
            fallback: config.fallback_voice.clone(),
        }
    }

    /// Picks the voice for a tag: exact match, then any voice sharing the
    /// primary subtag ("en-US" matches an "en-GB" entry), then the fallback
    pub fn resolve(&self, tag: &str) -> &str {
        if let Some(voice) = self.voices.get(tag) {
            return voice;
        }
        let primary = tag.split(['-', '_']).next().unwrap_or(tag);
        if let Some(voice) = self.voices.get(primary) {
            return voice;
        }
        if let Some((_, voice)) = self
            .voices
            .iter()
            .find(|(key, _)| key.split(['-', '_']).next() == Some(primary))
        {
            return voice;
        }
        &self.fallback
    }
}

/// Local speech synthesis with piper, played through PortAudio
pub struct PiperSpeech {
    voices: VoiceMap,
    output_sample_rate: u32,
}

impl PiperSpeech {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            voices: VoiceMap::from_config(config),
            output_sample_rate: config.output_sample_rate,
        }
    }
}

impl Speak for PiperSpeech {
    async fn speak(&self, text: &str, language: &str) -> Result<()> {
        let voice_id = self.voices.resolve(language).to_string();
        let voice_config = download::ensure_voice(&voice_id).await?;

        log::debug!("Speaking with voice {} ({})", voice_id, language);

        let text = text.to_string();
        let sample_rate = self.output_sample_rate;
        tokio::task::spawn_blocking(move || {
            let samples = synthesize(&voice_config, &text)?;
            play_samples(&samples, sample_rate)
        })
        .await
        .map_err(|e| anyhow!("Speech task failed: {}", e))?
    }
}

/// Runs piper over the whole utterance and returns the raw samples
fn synthesize(voice_config: &std::path::Path, text: &str) -> Result<Vec<f32>> {
    let model = piper_rs::from_config_path(voice_config)
        .map_err(|e| anyhow!("Failed to load voice {:?}: {}", voice_config, e))?;
    let synth = PiperSpeechSynthesizer::new(model)
        .map_err(|e| anyhow!("Failed to create synthesizer: {}", e))?;

    let audio_iter = synth
        .synthesize_parallel(text.to_string(), None)
        .map_err(|e| anyhow!("Synthesis error: {}", e))?;

    let mut samples: Vec<f32> = Vec::new();
    for part in audio_iter {
        let chunk = part.map_err(|e| anyhow!("Synthesis chunk error: {}", e))?;
        samples.extend(chunk.into_vec());
    }
    Ok(samples)
}

/// Plays samples through the default output device, blocking until done
fn play_samples(samples: &[f32], sample_rate: u32) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let pa = pa::PortAudio::new().map_err(|e| anyhow!("Failed to initialize PortAudio: {}", e))?;
    let settings = pa
        .default_output_stream_settings::<f32>(1, sample_rate as f64, PLAYBACK_FRAMES as u32)
        .map_err(|e| anyhow!("Failed to get output stream settings: {}", e))?;
    let mut stream = pa
        .open_blocking_stream(settings)
        .map_err(|e| anyhow!("Failed to open output stream: {}", e))?;

    stream
        .start()
        .map_err(|e| anyhow!("Failed to start output stream: {}", e))?;

    for chunk in samples.chunks(PLAYBACK_FRAMES) {
        let frames = chunk.len() as u32;
        stream
            .write(frames, |output| {
                output[..chunk.len()].copy_from_slice(chunk);
            })
            .map_err(|e| anyhow!("Failed to write to output stream: {}", e))?;
    }

    if let Err(e) = stream.stop() {
        log::debug!("Ignoring output stream stop failure: {}", e);
    }
    if let Err(e) = stream.close() {
        log::debug!("Ignoring output stream close failure: {}", e);
    }
    Ok(())
}

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

/// Accumulates captured sample blocks while the assistant is listening
///
/// `push` is a no-op unless a recording has been begun, so the capture feed
/// can call it unconditionally. `finish` concatenates everything recorded
/// so far into a single payload and deactivates the recorder.
pub struct ChunkRecorder {
    chunks: Vec<Vec<f32>>,
    active: bool,
    sample_rate: u32,
}

impl ChunkRecorder {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            chunks: Vec::new(),
            active: false,
            sample_rate,
        }
    }

    /// Starts a fresh recording, discarding any leftover chunks
    pub fn begin(&mut self) {
        self.chunks.clear();
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Appends one captured block; ignored while inactive
    pub fn push(&mut self, samples: &[f32]) {
        if self.active && !samples.is_empty() {
            self.chunks.push(samples.to_vec());
        }
    }

    /// Ends the recording and returns the concatenated payload
    pub fn finish(&mut self) -> Recording {
        self.active = false;
        let samples = self.chunks.drain(..).flatten().collect();
        Recording {
            samples,
            sample_rate: self.sample_rate,
        }
    }
}

/// A finished recording, ready to encode or archive
#[derive(Debug, Clone)]
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Recording {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Encodes the recording as a 16-bit PCM mono WAV in memory
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
            for &sample in &self.samples {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer
                    .write_sample(value)
                    .context("Failed to write WAV sample")?;
            }
            writer.finalize().context("Failed to finalize WAV data")?;
        }
        Ok(cursor.into_inner())
    }

    /// Writes the recording to `dir` under a timestamped name
    pub fn save_archive(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create recordings directory {:?}", dir))?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("recording_{}.wav", timestamp));
        let bytes = self.to_wav_bytes()?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write recording to {:?}", path))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_concatenates_chunks_in_order() {
        let mut recorder = ChunkRecorder::new(16000);
        recorder.begin();
        recorder.push(&[0.1, 0.2]);
        recorder.push(&[0.3]);
        let recording = recorder.finish();
        assert_eq!(recording.samples, vec![0.1, 0.2, 0.3]);
        assert!(!recorder.is_active());
    }

    #[test]
    fn push_is_ignored_while_inactive() {
        let mut recorder = ChunkRecorder::new(16000);
        recorder.push(&[0.5; 8]);
        recorder.begin();
        let recording = recorder.finish();
        assert!(recording.is_empty());
    }

    #[test]
    fn begin_discards_previous_chunks() {
        let mut recorder = ChunkRecorder::new(16000);
        recorder.begin();
        recorder.push(&[0.5; 4]);
        recorder.begin();
        recorder.push(&[0.1; 2]);
        assert_eq!(recorder.finish().samples.len(), 2);
    }

    #[test]
    fn wav_bytes_decode_back_to_the_same_length() {
        let recording = Recording {
            samples: vec![0.0, 0.5, -0.5, 1.0, -1.0],
            sample_rate: 16000,
        };
        let bytes = recording.to_wav_bytes().unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.into_samples::<i16>().count(), 5);
    }

    #[test]
    fn duration_follows_the_sample_rate() {
        let recording = Recording {
            samples: vec![0.0; 32000],
            sample_rate: 16000,
        };
        assert_eq!(recording.duration_seconds(), 2.0);
    }
}

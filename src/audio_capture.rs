use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow;
use portaudio as pa;
use tokio::sync::mpsc;

use crate::config::AppConfig;

/// Manages microphone capture using PortAudio
///
/// The stream pushes f32 sample blocks into a bounded channel; the `active`
/// flag gates the callback so a stopped session stops producing immediately
/// even before the stream itself is torn down.
pub struct AudioCapture {
    pa_context: Option<pa::PortAudio>,
    pa_stream: Option<pa::Stream<pa::NonBlocking, pa::Input<f32>>>,
}

impl AudioCapture {
    /// Creates a new AudioCapture instance
    pub fn new() -> Self {
        Self {
            pa_context: None,
            pa_stream: None,
        }
    }

    /// Whether an input stream is currently open
    pub fn is_open(&self) -> bool {
        self.pa_stream.is_some()
    }

    /// Opens the default input device and starts the stream
    ///
    /// # Arguments
    /// * `config` - Application configuration (sample rate, block size)
    /// * `tx` - Channel sender for captured sample blocks
    /// * `active` - Flag gating whether the callback forwards samples
    pub fn start(
        &mut self,
        config: &AppConfig,
        tx: mpsc::Sender<Vec<f32>>,
        active: Arc<AtomicBool>,
    ) -> Result<(), anyhow::Error> {
        let pa = pa::PortAudio::new()
            .map_err(|e| anyhow::anyhow!("Failed to initialize PortAudio: {}", e))?;

        let input_params = pa
            .default_input_stream_params::<f32>(1)
            .map_err(|e| anyhow::anyhow!("Failed to get default input stream parameters: {}", e))?;
        let input_settings = pa::InputStreamSettings::new(
            input_params,
            config.sample_rate as f64,
            config.buffer_size as u32,
        );

        let callback = move |pa::InputStreamCallbackArgs { buffer, .. }| {
            if active.load(Ordering::Relaxed) {
                let samples = buffer.to_vec();
                if let Err(e) = tx.try_send(samples) {
                    log::trace!("Dropping capture block: {}", e);
                }
                pa::Continue
            } else {
                pa::Complete
            }
        };

        let mut stream = pa
            .open_non_blocking_stream(input_settings, callback)
            .map_err(|e| anyhow::anyhow!("Failed to open input stream: {}", e))?;

        stream
            .start()
            .map_err(|e| anyhow::anyhow!("Failed to start input stream: {}", e))?;

        self.pa_context = Some(pa);
        self.pa_stream = Some(stream);
        Ok(())
    }

    /// Temporarily pauses capture without closing the stream
    pub fn pause(&mut self) -> Result<(), anyhow::Error> {
        if let Some(stream) = &mut self.pa_stream {
            stream
                .stop()
                .map_err(|e| anyhow::anyhow!("Failed to pause input stream: {}", e))
        } else {
            Ok(()) // No stream to pause
        }
    }

    /// Resumes a previously paused stream
    pub fn resume(&mut self) -> Result<(), anyhow::Error> {
        if let Some(stream) = &mut self.pa_stream {
            stream
                .start()
                .map_err(|e| anyhow::anyhow!("Failed to resume input stream: {}", e))
        } else {
            Err(anyhow::anyhow!("No stream to resume"))
        }
    }

    /// Stops the input stream, releasing the device
    ///
    /// The stream stays allocated so `close` can still report its own
    /// outcome; a missing stream is a no-op.
    pub fn stop(&mut self) -> Result<(), anyhow::Error> {
        if let Some(stream) = &mut self.pa_stream {
            stream
                .stop()
                .map_err(|e| anyhow::anyhow!("Failed to stop input stream: {}", e))
        } else {
            Ok(())
        }
    }

    /// Closes the stream and releases the underlying audio context
    pub fn close(&mut self) -> Result<(), anyhow::Error> {
        let result = if let Some(stream) = &mut self.pa_stream {
            stream
                .close()
                .map_err(|e| anyhow::anyhow!("Failed to close input stream: {}", e))
        } else {
            Ok(())
        };
        self.pa_stream = None;
        self.pa_context = None;
        result
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::debug!("Ignoring capture stop failure during drop: {}", e);
        }
        if let Err(e) = self.close() {
            log::debug!("Ignoring capture close failure during drop: {}", e);
        }
    }
}

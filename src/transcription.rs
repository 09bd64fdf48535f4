use anyhow::{Context, Result};
use serde::Deserialize;

/// Response of the transcription endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transcription {
    /// The transcribed text
    pub text: String,
    /// Detected language tag, e.g. "en-GB"
    pub language: String,
}

/// Submits one recorded payload for transcription
#[allow(async_fn_in_trait)]
pub trait Transcribe {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcription>;
}

/// POSTs the recording to the remote transcription endpoint
///
/// One multipart request per recording, no retry and no timeout; a failed
/// request is the caller's cue to restart the cycle.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transcribe for HttpTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcription> {
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("speech.wav")
            .mime_str("audio/wav")
            .context("Failed to build multipart payload")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Transcription request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Transcription endpoint returned {}: {}",
                status,
                body
            ));
        }

        response
            .json::<Transcription>()
            .await
            .context("Failed to parse transcription response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_deserializes_from_the_endpoint_shape() {
        let json = r#"{"text": "hello there", "language": "en-GB"}"#;
        let t: Transcription = serde_json::from_str(json).unwrap();
        assert_eq!(t.text, "hello there");
        assert_eq!(t.language, "en-GB");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let json = r#"{"text": "hi", "language": "en-US", "confidence": 0.9}"#;
        let t: Transcription = serde_json::from_str(json).unwrap();
        assert_eq!(t.text, "hi");
    }

    #[test]
    fn missing_fields_are_an_error() {
        let json = r#"{"text": "hi"}"#;
        assert!(serde_json::from_str::<Transcription>(json).is_err());
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest;
use tokio::io::AsyncWriteExt;

/// Base URL piper voice files are fetched from
const VOICE_BASE_URL: &str = "https://huggingface.co/rhasspy/piper-voices/resolve/main";

/// Minimum plausible size of a voice model file in bytes
const MIN_MODEL_SIZE: u64 = 10_000;

/// Get the voices directory path
fn get_voices_dir() -> Result<PathBuf> {
    let home_dir = std::env::var("HOME").context("Failed to get HOME directory")?;
    let voices_dir = PathBuf::from(format!("{}/.cache/parlo/voices", home_dir));

    if !voices_dir.exists() {
        log::info!("Creating voices directory: {:?}", voices_dir);
        fs::create_dir_all(&voices_dir).context("Failed to create voices directory")?;
    }

    Ok(voices_dir)
}

/// Derives the download URLs for a voice id like "en_GB-alan-medium"
///
/// The upstream layout is <family>/<locale>/<name>/<quality>/<id>.onnx.
fn voice_urls(voice_id: &str) -> Result<(String, String)> {
    let mut parts = voice_id.splitn(3, '-');
    let locale = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    let quality = parts.next().unwrap_or_default();
    if locale.is_empty() || name.is_empty() || quality.is_empty() {
        return Err(anyhow::anyhow!(
            "Voice id '{}' is not of the form locale-name-quality",
            voice_id
        ));
    }
    let family = locale.split('_').next().unwrap_or(locale);

    let base = format!(
        "{}/{}/{}/{}/{}/{}",
        VOICE_BASE_URL, family, locale, name, quality, voice_id
    );
    Ok((format!("{}.onnx", base), format!("{}.onnx.json", base)))
}

/// Checks that a previously downloaded file looks usable
fn is_voice_file_valid(path: &Path, min_size: u64) -> bool {
    if !path.exists() {
        return false;
    }
    match fs::metadata(path) {
        Ok(metadata) => metadata.len() >= min_size,
        Err(_) => false,
    }
}

/// Download a file from a URL and save it to the specified path
pub async fn download_file(url: &str, output_path: &Path) -> Result<()> {
    log::info!("Downloading file from: {}", url);

    if let Some(parent) = output_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    // Download to a temporary file first so an interrupted fetch never
    // leaves a truncated voice behind
    let temp_path = output_path.with_extension("downloading");

    let response = reqwest::get(url)
        .await
        .context(format!("Failed to download file from {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!(
            "Failed to download file, status: {}",
            response.status()
        ));
    }

    let total_size = response.content_length().unwrap_or(0);
    let mut file = tokio::fs::File::create(&temp_path)
        .await
        .context(format!("Failed to create file at {:?}", temp_path))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    use futures_util::StreamExt;
    while let Some(item) = stream.next().await {
        let chunk = item.context("Error while downloading file")?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }

    if total_size > 0 && downloaded < total_size {
        return Err(anyhow::anyhow!(
            "Download truncated: {}/{} bytes",
            downloaded,
            total_size
        ));
    }
    log::info!("Download complete: {} bytes", downloaded);

    drop(file);

    fs::rename(&temp_path, output_path).context(format!(
        "Failed to rename downloaded file from {:?} to {:?}",
        temp_path, output_path
    ))?;

    Ok(())
}

/// Ensures a piper voice is present locally, downloading it if necessary
///
/// Returns the path of the voice's `.onnx.json` config, which is what the
/// synthesizer loads.
pub async fn ensure_voice(voice_id: &str) -> Result<PathBuf> {
    let voices_dir = get_voices_dir()?;
    let model_path = voices_dir.join(format!("{}.onnx", voice_id));
    let config_path = voices_dir.join(format!("{}.onnx.json", voice_id));

    if is_voice_file_valid(&model_path, MIN_MODEL_SIZE) && is_voice_file_valid(&config_path, 100) {
        log::debug!("Voice {} already present at {:?}", voice_id, config_path);
        return Ok(config_path);
    }

    let (model_url, config_url) = voice_urls(voice_id)?;
    log::info!("Fetching voice {}...", voice_id);
    download_file(&model_url, &model_path).await?;
    download_file(&config_url, &config_path).await?;

    if !is_voice_file_valid(&model_path, MIN_MODEL_SIZE) {
        return Err(anyhow::anyhow!(
            "Downloaded voice model for {} is invalid or corrupted",
            voice_id
        ));
    }

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_urls_follow_the_upstream_layout() {
        let (model, config) = voice_urls("en_GB-alan-medium").unwrap();
        assert_eq!(
            model,
            format!(
                "{}/en/en_GB/alan/medium/en_GB-alan-medium.onnx",
                VOICE_BASE_URL
            )
        );
        assert!(config.ends_with("en_GB-alan-medium.onnx.json"));
    }

    #[test]
    fn malformed_voice_ids_are_rejected() {
        assert!(voice_urls("alan").is_err());
        assert!(voice_urls("en_GB-alan").is_err());
        assert!(voice_urls("").is_err());
    }

    #[test]
    fn missing_file_is_not_valid() {
        assert!(!is_voice_file_valid(
            Path::new("/nonexistent/voice.onnx"),
            MIN_MODEL_SIZE
        ));
    }
}

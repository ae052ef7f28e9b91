use async_trait::async_trait;
use std::path::Path;
use tracing::{info, warn};

use super::{spool_to_temp, TranscriptionResult, Transcriber};
use crate::config::CloudProviderConfig;
use crate::error::ProviderError;
use crate::model::RawSegment;

/// OpenAI-compatible transcription API backend.
///
/// POSTs multipart audio to the configured endpoint and parses the
/// verbose-json response. The API returns per-segment confidence but no
/// speaker labels.
pub struct CloudTranscriber {
    config: CloudProviderConfig,
    client: reqwest::Client,
}

impl CloudTranscriber {
    pub fn new(config: CloudProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingCredential(self.config.api_key_env.clone()))
    }

    fn parse_response(
        &self,
        json: serde_json::Value,
        requested_language: Option<&str>,
    ) -> TranscriptionResult {
        let text = json
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let mut segments = Vec::new();
        if let Some(raw_segments) = json.get("segments").and_then(|v| v.as_array()) {
            for seg in raw_segments {
                segments.push(RawSegment {
                    start: seg.get("start").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    end: seg.get("end").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    text: seg
                        .get("text")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .trim()
                        .to_string(),
                    speaker_id: None,
                    confidence: Some(
                        seg.get("confidence").and_then(|v| v.as_f64()).unwrap_or(1.0) as f32,
                    ),
                });
            }
        }

        let duration = json
            .get("duration")
            .and_then(|v| v.as_f64())
            .or_else(|| segments.last().map(|s| s.end))
            .unwrap_or(0.0);

        let language = requested_language
            .map(str::to_string)
            .or_else(|| {
                json.get("language")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        TranscriptionResult {
            text,
            segments,
            language,
            duration,
        }
    }
}

#[async_trait]
impl Transcriber for CloudTranscriber {
    fn id(&self) -> &'static str {
        "cloud"
    }

    async fn initialize(&self) -> Result<String, ProviderError> {
        self.api_key()?;
        Ok(format!(
            "Cloud transcription ready ({}, model {})",
            self.config.base_url, self.config.model
        ))
    }

    async fn transcribe(
        &self,
        audio_file: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, ProviderError> {
        let api_key = self.api_key()?;

        if !audio_file.exists() {
            return Err(ProviderError::FileNotFound(
                audio_file.display().to_string(),
            ));
        }

        let bytes = std::fs::read(audio_file)
            .map_err(|e| ProviderError::Engine(format!("cannot read audio file: {}", e)))?;
        let file_name = audio_file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| ProviderError::Engine(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json");
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        info!("Cloud transcription request: {}", audio_file.display());

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::Engine(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Engine(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Engine(format!("invalid response body: {}", e)))?;

        Ok(self.parse_response(json, language))
    }

    async fn transcribe_stream(
        &self,
        data: &[u8],
        format: &str,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, ProviderError> {
        let temp_path = spool_to_temp(data, format)?;
        let result = self.transcribe(&temp_path, language).await;
        if let Err(e) = std::fs::remove_file(&temp_path) {
            warn!("Failed to remove temp file {}: {}", temp_path.display(), e);
        }
        result
    }

    async fn health_check(&self) -> bool {
        self.api_key().is_ok()
    }
}

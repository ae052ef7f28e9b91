//! Transcription provider abstraction.
//!
//! Every provider normalizes its output into [`TranscriptionResult`] so the
//! pipeline is provider-agnostic. The set of backends is closed: a
//! [`ProviderKind`] plus a factory, with unknown kinds rejected at
//! construction time.

mod cloud;
mod offline;

pub use cloud::CloudTranscriber;
pub use offline::OfflineTranscriber;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ProvidersConfig;
use crate::error::ProviderError;
use crate::model::RawSegment;

/// Normalized transcription output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Vec<RawSegment>,
    pub language: String,
    pub duration: f64,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Engine identifier recorded on transcripts and usage records.
    fn id(&self) -> &'static str;

    /// Prepare the backend: verify credentials, or load/download the model.
    /// Returns a diagnostic message on success.
    async fn initialize(&self) -> Result<String, ProviderError>;

    async fn transcribe(
        &self,
        audio_file: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, ProviderError>;

    /// Transcribe in-memory audio data. Implementations may buffer the data
    /// to a temporary file internally.
    async fn transcribe_stream(
        &self,
        data: &[u8],
        format: &str,
        language: Option<&str>,
    ) -> Result<TranscriptionResult, ProviderError>;

    /// Liveness probe.
    async fn health_check(&self) -> bool;
}

/// The closed set of transcription backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Metered cloud API with per-segment confidence, no speaker labels.
    Cloud,
    /// Local whisper.cpp model, unmetered, placeholder confidence.
    Offline,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Cloud => "cloud",
            ProviderKind::Offline => "offline",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloud" => Ok(ProviderKind::Cloud),
            "offline" => Ok(ProviderKind::Offline),
            other => Err(ProviderError::UnknownKind(other.to_string())),
        }
    }
}

/// Build the concrete transcriber for a kind.
pub fn create_transcriber(
    kind: ProviderKind,
    config: &ProvidersConfig,
) -> Arc<dyn Transcriber> {
    match kind {
        ProviderKind::Cloud => Arc::new(CloudTranscriber::new(config.cloud.clone())),
        ProviderKind::Offline => Arc::new(OfflineTranscriber::new(config.offline.clone())),
    }
}

/// Write stream data to a scratch file so file-based transcription can run
/// over it; the file is removed afterwards by the caller.
pub(crate) fn spool_to_temp(data: &[u8], format: &str) -> Result<std::path::PathBuf, ProviderError> {
    let path = std::env::temp_dir().join(format!("audioscribe-{}.{}", uuid::Uuid::new_v4(), format));
    std::fs::write(&path, data)
        .map_err(|e| ProviderError::Engine(format!("failed to spool stream: {}", e)))?;
    Ok(path)
}

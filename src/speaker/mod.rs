//! Speaker identification.
//!
//! Recognizers label transcript segments with opaque speaker ids. The set
//! of backends is closed, mirroring the transcription provider layer.

mod clustering;

pub use clustering::ClusteringRecognizer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::model::Segment;

/// One segment's resolved speaker label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerAssignment {
    pub segment_id: Uuid,
    pub speaker_id: String,
}

#[async_trait]
pub trait SpeakerRecognizer: Send + Sync {
    fn id(&self) -> &'static str;

    async fn initialize(&self) -> Result<String, ProviderError>;

    /// Label each segment with a speaker id. Assignments come back sorted
    /// by segment start time and cover every input segment.
    async fn identify_speakers(
        &self,
        audio_file: &Path,
        segments: &[Segment],
    ) -> Result<Vec<SpeakerAssignment>, ProviderError>;

    /// Rough count of distinct speakers in the recording.
    async fn estimate_speaker_count(&self, audio_file: &Path) -> Result<usize, ProviderError>;

    async fn health_check(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerKind {
    /// Unsupervised spectral clustering, no external service.
    Clustering,
}

impl RecognizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognizerKind::Clustering => "clustering",
        }
    }
}

impl FromStr for RecognizerKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clustering" => Ok(RecognizerKind::Clustering),
            other => Err(ProviderError::UnknownKind(other.to_string())),
        }
    }
}

pub fn create_recognizer(kind: RecognizerKind) -> Arc<dyn SpeakerRecognizer> {
    match kind {
        RecognizerKind::Clustering => Arc::new(ClusteringRecognizer::new()),
    }
}

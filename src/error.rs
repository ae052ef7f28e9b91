use thiserror::Error;

/// Validation failures raised at the segment store boundary.
///
/// These are input errors: never retried, surfaced directly to the caller.
#[derive(Debug, Error, PartialEq)]
pub enum SegmentError {
    #[error("segments belong to different transcripts")]
    CrossTranscriptMerge,

    #[error("split point {at:.3}s is outside the segment range ({start:.3}s, {end:.3}s)")]
    SplitOutOfRange { at: f64, start: f64, end: f64 },

    #[error("segment end time {end:.3}s must be greater than start time {start:.3}s")]
    InvalidTimeRange { start: f64, end: f64 },
}

/// Failures produced by transcription providers and speaker recognizers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider kind: {0}")]
    UnknownKind(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("audio file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("insufficient segments for speaker identification")]
    InsufficientSegments,

    #[error("engine failure: {0}")]
    Engine(String),
}

/// Failures from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("recording not found: {0}")]
    RecordingNotFound(uuid::Uuid),

    #[error("transcript not found: {0}")]
    TranscriptNotFound(uuid::Uuid),

    #[error("segment not found: {0}")]
    SegmentNotFound(uuid::Uuid),

    #[error("quota state not found for user: {0}")]
    QuotaStateNotFound(uuid::Uuid),
}

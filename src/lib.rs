pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod quota;
pub mod selector;
pub mod speaker;
pub mod store;
pub mod subtitle;

pub use audio::{extract_metadata, AudioFile, AudioMetadata};
pub use config::Config;
pub use error::{ProviderError, SegmentError, StoreError};
pub use http::{create_router, AppState};
pub use model::{
    ProcessingStatus, RawSegment, Recording, Segment, ServiceType, SubscriptionTier, Transcript,
    UsageRecord, UserQuotaState,
};
pub use pipeline::{JobQueue, MemoryQueue, NatsQueue, Orchestrator, Stage, StageMessage};
pub use provider::{ProviderKind, Transcriber, TranscriptionResult};
pub use quota::{QuotaContext, QuotaDecision, QuotaManager};
pub use speaker::{RecognizerKind, SpeakerAssignment, SpeakerRecognizer};
pub use store::{MemoryStore, Store};

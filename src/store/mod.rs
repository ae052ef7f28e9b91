//! Persistence interface for pipeline state and the in-memory
//! implementation backing tests and single-node deployments.
//!
//! Pipeline stages coordinate exclusively through this store; there is no
//! shared in-memory state across stages.

mod export;
mod memory;

pub use export::{export_by_speaker, export_srt, export_vtt, SpeakerExport, UNKNOWN_SPEAKER};
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    RawSegment, Recording, Segment, ServiceType, Transcript, UsageRecord, UserQuotaState,
};

/// Aggregated usage for one service type over a query window.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct UsageTotals {
    pub calls: u64,
    pub tokens: u64,
    pub audio_seconds: f64,
}

#[async_trait]
pub trait Store: Send + Sync {
    // Recordings
    async fn put_recording(&self, recording: Recording) -> Result<(), StoreError>;
    async fn get_recording(&self, id: Uuid) -> Result<Recording, StoreError>;

    // Transcripts. `put_transcript` recomputes the word count when the text
    // is present and no count was supplied.
    async fn put_transcript(&self, transcript: Transcript) -> Result<(), StoreError>;
    async fn get_transcript(&self, id: Uuid) -> Result<Transcript, StoreError>;
    async fn transcript_for_recording(&self, recording_id: Uuid) -> Result<Transcript, StoreError>;

    // Segments
    async fn insert_segment(&self, segment: Segment) -> Result<Segment, StoreError>;
    async fn update_segment(&self, segment: Segment) -> Result<(), StoreError>;
    async fn delete_segment(&self, id: Uuid) -> Result<(), StoreError>;

    /// Segments of a transcript in `(start, end, insertion)` order.
    async fn list_segments(&self, transcript_id: Uuid) -> Result<Vec<Segment>, StoreError>;

    /// Atomically delete every segment of the transcript and insert the
    /// replacements. A concurrent reader sees either the old set or the new
    /// set, never a partially cleared list.
    async fn replace_segments(
        &self,
        transcript_id: Uuid,
        segments: Vec<Segment>,
    ) -> Result<Vec<Segment>, StoreError>;

    // Usage accounting
    async fn append_usage(&self, record: UsageRecord) -> Result<(), StoreError>;
    async fn count_usage_since(
        &self,
        user_id: Uuid,
        service: ServiceType,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Total audio seconds logged for a service since `since`, optionally
    /// restricted to one engine. Feeds the free-tier premium budget.
    async fn audio_seconds_since(
        &self,
        user_id: Uuid,
        service: ServiceType,
        engine: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<f64, StoreError>;
    async fn usage_summary(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<HashMap<ServiceType, UsageTotals>, StoreError>;

    // Quota state
    async fn put_quota_state(&self, state: UserQuotaState) -> Result<(), StoreError>;
    async fn get_quota_state(&self, user_id: Uuid) -> Result<UserQuotaState, StoreError>;
}

/// Materialize provider output: build segments from the raw list, persist
/// them as the transcript's new segment set, and set the transcript's full
/// text to the space-joined concatenation in input order (not re-sorted),
/// with a recomputed word count.
pub async fn bulk_build_segments(
    store: &dyn Store,
    transcript: &mut Transcript,
    raw: &[RawSegment],
) -> Result<Vec<Segment>, StoreError> {
    let mut segments = Vec::with_capacity(raw.len());
    for item in raw {
        match Segment::from_raw(transcript.id, item) {
            Ok(segment) => segments.push(segment),
            // Zero-length provider segments carry no usable timing; drop
            // them rather than fail the whole batch.
            Err(_) => continue,
        }
    }

    let stored = store.replace_segments(transcript.id, segments).await?;

    let joined = raw
        .iter()
        .map(|r| r.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    transcript.set_full_text(joined);
    transcript.ensure_word_count();
    store.put_transcript(transcript.clone()).await?;

    Ok(stored)
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, UsageTotals};
use crate::error::StoreError;
use crate::model::{Recording, Segment, ServiceType, Transcript, UsageRecord, UserQuotaState};

#[derive(Default)]
struct Inner {
    recordings: HashMap<Uuid, Recording>,
    transcripts: HashMap<Uuid, Transcript>,
    transcript_by_recording: HashMap<Uuid, Uuid>,
    segments: HashMap<Uuid, Segment>,
    usage: Vec<UsageRecord>,
    quotas: HashMap<Uuid, UserQuotaState>,
    next_seq: u64,
}

/// In-memory store: all maps behind one `RwLock`, so multi-entity mutations
/// like segment replacement are atomic with respect to readers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_recording(&self, recording: Recording) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.recordings.insert(recording.id, recording);
        Ok(())
    }

    async fn get_recording(&self, id: Uuid) -> Result<Recording, StoreError> {
        let inner = self.inner.read().await;
        inner
            .recordings
            .get(&id)
            .cloned()
            .ok_or(StoreError::RecordingNotFound(id))
    }

    async fn put_transcript(&self, mut transcript: Transcript) -> Result<(), StoreError> {
        transcript.ensure_word_count();
        let mut inner = self.inner.write().await;
        inner
            .transcript_by_recording
            .insert(transcript.recording_id, transcript.id);
        inner.transcripts.insert(transcript.id, transcript);
        Ok(())
    }

    async fn get_transcript(&self, id: Uuid) -> Result<Transcript, StoreError> {
        let inner = self.inner.read().await;
        inner
            .transcripts
            .get(&id)
            .cloned()
            .ok_or(StoreError::TranscriptNotFound(id))
    }

    async fn transcript_for_recording(&self, recording_id: Uuid) -> Result<Transcript, StoreError> {
        let inner = self.inner.read().await;
        inner
            .transcript_by_recording
            .get(&recording_id)
            .and_then(|id| inner.transcripts.get(id))
            .cloned()
            .ok_or(StoreError::TranscriptNotFound(recording_id))
    }

    async fn insert_segment(&self, mut segment: Segment) -> Result<Segment, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_seq += 1;
        segment.created_seq = inner.next_seq;
        inner.segments.insert(segment.id, segment.clone());
        Ok(segment)
    }

    async fn update_segment(&self, segment: Segment) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.segments.contains_key(&segment.id) {
            return Err(StoreError::SegmentNotFound(segment.id));
        }
        inner.segments.insert(segment.id, segment);
        Ok(())
    }

    async fn delete_segment(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .segments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::SegmentNotFound(id))
    }

    async fn list_segments(&self, transcript_id: Uuid) -> Result<Vec<Segment>, StoreError> {
        let inner = self.inner.read().await;
        let mut segments: Vec<Segment> = inner
            .segments
            .values()
            .filter(|s| s.transcript_id == transcript_id)
            .cloned()
            .collect();
        segments.sort_by(|a, b| a.cmp_order(b));
        Ok(segments)
    }

    async fn replace_segments(
        &self,
        transcript_id: Uuid,
        segments: Vec<Segment>,
    ) -> Result<Vec<Segment>, StoreError> {
        let mut inner = self.inner.write().await;
        inner.segments.retain(|_, s| s.transcript_id != transcript_id);

        let mut stored = Vec::with_capacity(segments.len());
        for mut segment in segments {
            segment.transcript_id = transcript_id;
            inner.next_seq += 1;
            segment.created_seq = inner.next_seq;
            inner.segments.insert(segment.id, segment.clone());
            stored.push(segment);
        }
        Ok(stored)
    }

    async fn append_usage(&self, record: UsageRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.usage.push(record);
        Ok(())
    }

    async fn count_usage_since(
        &self,
        user_id: Uuid,
        service: ServiceType,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .usage
            .iter()
            .filter(|r| r.user_id == user_id && r.service_type == service && r.created_at >= since)
            .count() as u64)
    }

    async fn audio_seconds_since(
        &self,
        user_id: Uuid,
        service: ServiceType,
        engine: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<f64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .usage
            .iter()
            .filter(|r| r.user_id == user_id && r.service_type == service && r.created_at >= since)
            .filter(|r| engine.map(|e| r.model_name == e).unwrap_or(true))
            .filter_map(|r| r.audio_duration)
            .sum())
    }

    async fn usage_summary(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<HashMap<ServiceType, UsageTotals>, StoreError> {
        let inner = self.inner.read().await;
        let mut summary: HashMap<ServiceType, UsageTotals> = HashMap::new();
        for record in inner
            .usage
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= since)
        {
            let totals = summary.entry(record.service_type).or_default();
            totals.calls += 1;
            totals.tokens += record.tokens_used;
            totals.audio_seconds += record.audio_duration.unwrap_or(0.0);
        }
        Ok(summary)
    }

    async fn put_quota_state(&self, state: UserQuotaState) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.quotas.insert(state.user_id, state);
        Ok(())
    }

    async fn get_quota_state(&self, user_id: Uuid) -> Result<UserQuotaState, StoreError> {
        let inner = self.inner.read().await;
        inner
            .quotas
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::QuotaStateNotFound(user_id))
    }
}

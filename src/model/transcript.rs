use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::count_words;
use super::segment::Segment;

/// The transcription of one recording (exactly one per recording).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: Uuid,
    pub recording_id: Uuid,
    pub full_text: String,

    /// Detected or requested language code (e.g. "zh-TW", "en-US").
    pub language: String,

    /// Identifier of the engine that produced this transcript.
    pub engine: String,

    pub confidence: Option<f32>,

    /// Derived from `full_text`; recomputed whenever the text changes and
    /// no explicit count was supplied.
    pub word_count: Option<u32>,

    /// Wall-clock seconds the transcription took.
    pub processing_seconds: Option<f64>,

    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    pub fn new(recording_id: Uuid, engine: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recording_id,
            full_text: String::new(),
            language: String::new(),
            engine: engine.into(),
            confidence: None,
            word_count: None,
            processing_seconds: None,
            is_processed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the full text and invalidate the derived word count.
    pub fn set_full_text(&mut self, text: impl Into<String>) {
        self.full_text = text.into();
        self.word_count = None;
        self.updated_at = Utc::now();
    }

    /// Recompute the word count from the full text unless a count was
    /// already supplied. Called at every persistence boundary so the count
    /// is always consistent with the text.
    pub fn ensure_word_count(&mut self) {
        if self.word_count.is_none() && !self.full_text.is_empty() {
            self.word_count = Some(count_words(&self.full_text));
        }
    }

    /// Space-joined text of all segments with the given speaker id, in
    /// start-time order.
    pub fn text_by_speaker(&self, segments: &[Segment], speaker_id: &str) -> String {
        let mut owned: Vec<&Segment> = segments
            .iter()
            .filter(|s| s.transcript_id == self.id)
            .filter(|s| s.speaker_id.as_deref() == Some(speaker_id))
            .collect();
        owned.sort_by(|a, b| a.cmp_order(b));
        owned
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rebuild the full text as the space-joined concatenation of the given
    /// segments in start-time order, recomputing the word count. Required
    /// consistency step after merge/split mutations.
    pub fn rebuild_from_segments(&mut self, segments: &[Segment]) {
        let mut ordered: Vec<&Segment> = segments
            .iter()
            .filter(|s| s.transcript_id == self.id)
            .collect();
        ordered.sort_by(|a, b| a.cmp_order(b));
        self.full_text = ordered
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.word_count = Some(count_words(&self.full_text));
        self.updated_at = Utc::now();
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::count_words;
use crate::error::SegmentError;
use crate::subtitle::{format_compact_timestamp, format_srt_timestamp};

/// Display name used when a merge joins segments from different speakers.
pub const MULTIPLE_SPEAKERS: &str = "Multiple speakers";

/// A raw timestamped segment as produced by a transcription provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker_id: Option<String>,
    pub confidence: Option<f32>,
}

/// One timestamped text segment of a transcript.
///
/// Segments order by `(start_time, end_time, created_seq)`; `created_seq` is
/// a store-assigned insertion counter, so two segments sharing a start time
/// still have a deterministic total order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub transcript_id: Uuid,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub speaker_id: Option<String>,
    pub speaker_name: Option<String>,
    pub confidence: Option<f32>,
    pub word_count: u32,
    pub is_manually_edited: bool,

    /// Insertion order within the store, secondary sort key after times.
    pub created_seq: u64,
}

impl Segment {
    /// Create a segment, enforcing `end > start`.
    pub fn new(
        transcript_id: Uuid,
        start_time: f64,
        end_time: f64,
        text: impl Into<String>,
    ) -> Result<Self, SegmentError> {
        if end_time <= start_time {
            return Err(SegmentError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        let text = text.into();
        let word_count = count_words(&text);
        Ok(Self {
            id: Uuid::new_v4(),
            transcript_id,
            start_time,
            end_time,
            text,
            speaker_id: None,
            speaker_name: None,
            confidence: None,
            word_count,
            is_manually_edited: false,
            created_seq: 0,
        })
    }

    pub fn from_raw(transcript_id: Uuid, raw: &RawSegment) -> Result<Self, SegmentError> {
        let mut segment = Self::new(transcript_id, raw.start, raw.end, raw.text.clone())?;
        segment.speaker_id = raw.speaker_id.clone();
        segment.confidence = raw.confidence;
        Ok(segment)
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn midpoint(&self) -> f64 {
        (self.start_time + self.end_time) / 2.0
    }

    /// Total order used everywhere segments are listed or exported.
    pub fn cmp_order(&self, other: &Segment) -> std::cmp::Ordering {
        self.start_time
            .total_cmp(&other.start_time)
            .then(self.end_time.total_cmp(&other.end_time))
            .then(self.created_seq.cmp(&other.created_seq))
    }

    pub fn recompute_word_count(&mut self) {
        self.word_count = count_words(&self.text);
    }

    /// Merge this segment with another from the same transcript.
    ///
    /// The result keeps this segment's identity and spans both time ranges;
    /// texts are joined with a single space in temporal order (by start
    /// time, then end time for equal starts). Differing speaker ids clear
    /// the merged speaker and set the "multiple speakers" display name.
    ///
    /// The caller must delete `other` afterwards and recompute the owning
    /// transcript's full text; merge itself touches neither.
    pub fn merge_with(&self, other: &Segment) -> Result<Segment, SegmentError> {
        if self.transcript_id != other.transcript_id {
            return Err(SegmentError::CrossTranscriptMerge);
        }

        let self_first = (self.start_time, self.end_time) <= (other.start_time, other.end_time);
        let (first, second) = if self_first { (self, other) } else { (other, self) };

        let mut merged = self.clone();
        merged.start_time = self.start_time.min(other.start_time);
        merged.end_time = self.end_time.max(other.end_time);
        merged.text = format!("{} {}", first.text, second.text);

        if self.speaker_id == other.speaker_id {
            merged.speaker_id = self.speaker_id.clone();
            merged.speaker_name = self.speaker_name.clone();
        } else {
            merged.speaker_id = None;
            merged.speaker_name = Some(MULTIPLE_SPEAKERS.to_string());
        }

        merged.recompute_word_count();
        merged.is_manually_edited = true;
        Ok(merged)
    }

    /// Split at a point strictly inside `(start, end)`.
    ///
    /// Text is divided at the character index proportional to the time
    /// ratio. This is a linear approximation that ignores word and grapheme
    /// boundaries. The left half keeps this segment's identity; the right
    /// half is a new segment the caller must insert separately.
    pub fn split_at(&self, at_time: f64) -> Result<(Segment, Segment), SegmentError> {
        if at_time <= self.start_time || at_time >= self.end_time {
            return Err(SegmentError::SplitOutOfRange {
                at: at_time,
                start: self.start_time,
                end: self.end_time,
            });
        }

        let ratio = (at_time - self.start_time) / self.duration();
        let chars: Vec<char> = self.text.chars().collect();
        let split_index = ((chars.len() as f64) * ratio).round() as usize;
        let split_index = split_index.min(chars.len());

        let left_text: String = chars[..split_index].iter().collect();
        let right_text: String = chars[split_index..].iter().collect();

        let mut left = self.clone();
        left.end_time = at_time;
        left.text = left_text;
        left.recompute_word_count();
        left.is_manually_edited = true;

        let mut right = self.clone();
        right.id = Uuid::new_v4();
        right.start_time = at_time;
        right.text = right_text;
        right.recompute_word_count();
        right.is_manually_edited = true;

        Ok((left, right))
    }

    /// Timestamp range, compact (`MM:SS.mmm`) or SRT (`HH:MM:SS,mmm`) form.
    pub fn formatted_timestamp(&self, srt_style: bool) -> String {
        if srt_style {
            format!(
                "{} --> {}",
                format_srt_timestamp(self.start_time),
                format_srt_timestamp(self.end_time)
            )
        } else {
            format!(
                "{} --> {}",
                format_compact_timestamp(self.start_time),
                format_compact_timestamp(self.end_time)
            )
        }
    }

    /// Render as a single SRT entry with the given 1-based sequence number.
    pub fn to_srt_entry(&self, index: usize) -> String {
        format!(
            "{}\n{}\n{}\n",
            index,
            self.formatted_timestamp(true),
            self.text
        )
    }
}

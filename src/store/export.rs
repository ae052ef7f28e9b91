use std::collections::HashMap;
use uuid::Uuid;

use super::Store;
use crate::error::StoreError;
use crate::model::Segment;
use crate::subtitle::{render_srt, render_vtt, Cue};

/// Grouping key for segments without a speaker id.
pub const UNKNOWN_SPEAKER: &str = "unknown";

/// Space-joined text and accumulated speaking time for one speaker.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SpeakerExport {
    pub text: String,
    /// Sum of per-segment durations, not the wall-clock span.
    pub total_time: f64,
}

fn cues_from_segments(segments: &[Segment]) -> Vec<Cue> {
    segments
        .iter()
        .map(|s| Cue {
            start: s.start_time,
            end: s.end_time,
            text: s.text.clone(),
            speaker_id: s.speaker_id.clone(),
            speaker_name: s.speaker_name.clone(),
        })
        .collect()
}

/// Render a transcript's segments as SRT, ordered by start time.
pub async fn export_srt(
    store: &dyn Store,
    transcript_id: Uuid,
    include_speaker: bool,
) -> Result<String, StoreError> {
    let segments = store.list_segments(transcript_id).await?;
    Ok(render_srt(&cues_from_segments(&segments), include_speaker))
}

/// Render a transcript's segments as WebVTT, ordered by start time.
pub async fn export_vtt(
    store: &dyn Store,
    transcript_id: Uuid,
    include_speaker: bool,
) -> Result<String, StoreError> {
    let segments = store.list_segments(transcript_id).await?;
    Ok(render_vtt(&cues_from_segments(&segments), include_speaker))
}

/// Group a transcript's segments by speaker id (missing id groups under
/// [`UNKNOWN_SPEAKER`]), concatenating each group's text in start-time
/// order and accumulating its total speaking duration.
pub async fn export_by_speaker(
    store: &dyn Store,
    transcript_id: Uuid,
) -> Result<HashMap<String, SpeakerExport>, StoreError> {
    let segments = store.list_segments(transcript_id).await?;

    let mut grouped: HashMap<String, SpeakerExport> = HashMap::new();
    for segment in &segments {
        let key = segment
            .speaker_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string());
        let entry = grouped.entry(key).or_default();
        if !entry.text.is_empty() {
            entry.text.push(' ');
        }
        entry.text.push_str(&segment.text);
        entry.total_time += segment.duration();
    }
    Ok(grouped)
}

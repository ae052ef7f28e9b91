//! Subtitle rendering: pure functions from segment lists to SRT/VTT text.
//!
//! No I/O happens here; callers frame the returned strings as downloads.

mod srt;
mod vtt;

pub use srt::render_srt;
pub use vtt::{convert_srt_to_vtt, render_vtt};

use serde::{Deserialize, Serialize};

/// Minimal input shape for the renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker_id: Option<String>,
    pub speaker_name: Option<String>,
}

impl Cue {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Display label: explicit speaker name, else "Speaker {id}".
    pub(crate) fn speaker_label(&self) -> Option<String> {
        if let Some(name) = &self.speaker_name {
            return Some(name.clone());
        }
        self.speaker_id.as_ref().map(|id| format!("Speaker {}", id))
    }
}

/// Split seconds into (hours, minutes, seconds, milliseconds), clamping
/// negative inputs to zero and rounding to the nearest millisecond. The
/// single rounding step avoids off-by-one millis from values like 3661.042
/// that have no exact binary representation.
fn split_timestamp(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let whole = total_ms / 1000;
    (whole / 3600, (whole % 3600) / 60, whole % 60, total_ms % 1000)
}

/// SRT timestamp: `HH:MM:SS,mmm`.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// VTT timestamp: `HH:MM:SS.mmm` (dot, not comma).
pub fn format_vtt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// Compact timestamp without the hour field: `MM:SS.mmm`.
pub fn format_compact_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_timestamp(seconds);
    format!("{:02}:{:02}.{:03}", h * 60 + m, s, ms)
}

/// Merge adjacent short cues to improve subtitle readability.
///
/// Two neighbours merge when they share a speaker id and either the earlier
/// cue is shorter than `min_duration` or the gap between them is at most
/// `max_gap`. Texts join with a space. Runs only when explicitly requested
/// by the caller.
pub fn merge_short_cues(cues: &[Cue], min_duration: f64, max_gap: f64) -> Vec<Cue> {
    if cues.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<Cue> = cues.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<Cue> = Vec::new();
    let mut current: Option<Cue> = None;

    for cue in sorted {
        let Some(mut cur) = current.take() else {
            current = Some(cue);
            continue;
        };

        let gap = cue.start - cur.end;
        let same_speaker = cue.speaker_id == cur.speaker_id;
        let short = cur.duration() < min_duration;

        if same_speaker && (short || gap <= max_gap) {
            cur.end = cue.end;
            cur.text.push(' ');
            cur.text.push_str(&cue.text);
            current = Some(cur);
        } else {
            merged.push(cur);
            current = Some(cue);
        }
    }

    if let Some(cur) = current {
        merged.push(cur);
    }
    merged
}

pub const DEFAULT_MIN_CUE_DURATION: f64 = 1.0;
pub const DEFAULT_MAX_CUE_GAP: f64 = 0.3;

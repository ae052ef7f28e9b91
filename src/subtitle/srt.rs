use super::{format_srt_timestamp, Cue};

/// Render cues as SubRip Text.
///
/// Cues render in start-time order. Empty-text cues are skipped and do not
/// consume a sequence number, so numbering reflects rendered entries only.
pub fn render_srt(cues: &[Cue], include_speaker: bool) -> String {
    if cues.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<&Cue> = cues.iter().collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut lines: Vec<String> = Vec::new();
    let mut index = 0usize;

    for cue in sorted {
        let text = cue.text.trim();
        if text.is_empty() {
            continue;
        }
        index += 1;

        lines.push(index.to_string());
        lines.push(format!(
            "{} --> {}",
            format_srt_timestamp(cue.start),
            format_srt_timestamp(cue.end)
        ));

        let speaker = if include_speaker { cue.speaker_label() } else { None };
        match speaker {
            Some(name) => lines.push(format!("[{}] {}", name, text)),
            None => lines.push(text.to_string()),
        }

        // Blank separator between entries.
        lines.push(String::new());
    }

    lines.join("\n")
}

use super::{format_vtt_timestamp, Cue};

/// Render cues as WebVTT. The output always begins with a `WEBVTT` header
/// line followed by a blank line, even for empty input.
pub fn render_vtt(cues: &[Cue], include_speaker: bool) -> String {
    let mut lines: Vec<String> = vec!["WEBVTT".to_string(), String::new()];

    let mut sorted: Vec<&Cue> = cues.iter().collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

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
            format_vtt_timestamp(cue.start),
            format_vtt_timestamp(cue.end)
        ));

        let speaker = if include_speaker { cue.speaker_label() } else { None };
        match speaker {
            Some(name) => lines.push(format!("<v {}>{}</v>", name, text)),
            None => lines.push(text.to_string()),
        }

        lines.push(String::new());
    }

    if index == 0 {
        return "WEBVTT\n\n".to_string();
    }
    lines.join("\n")
}

/// Convert SRT content to WebVTT by prepending the header and switching the
/// millisecond separator in timestamp lines from comma to dot.
pub fn convert_srt_to_vtt(srt_content: &str) -> String {
    let srt_content = srt_content.strip_prefix('\u{feff}').unwrap_or(srt_content);

    let mut out = String::from("WEBVTT\n\n");
    for (i, line) in srt_content.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.contains("-->") {
            out.push_str(&line.replace(',', "."));
        } else {
            out.push_str(line);
        }
    }
    if srt_content.ends_with('\n') {
        out.push('\n');
    }
    out
}

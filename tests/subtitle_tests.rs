// Integration tests for subtitle rendering and export
//
// Renderer output is asserted byte-for-byte where the format matters.

use audioscribe::model::{Segment, Transcript};
use audioscribe::store::{export_by_speaker, export_srt, export_vtt, MemoryStore, Store};
use audioscribe::subtitle::{
    convert_srt_to_vtt, format_srt_timestamp, format_vtt_timestamp, merge_short_cues, render_srt,
    render_vtt, Cue, DEFAULT_MAX_CUE_GAP, DEFAULT_MIN_CUE_DURATION,
};
use uuid::Uuid;

fn cue(start: f64, end: f64, text: &str) -> Cue {
    Cue {
        start,
        end,
        text: text.to_string(),
        speaker_id: None,
        speaker_name: None,
    }
}

fn named_cue(start: f64, end: f64, text: &str, speaker_id: &str, name: Option<&str>) -> Cue {
    Cue {
        start,
        end,
        text: text.to_string(),
        speaker_id: Some(speaker_id.to_string()),
        speaker_name: name.map(|n| n.to_string()),
    }
}

#[test]
fn test_srt_single_cue_exact_output() {
    let output = render_srt(&[cue(0.0, 2.5, "這是")], false);
    assert_eq!(output, "1\n00:00:00,000 --> 00:00:02,500\n這是\n");
}

#[test]
fn test_srt_orders_by_start_time() {
    let cues = vec![cue(5.0, 6.0, "second"), cue(0.0, 1.0, "first")];
    let output = render_srt(&cues, false);

    let first = output.find("first").unwrap();
    let second = output.find("second").unwrap();
    assert!(first < second);
    assert!(output.starts_with("1\n00:00:00,000"));
}

#[test]
fn test_srt_skips_empty_cues_without_numbering_gap() {
    let cues = vec![
        cue(0.0, 1.0, "one"),
        cue(1.0, 2.0, "   "),
        cue(2.0, 3.0, "two"),
    ];
    let output = render_srt(&cues, false);

    assert!(output.contains("1\n00:00:00,000"));
    assert!(output.contains("2\n00:00:02,000"), "Blank cue must not consume a number: {}", output);
    assert!(!output.contains("3\n"));
}

#[test]
fn test_srt_speaker_prefix() {
    let cues = vec![
        named_cue(0.0, 1.0, "hello", "speaker_0", Some("Alice")),
        named_cue(1.0, 2.0, "hi", "speaker_1", None),
    ];
    let output = render_srt(&cues, true);

    assert!(output.contains("[Alice] hello"));
    assert!(output.contains("[Speaker speaker_1] hi"));

    // Speaker labels are opt-in.
    let plain = render_srt(&cues, false);
    assert!(!plain.contains("Alice"));
}

#[test]
fn test_srt_empty_input() {
    assert_eq!(render_srt(&[], true), "");
}

#[test]
fn test_vtt_header_and_voice_tags() {
    let cues = vec![named_cue(0.0, 2.5, "hello", "speaker_0", Some("Alice"))];
    let output = render_vtt(&cues, true);

    assert_eq!(
        output,
        "WEBVTT\n\n1\n00:00:00.000 --> 00:00:02.500\n<v Alice>hello</v>\n"
    );
}

#[test]
fn test_vtt_empty_input_is_bare_header() {
    assert_eq!(render_vtt(&[], true), "WEBVTT\n\n");
    assert_eq!(render_vtt(&[cue(0.0, 1.0, "  ")], true), "WEBVTT\n\n");
}

#[test]
fn test_timestamp_formats() {
    assert_eq!(format_srt_timestamp(3661.042), "01:01:01,042");
    assert_eq!(format_vtt_timestamp(3661.042), "01:01:01.042");
    // Millis round rather than truncate, and carry into the seconds field.
    assert_eq!(format_srt_timestamp(1.9996), "00:00:02,000");
    assert_eq!(format_srt_timestamp(0.042), "00:00:00,042");
    // Negative times clamp to zero.
    assert_eq!(format_srt_timestamp(-3.0), "00:00:00,000");
}

#[test]
fn test_srt_to_vtt_conversion_touches_only_timestamp_lines() {
    let srt = "1\n00:00:00,000 --> 00:00:02,500\nHello, world\n";
    let vtt = convert_srt_to_vtt(srt);

    assert!(vtt.starts_with("WEBVTT\n\n"));
    assert!(vtt.contains("00:00:00.000 --> 00:00:02.500"));
    assert!(vtt.contains("Hello, world"), "Commas in text survive: {}", vtt);
}

#[test]
fn test_merge_short_cues_same_speaker() {
    let cues = vec![
        named_cue(0.0, 0.4, "short", "speaker_0", None),
        named_cue(0.5, 2.0, "follows", "speaker_0", None),
        named_cue(5.0, 7.0, "far away", "speaker_0", None),
    ];
    let merged = merge_short_cues(&cues, DEFAULT_MIN_CUE_DURATION, DEFAULT_MAX_CUE_GAP);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].text, "short follows");
    assert_eq!(merged[0].start, 0.0);
    assert_eq!(merged[0].end, 2.0);
    assert_eq!(merged[1].text, "far away");
}

#[test]
fn test_merge_short_cues_never_crosses_speakers() {
    let cues = vec![
        named_cue(0.0, 0.3, "a", "speaker_0", None),
        named_cue(0.3, 0.6, "b", "speaker_1", None),
    ];
    let merged = merge_short_cues(&cues, DEFAULT_MIN_CUE_DURATION, DEFAULT_MAX_CUE_GAP);
    assert_eq!(merged.len(), 2);
}

#[test]
fn test_merge_short_cues_small_gap_merges_long_cues() {
    let cues = vec![
        named_cue(0.0, 2.0, "long one", "speaker_0", None),
        named_cue(2.2, 4.0, "long two", "speaker_0", None),
    ];
    let merged = merge_short_cues(&cues, DEFAULT_MIN_CUE_DURATION, DEFAULT_MAX_CUE_GAP);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].text, "long one long two");
}

async fn seed_transcript(store: &MemoryStore) -> Transcript {
    let transcript = Transcript::new(Uuid::new_v4(), "cloud");
    store.put_transcript(transcript.clone()).await.unwrap();

    let mut a = Segment::new(transcript.id, 0.0, 2.5, "hello there").unwrap();
    a.speaker_id = Some("speaker_0".to_string());
    let mut b = Segment::new(transcript.id, 4.0, 5.5, "reply").unwrap();
    b.speaker_id = Some("speaker_1".to_string());
    let mut c = Segment::new(transcript.id, 2.5, 4.0, "more talk").unwrap();
    c.speaker_id = Some("speaker_0".to_string());

    for segment in [a, b, c] {
        store.insert_segment(segment).await.unwrap();
    }
    transcript
}

#[tokio::test]
async fn test_export_srt_from_store() {
    let store = MemoryStore::new();
    let transcript = seed_transcript(&store).await;

    let output = export_srt(&store, transcript.id, true).await.unwrap();
    assert!(output.starts_with("1\n00:00:00,000 --> 00:00:02,500"));
    assert!(output.contains("[Speaker speaker_0] hello there"));
    assert!(output.contains("3\n"), "All three segments render: {}", output);
}

#[tokio::test]
async fn test_export_vtt_from_store() {
    let store = MemoryStore::new();
    let transcript = seed_transcript(&store).await;

    let output = export_vtt(&store, transcript.id, false).await.unwrap();
    assert!(output.starts_with("WEBVTT\n\n1\n00:00:00.000"));
    assert!(!output.contains("<v "));
}

#[tokio::test]
async fn test_export_by_speaker_accumulates_talk_time() {
    let store = MemoryStore::new();
    let transcript = seed_transcript(&store).await;

    let grouped = export_by_speaker(&store, transcript.id).await.unwrap();
    assert_eq!(grouped.len(), 2);

    let first = &grouped["speaker_0"];
    assert_eq!(first.text, "hello there more talk");
    assert!((first.total_time - 4.0).abs() < 1e-9);

    let second = &grouped["speaker_1"];
    assert_eq!(second.text, "reply");
    assert!((second.total_time - 1.5).abs() < 1e-9);
}

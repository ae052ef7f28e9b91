// Integration tests for the segment model
//
// These tests cover merge and split semantics, ordering, and the CJK-aware
// word counter.

use audioscribe::error::SegmentError;
use audioscribe::model::{count_words, Segment, Transcript, MULTIPLE_SPEAKERS};
use uuid::Uuid;

fn segment(transcript_id: Uuid, start: f64, end: f64, text: &str) -> Segment {
    Segment::new(transcript_id, start, end, text).unwrap()
}

#[test]
fn test_segment_rejects_inverted_time_range() {
    let result = Segment::new(Uuid::new_v4(), 5.0, 5.0, "text");
    assert!(matches!(
        result,
        Err(SegmentError::InvalidTimeRange { .. })
    ));

    let result = Segment::new(Uuid::new_v4(), 5.0, 4.0, "text");
    assert!(result.is_err());
}

#[test]
fn test_word_count_ignores_whitespace_and_punctuation() {
    assert_eq!(count_words("hello world"), 10);
    assert_eq!(count_words(""), 0);
    assert_eq!(count_words("  ,.!  "), 0);
    // CJK punctuation (fullwidth period) is excluded too.
    assert_eq!(count_words("這是一個測試用的轉錄文本內容。"), 14);
}

#[test]
fn test_merge_joins_text_in_temporal_order() {
    let tid = Uuid::new_v4();
    let later = segment(tid, 2.0, 3.0, "一個測試用的");
    let earlier = segment(tid, 0.0, 1.5, "這是");

    // Merge is called on the later segment, but text still joins by time.
    let merged = later.merge_with(&earlier).unwrap();
    assert_eq!(merged.text, "這是 一個測試用的");
    assert_eq!(merged.start_time, 0.0);
    assert_eq!(merged.end_time, 3.0);
    assert_eq!(merged.id, later.id, "Merge keeps the receiver's identity");
    assert!(merged.is_manually_edited);
    assert_eq!(merged.word_count, count_words("這是 一個測試用的"));
}

#[test]
fn test_merge_preserves_shared_speaker() {
    let tid = Uuid::new_v4();
    let mut a = segment(tid, 0.0, 1.0, "first");
    let mut b = segment(tid, 1.0, 2.0, "second");
    a.speaker_id = Some("speaker_0".to_string());
    b.speaker_id = Some("speaker_0".to_string());

    let merged = a.merge_with(&b).unwrap();
    assert_eq!(merged.speaker_id.as_deref(), Some("speaker_0"));
    assert!(merged.speaker_name.is_none());
}

#[test]
fn test_merge_differing_speakers_sets_sentinel() {
    let tid = Uuid::new_v4();
    let mut a = segment(tid, 0.0, 1.0, "first");
    let mut b = segment(tid, 1.0, 2.0, "second");
    a.speaker_id = Some("speaker_0".to_string());
    b.speaker_id = Some("speaker_1".to_string());

    let merged = a.merge_with(&b).unwrap();
    assert!(merged.speaker_id.is_none());
    assert_eq!(merged.speaker_name.as_deref(), Some(MULTIPLE_SPEAKERS));
}

#[test]
fn test_merge_across_transcripts_fails() {
    let a = segment(Uuid::new_v4(), 0.0, 1.0, "first");
    let b = segment(Uuid::new_v4(), 1.0, 2.0, "second");

    assert_eq!(
        a.merge_with(&b).unwrap_err(),
        SegmentError::CrossTranscriptMerge
    );
}

#[test]
fn test_merge_of_overlapping_segments_spans_both() {
    let tid = Uuid::new_v4();
    let a = segment(tid, 0.0, 5.0, "longer");
    let b = segment(tid, 1.0, 3.0, "inner");

    let merged = a.merge_with(&b).unwrap();
    assert_eq!(merged.start_time, 0.0);
    assert_eq!(merged.end_time, 5.0);
    assert_eq!(merged.text, "longer inner");
}

#[test]
fn test_split_divides_text_by_time_ratio() {
    let seg = segment(Uuid::new_v4(), 0.0, 10.0, "abcdefghij");

    let (left, right) = seg.split_at(4.0).unwrap();
    assert_eq!(left.text, "abcd");
    assert_eq!(right.text, "efghij");
    assert_eq!(left.start_time, 0.0);
    assert_eq!(left.end_time, 4.0);
    assert_eq!(right.start_time, 4.0);
    assert_eq!(right.end_time, 10.0);
    assert_eq!(left.id, seg.id, "Left half keeps the original identity");
    assert_ne!(right.id, seg.id, "Right half is a new segment");
    assert!(left.is_manually_edited);
    assert!(right.is_manually_edited);
}

#[test]
fn test_split_counts_characters_not_bytes() {
    let seg = segment(Uuid::new_v4(), 0.0, 10.0, "這是一個測試用的轉錄");

    let (left, right) = seg.split_at(5.0).unwrap();
    assert_eq!(left.text, "這是一個測");
    assert_eq!(right.text, "試用的轉錄");
}

#[test]
fn test_split_outside_range_fails() {
    let seg = segment(Uuid::new_v4(), 1.0, 3.0, "text");

    for at in [0.5, 1.0, 3.0, 4.0] {
        assert!(
            matches!(seg.split_at(at), Err(SegmentError::SplitOutOfRange { .. })),
            "Split at {} should be rejected",
            at
        );
    }
}

#[test]
fn test_ordering_breaks_ties_by_insertion() {
    let tid = Uuid::new_v4();
    let mut a = segment(tid, 1.0, 2.0, "first inserted");
    let mut b = segment(tid, 1.0, 2.0, "second inserted");
    a.created_seq = 1;
    b.created_seq = 2;

    assert_eq!(a.cmp_order(&b), std::cmp::Ordering::Less);
    assert_eq!(b.cmp_order(&a), std::cmp::Ordering::Greater);

    // Earlier end time wins before insertion order.
    let mut c = segment(tid, 1.0, 1.5, "shorter");
    c.created_seq = 9;
    assert_eq!(c.cmp_order(&a), std::cmp::Ordering::Less);
}

#[test]
fn test_formatted_timestamp_styles() {
    let seg = segment(Uuid::new_v4(), 61.25, 3723.5, "text");

    assert_eq!(
        seg.formatted_timestamp(true),
        "00:01:01,250 --> 01:02:03,500"
    );
    assert_eq!(seg.formatted_timestamp(false), "01:01.250 --> 62:03.500");
}

#[test]
fn test_srt_entry_rendering() {
    let seg = segment(Uuid::new_v4(), 0.0, 2.5, "這是");

    assert_eq!(
        seg.to_srt_entry(1),
        "1\n00:00:00,000 --> 00:00:02,500\n這是\n"
    );
}

#[test]
fn test_rebuild_restores_transcript_consistency_after_merge() {
    let mut transcript = Transcript::new(Uuid::new_v4(), "cloud");
    transcript.set_full_text("hello there general remarks closing notes");
    transcript.ensure_word_count();

    let a = segment(transcript.id, 0.0, 2.0, "hello there");
    let b = segment(transcript.id, 2.0, 4.0, "general remarks");
    let c = segment(transcript.id, 4.0, 6.0, "closing notes");
    let merged = a.merge_with(&b).unwrap();

    transcript.rebuild_from_segments(&[c, merged]);
    assert_eq!(
        transcript.full_text,
        "hello there general remarks closing notes"
    );
    assert_eq!(
        transcript.word_count,
        Some(count_words("hello there general remarks closing notes"))
    );
}

#[test]
fn test_rebuild_ignores_foreign_segments() {
    let mut transcript = Transcript::new(Uuid::new_v4(), "cloud");
    let segments = vec![
        segment(transcript.id, 2.0, 4.0, "world"),
        segment(transcript.id, 0.0, 2.0, "hello"),
        segment(Uuid::new_v4(), 0.0, 1.0, "elsewhere"),
    ];

    transcript.rebuild_from_segments(&segments);
    assert_eq!(transcript.full_text, "hello world");
    assert_eq!(transcript.word_count, Some(count_words("hello world")));
}

#[test]
fn test_text_by_speaker_filters_and_orders() {
    let transcript = Transcript::new(Uuid::new_v4(), "cloud");
    let mut a = segment(transcript.id, 0.0, 2.0, "first");
    a.speaker_id = Some("speaker_0".to_string());
    let mut b = segment(transcript.id, 4.0, 6.0, "third");
    b.speaker_id = Some("speaker_0".to_string());
    let mut c = segment(transcript.id, 2.0, 4.0, "second");
    c.speaker_id = Some("speaker_1".to_string());

    // Deliberately out of start-time order.
    let segments = vec![b, a, c];
    assert_eq!(
        transcript.text_by_speaker(&segments, "speaker_0"),
        "first third"
    );
    assert_eq!(transcript.text_by_speaker(&segments, "speaker_1"), "second");
    assert_eq!(transcript.text_by_speaker(&segments, "speaker_9"), "");
}

// Integration tests for transcript correction: lexical clean-up, overlap
// detection and resolution, sentence segmentation.

use interview_speech::transcript::corrector::{
    detect_overlaps, overlap_confidence, resolve_overlaps,
};
use interview_speech::transcript::segment::split_long_segments;
use interview_speech::transcript::{SpeakerSegment, TranscriptCorrector};

#[test]
fn test_lexical_domain_corrections() {
    let corrector = TranscriptCorrector::new();
    assert_eq!(
        corrector.correct_text("I know java script and type script"),
        "I know JavaScript and TypeScript"
    );
    assert_eq!(
        corrector.correct_text("my profile is on git hub"),
        "my profile is on GitHub"
    );
    assert_eq!(corrector.correct_text("I write sequel queries"), "I write SQL queries");
}

#[test]
fn test_lexical_whitespace_normalization() {
    let corrector = TranscriptCorrector::new();
    assert_eq!(
        corrector.correct_text("  so   much \t space\n here "),
        "so much space here"
    );
}

#[test]
fn test_lexical_collapses_character_repeats() {
    let corrector = TranscriptCorrector::new();
    // Runs of three or more collapse; legitimate doubles stay.
    assert_eq!(corrector.correct_text("ummmm"), "um");
    assert_eq!(corrector.correct_text("well"), "well");
    assert_eq!(corrector.correct_text("soooo good"), "so good");
}

#[test]
fn test_overlap_detection_threshold() {
    let segments = vec![
        SpeakerSegment::new("first answer", 0.0, 2.0, 1),
        SpeakerSegment::new("second answer", 1.9, 4.0, 1), // 0.1s: below threshold
        SpeakerSegment::new("third answer", 3.5, 6.0, 1),  // 0.5s: detected
    ];
    let overlaps = detect_overlaps(&segments);
    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].index, 1);
    assert!((overlaps[0].overlap - 0.5).abs() < 1e-9);
}

#[test]
fn test_overlap_confidence_within_bounds() {
    let cases = [
        // (speaker a, speaker b, text a, text b, overlap)
        (1, 1, "same length text here", "same length text too!", 3.0),
        (1, 2, "a very long answer about system design tradeoffs", "ok", 0.4),
        (1, 1, "short", "also short", 0.31),
        (2, 3, "x", "completely different length of text entirely", 10.0),
    ];
    for (tag_a, tag_b, text_a, text_b, overlap) in cases {
        let a = SpeakerSegment::new(text_a, 0.0, 2.0, tag_a);
        let b = SpeakerSegment::new(text_b, 2.0 - overlap, 4.0, tag_b);
        let confidence = overlap_confidence(&a, &b, overlap);
        assert!(
            (0.0..=1.0).contains(&confidence),
            "confidence {confidence} out of bounds for {text_a:?}/{text_b:?}"
        );
    }
}

#[test]
fn test_high_confidence_overlap_merges() {
    // Same speaker, near-identical length, clear overlap: one merged segment
    // spanning min(start)..max(end).
    let mut segments = vec![
        SpeakerSegment::new("I have five years of experience", 10.0, 13.0, 1),
        SpeakerSegment::new("have five years of experience", 12.5, 14.0, 1),
    ];
    resolve_overlaps(&mut segments);

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].start_time, 10.0);
    assert_eq!(segments[0].end_time, 14.0);
    assert_eq!(segments[0].speaker_tag, 1);
}

#[test]
fn test_merge_strips_duplicated_boundary_word() {
    let mut segments = vec![
        SpeakerSegment::new("so I started learning rust", 0.0, 2.0, 1),
        SpeakerSegment::new("rust is great", 1.5, 3.0, 1),
    ];
    resolve_overlaps(&mut segments);

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "so I started learning rust is great");
    assert_eq!(segments[0].start_time, 0.0);
    assert_eq!(segments[0].end_time, 3.0);
}

#[test]
fn test_low_confidence_overlap_forces_separation() {
    // Different speakers, highly divergent lengths: cut at the overlap
    // midpoint with at least a 0.1s gap.
    let mut segments = vec![
        SpeakerSegment::new(
            "well let me think about the overall architecture of the system",
            0.0,
            4.0,
            1,
        ),
        SpeakerSegment::new("ok", 3.5, 6.0, 2),
    ];
    resolve_overlaps(&mut segments);

    assert_eq!(segments.len(), 2);
    let gap = segments[1].start_time - segments[0].end_time;
    assert!(gap >= 0.0999, "expected >=0.1s gap, got {}", gap);
    assert!(segments[0].start_time < segments[0].end_time);
    assert!(segments[1].start_time < segments[1].end_time);
}

#[test]
fn test_mid_confidence_overlap_adjusts_symmetrically() {
    // Different speakers but similar lengths and a modest overlap: the
    // overlapped second is split in half between them.
    let mut segments = vec![
        SpeakerSegment::new("let me walk through my approach here", 0.0, 4.0, 1),
        SpeakerSegment::new("sure that sounds good to me okay", 3.0, 7.0, 2),
    ];
    resolve_overlaps(&mut segments);

    assert_eq!(segments.len(), 2);
    assert!((segments[0].end_time - 3.5).abs() < 1e-9);
    assert!((segments[1].start_time - 3.5).abs() < 1e-9);
}

#[test]
fn test_resolution_leaves_no_overlaps() {
    let segments = vec![
        SpeakerSegment::new("tell me about a project you are proud of", 0.0, 5.0, 1),
        SpeakerSegment::new("sure so last year I led a migration", 4.5, 9.0, 2),
        SpeakerSegment::new("so last year I led a migration effort", 4.6, 9.5, 2),
        SpeakerSegment::new("what was the hardest part", 9.6, 12.0, 1),
    ];
    let corrector = TranscriptCorrector::new();
    let resolved = corrector.correct_segments(segments);

    assert!(!resolved.is_empty());
    for segment in &resolved {
        assert!(
            segment.start_time < segment.end_time,
            "empty span: {:?}",
            segment
        );
    }
    for pair in resolved.windows(2) {
        assert!(
            pair[0].end_time <= pair[1].start_time + 1e-9,
            "overlap left behind: {:?} / {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_long_segment_splits_at_sentence_boundary() {
    let text = "I started my career as a junior developer at a small startup in my home town. \
                After that I moved into platform engineering and stayed for four years.";
    let segments = vec![SpeakerSegment::new(text, 0.0, 10.0, 1)];
    let split = split_long_segments(segments);

    assert!(split.len() >= 2, "expected a split, got {:?}", split);
    assert!(split[0].text.ends_with('.'), "first piece: {}", split[0].text);

    // Spans are contiguous, proportional to character share, and cover the
    // parent exactly.
    assert_eq!(split[0].start_time, 0.0);
    assert_eq!(split.last().unwrap().end_time, 10.0);
    for pair in split.windows(2) {
        assert_eq!(pair[0].end_time, pair[1].start_time);
    }
    let first_share = split[0].text.chars().count() as f64 / text.chars().count() as f64;
    let first_span = split[0].end_time - split[0].start_time;
    assert!(
        (first_span / 10.0 - first_share).abs() < 0.05,
        "span share {} vs char share {}",
        first_span / 10.0,
        first_share
    );
}

#[test]
fn test_long_segment_without_breaks_hard_cuts() {
    let text = "a".repeat(250);
    let segments = vec![SpeakerSegment::new(text, 0.0, 5.0, 1)];
    let split = split_long_segments(segments);

    assert!(split.len() >= 3);
    for segment in &split {
        assert!(segment.text.chars().count() <= 100);
        assert!(segment.start_time < segment.end_time);
    }
}

#[test]
fn test_short_segments_untouched() {
    let segments = vec![SpeakerSegment::new("a short answer", 1.0, 2.0, 1)];
    let split = split_long_segments(segments);
    assert_eq!(split.len(), 1);
    assert_eq!(split[0].text, "a short answer");
    assert_eq!(split[0].start_time, 1.0);
    assert_eq!(split[0].end_time, 2.0);
}

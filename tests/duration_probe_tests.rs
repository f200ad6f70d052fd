// Integration tests for chunk duration probing and timestamp remapping.
//
// Exact WAV durations come from container metadata; unreadable containers
// fall back to a bitrate estimate. Remapping puts recognizer-relative
// timestamps onto the session timeline.

use interview_speech::audio::probe::{map_timings_to_full_duration, probe_duration};
use interview_speech::transcript::SpeakerSegment;
use std::io::Cursor;

fn make_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

#[test]
fn test_probe_exact_wav_duration() {
    // 2 seconds at 16kHz mono
    let wav = make_wav(16000, 1, &vec![0i16; 32000]);
    let duration = probe_duration(&wav, "audio/wav");
    assert!((duration - 2.0).abs() < 0.001, "got {}", duration);
}

#[test]
fn test_probe_exact_wav_duration_stereo() {
    // 1 second at 8kHz stereo: 16000 interleaved samples = 8000 per channel
    let wav = make_wav(8000, 2, &vec![0i16; 16000]);
    let duration = probe_duration(&wav, "audio/wav");
    assert!((duration - 1.0).abs() < 0.001, "got {}", duration);
}

#[test]
fn test_probe_falls_back_to_estimate_for_garbage() {
    // 32000 bytes of non-container data declared as WAV: estimate at
    // 32000 B/s gives 1 second
    let garbage = vec![7u8; 32000];
    let duration = probe_duration(&garbage, "audio/wav");
    assert!((duration - 1.0).abs() < 0.001, "got {}", duration);
}

#[test]
fn test_probe_estimate_varies_by_mime_family() {
    let garbage = vec![7u8; 48000];
    let webm = probe_duration(&garbage, "audio/webm;codecs=opus");
    let mp3 = probe_duration(&garbage, "audio/mpeg");
    assert!(webm > mp3, "opus estimate should assume a lower bitrate");
    assert!(webm.is_finite() && webm > 0.0);
    assert!(mp3.is_finite() && mp3 > 0.0);
}

#[test]
fn test_probe_never_negative_or_nan() {
    for mime in ["audio/wav", "audio/webm", "audio/ogg", "audio/mpeg", "application/x-unknown"] {
        let duration = probe_duration(&[1, 2, 3], mime);
        assert!(duration.is_finite() && duration >= 0.0, "{mime} -> {duration}");
    }
    assert_eq!(probe_duration(&[], "audio/wav"), 0.0);
}

#[test]
fn test_remap_idempotent_when_durations_match() {
    // Recognizer agrees with the container and there is no offset: output is
    // the rounded input.
    let segments = vec![
        SpeakerSegment::new("first", 0.5, 4.25, 1),
        SpeakerSegment::new("second", 4.8, 10.0, 2),
    ];
    let remapped = map_timings_to_full_duration(segments, 10.0, 10.0, 0.0);
    assert_eq!(remapped[0].start_time, 0.5);
    assert!((remapped[0].end_time - 4.3).abs() < 1e-9);
    assert_eq!(remapped[1].start_time, 4.8);
    assert_eq!(remapped[1].end_time, 10.0);
}

#[test]
fn test_remap_applies_session_offset() {
    let segments = vec![SpeakerSegment::new("hello", 0.0, 10.0, 1)];
    let remapped = map_timings_to_full_duration(segments, 10.0, 10.0, 22.0);
    assert_eq!(remapped[0].start_time, 22.0);
    assert_eq!(remapped[0].end_time, 32.0);
}

#[test]
fn test_remap_rescales_to_container_duration() {
    // Recognizer saw 5s of audio but the container holds 10s: everything
    // stretches by 2x.
    let segments = vec![SpeakerSegment::new("hello", 1.0, 5.0, 1)];
    let remapped = map_timings_to_full_duration(segments, 5.0, 10.0, 0.0);
    assert_eq!(remapped[0].start_time, 2.0);
    assert_eq!(remapped[0].end_time, 10.0);
}

#[test]
fn test_remap_corrects_recognizer_clock_drift() {
    // Recognizer reports a 10s total but its last word ends at 9.5: the
    // stt scale stretches 9.5 -> 10 before the container scale applies.
    let segments = vec![SpeakerSegment::new("drifting", 0.0, 9.5, 1)];
    let remapped = map_timings_to_full_duration(segments, 10.0, 10.0, 0.0);
    assert_eq!(remapped[0].end_time, 10.0);
}

#[test]
fn test_remap_degenerate_inputs_unchanged() {
    let segments = vec![SpeakerSegment::new("hello", 1.23, 4.56, 1)];

    let unchanged = map_timings_to_full_duration(segments.clone(), 0.0, 10.0, 5.0);
    assert_eq!(unchanged[0].start_time, 1.23);
    assert_eq!(unchanged[0].end_time, 4.56);

    let unchanged = map_timings_to_full_duration(segments.clone(), 10.0, -1.0, 5.0);
    assert_eq!(unchanged[0].start_time, 1.23);

    let empty = map_timings_to_full_duration(Vec::new(), 10.0, 10.0, 5.0);
    assert!(empty.is_empty());
}

#[test]
fn test_remap_preserves_start_before_end() {
    let segments = vec![
        SpeakerSegment::new("a", 0.01, 0.02, 1),
        SpeakerSegment::new("b", 3.0, 7.0, 2),
    ];
    let remapped = map_timings_to_full_duration(segments, 7.0, 7.0, 0.0);
    for segment in &remapped {
        assert!(
            segment.start_time < segment.end_time,
            "{} !< {}",
            segment.start_time,
            segment.end_time
        );
    }
}

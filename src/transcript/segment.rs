use serde::{Deserialize, Serialize};

/// Maximum character length of a transcript segment before it is split
/// at a sentence boundary.
pub const MAX_SEGMENT_CHARS: usize = 100;

/// A contiguous span of recognized speech attributed to one speaker,
/// with start/end timestamps in seconds on the session timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerSegment {
    /// Recognized text
    pub text: String,

    /// Start time in seconds, session-relative
    pub start_time: f64,

    /// End time in seconds, session-relative
    pub end_time: f64,

    /// Speaker label assigned by diarization (small integer)
    pub speaker_tag: u32,
}

impl SpeakerSegment {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64, speaker_tag: u32) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
            speaker_tag,
        }
    }

    /// Length of the segment's span in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Round a timestamp to one decimal place (100ms resolution).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Split every over-long segment at sentence boundaries.
///
/// Segments longer than [`MAX_SEGMENT_CHARS`] are cut at the rightmost
/// meaningful break inside the first 100 characters (sentence-final
/// punctuation over connective words over commas), recursively, with a hard
/// cut when no break qualifies. Each resulting sub-segment's time span is
/// apportioned proportionally to its share of the parent's characters.
pub fn split_long_segments(segments: Vec<SpeakerSegment>) -> Vec<SpeakerSegment> {
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        split_into(segment, &mut out);
    }
    out
}

fn split_into(segment: SpeakerSegment, out: &mut Vec<SpeakerSegment>) {
    let trimmed = segment.text.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= MAX_SEGMENT_CHARS {
        if !trimmed.is_empty() {
            out.push(SpeakerSegment {
                text: trimmed.to_string(),
                ..segment
            });
        }
        return;
    }

    let cut = find_break(&chars).unwrap_or(MAX_SEGMENT_CHARS);
    let head: String = chars[..cut].iter().collect();
    let tail: String = chars[cut..].iter().collect();

    let total = chars.len() as f64;
    let span = segment.end_time - segment.start_time;
    let head_end = segment.start_time + span * (cut as f64 / total);

    let mut head_segment = SpeakerSegment {
        text: head.trim().to_string(),
        start_time: segment.start_time,
        end_time: head_end,
        speaker_tag: segment.speaker_tag,
    };
    if head_segment.end_time <= head_segment.start_time {
        head_segment.end_time = head_segment.start_time + 0.1;
    }
    if !head_segment.text.is_empty() {
        out.push(head_segment);
    }

    let tail_segment = SpeakerSegment {
        text: tail.trim().to_string(),
        start_time: head_end,
        end_time: segment.end_time,
        speaker_tag: segment.speaker_tag,
    };
    if !tail_segment.text.is_empty() {
        split_into(tail_segment, out);
    }
}

/// Find the rightmost meaningful break within the first [`MAX_SEGMENT_CHARS`]
/// characters. Returns the character index the segment should be cut at.
fn find_break(chars: &[char]) -> Option<usize> {
    let window = &chars[..MAX_SEGMENT_CHARS.min(chars.len())];

    // Sentence-final endings first: cut right after the punctuation.
    for i in (0..window.len()).rev() {
        if matches!(window[i], '.' | '!' | '?') && i > 0 {
            return Some(i + 1);
        }
    }

    // Connective words next: cut so the connective starts the next segment.
    let text: String = window.iter().collect();
    const CONNECTIVES: [&str; 5] = [" and ", " but ", " so ", " because ", " then "];
    let mut best: Option<usize> = None;
    for connective in CONNECTIVES {
        if let Some(byte_idx) = text.rfind(connective) {
            let char_idx = text[..byte_idx].chars().count() + 1;
            if char_idx > 1 && best.map_or(true, |b| char_idx > b) {
                best = Some(char_idx);
            }
        }
    }
    if best.is_some() {
        return best;
    }

    // Commas last: cut right after the comma.
    for i in (0..window.len()).rev() {
        if window[i] == ',' && i > 0 {
            return Some(i + 1);
        }
    }

    None
}

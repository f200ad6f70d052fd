use super::segment::{split_long_segments, SpeakerSegment};
use regex::Regex;
use tracing::debug;

/// Overlaps shorter than this are left alone (seconds).
pub const MIN_OVERLAP_SECS: f64 = 0.3;

/// Confidence above which two overlapping segments are merged into one.
pub const MERGE_THRESHOLD: f64 = 0.7;

/// Confidence at or below which overlapping segments are forced apart.
pub const SEPARATE_THRESHOLD: f64 = 0.4;

/// Gap inserted between force-separated segments (seconds).
const SEPARATION_GAP: f64 = 0.1;

/// An overlap detected between a segment and its successor in time order.
#[derive(Debug, Clone)]
pub struct OverlapCandidate {
    /// Index of the earlier segment; the overlap is with `index + 1`.
    pub index: usize,
    /// Overlapped duration in seconds.
    pub overlap: f64,
    /// Resolution confidence in [0, 1].
    pub confidence: f64,
}

/// Transcript clean-up: lexical correction of common mis-recognitions,
/// speaker-overlap reconciliation, and sentence segmentation.
pub struct TranscriptCorrector {
    rules: Vec<(Regex, &'static str)>,
    whitespace: Regex,
}

impl TranscriptCorrector {
    pub fn new() -> Self {
        // Common recognizer mangling of interview-domain vocabulary.
        let rules = [
            (r"(?i)\bjava\s+script\b", "JavaScript"),
            (r"(?i)\btype\s+script\b", "TypeScript"),
            (r"(?i)\b(?:git|get)\s+hub\b", "GitHub"),
            (r"(?i)\bnode\s+j\s*s\b", "Node.js"),
            (r"(?i)\breact\s+j\s*s\b", "React"),
            (r"(?i)\ba\s+p\s+i\b", "API"),
            (r"(?i)\bsequel\b", "SQL"),
            (r"(?i)\bdev\s+ops\b", "DevOps"),
            (r"(?i)\bfront\s+end\b", "frontend"),
            (r"(?i)\bback\s+end\b", "backend"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect();

        Self {
            rules,
            whitespace: Regex::new(r"\s+").expect("static whitespace pattern"),
        }
    }

    /// Full correction pass: lexical clean-up, time ordering, overlap
    /// resolution, then sentence segmentation. Empty segments are dropped.
    pub fn correct_segments(&self, segments: Vec<SpeakerSegment>) -> Vec<SpeakerSegment> {
        let mut segments: Vec<SpeakerSegment> = segments
            .into_iter()
            .map(|mut segment| {
                segment.text = self.correct_text(&segment.text);
                segment
            })
            .filter(|segment| !segment.text.is_empty())
            .collect();

        segments.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        resolve_overlaps(&mut segments);
        split_long_segments(segments)
    }

    /// Lexical pass over one text: domain-vocabulary corrections, collapsed
    /// character repeats, normalized whitespace.
    pub fn correct_text(&self, text: &str) -> String {
        let mut corrected = collapse_repeats(text);
        for (rule, replacement) in &self.rules {
            corrected = rule.replace_all(&corrected, *replacement).into_owned();
        }
        self.whitespace.replace_all(&corrected, " ").trim().to_string()
    }
}

impl Default for TranscriptCorrector {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse immediate character repeats ("ummmm" -> "um").
///
/// The regex crate has no backreferences, so this is a manual scan: runs of
/// three or more of the same character collapse to a single occurrence.
fn collapse_repeats(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run_char: Option<char> = None;
    let mut run_len = 0usize;

    for c in text.chars() {
        if run_char == Some(c) {
            run_len += 1;
        } else {
            if let Some(prev) = run_char {
                push_run(&mut out, prev, run_len);
            }
            run_char = Some(c);
            run_len = 1;
        }
    }
    if let Some(prev) = run_char {
        push_run(&mut out, prev, run_len);
    }
    out
}

fn push_run(out: &mut String, c: char, len: usize) {
    let emitted = if len >= 3 { 1 } else { len };
    for _ in 0..emitted {
        out.push(c);
    }
}

/// Detect overlapping adjacent pairs in time-ordered segments.
///
/// An overlap qualifies when the earlier segment's end runs past the later
/// segment's start by more than [`MIN_OVERLAP_SECS`].
pub fn detect_overlaps(segments: &[SpeakerSegment]) -> Vec<OverlapCandidate> {
    let mut candidates = Vec::new();
    for i in 0..segments.len().saturating_sub(1) {
        let overlap = segments[i].end_time - segments[i + 1].start_time;
        if overlap > MIN_OVERLAP_SECS {
            candidates.push(OverlapCandidate {
                index: i,
                overlap,
                confidence: overlap_confidence(&segments[i], &segments[i + 1], overlap),
            });
        }
    }
    candidates
}

/// Additive confidence that two overlapping segments are the same utterance
/// picked up twice, clamped to [0, 1].
///
/// Base 0.5; +0.3 for a shared speaker tag (-0.2 for differing tags);
/// +0.2 when the text lengths are within 30% of each other; +0.2 when the
/// overlap covers more than half of the earlier segment's own duration.
pub fn overlap_confidence(a: &SpeakerSegment, b: &SpeakerSegment, overlap: f64) -> f64 {
    let mut confidence: f64 = 0.5;

    if a.speaker_tag == b.speaker_tag {
        confidence += 0.3;
    } else {
        confidence -= 0.2;
    }

    let len_a = a.text.chars().count() as f64;
    let len_b = b.text.chars().count() as f64;
    let longer = len_a.max(len_b);
    if longer > 0.0 && (len_a.min(len_b) / longer) > 0.7 {
        confidence += 0.2;
    }

    if a.duration() > 0.0 && overlap > a.duration() * 0.5 {
        confidence += 0.2;
    }

    confidence.clamp(0.0, 1.0)
}

/// Resolve every detected overlap in place.
///
/// Candidates are processed in reverse index order so a splice at index i
/// cannot invalidate a pending candidate at a smaller index.
pub fn resolve_overlaps(segments: &mut Vec<SpeakerSegment>) {
    let candidates = detect_overlaps(segments);
    for candidate in candidates.into_iter().rev() {
        let i = candidate.index;
        if i + 1 >= segments.len() {
            continue;
        }
        debug!(
            index = i,
            overlap = candidate.overlap,
            confidence = candidate.confidence,
            "resolving transcript overlap"
        );
        if candidate.confidence > MERGE_THRESHOLD {
            let merged = merge_pair(&segments[i], &segments[i + 1]);
            segments.splice(i..=i + 1, [merged]);
        } else if candidate.confidence > SEPARATE_THRESHOLD {
            adjust_pair(segments, i, candidate.overlap);
        } else {
            separate_pair(segments, i);
        }
    }
}

/// High-confidence duplicate: one merged segment spanning both time ranges,
/// with the longer text as primary and the duplicated boundary word removed
/// from the other before concatenation.
fn merge_pair(a: &SpeakerSegment, b: &SpeakerSegment) -> SpeakerSegment {
    let (primary, secondary) = if a.text.chars().count() >= b.text.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let secondary_text = strip_boundary_duplicate(&primary.text, &secondary.text);
    let text = if secondary_text.is_empty() {
        primary.text.clone()
    } else {
        format!("{} {}", primary.text, secondary_text)
    };

    SpeakerSegment {
        text,
        start_time: a.start_time.min(b.start_time),
        end_time: a.end_time.max(b.end_time),
        speaker_tag: primary.speaker_tag,
    }
}

/// Remove the secondary's leading word when it duplicates the primary's
/// trailing word.
fn strip_boundary_duplicate(primary: &str, secondary: &str) -> String {
    let last = primary.split_whitespace().last();
    let mut words = secondary.split_whitespace().peekable();
    if let (Some(last), Some(first)) = (last, words.peek()) {
        if last.eq_ignore_ascii_case(first) {
            words.next();
        }
    }
    words.collect::<Vec<_>>().join(" ")
}

/// Mid-confidence overlap: split the overlapped duration in half, shrinking
/// the earlier segment's end and growing the later segment's start.
fn adjust_pair(segments: &mut [SpeakerSegment], i: usize, overlap: f64) {
    let half = overlap / 2.0;
    segments[i].end_time -= half;
    segments[i + 1].start_time += half;

    if segments[i].end_time <= segments[i].start_time {
        segments[i].end_time = segments[i].start_time + 0.1;
    }
    if segments[i + 1].end_time <= segments[i + 1].start_time {
        segments[i + 1].end_time = segments[i + 1].start_time + 0.1;
    }
}

/// Low-confidence overlap: cut both segments at the midpoint of the overlap
/// window and insert a small gap between them.
fn separate_pair(segments: &mut [SpeakerSegment], i: usize) {
    let midpoint = (segments[i + 1].start_time + segments[i].end_time) / 2.0;
    segments[i].end_time = midpoint - SEPARATION_GAP / 2.0;
    segments[i + 1].start_time = midpoint + SEPARATION_GAP / 2.0;

    if segments[i].end_time <= segments[i].start_time {
        segments[i].start_time = segments[i].end_time - 0.1;
    }
    if segments[i + 1].end_time <= segments[i + 1].start_time {
        segments[i + 1].end_time = segments[i + 1].start_time + 0.1;
    }
}

pub mod corrector;
pub mod segment;

pub use corrector::{
    detect_overlaps, overlap_confidence, resolve_overlaps, OverlapCandidate, TranscriptCorrector,
};
pub use segment::{round1, split_long_segments, SpeakerSegment, MAX_SEGMENT_CHARS};

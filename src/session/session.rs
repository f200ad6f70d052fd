use super::timer::WarningKind;
use crate::transcript::SpeakerSegment;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// State of one submitted chunk.
///
/// A chunk that fails is removed from the session's map entirely, so there
/// is no failed-with-partial-data state to represent: while `Processing` the
/// chunk holds no audio reference, and `Complete` carries everything.
#[derive(Debug, Clone)]
pub enum ChunkState {
    Processing,
    Complete(CompletedChunk),
}

impl ChunkState {
    pub fn is_processing(&self) -> bool {
        matches!(self, ChunkState::Processing)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ChunkState::Complete(_))
    }
}

/// A fully processed chunk: uploaded audio plus normalized, corrected
/// transcript segments.
#[derive(Debug, Clone)]
pub struct CompletedChunk {
    /// Storage URL of the raw chunk audio
    pub audio_url: String,

    /// Transcript segments on the session timeline
    pub speakers: Vec<SpeakerSegment>,

    /// Probed playback duration in seconds
    pub duration: f64,
}

/// In-flight state of one recording attempt within an interview room.
#[derive(Debug, Clone)]
pub struct IngestSession {
    /// Logical room/interview identifier
    pub canvas_id: String,

    /// Unique per recording attempt: canvas id + creation millis + suffix
    pub session_key: String,

    /// Bumped each time recording restarts within the same canvas
    pub segment_index: u32,

    pub mentor_id: String,
    pub mentee_id: String,

    pub session_start: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,

    /// Submitted chunks by caller-assigned ordinal
    pub chunks: BTreeMap<u32, ChunkState>,

    /// Time-limit warnings already sent for this session, so each graduated
    /// warning fires exactly once
    pub warned: HashSet<WarningKind>,

    /// Set when finalize begins; new chunk registrations are rejected
    pub finalizing: bool,
}

impl IngestSession {
    pub fn new(
        canvas_id: impl Into<String>,
        mentor_id: impl Into<String>,
        mentee_id: impl Into<String>,
        segment_index: u32,
    ) -> Self {
        let canvas_id = canvas_id.into();
        let now = Utc::now();
        let suffix: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect();
        let session_key = format!("{}-{}-{}", canvas_id, now.timestamp_millis(), suffix);

        Self {
            canvas_id,
            session_key,
            segment_index,
            mentor_id: mentor_id.into(),
            mentee_id: mentee_id.into(),
            session_start: now,
            last_activity: now,
            chunks: BTreeMap::new(),
            warned: HashSet::new(),
            finalizing: false,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn processing_count(&self) -> usize {
        self.chunks.values().filter(|c| c.is_processing()).count()
    }

    pub fn completed_count(&self) -> usize {
        self.chunks.values().filter(|c| c.is_complete()).count()
    }

    /// Session offset for a chunk: cumulative duration of every complete
    /// chunk ordinally prior to `chunk_index`. This is the point on the
    /// session timeline where the chunk's audio begins.
    pub fn completed_offset(&self, chunk_index: u32) -> f64 {
        self.chunks
            .range(..chunk_index)
            .filter_map(|(_, state)| match state {
                ChunkState::Complete(chunk) => Some(chunk.duration),
                ChunkState::Processing => None,
            })
            .sum()
    }

    /// Complete chunks in ordinal order.
    pub fn complete_chunks(&self) -> impl Iterator<Item = (u32, &CompletedChunk)> {
        self.chunks.iter().filter_map(|(index, state)| match state {
            ChunkState::Complete(chunk) => Some((*index, chunk)),
            ChunkState::Processing => None,
        })
    }
}

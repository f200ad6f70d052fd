use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Row persisted for a finalized recording session.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedSessionRecord {
    pub canvas_id: String,
    pub audio_url: String,
    pub mentor_id: String,
    pub mentee_id: String,
    /// max(segment.end_time) across the consolidated transcript
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

/// Row persisted per transcript segment of a finalized session.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSegment {
    pub speaker_tag: u32,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// Participants of a canvas, as the platform's room table resolves them.
#[derive(Debug, Clone)]
pub struct CanvasParticipants {
    pub mentor_id: String,
    pub mentee_id: String,
}

/// Durable store for finalized sessions and their transcript segments
/// (relational in production; contract only here).
#[async_trait::async_trait]
pub trait InterviewStore: Send + Sync {
    /// Insert a finalized-session row and return its id.
    async fn insert_finalized_session(&self, record: &FinalizedSessionRecord) -> Result<i64>;

    /// Insert one batch of segments belonging to a finalized session.
    async fn insert_segments(&self, session_id: i64, segments: &[StoredSegment]) -> Result<usize>;

    /// Resolve which parties are mentor and mentee for a canvas.
    async fn participants(&self, canvas_id: &str) -> Result<Option<CanvasParticipants>>;
}

/// In-memory durable store for the dev binary and the test suite.
pub struct MemoryInterviewStore {
    next_id: AtomicI64,
    sessions: RwLock<Vec<(i64, FinalizedSessionRecord)>>,
    segments: RwLock<HashMap<i64, Vec<StoredSegment>>>,
    participants: RwLock<HashMap<String, CanvasParticipants>>,
}

impl MemoryInterviewStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            sessions: RwLock::new(Vec::new()),
            segments: RwLock::new(HashMap::new()),
            participants: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set_participants(&self, canvas_id: &str, participants: CanvasParticipants) {
        self.participants
            .write()
            .await
            .insert(canvas_id.to_string(), participants);
    }

    pub async fn finalized_sessions(&self) -> Vec<(i64, FinalizedSessionRecord)> {
        self.sessions.read().await.clone()
    }

    pub async fn segments_for(&self, session_id: i64) -> Vec<StoredSegment> {
        self.segments
            .read()
            .await
            .get(&session_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MemoryInterviewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InterviewStore for MemoryInterviewStore {
    async fn insert_finalized_session(&self, record: &FinalizedSessionRecord) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sessions.write().await.push((id, record.clone()));
        Ok(id)
    }

    async fn insert_segments(&self, session_id: i64, segments: &[StoredSegment]) -> Result<usize> {
        let known = {
            let sessions = self.sessions.read().await;
            sessions.iter().any(|(id, _)| *id == session_id)
        };
        if !known {
            bail!("finalized session {session_id} not found");
        }
        let mut map = self.segments.write().await;
        map.entry(session_id)
            .or_default()
            .extend_from_slice(segments);
        Ok(segments.len())
    }

    async fn participants(&self, canvas_id: &str) -> Result<Option<CanvasParticipants>> {
        Ok(self.participants.read().await.get(canvas_id).cloned())
    }
}

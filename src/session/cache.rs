use super::session::{ChunkState, CompletedChunk, IngestSession};
use super::timer::{check_time_limit, TimeLimitStatus};
use crate::error::{SpeechError, SpeechResult};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Default maximum number of concurrent in-flight sessions.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Result of registering a chunk placeholder against a session.
#[derive(Debug, Clone)]
pub struct RegisteredChunk {
    pub session_key: String,
    pub segment_index: u32,
    /// Whether a new session was created for this chunk
    pub created: bool,
    pub time_limit: TimeLimitStatus,
}

/// Outcome of waiting for a canvas's in-flight chunks to drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every chunk left `processing`; at least one is complete
    Drained { complete: usize },
    /// Wait budget mostly exhausted; proceeding with what completed
    Partial { processing: usize, complete: usize },
    /// Nothing completed within the wait budget
    Empty,
}

struct CacheInner {
    sessions: HashMap<String, IngestSession>,
    /// Insertion order of session keys, for FIFO eviction
    order: VecDeque<String>,
    capacity: usize,
}

/// In-memory cache of in-flight recording sessions.
///
/// One lock guards the whole map: every in-flight chunk task writes its
/// session entry through here, and the finalizer drains through the same
/// lock, so "begin finalize" and "register new chunk" are mutually
/// exclusive for a session. Capacity-bounded with FIFO eviction — eviction
/// only drops in-flight state for abandoned recordings.
pub struct SessionCache {
    inner: Mutex<CacheInner>,
    /// Pinged whenever a chunk leaves the `processing` state
    drained: Notify,
}

impl SessionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                sessions: HashMap::new(),
                order: VecDeque::new(),
                capacity: capacity.max(1),
            }),
            drained: Notify::new(),
        }
    }

    pub async fn get(&self, session_key: &str) -> Option<IngestSession> {
        let inner = self.inner.lock().await;
        inner.sessions.get(session_key).cloned()
    }

    pub async fn put(&self, session: IngestSession) {
        let mut inner = self.inner.lock().await;
        let key = session.session_key.clone();
        if !inner.sessions.contains_key(&key) {
            evict_if_full(&mut inner);
            inner.order.push_back(key.clone());
        }
        inner.sessions.insert(key, session);
    }

    pub async fn delete(&self, session_key: &str) -> bool {
        let mut inner = self.inner.lock().await;
        inner.order.retain(|k| k != session_key);
        inner.sessions.remove(session_key).is_some()
    }

    /// Most-recently-active session key for a canvas whose chunk list is
    /// non-empty.
    pub async fn find_active(&self, canvas_id: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        find_active_locked(&inner, canvas_id)
    }

    /// All session keys for a canvas.
    pub async fn find_all(&self, canvas_id: &str) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .values()
            .filter(|s| s.canvas_id == canvas_id)
            .map(|s| s.session_key.clone())
            .collect()
    }

    pub async fn max_segment_index(&self, canvas_id: &str) -> Option<u32> {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .values()
            .filter(|s| s.canvas_id == canvas_id)
            .map(|s| s.segment_index)
            .max()
    }

    /// Resolve (or create) the canvas's active session and register a
    /// `processing` placeholder for the chunk, atomically.
    ///
    /// The placeholder goes in before any I/O so a concurrent finalize can
    /// observe work outstanding. A restart signal bumps `segment_index` on
    /// the existing session instead of minting a new key, preserving ordinal
    /// continuity across restarted recordings in the same room.
    pub async fn resolve_and_register(
        &self,
        canvas_id: &str,
        mentor_id: &str,
        mentee_id: &str,
        new_recording_session: bool,
        chunk_index: u32,
    ) -> SpeechResult<RegisteredChunk> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        if let Some(key) = find_active_locked(&inner, canvas_id) {
            let session = inner
                .sessions
                .get_mut(&key)
                .ok_or_else(|| SpeechError::SessionNotFound {
                    session_key: key.clone(),
                })?;

            if session.finalizing {
                return Err(SpeechError::Finalizing {
                    session_key: key,
                    chunk_index,
                });
            }

            let time_limit = check_time_limit(session, now);
            if time_limit.blocked {
                return Err(SpeechError::SessionExpired {
                    session_key: key,
                    chunk_index,
                });
            }

            if matches!(session.chunks.get(&chunk_index), Some(ChunkState::Processing)) {
                return Err(SpeechError::ChunkInFlight {
                    session_key: key,
                    chunk_index,
                });
            }

            if new_recording_session {
                session.segment_index += 1;
                info!(
                    session_key = %key,
                    segment_index = session.segment_index,
                    "recording restarted, segment index bumped"
                );
            }

            session.chunks.insert(chunk_index, ChunkState::Processing);
            session.touch();

            return Ok(RegisteredChunk {
                session_key: key,
                segment_index: session.segment_index,
                created: false,
                time_limit,
            });
        }

        let segment_index = inner
            .sessions
            .values()
            .filter(|s| s.canvas_id == canvas_id)
            .map(|s| s.segment_index + 1)
            .max()
            .unwrap_or(0);

        let mut session = IngestSession::new(canvas_id, mentor_id, mentee_id, segment_index);
        let time_limit = check_time_limit(&mut session, now);
        session.chunks.insert(chunk_index, ChunkState::Processing);
        let key = session.session_key.clone();

        info!(session_key = %key, canvas_id, "created recording session");

        evict_if_full(&mut inner);
        inner.order.push_back(key.clone());
        inner.sessions.insert(key.clone(), session);

        Ok(RegisteredChunk {
            session_key: key,
            segment_index,
            created: true,
            time_limit,
        })
    }

    /// Replace a `processing` placeholder with the completed chunk.
    pub async fn complete_chunk(
        &self,
        session_key: &str,
        chunk_index: u32,
        chunk: CompletedChunk,
    ) -> SpeechResult<()> {
        let mut inner = self.inner.lock().await;
        let session =
            inner
                .sessions
                .get_mut(session_key)
                .ok_or_else(|| SpeechError::SessionNotFound {
                    session_key: session_key.to_string(),
                })?;
        session.chunks.insert(chunk_index, ChunkState::Complete(chunk));
        session.touch();
        drop(inner);
        self.drained.notify_waiters();
        Ok(())
    }

    /// Remove a chunk entry after a pipeline failure. No partial or failed
    /// chunk is left behind; tolerant of the session having vanished.
    pub async fn remove_chunk(&self, session_key: &str, chunk_index: u32) {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.sessions.get_mut(session_key) {
            session.chunks.remove(&chunk_index);
            session.touch();
        }
        drop(inner);
        self.drained.notify_waiters();
    }

    /// Session offset for a chunk (sum of complete prior-chunk durations).
    pub async fn completed_offset(&self, session_key: &str, chunk_index: u32) -> SpeechResult<f64> {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .get(session_key)
            .map(|s| s.completed_offset(chunk_index))
            .ok_or_else(|| SpeechError::SessionNotFound {
                session_key: session_key.to_string(),
            })
    }

    /// Mark every session of a canvas as finalizing; later chunk
    /// registrations are rejected. Returns how many sessions were marked.
    pub async fn begin_finalize(&self, canvas_id: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let mut marked = 0;
        for session in inner.sessions.values_mut() {
            if session.canvas_id == canvas_id && !session.finalizing {
                session.finalizing = true;
                marked += 1;
            }
        }
        marked
    }

    /// Processing/complete chunk counts across every session of a canvas.
    pub async fn counts(&self, canvas_id: &str) -> (usize, usize) {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .values()
            .filter(|s| s.canvas_id == canvas_id)
            .fold((0, 0), |(processing, complete), session| {
                (
                    processing + session.processing_count(),
                    complete + session.completed_count(),
                )
            })
    }

    /// Wait for every in-flight chunk of a canvas to leave `processing`.
    ///
    /// Completion-signal wait bounded by `interval`-sized slices up to
    /// `max_wait`. Once 80% of the budget is spent and at least one chunk is
    /// complete, proceed with partial results rather than block.
    pub async fn wait_for_drain(
        &self,
        canvas_id: &str,
        interval: Duration,
        max_wait: Duration,
    ) -> DrainOutcome {
        let partial_after = max_wait.mul_f64(0.8);
        let start = tokio::time::Instant::now();

        loop {
            let (processing, complete) = self.counts(canvas_id).await;
            if processing == 0 {
                return if complete > 0 {
                    DrainOutcome::Drained { complete }
                } else {
                    DrainOutcome::Empty
                };
            }

            let elapsed = start.elapsed();
            if elapsed >= max_wait || (elapsed >= partial_after && complete > 0) {
                return if complete > 0 {
                    warn!(
                        canvas_id,
                        processing, complete, "drain wait exhausted, accepting partial results"
                    );
                    DrainOutcome::Partial {
                        processing,
                        complete,
                    }
                } else {
                    DrainOutcome::Empty
                };
            }

            tokio::select! {
                _ = self.drained.notified() => {}
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Every complete chunk across every session of a canvas, sorted by
    /// chunk ordinal.
    pub async fn collect_complete(&self, canvas_id: &str) -> Vec<(u32, CompletedChunk)> {
        let inner = self.inner.lock().await;
        let mut chunks: Vec<(u32, CompletedChunk)> = inner
            .sessions
            .values()
            .filter(|s| s.canvas_id == canvas_id)
            .flat_map(|s| s.complete_chunks().map(|(i, c)| (i, c.clone())))
            .collect();
        chunks.sort_by_key(|(index, _)| *index);
        chunks
    }

    /// Snapshots of every session of a canvas.
    pub async fn sessions_for(&self, canvas_id: &str) -> Vec<IngestSession> {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .values()
            .filter(|s| s.canvas_id == canvas_id)
            .cloned()
            .collect()
    }

    /// Delete every session of a canvas. Returns how many were removed.
    pub async fn delete_canvas(&self, canvas_id: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let keys: Vec<String> = inner
            .sessions
            .values()
            .filter(|s| s.canvas_id == canvas_id)
            .map(|s| s.session_key.clone())
            .collect();
        for key in &keys {
            inner.sessions.remove(key);
        }
        inner.order.retain(|k| !keys.contains(k));
        keys.len()
    }

    /// Remove sessions idle past the threshold. Returns how many were swept.
    pub async fn sweep_idle(&self, idle_timeout: Duration) -> usize {
        let mut inner = self.inner.lock().await;
        let cutoff = Utc::now()
            - chrono::Duration::from_std(idle_timeout).unwrap_or_else(|_| chrono::Duration::zero());
        let stale: Vec<String> = inner
            .sessions
            .values()
            .filter(|s| s.last_activity < cutoff)
            .map(|s| s.session_key.clone())
            .collect();
        for key in &stale {
            info!(session_key = %key, "sweeping idle session");
            inner.sessions.remove(key);
        }
        inner.order.retain(|k| !stale.contains(k));
        stale.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn find_active_locked(inner: &CacheInner, canvas_id: &str) -> Option<String> {
    inner
        .sessions
        .values()
        .filter(|s| s.canvas_id == canvas_id && !s.chunks.is_empty())
        .max_by_key(|s| s.last_activity)
        .map(|s| s.session_key.clone())
}

fn evict_if_full(inner: &mut CacheInner) {
    while inner.sessions.len() >= inner.capacity {
        match inner.order.pop_front() {
            Some(oldest) => {
                if inner.sessions.remove(&oldest).is_some() {
                    warn!(session_key = %oldest, "cache full, evicting oldest session");
                }
            }
            None => break,
        }
    }
}

/// Spawn the background idle sweep for a cache.
pub fn spawn_idle_sweeper(
    cache: Arc<SessionCache>,
    sweep_interval: Duration,
    idle_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let swept = cache.sweep_idle(idle_timeout).await;
            if swept > 0 {
                info!(swept, "idle session sweep");
            }
        }
    })
}

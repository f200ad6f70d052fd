use crate::audio::wav::merge_wav_buffers;
use crate::services::{FinalizedSessionRecord, InterviewStore, ObjectStore, StoredSegment};
use crate::session::{DrainOutcome, SessionCache};
use crate::transcript::SpeakerSegment;
use crate::error::SpeechError;
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Tuning for end-of-recording consolidation.
#[derive(Debug, Clone)]
pub struct FinalizeConfig {
    /// Drain-wait check interval
    pub poll_interval: Duration,

    /// Maximum total drain wait; partial results are accepted once 80% of
    /// this is exhausted
    pub max_wait: Duration,

    /// Segment rows per durable-store insert call
    pub segment_batch_size: usize,

    /// Tokens dropped from the consolidated transcript when a segment is
    /// nothing but one of these
    pub filler_words: Vec<String>,
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(30),
            segment_batch_size: 50,
            filler_words: ["um", "uh", "hmm", "mm", "ah", "like", "you know"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Result of finalizing a canvas's recording.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeOutcome {
    pub canvas_id: String,

    /// Merged audio artifact; `None` when nothing completed
    pub audio_url: Option<String>,

    /// Consolidated transcript text
    pub transcript: String,

    /// Time-ordered transcript segments
    pub segments: Vec<SpeakerSegment>,

    /// max(segment.end_time), seconds
    pub duration: f64,

    /// How many chunks contributed
    pub chunk_count: usize,

    /// Whether the drain wait was cut short and results are partial
    pub partial: bool,
}

impl FinalizeOutcome {
    fn empty(canvas_id: &str) -> Self {
        Self {
            canvas_id: canvas_id.to_string(),
            audio_url: None,
            transcript: String::new(),
            segments: Vec::new(),
            duration: 0.0,
            chunk_count: 0,
            partial: false,
        }
    }
}

/// End-of-recording consolidation: drain outstanding chunks, merge their
/// audio into one WAV artifact, persist the ordered transcript, tear down
/// the cache entries.
pub struct SessionFinalizer {
    cache: Arc<SessionCache>,
    storage: Arc<dyn ObjectStore>,
    store: Arc<dyn InterviewStore>,
    config: FinalizeConfig,
}

impl SessionFinalizer {
    pub fn new(
        cache: Arc<SessionCache>,
        storage: Arc<dyn ObjectStore>,
        store: Arc<dyn InterviewStore>,
        config: FinalizeConfig,
    ) -> Self {
        Self {
            cache,
            storage,
            store,
            config,
        }
    }

    pub async fn finalize(&self, canvas_id: &str) -> Result<FinalizeOutcome> {
        let marked = self.cache.begin_finalize(canvas_id).await;
        if marked == 0 {
            info!(canvas_id, "finalize requested with no sessions in cache");
            return Ok(FinalizeOutcome::empty(canvas_id));
        }

        let drain = self
            .cache
            .wait_for_drain(canvas_id, self.config.poll_interval, self.config.max_wait)
            .await;
        let partial = matches!(drain, DrainOutcome::Partial { .. });
        if drain == DrainOutcome::Empty {
            warn!(canvas_id, "no chunks completed, finalize returns empty");
            self.cache.delete_canvas(canvas_id).await;
            return Ok(FinalizeOutcome::empty(canvas_id));
        }

        let sessions = self.cache.sessions_for(canvas_id).await;
        let chunks = self.cache.collect_complete(canvas_id).await;
        if chunks.is_empty() {
            self.cache.delete_canvas(canvas_id).await;
            return Ok(FinalizeOutcome::empty(canvas_id));
        }

        let audio_url = self.merge_chunk_audio(canvas_id, &chunks).await;

        let mut segments: Vec<SpeakerSegment> = chunks
            .iter()
            .flat_map(|(_, chunk)| chunk.speakers.iter().cloned())
            .collect();
        segments.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let transcript = self.consolidate_transcript(&segments);
        let duration = segments.iter().map(|s| s.end_time).fold(0.0, f64::max);

        let (mentor_id, mentee_id) = self.resolve_participants(canvas_id, &sessions).await;
        let record = FinalizedSessionRecord {
            canvas_id: canvas_id.to_string(),
            audio_url: audio_url.clone(),
            mentor_id,
            mentee_id,
            duration,
            created_at: Utc::now(),
        };
        let session_id = self
            .store
            .insert_finalized_session(&record)
            .await
            .map_err(|e| SpeechError::Store {
                message: format!("{e:#}"),
            })?;

        self.persist_segments(session_id, &segments).await?;

        self.cache.delete_canvas(canvas_id).await;
        self.cleanup_chunk_objects(&chunks, &audio_url).await;

        info!(
            canvas_id,
            session_id,
            chunks = chunks.len(),
            segments = segments.len(),
            duration,
            partial,
            "finalize complete"
        );

        Ok(FinalizeOutcome {
            canvas_id: canvas_id.to_string(),
            audio_url: Some(audio_url),
            transcript,
            segments,
            duration,
            chunk_count: chunks.len(),
            partial,
        })
    }

    /// Merge every chunk's audio into one artifact and return its URL.
    ///
    /// A single chunk skips the merge and reuses its existing reference.
    /// Download failures drop that chunk from the merge set. If merging or
    /// uploading the artifact fails, the first available chunk's reference
    /// stands in rather than failing the whole finalize.
    async fn merge_chunk_audio(
        &self,
        canvas_id: &str,
        chunks: &[(u32, crate::session::CompletedChunk)],
    ) -> String {
        let first_url = chunks[0].1.audio_url.clone();
        if chunks.len() == 1 {
            return first_url;
        }

        let downloads = futures::future::join_all(
            chunks
                .iter()
                .map(|(index, chunk)| async move {
                    (*index, self.storage.download(&chunk.audio_url).await)
                }),
        )
        .await;

        let mut buffers = Vec::with_capacity(downloads.len());
        for (index, result) in downloads {
            match result {
                Ok(bytes) => buffers.push(bytes),
                Err(e) => {
                    warn!(canvas_id, chunk_index = index, error = %e, "chunk download failed, dropping from merge");
                }
            }
        }
        if buffers.is_empty() {
            warn!(canvas_id, "every chunk download failed, reusing first chunk reference");
            return first_url;
        }

        let merged = merge_wav_buffers(&buffers);
        let key = format!("interviews/{canvas_id}/{canvas_id}-merged.wav");
        match self.storage.upload(&merged, &key, "audio/wav").await {
            Ok(url) => url,
            Err(e) => {
                warn!(canvas_id, error = %e, "merged artifact upload failed, reusing first chunk reference");
                first_url
            }
        }
    }

    /// Sorted, trimmed transcript with filler-only and sub-3-character
    /// segments dropped, joined by single spaces.
    fn consolidate_transcript(&self, segments: &[SpeakerSegment]) -> String {
        segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|text| text.chars().count() >= 3)
            .filter(|text| {
                let lowered = text.to_lowercase();
                !self.config.filler_words.iter().any(|f| f == &lowered)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Bulk-insert segment rows in fixed-size batches to bound the payload
    /// of any single insert.
    async fn persist_segments(&self, session_id: i64, segments: &[SpeakerSegment]) -> Result<()> {
        let rows: Vec<StoredSegment> = segments
            .iter()
            .map(|s| StoredSegment {
                speaker_tag: s.speaker_tag,
                text: s.text.clone(),
                start_time: s.start_time,
                end_time: s.end_time,
            })
            .collect();

        for batch in rows.chunks(self.config.segment_batch_size.max(1)) {
            self.store
                .insert_segments(session_id, batch)
                .await
                .map_err(|e| SpeechError::Store {
                    message: format!("{e:#}"),
                })?;
        }
        Ok(())
    }

    async fn resolve_participants(
        &self,
        canvas_id: &str,
        sessions: &[crate::session::IngestSession],
    ) -> (String, String) {
        match self.store.participants(canvas_id).await {
            Ok(Some(p)) => (p.mentor_id, p.mentee_id),
            Ok(None) => sessions
                .first()
                .map(|s| (s.mentor_id.clone(), s.mentee_id.clone()))
                .unwrap_or_default(),
            Err(e) => {
                warn!(canvas_id, error = %e, "participant lookup failed, using session ids");
                sessions
                    .first()
                    .map(|s| (s.mentor_id.clone(), s.mentee_id.clone()))
                    .unwrap_or_default()
            }
        }
    }

    /// Best-effort removal of the now-redundant per-chunk audio objects.
    /// The merged artifact is already safely persisted, so failures here are
    /// logged only.
    async fn cleanup_chunk_objects(
        &self,
        chunks: &[(u32, crate::session::CompletedChunk)],
        keep_url: &str,
    ) {
        let redundant: Vec<String> = chunks
            .iter()
            .map(|(_, chunk)| chunk.audio_url.clone())
            .filter(|url| url != keep_url)
            .collect();
        if redundant.is_empty() {
            return;
        }
        match self.storage.delete_many(&redundant).await {
            Ok(summary) if summary.errors.is_empty() => {
                info!(deleted = summary.deleted, "cleaned up chunk audio objects");
            }
            Ok(summary) => {
                warn!(
                    deleted = summary.deleted,
                    failed = summary.errors.len(),
                    "partial chunk audio cleanup"
                );
            }
            Err(e) => {
                warn!(error = %e, "chunk audio cleanup failed");
            }
        }
    }
}

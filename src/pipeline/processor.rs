use crate::audio::probe::{extension_for_mime, map_timings_to_full_duration, probe_duration};
use crate::error::SpeechError;
use crate::services::{ObjectStore, Transcriber};
use crate::session::{CompletedChunk, RegisteredChunk, SessionCache, TimeLimitStatus};
use crate::transcript::TranscriptCorrector;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// One chunk submission, as the client delivers it.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub canvas_id: String,
    pub chunk_index: u32,
    pub audio: Vec<u8>,
    pub mime_type: String,
    pub mentor_id: String,
    pub mentee_id: String,
    /// Selects the external diarization path; its timestamps are already
    /// absolute on the session timeline
    pub diarization: bool,
    /// First chunk of a new recording attempt in this canvas
    pub new_recording_session: bool,
}

/// Result of one successfully processed chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkOutcome {
    pub session_key: String,
    pub segment_index: u32,
    pub chunk_index: u32,
    pub audio_url: String,
    pub duration: f64,
    pub session_offset: f64,
    pub segment_count: usize,
    pub time_limit: TimeLimitStatus,
}

/// Per-chunk orchestrator: decode, probe, offset, upload, transcribe,
/// normalize, correct, cache.
///
/// Each invocation runs as an independent task; multiple chunks of the same
/// session may be in flight at once with no completion-order guarantee.
pub struct ChunkProcessor {
    cache: Arc<SessionCache>,
    storage: Arc<dyn ObjectStore>,
    transcriber: Arc<dyn Transcriber>,
    corrector: TranscriptCorrector,
}

impl ChunkProcessor {
    pub fn new(
        cache: Arc<SessionCache>,
        storage: Arc<dyn ObjectStore>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            cache,
            storage,
            transcriber,
            corrector: TranscriptCorrector::new(),
        }
    }

    /// Process one chunk end to end.
    ///
    /// The placeholder registration happens before any I/O so a concurrent
    /// finalize observes the work outstanding. Failure at any later step
    /// removes the placeholder and propagates the error; the session and all
    /// other chunks are unaffected.
    pub async fn process_chunk(&self, request: ChunkRequest) -> Result<ChunkOutcome> {
        let slot = self
            .cache
            .resolve_and_register(
                &request.canvas_id,
                &request.mentor_id,
                &request.mentee_id,
                request.new_recording_session,
                request.chunk_index,
            )
            .await?;

        match self.run_pipeline(&slot, &request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    session_key = %slot.session_key,
                    chunk_index = request.chunk_index,
                    error = %e,
                    "chunk pipeline failed, removing placeholder"
                );
                self.cache
                    .remove_chunk(&slot.session_key, request.chunk_index)
                    .await;
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        slot: &RegisteredChunk,
        request: &ChunkRequest,
    ) -> Result<ChunkOutcome> {
        let duration = probe_duration(&request.audio, &request.mime_type);

        let session_offset = self
            .cache
            .completed_offset(&slot.session_key, request.chunk_index)
            .await?;

        let object_key = format!(
            "interviews/{}/{}-chunk-{:03}.{}",
            request.canvas_id,
            slot.session_key,
            request.chunk_index,
            extension_for_mime(&request.mime_type).unwrap_or("bin"),
        );
        let audio_url = self
            .storage
            .upload(&request.audio, &object_key, &request.mime_type)
            .await
            .map_err(|e| SpeechError::Upload {
                message: format!("{e:#}"),
            })?;

        let transcription = self
            .transcriber
            .transcribe(&audio_url, session_offset, request.diarization)
            .await
            .map_err(|e| SpeechError::Transcription {
                message: format!("{e:#}"),
            })?;

        // Diarization timestamps are already absolute; everything else is
        // chunk-relative and gets the two-stage rescale onto the timeline.
        let speakers = if request.diarization {
            transcription.speakers
        } else {
            map_timings_to_full_duration(
                transcription.speakers,
                transcription.duration,
                duration,
                session_offset,
            )
        };

        let speakers = self.corrector.correct_segments(speakers);
        let segment_count = speakers.len();

        self.cache
            .complete_chunk(
                &slot.session_key,
                request.chunk_index,
                CompletedChunk {
                    audio_url: audio_url.clone(),
                    speakers,
                    duration,
                },
            )
            .await?;

        info!(
            session_key = %slot.session_key,
            chunk_index = request.chunk_index,
            duration,
            session_offset,
            segment_count,
            "chunk complete"
        );

        Ok(ChunkOutcome {
            session_key: slot.session_key.clone(),
            segment_index: slot.segment_index,
            chunk_index: request.chunk_index,
            audio_url,
            duration,
            session_offset,
            segment_count,
            time_limit: slot.time_limit.clone(),
        })
    }
}

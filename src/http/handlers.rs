use super::state::AppState;
use crate::error::SpeechError;
use crate::pipeline::{ChunkOutcome, ChunkRequest, FinalizeOutcome};
use crate::session::timer::{current_level, SESSION_CAP_SECS};
use crate::session::WarningKind;
use crate::transcript::SpeakerSegment;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitChunkRequest {
    pub canvas_id: String,

    /// Caller-assigned chunk ordinal
    pub chunk_index: u32,

    /// Base64-encoded audio bytes; may be empty on a bare final-chunk signal
    #[serde(default)]
    pub audio: String,

    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    pub mentor_id: String,
    pub mentee_id: String,

    /// Use the external diarization path (timestamps arrive absolute)
    #[serde(default)]
    pub diarization: bool,

    /// First chunk of a new recording attempt in this canvas
    #[serde(default)]
    pub new_recording_session: bool,

    /// End of recording: drain, merge and persist after this chunk
    #[serde(default)]
    pub final_chunk: bool,
}

fn default_mime_type() -> String {
    "audio/wav".to_string()
}

#[derive(Debug, Serialize)]
pub struct SubmitChunkResponse {
    pub chunk: Option<ChunkOutcome>,
    pub finalized: Option<FinalizeOutcome>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub session_key: String,
    pub segment_index: u32,
    pub processing_chunks: usize,
    pub complete_chunks: usize,
    pub elapsed_secs: i64,
    pub remaining_secs: i64,
    pub warning_level: Option<WarningKind>,
    pub is_expired: bool,
    pub finalizing: bool,
}

#[derive(Debug, Serialize)]
pub struct CanvasStatusResponse {
    pub canvas_id: String,
    pub sessions: Vec<SessionStatus>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interviews/chunk
/// Submit one audio chunk; optionally finalize the recording after it.
pub async fn submit_chunk(
    State(state): State<AppState>,
    Json(req): Json<SubmitChunkRequest>,
) -> impl IntoResponse {
    let audio = match base64::engine::general_purpose::STANDARD.decode(&req.audio) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid base64 audio payload: {}", e),
                }),
            )
                .into_response();
        }
    };

    info!(
        canvas_id = %req.canvas_id,
        chunk_index = req.chunk_index,
        bytes = audio.len(),
        final_chunk = req.final_chunk,
        "chunk received"
    );

    let mut chunk_outcome = None;
    if !audio.is_empty() {
        let request = ChunkRequest {
            canvas_id: req.canvas_id.clone(),
            chunk_index: req.chunk_index,
            audio,
            mime_type: req.mime_type.clone(),
            mentor_id: req.mentor_id.clone(),
            mentee_id: req.mentee_id.clone(),
            diarization: req.diarization,
            new_recording_session: req.new_recording_session,
        };

        match state.processor.process_chunk(request).await {
            Ok(outcome) => chunk_outcome = Some(outcome),
            Err(e) => {
                error!("Failed to process chunk: {:#}", e);
                return (
                    error_status(&e),
                    Json(ErrorResponse {
                        error: format!("Failed to process chunk: {}", e),
                    }),
                )
                    .into_response();
            }
        }
    }

    let mut finalized = None;
    if req.final_chunk {
        match state.finalizer.finalize(&req.canvas_id).await {
            Ok(outcome) => finalized = Some(outcome),
            Err(e) => {
                error!("Failed to finalize recording: {:#}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!("Failed to finalize recording: {}", e),
                    }),
                )
                    .into_response();
            }
        }
    }

    (
        StatusCode::OK,
        Json(SubmitChunkResponse {
            chunk: chunk_outcome,
            finalized,
        }),
    )
        .into_response()
}

/// POST /interviews/:canvas_id/finalize
/// Explicit end-of-recording without a trailing audio chunk.
pub async fn finalize_recording(
    State(state): State<AppState>,
    Path(canvas_id): Path<String>,
) -> impl IntoResponse {
    info!(canvas_id = %canvas_id, "finalize requested");

    match state.finalizer.finalize(&canvas_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            error!("Failed to finalize recording: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to finalize recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /interviews/:canvas_id/status
/// In-flight sessions for a canvas with chunk counts and timer state.
pub async fn get_canvas_status(
    State(state): State<AppState>,
    Path(canvas_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.cache.sessions_for(&canvas_id).await;
    if sessions.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No active recording for canvas {}", canvas_id),
            }),
        )
            .into_response();
    }

    let now = Utc::now();
    let statuses: Vec<SessionStatus> = sessions
        .iter()
        .map(|session| {
            let elapsed_secs = now.signed_duration_since(session.session_start).num_seconds();
            SessionStatus {
                session_key: session.session_key.clone(),
                segment_index: session.segment_index,
                processing_chunks: session.processing_count(),
                complete_chunks: session.completed_count(),
                elapsed_secs,
                remaining_secs: (SESSION_CAP_SECS - elapsed_secs).max(0),
                warning_level: current_level(elapsed_secs),
                is_expired: elapsed_secs >= SESSION_CAP_SECS,
                finalizing: session.finalizing,
            }
        })
        .collect();

    (
        StatusCode::OK,
        Json(CanvasStatusResponse {
            canvas_id,
            sessions: statuses,
        }),
    )
        .into_response()
}

/// GET /interviews/:canvas_id/transcript
/// Transcript segments accumulated so far, time-ordered.
pub async fn get_canvas_transcript(
    State(state): State<AppState>,
    Path(canvas_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.cache.sessions_for(&canvas_id).await;
    if sessions.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No active recording for canvas {}", canvas_id),
            }),
        )
            .into_response();
    }

    let mut segments: Vec<SpeakerSegment> = sessions
        .iter()
        .flat_map(|session| {
            session
                .complete_chunks()
                .flat_map(|(_, chunk)| chunk.speakers.iter().cloned())
        })
        .collect();
    segments.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    (StatusCode::OK, Json(segments)).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn error_status(error: &anyhow::Error) -> StatusCode {
    match error.downcast_ref::<SpeechError>() {
        Some(SpeechError::ChunkInFlight { .. }) | Some(SpeechError::Finalizing { .. }) => {
            StatusCode::CONFLICT
        }
        Some(SpeechError::SessionExpired { .. }) => StatusCode::FORBIDDEN,
        Some(SpeechError::SessionNotFound { .. }) => StatusCode::NOT_FOUND,
        Some(SpeechError::Upload { .. }) | Some(SpeechError::Transcription { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

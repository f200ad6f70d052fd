use thiserror::Error;

/// Failure classes of the chunk pipeline.
///
/// Chunk-level failures never abort the session: the placeholder entry is
/// removed and the error is returned to the immediate caller while every
/// other chunk stays valid.
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Session {session_key} not found")]
    SessionNotFound { session_key: String },

    #[error("Session {session_key} has reached the time limit, chunk {chunk_index} rejected")]
    SessionExpired {
        session_key: String,
        chunk_index: u32,
    },

    #[error("Chunk {chunk_index} is already being processed for session {session_key}")]
    ChunkInFlight {
        session_key: String,
        chunk_index: u32,
    },

    #[error("Session {session_key} is finalizing, chunk {chunk_index} rejected")]
    Finalizing {
        session_key: String,
        chunk_index: u32,
    },

    #[error("Audio upload failed: {message}")]
    Upload { message: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Durable store error: {message}")]
    Store { message: String },
}

pub type SpeechResult<T> = std::result::Result<T, SpeechError>;

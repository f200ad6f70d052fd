pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod services;
pub mod session;
pub mod transcript;

pub use audio::{map_timings_to_full_duration, merge_wav_buffers, probe_duration, WavFormat};
pub use config::Config;
pub use error::{SpeechError, SpeechResult};
pub use http::{create_router, AppState};
pub use pipeline::{
    ChunkOutcome, ChunkProcessor, ChunkRequest, FinalizeConfig, FinalizeOutcome, SessionFinalizer,
};
pub use services::{
    InterviewStore, MemoryInterviewStore, MemoryObjectStore, ObjectStore, ScriptedTranscriber,
    Transcriber, Transcription,
};
pub use session::{
    spawn_idle_sweeper, ChunkState, CompletedChunk, DrainOutcome, IngestSession, SessionCache,
    TimeLimitStatus, WarningKind,
};
pub use transcript::{SpeakerSegment, TranscriptCorrector};

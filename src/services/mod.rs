pub mod storage;
pub mod store;
pub mod transcriber;

pub use storage::{DeleteSummary, MemoryObjectStore, ObjectStore};
pub use store::{
    CanvasParticipants, FinalizedSessionRecord, InterviewStore, MemoryInterviewStore, StoredSegment,
};
pub use transcriber::{ScriptedTranscriber, Transcriber, Transcription};

pub mod finalizer;
pub mod processor;

pub use finalizer::{FinalizeConfig, FinalizeOutcome, SessionFinalizer};
pub use processor::{ChunkOutcome, ChunkProcessor, ChunkRequest};

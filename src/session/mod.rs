pub mod cache;
pub mod session;
pub mod timer;

pub use cache::{
    spawn_idle_sweeper, DrainOutcome, RegisteredChunk, SessionCache, DEFAULT_CACHE_CAPACITY,
};
pub use session::{ChunkState, CompletedChunk, IngestSession};
pub use timer::{
    check_time_limit, current_level, SessionWarning, TimeLimitStatus, WarningKind,
    CRITICAL_THRESHOLD_SECS, SESSION_CAP_SECS, WARNING_THRESHOLD_SECS,
};

use crate::pipeline::{ChunkProcessor, SessionFinalizer};
use crate::session::SessionCache;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SessionCache>,
    pub processor: Arc<ChunkProcessor>,
    pub finalizer: Arc<SessionFinalizer>,
}

impl AppState {
    pub fn new(
        cache: Arc<SessionCache>,
        processor: Arc<ChunkProcessor>,
        finalizer: Arc<SessionFinalizer>,
    ) -> Self {
        Self {
            cache,
            processor,
            finalizer,
        }
    }
}

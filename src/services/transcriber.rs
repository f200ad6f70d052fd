use crate::transcript::SpeakerSegment;
use anyhow::Result;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// One transcription result from the recognition service.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// Plain transcript text as the recognizer reports it
    pub transcript: String,

    /// Recognizer confidence in [0, 1]
    pub confidence: f32,

    /// Total audio duration as the recognizer saw it, in seconds
    pub duration: f64,

    /// Per-speaker word groups with timestamps
    pub speakers: Vec<SpeakerSegment>,
}

/// Speech recognition + diarization service.
///
/// When `diarization_enabled`, returned timestamps are already absolute on
/// the session timeline (the service applies `session_offset` itself);
/// otherwise they are relative to the chunk and the caller rescales them.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio_url: &str,
        session_offset: f64,
        diarization_enabled: bool,
    ) -> Result<Transcription>;
}

/// Queue-driven transcriber for the dev binary and the test suite: returns
/// pushed results in order, or an empty transcription when the queue is dry.
pub struct ScriptedTranscriber {
    results: Mutex<VecDeque<Transcription>>,
}

impl ScriptedTranscriber {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn push_result(&self, result: Transcription) {
        self.results.lock().await.push_back(result);
    }
}

impl Default for ScriptedTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(
        &self,
        _audio_url: &str,
        _session_offset: f64,
        _diarization_enabled: bool,
    ) -> Result<Transcription> {
        let mut results = self.results.lock().await;
        Ok(results.pop_front().unwrap_or(Transcription {
            transcript: String::new(),
            confidence: 0.0,
            duration: 0.0,
            speakers: Vec::new(),
        }))
    }
}

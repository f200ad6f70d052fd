use crate::pipeline::FinalizeConfig;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Pipeline tuning. Defaults are the production values; tests shrink the
/// timing knobs to keep runs fast.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum concurrent in-flight sessions before FIFO eviction
    pub cache_capacity: usize,

    /// Sessions idle past this many seconds are swept
    pub idle_timeout_secs: u64,

    /// How often the idle sweep runs
    pub sweep_interval_secs: u64,

    /// Finalize drain-wait check interval
    pub finalize_poll_interval_ms: u64,

    /// Maximum finalize drain wait
    pub finalize_max_wait_secs: u64,

    /// Segment rows per durable-store insert
    pub segment_batch_size: usize,

    /// Stoplist for the consolidated transcript
    pub filler_words: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let finalize = FinalizeConfig::default();
        Self {
            cache_capacity: crate::session::DEFAULT_CACHE_CAPACITY,
            idle_timeout_secs: 30 * 60,
            sweep_interval_secs: 60,
            finalize_poll_interval_ms: finalize.poll_interval.as_millis() as u64,
            finalize_max_wait_secs: finalize.max_wait.as_secs(),
            segment_batch_size: finalize.segment_batch_size,
            filler_words: finalize.filler_words,
        }
    }
}

impl PipelineConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn finalize_config(&self) -> FinalizeConfig {
        FinalizeConfig {
            poll_interval: Duration::from_millis(self.finalize_poll_interval_ms),
            max_wait: Duration::from_secs(self.finalize_max_wait_secs),
            segment_batch_size: self.segment_batch_size,
            filler_words: self.filler_words.clone(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "interview-speech".to_string(),
                http: HttpConfig {
                    bind: "127.0.0.1".to_string(),
                    port: 8090,
                },
            },
            pipeline: PipelineConfig::default(),
        }
    }
}

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Result of a bulk delete: how many objects went away and which failed.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteSummary {
    pub deleted: usize,
    pub errors: Vec<String>,
}

/// Object storage for chunk audio and merged artifacts.
///
/// Uploads are idempotent-safe to retry; this pipeline surfaces upload
/// failure to the caller instead of retrying.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under a key and return the object's URL.
    async fn upload(&self, bytes: &[u8], key: &str, content_type: &str) -> Result<String>;

    /// Fetch an object's bytes by URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;

    /// Delete one object. Returns whether it existed.
    async fn delete(&self, url: &str) -> Result<bool>;

    /// Delete many objects, collecting per-object failures.
    async fn delete_many(&self, urls: &[String]) -> Result<DeleteSummary>;
}

struct StoredObject {
    bytes: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
}

/// In-memory object store for the dev binary and the test suite.
pub struct MemoryObjectStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://interview-audio")
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, bytes: &[u8], key: &str, content_type: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, key);
        let mut objects = self.objects.write().await;
        objects.insert(
            url.clone(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        info!(url = %url, bytes = bytes.len(), "stored object");
        Ok(url)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().await;
        match objects.get(url) {
            Some(object) => Ok(object.bytes.clone()),
            None => bail!("object not found: {url}"),
        }
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let mut objects = self.objects.write().await;
        Ok(objects.remove(url).is_some())
    }

    async fn delete_many(&self, urls: &[String]) -> Result<DeleteSummary> {
        let mut objects = self.objects.write().await;
        let mut deleted = 0;
        let mut errors = Vec::new();
        for url in urls {
            if objects.remove(url).is_some() {
                deleted += 1;
            } else {
                errors.push(format!("object not found: {url}"));
            }
        }
        Ok(DeleteSummary { deleted, errors })
    }
}

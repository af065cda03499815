//! Object store boundary.
//!
//! The service only needs two storage operations: list every object key
//! under a prefix and download one object's raw bytes. [`ObjectStore`]
//! captures that seam so the gRPC service can run against the real
//! S3-compatible client ([`crate::store_s3::S3Store`]) in production and
//! against [`MemoryStore`] in tests.
//!
//! Neither operation is retried anywhere; a failed list or download
//! fails the request that triggered it.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Storage-layer failures, named per operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object listing could not be retrieved.
    #[error("failed to list objects under '{prefix}': {message}")]
    List { prefix: String, message: String },

    /// A single object's content could not be downloaded.
    #[error("failed to download object '{key}': {message}")]
    Download { key: String, message: String },
}

/// A remote object store, reduced to the two operations the corpus
/// fetcher needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all object keys under `prefix`, draining any pagination.
    ///
    /// Returns keys in the store's listing order; the fetcher preserves
    /// this order in its results.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Download one object's content as raw bytes.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// In-memory object store for tests and local development.
///
/// Keys are held in a `BTreeMap`, so listings come back in lexicographic
/// order — stable enough to assert on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, replacing any existing content under `key`.
    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.objects.insert(key.into(), content.into());
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::Download {
                key: key.to_string(),
                message: "no such object".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_lists_by_prefix() {
        let mut store = MemoryStore::new();
        store.insert("shakespeare/hamlet.txt", "to be");
        store.insert("shakespeare/sonnets.txt", "love");
        store.insert("other/readme.txt", "nope");

        let keys = store.list("shakespeare/").await.unwrap();
        assert_eq!(
            keys,
            vec!["shakespeare/hamlet.txt", "shakespeare/sonnets.txt"]
        );
    }

    #[tokio::test]
    async fn test_memory_store_missing_key_is_download_error() {
        let store = MemoryStore::new();
        let err = store.download("shakespeare/missing.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::Download { .. }));
    }
}

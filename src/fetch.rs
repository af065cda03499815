//! Concurrent corpus retrieval.
//!
//! [`fetch_corpus`] lists every object under the configured prefix, then
//! downloads all of them through a bounded pool of download tasks. The
//! call blocks until every download has completed or one has failed;
//! the pool exists only for the duration of the call.
//!
//! # Workflow
//!
//! 1. List all keys under the prefix (the store drains pagination).
//! 2. Eagerly spawn one download task per key, gated by a semaphore
//!    (no reordering, no prioritization).
//! 3. Await every task in listing order.
//! 4. Decode each body as strict UTF-8.
//!
//! A single bad object — download failure or invalid UTF-8 — fails the
//! whole fetch; there is no per-item recovery and no retry.
//!
//! Download tasks are detached: dropping the caller's future does not
//! abort in-flight downloads. A client cancelling its RPC therefore
//! does not stop the work already underway for it.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::info;

use crate::store::{ObjectStore, StoreError};

/// One corpus document: its object key and decoded text.
///
/// Created fresh per request by the fetcher and discarded once counted;
/// nothing is cached across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub key: String,
    pub text: String,
}

/// Failures while assembling the corpus for one request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An object's bytes were not valid UTF-8.
    #[error("object '{key}' is not valid UTF-8")]
    Decode {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A download task panicked or was aborted by the runtime.
    #[error("download worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Fetch every document under `prefix`, downloading at most
/// `concurrency` objects at a time.
///
/// Results come back in listing order. Logs the document count on
/// success.
pub async fn fetch_corpus(
    store: Arc<dyn ObjectStore>,
    prefix: &str,
    concurrency: usize,
) -> Result<Vec<Document>, FetchError> {
    let keys = store.list(prefix).await?;

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut downloads = Vec::with_capacity(keys.len());
    for key in keys {
        let store = Arc::clone(&store);
        let semaphore = Arc::clone(&semaphore);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            // The semaphore lives as long as every task; acquire only
            // fails on a closed semaphore, which never happens here.
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("download semaphore closed");
            store.download(&task_key).await
        });
        downloads.push((key, handle));
    }

    let mut documents = Vec::with_capacity(downloads.len());
    for (key, handle) in downloads {
        let bytes = handle.await??;
        let text = String::from_utf8(bytes).map_err(|source| FetchError::Decode {
            key: key.clone(),
            source,
        })?;
        documents.push(Document { key, text });
    }

    info!(files = documents.len(), "number of files: {}", documents.len());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn corpus_store() -> Arc<dyn ObjectStore> {
        let mut store = MemoryStore::new();
        store.insert("shakespeare/a.txt", "to be or not to be");
        store.insert("shakespeare/b.txt", "love is a fire");
        store.insert("shakespeare/c.txt", "the rest is silence\n");
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_fetch_returns_all_documents_in_listing_order() {
        let docs = fetch_corpus(corpus_store(), "shakespeare/", 8)
            .await
            .unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].key, "shakespeare/a.txt");
        assert_eq!(docs[0].text, "to be or not to be");
        assert_eq!(docs[1].key, "shakespeare/b.txt");
        assert_eq!(docs[2].key, "shakespeare/c.txt");
    }

    #[tokio::test]
    async fn test_fetch_empty_prefix_yields_empty_corpus() {
        let docs = fetch_corpus(corpus_store(), "nothing-here/", 8)
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_aborts_the_fetch() {
        let mut store = MemoryStore::new();
        store.insert("shakespeare/good.txt", "fine");
        store.insert("shakespeare/bad.txt", vec![0xff, 0xfe, 0x00]);

        let err = fetch_corpus(Arc::new(store), "shakespeare/", 8)
            .await
            .unwrap_err();
        match err {
            FetchError::Decode { key, .. } => assert_eq!(key, "shakespeare/bad.txt"),
            other => panic!("expected decode error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_list_failure_propagates() {
        struct BrokenStore;

        #[async_trait]
        impl ObjectStore for BrokenStore {
            async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
                Err(StoreError::List {
                    prefix: prefix.to_string(),
                    message: "listing unavailable".to_string(),
                })
            }
            async fn download(&self, _key: &str) -> Result<Vec<u8>, StoreError> {
                unreachable!("list already failed")
            }
        }

        let err = fetch_corpus(Arc::new(BrokenStore), "shakespeare/", 8)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Store(StoreError::List { .. })));
    }

    #[tokio::test]
    async fn test_download_pool_is_bounded() {
        struct CountingStore {
            in_flight: AtomicUsize,
            peak: AtomicUsize,
        }

        #[async_trait]
        impl ObjectStore for CountingStore {
            async fn list(&self, _prefix: &str) -> Result<Vec<String>, StoreError> {
                Ok((0..32).map(|i| format!("k/{i:02}")).collect())
            }
            async fn download(&self, _key: &str) -> Result<Vec<u8>, StoreError> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(b"x".to_vec())
            }
        }

        let store = Arc::new(CountingStore {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let docs = fetch_corpus(store.clone(), "k/", 4).await.unwrap();
        assert_eq!(docs.len(), 32);
        assert!(
            store.peak.load(Ordering::SeqCst) <= 4,
            "peak concurrency {} exceeded the pool size",
            store.peak.load(Ordering::SeqCst)
        );
    }
}

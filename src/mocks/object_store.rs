//! Mock object storage for testing.

use crate::error::{NetworkError, TerraError};
use crate::transfer::{ObjectStore, ObjectStoreFactory, StorageTarget};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Recorded put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    /// Bucket.
    pub bucket: String,
    /// Storage key.
    pub key: String,
    /// Body size in bytes.
    pub size: usize,
    /// Content tag returned.
    pub etag: String,
}

/// In-memory object store.
///
/// Returns content tags `etag-1`, `etag-2`, ... in completion order. Keys
/// ending with a configured suffix fail. Tracks the highest number of puts
/// in flight at once.
#[derive(Debug, Default)]
pub struct MockObjectStore {
    puts: Mutex<Vec<PutRecord>>,
    failing_suffixes: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    counter: AtomicUsize,
}

impl MockObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every put for `delay` before completing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every put whose key ends with `suffix`.
    pub fn fail_keys_ending_with(self, suffix: impl Into<String>) -> Self {
        self.failing_suffixes.lock().insert(suffix.into());
        self
    }

    /// Get all successful puts.
    pub fn puts(&self) -> Vec<PutRecord> {
        self.puts.lock().clone()
    }

    /// Get the stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.puts.lock().iter().map(|p| p.key.clone()).collect();
        keys.sort();
        keys
    }

    /// Highest number of concurrent puts observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<String, TerraError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fails = self
            .failing_suffixes
            .lock()
            .iter()
            .any(|suffix| key.ends_with(suffix.as_str()));
        if fails {
            return Err(NetworkError::ConnectionReset.into());
        }

        let etag = format!("etag-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        self.puts.lock().push(PutRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: body.len(),
            etag: etag.clone(),
        });
        Ok(etag)
    }
}

/// Factory handing out one shared [`MockObjectStore`].
#[derive(Debug)]
pub struct MockObjectStoreFactory {
    store: Arc<MockObjectStore>,
    targets: Mutex<Vec<StorageTarget>>,
}

impl MockObjectStoreFactory {
    /// Wrap a store.
    pub fn new(store: Arc<MockObjectStore>) -> Self {
        Self {
            store,
            targets: Mutex::new(Vec::new()),
        }
    }

    /// Targets passed to [`ObjectStoreFactory::connect`].
    pub fn targets(&self) -> Vec<StorageTarget> {
        self.targets.lock().clone()
    }
}

impl ObjectStoreFactory for MockObjectStoreFactory {
    fn connect(&self, target: &StorageTarget) -> Result<Arc<dyn ObjectStore>, TerraError> {
        self.targets.lock().push(target.clone());
        Ok(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_fail() {
        let store = MockObjectStore::new().fail_keys_ending_with("bad.jpg");
        let tag = store
            .put_object("bucket", "p/good.jpg", Bytes::from_static(b"abc"))
            .await
            .unwrap();
        assert_eq!(tag, "etag-1");
        assert!(store
            .put_object("bucket", "p/bad.jpg", Bytes::new())
            .await
            .is_err());

        let puts = store.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].size, 3);
    }
}

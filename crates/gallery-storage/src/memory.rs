//! In-process object store.
//!
//! Mirrors the S3 semantics the gateway relies on: keys list in
//! lexicographic order, unknown buckets fail with `NoSuchBucket`, deleting a
//! missing key succeeds. Failures can be injected per operation.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use gallery_models::{ListResult, ObjectEntry, StorageConfig};

use crate::error::{codes, Operation, ProviderFailure, ProviderResult};
use crate::store::{ObjectStore, StoreConnector, StoreHandle};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// Object store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<Buckets>,
    injected: Mutex<HashMap<Operation, VecDeque<ProviderFailure>>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.create_bucket(bucket);
        self
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.write().entry(bucket.to_string()).or_default();
    }

    /// Seed an object with an explicit timestamp. Creates the bucket if needed.
    pub fn insert_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: impl Into<Bytes>,
        last_modified: DateTime<Utc>,
    ) {
        self.write().entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                body: body.into(),
                content_type: content_type.to_string(),
                last_modified,
            },
        );
    }

    /// Body and content type of a stored object.
    pub fn object(&self, bucket: &str, key: &str) -> Option<(Bytes, String)> {
        self.read()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|obj| (obj.body.clone(), obj.content_type.clone()))
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.read()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make the next call of `operation` fail with the given provider code.
    pub fn fail_next(&self, operation: Operation, code: &str) {
        let failure =
            ProviderFailure::coded(code, format!("Injected {} failure for {}", code, operation));
        self.injected_failures()
            .entry(operation)
            .or_default()
            .push_back(failure);
    }

    /// Number of operations that reached the store.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self, operation: Operation) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self
            .injected_failures()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Buckets> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Buckets> {
        self.buckets.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected_failures(&self) -> MutexGuard<'_, HashMap<Operation, VecDeque<ProviderFailure>>> {
        self.injected.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn no_such_bucket(bucket: &str) -> ProviderFailure {
    ProviderFailure::coded(
        codes::NO_SUCH_BUCKET,
        format!("The specified bucket does not exist: {}", bucket),
    )
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> ProviderResult<Option<String>> {
        self.begin(Operation::Upload)?;

        let mut buckets = self.write();
        let objects = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        let etag = format!("\"{:x}-{}\"", body.len(), objects.len());
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );

        Ok(Some(etag))
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> ProviderResult<ListResult> {
        self.begin(Operation::List)?;

        let buckets = self.read();
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        let entries = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectEntry {
                key: key.clone(),
                last_modified: Some(obj.last_modified),
                size: obj.body.len() as u64,
            })
            .collect();

        Ok(ListResult {
            entries,
            is_truncated: false,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> ProviderResult<()> {
        self.begin(Operation::Delete)?;

        let mut buckets = self.write();
        let objects = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        objects.remove(key);
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> ProviderResult<String> {
        self.begin(Operation::SignUrl)?;

        Ok(format!(
            "memory://{}/{}?X-Amz-Expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

/// Connector handing out a shared [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
    rejections: Mutex<VecDeque<String>>,
    connects: AtomicUsize,
    /// Create the configured bucket on connect
    create_buckets: bool,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            rejections: Mutex::new(VecDeque::new()),
            connects: AtomicUsize::new(0),
            create_buckets: false,
        }
    }

    /// Connector for local runs: any configured bucket exists after connect.
    pub fn creating_buckets(store: Arc<MemoryStore>) -> Self {
        Self {
            create_buckets: true,
            ..Self::new(store)
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Make the next client construction fail with `message`.
    pub fn reject_next(&self, message: impl Into<String>) {
        self.rejections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(message.into());
    }

    /// Number of client constructions attempted.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl StoreConnector for MemoryConnector {
    fn connect(&self, config: &StorageConfig) -> ProviderResult<StoreHandle> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let rejection = self
            .rejections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        if let Some(message) = rejection {
            return Err(ProviderFailure::new(None, message));
        }
        if self.create_buckets {
            self.store.create_bucket(&config.bucket);
        }
        Ok(Arc::clone(&self.store) as StoreHandle)
    }
}

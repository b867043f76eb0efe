//! In-memory storage doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::models::Document;
use crate::storage::{ArtifactRef, ArtifactStore, KvError, KvStore, StorageError};

#[derive(Default)]
pub struct MemoryArtifactStore {
    blobs: Mutex<HashMap<ArtifactRef, Bytes>>,
    uploads: AtomicUsize,
    reads: AtomicUsize,
    /// Uploads beyond this count are rejected.
    upload_limit: Option<usize>,
}

impl MemoryArtifactStore {
    pub fn failing_after(uploads: usize) -> Self {
        Self {
            upload_limit: Some(uploads),
            ..Self::default()
        }
    }

    /// Full-content reads served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn remove(&self, artifact: &ArtifactRef) {
        self.blobs.lock().unwrap().remove(artifact);
    }

    pub fn insert(&self, artifact: ArtifactRef, bytes: impl Into<Bytes>) {
        self.blobs.lock().unwrap().insert(artifact, bytes.into());
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(&self, file: &Document) -> Result<ArtifactRef, StorageError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.upload_limit.is_some_and(|limit| n >= limit) {
            return Err(StorageError::S3("bucket unavailable".to_string()));
        }
        let artifact = ArtifactRef::new(format!("mem/{n}/{}", file.file_name));
        self.blobs
            .lock()
            .unwrap()
            .insert(artifact.clone(), file.bytes.clone());
        Ok(artifact)
    }

    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .lock()
            .unwrap()
            .get(artifact)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(artifact.clone()))
    }

    async fn exists(&self, artifact: &ArtifactRef) -> Result<bool, StorageError> {
        Ok(self.blobs.lock().unwrap().contains_key(artifact))
    }
}

#[derive(Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<String, String>>,
    /// Every write in issue order.
    writes: Mutex<Vec<(String, String)>>,
    reject_writes_after: Option<usize>,
}

impl MemoryKvStore {
    pub fn rejecting_after(writes: usize) -> Self {
        Self {
            reject_writes_after: Some(writes),
            ..Self::default()
        }
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut writes = self.writes.lock().unwrap();
        if self.reject_writes_after.is_some_and(|limit| writes.len() >= limit) {
            return Err(KvError::Rejected(key.to_string()));
        }
        writes.push((key.to_string(), value.to_string()));
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

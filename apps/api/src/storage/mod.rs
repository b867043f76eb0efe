//! Storage collaborators: blob storage for uploaded and derived artifacts,
//! and the key-value store holding serialized analysis records.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Document;

pub mod kv;
#[cfg(test)]
pub mod memory;
pub mod s3;

pub use kv::RedisKvStore;
pub use s3::S3ArtifactStore;

/// Opaque handle to previously stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),

    #[error("Artifact not found: {0}")]
    NotFound(ArtifactRef),
}

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt record under {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Key-value store rejected write: {0}")]
    Rejected(String),
}

/// Blob storage. Uploads are all-or-nothing.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, file: &Document) -> Result<ArtifactRef, StorageError>;
    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, StorageError>;
    /// Metadata-only check; `Ok(false)` when nothing is stored under the ref.
    async fn exists(&self, artifact: &ArtifactRef) -> Result<bool, StorageError>;
}

/// Text key-value store with last-write-wins semantics per key.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
}

/// Builds a collision-free object key that keeps a readable file name.
pub fn object_key(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        safe
    };
    format!("uploads/{}/{}", uuid::Uuid::new_v4(), safe)
}

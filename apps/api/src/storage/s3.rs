use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use crate::models::Document;
use crate::storage::{object_key, ArtifactRef, ArtifactStore, StorageError};

/// Artifact storage backed by an S3-compatible bucket (MinIO locally).
#[derive(Clone)]
pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(&self, file: &Document) -> Result<ArtifactRef, StorageError> {
        let key = object_key(&file.file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.clone()))
            .content_type(&file.content_type)
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("upload of {key} failed: {e}")))?;

        info!(
            "Uploaded {} bytes to s3://{}/{}",
            file.bytes.len(),
            self.bucket,
            key
        );
        Ok(ArtifactRef::new(key))
    }

    async fn read(&self, artifact: &ArtifactRef) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(artifact.as_str())
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_no_such_key() {
                    StorageError::NotFound(artifact.clone())
                } else {
                    StorageError::S3(format!("read of {artifact} failed: {err}"))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(format!("read of {artifact} failed: {e}")))?;

        let bytes = data.into_bytes();
        debug!("Read {} bytes from s3://{}/{}", bytes.len(), self.bucket, artifact);
        Ok(bytes)
    }

    async fn exists(&self, artifact: &ArtifactRef) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(artifact.as_str())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = e.into_service_error();
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::S3(format!("head of {artifact} failed: {err}")))
                }
            }
        }
    }
}

//! Document storage for uploaded resumes (S3 / MinIO).

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;

/// Raw document storage keyed by file reference.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn put(&self, file_ref: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError>;

    async fn get(&self, file_ref: &str) -> Result<Bytes, AppError>;
}

/// S3-backed store. Every call is bounded by `timeout`.
pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    timeout: Duration,
}

impl S3DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, timeout: Duration) -> Self {
        Self {
            client,
            bucket,
            timeout,
        }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn put(&self, file_ref: &str, bytes: Bytes, content_type: &str) -> Result<(), AppError> {
        let upload = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(file_ref)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send();

        tokio::time::timeout(self.timeout, upload)
            .await
            .map_err(|_| AppError::StorageUnavailable(format!("upload of {file_ref} timed out")))?
            .map_err(|e| AppError::StorageUnavailable(format!("S3 upload failed: {e}")))?;

        info!("Uploaded resume to s3://{}/{}", self.bucket, file_ref);
        Ok(())
    }

    async fn get(&self, file_ref: &str) -> Result<Bytes, AppError> {
        let fetch = async {
            let object = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(file_ref)
                .send()
                .await
                .map_err(|e| AppError::StorageUnavailable(format!("S3 download failed: {e}")))?;
            let body = object
                .body
                .collect()
                .await
                .map_err(|e| AppError::StorageUnavailable(format!("S3 body read failed: {e}")))?;
            Ok::<_, AppError>(body.into_bytes())
        };

        tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| AppError::StorageUnavailable(format!("download of {file_ref} timed out")))?
    }
}

/// Builds the storage key for a new upload.
pub fn resume_file_ref(candidate_id: i64, job_role_id: i64, extension: &str) -> String {
    format!(
        "resumes/{candidate_id}/{job_role_id}/{}.{extension}",
        uuid::Uuid::new_v4()
    )
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryDocumentStore {
    objects: tokio::sync::Mutex<std::collections::HashMap<String, Bytes>>,
}

#[cfg(test)]
#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, file_ref: &str, bytes: Bytes, _content_type: &str) -> Result<(), AppError> {
        self.objects.lock().await.insert(file_ref.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, file_ref: &str) -> Result<Bytes, AppError> {
        self.objects
            .lock()
            .await
            .get(file_ref)
            .cloned()
            .ok_or_else(|| AppError::StorageUnavailable(format!("no object at {file_ref}")))
    }
}

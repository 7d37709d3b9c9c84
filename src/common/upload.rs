use aws_sdk_s3::types::CompletedPart;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::infrastructure::storage::s3::StorageService;
use crate::infrastructure::storage::{PutAck, StorageError};

// Minimum part size for S3 is 5MB. We use 6MB to be safe.
pub const MIN_PART_SIZE: usize = 6 * 1024 * 1024;

/// Buffers a local file stream into S3 parts. At most one part is held in
/// memory at a time.
///
/// An upload that is neither finished nor aborted when the uploader is
/// dropped (the job deadline cancelled it mid-flight) is aborted in the
/// background, so the store does not keep orphaned parts.
pub struct MultipartUploader<'a> {
    storage: &'a StorageService,
    bucket: String,
    key: String,
    upload_id: String,
    parts: Vec<CompletedPart>,
    part_number: i32,
    buffer: Vec<u8>,
    open: bool,
}

impl<'a> MultipartUploader<'a> {
    pub async fn new(
        storage: &'a StorageService,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Self, StorageError> {
        let upload_id = storage
            .create_multipart_upload(bucket, key, content_type)
            .await?;

        Ok(Self {
            storage,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            parts: Vec::new(),
            part_number: 1,
            buffer: Vec::with_capacity(MIN_PART_SIZE),
            open: true,
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), StorageError> {
        self.buffer.extend_from_slice(&chunk);

        if self.buffer.len() >= MIN_PART_SIZE {
            self.flush_part().await?;
        }

        Ok(())
    }

    async fn flush_part(&mut self) -> Result<(), StorageError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let body = Bytes::from(std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(MIN_PART_SIZE),
        ));

        debug!("Uploading part {} ({} bytes)", self.part_number, body.len());

        let part = self
            .storage
            .upload_part(&self.bucket, &self.key, &self.upload_id, self.part_number, body)
            .await?;

        self.parts.push(part);
        self.part_number += 1;

        Ok(())
    }

    /// Sends the remaining buffer and completes the upload. The returned ack
    /// comes from the store's completion response.
    pub async fn finish(mut self) -> Result<PutAck, StorageError> {
        if let Err(e) = self.flush_part().await {
            self.abort().await;
            return Err(e);
        }

        let parts = std::mem::take(&mut self.parts);
        let result = self
            .storage
            .complete_multipart_upload(&self.bucket, &self.key, &self.upload_id, parts)
            .await;

        match result {
            Ok(_) => self.open = false,
            Err(_) => self.abort().await,
        }
        result
    }

    /// Best effort: a failed abort is logged, the original error is what the
    /// caller reports.
    pub async fn abort(&mut self) {
        self.open = false;
        if let Err(e) = self
            .storage
            .abort_multipart_upload(&self.bucket, &self.key, &self.upload_id)
            .await
        {
            warn!("Failed to abort multipart upload {}: {}", self.upload_id, e);
        }
    }
}

impl Drop for MultipartUploader<'_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                "Multipart upload {} left open: no runtime to abort it",
                self.upload_id
            );
            return;
        };

        warn!("Aborting abandoned multipart upload {}", self.upload_id);
        let storage = self.storage.clone();
        let bucket = std::mem::take(&mut self.bucket);
        let key = std::mem::take(&mut self.key);
        let upload_id = std::mem::take(&mut self.upload_id);
        handle.spawn(async move {
            if let Err(e) = storage
                .abort_multipart_upload(&bucket, &key, &upload_id)
                .await
            {
                warn!("Failed to abort multipart upload {}: {}", upload_id, e);
            }
        });
    }
}

use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::infrastructure::storage::{ObjectStore, PutAck, StorageError};

use super::model::{LocalArtifact, SourceKind};

const FALLBACK_NAME: &str = "source";

/// Local file name for an object key: its last path segment, so nothing is
/// ever written into nested directories.
pub fn local_name(key: &str) -> &str {
    let name = key.rsplit(['/', '\\']).next().unwrap_or_default();
    match name {
        "" | "." | ".." => FALLBACK_NAME,
        other => other,
    }
}

/// Moves job files between the object store and the local workspace.
pub struct ObjectTransfer<'a> {
    store: &'a dyn ObjectStore,
    max_object_bytes: u64,
}

impl<'a> ObjectTransfer<'a> {
    pub fn new(store: &'a dyn ObjectStore, max_object_bytes: u64) -> Self {
        Self {
            store,
            max_object_bytes,
        }
    }

    /// Streams `bucket/key` into `local_dir`. The file is flushed and synced
    /// before this returns.
    pub async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_dir: &Path,
    ) -> Result<LocalArtifact, StorageError> {
        let path = local_dir.join(local_name(key));
        info!("⬇️ Downloading s3://{}/{} to {}", bucket, key, path.display());

        let mut body = self.store.get_object(bucket, key).await?;

        if let Some(size) = body.content_length {
            if size > self.max_object_bytes {
                return Err(StorageError::TooLarge {
                    size,
                    limit: self.max_object_bytes,
                });
            }
        }

        let mut file = tokio::fs::File::create(&path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = body.stream.next().await {
            let chunk = chunk.map_err(|e| StorageError::Stream(e.to_string()))?;
            written += chunk.len() as u64;
            if written > self.max_object_bytes {
                return Err(StorageError::TooLarge {
                    size: written,
                    limit: self.max_object_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }

        if let Some(expected) = body.content_length {
            if written != expected {
                return Err(StorageError::Stream(format!(
                    "expected {} bytes, received {}",
                    expected, written
                )));
            }
        }

        file.flush().await?;
        file.sync_all().await?;

        info!("⬇️ Downloaded {} bytes", written);
        Ok(LocalArtifact::new(path, SourceKind::Downloaded))
    }

    /// Uploads `artifact` to `bucket/key` and waits for the store's ack.
    pub async fn upload(
        &self,
        artifact: &LocalArtifact,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<PutAck, StorageError> {
        info!(
            "⬆️ Uploading {} to s3://{}/{} ({})",
            artifact.path().display(),
            bucket,
            key,
            content_type
        );

        let ack = self
            .store
            .put_object(bucket, key, artifact.path(), content_type)
            .await?;

        debug!("Upload acknowledged: {:?}", ack);
        Ok(ack)
    }
}

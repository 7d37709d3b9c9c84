use std::io;
use std::path::Path;

use bytes::Bytes;
use futures_util::stream::BoxStream;

pub mod s3;

pub type ObjectStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// Body of a fetched object.
pub struct ObjectBody {
    pub content_length: Option<u64>,
    pub stream: ObjectStream,
}

/// Acknowledgement returned by the store once a write is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutAck {
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
}

/// Remote object storage as seen by the job pipeline.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Starts fetching an object. The body is consumed as a stream.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, StorageError>;

    /// Writes the file at `path` to `bucket/key`, overwriting any existing
    /// object. Resolves only once the store has acknowledged the write.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<PutAck, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("object is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("stream interrupted: {0}")]
    Stream(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

use std::time::Duration;

use crate::infrastructure::convert::ConversionError;
use crate::infrastructure::storage::StorageError;

use super::model::{ErrorKind, JobStage};

/// Terminal failure of a job. Every variant keeps its underlying cause.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("invalid job request, missing or empty: {}", .fields.join(", "))]
    InvalidRequest { fields: Vec<String> },

    #[error("{file} cannot be converted to {target}")]
    UnsupportedFormat { file: String, target: String },

    #[error("failed to download s3://{bucket}/{key}: {source}")]
    Download {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("job exceeded its {}s deadline after reaching stage '{stage}'", .limit.as_secs_f64())]
    Timeout { limit: Duration, stage: JobStage },

    /// The per-job workspace could not be created; reported as a download
    /// failure since nothing can be fetched without it.
    #[error("failed to prepare job workspace: {0}")]
    Workspace(#[source] std::io::Error),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            JobError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            JobError::Download { .. } | JobError::Workspace(_) => ErrorKind::DownloadError,
            JobError::Conversion(_) => ErrorKind::ConversionError,
            JobError::Upload { .. } => ErrorKind::UploadError,
            JobError::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

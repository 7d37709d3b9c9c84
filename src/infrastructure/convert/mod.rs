use std::path::{Path, PathBuf};

use crate::modules::job::model::TargetFormat;

pub mod libreoffice;

/// Document conversion backend. Implementations write their output into
/// `out_dir` and return its path.
#[async_trait::async_trait]
pub trait ConversionEngine: Send + Sync {
    async fn convert(
        &self,
        input: &Path,
        target: TargetFormat,
        out_dir: &Path,
    ) -> Result<PathBuf, ConversionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("failed to start converter: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("converter produced no output at {0}")]
    MissingOutput(PathBuf),
    #[error("{0}")]
    Engine(String),
}

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output format produced by a job. One format per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Pdf,
    Odt,
    Docx,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Odt => "odt",
            TargetFormat::Docx => "docx",
        }
    }

    /// Content type used when no better guess is available for the produced file.
    pub fn content_type(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "application/pdf",
            TargetFormat::Odt => "application/vnd.oasis.opendocument.text",
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(TargetFormat::Pdf),
            "odt" => Ok(TargetFormat::Odt),
            "docx" => Ok(TargetFormat::Docx),
            other => Err(format!("unsupported target format '{}'", other)),
        }
    }
}

/// A validated conversion job. Built once per invocation and passed by
/// reference through every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRequest {
    source_bucket: String,
    source_key: String,
    dest_bucket: String,
    dest_key: String,
}

impl JobRequest {
    /// Only the validator constructs requests, so every instance satisfies
    /// the non-empty invariant.
    pub(super) fn new(
        source_bucket: String,
        source_key: String,
        dest_bucket: String,
        dest_key: String,
    ) -> Self {
        Self {
            source_bucket,
            source_key,
            dest_bucket,
            dest_key,
        }
    }

    pub fn source_bucket(&self) -> &str {
        &self.source_bucket
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn dest_bucket(&self) -> &str {
        &self.dest_bucket
    }

    pub fn dest_key(&self) -> &str {
        &self.dest_key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Downloaded,
    Converted,
}

/// A file inside the job workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub origin: SourceKind,
}

impl LocalArtifact {
    pub fn new(path: impl Into<PathBuf>, origin: SourceKind) -> Self {
        Self {
            path: path.into(),
            origin,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Pipeline progress, logged on each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Start,
    Validated,
    Downloaded,
    CapabilityChecked,
    Converted,
    Uploaded,
    Done,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Start => "start",
            JobStage::Validated => "validated",
            JobStage::Downloaded => "downloaded",
            JobStage::CapabilityChecked => "capability_checked",
            JobStage::Converted => "converted",
            JobStage::Uploaded => "uploaded",
            JobStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Successful terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReceipt {
    pub bucket: String,
    pub key: String,
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
}

/// Stable failure category. The invoker decides about retries from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidRequest,
    UnsupportedFormat,
    DownloadError,
    ConversionError,
    UploadError,
    Timeout,
    /// The worker itself could not start (bad environment). No job ran.
    ConfigurationError,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorKind::DownloadError => "DOWNLOAD_ERROR",
            ErrorKind::ConversionError => "CONVERSION_ERROR",
            ErrorKind::UploadError => "UPLOAD_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// Transfer failures and deadline breaches may succeed on a second
    /// invocation; bad requests and bad inputs never will.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::DownloadError | ErrorKind::UploadError | ErrorKind::Timeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_format_parses_case_insensitively() {
        assert_eq!("PDF".parse::<TargetFormat>().unwrap(), TargetFormat::Pdf);
        assert_eq!(".docx".parse::<TargetFormat>().unwrap(), TargetFormat::Docx);
        assert!("png".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn retryable_kinds() {
        assert!(ErrorKind::DownloadError.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(!ErrorKind::UnsupportedFormat.is_retryable());
        assert!(!ErrorKind::InvalidRequest.is_retryable());
        assert!(!ErrorKind::ConversionError.is_retryable());
        assert!(!ErrorKind::ConfigurationError.is_retryable());
    }
}

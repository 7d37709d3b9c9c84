use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use crate::config::env::{self, EnvKey};
use crate::modules::job::model::TargetFormat;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TIMEOUT_SECS: u64 = 45;
const DEFAULT_MAX_OBJECT_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub aws_region: String,
    /// Custom S3 endpoint (MinIO, LocalStack). `None` means AWS proper.
    pub s3_endpoint: Option<Url>,
    pub aws_access_key: String,
    pub aws_secret_key: String,
    pub aws_session_token: Option<String>,
    /// Base directory under which every job gets its own workspace.
    pub tmp_dir: PathBuf,
    pub job_timeout: Duration,
    pub target_format: TargetFormat,
    pub soffice_path: String,
    pub max_object_bytes: u64,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let s3_endpoint = env::get_opt(EnvKey::S3Endpoint)
            .map(|raw| {
                Url::parse(&raw).with_context(|| format!("Invalid S3_ENDPOINT: {}", raw))
            })
            .transpose()?;

        let tmp_dir = env::get_opt(EnvKey::JobTmpDir)
            .or_else(|| env::get_opt(EnvKey::Home))
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        let tmp_dir = std::path::absolute(&tmp_dir)
            .with_context(|| format!("Invalid job directory: {}", tmp_dir.display()))?;

        let timeout_secs: u64 = env::get_parsed(EnvKey::JobTimeoutSecs, DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            anyhow::bail!("JOB_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            aws_region: env::get_or(EnvKey::AwsRegion, DEFAULT_REGION),
            s3_endpoint,
            aws_access_key: env::get(EnvKey::AwsAccessKey)
                .context("AWS_ACCESS_KEY_ID is not set")?,
            aws_secret_key: env::get(EnvKey::AwsSecretKey)
                .context("AWS_SECRET_ACCESS_KEY is not set")?,
            aws_session_token: env::get_opt(EnvKey::AwsSessionToken),
            tmp_dir,
            job_timeout: Duration::from_secs(timeout_secs),
            target_format: env::get_parsed(EnvKey::TargetFormat, TargetFormat::Pdf)?,
            soffice_path: env::get_or(EnvKey::SofficePath, "soffice"),
            max_object_bytes: env::get_parsed(EnvKey::MaxObjectBytes, DEFAULT_MAX_OBJECT_BYTES)?,
        })
    }
}

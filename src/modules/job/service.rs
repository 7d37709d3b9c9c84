use std::path::Path;
use std::sync::Mutex;

use serde_json::Value;
use tempfile::TempDir;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::capability::can_convert;
use super::dto::validate;
use super::error::JobError;
use super::model::{JobReceipt, JobRequest, JobStage, LocalArtifact, SourceKind, TargetFormat};
use super::transfer::ObjectTransfer;
use crate::state::AppState;

/// Last stage a job reached. Read after a timeout to report where it stalled.
struct Progress(Mutex<JobStage>);

impl Progress {
    fn new() -> Self {
        Self(Mutex::new(JobStage::Start))
    }

    fn advance(&self, stage: JobStage) {
        info!("→ {}", stage);
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = stage;
    }

    fn current(&self) -> JobStage {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn content_type_for(path: &Path, target: TargetFormat) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| target.content_type().to_string())
}

fn create_workspace(base: &Path, job_id: Uuid) -> Result<TempDir, std::io::Error> {
    std::fs::create_dir_all(base)?;
    let workspace = tempfile::Builder::new()
        .prefix(&format!("job-{}-", job_id))
        .tempdir_in(base)?;
    std::fs::create_dir(workspace.path().join("in"))?;
    std::fs::create_dir(workspace.path().join("out"))?;
    Ok(workspace)
}

pub struct JobService;

impl JobService {
    /// Runs one job to its terminal outcome under the configured deadline.
    pub async fn run(state: &AppState, raw: &Value) -> Result<JobReceipt, JobError> {
        let job_id = Uuid::new_v4();
        let span = info_span!("job", id = %job_id);
        let limit = state.config.job_timeout;
        let progress = Progress::new();

        let stages = Self::run_stages(state, raw, job_id, &progress);
        let result = match tokio::time::timeout(limit, stages).instrument(span.clone()).await {
            Ok(result) => result,
            // The stage future is dropped here, which removes the workspace
            // and kills any running converter.
            Err(_) => Err(JobError::Timeout {
                limit,
                stage: progress.current(),
            }),
        };

        let _enter = span.enter();
        match &result {
            Ok(receipt) => info!("✅ Job completed: s3://{}/{}", receipt.bucket, receipt.key),
            Err(e) => error!("❌ Job failed [{}]: {}", e.kind(), e),
        }

        result
    }

    async fn run_stages(
        state: &AppState,
        raw: &Value,
        job_id: Uuid,
        progress: &Progress,
    ) -> Result<JobReceipt, JobError> {
        let request = validate(raw)?;
        info!(
            "Job s3://{}/{} -> s3://{}/{}",
            request.source_bucket(),
            request.source_key(),
            request.dest_bucket(),
            request.dest_key()
        );
        progress.advance(JobStage::Validated);

        let workspace =
            create_workspace(&state.config.tmp_dir, job_id).map_err(JobError::Workspace)?;
        let receipt = Self::process(state, &request, workspace.path(), progress).await?;

        if let Err(e) = workspace.close() {
            warn!("Failed to remove job workspace: {}", e);
        }

        progress.advance(JobStage::Done);
        Ok(receipt)
    }

    async fn process(
        state: &AppState,
        request: &JobRequest,
        workspace: &Path,
        progress: &Progress,
    ) -> Result<JobReceipt, JobError> {
        let target = state.config.target_format;
        let transfer = ObjectTransfer::new(state.storage.as_ref(), state.config.max_object_bytes);

        let source = transfer
            .download(
                request.source_bucket(),
                request.source_key(),
                &workspace.join("in"),
            )
            .await
            .map_err(|source| JobError::Download {
                bucket: request.source_bucket().to_string(),
                key: request.source_key().to_string(),
                source,
            })?;
        progress.advance(JobStage::Downloaded);

        if !can_convert(source.file_name(), target) {
            return Err(JobError::UnsupportedFormat {
                file: source.file_name().to_string(),
                target: target.to_string(),
            });
        }
        progress.advance(JobStage::CapabilityChecked);

        let produced = state
            .engine
            .convert(source.path(), target, &workspace.join("out"))
            .await?;
        let converted = LocalArtifact::new(produced, SourceKind::Converted);
        progress.advance(JobStage::Converted);

        let content_type = content_type_for(converted.path(), target);
        let ack = transfer
            .upload(
                &converted,
                request.dest_bucket(),
                request.dest_key(),
                &content_type,
            )
            .await
            .map_err(|source| JobError::Upload {
                bucket: request.dest_bucket().to_string(),
                key: request.dest_key().to_string(),
                source,
            })?;
        progress.advance(JobStage::Uploaded);

        Ok(JobReceipt {
            bucket: request.dest_bucket().to_string(),
            key: request.dest_key().to_string(),
            e_tag: ack.e_tag,
            version_id: ack.version_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_the_produced_file() {
        assert_eq!(
            content_type_for(Path::new("/w/out/report.pdf"), TargetFormat::Pdf),
            "application/pdf"
        );
        assert_eq!(
            content_type_for(Path::new("/w/out/report"), TargetFormat::Odt),
            "application/vnd.oasis.opendocument.text"
        );
    }

    #[test]
    fn workspaces_are_unique_per_job() {
        let base = tempfile::tempdir().unwrap();
        let first = create_workspace(base.path(), Uuid::new_v4()).unwrap();
        let second = create_workspace(base.path(), Uuid::new_v4()).unwrap();

        assert_ne!(first.path(), second.path());
        assert!(first.path().join("in").is_dir());
        assert!(first.path().join("out").is_dir());

        let path = first.path().to_path_buf();
        drop(first);
        assert!(!path.exists());
    }
}

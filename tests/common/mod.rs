#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream;

use doc_convert_worker::config::settings::AppConfig;
use doc_convert_worker::infrastructure::convert::{ConversionEngine, ConversionError};
use doc_convert_worker::infrastructure::storage::{
    ObjectBody, ObjectStore, PutAck, StorageError,
};
use doc_convert_worker::modules::job::model::TargetFormat;
use doc_convert_worker::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum GetBehavior {
    #[default]
    Normal,
    /// Sends the first chunk, then fails.
    InterruptMidStream,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum PutBehavior {
    #[default]
    Normal,
    /// Never acknowledges the write.
    Hang,
    Reject,
}

/// In-memory object store keyed by `(bucket, key)`.
#[derive(Default)]
pub struct InMemoryStore {
    pub objects: Mutex<HashMap<(String, String), StoredObject>>,
    pub get_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub get_behavior: GetBehavior,
    pub put_behavior: PutBehavior,
}

impl InMemoryStore {
    pub fn with_object(self, bucket: &str, key: &str, body: &[u8]) -> Self {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                content_type: "application/octet-stream".to_string(),
            },
        );
        self
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn snapshot(&self) -> HashMap<(String, String), StoredObject> {
        self.objects.lock().unwrap().clone()
    }

    pub fn puts(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, StorageError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let object = self
            .object(bucket, key)
            .ok_or_else(|| StorageError::NotFound(format!("s3://{}/{}", bucket, key)))?;

        let len = object.body.len();
        let chunks: Vec<Result<Bytes, io::Error>> = match self.get_behavior {
            GetBehavior::Normal => object
                .body
                .chunks(4)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect(),
            GetBehavior::InterruptMidStream => vec![
                Ok(Bytes::copy_from_slice(&object.body[..len.min(4)])),
                Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )),
            ],
        };

        Ok(ObjectBody {
            content_length: Some(len as u64),
            stream: stream::iter(chunks).boxed(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<PutAck, StorageError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        match self.put_behavior {
            PutBehavior::Hang => std::future::pending::<()>().await,
            PutBehavior::Reject => {
                return Err(StorageError::AccessDenied(format!("s3://{}/{}", bucket, key)));
            }
            PutBehavior::Normal => {}
        }

        let body = tokio::fs::read(path).await?;
        let e_tag = format!("\"{:x}\"", body.iter().map(|b| *b as u64).sum::<u64>());
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );

        Ok(PutAck {
            e_tag: Some(e_tag),
            version_id: None,
        })
    }
}

/// Conversion engine that prefixes the input with a marker, fails, or never
/// finishes.
#[derive(Default)]
pub struct StubEngine {
    pub calls: AtomicUsize,
    pub fail_with: Option<String>,
    pub hang: bool,
    pub seen_inputs: Mutex<Vec<PathBuf>>,
}

impl StubEngine {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConversionEngine for StubEngine {
    async fn convert(
        &self,
        input: &Path,
        target: TargetFormat,
        out_dir: &Path,
    ) -> Result<PathBuf, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_inputs.lock().unwrap().push(input.to_path_buf());

        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(message) = &self.fail_with {
            return Err(ConversionError::Engine(message.clone()));
        }

        let source = tokio::fs::read(input).await.map_err(ConversionError::Spawn)?;
        let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
        let output = out_dir.join(format!("{}.{}", stem, target.extension()));

        let mut converted = format!("CONVERTED:{}:", target).into_bytes();
        converted.extend_from_slice(&source);
        tokio::fs::write(&output, converted)
            .await
            .map_err(ConversionError::Spawn)?;

        Ok(output)
    }
}

pub fn test_config(tmp_dir: &Path) -> AppConfig {
    AppConfig {
        aws_region: "us-east-1".to_string(),
        s3_endpoint: None,
        aws_access_key: "test".to_string(),
        aws_secret_key: "test".to_string(),
        aws_session_token: None,
        tmp_dir: tmp_dir.to_path_buf(),
        job_timeout: Duration::from_secs(10),
        target_format: TargetFormat::Pdf,
        soffice_path: "soffice".to_string(),
        max_object_bytes: 1024 * 1024,
    }
}

pub fn test_state(
    config: AppConfig,
    store: Arc<InMemoryStore>,
    engine: Arc<dyn ConversionEngine>,
) -> AppState {
    AppState::new(config, store, engine)
}

/// Entries left in the job base directory.
pub fn leftover_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Whether `pid` is still running. A zombie has exited and only waits to be
/// reaped, so it counts as gone.
#[cfg(target_os = "linux")]
pub fn process_alive(pid: &str) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) => false,
    }
}

/// Polls for up to three seconds for `pid` to disappear.
#[cfg(target_os = "linux")]
pub async fn wait_for_exit(pid: &str) -> bool {
    for _ in 0..30 {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    !process_alive(pid)
}

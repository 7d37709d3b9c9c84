use std::path::Path;

use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use futures_util::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::{ObjectBody, ObjectStore, PutAck, StorageError};
use crate::common::upload::{MIN_PART_SIZE, MultipartUploader};
use crate::config::settings::AppConfig;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
}

impl StorageService {
    pub fn new(config: &AppConfig) -> Self {
        let credentials = Credentials::new(
            &config.aws_access_key,
            &config.aws_secret_key,
            config.aws_session_token.clone(),
            None,
            "environment",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.s3_endpoint {
            builder = builder
                .endpoint_url(endpoint.as_str())
                .force_path_style(true); // Required for MinIO
        }

        let client = Client::from_conf(builder.build());

        match &config.s3_endpoint {
            Some(endpoint) => info!("✅ S3 client ready (endpoint {})", endpoint),
            None => info!("✅ S3 client ready (region {})", config.aws_region),
        }

        Self { client }
    }

    pub async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;

        result
            .upload_id
            .ok_or_else(|| StorageError::Request("store returned no upload id".to_string()))
    }

    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: bytes::Bytes,
    ) -> Result<CompletedPart, StorageError> {
        let result = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;

        let e_tag = result.e_tag.ok_or_else(|| {
            StorageError::Request(format!("store returned no ETag for part {}", part_number))
        })?;

        Ok(CompletedPart::builder()
            .e_tag(e_tag)
            .part_number(part_number)
            .build())
    }

    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<PutAck, StorageError> {
        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        let result = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;

        Ok(PutAck {
            e_tag: result.e_tag,
            version_id: result.version_id,
        })
    }

    pub async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;

        Ok(())
    }

    async fn put_single(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<PutAck, StorageError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;

        let result = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;

        Ok(PutAck {
            e_tag: result.e_tag,
            version_id: result.version_id,
        })
    }

    async fn put_multipart(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<PutAck, StorageError> {
        let file = tokio::fs::File::open(path).await?;
        let mut chunks = ReaderStream::with_capacity(file, 64 * 1024);

        let mut uploader = MultipartUploader::new(self, bucket, key, content_type).await?;

        while let Some(chunk) = chunks.next().await {
            let written = match chunk {
                Ok(c) => uploader.write_chunk(c).await,
                Err(e) => Err(StorageError::Io(e)),
            };

            if let Err(e) = written {
                uploader.abort().await;
                return Err(e);
            }
        }

        uploader.finish().await
    }
}

#[async_trait::async_trait]
impl ObjectStore for StorageService {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key))?;

        let content_length = resp.content_length().and_then(|l| u64::try_from(l).ok());
        let stream = ReaderStream::new(resp.body.into_async_read()).boxed();

        Ok(ObjectBody {
            content_length,
            stream,
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<PutAck, StorageError> {
        let size = tokio::fs::metadata(path).await?.len();

        if size as usize > MIN_PART_SIZE {
            debug!("Uploading {} bytes to s3://{}/{} as multipart", size, bucket, key);
            self.put_multipart(bucket, key, path, content_type).await
        } else {
            self.put_single(bucket, key, path, content_type).await
        }
    }
}

fn classify<E, R>(err: SdkError<E, R>, bucket: &str, key: &str) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let target = format!("s3://{}/{}", bucket, key);
    let code = err.code().map(str::to_string);
    let detail = DisplayErrorContext(&err).to_string();

    match code.as_deref() {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => StorageError::NotFound(target),
        Some("AccessDenied" | "Forbidden" | "InvalidAccessKeyId" | "SignatureDoesNotMatch") => {
            StorageError::AccessDenied(format!("{}: {}", target, detail))
        }
        _ => StorageError::Request(format!("{}: {}", target, detail)),
    }
}

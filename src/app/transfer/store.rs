//! Object storage seam and its S3 implementation

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use tracing::debug;

use crate::app::client::UploadCredentials;
use crate::constants::transfer::{DEFAULT_REGION, S3_SCHEME};
use crate::errors::{StoreError, StoreResult, TransferError, TransferResult};

/// Bucket and key of a remote object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub bucket: String,
    pub key: String,
}

impl ObjectKey {
    /// Parse `s3://bucket/path/to/object`
    pub fn parse(remote: &str) -> TransferResult<Self> {
        let invalid = || TransferError::InvalidKey {
            key: remote.to_string(),
        };
        let rest = remote
            .strip_prefix(S3_SCHEME)
            .and_then(|rest| rest.strip_prefix("://"))
            .ok_or_else(invalid)?;
        let (bucket, key) = rest.split_once('/').ok_or_else(invalid)?;
        let key = key.trim_start_matches('/');
        if bucket.is_empty() || key.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Last path segment of the key
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", S3_SCHEME, self.bucket, self.key)
    }
}

/// A part stored in a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: String,
    pub size: u64,
}

/// Storage operations the transfer engine relies on
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Succeeds when the object exists
    async fn head_object(&self, key: &ObjectKey) -> StoreResult<()>;

    async fn put_object(&self, key: &ObjectKey, body: Vec<u8>) -> StoreResult<()>;

    /// Start a multipart upload and return its id
    async fn create_multipart_upload(&self, key: &ObjectKey) -> StoreResult<String>;

    /// Parts already stored under an upload id
    async fn list_parts(&self, key: &ObjectKey, upload_id: &str) -> StoreResult<Vec<UploadedPart>>;

    async fn upload_part(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> StoreResult<UploadedPart>;

    async fn complete_multipart_upload(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> StoreResult<()>;
}

/// Builds a store from per-sample credentials
pub trait StorageConnector: Send + Sync {
    fn connect(&self, credentials: &UploadCredentials) -> Arc<dyn ObjectStore>;
}

fn store_error<E>(error: SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = error.raw_response().map(|response| response.status().as_u16());
    let code = error
        .as_service_error()
        .and_then(|service| service.code())
        .map(str::to_string);

    match (status, code.as_deref()) {
        (Some(404), _) | (_, Some("NotFound" | "NoSuchKey" | "NoSuchUpload")) => StoreError::NotFound,
        (Some(403), _) | (_, Some("Forbidden" | "AccessDenied")) => StoreError::AccessDenied,
        (_, Some(code)) => StoreError::Service {
            code: code.to_string(),
            message: error
                .as_service_error()
                .and_then(|service| service.message())
                .unwrap_or_default()
                .to_string(),
        },
        (_, None) => StoreError::Transport(DisplayErrorContext(&error).to_string()),
    }
}

/// S3 client bound to one set of credentials
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(credentials: &UploadCredentials, region: &str) -> Self {
        let credentials = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            credentials.expiration.map(SystemTime::from),
            "czid-upload-credentials",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();
        Self {
            client: Client::from_conf(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head_object(&self, key: &ObjectKey) -> StoreResult<()> {
        self.client
            .head_object()
            .bucket(&key.bucket)
            .key(&key.key)
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn put_object(&self, key: &ObjectKey, body: Vec<u8>) -> StoreResult<()> {
        self.client
            .put_object()
            .bucket(&key.bucket)
            .key(&key.key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn create_multipart_upload(&self, key: &ObjectKey) -> StoreResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&key.bucket)
            .key(&key.key)
            .send()
            .await
            .map_err(store_error)?;
        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| StoreError::Service {
                code: "MissingUploadId".to_string(),
                message: format!("no upload id returned for {}", key),
            })
    }

    async fn list_parts(&self, key: &ObjectKey, upload_id: &str) -> StoreResult<Vec<UploadedPart>> {
        let mut parts = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_parts()
                .bucket(&key.bucket)
                .key(&key.key)
                .upload_id(upload_id);
            if let Some(marker) = marker.take() {
                request = request.part_number_marker(marker);
            }
            let output = request.send().await.map_err(store_error)?;

            for part in output.parts() {
                if let (Some(part_number), Some(e_tag)) = (part.part_number(), part.e_tag()) {
                    parts.push(UploadedPart {
                        part_number,
                        e_tag: e_tag.to_string(),
                        size: part.size().unwrap_or_default().max(0) as u64,
                    });
                }
            }

            match (output.is_truncated(), output.next_part_number_marker()) {
                (Some(true), Some(next)) => marker = Some(next.to_string()),
                _ => break,
            }
        }
        debug!("{} parts already stored for {}", parts.len(), key);
        Ok(parts)
    }

    async fn upload_part(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> StoreResult<UploadedPart> {
        let size = body.len() as u64;
        let output = self
            .client
            .upload_part()
            .bucket(&key.bucket)
            .key(&key.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(store_error)?;
        let e_tag = output.e_tag().ok_or_else(|| StoreError::Service {
            code: "MissingETag".to_string(),
            message: format!("no ETag returned for part {} of {}", part_number, key),
        })?;
        Ok(UploadedPart {
            part_number,
            e_tag: e_tag.to_string(),
            size,
        })
    }

    async fn complete_multipart_upload(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> StoreResult<()> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(
                parts
                    .into_iter()
                    .map(|part| {
                        CompletedPart::builder()
                            .part_number(part.part_number)
                            .e_tag(part.e_tag)
                            .build()
                    })
                    .collect(),
            ))
            .build();
        self.client
            .complete_multipart_upload()
            .bucket(&key.bucket)
            .key(&key.key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(store_error)?;
        Ok(())
    }
}

/// Connects to S3 in a fixed region
#[derive(Debug, Clone)]
pub struct S3Connector {
    region: String,
}

impl S3Connector {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

impl Default for S3Connector {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl StorageConnector for S3Connector {
    fn connect(&self, credentials: &UploadCredentials) -> Arc<dyn ObjectStore> {
        Arc::new(S3Store::new(credentials, &self.region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_key() {
        let key = ObjectKey::parse("s3://czid-samples/samples/12/34/fastqs/a_R1.fastq.gz").unwrap();
        assert_eq!(key.bucket, "czid-samples");
        assert_eq!(key.key, "samples/12/34/fastqs/a_R1.fastq.gz");
        assert_eq!(key.file_name(), "a_R1.fastq.gz");
        assert_eq!(
            key.to_string(),
            "s3://czid-samples/samples/12/34/fastqs/a_R1.fastq.gz"
        );
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(ObjectKey::parse("https://bucket/key").is_err());
        assert!(ObjectKey::parse("s3://bucket").is_err());
        assert!(ObjectKey::parse("s3:///key").is_err());
    }
}

//! S3-compatible object store client (Cloudflare R2, MinIO, AWS S3).
//!
//! # Responsibilities
//! - Upload objects under collision-resistant keys
//! - Download, delete and list objects
//! - Produce presigned and public URLs
//!
//! # Design Decisions
//! - Region is fixed to `auto`; addressing is path-style
//! - SDK retries disabled; connect and attempt timeouts from config
//! - Initialization verifies the bucket with `HeadBucket`

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use serde::Serialize;

use crate::config::ObjectStoreConfig;
use crate::observability::metrics;
use crate::storage::{fail_soft, naming, StorageError};

const STORE: &str = "object_store";

/// Region sentinel understood by R2 and MinIO.
pub const REGION: &str = "auto";

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadedObject {
    pub key: String,
    /// Public URL, when the bucket has one configured.
    pub url: Option<String>,
    pub size: usize,
    pub content_type: String,
}

/// One entry of a listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    /// Seconds since the Unix epoch.
    pub last_modified: Option<i64>,
}

/// Handle to the object store. Unavailable when credentials are missing or
/// the bucket could not be reached at startup.
pub struct ObjectStore {
    config: ObjectStoreConfig,
    client: ArcSwapOption<Client>,
}

impl ObjectStore {
    /// Build the client and verify the bucket. Never fails; on error the
    /// handle is unavailable and a warning is logged.
    pub async fn initialize(config: ObjectStoreConfig) -> Self {
        let store = Self {
            config,
            client: ArcSwapOption::empty(),
        };

        if !store.is_configured() {
            tracing::info!("Object store not configured; uploads disabled");
            return store;
        }

        match store.connect().await {
            Ok(client) => {
                store.client.store(Some(Arc::new(client)));
                tracing::info!(bucket = %store.config.bucket, "Object store connected");
            }
            Err(e) => {
                tracing::warn!(
                    bucket = %store.config.bucket,
                    error = %e,
                    "Object store unavailable; continuing without it"
                );
            }
        }
        store
    }

    /// A handle that never connects.
    pub fn unavailable(config: ObjectStoreConfig) -> Self {
        Self {
            config,
            client: ArcSwapOption::empty(),
        }
    }

    /// Endpoint and both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.config.endpoint_url.is_some()
            && self.config.access_key_id.is_some()
            && self.config.secret_access_key.is_some()
    }

    pub fn is_available(&self) -> bool {
        self.client.load().is_some()
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn connect(&self) -> Result<Client, StorageError> {
        let (Some(endpoint), Some(key_id), Some(secret)) = (
            self.config.endpoint_url.as_ref(),
            self.config.access_key_id.as_ref(),
            self.config.secret_access_key.as_ref(),
        ) else {
            return Err(StorageError::NotConfigured(
                "endpoint_url, access_key_id and secret_access_key are required".to_string(),
            ));
        };

        let credentials = Credentials::new(key_id, secret, None, None, "marketplace-config");
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(self.config.connect_timeout_ms))
            .operation_attempt_timeout(Duration::from_millis(self.config.operation_timeout_ms))
            .build();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(REGION))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .timeout_config(timeouts)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        let client = Client::from_conf(s3_config);

        client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(client)
    }

    fn available(&self, op: &'static str) -> Option<Arc<Client>> {
        let client = self.client.load_full();
        if client.is_none() {
            tracing::debug!(op, "Object store unavailable");
            metrics::record_storage_fallback(STORE, op);
        }
        client
    }

    /// Upload `data`. Without `custom_name` the key is generated from
    /// `original_name` as `folder/{timestamp}_{id}_{name}{ext}`. The folder and
    /// any custom name are sanitized before use.
    pub async fn upload(
        &self,
        data: Bytes,
        original_name: &str,
        folder: &str,
        custom_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Option<UploadedObject> {
        let client = self.available("upload")?;

        let key = naming::object_key(folder, original_name, custom_name);
        let content_type = content_type
            .unwrap_or_else(|| naming::content_type_for(&key))
            .to_string();
        let size = data.len();

        let result = client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(&content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(sdk_error);
        fail_soft(STORE, "upload", result)?;

        tracing::info!(key = %key, size, "Uploaded object");
        Some(UploadedObject {
            url: self.public_url(&key),
            key,
            size,
            content_type,
        })
    }

    pub async fn download(&self, key: &str) -> Option<Bytes> {
        let client = self.available("download")?;
        fail_soft(STORE, "download", fetch_object(&client, &self.config.bucket, key).await)
    }

    pub async fn delete(&self, key: &str) -> bool {
        let Some(client) = self.available("delete") else {
            return false;
        };
        let result = client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error);
        fail_soft(STORE, "delete", result).is_some()
    }

    /// List up to `max_keys` objects under `prefix`.
    pub async fn list(&self, prefix: &str, max_keys: i32) -> Vec<ObjectSummary> {
        let Some(client) = self.available("list") else {
            return Vec::new();
        };
        let result = client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(sdk_error);

        fail_soft(STORE, "list", result)
            .map(|output| {
                output
                    .contents()
                    .iter()
                    .map(|object| ObjectSummary {
                        key: object.key().unwrap_or_default().to_string(),
                        size: object.size().unwrap_or_default(),
                        last_modified: object.last_modified().map(|t| t.secs()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Presigned GET URL valid for `expires` (config default when `None`).
    pub async fn presign(&self, key: &str, expires: Option<Duration>) -> Option<String> {
        let client = self.available("presign")?;
        let expires = expires.unwrap_or(Duration::from_secs(self.config.presign_expiry_secs));
        fail_soft(STORE, "presign", presign_get(&client, &self.config.bucket, key, expires).await)
    }

    /// `{public_url}/{key}` when the bucket has a public base URL.
    pub fn public_url(&self, key: &str) -> Option<String> {
        self.config
            .public_url
            .as_ref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/')))
    }

    /// Check the bucket. An unavailable but configured handle makes one
    /// reconnect attempt. A failing check does not drop an existing client.
    pub async fn health_check(&self) -> bool {
        let Some(client) = self.client.load_full() else {
            if !self.is_configured() {
                return false;
            }
            return match self.connect().await {
                Ok(client) => {
                    self.client.store(Some(Arc::new(client)));
                    tracing::info!("Object store reconnected");
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Object store health check failed");
                    false
                }
            };
        };

        match client.head_bucket().bucket(&self.config.bucket).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %DisplayErrorContext(&e), "Object store health check failed");
                false
            }
        }
    }
}

fn sdk_error<E>(err: E) -> StorageError
where
    E: std::error::Error + 'static,
{
    StorageError::ObjectStore(DisplayErrorContext(&err).to_string())
}

async fn fetch_object(client: &Client, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
    let output = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(sdk_error)?;
    let data = output
        .body
        .collect()
        .await
        .map_err(|e| StorageError::ObjectStore(e.to_string()))?;
    Ok(data.into_bytes())
}

async fn presign_get(
    client: &Client,
    bucket: &str,
    key: &str,
    expires: Duration,
) -> Result<String, StorageError> {
    let presigning =
        PresigningConfig::expires_in(expires).map_err(|e| StorageError::ObjectStore(e.to_string()))?;
    let request = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(presigning)
        .await
        .map_err(sdk_error)?;
    Ok(request.uri().to_string())
}

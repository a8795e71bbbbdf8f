//! Supabase Storage client for product media and payment proofs.
//!
//! Objects are written under `{folder}/{unix_millis}-{12 hex}{ext}` and served
//! from the bucket's public URL.

use std::future::Future;
use std::path::Path;

use axum::body::Bytes;
use rand::Rng;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::StorageConfig;

/// Folder used when a caller passes nothing usable.
const FALLBACK_FOLDER: &str = "uploads";

/// Errors that can occur when talking to object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Which bucket an object belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Product images, videos and 3D models.
    Products,
    /// Customer payment screenshots.
    Payments,
}

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Upload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Path inside the bucket, needed to remove the object again.
    pub path: String,
    pub public_url: String,
}

/// Upload/remove capability used by checkout and the admin panel.
pub trait ObjectStorage: Send + Sync {
    /// Store `upload` under a fresh, unique path in `folder`.
    fn upload(
        &self,
        bucket: Bucket,
        folder: &str,
        upload: &Upload,
    ) -> impl Future<Output = Result<StoredObject, StorageError>> + Send;

    /// Delete an object by its bucket path.
    fn remove(
        &self,
        bucket: Bucket,
        path: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Supabase Storage REST client.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: Url,
    products_bucket: String,
    payments_bucket: String,
}

impl SupabaseStorage {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP client
    /// fails to build.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let key = config.secret_key.expose_secret();
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| StorageError::Config(format!("Invalid storage key format: {e}")))?,
        );
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| StorageError::Config(format!("Invalid storage key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            products_bucket: config.products_bucket.clone(),
            payments_bucket: config.payments_bucket.clone(),
        })
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Products => &self.products_bucket,
            Bucket::Payments => &self.payments_bucket,
        }
    }

    fn endpoint(&self, tail: &str) -> String {
        format!(
            "{}/storage/v1/{tail}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    /// Public URL of an object in a public bucket.
    #[must_use]
    pub fn public_url(&self, bucket: Bucket, path: &str) -> String {
        self.endpoint(&format!("object/public/{}/{path}", self.bucket_name(bucket)))
    }
}

impl ObjectStorage for SupabaseStorage {
    #[instrument(skip(self, upload), fields(file = %upload.file_name, size = upload.bytes.len()))]
    async fn upload(
        &self,
        bucket: Bucket,
        folder: &str,
        upload: &Upload,
    ) -> Result<StoredObject, StorageError> {
        let path = object_path(
            folder,
            &upload.file_name,
            chrono::Utc::now().timestamp_millis(),
            rand::rng().random(),
        );
        let url = self.endpoint(&format!("object/{}/{path}", self.bucket_name(bucket)));

        let content_type = if upload.content_type.is_empty() {
            "application/octet-stream"
        } else {
            upload.content_type.as_str()
        };

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(upload.bytes.clone())
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(StoredObject {
            public_url: self.public_url(bucket, &path),
            path,
        })
    }

    #[instrument(skip(self))]
    async fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError> {
        let url = self.endpoint(&format!("object/{}", self.bucket_name(bucket)));
        let body = serde_json::json!({ "prefixes": [path] });

        let response = self.client.delete(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Build a collision-resistant object path.
///
/// The folder is reduced to `[A-Za-z0-9/_-]`; the extension is taken from the
/// original file name, lowercased.
#[must_use]
pub fn object_path(folder: &str, file_name: &str, unix_millis: i64, nonce: [u8; 6]) -> String {
    format!(
        "{}/{unix_millis}-{}{}",
        sanitize_folder(folder),
        hex::encode(nonce),
        extension(file_name)
    )
}

fn sanitize_folder(folder: &str) -> String {
    let cleaned: String = folder
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'))
        .collect();
    let trimmed = cleaned.trim_matches('/');
    if trimmed.is_empty() {
        FALLBACK_FOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Path of an object inside `bucket`, recovered from its public URL.
///
/// Used when media entries (which only keep the public URL) are replaced.
#[must_use]
pub fn path_from_public_url<'u>(public_url: &'u str, bucket_name: &str) -> Option<&'u str> {
    let marker = format!("/storage/v1/object/public/{bucket_name}/");
    public_url
        .find(&marker)
        .and_then(|start| public_url.get(start + marker.len()..))
        .filter(|path| !path.is_empty())
}

//! Artifact stores.
//!
//! An [`ArtifactStore`] turns a [`Location`] into bytes. [`HttpStore`]
//! fetches URLs; [`BucketStore`] reads object keys from any
//! `object_store` backend (S3 in production, in-memory in tests) and can
//! list keys by string prefix.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjPath;
use object_store::ObjectStore;

use crate::client::describe_transport;
use crate::error::{RegistryError, Result};
use crate::package::Location;

/// Source of artifact bytes.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Download the full contents at `location`.
    async fn fetch(&self, location: &Location) -> Result<Bytes>;
}

/// Fetches [`Location::Url`] artifacts over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStore {
    http: reqwest::Client,
}

impl HttpStore {
    pub fn new(http: reqwest::Client) -> Self {
        HttpStore { http }
    }
}

/// Statuses worth another attempt.
fn status_is_transient(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}

#[async_trait]
impl ArtifactStore for HttpStore {
    async fn fetch(&self, location: &Location) -> Result<Bytes> {
        let Location::Url(url) = location else {
            return Err(RegistryError::DownloadFailed {
                location: location.to_string(),
                detail: "HTTP store can only fetch URLs".to_string(),
                transient: false,
            });
        };
        let failed = |detail: String, transient: bool| RegistryError::DownloadFailed {
            location: url.clone(),
            detail,
            transient,
        };

        tracing::debug!(%url, "downloading artifact");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| failed(describe_transport(&e), true))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}"), status_is_transient(status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| failed(format!("reading body: {}", describe_transport(&e)), true))?;
        tracing::debug!(%url, bytes = body.len(), "downloaded artifact");
        Ok(body)
    }
}

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// The most recently modified entry. Ties go to the lexicographically
/// greatest key.
pub fn pick_latest<'a, I>(entries: I) -> Option<&'a ObjectEntry>
where
    I: IntoIterator<Item = &'a ObjectEntry>,
{
    entries
        .into_iter()
        .max_by(|a, b| (a.last_modified, &a.key).cmp(&(b.last_modified, &b.key)))
}

/// Reads objects by key from an `object_store` backend.
#[derive(Clone)]
pub struct BucketStore {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl std::fmt::Debug for BucketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketStore")
            .field("store", &self.store.to_string())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BucketStore {
    pub fn new(store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        BucketStore { store, timeout }
    }

    /// S3 bucket with credentials and region taken from the standard
    /// `AWS_*` environment variables.
    pub fn s3_from_env(bucket: &str, timeout: Duration) -> Result<Self> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| RegistryError::RegistryUnavailable {
                name: bucket.to_string(),
                detail: format!("configuring S3 client: {e}"),
            })?;
        Ok(BucketStore::new(Arc::new(store), timeout))
    }

    /// Every object whose key starts with `prefix` (plain string match, so
    /// `wheels/numpy` matches `wheels/numpy-1.26.4-...whl`).
    pub async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let unavailable = |detail: String| RegistryError::RegistryUnavailable {
            name: prefix.to_string(),
            detail,
        };

        // Listing is by path segment, so list the enclosing directory and
        // filter by the full string prefix.
        let parent = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let parent = (!parent.is_empty()).then(|| ObjPath::from(parent));

        let listing = self.store.list(parent.as_ref()).try_collect::<Vec<_>>();
        let metas = tokio::time::timeout(self.timeout, listing)
            .await
            .map_err(|_| unavailable(format!("listing timed out after {:?}", self.timeout)))?
            .map_err(|e| unavailable(format!("listing failed: {e}")))?;

        let entries: Vec<ObjectEntry> = metas
            .into_iter()
            .map(|meta| ObjectEntry {
                key: meta.location.to_string(),
                last_modified: meta.last_modified,
            })
            .filter(|entry| entry.key.starts_with(prefix))
            .collect();
        tracing::debug!(prefix, count = entries.len(), "listed objects");
        Ok(entries)
    }

    /// The most recently modified object under `prefix`, if any.
    pub async fn list_latest(&self, prefix: &str) -> Result<Option<ObjectEntry>> {
        let entries = self.list(prefix).await?;
        Ok(pick_latest(&entries).cloned())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let failed = |detail: String, transient: bool| RegistryError::DownloadFailed {
            location: format!("key:{key}"),
            detail,
            transient,
        };
        let path = ObjPath::from(key);
        let download = async {
            let result = self.store.get(&path).await?;
            result.bytes().await
        };
        match tokio::time::timeout(self.timeout, download).await {
            Err(_) => Err(failed(format!("timed out after {:?}", self.timeout), true)),
            Ok(Err(object_store::Error::NotFound { .. })) => {
                Err(failed("object does not exist".to_string(), false))
            }
            Ok(Err(e)) => Err(failed(e.to_string(), true)),
            Ok(Ok(bytes)) => Ok(bytes),
        }
    }
}

#[async_trait]
impl ArtifactStore for BucketStore {
    async fn fetch(&self, location: &Location) -> Result<Bytes> {
        match location {
            Location::Key(key) => {
                tracing::debug!(key = %key, "downloading object");
                self.get(key).await
            }
            Location::Url(url) => Err(RegistryError::DownloadFailed {
                location: url.clone(),
                detail: "bucket store can only fetch object keys".to_string(),
                transient: false,
            }),
        }
    }
}

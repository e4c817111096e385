//! Package sources.
//!
//! A [`PackageSource`] answers two questions: which artifact should be used
//! for a package, and what are its bytes. [`IndexSource`] asks a JSON index
//! and matches wheels against the target tags. [`BucketSource`] lists an
//! object store prefix and takes the newest object.

use async_trait::async_trait;
use bytes::Bytes;
use slab_targets::{CompatibilityMatcher, WheelName};

use crate::client::RegistryClient;
use crate::constraint::VersionConstraint;
use crate::error::{RegistryError, Result};
use crate::integrity::verify_download;
use crate::package::{ArtifactDescriptor, Location, PackageName};
use crate::retry::RetryPolicy;
use crate::store::{pick_latest, ArtifactStore, BucketStore, HttpStore};

/// Where packages come from.
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Short label for logs (`"index"`, `"bucket"`).
    fn kind(&self) -> &'static str;

    /// Choose the artifact to load for `name`.
    async fn locate(
        &self,
        name: &PackageName,
        constraint: &VersionConstraint,
    ) -> Result<ArtifactDescriptor>;

    /// Describe the artifact stored at an explicit key.
    ///
    /// Only sources that address artifacts by key support this.
    async fn locate_key(&self, _name: &PackageName, key: &str) -> Result<ArtifactDescriptor> {
        Err(RegistryError::DownloadFailed {
            location: format!("key:{key}"),
            detail: format!("the {} source does not address artifacts by key", self.kind()),
            transient: false,
        })
    }

    /// Download an artifact's bytes.
    async fn fetch(&self, artifact: &ArtifactDescriptor) -> Result<Bytes>;
}

/// Packages from a JSON index, artifacts over HTTP.
#[derive(Debug, Clone)]
pub struct IndexSource {
    client: RegistryClient,
    matcher: CompatibilityMatcher,
    store: HttpStore,
    retry: RetryPolicy,
}

impl IndexSource {
    pub fn new(
        client: RegistryClient,
        matcher: CompatibilityMatcher,
        store: HttpStore,
        retry: RetryPolicy,
    ) -> Self {
        IndexSource {
            client,
            matcher,
            store,
            retry,
        }
    }

    pub fn matcher(&self) -> &CompatibilityMatcher {
        &self.matcher
    }
}

#[async_trait]
impl PackageSource for IndexSource {
    fn kind(&self) -> &'static str {
        "index"
    }

    async fn locate(
        &self,
        name: &PackageName,
        constraint: &VersionConstraint,
    ) -> Result<ArtifactDescriptor> {
        let client = &self.client;
        let index = self
            .retry
            .run("index query", || client.query_metadata(name))
            .await?;

        let version = index
            .select_version(constraint)
            .ok_or_else(|| RegistryError::NoMatchingVersion {
                name: name.to_string(),
                constraint: constraint_label(constraint),
            })?;

        let artifact = self.matcher.select(name.as_str(), index.artifacts(version))?;
        tracing::debug!(
            package = %name,
            version,
            filename = %artifact.filename,
            "selected artifact"
        );
        Ok(artifact.clone())
    }

    async fn fetch(&self, artifact: &ArtifactDescriptor) -> Result<Bytes> {
        let store = &self.store;
        let location = &artifact.location;
        let bytes = self.retry.run("download", || store.fetch(location)).await?;
        verify_download(&location.to_string(), artifact.sha256.as_deref(), &bytes)?;
        Ok(bytes)
    }
}

/// Packages stored as objects under a key prefix.
///
/// The artifact for `name` is the most recently modified object whose key
/// starts with `<prefix>/<name>`. No platform matching is done; the bucket
/// is expected to hold artifacts built for the hosts that read it.
#[derive(Debug, Clone)]
pub struct BucketSource {
    store: BucketStore,
    prefix: String,
    retry: RetryPolicy,
}

impl BucketSource {
    pub fn new(store: BucketStore, prefix: impl Into<String>, retry: RetryPolicy) -> Self {
        BucketSource {
            store,
            prefix: prefix.into(),
            retry,
        }
    }

    /// The string prefix listed for a package.
    pub fn listing_prefix(&self, name: &PackageName) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name.as_str().to_string()
        } else {
            format!("{prefix}/{}", name.as_str())
        }
    }
}

/// Whether a listed key can hold `name` at a version `constraint` accepts.
///
/// Keys that follow the wheel naming convention must name the same
/// distribution (so `numpy` does not pick up `numpyro`) and carry an
/// acceptable version. Other keys are kept.
fn key_matches(key: &str, name: &PackageName, constraint: &VersionConstraint) -> bool {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match WheelName::parse(file_name) {
        Some(wheel) => {
            PackageName::new(wheel.distribution) == *name
                && (constraint.is_any() || constraint.matches_str(&wheel.version))
        }
        None => true,
    }
}

fn constraint_label(constraint: &VersionConstraint) -> String {
    if constraint.is_any() {
        "any version".to_string()
    } else {
        constraint.to_string()
    }
}

#[async_trait]
impl PackageSource for BucketSource {
    fn kind(&self) -> &'static str {
        "bucket"
    }

    async fn locate(
        &self,
        name: &PackageName,
        constraint: &VersionConstraint,
    ) -> Result<ArtifactDescriptor> {
        let prefix = self.listing_prefix(name);
        let store = &self.store;
        let listed = self
            .retry
            .run("bucket listing", || store.list(&prefix))
            .await?;

        if listed.is_empty() {
            return Err(RegistryError::PackageNotFound {
                name: name.to_string(),
            });
        }

        let candidates: Vec<_> = listed
            .iter()
            .filter(|entry| key_matches(&entry.key, name, constraint))
            .collect();
        let latest = pick_latest(candidates).ok_or_else(|| {
            RegistryError::NoMatchingVersion {
                name: name.to_string(),
                constraint: constraint_label(constraint),
            }
        })?;

        tracing::debug!(
            package = %name,
            key = %latest.key,
            last_modified = %latest.last_modified,
            listed = listed.len(),
            "selected newest object"
        );
        Ok(ArtifactDescriptor::from_filename(
            name.clone(),
            &latest.key,
            Location::Key(latest.key.clone()),
        ))
    }

    async fn locate_key(&self, name: &PackageName, key: &str) -> Result<ArtifactDescriptor> {
        Ok(ArtifactDescriptor::from_filename(
            name.clone(),
            key,
            Location::Key(key.to_string()),
        ))
    }

    async fn fetch(&self, artifact: &ArtifactDescriptor) -> Result<Bytes> {
        let store = &self.store;
        let location = &artifact.location;
        let bytes = self.retry.run("download", || store.fetch(location)).await?;
        verify_download(&location.to_string(), artifact.sha256.as_deref(), &bytes)?;
        Ok(bytes)
    }
}

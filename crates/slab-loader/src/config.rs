//! Loader configuration.
//!
//! Every field has a default, so an empty `[loader]` table is valid:
//!
//! ```toml
//! [loader]
//! backend = "bucket"
//! bucket = "my-artifacts"
//! prefix = "wheels/"
//! interpreter = "cp311"
//! timeout-secs = 30
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use slab_registry::{
    build_http_client, BucketSource, BucketStore, HttpStore, IndexSource, PackageSource,
    RegistryClient, RegistryError, RetryPolicy, DEFAULT_INDEX_URL,
};
use slab_targets::{CompatibilityMatcher, InterpreterTag, PlatformTag, TargetTags};

use crate::error::{LoadError, Result};
use crate::host::{ModuleHost, StagingHost};
use crate::loader::Loader;

/// Where packages are fetched from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// JSON package index over HTTP.
    #[default]
    Index,
    /// Object store bucket and key prefix.
    Bucket,
}

impl FromStr for Backend {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index" => Ok(Backend::Index),
            "bucket" => Ok(Backend::Bucket),
            other => Err(LoadError::InvalidConfig {
                detail: format!("unknown backend '{other}' (expected 'index' or 'bucket')"),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Index => f.write_str("index"),
            Backend::Bucket => f.write_str("bucket"),
        }
    }
}

/// Settings for building a [`Loader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoaderConfig {
    pub backend: Backend,
    /// Index root; packages are queried at `<index-url>/<name>/json`.
    pub index_url: String,
    /// Bucket name (bucket backend only).
    pub bucket: Option<String>,
    /// Key prefix under which artifacts are stored (bucket backend only).
    pub prefix: String,
    /// Interpreter tag artifacts must carry.
    pub interpreter: String,
    /// Platform tag override; detected from the host when absent.
    pub platform: Option<String>,
    /// Accept a `none-any` wheel when no platform wheel matches.
    pub accept_universal: bool,
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub user_agent: String,
    /// Packages the module host already has; they are never fetched.
    pub preinstalled: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            backend: Backend::Index,
            index_url: DEFAULT_INDEX_URL.to_string(),
            bucket: None,
            prefix: "wheels/".to_string(),
            interpreter: InterpreterTag::DEFAULT.to_string(),
            platform: None,
            accept_universal: false,
            timeout_secs: 30,
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
            user_agent: format!("slab/{}", env!("CARGO_PKG_VERSION")),
            preinstalled: Vec::new(),
        }
    }
}

impl LoaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    /// Tags artifacts are matched against.
    ///
    /// Fails when the interpreter tag is malformed, or when no platform
    /// override is set and the host OS is unsupported.
    pub fn target_tags(&self) -> Result<TargetTags> {
        let interpreter = InterpreterTag::parse(&self.interpreter).map_err(RegistryError::from)?;
        match &self.platform {
            Some(platform) => Ok(TargetTags::new(PlatformTag::new(platform.trim()), interpreter)),
            None => Ok(TargetTags::for_host(interpreter).map_err(RegistryError::from)?),
        }
    }

    /// Build the configured package source.
    pub fn build_source(&self) -> Result<Arc<dyn PackageSource>> {
        match self.backend {
            Backend::Index => {
                let http = build_http_client(self.timeout(), &self.user_agent)?;
                let matcher = CompatibilityMatcher::new(self.target_tags()?)
                    .with_universal_fallback(self.accept_universal);
                tracing::debug!(
                    index = %self.index_url,
                    target = %matcher.target(),
                    "using package index"
                );
                Ok(Arc::new(IndexSource::new(
                    RegistryClient::new(self.index_url.clone(), http.clone()),
                    matcher,
                    HttpStore::new(http),
                    self.retry_policy(),
                )))
            }
            Backend::Bucket => {
                let bucket = self
                    .bucket
                    .as_deref()
                    .filter(|b| !b.trim().is_empty())
                    .ok_or_else(|| LoadError::InvalidConfig {
                        detail: "the bucket backend needs a bucket name".to_string(),
                    })?;
                let store = BucketStore::s3_from_env(bucket, self.timeout())?;
                tracing::debug!(bucket, prefix = %self.prefix, "using object store bucket");
                Ok(Arc::new(BucketSource::new(
                    store,
                    self.prefix.clone(),
                    self.retry_policy(),
                )))
            }
        }
    }

    /// Build a loader with a fresh [`StagingHost`].
    pub fn build(&self) -> Result<Loader> {
        let host = StagingHost::new()?.with_preinstalled(self.preinstalled.iter().map(String::as_str));
        self.build_with_host(Arc::new(host))
    }

    /// Build a loader around a caller-supplied host.
    pub fn build_with_host(&self, host: Arc<dyn ModuleHost>) -> Result<Loader> {
        Ok(Loader::new(self.build_source()?, host))
    }
}

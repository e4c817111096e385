//! Package index client.
//!
//! Queries `GET <index-root>/<name>/json`, which answers with
//! `{ "releases": { "<version>": [ { "filename", "url", "digests" }, ... ] } }`.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::constraint::VersionConstraint;
use crate::error::{RegistryError, Result};
use crate::package::{ArtifactDescriptor, Location, PackageName};
use crate::version;

/// Default public index root.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

#[derive(Debug, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    releases: BTreeMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Deserialize)]
struct ReleaseFile {
    filename: String,
    url: String,
    #[serde(default)]
    digests: Option<Digests>,
}

#[derive(Debug, Deserialize)]
struct Digests {
    #[serde(default)]
    sha256: Option<String>,
}

/// The releases the index knows for one package.
#[derive(Debug, Clone)]
pub struct PackageIndex {
    pub name: PackageName,
    /// Version key → artifacts, in the order the index listed them.
    pub releases: BTreeMap<String, Vec<ArtifactDescriptor>>,
}

impl PackageIndex {
    /// Release keys from highest to lowest.
    pub fn versions_descending(&self) -> Vec<&str> {
        version::sort_descending(self.releases.keys().map(String::as_str))
    }

    /// The highest version that has artifacts and satisfies `constraint`.
    pub fn select_version(&self, constraint: &VersionConstraint) -> Option<&str> {
        self.versions_descending().into_iter().find(|v| {
            self.releases.get(*v).is_some_and(|files| !files.is_empty())
                && constraint.matches_str(v)
        })
    }

    /// Artifacts of one release (empty when the version is unknown).
    pub fn artifacts(&self, version: &str) -> &[ArtifactDescriptor] {
        self.releases.get(version).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Build the HTTP client shared by the index client and the URL store.
pub fn build_http_client(timeout: Duration, user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| RegistryError::RegistryUnavailable {
            name: String::new(),
            detail: format!("building HTTP client: {e}"),
        })
}

/// Client for a JSON package index.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    index_url: String,
}

impl RegistryClient {
    /// Create a client for the index rooted at `index_url`.
    pub fn new(index_url: impl Into<String>, http: reqwest::Client) -> Self {
        let index_url = index_url.into().trim_end_matches('/').to_string();
        RegistryClient { http, index_url }
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    /// Fetch the release listing for a package.
    pub async fn query_metadata(&self, name: &PackageName) -> Result<PackageIndex> {
        let url = format!("{}/{}/json", self.index_url, name.as_str());
        let unavailable = |detail: String| RegistryError::RegistryUnavailable {
            name: name.to_string(),
            detail,
        };

        tracing::debug!(package = %name, %url, "querying package index");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(describe_transport(&e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::PackageNotFound {
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(unavailable(format!("index answered HTTP {status}")));
        }

        let document: IndexDocument = response
            .json()
            .await
            .map_err(|e| unavailable(format!("decoding index response: {e}")))?;

        if document.releases.is_empty() {
            return Err(RegistryError::PackageNotFound {
                name: name.to_string(),
            });
        }

        let releases = document
            .releases
            .into_iter()
            .map(|(version, files)| {
                let artifacts = files
                    .into_iter()
                    .map(|file| {
                        ArtifactDescriptor::from_filename(
                            name.clone(),
                            &file.filename,
                            Location::Url(file.url),
                        )
                        .with_version(version.clone())
                        .with_sha256(file.digests.and_then(|d| d.sha256))
                    })
                    .collect();
                (version, artifacts)
            })
            .collect();

        Ok(PackageIndex {
            name: name.clone(),
            releases,
        })
    }
}

/// Short description of a transport error.
pub(crate) fn describe_transport(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

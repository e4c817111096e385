//! Registry error types.

use slab_targets::TargetError;

/// Errors that can occur while locating, fetching, or parsing a package.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The package index or object listing could not be reached.
    #[error("registry unavailable while querying '{name}': {detail}")]
    RegistryUnavailable { name: String, detail: String },

    /// The index or store has no entry for the package.
    #[error("package not found: {name}")]
    PackageNotFound { name: String },

    /// No published version satisfies the requested constraint.
    #[error("no version of '{name}' satisfies '{constraint}'")]
    NoMatchingVersion { name: String, constraint: String },

    /// Artifact download failed.
    #[error("download failed for {location}: {detail}")]
    DownloadFailed {
        location: String,
        detail: String,
        /// Whether a later attempt may succeed (transport errors, 5xx, timeouts).
        transient: bool,
    },

    /// The artifact is not a readable ZIP archive.
    #[error("archive extraction failed: {detail}")]
    ExtractionFailed { detail: String },

    /// The archive carries no usable metadata entry.
    #[error("package metadata missing: {detail}")]
    MetadataMissing { detail: String },

    /// A dependency specifier was empty.
    #[error("empty dependency specifier")]
    EmptySpecifier,

    /// Platform derivation or artifact matching failed.
    #[error(transparent)]
    Target(#[from] TargetError),
}

impl RegistryError {
    /// Whether retrying the same network call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RegistryError::RegistryUnavailable { .. } => true,
            RegistryError::DownloadFailed { transient, .. } => *transient,
            _ => false,
        }
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

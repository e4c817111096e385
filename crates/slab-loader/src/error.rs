//! Loader error types.

use slab_registry::RegistryError;

/// Errors that can occur while loading a package.
///
/// `DependencyLoadFailed` and `ModuleExecutionFailed` are soft: they are
/// collected as warnings or per-entry statuses and never fail the package
/// that was asked for.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Locating, fetching, or reading the requested package failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A transitive dependency could not be fetched, read, or executed.
    #[error("dependency '{name}' (required by '{required_by}') could not be loaded: {source}")]
    DependencyLoadFailed {
        name: String,
        required_by: String,
        #[source]
        source: Box<LoadError>,
    },

    /// One code entry of a package failed to execute.
    #[error("executing '{path}' of '{package}' failed: {detail}")]
    ModuleExecutionFailed {
        package: String,
        path: String,
        detail: String,
    },

    /// The module host could not provide a namespace or a handle.
    #[error("module host failed for '{package}': {detail}")]
    HostFailure { package: String, detail: String },

    /// The loader configuration is unusable.
    #[error("invalid loader configuration: {detail}")]
    InvalidConfig { detail: String },
}

impl LoadError {
    /// Wrap the failure of dependency `name` as a soft error.
    pub fn dependency(
        name: impl Into<String>,
        required_by: impl Into<String>,
        source: impl Into<LoadError>,
    ) -> Self {
        LoadError::DependencyLoadFailed {
            name: name.into(),
            required_by: required_by.into(),
            source: Box::new(source.into()),
        }
    }

    /// Whether the error only degrades a load instead of failing it.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            LoadError::DependencyLoadFailed { .. } | LoadError::ModuleExecutionFailed { .. }
        )
    }
}

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;

//! Target error types.

/// Errors raised while deriving tags or matching artifacts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// The host operating system has no known platform tag encoding.
    #[error("unsupported platform: {os} ({arch})")]
    UnsupportedPlatform { os: String, arch: String },

    /// None of the candidate artifacts fits the host.
    #[error("no compatible artifact for '{package}' (platform {platform}, interpreter {interpreter}) among {candidates} candidates")]
    NoCompatibleArtifact {
        package: String,
        platform: String,
        interpreter: String,
        candidates: usize,
    },

    /// An interpreter tag string could not be understood.
    #[error("invalid interpreter tag: '{0}'")]
    InvalidInterpreter(String),
}

/// Result type alias for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;

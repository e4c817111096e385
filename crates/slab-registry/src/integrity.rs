//! Download integrity verification.
//!
//! When the package index publishes a SHA-256 digest for an artifact, the
//! downloaded bytes must hash to it before they are extracted.

use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

/// A content hash (SHA-256 hex digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute the SHA-256 hash of the given data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        ContentHash(hex_encode(&result))
    }

    /// Get the hex string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `expected` (hex, any case) names this hash.
    pub fn matches(&self, expected: &str) -> bool {
        self.0.eq_ignore_ascii_case(expected.trim())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encode bytes as lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Check downloaded bytes against an expected digest.
///
/// A mismatch is a non-transient [`RegistryError::DownloadFailed`]: fetching
/// the same URL again will not fix a wrong artifact.
pub fn verify_download(location: &str, expected: Option<&str>, data: &[u8]) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = ContentHash::compute(data);
    if actual.matches(expected) {
        return Ok(());
    }
    Err(RegistryError::DownloadFailed {
        location: location.to_string(),
        detail: format!("sha256 mismatch: expected {expected}, got {actual}"),
        transient: false,
    })
}

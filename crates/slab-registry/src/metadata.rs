//! Package metadata parsing.
//!
//! The metadata entry is a block of `Key: value` header lines. Its header
//! section ends at the first blank line; the free-form description that
//! follows is ignored. `Requires-Dist` may repeat and every occurrence is
//! kept in order. For any other repeated key the last occurrence wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveContents, EntryRole};
use crate::error::{RegistryError, Result};

/// The key that lists dependency specifiers.
pub const REQUIRES_DIST: &str = "Requires-Dist";

/// Parsed package metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Declared package name (`Name`).
    pub name: Option<String>,
    /// Declared version (`Version`).
    pub version: Option<String>,
    /// Raw dependency specifiers, in order, duplicates preserved.
    pub requires_dist: Vec<String>,
    /// Every other header, last occurrence wins.
    pub fields: BTreeMap<String, String>,
}

impl PackageMetadata {
    /// Parse a metadata body.
    pub fn parse(body: &str) -> Self {
        let mut metadata = PackageMetadata::default();
        for line in body.lines() {
            if line.trim().is_empty() {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                continue;
            }
            if key == REQUIRES_DIST {
                metadata.requires_dist.push(value.to_string());
            } else {
                metadata.fields.insert(key.to_string(), value.to_string());
            }
        }
        metadata.name = metadata.fields.get("Name").cloned();
        metadata.version = metadata.fields.get("Version").cloned();
        metadata
    }

    /// Look up a header (not `Requires-Dist`).
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Read the metadata entry of an extracted archive.
///
/// The first metadata entry in archive order is used.
pub fn parse_metadata(contents: &ArchiveContents) -> Result<PackageMetadata> {
    let entry = contents
        .with_role(EntryRole::Metadata)
        .next()
        .ok_or_else(|| RegistryError::MetadataMissing {
            detail: "archive has no METADATA or PKG-INFO entry".to_string(),
        })?;
    let body = std::str::from_utf8(&entry.bytes).map_err(|e| RegistryError::MetadataMissing {
        detail: format!("{} is not valid UTF-8: {e}", entry.path),
    })?;
    Ok(PackageMetadata::parse(body))
}

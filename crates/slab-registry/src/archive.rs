//! Wheel archive extraction.
//!
//! A wheel is a ZIP container. Entries are classified by suffix and kept
//! in archive order; everything that is not code, a native binary, or a
//! metadata entry is dropped.

use std::io::{Cursor, Read};

use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::error::{RegistryError, Result};

/// File names that mark a package metadata entry.
pub const METADATA_MARKERS: [&str; 2] = ["METADATA", "PKG-INFO"];

const CODE_SUFFIXES: [&str; 1] = [".py"];
const NATIVE_SUFFIXES: [&str; 4] = [".so", ".pyd", ".dylib", ".dll"];

/// What an archive entry is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryRole {
    /// Source code executed when the module loads.
    Code,
    /// Prebuilt extension library.
    NativeBinary,
    /// Package metadata (name, version, dependencies).
    Metadata,
}

impl EntryRole {
    /// Classify an archive path. Returns `None` for entries that are dropped.
    pub fn classify(path: &str) -> Option<Self> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if METADATA_MARKERS.contains(&file_name) {
            return Some(EntryRole::Metadata);
        }
        if CODE_SUFFIXES.iter().any(|s| file_name.ends_with(s)) {
            return Some(EntryRole::Code);
        }
        if NATIVE_SUFFIXES.iter().any(|s| file_name.ends_with(s)) || is_versioned_so(file_name) {
            return Some(EntryRole::NativeBinary);
        }
        None
    }
}

/// `libfoo.so.1`, `libfoo.so.1.2`
fn is_versioned_so(file_name: &str) -> bool {
    match file_name.split_once(".so.") {
        Some((stem, version)) => {
            !stem.is_empty()
                && !version.is_empty()
                && version.split('.').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        }
        None => false,
    }
}

/// One retained archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path relative to the archive root.
    pub path: String,
    pub role: EntryRole,
    pub bytes: Vec<u8>,
}

/// The retained entries of one archive, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveContents {
    entries: Vec<ArchiveEntry>,
}

impl ArchiveContents {
    /// Build contents from entries (kept in the given order).
    pub fn from_entries(entries: Vec<ArchiveEntry>) -> Self {
        ArchiveContents { entries }
    }

    /// Look up an entry by relative path.
    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// All entries in archive order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Entries with the given role, in archive order.
    pub fn with_role(&self, role: EntryRole) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter().filter(move |e| e.role == role)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total retained bytes.
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.bytes.len()).sum()
    }
}

/// Read a ZIP archive into role-classified contents.
pub fn extract(bytes: &[u8]) -> Result<ArchiveContents> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        RegistryError::ExtractionFailed {
            detail: format!("not a zip archive: {e}"),
        }
    })?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| RegistryError::ExtractionFailed {
            detail: format!("reading entry {i}: {e}"),
        })?;
        if file.is_dir() {
            continue;
        }
        let path = file.name().to_string();
        let Some(role) = EntryRole::classify(&path) else {
            continue;
        };

        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| RegistryError::ExtractionFailed {
                detail: format!("reading {path}: {e}"),
            })?;
        entries.push(ArchiveEntry {
            path,
            role,
            bytes: content,
        });
    }

    tracing::debug!(
        entries = entries.len(),
        code = entries.iter().filter(|e| e.role == EntryRole::Code).count(),
        "extracted archive"
    );
    Ok(ArchiveContents { entries })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build an in-memory ZIP from (path, contents) pairs.
    pub(crate) fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (path, data) in files {
            writer.start_file(*path, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn classify_entries() {
        assert_eq!(EntryRole::classify("pkg/__init__.py"), Some(EntryRole::Code));
        assert_eq!(EntryRole::classify("pkg/_core.cpython-311-x86_64-linux-gnu.so"), Some(EntryRole::NativeBinary));
        assert_eq!(EntryRole::classify("pkg/_core.pyd"), Some(EntryRole::NativeBinary));
        assert_eq!(EntryRole::classify("pkg.libs/libgfortran.so.5.0.0"), Some(EntryRole::NativeBinary));
        assert_eq!(EntryRole::classify("pkg-1.0.dist-info/METADATA"), Some(EntryRole::Metadata));
        assert_eq!(EntryRole::classify("PKG-INFO"), Some(EntryRole::Metadata));
        assert_eq!(EntryRole::classify("pkg-1.0.dist-info/RECORD"), None);
        assert_eq!(EntryRole::classify("pkg/data.json"), None);
        assert_eq!(EntryRole::classify("pkg/NOT_METADATA"), None);
    }

    #[test]
    fn extract_keeps_roles_in_order() {
        let bytes = zip_bytes(&[
            ("pkg/__init__.py", b"X = 1\n"),
            ("pkg/data.txt", b"dropped"),
            ("pkg/_speedups.so", b"\x7fELF"),
            ("pkg-1.0.dist-info/METADATA", b"Name: pkg\n"),
            ("pkg/util.py", b"def f(): pass\n"),
        ]);
        let contents = extract(&bytes).unwrap();
        let paths: Vec<&str> = contents.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "pkg/__init__.py",
                "pkg/_speedups.so",
                "pkg-1.0.dist-info/METADATA",
                "pkg/util.py"
            ]
        );
        assert_eq!(contents.with_role(EntryRole::Code).count(), 2);
        assert_eq!(contents.get("pkg/__init__.py").unwrap().bytes, b"X = 1\n");
        assert!(contents.get("pkg/data.txt").is_none());
    }

    #[test]
    fn malformed_archive_fails() {
        let err = extract(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, RegistryError::ExtractionFailed { .. }));
    }

    #[test]
    fn empty_archive_is_empty() {
        let contents = extract(&zip_bytes(&[])).unwrap();
        assert!(contents.is_empty());
        assert_eq!(contents.total_bytes(), 0);
    }
}

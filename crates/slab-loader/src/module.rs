//! Loaded module handles.

use std::path::{Path, PathBuf};

use slab_registry::{ArtifactDescriptor, EntryRole, PackageName};
use uuid::Uuid;

use crate::error::LoadError;

/// Opaque reference to a namespace inside the module host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    id: Uuid,
    namespace: String,
    root: Option<PathBuf>,
}

impl ModuleHandle {
    /// A handle for a namespace the host created.
    pub fn new(namespace: impl Into<String>, root: Option<PathBuf>) -> Self {
        ModuleHandle {
            id: Uuid::new_v4(),
            namespace: namespace.into(),
            root,
        }
    }

    /// A handle for a package the host already had.
    pub fn provided(name: &PackageName) -> Self {
        ModuleHandle::new(name.as_str(), None)
    }

    /// Unique per namespace.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Directory holding the staged entries, for hosts that stage to disk.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

/// Outcome of one archive entry.
#[derive(Debug)]
pub enum EntryStatus {
    /// Code entry executed.
    Executed,
    /// Native binary attached to the namespace.
    Attached,
    /// The entry failed; the rest of the package still loaded.
    Failed(LoadError),
}

impl EntryStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, EntryStatus::Failed(_))
    }
}

/// Per-entry record kept on a [`LoadedModule`].
#[derive(Debug)]
pub struct EntryReport {
    pub path: String,
    pub role: EntryRole,
    pub status: EntryStatus,
}

/// A package that has been loaded into the host. Never mutated once built.
#[derive(Debug)]
pub struct LoadedModule {
    pub name: PackageName,
    /// Version from the package metadata, else from the artifact.
    pub version: Option<String>,
    /// The artifact the module came from (`None` when the host provided it).
    pub artifact: Option<ArtifactDescriptor>,
    pub handle: ModuleHandle,
    /// Code and native entries in archive order.
    pub entries: Vec<EntryReport>,
}

impl LoadedModule {
    /// A module the host already provided; nothing was fetched.
    pub fn provided(name: PackageName) -> Self {
        let handle = ModuleHandle::provided(&name);
        LoadedModule {
            name,
            version: None,
            artifact: None,
            handle,
            entries: Vec::new(),
        }
    }

    /// Whether this module came from the host rather than an artifact.
    pub fn is_provided(&self) -> bool {
        self.artifact.is_none()
    }

    /// Whether any entry failed.
    pub fn is_partial(&self) -> bool {
        self.entries.iter().any(|e| e.status.is_failed())
    }

    /// Entries that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &LoadError)> {
        self.entries.iter().filter_map(|e| match &e.status {
            EntryStatus::Failed(err) => Some((e.path.as_str(), err)),
            _ => None,
        })
    }
}

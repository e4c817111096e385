//! Module hosts.
//!
//! A [`ModuleHost`] is the boundary between the loader and whatever runs
//! package code. The loader asks it for a fresh [`Namespace`] per package,
//! feeds the namespace the package's code entries (in archive order) and
//! native binaries, and keeps the resulting [`ModuleHandle`].
//!
//! [`StagingHost`] is the built-in host: it writes each package into its
//! own subtree of a temporary directory that an external interpreter can be
//! pointed at. The directory is removed when the host is dropped.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use slab_registry::{ArchiveEntry, PackageName};
use tempfile::TempDir;

use crate::error::{LoadError, Result};
use crate::module::ModuleHandle;

/// Runs package code on behalf of the loader.
pub trait ModuleHost: Send + Sync {
    /// Whether the host already has `name` available, so it need not be
    /// fetched.
    fn provides(&self, name: &PackageName) -> bool;

    /// Create an empty namespace bound to `name`.
    fn create_namespace(&self, name: &PackageName) -> Result<Box<dyn Namespace>>;
}

/// One package's namespace while it is being populated.
pub trait Namespace: Send {
    /// Execute a code entry. Failure is reported per entry.
    fn execute(&mut self, entry: &ArchiveEntry) -> Result<()>;

    /// Make a native binary available to the namespace.
    fn attach_native(&mut self, entry: &ArchiveEntry) -> Result<()>;

    /// Seal the namespace and hand back its handle.
    fn finish(self: Box<Self>) -> Result<ModuleHandle>;
}

/// Stages packages into a per-host temporary directory.
#[derive(Debug)]
pub struct StagingHost {
    dir: TempDir,
    preinstalled: HashSet<PackageName>,
}

impl StagingHost {
    /// Create a host with a fresh staging directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("slab-staging-")
            .tempdir()
            .map_err(|e| LoadError::HostFailure {
                package: String::new(),
                detail: format!("creating staging directory: {e}"),
            })?;
        tracing::debug!(root = %dir.path().display(), "created staging directory");
        Ok(StagingHost {
            dir,
            preinstalled: HashSet::new(),
        })
    }

    /// Packages the target interpreter already has; they are never fetched.
    pub fn with_preinstalled<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<PackageName>,
    {
        self.preinstalled.extend(names.into_iter().map(Into::into));
        self
    }

    /// The staging root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

impl ModuleHost for StagingHost {
    fn provides(&self, name: &PackageName) -> bool {
        self.preinstalled.contains(name)
    }

    fn create_namespace(&self, name: &PackageName) -> Result<Box<dyn Namespace>> {
        let dir = self.dir.path().join(name.key());
        std::fs::create_dir_all(&dir).map_err(|e| LoadError::HostFailure {
            package: name.to_string(),
            detail: format!("creating {}: {e}", dir.display()),
        })?;
        Ok(Box::new(StagingNamespace {
            package: name.to_string(),
            dir,
            staged: 0,
        }))
    }
}

struct StagingNamespace {
    package: String,
    dir: PathBuf,
    staged: usize,
}

impl StagingNamespace {
    fn failed(&self, entry: &ArchiveEntry, detail: String) -> LoadError {
        LoadError::ModuleExecutionFailed {
            package: self.package.clone(),
            path: entry.path.clone(),
            detail,
        }
    }

    /// Resolve an archive path under the namespace directory, rejecting
    /// absolute paths and `..` components.
    fn target_path(&self, entry: &ArchiveEntry) -> Result<PathBuf> {
        let relative = Path::new(&entry.path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe || entry.path.is_empty() {
            return Err(self.failed(entry, "path escapes the package directory".to_string()));
        }
        Ok(self.dir.join(relative))
    }

    fn stage(&mut self, entry: &ArchiveEntry) -> Result<()> {
        let target = self.target_path(entry)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| self.failed(entry, format!("creating {}: {e}", parent.display())))?;
        }
        std::fs::write(&target, &entry.bytes)
            .map_err(|e| self.failed(entry, format!("writing {}: {e}", target.display())))?;
        self.staged += 1;
        Ok(())
    }
}

impl Namespace for StagingNamespace {
    fn execute(&mut self, entry: &ArchiveEntry) -> Result<()> {
        if let Err(e) = std::str::from_utf8(&entry.bytes) {
            return Err(self.failed(entry, format!("source is not valid UTF-8: {e}")));
        }
        self.stage(entry)
    }

    fn attach_native(&mut self, entry: &ArchiveEntry) -> Result<()> {
        self.stage(entry)
    }

    fn finish(self: Box<Self>) -> Result<ModuleHandle> {
        tracing::debug!(
            package = %self.package,
            staged = self.staged,
            dir = %self.dir.display(),
            "staged package"
        );
        Ok(ModuleHandle::new(self.package, Some(self.dir)))
    }
}

//! Per-loader package cache.
//!
//! One slot per package name. A slot holds two write-once cells: the
//! fetched package (artifact, archive contents, metadata) and the loaded
//! module. Callers that race on a name share the same cell, so the work
//! behind it runs once and every caller receives the same `Arc`.
//!
//! A cell whose initialiser fails stays empty and a later call may try
//! again. Entries are never evicted; they live as long as the loader.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use slab_registry::{ArchiveContents, ArtifactDescriptor, PackageMetadata, PackageName};
use tokio::sync::OnceCell;

use crate::module::LoadedModule;
use crate::state::LoadState;

/// A package that has been located, downloaded, and read.
#[derive(Debug)]
pub struct FetchedPackage {
    pub artifact: ArtifactDescriptor,
    pub contents: ArchiveContents,
    pub metadata: PackageMetadata,
}

impl FetchedPackage {
    /// Version from the metadata, falling back to the artifact's.
    pub fn version(&self) -> Option<&str> {
        self.metadata
            .version
            .as_deref()
            .or(self.artifact.version.as_deref())
    }
}

#[derive(Debug, Default)]
pub(crate) struct Slot {
    pub(crate) fetched: OnceCell<Arc<FetchedPackage>>,
    pub(crate) module: OnceCell<Arc<LoadedModule>>,
    state: Mutex<LoadState>,
}

impl Slot {
    pub(crate) fn state(&self) -> LoadState {
        self.state.lock().clone()
    }

    /// Move to `next`, unless the package is already loaded.
    pub(crate) fn transition(&self, name: &PackageName, next: LoadState) {
        let mut state = self.state.lock();
        if *state == LoadState::Loaded || *state == next {
            return;
        }
        tracing::debug!(package = %name, from = %*state, to = %next, "load state");
        *state = next;
    }

    /// Move to `next` only while the package is still in `from`.
    pub(crate) fn transition_from(&self, name: &PackageName, from: &LoadState, next: LoadState) {
        let mut state = self.state.lock();
        if *state != *from {
            return;
        }
        tracing::debug!(package = %name, from = %*state, to = %next, "load state");
        *state = next;
    }
}

/// Map from package name to its slot.
#[derive(Debug, Default)]
pub struct LoaderCache {
    slots: Mutex<HashMap<PackageName, Arc<Slot>>>,
}

impl LoaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `name`, created empty on first use.
    pub(crate) fn slot(&self, name: &PackageName) -> Arc<Slot> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(name.clone()).or_default())
    }

    fn existing(&self, name: &PackageName) -> Option<Arc<Slot>> {
        self.slots.lock().get(name).cloned()
    }

    /// The loaded module for `name`, if any.
    pub fn get(&self, name: &PackageName) -> Option<Arc<LoadedModule>> {
        self.existing(name)?.module.get().cloned()
    }

    /// The fetched package for `name`, if any.
    pub fn fetched(&self, name: &PackageName) -> Option<Arc<FetchedPackage>> {
        self.existing(name)?.fetched.get().cloned()
    }

    pub fn is_loaded(&self, name: &PackageName) -> bool {
        self.get(name).is_some()
    }

    pub fn state(&self, name: &PackageName) -> LoadState {
        self.existing(name)
            .map(|slot| slot.state())
            .unwrap_or_default()
    }

    /// Every loaded module, ordered by name.
    pub fn loaded(&self) -> Vec<Arc<LoadedModule>> {
        let slots = self.slots.lock();
        let mut modules: Vec<Arc<LoadedModule>> =
            slots.values().filter_map(|s| s.module.get().cloned()).collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    /// Number of loaded modules.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|s| s.module.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_shared_by_normalized_name() {
        let cache = LoaderCache::new();
        let a = cache.slot(&"Foo_Bar".into());
        let b = cache.slot(&"foo-bar".into());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn module_cell_is_write_once() {
        let cache = LoaderCache::new();
        let name: PackageName = "pkg".into();
        let slot = cache.slot(&name);

        let first = slot
            .module
            .get_or_init(|| async { Arc::new(LoadedModule::provided("pkg".into())) })
            .await
            .clone();
        let second = slot
            .module
            .get_or_init(|| async { Arc::new(LoadedModule::provided("pkg".into())) })
            .await
            .clone();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&cache.get(&name).unwrap(), &first));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.loaded().len(), 1);
    }

    #[tokio::test]
    async fn failed_init_leaves_cell_empty() {
        let cache = LoaderCache::new();
        let slot = cache.slot(&"pkg".into());
        let result: Result<_, &str> = slot
            .module
            .get_or_try_init(|| async { Err("boom") })
            .await;
        assert!(result.is_err());
        assert!(cache.get(&"pkg".into()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn state_transitions() {
        let cache = LoaderCache::new();
        let name: PackageName = "pkg".into();
        assert_eq!(cache.state(&name), LoadState::NotRequested);

        let slot = cache.slot(&name);
        slot.transition(&name, LoadState::Fetching);
        assert_eq!(cache.state(&name), LoadState::Fetching);
        slot.transition(&name, LoadState::Loaded);
        // Loaded is final.
        slot.transition(&name, LoadState::Failed("late".into()));
        assert_eq!(cache.state(&name), LoadState::Loaded);
    }

    #[test]
    fn conditional_transition() {
        let cache = LoaderCache::new();
        let name: PackageName = "pkg".into();
        let slot = cache.slot(&name);

        slot.transition(&name, LoadState::Loading);
        slot.transition_from(&name, &LoadState::DependencyResolving, LoadState::Resolved);
        assert_eq!(cache.state(&name), LoadState::Loading);

        slot.transition(&name, LoadState::DependencyResolving);
        slot.transition_from(&name, &LoadState::DependencyResolving, LoadState::Resolved);
        assert_eq!(cache.state(&name), LoadState::Resolved);
    }
}

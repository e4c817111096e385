//! The loader entry point.
//!
//! `Loader::load(name, constraint)` returns the package as a shared
//! [`LoadedModule`], loading it and its dependencies on first use:
//!
//! 1. fetch the root (locate, download, extract, read metadata); a failure
//!    here fails the load
//! 2. walk `Requires-Dist` edges; dependency failures become warnings
//! 3. execute packages in post-order, dependencies first
//!
//! Fetching and execution each go through a write-once cell per package
//! name, so concurrent loads of one name share the work. The dependency
//! walk runs outside both cells; no cell initialiser ever waits on another
//! cell, which keeps cyclic graphs from deadlocking.

use std::sync::Arc;

use async_trait::async_trait;
use slab_registry::{
    extract, parse_metadata, EntryRole, PackageName, PackageSource, RegistryError,
    ResolvedDependency, VersionConstraint,
};

use crate::cache::{FetchedPackage, LoaderCache};
use crate::error::{LoadError, Result};
use crate::host::ModuleHost;
use crate::module::{EntryReport, EntryStatus, LoadedModule};
use crate::resolver::{self, DependencyFetcher, Resolution};
use crate::state::LoadState;

/// A load result with everything learned along the way.
#[derive(Debug)]
pub struct LoadReport {
    pub module: Arc<LoadedModule>,
    /// Dependency edges, load order, and soft failures. Holds only the root
    /// when the module was already loaded.
    pub resolution: Resolution,
}

impl LoadReport {
    pub fn warnings(&self) -> &[LoadError] {
        &self.resolution.warnings
    }
}

/// How the root artifact is chosen.
#[derive(Clone, Copy)]
enum Target<'a> {
    Constraint(&'a VersionConstraint),
    Key(&'a str),
}

/// Loads packages from a [`PackageSource`] into a [`ModuleHost`].
///
/// Each loader owns its cache; two loaders share nothing.
pub struct Loader {
    source: Arc<dyn PackageSource>,
    host: Arc<dyn ModuleHost>,
    cache: LoaderCache,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("source", &self.source.kind())
            .field("cache", &self.cache)
            .finish()
    }
}

impl Loader {
    pub fn new(source: Arc<dyn PackageSource>, host: Arc<dyn ModuleHost>) -> Self {
        Loader {
            source,
            host,
            cache: LoaderCache::new(),
        }
    }

    pub fn cache(&self) -> &LoaderCache {
        &self.cache
    }

    pub fn host(&self) -> &dyn ModuleHost {
        self.host.as_ref()
    }

    /// Load `name`, or return the module loaded earlier.
    ///
    /// `constraint` only matters for the first load of a name; one version
    /// per name is kept.
    pub async fn load(
        &self,
        name: impl Into<PackageName>,
        constraint: Option<VersionConstraint>,
    ) -> Result<Arc<LoadedModule>> {
        Ok(self.load_with_report(name, constraint).await?.module)
    }

    /// Like [`Loader::load`], also returning dependency edges and warnings.
    pub async fn load_with_report(
        &self,
        name: impl Into<PackageName>,
        constraint: Option<VersionConstraint>,
    ) -> Result<LoadReport> {
        let constraint = constraint.unwrap_or_default();
        self.load_target(name.into(), Target::Constraint(&constraint))
            .await
    }

    /// Load `name` from an explicit object key instead of searching for it.
    pub async fn load_key(&self, name: impl Into<PackageName>, key: &str) -> Result<LoadReport> {
        self.load_target(name.into(), Target::Key(key)).await
    }

    /// Fetch `name` and walk its dependencies without executing anything.
    ///
    /// Packages fetched here rest at [`LoadState::Resolved`] until loaded.
    pub async fn resolve(
        &self,
        name: impl Into<PackageName>,
        constraint: Option<VersionConstraint>,
    ) -> Result<Resolution> {
        let name = name.into();
        let constraint = constraint.unwrap_or_default();
        let root = self.fetch(&name, Target::Constraint(&constraint)).await?;
        let resolution = resolver::resolve(self, &name, &root).await;
        for package in &resolution.order {
            self.cache.slot(package).transition_from(
                package,
                &LoadState::DependencyResolving,
                LoadState::Resolved,
            );
        }
        Ok(resolution)
    }

    /// Current state of `name`.
    pub fn state(&self, name: impl Into<PackageName>) -> LoadState {
        self.cache.state(&name.into())
    }

    pub fn is_loaded(&self, name: impl Into<PackageName>) -> bool {
        self.cache.is_loaded(&name.into())
    }

    /// Every module loaded so far.
    pub fn loaded(&self) -> Vec<Arc<LoadedModule>> {
        self.cache.loaded()
    }

    async fn load_target(&self, name: PackageName, target: Target<'_>) -> Result<LoadReport> {
        if name.is_empty() {
            return Err(RegistryError::PackageNotFound {
                name: name.to_string(),
            }
            .into());
        }
        if let Some(module) = self.cache.get(&name) {
            tracing::debug!(package = %name, "already loaded");
            return Ok(LoadReport {
                module,
                resolution: Resolution::single(name),
            });
        }

        if self.host.provides(&name) {
            let module = self.materialize(&name).await?;
            return Ok(LoadReport {
                module,
                resolution: Resolution::single(name),
            });
        }

        let root = match self.fetch(&name, target).await {
            Ok(root) => root,
            Err(e) => {
                tracing::error!(package = %name, error = %e, "load failed");
                return Err(e.into());
            }
        };

        let slot = self.cache.slot(&name);
        slot.transition(&name, LoadState::DependencyResolving);
        let mut resolution = resolver::resolve(self, &name, &root).await;

        for package in &resolution.order {
            if *package == name {
                continue;
            }
            if let Err(e) = self.materialize(package).await {
                tracing::warn!(package = %package, error = %e, "dependency failed to load");
                resolution
                    .warnings
                    .push(LoadError::dependency(package.as_str(), name.as_str(), e));
            }
        }

        let module = match self.materialize(&name).await {
            Ok(module) => module,
            Err(e) => {
                tracing::error!(package = %name, error = %e, "load failed");
                return Err(e);
            }
        };

        tracing::info!(
            package = %name,
            version = module.version.as_deref().unwrap_or("unknown"),
            dependencies = resolution.order.len().saturating_sub(1),
            warnings = resolution.warnings.len(),
            partial = module.is_partial(),
            "loaded package"
        );
        Ok(LoadReport { module, resolution })
    }

    /// Locate, download, and read `name`, once per loader.
    async fn fetch(
        &self,
        name: &PackageName,
        target: Target<'_>,
    ) -> std::result::Result<Arc<FetchedPackage>, RegistryError> {
        let slot = self.cache.slot(name);
        let result = slot
            .fetched
            .get_or_try_init(|| async {
                slot.transition(name, LoadState::Resolving);
                let artifact = match target {
                    Target::Constraint(constraint) => {
                        self.source.locate(name, constraint).await?
                    }
                    Target::Key(key) => self.source.locate_key(name, key).await?,
                };

                slot.transition(name, LoadState::Fetching);
                let bytes = self.source.fetch(&artifact).await?;

                slot.transition(name, LoadState::Extracting);
                let contents = extract(&bytes)?;
                let metadata = parse_metadata(&contents)?;
                tracing::debug!(
                    package = %name,
                    artifact = %artifact.filename,
                    entries = contents.len(),
                    requires = metadata.requires_dist.len(),
                    "fetched package"
                );
                Ok::<_, RegistryError>(Arc::new(FetchedPackage {
                    artifact,
                    contents,
                    metadata,
                }))
            })
            .await;

        match result {
            Ok(package) => {
                // The walk over its `Requires-Dist` edges comes next.
                slot.transition_from(name, &LoadState::Extracting, LoadState::DependencyResolving);
                Ok(Arc::clone(package))
            }
            Err(e) => {
                slot.transition(name, LoadState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Execute a fetched package in the host, once per loader.
    ///
    /// A host failure marks the package `Failed` and leaves the module cell
    /// empty.
    async fn materialize(&self, name: &PackageName) -> Result<Arc<LoadedModule>> {
        let slot = self.cache.slot(name);
        let result = slot
            .module
            .get_or_try_init(|| async {
                if self.host.provides(name) {
                    tracing::debug!(package = %name, "provided by host");
                    return Ok(Arc::new(LoadedModule::provided(name.clone())));
                }
                let fetched = slot.fetched.get().cloned().ok_or_else(|| LoadError::HostFailure {
                    package: name.to_string(),
                    detail: "package has not been fetched".to_string(),
                })?;
                slot.transition(name, LoadState::Loading);
                self.execute(name, &fetched).map(Arc::new)
            })
            .await;

        match result {
            Ok(module) => {
                slot.transition(name, LoadState::Loaded);
                Ok(Arc::clone(module))
            }
            Err(e) => {
                slot.transition(name, LoadState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn execute(&self, name: &PackageName, fetched: &FetchedPackage) -> Result<LoadedModule> {
        let mut namespace = self.host.create_namespace(name)?;
        let mut entries = Vec::new();
        for entry in fetched.contents.entries() {
            let outcome = match entry.role {
                EntryRole::Code => namespace.execute(entry).map(|()| EntryStatus::Executed),
                EntryRole::NativeBinary => {
                    namespace.attach_native(entry).map(|()| EntryStatus::Attached)
                }
                EntryRole::Metadata => continue,
            };
            let status = outcome.unwrap_or_else(|e| {
                tracing::warn!(package = %name, path = %entry.path, error = %e, "entry failed");
                EntryStatus::Failed(e)
            });
            entries.push(EntryReport {
                path: entry.path.clone(),
                role: entry.role,
                status,
            });
        }
        let handle = namespace.finish()?;

        Ok(LoadedModule {
            name: name.clone(),
            version: fetched.version().map(str::to_string),
            artifact: Some(fetched.artifact.clone()),
            handle,
            entries,
        })
    }
}

#[async_trait]
impl DependencyFetcher for Loader {
    async fn fetch_dependency(
        &self,
        dependency: &ResolvedDependency,
    ) -> std::result::Result<Arc<FetchedPackage>, RegistryError> {
        self.fetch(&dependency.name, Target::Constraint(&dependency.constraint))
            .await
    }

    fn is_settled(&self, name: &PackageName) -> bool {
        self.cache.is_loaded(name) || self.host.provides(name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::host::{Namespace, StagingHost};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use slab_registry::{ArchiveEntry, ArtifactDescriptor, Location};
    use std::collections::HashMap;
    use std::io::{Cursor, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use zip::write::SimpleFileOptions;

    /// Build a wheel-shaped ZIP with a METADATA entry.
    pub(crate) fn wheel(name: &str, version: &str, requires: &[&str], files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut metadata = format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n");
        for req in requires {
            metadata.push_str(&format!("Requires-Dist: {req}\n"));
        }
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (path, data) in files {
            writer.start_file(*path, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer
            .start_file(format!("{name}-{version}.dist-info/METADATA"), options)
            .unwrap();
        writer.write_all(metadata.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// In-memory package source that counts calls.
    #[derive(Default)]
    pub(crate) struct MemorySource {
        packages: HashMap<PackageName, Vec<u8>>,
        pub(crate) locates: AtomicUsize,
        pub(crate) fetches: Mutex<Vec<String>>,
        failures_left: AtomicUsize,
        delay: Duration,
    }

    impl MemorySource {
        pub(crate) fn with(mut self, name: &str, requires: &[&str]) -> Self {
            let module = name.replace('-', "_");
            let init = format!("{module}/__init__.py");
            let bytes = wheel(name, "1.0.0", requires, &[(init.as_str(), b"VALUE = 1\n")]);
            self.packages.insert(name.into(), bytes);
            self
        }

        pub(crate) fn with_wheel(mut self, name: &str, bytes: Vec<u8>) -> Self {
            self.packages.insert(name.into(), bytes);
            self
        }

        fn failing_first(self, failures: usize) -> Self {
            self.failures_left.store(failures, Ordering::SeqCst);
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn fetch_count(&self, name: &str) -> usize {
            self.fetches.lock().iter().filter(|n| n.as_str() == name).count()
        }
    }

    #[async_trait]
    impl PackageSource for MemorySource {
        fn kind(&self) -> &'static str {
            "memory"
        }

        async fn locate(
            &self,
            name: &PackageName,
            _constraint: &VersionConstraint,
        ) -> slab_registry::Result<ArtifactDescriptor> {
            self.locates.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(RegistryError::RegistryUnavailable {
                    name: name.to_string(),
                    detail: "simulated outage".into(),
                });
            }
            if !self.packages.contains_key(name) {
                return Err(RegistryError::PackageNotFound {
                    name: name.to_string(),
                });
            }
            let key = name.key().replace('-', "_");
            Ok(ArtifactDescriptor::from_filename(
                name.clone(),
                &format!("{key}-1.0.0-py3-none-any.whl"),
                Location::Key(name.key().to_string()),
            ))
        }

        async fn fetch(&self, artifact: &ArtifactDescriptor) -> slab_registry::Result<Bytes> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.fetches.lock().push(artifact.package.key().to_string());
            Ok(Bytes::from(self.packages[&artifact.package].clone()))
        }
    }

    /// Staging host that records every namespace it creates.
    pub(crate) struct RecordingHost {
        inner: StagingHost,
        pub(crate) namespaces: Mutex<Vec<String>>,
        refuse: Vec<PackageName>,
    }

    impl RecordingHost {
        pub(crate) fn new(preinstalled: &[&str]) -> Self {
            RecordingHost {
                inner: StagingHost::new()
                    .unwrap()
                    .with_preinstalled(preinstalled.iter().copied()),
                namespaces: Mutex::new(Vec::new()),
                refuse: Vec::new(),
            }
        }

        /// Fail `create_namespace` for `name`.
        pub(crate) fn refusing(mut self, name: &str) -> Self {
            self.refuse.push(name.into());
            self
        }
    }

    impl ModuleHost for RecordingHost {
        fn provides(&self, name: &PackageName) -> bool {
            self.inner.provides(name)
        }

        fn create_namespace(&self, name: &PackageName) -> Result<Box<dyn Namespace>> {
            if self.refuse.contains(name) {
                return Err(LoadError::HostFailure {
                    package: name.to_string(),
                    detail: "namespace refused".into(),
                });
            }
            self.namespaces.lock().push(name.key().to_string());
            self.inner.create_namespace(name)
        }
    }

    fn setup(source: MemorySource, host: RecordingHost) -> (Loader, Arc<MemorySource>, Arc<RecordingHost>) {
        let source = Arc::new(source);
        let host = Arc::new(host);
        let loader = Loader::new(source.clone(), host.clone());
        (loader, source, host)
    }

    #[tokio::test]
    async fn second_load_returns_same_module() {
        let (loader, source, host) =
            setup(MemorySource::default().with("pkg", &[]), RecordingHost::new(&[]));

        let first = loader.load("pkg", None).await.unwrap();
        let second = loader.load("PKG", None).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.locates.load(Ordering::SeqCst), 1);
        assert_eq!(source.fetch_count("pkg"), 1);
        assert_eq!(*host.namespaces.lock(), vec!["pkg"]);
        assert_eq!(loader.state("pkg"), LoadState::Loaded);
        assert_eq!(first.version.as_deref(), Some("1.0.0"));
        assert!(matches!(first.entries[0].status, EntryStatus::Executed));
    }

    #[tokio::test]
    async fn dependencies_load_first() {
        let (loader, _source, host) = setup(
            MemorySource::default()
                .with("app", &["web>=1.0", "db"])
                .with("web", &["util"])
                .with("db", &["util"])
                .with("util", &[]),
            RecordingHost::new(&[]),
        );

        let report = loader.load_with_report("app", None).await.unwrap();
        assert!(report.warnings().is_empty());
        assert_eq!(*host.namespaces.lock(), vec!["util", "web", "db", "app"]);
        for name in ["app", "web", "db", "util"] {
            assert!(loader.is_loaded(name), "{name} should be loaded");
        }
        assert_eq!(loader.loaded().len(), 4);
    }

    #[tokio::test]
    async fn cycles_load_each_package_once() {
        let (loader, source, host) = setup(
            MemorySource::default().with("a", &["b"]).with("b", &["a"]),
            RecordingHost::new(&[]),
        );

        loader.load("a", None).await.unwrap();
        assert!(loader.is_loaded("b"));
        assert_eq!(*host.namespaces.lock(), vec!["b", "a"]);
        assert_eq!(source.fetch_count("a"), 1);
        assert_eq!(source.fetch_count("b"), 1);

        // b is already loaded; loading it again does nothing new.
        loader.load("b", None).await.unwrap();
        assert_eq!(host.namespaces.lock().len(), 2);
    }

    #[tokio::test]
    async fn missing_dependency_is_soft() {
        let (loader, _source, _host) = setup(
            MemorySource::default().with("app", &["ghost", "six"]).with("six", &[]),
            RecordingHost::new(&[]),
        );

        let report = loader.load_with_report("app", None).await.unwrap();
        assert_eq!(report.warnings().len(), 1);
        assert!(matches!(
            &report.warnings()[0],
            LoadError::DependencyLoadFailed { name, .. } if name == "ghost"
        ));
        assert!(loader.is_loaded("six"));
        assert!(!loader.is_loaded("ghost"));
        assert!(matches!(loader.state("ghost"), LoadState::Failed(_)));
    }

    #[tokio::test]
    async fn dependency_host_failure_is_soft_and_terminal() {
        let (loader, _source, host) = setup(
            MemorySource::default()
                .with("app", &["dep", "six"])
                .with("dep", &[])
                .with("six", &[]),
            RecordingHost::new(&[]).refusing("dep"),
        );

        let report = loader.load_with_report("app", None).await.unwrap();
        assert_eq!(report.warnings().len(), 1);
        let LoadError::DependencyLoadFailed {
            name,
            required_by,
            source,
        } = &report.warnings()[0]
        else {
            panic!("unexpected warning: {:?}", report.warnings()[0]);
        };
        assert_eq!(name, "dep");
        assert_eq!(required_by, "app");
        assert!(matches!(source.as_ref(), LoadError::HostFailure { .. }));

        assert!(matches!(loader.state("dep"), LoadState::Failed(_)));
        assert!(!loader.is_loaded("dep"));
        assert_eq!(loader.state("six"), LoadState::Loaded);
        assert_eq!(loader.state("app"), LoadState::Loaded);
        assert_eq!(*host.namespaces.lock(), vec!["six", "app"]);
    }

    #[tokio::test]
    async fn root_host_failure_is_hard_and_terminal() {
        let (loader, _source, _host) = setup(
            MemorySource::default().with("app", &[]),
            RecordingHost::new(&[]).refusing("app"),
        );

        let err = loader.load("app", None).await.unwrap_err();
        assert!(matches!(err, LoadError::HostFailure { .. }));
        assert!(matches!(loader.state("app"), LoadState::Failed(_)));
    }

    #[tokio::test]
    async fn missing_root_is_hard() {
        let (loader, _source, _host) =
            setup(MemorySource::default(), RecordingHost::new(&[]));
        let err = loader.load("nope", None).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Registry(RegistryError::PackageNotFound { .. })
        ));
        assert!(matches!(loader.state("nope"), LoadState::Failed(_)));
        assert!(loader.cache().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_can_be_retried() {
        let (loader, source, _host) = setup(
            MemorySource::default().with("pkg", &[]).failing_first(1),
            RecordingHost::new(&[]),
        );

        let err = loader.load("pkg", None).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Registry(RegistryError::RegistryUnavailable { .. })
        ));
        loader.load("pkg", None).await.unwrap();
        assert_eq!(source.locates.load(Ordering::SeqCst), 2);
        assert_eq!(loader.state("pkg"), LoadState::Loaded);
    }

    #[tokio::test]
    async fn host_provided_packages_are_not_fetched() {
        let (loader, source, host) = setup(
            MemorySource::default().with("app", &["json", "six"]).with("six", &[]),
            RecordingHost::new(&["json"]),
        );

        loader.load("app", None).await.unwrap();
        let json = loader.cache().get(&"json".into()).unwrap();
        assert!(json.is_provided());
        assert_eq!(source.fetch_count("json"), 0);
        assert_eq!(*host.namespaces.lock(), vec!["six", "app"]);

        let direct = loader.load("json", None).await.unwrap();
        assert!(Arc::ptr_eq(&direct, &json));
    }

    #[tokio::test]
    async fn broken_entry_makes_partial_module() {
        let bytes = wheel(
            "pkg",
            "2.0",
            &[],
            &[
                ("pkg/__init__.py", b"A = 1\n"),
                ("pkg/broken.py", &[0xff, 0xfe, 0x00]),
                ("pkg/_speed.so", &[0x7f, b'E', b'L', b'F']),
                ("pkg/util.py", b"B = 2\n"),
            ],
        );
        let (loader, _source, _host) = setup(
            MemorySource::default().with_wheel("pkg", bytes),
            RecordingHost::new(&[]),
        );

        let module = loader.load("pkg", None).await.unwrap();
        assert!(module.is_partial());
        assert_eq!(module.version.as_deref(), Some("2.0"));
        let statuses: Vec<(&str, bool)> = module
            .entries
            .iter()
            .map(|e| (e.path.as_str(), e.status.is_failed()))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("pkg/__init__.py", false),
                ("pkg/broken.py", true),
                ("pkg/_speed.so", false),
                ("pkg/util.py", false),
            ]
        );
        assert!(matches!(module.entries[2].status, EntryStatus::Attached));
        let root = module.handle.root().unwrap();
        assert!(root.join("pkg/util.py").is_file());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_loads_collapse() {
        let (loader, source, host) = setup(
            MemorySource::default()
                .with("pkg", &["dep"])
                .with("dep", &[])
                .slow(Duration::from_millis(20)),
            RecordingHost::new(&[]),
        );
        let loader = Arc::new(loader);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let loader = Arc::clone(&loader);
                tokio::spawn(async move { loader.load("pkg", None).await.unwrap() })
            })
            .collect();
        let modules: Vec<Arc<LoadedModule>> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        for module in &modules[1..] {
            assert!(Arc::ptr_eq(module, &modules[0]));
        }
        assert_eq!(source.fetch_count("pkg"), 1);
        assert_eq!(source.fetch_count("dep"), 1);
        assert_eq!(*host.namespaces.lock(), vec!["dep", "pkg"]);
    }

    #[tokio::test]
    async fn concurrent_cyclic_loads_finish() {
        let (loader, source, _host) = setup(
            MemorySource::default()
                .with("a", &["b"])
                .with("b", &["a"])
                .slow(Duration::from_millis(10)),
            RecordingHost::new(&[]),
        );

        let (a, b) = tokio::join!(loader.load("a", None), loader.load("b", None));
        a.unwrap();
        b.unwrap();
        assert_eq!(source.fetch_count("a"), 1);
        assert_eq!(source.fetch_count("b"), 1);
    }

    #[tokio::test]
    async fn resolve_does_not_execute() {
        let (loader, _source, host) = setup(
            MemorySource::default().with("app", &["six"]).with("six", &[]),
            RecordingHost::new(&[]),
        );

        let resolution = loader.resolve("app", None).await.unwrap();
        let order: Vec<&str> = resolution.order.iter().map(|n| n.as_str()).collect();
        assert_eq!(order, vec!["six", "app"]);
        assert!(host.namespaces.lock().is_empty());
        assert!(!loader.is_loaded("app"));
        assert!(loader.cache().fetched(&"six".into()).is_some());
        assert_eq!(loader.state("app"), LoadState::Resolved);
        assert_eq!(loader.state("six"), LoadState::Resolved);

        // Loading afterwards reuses the fetched packages.
        loader.load("app", None).await.unwrap();
        assert_eq!(loader.state("six"), LoadState::Loaded);
        assert_eq!(*host.namespaces.lock(), vec!["six", "app"]);
    }

    #[tokio::test]
    async fn resolve_leaves_nothing_in_progress() {
        let (loader, _source, _host) = setup(
            MemorySource::default().with("app", &["mid"]).with("mid", &["leaf"]).with("leaf", &[]),
            RecordingHost::new(&[]),
        );

        loader.resolve("app", None).await.unwrap();
        for name in ["app", "mid", "leaf"] {
            let state = loader.state(name);
            assert!(!state.is_in_progress(), "{name} left at {state}");
        }
    }

    #[tokio::test]
    async fn sources_without_keys_reject_load_key() {
        let (loader, _source, _host) =
            setup(MemorySource::default().with("pkg", &[]), RecordingHost::new(&[]));
        let err = loader.load_key("pkg", "wheels/pkg.whl").await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Registry(RegistryError::DownloadFailed { .. })
        ));
    }

    #[test]
    fn archive_entries_round_trip_through_wheel_helper() {
        let bytes = wheel("x", "1", &["y"], &[("x/__init__.py", b"")]);
        let contents = extract(&bytes).unwrap();
        let entries: Vec<&ArchiveEntry> = contents.entries().iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(parse_metadata(&contents).unwrap().requires_dist, vec!["y"]);
    }
}

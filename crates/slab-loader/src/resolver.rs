//! Dependency resolution.
//!
//! Depth-first walk over `Requires-Dist` edges starting at an already
//! fetched root. Each package name is visited at most once per walk, so
//! cycles terminate. Dependency failures never abort the walk: they are
//! recorded as warnings and the remaining siblings continue.
//!
//! The walk yields a post-order load order (dependencies before the
//! packages that need them, the root last).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use slab_registry::{parse_specifier, PackageName, RegistryError, ResolvedDependency};

use crate::cache::FetchedPackage;
use crate::error::LoadError;

/// What the resolver needs from the loader.
#[async_trait]
pub trait DependencyFetcher: Send + Sync {
    /// Fetch (or reuse) the package for a dependency.
    async fn fetch_dependency(
        &self,
        dependency: &ResolvedDependency,
    ) -> Result<Arc<FetchedPackage>, RegistryError>;

    /// Whether `name` needs no fetch: already loaded, or provided by the
    /// module host.
    fn is_settled(&self, name: &PackageName) -> bool;
}

/// The outcome of one walk.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Every dependency edge discovered, in discovery order, deduplicated.
    pub resolved: Vec<ResolvedDependency>,
    /// Packages to load, dependencies first.
    pub order: Vec<PackageName>,
    /// Soft failures.
    pub warnings: Vec<LoadError>,
}

impl Resolution {
    /// A resolution that only contains `root`.
    pub fn single(root: PackageName) -> Self {
        Resolution {
            order: vec![root],
            ..Default::default()
        }
    }
}

struct Frame {
    name: PackageName,
    pending: std::vec::IntoIter<ResolvedDependency>,
}

/// Walk the dependency graph below `root`.
pub async fn resolve(
    fetcher: &dyn DependencyFetcher,
    root: &PackageName,
    root_package: &FetchedPackage,
) -> Resolution {
    let mut resolution = Resolution::default();
    let mut visited: HashSet<PackageName> = HashSet::new();
    let mut seen_edges: HashSet<ResolvedDependency> = HashSet::new();

    visited.insert(root.clone());
    let mut stack = vec![Frame {
        name: root.clone(),
        pending: dependencies_of(root, root_package, &mut resolution.warnings).into_iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(dependency) = frame.pending.next() else {
            resolution.order.push(frame.name.clone());
            stack.pop();
            continue;
        };
        let parent = frame.name.clone();

        if seen_edges.insert(dependency.clone()) {
            resolution.resolved.push(dependency.clone());
        }
        if !visited.insert(dependency.name.clone()) {
            continue;
        }
        if fetcher.is_settled(&dependency.name) {
            tracing::debug!(package = %dependency.name, "dependency already available");
            resolution.order.push(dependency.name.clone());
            continue;
        }

        match fetcher.fetch_dependency(&dependency).await {
            Ok(package) => {
                let pending =
                    dependencies_of(&dependency.name, &package, &mut resolution.warnings);
                stack.push(Frame {
                    name: dependency.name.clone(),
                    pending: pending.into_iter(),
                });
            }
            Err(source) => {
                tracing::warn!(
                    package = %dependency.name,
                    required_by = %parent,
                    error = %source,
                    "dependency could not be loaded"
                );
                resolution.warnings.push(LoadError::dependency(
                    dependency.name.as_str(),
                    parent.as_str(),
                    source,
                ));
            }
        }
    }

    tracing::debug!(
        root = %root,
        packages = resolution.order.len(),
        warnings = resolution.warnings.len(),
        "resolved dependencies"
    );
    resolution
}

/// Parse a package's `Requires-Dist` lines. Unparseable specifiers become
/// warnings.
fn dependencies_of(
    name: &PackageName,
    package: &FetchedPackage,
    warnings: &mut Vec<LoadError>,
) -> Vec<ResolvedDependency> {
    let mut dependencies = Vec::new();
    for spec in &package.metadata.requires_dist {
        match parse_specifier(spec) {
            Ok(dependency) if dependency.name.is_empty() => {
                tracing::debug!(package = %name, specifier = %spec, "specifier has no name");
            }
            Ok(dependency) => dependencies.push(dependency),
            Err(source) => {
                tracing::warn!(package = %name, specifier = %spec, error = %source, "skipping dependency");
                warnings.push(LoadError::dependency(spec.as_str(), name.as_str(), source));
            }
        }
    }
    dependencies
}

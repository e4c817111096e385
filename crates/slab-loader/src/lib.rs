//! Load remote packages into a running process.
//!
//! A [`Loader`] fetches a package from its [`PackageSource`], walks the
//! package's dependencies, and executes everything in a [`ModuleHost`],
//! dependencies first. Results are cached per loader: a package is fetched
//! and executed at most once, and concurrent requests for the same name
//! share one load.
//!
//! ```no_run
//! # async fn run() -> slab_loader::Result<()> {
//! let loader = slab_loader::LoaderConfig::default().build()?;
//! let module = loader.load("requests", None).await?;
//! println!("{} {:?}", module.name, module.version);
//! # Ok(())
//! # }
//! ```
//!
//! [`PackageSource`]: slab_registry::PackageSource

pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod module;
pub mod resolver;
pub mod state;

// Re-exports for convenience.
pub use cache::{FetchedPackage, LoaderCache};
pub use config::{Backend, LoaderConfig};
pub use error::{LoadError, Result};
pub use host::{ModuleHost, Namespace, StagingHost};
pub use loader::{LoadReport, Loader};
pub use module::{EntryReport, EntryStatus, LoadedModule, ModuleHandle};
pub use resolver::{DependencyFetcher, Resolution};
pub use state::LoadState;

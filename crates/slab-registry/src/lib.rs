//! Package index client and artifact handling for slab.
//!
//! Locates wheel artifacts for a package, downloads them, and parses their
//! contents. Two package sources share one interface:
//! - **Index**: a JSON package index queried over HTTP; artifacts are
//!   fetched by URL and matched against the host's platform tags
//! - **Bucket**: an object store prefix; the most recently modified
//!   object for the package is fetched
//!
//! Downloaded archives are split by role (code, native binaries, metadata)
//! and the embedded metadata yields the package's dependency specifiers.

pub mod archive;
pub mod client;
pub mod constraint;
pub mod error;
pub mod integrity;
pub mod metadata;
pub mod package;
pub mod retry;
pub mod source;
pub mod store;
pub mod version;

// Re-exports for convenience.
pub use archive::{extract, ArchiveContents, ArchiveEntry, EntryRole};
pub use client::{build_http_client, PackageIndex, RegistryClient, DEFAULT_INDEX_URL};
pub use constraint::{parse_specifier, ResolvedDependency, VersionConstraint};
pub use error::{RegistryError, Result};
pub use integrity::ContentHash;
pub use metadata::{parse_metadata, PackageMetadata};
pub use package::{ArtifactDescriptor, Location, PackageName};
pub use retry::RetryPolicy;
pub use source::{BucketSource, IndexSource, PackageSource};
pub use store::{pick_latest, ArtifactStore, BucketStore, HttpStore, ObjectEntry};
pub use version::{parse_version, Version};

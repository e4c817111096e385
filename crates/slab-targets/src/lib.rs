//! Host platform model and artifact compatibility matching for slab.
//!
//! A wheel artifact is usable on the current host when its filename carries
//! both the host's platform tag and the configured interpreter tag:
//! - **Platform tag:** operating system + architecture, e.g. `manylinux2014_x86_64`
//! - **Interpreter tag:** runtime implementation + version, e.g. `cp311`
//!
//! [`HostPlatform`] derives the platform tag from the running OS, and
//! [`CompatibilityMatcher`] picks the first matching candidate.

pub mod compat;
pub mod error;
pub mod platform;

pub use compat::{Candidate, CompatibilityMatcher, WheelName};
pub use error::{Result, TargetError};
pub use platform::{HostPlatform, InterpreterTag, OsFamily, PlatformTag, TargetTags};

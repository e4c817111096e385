//! Package identity and artifact descriptors.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use slab_targets::{Candidate, WheelName};

/// A package name.
///
/// Keeps the spelling it was created with for display, and compares by a
/// normalized key: lowercase, with every run of `-`, `_`, and `.` collapsed
/// to a single `-`. `Foo_Bar`, `foo-bar`, and `foo.bar` are the same package.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PackageName {
    display: String,
    key: String,
}

impl PackageName {
    pub fn new(name: impl Into<String>) -> Self {
        let display = name.into().trim().to_string();
        let key = normalize(&display);
        PackageName { display, key }
    }

    /// The name as it was written.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The normalized comparison key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator_run = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator_run {
                out.push('-');
            }
            in_separator_run = true;
        } else {
            out.extend(c.to_lowercase());
            in_separator_run = false;
        }
    }
    out
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        PackageName::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        PackageName::new(s)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.display
    }
}

/// Where an artifact's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    /// Fetched over HTTP(S).
    Url(String),
    /// An object key in the configured bucket.
    Key(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Url(url) => f.write_str(url),
            Location::Key(key) => write!(f, "key:{key}"),
        }
    }
}

/// One downloadable artifact of a package release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Package the artifact belongs to.
    pub package: PackageName,
    /// Release version (from the index key or the wheel filename).
    pub version: Option<String>,
    /// Artifact filename.
    pub filename: String,
    /// Platform tag parsed from a wheel filename.
    pub platform_tag: Option<String>,
    /// Interpreter tag parsed from a wheel filename.
    pub interpreter_tag: Option<String>,
    /// Where to fetch the artifact from.
    pub location: Location,
    /// Expected SHA-256 hex digest, when the index publishes one.
    pub sha256: Option<String>,
}

impl ArtifactDescriptor {
    /// Describe an artifact from its filename, filling tags from the wheel
    /// naming convention when the filename follows it.
    pub fn from_filename(package: PackageName, filename: &str, location: Location) -> Self {
        let base = filename.rsplit('/').next().unwrap_or(filename).to_string();
        let wheel = WheelName::parse(&base);
        ArtifactDescriptor {
            package,
            version: wheel.as_ref().map(|w| w.version.clone()),
            platform_tag: wheel.as_ref().map(|w| w.platform.clone()),
            interpreter_tag: wheel.as_ref().map(|w| w.python.clone()),
            filename: base,
            location,
            sha256: None,
        }
    }

    /// Override the version (index keys are authoritative).
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_sha256(mut self, digest: Option<String>) -> Self {
        self.sha256 = digest;
        self
    }
}

impl Candidate for ArtifactDescriptor {
    fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_compare_normalized() {
        let a = PackageName::new("Foo_Bar");
        let b = PackageName::new("foo-bar");
        let c = PackageName::new("foo..bar");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.key(), "foo-bar");
        assert_eq!(a.as_str(), "Foo_Bar");

        let set: HashSet<PackageName> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn descriptor_from_wheel_filename() {
        let d = ArtifactDescriptor::from_filename(
            "numpy".into(),
            "wheels/numpy-1.26.4-cp311-cp311-manylinux2014_x86_64.whl",
            Location::Key("wheels/numpy-1.26.4-cp311-cp311-manylinux2014_x86_64.whl".into()),
        );
        assert_eq!(d.filename, "numpy-1.26.4-cp311-cp311-manylinux2014_x86_64.whl");
        assert_eq!(d.version.as_deref(), Some("1.26.4"));
        assert_eq!(d.platform_tag.as_deref(), Some("manylinux2014_x86_64"));
        assert_eq!(d.interpreter_tag.as_deref(), Some("cp311"));
    }

    #[test]
    fn descriptor_from_other_filename() {
        let d = ArtifactDescriptor::from_filename(
            "six".into(),
            "six-1.16.0.tar.gz",
            Location::Url("https://files.example/six-1.16.0.tar.gz".into()),
        );
        assert!(d.version.is_none());
        assert!(d.platform_tag.is_none());
    }

    #[test]
    fn location_display() {
        assert_eq!(Location::Key("a/b.whl".into()).to_string(), "key:a/b.whl");
        assert_eq!(Location::Url("https://x/y".into()).to_string(), "https://x/y");
    }
}

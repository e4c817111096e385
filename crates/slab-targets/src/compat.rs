//! Artifact compatibility matching.
//!
//! Selection is a substring test on the artifact filename: a candidate is
//! compatible when its filename contains both the platform tag and the
//! interpreter tag. The first compatible candidate in input order wins, so
//! selection is deterministic for a given candidate ordering.

use crate::error::{Result, TargetError};
use crate::platform::TargetTags;

/// Anything with a filename can be matched.
pub trait Candidate {
    fn filename(&self) -> &str;
}

impl Candidate for String {
    fn filename(&self) -> &str {
        self
    }
}

impl Candidate for &str {
    fn filename(&self) -> &str {
        self
    }
}

/// The components of a wheel filename.
///
/// `{distribution}-{version}(-{build})?-{python}-{abi}-{platform}.whl`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelName {
    pub distribution: String,
    pub version: String,
    pub build: Option<String>,
    pub python: String,
    pub abi: String,
    pub platform: String,
}

impl WheelName {
    /// Parse a wheel filename. Returns `None` for anything that is not a
    /// well-formed `.whl` name.
    pub fn parse(filename: &str) -> Option<Self> {
        let base = filename.rsplit('/').next().unwrap_or(filename);
        let stem = base.strip_suffix(".whl")?;
        let parts: Vec<&str> = stem.split('-').collect();
        let (distribution, version, build, rest) = match parts.as_slice() {
            [d, v, p, a, pl] => (*d, *v, None, [*p, *a, *pl]),
            [d, v, b, p, a, pl] => (*d, *v, Some(*b), [*p, *a, *pl]),
            _ => return None,
        };
        if distribution.is_empty() || version.is_empty() || rest.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(WheelName {
            distribution: distribution.to_string(),
            version: version.to_string(),
            build: build.map(str::to_string),
            python: rest[0].to_string(),
            abi: rest[1].to_string(),
            platform: rest[2].to_string(),
        })
    }

    /// Whether the wheel is pure and platform independent (`*-none-any`).
    pub fn is_universal(&self) -> bool {
        self.abi == "none" && self.platform == "any"
    }
}

/// Picks the artifact that fits the target tags.
#[derive(Debug, Clone)]
pub struct CompatibilityMatcher {
    target: TargetTags,
    accept_universal: bool,
}

impl CompatibilityMatcher {
    /// Create a matcher for the given tags.
    pub fn new(target: TargetTags) -> Self {
        CompatibilityMatcher {
            target,
            accept_universal: false,
        }
    }

    /// Fall back to the first `none-any` wheel when no tagged wheel matches.
    pub fn with_universal_fallback(mut self, accept: bool) -> Self {
        self.accept_universal = accept;
        self
    }

    pub fn target(&self) -> &TargetTags {
        &self.target
    }

    /// Whether a filename carries both target tags.
    pub fn is_compatible(&self, filename: &str) -> bool {
        filename.ends_with(".whl")
            && filename.contains(self.target.platform.as_str())
            && filename.contains(self.target.interpreter.as_str())
    }

    /// Select the first compatible candidate, preserving input order.
    pub fn select<'a, C: Candidate>(&self, package: &str, candidates: &'a [C]) -> Result<&'a C> {
        if let Some(found) = candidates.iter().find(|c| self.is_compatible(c.filename())) {
            tracing::debug!(
                package,
                filename = found.filename(),
                target = %self.target,
                "selected compatible artifact"
            );
            return Ok(found);
        }

        if self.accept_universal {
            let universal = candidates.iter().find(|c| {
                WheelName::parse(c.filename()).is_some_and(|w| w.is_universal())
            });
            if let Some(found) = universal {
                tracing::debug!(
                    package,
                    filename = found.filename(),
                    "selected universal artifact"
                );
                return Ok(found);
            }
        }

        Err(TargetError::NoCompatibleArtifact {
            package: package.to_string(),
            platform: self.target.platform.to_string(),
            interpreter: self.target.interpreter.to_string(),
            candidates: candidates.len(),
        })
    }
}

//! Dependency specifier parsing and version constraints.
//!
//! A specifier is `name [ "(" range ")" | operator version ] [ ";" marker ]`.
//! The environment marker is discarded. Operators are tested in a fixed
//! priority order (`(`, `>=`, `==`, `<=`, `>`, `<`) and the first one found
//! splits the name from the payload. A parenthesised range is kept as one
//! unsplit string.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::package::PackageName;
use crate::version::{parse_version, Version};

/// A constraint on acceptable versions of a dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionConstraint {
    /// `==payload`
    Exact(String),
    /// `>=payload`
    AtLeast(String),
    /// `<=payload`
    AtMost(String),
    /// `>payload`
    GreaterThan(String),
    /// `<payload`
    LessThan(String),
    /// No constraint.
    #[default]
    Any,
    /// A comparator list kept verbatim, e.g. `>=1.2,<2.0`.
    RawRange(String),
}

impl VersionConstraint {
    /// Parse a bare constraint such as `>=1.0` or `>=1.2,<2.0`.
    ///
    /// Used for user-supplied constraints; a leading operator determines the
    /// variant in the same priority order as specifier parsing. Anything
    /// without one of the five operators is kept as a raw range, and an
    /// empty string means [`VersionConstraint::Any`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return VersionConstraint::Any;
        }
        if s.contains(',') {
            return VersionConstraint::RawRange(s.to_string());
        }
        for (op, make) in OPERATORS {
            if let Some(payload) = s.strip_prefix(op) {
                if !payload.starts_with('=') {
                    return make(payload.trim().to_string());
                }
            }
        }
        VersionConstraint::RawRange(s.to_string())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, VersionConstraint::Any)
    }

    /// Whether `version` satisfies every comparator of this constraint.
    ///
    /// Comparators whose version cannot be parsed are ignored.
    pub fn matches(&self, version: &Version) -> bool {
        let expr = match self {
            VersionConstraint::Any => return true,
            VersionConstraint::RawRange(raw) => raw.clone(),
            other => other.to_string(),
        };
        expr.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .all(|c| comparator_matches(c, version))
    }

    /// Whether a raw version string satisfies this constraint. Unparseable
    /// versions satisfy only [`VersionConstraint::Any`].
    pub fn matches_str(&self, version: &str) -> bool {
        match parse_version(version) {
            Some(v) => self.matches(&v),
            None => self.is_any(),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Exact(v) => write!(f, "=={v}"),
            VersionConstraint::AtLeast(v) => write!(f, ">={v}"),
            VersionConstraint::AtMost(v) => write!(f, "<={v}"),
            VersionConstraint::GreaterThan(v) => write!(f, ">{v}"),
            VersionConstraint::LessThan(v) => write!(f, "<{v}"),
            VersionConstraint::Any => Ok(()),
            VersionConstraint::RawRange(raw) => f.write_str(raw),
        }
    }
}

type MakeConstraint = fn(String) -> VersionConstraint;

/// Operators in priority order.
const OPERATORS: [(&str, MakeConstraint); 5] = [
    (">=", VersionConstraint::AtLeast),
    ("==", VersionConstraint::Exact),
    ("<=", VersionConstraint::AtMost),
    (">", VersionConstraint::GreaterThan),
    ("<", VersionConstraint::LessThan),
];

/// Operators outside the five above that still delimit the name.
const EXTRA_OPERATORS: [&str; 3] = ["===", "~=", "!="];

/// A dependency: a package name plus the versions it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub name: PackageName,
    pub constraint: VersionConstraint,
}

impl ResolvedDependency {
    pub fn new(name: impl Into<PackageName>, constraint: VersionConstraint) -> Self {
        ResolvedDependency {
            name: name.into(),
            constraint,
        }
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraint.is_any() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.constraint)
        }
    }
}

/// Parse one dependency specifier.
///
/// Fails only when the specifier is empty. A specifier whose name part is
/// empty (e.g. `">=1.0"`) parses to an empty name; callers skip those.
pub fn parse_specifier(spec: &str) -> Result<ResolvedDependency> {
    if spec.trim().is_empty() {
        return Err(RegistryError::EmptySpecifier);
    }

    let spec = spec.split(';').next().unwrap_or_default().trim();

    if let Some((name, range)) = spec.split_once('(') {
        let range = range.trim().trim_end_matches(')').trim();
        let constraint = if range.is_empty() {
            VersionConstraint::Any
        } else {
            VersionConstraint::RawRange(range.to_string())
        };
        return Ok(ResolvedDependency::new(clean_name(name), constraint));
    }

    for (op, make) in OPERATORS {
        if let Some((name, payload)) = spec.split_once(op) {
            return Ok(ResolvedDependency::new(
                clean_name(name),
                make(payload.trim().to_string()),
            ));
        }
    }

    for op in EXTRA_OPERATORS {
        if let Some(at) = spec.find(op) {
            let (name, rest) = spec.split_at(at);
            return Ok(ResolvedDependency::new(
                clean_name(name),
                VersionConstraint::RawRange(rest.trim().to_string()),
            ));
        }
    }

    Ok(ResolvedDependency::new(clean_name(spec), VersionConstraint::Any))
}

/// Trim the name and drop any `[extras]` suffix.
fn clean_name(name: &str) -> String {
    let name = name.split('[').next().unwrap_or_default();
    name.trim().to_string()
}

fn comparator_matches(comparator: &str, version: &Version) -> bool {
    const OPS: [&str; 8] = ["===", "~=", "==", "!=", ">=", "<=", ">", "<"];
    let (op, rhs) = OPS
        .iter()
        .find_map(|op| comparator.strip_prefix(op).map(|rhs| (*op, rhs.trim())))
        .unwrap_or(("==", comparator.trim()));

    if let Some(prefix) = rhs.strip_suffix(".*") {
        let matched = release_prefix_matches(prefix, version);
        return match op {
            "==" => matched,
            "!=" => !matched,
            _ => true,
        };
    }

    let Some(bound) = parse_version(rhs) else {
        tracing::debug!(comparator, "ignoring comparator with unparseable version");
        return true;
    };

    match op {
        "===" | "==" => *version == bound,
        "!=" => *version != bound,
        ">=" => *version >= bound,
        "<=" => *version <= bound,
        ">" => *version > bound,
        "<" => *version < bound,
        "~=" => {
            let components = rhs.split('.').take_while(|p| !p.is_empty()).count();
            *version >= bound
                && match components {
                    0 | 1 => true,
                    2 => version.major == bound.major,
                    _ => version.major == bound.major && version.minor == bound.minor,
                }
        }
        _ => true,
    }
}

/// `1.4` matches `1.4.0`, `1.4.7`, but not `1.5.0`.
fn release_prefix_matches(prefix: &str, version: &Version) -> bool {
    let actual = [version.major, version.minor, version.patch];
    prefix
        .split('.')
        .enumerate()
        .all(|(i, part)| match (part.parse::<u64>(), actual.get(i)) {
            (Ok(want), Some(have)) => want == *have,
            (Ok(want), None) => want == 0,
            (Err(_), _) => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(spec: &str) -> (String, String) {
        let dep = parse_specifier(spec).unwrap();
        (dep.name.as_str().to_string(), dep.constraint.to_string())
    }

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    #[test]
    fn marker_is_stripped_before_operators() {
        assert_eq!(
            parsed("bar>=1.0; python_version<'3.8'"),
            ("bar".to_string(), ">=1.0".to_string())
        );
    }

    #[test]
    fn parenthesised_range_is_unsplit() {
        assert_eq!(
            parsed("foo (>=1.2,<2.0)"),
            ("foo".to_string(), ">=1.2,<2.0".to_string())
        );
        let dep = parse_specifier("foo (>=1.2,<2.0)").unwrap();
        assert_eq!(dep.constraint, VersionConstraint::RawRange(">=1.2,<2.0".into()));
    }

    #[test]
    fn operator_priority() {
        let dep = parse_specifier("a==1.0").unwrap();
        assert_eq!(dep.constraint, VersionConstraint::Exact("1.0".into()));
        let dep = parse_specifier("a<=2").unwrap();
        assert_eq!(dep.constraint, VersionConstraint::AtMost("2".into()));
        let dep = parse_specifier("a > 3").unwrap();
        assert_eq!(dep.name.as_str(), "a");
        assert_eq!(dep.constraint, VersionConstraint::GreaterThan("3".into()));
        let dep = parse_specifier("a<4").unwrap();
        assert_eq!(dep.constraint, VersionConstraint::LessThan("4".into()));
        // `>=` outranks `<` even when `<` appears first.
        let dep = parse_specifier("a<2,>=1").unwrap();
        assert_eq!(dep.name.as_str(), "a<2,");
        assert_eq!(dep.constraint, VersionConstraint::AtLeast("1".into()));
    }

    #[test]
    fn bare_name_is_any() {
        let dep = parse_specifier("  requests ").unwrap();
        assert_eq!(dep.name.as_str(), "requests");
        assert!(dep.constraint.is_any());
    }

    #[test]
    fn empty_specifier_fails() {
        assert!(matches!(parse_specifier(""), Err(RegistryError::EmptySpecifier)));
        assert!(matches!(parse_specifier("   "), Err(RegistryError::EmptySpecifier)));
    }

    #[test]
    fn extras_and_extra_operators() {
        assert_eq!(
            parsed("requests[security,socks]>=2.8"),
            ("requests".to_string(), ">=2.8".to_string())
        );
        let dep = parse_specifier("urllib3~=1.26").unwrap();
        assert_eq!(dep.name.as_str(), "urllib3");
        assert_eq!(dep.constraint, VersionConstraint::RawRange("~=1.26".into()));
        let dep = parse_specifier("idna!=3.0").unwrap();
        assert_eq!(dep.name.as_str(), "idna");
        assert_eq!(dep.constraint, VersionConstraint::RawRange("!=3.0".into()));
    }

    #[test]
    fn constraint_matching() {
        let range = VersionConstraint::RawRange(">=1.2,<2.0".into());
        assert!(range.matches(&v("1.2")));
        assert!(range.matches(&v("1.9.9")));
        assert!(!range.matches(&v("2.0")));
        assert!(!range.matches(&v("1.1")));

        assert!(VersionConstraint::Exact("1.0".into()).matches(&v("1.0.0")));
        assert!(VersionConstraint::GreaterThan("1.0".into()).matches(&v("1.0.1")));
        assert!(!VersionConstraint::LessThan("1.0".into()).matches(&v("1.0")));
        assert!(VersionConstraint::Any.matches(&v("0.0.1")));
    }

    #[test]
    fn compatible_release_and_wildcards() {
        let compat = VersionConstraint::RawRange("~=2.2".into());
        assert!(compat.matches(&v("2.9")));
        assert!(!compat.matches(&v("3.0")));
        assert!(!compat.matches(&v("2.1")));

        let compat3 = VersionConstraint::RawRange("~=1.4.5".into());
        assert!(compat3.matches(&v("1.4.9")));
        assert!(!compat3.matches(&v("1.5.0")));

        let wildcard = VersionConstraint::Exact("1.4.*".into());
        assert!(wildcard.matches(&v("1.4.7")));
        assert!(!wildcard.matches(&v("1.5.0")));

        let excluded = VersionConstraint::RawRange(">=1,!=1.5.*".into());
        assert!(excluded.matches(&v("1.6")));
        assert!(!excluded.matches(&v("1.5.2")));
    }

    #[test]
    fn unparseable_comparators_are_ignored() {
        let c = VersionConstraint::AtLeast("banana".into());
        assert!(c.matches(&v("0.1")));
    }

    #[test]
    fn parse_bare_constraints() {
        assert_eq!(VersionConstraint::parse(""), VersionConstraint::Any);
        assert_eq!(VersionConstraint::parse("*"), VersionConstraint::Any);
        assert_eq!(
            VersionConstraint::parse(">=1.0"),
            VersionConstraint::AtLeast("1.0".into())
        );
        assert_eq!(
            VersionConstraint::parse("==2.0"),
            VersionConstraint::Exact("2.0".into())
        );
        assert_eq!(
            VersionConstraint::parse("<3"),
            VersionConstraint::LessThan("3".into())
        );
        assert_eq!(
            VersionConstraint::parse(">=1,<2"),
            VersionConstraint::RawRange(">=1,<2".into())
        );
        assert_eq!(
            VersionConstraint::parse("1.0"),
            VersionConstraint::RawRange("1.0".into())
        );
        assert!(VersionConstraint::parse("1.0").matches_str("1.0.0"));
        assert!(!VersionConstraint::parse("1.0").matches_str("not-a-version"));
    }
}

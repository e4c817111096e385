//! Version parsing and ordering.
//!
//! Package versions in the wild are looser than semver (`1.0`, `2.0rc1`,
//! `1.26.4.post1`). They are normalized onto `semver::Version` so that the
//! `semver` ordering applies:
//! - missing release components are padded with zeros
//! - `devN`, `aN`, `bN`, `rcN` become pre-release identifiers, ordered
//!   `dev < a < b < rc < final`
//! - `.postN`, a fourth release component, and `+local` labels become build
//!   metadata, which orders after the plain release

use std::cmp::Ordering;

/// A parsed, normalized version.
pub type Version = semver::Version;

/// Parse a version string leniently. Returns `None` when no numeric release
/// can be found.
pub fn parse_version(s: &str) -> Option<Version> {
    let s = s.trim().trim_start_matches(['v', 'V']);
    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    // Drop an epoch prefix ("1!2.0").
    let s = s.split_once('!').map_or(s, |(_, rest)| rest);
    let (s, local) = match s.split_once('+') {
        Some((head, local)) => (head, Some(local)),
        None => (s, None),
    };

    let release_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (release, suffix) = s.split_at(release_end);
    let release = release.trim_end_matches('.');
    if release.is_empty() {
        return None;
    }
    let nums: Vec<u64> = release
        .split('.')
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;

    let mut version = Version::new(
        nums[0],
        nums.get(1).copied().unwrap_or(0),
        nums.get(2).copied().unwrap_or(0),
    );

    let mut build = Vec::new();
    if nums.len() > 3 {
        let extra: Vec<String> = nums[3..].iter().map(u64::to_string).collect();
        build.push(extra.join("."));
    }

    let suffix = suffix
        .trim_start_matches(['.', '-', '_'])
        .to_ascii_lowercase();
    if !suffix.is_empty() {
        let (label, number) = split_label(&suffix);
        let pre = match label {
            "dev" => Some(format!("0.{number}")),
            "a" | "alpha" => Some(format!("a.{number}")),
            "b" | "beta" => Some(format!("b.{number}")),
            "rc" | "c" | "pre" | "preview" => Some(format!("rc.{number}")),
            "post" | "rev" | "r" => {
                build.push(format!("post.{number}"));
                None
            }
            _ => return None,
        };
        if let Some(pre) = pre {
            version.pre = semver::Prerelease::new(&pre).ok()?;
        }
    }

    if let Some(local) = local {
        let cleaned: String = local
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '.' })
            .collect();
        build.push(cleaned);
    }
    if !build.is_empty() {
        version.build = semver::BuildMetadata::new(&build.join(".")).ok()?;
    }

    Some(version)
}

/// Split `rc1` into (`rc`, 1). Trailing garbage after the number is ignored.
fn split_label(suffix: &str) -> (&str, u64) {
    let digits_at = suffix
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(suffix.len());
    let label = suffix[..digits_at].trim_end_matches(['.', '-', '_']);
    let number = suffix[digits_at..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0);
    (label, number)
}

/// Compare two raw version strings, highest first.
///
/// Parseable versions sort before unparseable ones; unparseable strings
/// fall back to reverse lexical order so the result stays deterministic.
pub fn compare_descending(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => vb.cmp(&va),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}

/// Sort raw version strings from highest to lowest.
pub fn sort_descending<'a>(versions: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut sorted: Vec<&str> = versions.into_iter().collect();
    sorted.sort_by(|a, b| compare_descending(a, b));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    #[test]
    fn strict_semver_passes_through() {
        assert_eq!(v("1.2.3"), Version::new(1, 2, 3));
        assert_eq!(v("v2.0.0"), Version::new(2, 0, 0));
    }

    #[test]
    fn short_versions_are_padded() {
        assert_eq!(v("1.0"), Version::new(1, 0, 0));
        assert_eq!(v("7"), Version::new(7, 0, 0));
    }

    #[test]
    fn prerelease_ordering() {
        assert!(v("1.0.dev1") < v("1.0a1"));
        assert!(v("1.0a1") < v("1.0b2"));
        assert!(v("1.0b2") < v("1.0rc1"));
        assert!(v("1.0rc1") < v("1.0"));
    }

    #[test]
    fn post_and_fourth_component_order_after_release() {
        assert!(v("1.0") < v("1.0.post1"));
        assert!(v("1.2.3") < v("1.2.3.4"));
        assert!(v("1.2.3.4") < v("1.2.4"));
    }

    #[test]
    fn local_labels_and_epochs() {
        assert_eq!(v("2.1.0+cpu").build.as_str(), "cpu");
        assert_eq!(v("1!3.0"), Version::new(3, 0, 0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_version("").is_none());
        assert!(parse_version("latest").is_none());
        assert!(parse_version("1.0-weird").is_none());
    }

    #[test]
    fn descending_sort() {
        let sorted = sort_descending(["0.9.0", "1.0.0", "junk", "1.0.0rc1", "0.10"]);
        assert_eq!(sorted, vec!["1.0.0", "1.0.0rc1", "0.10", "0.9.0", "junk"]);
    }
}

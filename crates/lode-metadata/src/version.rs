use std::cmp::Ordering;
use std::fmt;

/// A mod version as declared in its descriptor.
///
/// Versions that parse as semantic versions are comparable to each other by
/// semver precedence. Anything else is kept verbatim and supports equality
/// only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// A well-formed semantic version.
    Semantic(semver::Version),
    /// An opaque version string; equality only, never orderable.
    Raw(String),
}

impl Version {
    /// Parse a version string, falling back to [`Version::Raw`] when it is
    /// not a semantic version.
    pub fn parse(text: &str) -> Self {
        match semver::Version::parse(text.trim()) {
            Ok(version) => Version::Semantic(version),
            Err(_) => Version::Raw(text.to_string()),
        }
    }

    /// Whether this version participates in ordering at all.
    pub fn is_orderable(&self) -> bool {
        matches!(self, Version::Semantic(_))
    }

    /// Compare two versions by semver precedence.
    ///
    /// Returns `None` unless both sides are semantic. Precedence ignores
    /// build metadata, so two unequal versions (`1.0.0+a` / `1.0.0+b`) can
    /// still compare as equal — the resolver uses exactly that signal to
    /// warn about suspicious version collisions.
    pub fn compare(&self, other: &Version) -> Option<Ordering> {
        match (self, other) {
            (Version::Semantic(a), Version::Semantic(b)) => Some(a.cmp_precedence(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Semantic(version) => write!(f, "{version}"),
            Version::Raw(text) => f.write_str(text),
        }
    }
}

/// A version requirement attached to a dependency declaration.
///
/// Parsing is total: `*` (or an empty string) accepts anything, a valid
/// semver range matches semantic versions, and any other string degrades to
/// verbatim equality so sloppy descriptors still resolve predictably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPredicate {
    /// Matches every version.
    Any,
    /// A semver range; matches semantic versions only.
    Req(semver::VersionReq),
    /// Verbatim string equality against the version's display form.
    Exact(String),
    /// Matches when any member matches (descriptor array form).
    AnyOf(Vec<VersionPredicate>),
}

impl VersionPredicate {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == "*" {
            return VersionPredicate::Any;
        }
        match semver::VersionReq::parse(text) {
            Ok(req) => VersionPredicate::Req(req),
            Err(_) => VersionPredicate::Exact(text.to_string()),
        }
    }

    /// Combine several predicate strings into an any-of predicate.
    pub fn parse_any_of(texts: &[String]) -> Self {
        match texts.len() {
            0 => VersionPredicate::Any,
            1 => VersionPredicate::parse(&texts[0]),
            _ => VersionPredicate::AnyOf(texts.iter().map(|t| VersionPredicate::parse(t)).collect()),
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        match self {
            VersionPredicate::Any => true,
            VersionPredicate::Req(req) => match version {
                Version::Semantic(v) => req.matches(v),
                Version::Raw(_) => false,
            },
            VersionPredicate::Exact(text) => version.to_string() == *text,
            VersionPredicate::AnyOf(members) => members.iter().any(|m| m.matches(version)),
        }
    }
}

impl fmt::Display for VersionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPredicate::Any => f.write_str("*"),
            VersionPredicate::Req(req) => write!(f, "{req}"),
            VersionPredicate::Exact(text) => f.write_str(text),
            VersionPredicate::AnyOf(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" || ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_semantic() {
        let version = Version::parse("1.2.3");
        assert!(version.is_orderable());
        assert_eq!(version.to_string(), "1.2.3");
    }

    #[test]
    fn test_parse_raw() {
        let version = Version::parse("nightly-2024");
        assert!(!version.is_orderable());
        assert_eq!(version, Version::Raw("nightly-2024".to_string()));
    }

    #[test]
    fn test_raw_versions_never_compare() {
        let a = Version::parse("abc");
        let b = Version::parse("1.0.0");
        assert_eq!(a.compare(&b), None);
        assert_eq!(b.compare(&a), None);
    }

    #[test]
    fn test_build_metadata_compares_equal_but_not_eq() {
        let a = Version::parse("1.0.0+a");
        let b = Version::parse("1.0.0+b");
        assert_ne!(a, b);
        assert_eq!(a.compare(&b), Some(Ordering::Equal));
    }

    #[test]
    fn test_predicate_any() {
        assert_eq!(VersionPredicate::parse("*"), VersionPredicate::Any);
        assert_eq!(VersionPredicate::parse(""), VersionPredicate::Any);
        assert!(VersionPredicate::Any.matches(&Version::parse("whatever")));
    }

    #[test]
    fn test_predicate_req() {
        let predicate = VersionPredicate::parse(">=2.0.0");
        assert!(predicate.matches(&Version::parse("2.0.0")));
        assert!(predicate.matches(&Version::parse("3.1.0")));
        assert!(!predicate.matches(&Version::parse("1.9.9")));
        // raw versions never satisfy a range
        assert!(!predicate.matches(&Version::parse("two")));
    }

    #[test]
    fn test_predicate_exact_fallback() {
        let predicate = VersionPredicate::parse("weird build 7");
        assert!(predicate.matches(&Version::parse("weird build 7")));
        assert!(!predicate.matches(&Version::parse("weird build 8")));
    }

    #[test]
    fn test_predicate_any_of() {
        let predicate = VersionPredicate::parse_any_of(&[
            "1.0.0".to_string(),
            ">=3.0.0".to_string(),
        ]);
        assert!(predicate.matches(&Version::parse("1.0.0")));
        assert!(predicate.matches(&Version::parse("3.5.0")));
        assert!(!predicate.matches(&Version::parse("2.0.0")));
    }
}

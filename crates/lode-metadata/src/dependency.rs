use std::fmt;

use crate::version::{Version, VersionPredicate};

/// The relation kinds a descriptor can declare against another mod.
///
/// `Depends` and `Conflicts` participate in constraint solving;
/// `Recommends` and `Breaks` are checked against the selected set after
/// solving (soft and hard respectively).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Depends,
    Recommends,
    Breaks,
    Conflicts,
}

impl DependencyKind {
    /// The verb used when describing this relation in diagnostics.
    pub fn verb(&self) -> &'static str {
        match self {
            DependencyKind::Depends => "depends on",
            DependencyKind::Recommends => "recommends",
            DependencyKind::Breaks => "breaks",
            DependencyKind::Conflicts => "conflicts with",
        }
    }
}

/// One declared relation: kind, target mod id, and version predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDependency {
    pub kind: DependencyKind,
    pub id: String,
    pub predicate: VersionPredicate,
}

impl ModDependency {
    pub fn new(kind: DependencyKind, id: impl Into<String>, predicate: VersionPredicate) -> Self {
        Self {
            kind,
            id: id.into(),
            predicate,
        }
    }

    /// Whether `version` satisfies this declaration's predicate.
    pub fn matches(&self, version: &Version) -> bool {
        self.predicate.matches(version)
    }
}

impl fmt::Display for ModDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({})", self.id, self.predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_matches() {
        let dep = ModDependency::new(
            DependencyKind::Depends,
            "core",
            VersionPredicate::parse(">=2.0.0"),
        );
        assert!(dep.matches(&Version::parse("2.1.0")));
        assert!(!dep.matches(&Version::parse("1.0.0")));
    }

    #[test]
    fn test_dependency_display() {
        let dep = ModDependency::new(
            DependencyKind::Breaks,
            "legacy",
            VersionPredicate::parse("<1.0.0"),
        );
        assert_eq!(dep.to_string(), "'legacy' (<1.0.0)");
    }
}

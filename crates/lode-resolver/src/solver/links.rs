use std::cmp::Ordering;
use std::fmt;

use lode_metadata::ModDependency;

use super::options::CandidateOption;

/// The id must load exactly this candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MandatoryDef {
    pub option: CandidateOption,
}

/// The id may load at most one of these candidates.
///
/// An empty option list is a placeholder for an id that was referenced by a
/// dependency or conflict but never discovered, keeping such clauses
/// well-formed and diagnosable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalDef {
    pub id: String,
    pub options: Vec<CandidateOption>,
}

/// If the source loads, one version-matching option of the target id must
/// load too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLink {
    pub source: CandidateOption,
    pub declaration: ModDependency,
    pub target: String,
    /// Target options whose version satisfies the declaration.
    pub valid: Vec<CandidateOption>,
    /// Target options whose version does not.
    pub invalid: Vec<CandidateOption>,
}

/// The two options may not load together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictLink {
    pub source: CandidateOption,
    pub with: CandidateOption,
}

/// A named constraint contributed to the solver; also the unit of
/// unsatisfiability diagnosis and removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Mandatory(MandatoryDef),
    Optional(OptionalDef),
    Dependency(DependencyLink),
    Conflict(ConflictLink),
}

impl Link {
    /// Fixed presentation priority; lower sorts first.
    fn kind_priority(&self) -> u8 {
        match self {
            Link::Mandatory(_) => 0,
            Link::Optional(_) => 1,
            Link::Dependency(_) => 2,
            Link::Conflict(_) => 3,
        }
    }

    /// The mod id this link defines, for id-definition links.
    pub fn defined_id(&self) -> Option<&str> {
        match self {
            Link::Mandatory(def) => Some(def.option.id().as_str()),
            Link::Optional(def) => Some(&def.id),
            _ => None,
        }
    }

    /// Dependency and conflict links represent relationships between mods
    /// and are the least disruptive to remove during diagnosis.
    pub fn is_relationship(&self) -> bool {
        matches!(self, Link::Dependency(_) | Link::Conflict(_))
    }
}

impl PartialOrd for Link {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Link {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind_priority()
            .cmp(&other.kind_priority())
            .then_with(|| match (self, other) {
                (Link::Mandatory(a), Link::Mandatory(b)) => a.option.id().cmp(b.option.id()),
                (Link::Optional(a), Link::Optional(b)) => a.id.cmp(&b.id),
                (Link::Dependency(a), Link::Dependency(b)) => a
                    .source
                    .id()
                    .cmp(b.source.id())
                    .then_with(|| a.target.cmp(&b.target)),
                (Link::Conflict(a), Link::Conflict(b)) => a
                    .source
                    .id()
                    .cmp(b.source.id())
                    .then_with(|| a.with.id().cmp(b.with.id())),
                _ => Ordering::Equal,
            })
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Mandatory(def) => write!(f, "mandatory {}", def.option.full_string()),
            Link::Optional(def) => match def.options.len() {
                0 => write!(f, "unknown mod '{}'", def.id),
                1 => write!(f, "optional mod '{}' (1 source)", def.id),
                n => write!(f, "optional mod '{}' ({n} sources)", def.id),
            },
            Link::Dependency(dep) => {
                let target_count = dep.valid.len() + dep.invalid.len();
                if target_count == 0 {
                    write!(
                        f,
                        "{} depends on unknown mod '{}' version {}",
                        dep.source, dep.target, dep.declaration.predicate
                    )
                } else {
                    write!(
                        f,
                        "{} depends on mod '{}' version {}",
                        dep.source, dep.target, dep.declaration.predicate
                    )
                }
            }
            Link::Conflict(conflict) => {
                write!(f, "{} conflicts with {}", conflict.source, conflict.with)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use lode_metadata::{DependencyKind, ModMetadata, Version, VersionPredicate};

    use crate::candidate::{Candidate, ModId, Origin};

    fn option(id: &str) -> CandidateOption {
        let candidate = Arc::new(Candidate::new(
            ModId::parse(id).unwrap(),
            ModMetadata::new(id, Version::parse("1.0.0")),
            Origin::Builtin(id.to_string()),
            0,
            format!("builtin:{id}"),
        ));
        CandidateOption::new(candidate, None)
    }

    fn dependency(source: &str, target: &str) -> Link {
        Link::Dependency(DependencyLink {
            source: option(source),
            declaration: ModDependency::new(
                DependencyKind::Depends,
                target,
                VersionPredicate::Any,
            ),
            target: target.to_string(),
            valid: vec![],
            invalid: vec![],
        })
    }

    #[test]
    fn test_link_ordering_is_by_kind_then_identity() {
        let mut links = vec![
            Link::Conflict(ConflictLink {
                source: option("zz"),
                with: option("aa"),
            }),
            dependency("bb", "cc"),
            Link::Optional(OptionalDef {
                id: "later".to_string(),
                options: vec![],
            }),
            Link::Optional(OptionalDef {
                id: "early".to_string(),
                options: vec![],
            }),
            Link::Mandatory(MandatoryDef { option: option("mm") }),
        ];
        links.sort();

        assert!(matches!(links[0], Link::Mandatory(_)));
        assert_eq!(links[1].defined_id(), Some("early"));
        assert_eq!(links[2].defined_id(), Some("later"));
        assert!(matches!(links[3], Link::Dependency(_)));
        assert!(matches!(links[4], Link::Conflict(_)));
    }

    #[test]
    fn test_link_display() {
        let unknown = Link::Optional(OptionalDef {
            id: "ghost".to_string(),
            options: vec![],
        });
        assert_eq!(unknown.to_string(), "unknown mod 'ghost'");

        let dep = dependency("source", "ghost");
        assert_eq!(
            dep.to_string(),
            "mod 'source' depends on unknown mod 'ghost' version *"
        );
    }
}

//! Verification of a raw solver result against the original declarations.
//!
//! The solver answers "is there a consistent assignment"; this pass
//! re-checks the *selected* set: mandatory presence, dependency and breaks
//! declarations (hard), recommends and conflicts declarations plus
//! suspicious version collisions (soft). Soft findings are logged and never
//! fail the call.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use lode_metadata::{DependencyKind, ModDependency};

use crate::candidate::{Candidate, ModId};
use crate::error::ResolveError;

pub(crate) fn verify(
    result: &BTreeMap<ModId, Arc<Candidate>>,
    candidates: &BTreeMap<String, Vec<Arc<Candidate>>>,
    mandatory: &BTreeSet<String>,
) -> Result<(), ResolveError> {
    let (hard, soft) = run_checks(result, candidates, mandatory);

    if !soft.is_empty() {
        log::warn!("Warnings were found!{soft}");
    }
    if !hard.is_empty() {
        return Err(ResolveError::Verification(format!(
            "Errors were found!{hard}{soft}"
        )));
    }
    Ok(())
}

/// All checks, in order. Returns the accumulated hard and soft message
/// blocks. A missing mandatory mod short-circuits the per-candidate checks:
/// the result is incomplete, so everything downstream would only add noise.
pub(crate) fn run_checks(
    result: &BTreeMap<ModId, Arc<Candidate>>,
    candidates: &BTreeMap<String, Vec<Arc<Candidate>>>,
    mandatory: &BTreeSet<String>,
) -> (String, String) {
    let mut hard = String::new();
    let mut soft = String::new();

    let missing: Vec<&str> = mandatory
        .iter()
        .filter(|id| !result.contains_key(id.as_str()))
        .map(|id| id.as_str())
        .collect();
    if !missing.is_empty() {
        hard.push_str("\n - Missing mods: ");
        hard.push_str(&missing.join(", "));
        return (hard, soft);
    }

    for candidate in result.values() {
        for dependency in candidate.depends() {
            check_relation(candidate, dependency, result, &mut hard, true);
        }
        for dependency in candidate.recommends() {
            check_relation(candidate, dependency, result, &mut soft, true);
        }
        for dependency in candidate.breaks() {
            check_relation(candidate, dependency, result, &mut hard, false);
        }
        for dependency in candidate.conflicts() {
            check_relation(candidate, dependency, result, &mut soft, false);
        }

        // Different version values that still compare as equal (orderable
        // both ways) usually mean mis-stamped builds of the same mod.
        let version = candidate.version();
        let mut suspicious = Vec::new();
        if let Some(siblings) = candidates.get(candidate.id().as_str()) {
            for other in siblings {
                let other_version = other.version();
                if version != other_version
                    && version.compare(other_version) == Some(Ordering::Equal)
                {
                    suspicious.push(other_version.to_string());
                }
            }
        }
        if !suspicious.is_empty() {
            soft.push_str(&format!(
                "\n - Conflicting versions found for {}: used {}, also found {}",
                candidate.id(),
                version,
                suspicious.join(", ")
            ));
        }
    }

    (hard, soft)
}

/// Check one declared relation against the selected set.
///
/// `expected_present` is true for depends/recommends (the target must be
/// present and matching) and false for breaks/conflicts (a matching target
/// must not be present).
fn check_relation(
    candidate: &Arc<Candidate>,
    dependency: &ModDependency,
    result: &BTreeMap<ModId, Arc<Candidate>>,
    errors: &mut String,
    expected_present: bool,
) {
    let rules = ModId::check(&dependency.id);
    if !rules.is_empty() {
        errors.push_str(&format!(
            "\n - Mod {} {} mod {}",
            candidate.id(),
            dependency.kind.verb(),
            dependency.id
        ));
        if rules.len() == 1 {
            errors.push_str(&format!(" which has an invalid mod id because it {}", rules[0]));
        } else {
            errors.push_str(" which has an invalid mod id because:");
            for rule in &rules {
                errors.push_str(&format!("\n   - It {rule}"));
            }
        }
        return;
    }

    let target = result.get(dependency.id.as_str());
    let present = target.map_or(false, |t| dependency.matches(t.version()));
    if present == expected_present {
        return;
    }

    errors.push_str(&format!(
        "\n - Mod {} {} mod {}, ",
        candidate.id(),
        dependency.kind.verb(),
        dependency
    ));
    match target {
        None => errors.push_str("which is missing"),
        Some(target) if expected_present => errors.push_str(&format!(
            "but a different version is present: {}",
            target.version()
        )),
        Some(target) => match dependency.kind {
            DependencyKind::Conflicts => errors.push_str(&format!(
                "but the conflicting version is present: {}",
                target.version()
            )),
            _ => errors.push_str(&format!(
                "but the breaking version is present: {}",
                target.version()
            )),
        },
    }
    errors.push('!');
}

#[cfg(test)]
mod tests {
    use super::*;

    use lode_metadata::{ModMetadata, Version, VersionPredicate};

    use crate::candidate::Origin;

    fn candidate(metadata: ModMetadata, depth: u32) -> Arc<Candidate> {
        let id = ModId::parse(metadata.id()).unwrap();
        let origin = Origin::Builtin(format!("{}@{}", metadata.id(), metadata.version()));
        let readable = origin.to_string();
        Arc::new(Candidate::new(id, metadata, origin, depth, readable))
    }

    fn result_of(list: &[Arc<Candidate>]) -> BTreeMap<ModId, Arc<Candidate>> {
        list.iter()
            .map(|c| (c.id().clone(), c.clone()))
            .collect()
    }

    fn sets_of(list: &[Arc<Candidate>]) -> BTreeMap<String, Vec<Arc<Candidate>>> {
        let mut map: BTreeMap<String, Vec<Arc<Candidate>>> = BTreeMap::new();
        for c in list {
            map.entry(c.id().to_string()).or_default().push(c.clone());
        }
        map
    }

    #[test]
    fn test_missing_mandatory_short_circuits() {
        let a = candidate(
            ModMetadata::new("aa", Version::parse("1.0.0")).with_dependency(
                DependencyKind::Depends,
                "ghost",
                VersionPredicate::Any,
            ),
            0,
        );
        let result = result_of(&[a.clone()]);
        let mandatory: BTreeSet<String> = ["aa".to_string(), "bb".to_string()].into();

        let (hard, _) = run_checks(&result, &sets_of(&[a]), &mandatory);
        assert!(hard.contains("Missing mods: bb"));
        // the dependency check is skipped entirely
        assert!(!hard.contains("ghost"));
    }

    #[test]
    fn test_broken_dependency_is_hard() {
        let a = candidate(
            ModMetadata::new("aa", Version::parse("1.0.0")).with_dependency(
                DependencyKind::Depends,
                "bb",
                VersionPredicate::parse(">=2.0.0"),
            ),
            0,
        );
        let b = candidate(ModMetadata::new("bb", Version::parse("1.0.0")), 0);
        let result = result_of(&[a.clone(), b.clone()]);

        let (hard, _) = run_checks(&result, &sets_of(&[a, b]), &BTreeSet::new());
        assert!(hard.contains("Mod aa depends on mod 'bb' (>=2.0.0)"));
        assert!(hard.contains("a different version is present: 1.0.0"));
    }

    #[test]
    fn test_breaks_match_is_hard_and_conflicts_match_is_soft() {
        let a = candidate(
            ModMetadata::new("aa", Version::parse("1.0.0"))
                .with_dependency(DependencyKind::Breaks, "bb", VersionPredicate::Any)
                .with_dependency(DependencyKind::Conflicts, "cc", VersionPredicate::Any),
            0,
        );
        let b = candidate(ModMetadata::new("bb", Version::parse("1.0.0")), 0);
        let c = candidate(ModMetadata::new("cc", Version::parse("1.0.0")), 0);
        let result = result_of(&[a.clone(), b.clone(), c.clone()]);

        let (hard, soft) = run_checks(&result, &sets_of(&[a, b, c]), &BTreeSet::new());
        assert!(hard.contains("the breaking version is present"));
        assert!(soft.contains("the conflicting version is present"));
        assert!(!hard.contains("conflicting"));
    }

    #[test]
    fn test_recommends_mismatch_is_soft_only() {
        let a = candidate(
            ModMetadata::new("aa", Version::parse("1.0.0")).with_dependency(
                DependencyKind::Recommends,
                "extras",
                VersionPredicate::Any,
            ),
            0,
        );
        let result = result_of(&[a.clone()]);

        let (hard, soft) = run_checks(&result, &sets_of(&[a]), &BTreeSet::new());
        assert!(hard.is_empty());
        assert!(soft.contains("Mod aa recommends mod 'extras' (*), which is missing!"));
    }

    #[test]
    fn test_invalid_dependency_id_lists_rules() {
        let a = candidate(
            ModMetadata::new("aa", Version::parse("1.0.0")).with_dependency(
                DependencyKind::Recommends,
                "Bad!",
                VersionPredicate::Any,
            ),
            0,
        );
        let result = result_of(&[a.clone()]);

        let (_, soft) = run_checks(&result, &sets_of(&[a]), &BTreeSet::new());
        assert!(soft.contains("invalid mod id"));
        assert!(soft.contains("starts with an invalid character"));
        assert!(soft.contains("contains invalid characters"));
    }

    #[test]
    fn test_suspicious_version_collision_is_soft() {
        let selected = candidate(ModMetadata::new("lib", Version::parse("1.0.0+a")), 1);
        let sibling = candidate(ModMetadata::new("lib", Version::parse("1.0.0+b")), 1);
        let result = result_of(&[selected.clone()]);

        let (hard, soft) = run_checks(
            &result,
            &sets_of(&[selected, sibling]),
            &BTreeSet::new(),
        );
        assert!(hard.is_empty());
        assert!(soft.contains("Conflicting versions found for lib: used 1.0.0+a, also found 1.0.0+b"));
    }

    #[test]
    fn test_clean_result_passes() {
        let a = candidate(
            ModMetadata::new("aa", Version::parse("1.0.0")).with_dependency(
                DependencyKind::Depends,
                "bb",
                VersionPredicate::parse(">=1.0.0"),
            ),
            0,
        );
        let b = candidate(ModMetadata::new("bb", Version::parse("1.2.0")), 0);
        let result = result_of(&[a.clone(), b.clone()]);
        let mandatory: BTreeSet<String> = ["aa".to_string()].into();

        let (hard, soft) = run_checks(&result, &sets_of(&[a, b]), &mandatory);
        assert!(hard.is_empty());
        assert!(soft.is_empty());
        assert!(verify(&result, &BTreeMap::new(), &mandatory).is_ok());
    }
}

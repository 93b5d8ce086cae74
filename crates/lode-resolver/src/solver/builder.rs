//! Compiles candidate sets and their declared relationships into links.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::candidate::Candidate;
use crate::error::ResolveError;

use super::constraint_solver::ConstraintSolver;
use super::engine::SatEngine;
use super::links::{ConflictLink, DependencyLink, Link, MandatoryDef, OptionalDef};
use super::options::CandidateOption;

/// Weight of a rank-0 option; each further rank weighs one less, so the
/// earliest-discovered candidate wins whenever nothing else distinguishes
/// them. Large enough that loading more mods always beats loading
/// better-ranked ones.
pub const BASE_WEIGHT: i64 = 1000;

struct IdDefinition {
    options: Vec<CandidateOption>,
}

/// Register the full link set for `candidates` with a fresh solver.
///
/// `candidates` maps each id to its per-set candidate list in preference
/// order; `mandatory` names the ids that must load. Ids referenced by a
/// dependency or conflict but absent from `candidates` get an empty
/// placeholder definition so those clauses stay well-formed.
pub fn build_constraints<E: SatEngine>(
    solver: &mut ConstraintSolver<E>,
    candidates: &BTreeMap<String, Vec<Arc<Candidate>>>,
    mandatory: &BTreeSet<String>,
) -> Result<(), ResolveError> {
    let mut definitions: HashMap<String, IdDefinition> = HashMap::new();
    let mut option_of: HashMap<(String, String), CandidateOption> = HashMap::new();

    for (id, list) in candidates {
        if mandatory.contains(id) {
            // duplicate mandatory candidates were rejected at discovery
            debug_assert_eq!(list.len(), 1, "mandatory id `{id}` must have one candidate");
            let Some(candidate) = list.first() else {
                return Err(ResolveError::Internal(format!(
                    "mandatory id `{id}` has no candidates"
                )));
            };
            let option = CandidateOption::new(candidate.clone(), None);
            option_of.insert(option_key(candidate), option.clone());
            solver.add_link(Link::Mandatory(MandatoryDef {
                option: option.clone(),
            }));
            definitions.insert(
                id.clone(),
                IdDefinition {
                    options: vec![option],
                },
            );
        } else {
            let only = list.len() == 1;
            let mut options = Vec::with_capacity(list.len());
            for (rank, candidate) in list.iter().enumerate() {
                let index = if only { None } else { Some(rank) };
                let option = CandidateOption::new(candidate.clone(), index);
                solver.add_weight(option.clone(), BASE_WEIGHT - rank as i64);
                option_of.insert(option_key(candidate), option.clone());
                options.push(option);
            }
            solver.add_link(Link::Optional(OptionalDef {
                id: id.clone(),
                options: options.clone(),
            }));
            definitions.insert(id.clone(), IdDefinition { options });
        }
    }

    for list in candidates.values() {
        for candidate in list {
            let Some(source) = option_of.get(&option_key(candidate)).cloned() else {
                continue;
            };

            for dependency in candidate.depends() {
                let definition = ensure_definition(solver, &mut definitions, &dependency.id);
                let (valid, invalid): (Vec<CandidateOption>, Vec<CandidateOption>) = definition
                    .options
                    .iter()
                    .cloned()
                    .partition(|option| dependency.matches(option.candidate().version()));
                solver.add_link(Link::Dependency(DependencyLink {
                    source: source.clone(),
                    declaration: dependency.clone(),
                    target: dependency.id.clone(),
                    valid,
                    invalid,
                }));
            }

            for conflict in candidate.conflicts() {
                let definition = ensure_definition(solver, &mut definitions, &conflict.id);
                for option in definition.options.clone() {
                    solver.add_link(Link::Conflict(ConflictLink {
                        source: source.clone(),
                        with: option,
                    }));
                }
            }
        }
    }

    Ok(())
}

fn option_key(candidate: &Arc<Candidate>) -> (String, String) {
    (
        candidate.id().to_string(),
        candidate.origin().to_string(),
    )
}

/// Look up an id definition, creating an empty placeholder (and its link)
/// for ids that were never discovered.
fn ensure_definition<'a, E: SatEngine>(
    solver: &mut ConstraintSolver<E>,
    definitions: &'a mut HashMap<String, IdDefinition>,
    id: &str,
) -> &'a IdDefinition {
    definitions.entry(id.to_string()).or_insert_with(|| {
        solver.add_link(Link::Optional(OptionalDef {
            id: id.to_string(),
            options: Vec::new(),
        }));
        IdDefinition {
            options: Vec::new(),
        }
    })
}

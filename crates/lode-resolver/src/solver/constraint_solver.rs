//! Link registration, weighted preference, and unsatisfiable-core
//! diagnosis over a [`SatEngine`].
//!
//! Every link's clauses are guarded by a fresh selector variable; solving
//! assumes all active selectors, so the engine's failed-assumption core maps
//! straight back to the implicated links, and removing a link is one unit
//! clause asserting its selector false.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::error::ResolveError;

use super::engine::{SatEngine, SatLit, SatVar};
use super::links::Link;
use super::options::{CandidateOption, LoadOption};

/// Handle to a registered [`Link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u32);

struct LinkEntry {
    link: Link,
    selector: SatVar,
    active: bool,
}

pub struct ConstraintSolver<E: SatEngine> {
    engine: E,
    option_vars: IndexMap<CandidateOption, SatVar>,
    links: Vec<LinkEntry>,
    selectors: HashMap<SatVar, LinkId>,
    weights: Vec<(CandidateOption, i64)>,
    deadline: Instant,
}

impl<E: SatEngine> ConstraintSolver<E> {
    /// A solver that gives up with a timeout error once `budget` has
    /// elapsed.
    pub fn new(engine: E, budget: Duration) -> Self {
        Self {
            engine,
            option_vars: IndexMap::new(),
            links: Vec::new(),
            selectors: HashMap::new(),
            weights: Vec::new(),
            deadline: Instant::now() + budget,
        }
    }

    /// Register a link's clauses under a fresh selector.
    pub fn add_link(&mut self, link: Link) -> LinkId {
        let selector = self.engine.new_var();
        let guard = SatLit::neg(selector);

        match &link {
            Link::Mandatory(def) => {
                self.add_guarded_clause(guard, &[LoadOption::Candidate(def.option.clone())]);
            }
            Link::Optional(def) => {
                let lits: Vec<SatLit> = def
                    .options
                    .iter()
                    .map(|option| SatLit::pos(self.option_var(option)))
                    .collect();
                self.engine.add_at_most_one(guard, &lits);
            }
            Link::Dependency(dep) => {
                let mut clause = vec![LoadOption::Negated(dep.source.clone())];
                clause.extend(dep.valid.iter().cloned().map(LoadOption::Candidate));
                self.add_guarded_clause(guard, &clause);
            }
            Link::Conflict(conflict) => {
                self.add_guarded_clause(
                    guard,
                    &[
                        LoadOption::Negated(conflict.source.clone()),
                        LoadOption::Negated(conflict.with.clone()),
                    ],
                );
            }
        }

        let id = LinkId(self.links.len() as u32);
        self.selectors.insert(selector, id);
        self.links.push(LinkEntry {
            link,
            selector,
            active: true,
        });
        id
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0 as usize].link
    }

    /// Register an option's objective weight; higher weights are preferred.
    pub fn add_weight(&mut self, option: CandidateOption, weight: i64) {
        self.weights.push((option, weight));
    }

    /// Whether the active constraint set is satisfiable at all.
    pub fn has_solution(&mut self) -> Result<bool, ResolveError> {
        self.check_budget()?;
        let assumptions = self.active_selectors();
        self.engine.solve(&assumptions)
    }

    /// The links implicated in the last unsatisfiable solve, in
    /// presentation order.
    pub fn why(&self) -> Vec<LinkId> {
        let mut ids: Vec<LinkId> = self
            .engine
            .failed_assumptions()
            .iter()
            .filter_map(|lit| self.selectors.get(&lit.var).copied())
            .collect();
        ids.sort_by(|a, b| self.link(*a).cmp(self.link(*b)));
        ids
    }

    /// Permanently deactivate a link. Returns false when it was already
    /// removed.
    pub fn remove_link(&mut self, id: LinkId) -> bool {
        let entry = &mut self.links[id.0 as usize];
        if !entry.active {
            return false;
        }
        entry.active = false;
        let selector = entry.selector;
        self.engine.add_clause(&[SatLit::neg(selector)]);
        true
    }

    /// Find a satisfying assignment preferring high-weight options, and
    /// return every selected candidate option.
    ///
    /// Options are greedily assumed true in descending weight order (stable
    /// on ties). An option whose assumption fails may displace a single
    /// accepted blocker of no greater weight when the swap stays
    /// satisfiable; identifiers freed that way get one accept-only retry
    /// pass. Feasibility is guaranteed, optimality is not.
    pub fn find_solution(&mut self) -> Result<Vec<CandidateOption>, ResolveError> {
        let base = self.active_selectors();

        let mut order: Vec<usize> = (0..self.weights.len()).collect();
        order.sort_by(|&a, &b| self.weights[b].1.cmp(&self.weights[a].1));

        let mut accepted: IndexMap<String, (usize, SatLit)> = IndexMap::new();

        for &index in &order {
            let (option, weight) = self.weights[index].clone();
            let id = option.id().to_string();
            if accepted.contains_key(&id) {
                continue;
            }
            let lit = SatLit::pos(self.option_var(&option));

            let mut assumptions = base.clone();
            assumptions.extend(accepted.values().map(|&(_, l)| l));
            assumptions.push(lit);

            self.check_budget()?;
            if self.engine.solve(&assumptions)? {
                accepted.insert(id, (index, lit));
                continue;
            }

            let failed = self.engine.failed_assumptions();
            let blockers: Vec<(String, usize)> = accepted
                .iter()
                .filter(|(_, (_, l))| failed.contains(l))
                .map(|(k, &(i, _))| (k.clone(), i))
                .collect();
            if let [(blocker_id, blocker_index)] = blockers.as_slice() {
                if weight >= self.weights[*blocker_index].1 {
                    let mut retry = base.clone();
                    retry.extend(
                        accepted
                            .iter()
                            .filter(|entry| entry.0 != blocker_id)
                            .map(|(_, &(_, l))| l),
                    );
                    retry.push(lit);
                    self.check_budget()?;
                    if self.engine.solve(&retry)? {
                        accepted.shift_remove(blocker_id);
                        accepted.insert(id, (index, lit));
                    }
                }
            }
        }

        // identifiers freed by swaps get one more chance
        for &index in &order {
            let (option, _) = self.weights[index].clone();
            let id = option.id().to_string();
            if accepted.contains_key(&id) {
                continue;
            }
            let lit = SatLit::pos(self.option_var(&option));
            let mut assumptions = base.clone();
            assumptions.extend(accepted.values().map(|&(_, l)| l));
            assumptions.push(lit);
            self.check_budget()?;
            if self.engine.solve(&assumptions)? {
                accepted.insert(id, (index, lit));
            }
        }

        let mut assumptions = base;
        assumptions.extend(accepted.values().map(|&(_, l)| l));
        self.check_budget()?;
        if !self.engine.solve(&assumptions)? {
            return Err(ResolveError::Internal(
                "preferred assignment is no longer satisfiable".to_string(),
            ));
        }

        Ok(self
            .option_vars
            .iter()
            .filter(|&(_, &var)| self.engine.model_value(var))
            .map(|(option, _)| option.clone())
            .collect())
    }

    fn option_var(&mut self, option: &CandidateOption) -> SatVar {
        if let Some(&var) = self.option_vars.get(option) {
            return var;
        }
        let var = self.engine.new_var();
        self.option_vars.insert(option.clone(), var);
        var
    }

    fn add_guarded_clause(&mut self, guard: SatLit, options: &[LoadOption]) {
        let mut clause = vec![guard];
        for load in options {
            let var = self.option_var(load.option());
            clause.push(if load.is_negated() {
                SatLit::neg(var)
            } else {
                SatLit::pos(var)
            });
        }
        self.engine.add_clause(&clause);
    }

    fn active_selectors(&self) -> Vec<SatLit> {
        self.links
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| SatLit::pos(entry.selector))
            .collect()
    }

    fn check_budget(&self) -> Result<(), ResolveError> {
        if Instant::now() >= self.deadline {
            Err(ResolveError::SolveTimeout)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use lode_metadata::{DependencyKind, ModDependency, ModMetadata, Version, VersionPredicate};

    use crate::candidate::{Candidate, ModId, Origin};
    use crate::solver::engine::VarisatEngine;
    use crate::solver::links::{ConflictLink, DependencyLink, MandatoryDef, OptionalDef};

    fn option(id: &str, version: &str, index: Option<usize>) -> CandidateOption {
        let origin = Origin::Builtin(format!("{id}@{version}"));
        let readable = origin.to_string();
        let candidate = Arc::new(Candidate::new(
            ModId::parse(id).unwrap(),
            ModMetadata::new(id, Version::parse(version)),
            origin,
            0,
            readable,
        ));
        CandidateOption::new(candidate, index)
    }

    fn solver() -> ConstraintSolver<VarisatEngine> {
        ConstraintSolver::new(VarisatEngine::new(), Duration::from_secs(30))
    }

    #[test]
    fn test_mandatory_option_is_selected() {
        let mut solver = solver();
        let mandatory = option("example", "1.0.0", None);
        solver.add_link(Link::Mandatory(MandatoryDef {
            option: mandatory.clone(),
        }));

        assert!(solver.has_solution().unwrap());
        let selected = solver.find_solution().unwrap();
        assert_eq!(selected, vec![mandatory]);
    }

    #[test]
    fn test_optional_prefers_rank_zero() {
        let mut solver = solver();
        let first = option("example", "2.0.0", Some(0));
        let second = option("example", "1.0.0", Some(1));
        solver.add_weight(first.clone(), 1000);
        solver.add_weight(second.clone(), 999);
        solver.add_link(Link::Optional(OptionalDef {
            id: "example".to_string(),
            options: vec![first.clone(), second],
        }));

        let selected = solver.find_solution().unwrap();
        assert_eq!(selected, vec![first]);
    }

    #[test]
    fn test_dependency_displaces_better_ranked_candidate() {
        // core@1 has the better rank, but mod-x needs core >= 2; the
        // preferred solution loads both mod-x and core@2.
        let mut solver = solver();
        let core1 = option("core", "1.0.0", Some(0));
        let core2 = option("core", "2.0.0", Some(1));
        let modx = option("mod-x", "1.0.0", None);

        solver.add_weight(core1.clone(), 1000);
        solver.add_weight(core2.clone(), 999);
        solver.add_weight(modx.clone(), 1000);

        solver.add_link(Link::Optional(OptionalDef {
            id: "core".to_string(),
            options: vec![core1.clone(), core2.clone()],
        }));
        solver.add_link(Link::Optional(OptionalDef {
            id: "mod-x".to_string(),
            options: vec![modx.clone()],
        }));
        solver.add_link(Link::Dependency(DependencyLink {
            source: modx.clone(),
            declaration: ModDependency::new(
                DependencyKind::Depends,
                "core",
                VersionPredicate::parse(">=2.0.0"),
            ),
            target: "core".to_string(),
            valid: vec![core2.clone()],
            invalid: vec![core1.clone()],
        }));

        let mut selected = solver.find_solution().unwrap();
        selected.sort_by(|a, b| a.id().cmp(b.id()));
        assert_eq!(selected, vec![core2, modx]);
    }

    #[test]
    fn test_mandatory_conflict_is_diagnosed_and_removable() {
        let mut solver = solver();
        let a = option("aa", "1.0.0", None);
        let b = option("bb", "1.0.0", None);
        let a_link = solver.add_link(Link::Mandatory(MandatoryDef { option: a.clone() }));
        let b_link = solver.add_link(Link::Mandatory(MandatoryDef { option: b.clone() }));
        let conflict = solver.add_link(Link::Conflict(ConflictLink {
            source: a.clone(),
            with: b.clone(),
        }));

        assert!(!solver.has_solution().unwrap());
        let why = solver.why();
        assert!(why.contains(&conflict));
        assert!(why.contains(&a_link) || why.contains(&b_link));

        assert!(solver.remove_link(conflict));
        assert!(!solver.remove_link(conflict));
        assert!(solver.has_solution().unwrap());
    }

    #[test]
    fn test_dependency_on_empty_placeholder_blocks_mandatory_source() {
        let mut solver = solver();
        let source = option("example", "1.0.0", None);
        solver.add_link(Link::Mandatory(MandatoryDef {
            option: source.clone(),
        }));
        solver.add_link(Link::Optional(OptionalDef {
            id: "ghost".to_string(),
            options: vec![],
        }));
        let dep = solver.add_link(Link::Dependency(DependencyLink {
            source: source.clone(),
            declaration: ModDependency::new(
                DependencyKind::Depends,
                "ghost",
                VersionPredicate::Any,
            ),
            target: "ghost".to_string(),
            valid: vec![],
            invalid: vec![],
        }));

        assert!(!solver.has_solution().unwrap());
        assert!(solver.why().contains(&dep));
    }
}

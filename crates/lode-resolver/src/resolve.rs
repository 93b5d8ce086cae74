//! Top-level resolution: discovery, constraint solving, iterative
//! unsatisfiability diagnosis, and verification of the selected set.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use lode_metadata::{MetadataParser, ModMetadata};

use crate::candidate::{Candidate, CandidateSet, ModId};
use crate::discovery::{self, BuiltinMod, CandidateFinder};
use crate::error::{ResolveError, Result};
use crate::solver::{
    build_constraints, ConstraintSolver, Link, LinkId, SatEngine, VarisatEngine,
};
use crate::store::ArchiveStore;
use crate::verify;

const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SOLVE_BUDGET: Duration = Duration::from_secs(30);

/// The outcome of a successful resolution: exactly one candidate per
/// selected id, covering every mandatory id.
#[derive(Debug)]
pub struct Resolution {
    pub mods: BTreeMap<ModId, Arc<Candidate>>,
}

/// Discovers mod candidates and selects a consistent set to load.
///
/// Candidate locations come from [`CandidateFinder`]s; built-in mods are
/// supplied directly. The archive store is shared, process-lifetime state:
/// construct it once and hand the same `Arc` to every resolver.
pub struct ModResolver {
    finders: Vec<Box<dyn CandidateFinder>>,
    builtins: Vec<BuiltinMod>,
    parser: Arc<dyn MetadataParser>,
    store: Arc<ArchiveStore>,
    discovery_timeout: Duration,
    solve_budget: Duration,
}

impl ModResolver {
    pub fn new(store: Arc<ArchiveStore>, parser: Arc<dyn MetadataParser>) -> Self {
        Self {
            finders: Vec::new(),
            builtins: Vec::new(),
            parser,
            store,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            solve_budget: DEFAULT_SOLVE_BUDGET,
        }
    }

    pub fn add_finder(&mut self, finder: impl CandidateFinder + 'static) {
        self.finders.push(Box::new(finder));
    }

    pub fn add_builtin(&mut self, builtin: BuiltinMod) {
        self.builtins.push(builtin);
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn with_solve_budget(mut self, budget: Duration) -> Self {
        self.solve_budget = budget;
        self
    }

    /// Run the full pipeline: concurrent discovery, constraint solving with
    /// diagnosis, and verification.
    pub fn resolve(&self) -> Result<Resolution> {
        let discovery_started = Instant::now();

        let mut origins = Vec::new();
        for finder in &self.finders {
            finder.find_candidates(&mut |origin| origins.push(origin));
        }

        let ctx = Arc::new(discovery::DiscoveryContext {
            candidates: Mutex::new(IndexMap::new()),
            store: self.store.clone(),
            parser: self.parser.clone(),
        });

        for builtin in &self.builtins {
            let id = ModId::parse(builtin.metadata.id())?;
            let readable = self.store.readable_path(&builtin.origin);
            let candidate = Arc::new(Candidate::new(
                id.clone(),
                builtin.metadata.clone(),
                builtin.origin.clone(),
                0,
                readable,
            ));
            let mut map = ctx.candidates.lock().unwrap();
            map.entry(id.clone())
                .or_insert_with(|| CandidateSet::new(id.clone()))
                .add(candidate);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_count())
            .enable_all()
            .build()
            .map_err(|e| ResolveError::Internal(format!("failed to start discovery pool: {e}")))?;
        let outcome = runtime.block_on(discovery::run(
            ctx.clone(),
            origins,
            self.discovery_timeout,
        ));
        // timed-out tasks may still be mid-read; don't wait for them
        runtime.shutdown_background();
        outcome?;

        let map = std::mem::take(&mut *ctx.candidates.lock().unwrap());
        let (candidates, mandatory) = finalize_candidates(map)?;
        log::debug!("mod discovery time: {:?}", discovery_started.elapsed());

        let solve_started = Instant::now();
        let result = self.find_compatible_set(&candidates, &mandatory)?;
        log::debug!("mod resolution time: {:?}", solve_started.elapsed());

        for candidate in result.values() {
            let schema = candidate.metadata().schema_version();
            if schema < ModMetadata::LATEST_SCHEMA_VERSION {
                log::warn!(
                    "mod `{}` uses outdated descriptor schema version: {} < {}",
                    candidate.id(),
                    schema,
                    ModMetadata::LATEST_SCHEMA_VERSION
                );
            }
        }

        Ok(Resolution { mods: result })
    }

    /// Select one candidate per id satisfying every constraint, or fail with
    /// every independent diagnosis. The raw solution is verified against the
    /// original declarations before it is returned.
    pub fn find_compatible_set(
        &self,
        candidates: &BTreeMap<String, Vec<Arc<Candidate>>>,
        mandatory: &BTreeSet<String>,
    ) -> Result<BTreeMap<ModId, Arc<Candidate>>> {
        let mut solver = ConstraintSolver::new(VarisatEngine::new(), self.solve_budget);
        build_constraints(&mut solver, candidates, mandatory)?;

        let mut errors = Vec::new();
        loop {
            if solver.has_solution()? {
                break;
            }

            let why = solver.why();
            let mut roots = Vec::new();
            let mut causes = Vec::new();
            for id in why {
                if matches!(solver.link(id), Link::Mandatory(_)) {
                    roots.push(id);
                } else {
                    causes.push(id);
                }
            }

            errors.push(ResolveError::Unsatisfiable(describe_unsat(
                &solver, &roots, &causes, mandatory,
            )));

            // Relationship links first: removing one severs a single edge
            // instead of an id definition.
            let mut removed = false;
            for &id in &causes {
                if solver.link(id).is_relationship() && solver.remove_link(id) {
                    removed = true;
                    break;
                }
            }
            if !removed {
                for &id in &causes {
                    if solver.remove_link(id) {
                        removed = true;
                        break;
                    }
                }
            }
            if !removed {
                break;
            }
        }

        if !errors.is_empty() {
            return Err(ResolveError::aggregate(
                format!("Found {} errors while resolving mods!", errors.len()),
                errors,
            ));
        }

        let mut result = BTreeMap::new();
        for option in solver.find_solution()? {
            let id = option.id().clone();
            if result
                .insert(id.clone(), option.candidate().clone())
                .is_some()
            {
                return Err(ResolveError::Internal(format!(
                    "duplicate result candidate for `{id}`"
                )));
            }
        }

        verify::verify(&result, candidates, mandatory)?;
        Ok(result)
    }
}

/// Turn the shared discovery map into per-id candidate lists and the
/// mandatory id set, collecting every duplicate-mandatory error before
/// failing.
fn finalize_candidates(
    map: IndexMap<ModId, CandidateSet>,
) -> Result<(BTreeMap<String, Vec<Arc<Candidate>>>, BTreeSet<String>)> {
    let mut candidates = BTreeMap::new();
    let mut mandatory = BTreeSet::new();
    let mut errors = Vec::new();

    for (id, set) in map {
        match set.resolve() {
            Ok(list) => {
                if set.is_mandatory() {
                    mandatory.insert(id.to_string());
                }
                candidates.insert(id.to_string(), list);
            }
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        Ok((candidates, mandatory))
    } else {
        Err(ResolveError::aggregate(
            format!("Found {} duplicated mandatory mods!", errors.len()),
            errors,
        ))
    }
}

/// One human-readable explanation of an unsatisfiable core.
fn describe_unsat<E: SatEngine>(
    solver: &ConstraintSolver<E>,
    roots: &[LinkId],
    causes: &[LinkId],
    mandatory: &BTreeSet<String>,
) -> String {
    // two mandatory mods excluding each other get a precise message
    if let [cause] = causes {
        if let Link::Conflict(conflict) = solver.link(*cause) {
            let a = &conflict.source;
            let b = &conflict.with;
            if mandatory.contains(a.id().as_str()) && mandatory.contains(b.id().as_str()) {
                return format!(
                    "{} conflicts with {}, but both are mandatory!",
                    a.full_string(),
                    b.full_string()
                );
            }
        }
    }

    let mut mods: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut relationships = Vec::new();
    for &id in roots.iter().chain(causes) {
        let link = solver.link(id);
        match link {
            Link::Mandatory(def) => {
                mods.entry(def.option.id().to_string())
                    .or_default()
                    .insert(def.option.specific_info());
            }
            Link::Optional(def) => {
                let entry = mods.entry(def.id.clone()).or_default();
                for option in &def.options {
                    entry.insert(option.specific_info());
                }
            }
            Link::Dependency(dep) => {
                mods.entry(dep.source.id().to_string())
                    .or_default()
                    .insert(dep.source.specific_info());
                let entry = mods.entry(dep.target.clone()).or_default();
                for option in dep.valid.iter().chain(&dep.invalid) {
                    entry.insert(option.specific_info());
                }
                relationships.push(link.to_string());
            }
            Link::Conflict(_) => relationships.push(link.to_string()),
        }
    }

    let mut text = String::from("Unhandled error involving:");
    for (id, sources) in &mods {
        if sources.is_empty() {
            text.push_str(&format!("\nx unknown mod '{id}'"));
        } else {
            if mandatory.contains(id.as_str()) {
                text.push_str(&format!("\nmandatory mod '{id}'"));
            } else {
                text.push_str(&format!("\noptional mod '{id}'"));
            }
            for source in sources {
                text.push_str(&format!("\n\t - {source}"));
            }
        }
    }
    relationships.sort();
    for line in relationships {
        text.push_str(&format!("\n{line}"));
    }
    text
}

fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

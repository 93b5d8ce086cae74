//! Constraint compilation and SAT-backed solving.
//!
//! Candidate sets become boolean decision variables ([`CandidateOption`]),
//! declared relationships become named constraint [`Link`]s, and the
//! [`ConstraintSolver`] drives a [`SatEngine`] to either a
//! weight-preferring satisfying assignment or an explanation of why none
//! exists.
//!
//! Links double as the unit of diagnosis: when the constraint set is
//! unsatisfiable the solver reports the subset of links implicated
//! ([`ConstraintSolver::why`]) and individual links can be removed
//! ([`ConstraintSolver::remove_link`]) so further independent problems
//! surface on the next attempt.

mod builder;
mod constraint_solver;
mod engine;
mod links;
mod options;

pub use builder::{build_constraints, BASE_WEIGHT};
pub use constraint_solver::{ConstraintSolver, LinkId};
pub use engine::{SatEngine, SatLit, SatVar, VarisatEngine};
pub use links::{ConflictLink, DependencyLink, Link, MandatoryDef, OptionalDef};
pub use options::{CandidateOption, LoadOption};

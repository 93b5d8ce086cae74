//! The replaceable boolean satisfiability capability.
//!
//! The resolver needs five things from a solving engine: fresh variables,
//! clauses, at-most-one constraints, solving under assumptions with a model
//! to read back, and — on unsatisfiability — the subset of assumptions that
//! caused it. [`VarisatEngine`] provides them over the `varisat` CDCL
//! solver; anything satisfying [`SatEngine`] can be swapped in.

use varisat::lit::Lit;
use varisat::solver::Solver;
use varisat::ExtendFormula;

use crate::error::ResolveError;

/// An engine-level boolean variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SatVar(pub usize);

/// An engine-level literal: a variable with a polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SatLit {
    pub var: SatVar,
    pub positive: bool,
}

impl SatLit {
    pub fn pos(var: SatVar) -> Self {
        Self {
            var,
            positive: true,
        }
    }

    pub fn neg(var: SatVar) -> Self {
        Self {
            var,
            positive: false,
        }
    }

    pub fn negate(self) -> Self {
        Self {
            var: self.var,
            positive: !self.positive,
        }
    }
}

/// Minimal interface onto a satisfiability engine.
pub trait SatEngine {
    fn new_var(&mut self) -> SatVar;

    fn add_clause(&mut self, lits: &[SatLit]);

    /// Solve under `assumptions`. On success a model is available through
    /// [`SatEngine::model_value`]; on failure the implicated assumptions are
    /// available through [`SatEngine::failed_assumptions`].
    fn solve(&mut self, assumptions: &[SatLit]) -> Result<bool, ResolveError>;

    /// The subset of the last solve's assumptions sufficient for
    /// unsatisfiability.
    fn failed_assumptions(&self) -> Vec<SatLit>;

    /// A variable's value in the last satisfying model.
    fn model_value(&self, var: SatVar) -> bool;

    /// At most one of `lits` may be true, unless `guard` is satisfied.
    ///
    /// Emits `guard ∨ ¬a ∨ ¬b` for every pair, so passing a negated
    /// selector literal keeps the whole constraint removable as a unit.
    /// Pairwise encoding; fine for the handful of candidates a mod id
    /// realistically has.
    fn add_at_most_one(&mut self, guard: SatLit, lits: &[SatLit]) {
        for (i, a) in lits.iter().enumerate() {
            for b in &lits[i + 1..] {
                self.add_clause(&[guard, a.negate(), b.negate()]);
            }
        }
    }
}

/// [`SatEngine`] over the `varisat` solver.
///
/// Variables are numbered sequentially and mapped to solver literals
/// through their DIMACS form, so [`SatVar`]`(n)` is DIMACS variable `n + 1`
/// on both sides of the conversion.
pub struct VarisatEngine {
    solver: Solver<'static>,
    var_count: usize,
    model: Vec<bool>,
    failed: Vec<SatLit>,
}

impl VarisatEngine {
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
            var_count: 0,
            model: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn to_lit(lit: SatLit) -> Lit {
        let dimacs = (lit.var.0 + 1) as isize;
        Lit::from_dimacs(if lit.positive { dimacs } else { -dimacs })
    }

    fn from_lit(lit: Lit) -> SatLit {
        let dimacs = lit.to_dimacs();
        SatLit {
            var: SatVar(dimacs.unsigned_abs() - 1),
            positive: dimacs > 0,
        }
    }
}

impl Default for VarisatEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SatEngine for VarisatEngine {
    fn new_var(&mut self) -> SatVar {
        // allocate in the solver as well, so assuming a variable that never
        // ended up in a clause still refers to a known variable
        let _ = self.solver.new_var();
        let var = SatVar(self.var_count);
        self.var_count += 1;
        var
    }

    fn add_clause(&mut self, lits: &[SatLit]) {
        let clause: Vec<Lit> = lits.iter().map(|&l| Self::to_lit(l)).collect();
        self.solver.add_clause(&clause);
    }

    fn solve(&mut self, assumptions: &[SatLit]) -> Result<bool, ResolveError> {
        let assumed: Vec<Lit> = assumptions.iter().map(|&l| Self::to_lit(l)).collect();
        self.solver.assume(&assumed);

        match self.solver.solve() {
            Ok(true) => {
                self.failed.clear();
                self.model = vec![false; self.var_count];
                if let Some(model) = self.solver.model() {
                    for lit in model {
                        let sat_lit = Self::from_lit(lit);
                        if sat_lit.var.0 < self.var_count {
                            self.model[sat_lit.var.0] = sat_lit.positive;
                        }
                    }
                }
                Ok(true)
            }
            Ok(false) => {
                self.failed = self
                    .solver
                    .failed_core()
                    .unwrap_or(&[])
                    .iter()
                    .map(|&lit| Self::from_lit(lit))
                    .collect();
                Ok(false)
            }
            Err(error) => Err(ResolveError::Internal(format!(
                "satisfiability engine failed: {error}"
            ))),
        }
    }

    fn failed_assumptions(&self) -> Vec<SatLit> {
        self.failed.clone()
    }

    fn model_value(&self, var: SatVar) -> bool {
        self.model.get(var.0).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sat() {
        let mut engine = VarisatEngine::new();
        let a = engine.new_var();
        let b = engine.new_var();
        engine.add_clause(&[SatLit::pos(a), SatLit::pos(b)]);
        engine.add_clause(&[SatLit::neg(a)]);

        assert!(engine.solve(&[]).unwrap());
        assert!(!engine.model_value(a));
        assert!(engine.model_value(b));
    }

    #[test]
    fn test_unsat_reports_failed_assumptions() {
        let mut engine = VarisatEngine::new();
        let a = engine.new_var();
        let b = engine.new_var();
        // a and b are mutually exclusive
        engine.add_clause(&[SatLit::neg(a), SatLit::neg(b)]);

        assert!(!engine.solve(&[SatLit::pos(a), SatLit::pos(b)]).unwrap());
        let failed = engine.failed_assumptions();
        assert!(!failed.is_empty());
        for lit in failed {
            assert!(lit.var == a || lit.var == b);
        }

        // dropping one assumption makes it satisfiable again
        assert!(engine.solve(&[SatLit::pos(a)]).unwrap());
        assert!(engine.model_value(a));
        assert!(!engine.model_value(b));
    }

    #[test]
    fn test_at_most_one() {
        let mut engine = VarisatEngine::new();
        let guard = engine.new_var();
        let options: Vec<SatVar> = (0..3).map(|_| engine.new_var()).collect();
        let lits: Vec<SatLit> = options.iter().map(|&v| SatLit::pos(v)).collect();
        engine.add_at_most_one(SatLit::neg(guard), &lits);

        // with the guard's selector assumed, two options cannot both hold
        let assumptions = [SatLit::pos(guard), lits[0], lits[1]];
        assert!(!engine.solve(&assumptions).unwrap());
        assert!(engine.solve(&[SatLit::pos(guard), lits[0]]).unwrap());
    }
}

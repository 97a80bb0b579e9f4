//! The incremental solver surface.

use crate::search;
use crate::term::Term;
use tracing::warn;

/// Outcome of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    /// A model exists.
    Sat,
    /// No model exists.
    Unsat,
    /// The search budget was exhausted; callers treat this as unsat.
    Unknown,
}

/// The capability set the engine relies on; any backend supporting
/// incremental add, push/pop, and check-under-assumptions can stand in.
pub trait SmtSolver {
    /// Assert a term in the current frame.
    fn add(&mut self, term: Term);

    /// Open a new assertion frame.
    fn push(&mut self);

    /// Discard the most recent frame and its assertions.
    fn pop(&mut self);

    /// Check satisfiability of all asserted terms plus the assumptions.
    fn check(&self, assumptions: &[Term]) -> SatResult;
}

/// Default search budget; generous for interactive-scale assertion sets.
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

/// The built-in finite-model solver.
#[derive(Debug, Clone)]
pub struct Solver {
    assertions: Vec<Term>,
    frames: Vec<usize>,
    step_limit: u64,
}

impl Solver {
    /// An empty solver with the default search budget.
    pub fn new() -> Self {
        Self::with_step_limit(DEFAULT_STEP_LIMIT)
    }

    /// An empty solver with an explicit search budget. Exceeding the budget
    /// makes `check` return [`SatResult::Unknown`].
    pub fn with_step_limit(step_limit: u64) -> Self {
        Self {
            assertions: Vec::new(),
            frames: Vec::new(),
            step_limit,
        }
    }

    /// The currently asserted terms, in assertion order.
    pub fn assertions(&self) -> &[Term] {
        &self.assertions
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Solver {
    fn add(&mut self, term: Term) {
        self.assertions.push(term);
    }

    fn push(&mut self) {
        self.frames.push(self.assertions.len());
    }

    fn pop(&mut self) {
        if let Some(mark) = self.frames.pop() {
            self.assertions.truncate(mark);
        }
    }

    fn check(&self, assumptions: &[Term]) -> SatResult {
        let terms: Vec<&Term> = self.assertions.iter().chain(assumptions.iter()).collect();
        let result = search::check_sat(&terms, self.step_limit);
        if result == SatResult::Unknown {
            warn!(
                assertions = self.assertions.len(),
                assumptions = assumptions.len(),
                "satisfiability search exhausted its step budget; treating as unsat"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Sort, TermVar};
    use casegen_core::Value;

    #[test]
    fn push_pop_restores_assertions() {
        let v = TermVar::new(0, Sort::Str);
        let mut solver = Solver::new();
        solver.add(Term::domain(v, &[Value::from("a"), Value::from("b")]));
        assert_eq!(solver.check(&[]), SatResult::Sat);

        solver.push();
        solver.add(v.eq_value(&Value::from("c")));
        assert_eq!(solver.check(&[]), SatResult::Unsat);
        solver.pop();

        assert_eq!(solver.assertions().len(), 1);
        assert_eq!(solver.check(&[]), SatResult::Sat);
    }

    #[test]
    fn check_under_assumptions_leaves_state_untouched() {
        let v = TermVar::new(0, Sort::Str);
        let mut solver = Solver::new();
        solver.add(Term::domain(v, &[Value::from("a"), Value::from("b")]));

        assert_eq!(solver.check(&[v.eq_value(&Value::from("c"))]), SatResult::Unsat);
        assert_eq!(solver.check(&[v.eq_value(&Value::from("a"))]), SatResult::Sat);
        assert_eq!(solver.assertions().len(), 1);
    }

    #[test]
    fn zero_budget_is_unknown() {
        let v = TermVar::new(0, Sort::Str);
        let mut solver = Solver::with_step_limit(0);
        solver.add(v.eq_value(&Value::from("a")));
        assert_eq!(solver.check(&[]), SatResult::Unknown);
    }
}

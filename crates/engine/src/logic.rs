//! The logic engine: authoritative store of assignment, option-domain, and
//! relational assertions, and the entry point for satisfiability queries.
//!
//! Solver states are ephemeral: every query builds one from the current
//! assertion collections, which keeps rollback trivial (a rejected
//! assignment never touched the stores). `Unknown` results are logged and
//! conservatively treated as unsat.

use crate::error::{EngineError, Result};
use crate::variable::VarId;
use casegen_core::Value;
use casegen_solver::{SatResult, SmtSolver, Solver, Term, TermVar};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// One registered relational assertion.
#[derive(Debug, Clone)]
pub(crate) struct Relation {
    pub(crate) term: Term,
    pub(crate) message: String,
    pub(crate) free_vars: BTreeSet<usize>,
    pub(crate) antecedent_vars: Option<BTreeSet<usize>>,
}

/// Assertion stores plus query entry points.
#[derive(Debug)]
pub(crate) struct LogicEngine {
    /// Per-variable `V == value` assertions; at most one per variable.
    assignments: HashMap<usize, Term>,
    /// Per-variable option-domain disjunctions, replaced atomically.
    options: HashMap<usize, Term>,
    /// Relational assertions in registration order.
    relations: Vec<Relation>,
    /// Every variable occurring in some relation body.
    relational_vars: BTreeSet<usize>,
    /// Search budget handed to each ephemeral solver.
    step_limit: u64,
}

impl LogicEngine {
    pub(crate) fn new(step_limit: u64) -> Self {
        Self {
            assignments: HashMap::new(),
            options: HashMap::new(),
            relations: Vec::new(),
            relational_vars: BTreeSet::new(),
            step_limit,
        }
    }

    /// Install or clear the assignment assertion of a variable.
    pub(crate) fn register_assignment(&mut self, id: VarId, tv: TermVar, value: Option<&Value>) {
        match value {
            Some(v) => {
                self.assignments.insert(id.index(), tv.eq_value(v));
            }
            None => {
                self.assignments.remove(&id.index());
            }
        }
    }

    /// Replace the option-domain assertion of a variable.
    pub(crate) fn register_options(&mut self, id: VarId, tv: TermVar, options: &[Value]) {
        self.options.insert(id.index(), Term::domain(tv, options));
    }

    /// Register one relation; rejects an identical term registered twice.
    pub(crate) fn add_relation(&mut self, relation: Relation) -> Result<()> {
        if self.relations.iter().any(|r| r.term == relation.term) {
            return Err(EngineError::DuplicateRelation(relation.message));
        }
        // Antecedent-only variables influence others but their own option
        // validities never depend on the relation.
        match &relation.antecedent_vars {
            None => self.relational_vars.extend(relation.free_vars.iter().copied()),
            Some(ante) => self
                .relational_vars
                .extend(relation.free_vars.difference(ante).copied()),
        }
        debug!(message = %relation.message, "relational assertion registered");
        self.relations.push(relation);
        Ok(())
    }

    pub(crate) fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub(crate) fn is_relational_var(&self, id: VarId) -> bool {
        self.relational_vars.contains(&id.index())
    }

    /// Solver preloaded with assignments (optionally excluding one
    /// variable's), all option-domain assertions, and optionally all
    /// relations.
    fn base_solver(&self, exclude: Option<VarId>, with_relations: bool) -> Solver {
        let mut solver = Solver::with_step_limit(self.step_limit);
        let excluded = exclude.map(VarId::index);
        for (&id, term) in &self.assignments {
            if Some(id) != excluded {
                solver.add(term.clone());
            }
        }
        for term in self.options.values() {
            solver.add(term.clone());
        }
        if with_relations {
            for relation in &self.relations {
                solver.add(relation.term.clone());
            }
        }
        solver
    }

    /// Global satisfiability of everything currently asserted. Used once at
    /// relation-registration time to catch authoring errors.
    pub(crate) fn check_consistency(&self) -> Result<()> {
        let solver = self.base_solver(None, true);
        match solver.check(&[]) {
            SatResult::Sat => Ok(()),
            SatResult::Unsat => Err(EngineError::InconsistentRelations),
            SatResult::Unknown => {
                warn!("consistency check returned unknown; treating as unsat");
                Err(EngineError::InconsistentRelations)
            }
        }
    }

    /// Would `var == value` be consistent with everything else?
    ///
    /// The variable's own current assignment is excluded, so this answers
    /// the switch question, not the stay question.
    pub(crate) fn check_assignment(&self, id: VarId, tv: TermVar, value: &Value) -> bool {
        let solver = self.base_solver(Some(id), true);
        match solver.check(&[tv.eq_value(value)]) {
            SatResult::Sat => true,
            SatResult::Unsat => false,
            SatResult::Unknown => {
                warn!(var = id.index(), "assignment check returned unknown; treating as unsat");
                false
            }
        }
    }

    /// Per-option satisfiability for a variable, excluding its own
    /// assignment assertion.
    pub(crate) fn options_validities(&self, id: VarId, tv: TermVar, options: &[Value]) -> Vec<bool> {
        let solver = self.base_solver(Some(id), true);
        options
            .iter()
            .map(|option| match solver.check(&[tv.eq_value(option)]) {
                SatResult::Sat => true,
                SatResult::Unsat => false,
                SatResult::Unknown => {
                    warn!(
                        var = id.index(),
                        option = %option,
                        "validity check returned unknown; treating as unsat"
                    );
                    false
                }
            })
            .collect()
    }

    /// The error messages of every relation implicated in rejecting
    /// `var == value`, in registration order. See `explain.rs`.
    pub(crate) fn retrieve_error_msgs(&self, id: VarId, tv: TermVar, value: &Value) -> Vec<String> {
        crate::explain::violated_relations(self, id, tv, value)
    }

    /// Solver with the base state for explanation: assignments minus the
    /// target variable's, plus all option-domain assertions, no relations.
    pub(crate) fn explain_base(&self, exclude: VarId) -> Solver {
        self.base_solver(Some(exclude), false)
    }
}

//! Reconstructing why an assignment was rejected.
//!
//! Against the base state (all other assignment assertions, all
//! option-domain assertions, and the tentative `V == x` as an assumption),
//! two passes over the relations in registration order:
//!
//! 1. each relation alone, via push/add/check/pop: collects every
//!    *individually sufficient* cause;
//! 2. with the full relation set unsat, each relation deleted in turn:
//!    collects every *necessary* member of a compound cause (a rejection
//!    that no single relation produces, e.g. one relation forcing
//!    `COMP_LND == "clm"` while another forbids it).
//!
//! The union, in registration order, is what the user sees. If both passes
//! come back empty the message falls back to every relation mentioning the
//! variable.

use crate::logic::LogicEngine;
use crate::variable::VarId;
use casegen_core::Value;
use casegen_solver::{SatResult, SmtSolver, TermVar};
use std::collections::BTreeSet;

/// Messages of the relations implicated in rejecting `var == value`.
pub(crate) fn violated_relations(
    logic: &LogicEngine,
    id: VarId,
    tv: TermVar,
    value: &Value,
) -> Vec<String> {
    let relations = logic.relations();
    let assumption = tv.eq_value(value);
    let mut implicated: BTreeSet<usize> = BTreeSet::new();

    // Pass 1: individually sufficient causes.
    let mut base = logic.explain_base(id);
    for (i, relation) in relations.iter().enumerate() {
        base.push();
        base.add(relation.term.clone());
        if base.check(std::slice::from_ref(&assumption)) != SatResult::Sat {
            implicated.insert(i);
        }
        base.pop();
    }

    // Pass 2: necessary members of a compound cause.
    let mut full = logic.explain_base(id);
    for relation in relations {
        full.add(relation.term.clone());
    }
    if full.check(std::slice::from_ref(&assumption)) != SatResult::Sat {
        for skip in 0..relations.len() {
            let mut partial = logic.explain_base(id);
            for (i, relation) in relations.iter().enumerate() {
                if i != skip {
                    partial.add(relation.term.clone());
                }
            }
            if partial.check(std::slice::from_ref(&assumption)) == SatResult::Sat {
                implicated.insert(skip);
            }
        }
    }

    if implicated.is_empty() {
        // Over-constrained compound set with no single necessary member;
        // report everything touching the variable.
        return relations
            .iter()
            .filter(|r| r.free_vars.contains(&id.index()))
            .map(|r| r.message.clone())
            .collect();
    }

    implicated
        .into_iter()
        .map(|i| relations[i].message.clone())
        .collect()
}

//! Finite-model satisfiability search.
//!
//! The engine's assertion fragment has the finite-model property: every
//! atom compares a variable against a constant (or two variables for
//! equality), so satisfiability only depends on which *region* each
//! variable's value falls in. The search enumerates one witness per region:
//!
//! - string variables range over the constants they are compared against,
//!   plus one shared and one per-variable fresh witness (deciding equalities
//!   and disequalities between variables and against constants);
//! - numeric variables additionally get midpoints between consecutive
//!   constants and one witness beyond each end (deciding conjunctions of
//!   ordered comparisons against constants);
//! - booleans range over both polarities.
//!
//! Depth-first search assigns candidates in variable order and evaluates
//! every assertion three-valued after each assignment: a `false` prunes the
//! branch, all-`true` accepts early. A step budget turns pathological
//! searches into [`SatResult::Unknown`].

use crate::solver::SatResult;
use crate::term::{Sort, Term, TermVar};
use casegen_core::{CmpOp, Real, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Decide satisfiability of the conjunction of `terms`.
pub(crate) fn check_sat(terms: &[&Term], step_limit: u64) -> SatResult {
    let mut vars = BTreeMap::new();
    for t in terms {
        t.visit_vars(&mut |v: TermVar| {
            vars.insert(v.id, v.sort);
        });
    }

    let mut consts: BTreeMap<usize, BTreeSet<Value>> = BTreeMap::new();
    for t in terms {
        collect_consts(t, &mut consts);
    }

    // Top-level `var == const` atoms (assignment assertions, assumptions)
    // pin their variable outright; only the rest are searched.
    let mut assignment = BTreeMap::new();
    for t in terms {
        if let Term::Cmp {
            op: CmpOp::Eq,
            lhs,
            rhs,
        } = t
        {
            match (&**lhs, &**rhs) {
                (Term::Var(v), Term::Const(c)) | (Term::Const(c), Term::Var(v)) => {
                    // A conflicting duplicate shows up as a false atom at
                    // the search root.
                    assignment.insert(v.id, c.clone());
                }
                _ => {}
            }
        }
    }

    let order: Vec<usize> = vars
        .keys()
        .copied()
        .filter(|id| !assignment.contains_key(id))
        .collect();
    let domains: BTreeMap<usize, Vec<Value>> = vars
        .iter()
        .map(|(&id, &sort)| (id, candidates(sort, id, consts.get(&id))))
        .collect();

    let mut search = Search {
        terms,
        order,
        domains,
        steps: 0,
        step_limit,
    };
    search.dfs(0, &mut assignment)
}

struct Search<'a> {
    terms: &'a [&'a Term],
    order: Vec<usize>,
    domains: BTreeMap<usize, Vec<Value>>,
    steps: u64,
    step_limit: u64,
}

impl Search<'_> {
    fn dfs(&mut self, depth: usize, assignment: &mut BTreeMap<usize, Value>) -> SatResult {
        self.steps += 1;
        if self.steps > self.step_limit {
            return SatResult::Unknown;
        }

        let lookup = |id: usize| assignment.get(&id).cloned();
        let mut all_known = true;
        for t in self.terms {
            match evaluate(t, &lookup) {
                Some(false) => return SatResult::Unsat,
                Some(true) => {}
                None => all_known = false,
            }
        }
        if all_known {
            return SatResult::Sat;
        }
        if depth >= self.order.len() {
            // Ground assignments always evaluate; unreachable in practice.
            return SatResult::Unsat;
        }

        // Some assertion is still undetermined, so an unassigned variable
        // remains at or after `depth`.
        let var = self.order[depth];
        let domain = self.domains[&var].clone();
        for candidate in domain {
            assignment.insert(var, candidate);
            match self.dfs(depth + 1, assignment) {
                SatResult::Sat => return SatResult::Sat,
                SatResult::Unknown => return SatResult::Unknown,
                SatResult::Unsat => {}
            }
        }
        assignment.remove(&var);
        SatResult::Unsat
    }
}

/// Gather the constants each variable is compared against.
fn collect_consts(term: &Term, map: &mut BTreeMap<usize, BTreeSet<Value>>) {
    match term {
        Term::Cmp { lhs, rhs, .. } => match (&**lhs, &**rhs) {
            (Term::Var(v), Term::Const(c)) | (Term::Const(c), Term::Var(v)) => {
                map.entry(v.id).or_default().insert(c.clone());
            }
            _ => {
                collect_consts(lhs, map);
                collect_consts(rhs, map);
            }
        },
        Term::And(ts) | Term::Or(ts) => {
            for t in ts {
                collect_consts(t, map);
            }
        }
        Term::Not(t) => collect_consts(t, map),
        Term::Implies(a, b) => {
            collect_consts(a, map);
            collect_consts(b, map);
        }
        Term::Var(_) | Term::Const(_) => {}
    }
}

fn fresh_str(tag: usize) -> Value {
    // Control-character prefix keeps witnesses disjoint from host strings.
    Value::Str(format!("\u{1}other{}", tag))
}

fn candidates(sort: Sort, id: usize, consts: Option<&BTreeSet<Value>>) -> Vec<Value> {
    match sort {
        Sort::Bool => vec![Value::Bool(false), Value::Bool(true)],

        Sort::Str => {
            let mut out: Vec<Value> = consts.into_iter().flatten().cloned().collect();
            out.push(fresh_str(usize::MAX));
            out.push(fresh_str(id));
            out
        }

        Sort::Int => {
            let points: BTreeSet<i64> = consts
                .into_iter()
                .flatten()
                .filter_map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            let mut out = points.clone();
            if let (Some(&min), Some(&max)) = (points.iter().next(), points.iter().next_back()) {
                out.insert(min.saturating_sub(1));
                out.insert(max.saturating_add(1));
                for (&a, &b) in points.iter().zip(points.iter().skip(1)) {
                    if b - a >= 2 {
                        out.insert(a + (b - a) / 2);
                    }
                }
            } else {
                out.insert(0);
            }
            out.into_iter().map(Value::Int).collect()
        }

        Sort::Real => {
            let points: BTreeSet<Real> = consts
                .into_iter()
                .flatten()
                .filter_map(|v| match v {
                    Value::Real(r) => Some(*r),
                    _ => None,
                })
                .collect();
            let mut out = points.clone();
            if let (Some(&min), Some(&max)) = (points.iter().next(), points.iter().next_back()) {
                out.insert(Real::new(min.get() - 1.0));
                out.insert(Real::new(max.get() + 1.0));
                for (&a, &b) in points.iter().zip(points.iter().skip(1)) {
                    out.insert(Real::new(a.get() + (b.get() - a.get()) / 2.0));
                }
            } else {
                out.insert(Real::new(0.0));
            }
            out.into_iter().map(Value::Real).collect()
        }
    }
}

/// Three-valued (Kleene) evaluation of a formula under a partial assignment.
///
/// `lookup` maps a variable's arena index to its current value; `None` means
/// unset. Returns `None` when the formula's truth is not yet determined.
/// The stage machine uses this directly for guard evaluation.
pub fn evaluate(term: &Term, lookup: &dyn Fn(usize) -> Option<Value>) -> Option<bool> {
    match term {
        Term::Var(v) => match lookup(v.id) {
            Some(Value::Bool(b)) => Some(b),
            Some(_) => Some(false),
            None => None,
        },

        Term::Const(Value::Bool(b)) => Some(*b),
        Term::Const(_) => Some(false),

        Term::Cmp { op, lhs, rhs } => {
            let l = eval_value(lhs, lookup)?;
            let r = eval_value(rhs, lookup)?;
            Some(compare(*op, &l, &r))
        }

        Term::And(ts) => {
            let mut unknown = false;
            for t in ts {
                match evaluate(t, lookup) {
                    Some(false) => return Some(false),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            if unknown {
                None
            } else {
                Some(true)
            }
        }

        Term::Or(ts) => {
            let mut unknown = false;
            for t in ts {
                match evaluate(t, lookup) {
                    Some(true) => return Some(true),
                    None => unknown = true,
                    Some(false) => {}
                }
            }
            if unknown {
                None
            } else {
                Some(false)
            }
        }

        Term::Not(t) => evaluate(t, lookup).map(|b| !b),

        Term::Implies(a, b) => match (evaluate(a, lookup), evaluate(b, lookup)) {
            (Some(false), _) | (_, Some(true)) => Some(true),
            (Some(true), Some(false)) => Some(false),
            _ => None,
        },
    }
}

fn eval_value(term: &Term, lookup: &dyn Fn(usize) -> Option<Value>) -> Option<Value> {
    match term {
        Term::Var(v) => lookup(v.id),
        Term::Const(c) => Some(c.clone()),
        _ => evaluate(term, lookup).map(Value::Bool),
    }
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> bool {
    // Mixed-sort orderings are rejected at compile time.
    let ordering = match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Real(a), Value::Real(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        CmpOp::Lt => matches!(ordering, Some(o) if o.is_lt()),
        CmpOp::Le => matches!(ordering, Some(o) if !o.is_gt()),
        CmpOp::Gt => matches!(ordering, Some(o) if o.is_gt()),
        CmpOp::Ge => matches!(ordering, Some(o) if !o.is_lt()),
    }
}

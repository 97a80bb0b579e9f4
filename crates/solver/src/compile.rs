//! Lowering from the surface expression language to solver terms.
//!
//! Besides the term itself, lowering reports the free-variable set of the
//! assertion and, for `When` forms, the antecedent-variable set; the engine
//! derives peer/parent/child relationships from these.

use crate::term::{Sort, Term, TermVar};
use casegen_core::{CmpOp, Expression, Value};
use std::collections::BTreeSet;
use thiserror::Error;

/// Name-to-solver-constant resolution, implemented by the variable registry.
pub trait VarResolver {
    /// Resolve a variable name to its solver constant.
    fn resolve(&self, name: &str) -> Option<TermVar>;
}

/// The result of lowering one top-level assertion.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// The lowered term.
    pub term: Term,
    /// Arena indices of every variable occurring in the assertion.
    pub free_vars: BTreeSet<usize>,
    /// For `When` assertions, the arena indices of antecedent variables.
    pub antecedent_vars: Option<BTreeSet<usize>>,
}

/// Errors raised while lowering an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The expression references a variable the registry does not know.
    #[error("unknown variable '{0}' in relational assertion")]
    UnknownVariable(String),

    /// Comparison operands have different sorts.
    #[error("sort mismatch: cannot compare {lhs:?} with {rhs:?}")]
    SortMismatch {
        /// Left operand sort.
        lhs: Sort,
        /// Right operand sort.
        rhs: Sort,
    },

    /// Ordered comparison over a non-numeric sort.
    #[error("ordered comparison requires a numeric sort, got {0:?}")]
    UnorderedSort(Sort),

    /// Ordered comparison between two variables; the backend only decides
    /// variable/constant orderings.
    #[error("ordered comparisons between two variables are not supported")]
    UnsupportedComparison,

    /// A connective operand is not boolean.
    #[error("boolean connective applied to a {0:?}-sorted operand")]
    NonBoolean(Sort),

    /// Membership choice constant has the wrong sort.
    #[error("membership choice '{choice}' does not match the {sort:?} sort of the variable")]
    BadChoice {
        /// The offending constant.
        choice: Value,
        /// The variable's sort.
        sort: Sort,
    },
}

/// Lower a top-level assertion expression.
pub fn compile(
    expr: &Expression,
    resolver: &impl VarResolver,
) -> Result<Compiled, CompileError> {
    let mut free_vars = BTreeSet::new();
    let (term, sort) = lower(expr, resolver, &mut free_vars)?;
    if sort != Sort::Bool {
        return Err(CompileError::NonBoolean(sort));
    }
    let antecedent_vars = match expr {
        Expression::When { antecedent, .. } => {
            let mut ante = BTreeSet::new();
            lower(antecedent, resolver, &mut ante)?;
            Some(ante)
        }
        _ => None,
    };
    Ok(Compiled {
        term,
        free_vars,
        antecedent_vars,
    })
}

fn lower(
    expr: &Expression,
    resolver: &impl VarResolver,
    free: &mut BTreeSet<usize>,
) -> Result<(Term, Sort), CompileError> {
    match expr {
        Expression::Lit(v) => Ok((Term::Const(v.clone()), Sort::from(v.kind()))),

        Expression::Var(name) => {
            let tv = resolver
                .resolve(name)
                .ok_or_else(|| CompileError::UnknownVariable(name.clone()))?;
            free.insert(tv.id);
            Ok((Term::Var(tv), tv.sort))
        }

        Expression::Cmp { op, lhs, rhs } => {
            let (l, ls) = lower(lhs, resolver, free)?;
            let (r, rs) = lower(rhs, resolver, free)?;
            if ls != rs {
                return Err(CompileError::SortMismatch { lhs: ls, rhs: rs });
            }
            if !matches!(op, CmpOp::Eq | CmpOp::Ne) {
                if !ls.is_numeric() {
                    return Err(CompileError::UnorderedSort(ls));
                }
                if matches!(l, Term::Var(_)) && matches!(r, Term::Var(_)) {
                    return Err(CompileError::UnsupportedComparison);
                }
            }
            Ok((
                Term::Cmp {
                    op: *op,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                },
                Sort::Bool,
            ))
        }

        Expression::In { var, choices } => {
            let (v, vs) = lower(var, resolver, free)?;
            let mut arms = Vec::with_capacity(choices.len());
            for choice in choices {
                if Sort::from(choice.kind()) != vs {
                    return Err(CompileError::BadChoice {
                        choice: choice.clone(),
                        sort: vs,
                    });
                }
                arms.push(Term::Cmp {
                    op: CmpOp::Eq,
                    lhs: Box::new(v.clone()),
                    rhs: Box::new(Term::Const(choice.clone())),
                });
            }
            Ok((Term::Or(arms), Sort::Bool))
        }

        Expression::And(exprs) => Ok((Term::And(lower_bools(exprs, resolver, free)?), Sort::Bool)),

        Expression::Or(exprs) => Ok((Term::Or(lower_bools(exprs, resolver, free)?), Sort::Bool)),

        Expression::Not(e) => {
            let (t, s) = lower(e, resolver, free)?;
            if s != Sort::Bool {
                return Err(CompileError::NonBoolean(s));
            }
            Ok((Term::Not(Box::new(t)), Sort::Bool))
        }

        Expression::Implies {
            antecedent,
            consequent,
        }
        | Expression::When {
            antecedent,
            consequent,
        } => {
            let (a, asort) = lower(antecedent, resolver, free)?;
            let (c, csort) = lower(consequent, resolver, free)?;
            if asort != Sort::Bool {
                return Err(CompileError::NonBoolean(asort));
            }
            if csort != Sort::Bool {
                return Err(CompileError::NonBoolean(csort));
            }
            Ok((Term::Implies(Box::new(a), Box::new(c)), Sort::Bool))
        }
    }
}

fn lower_bools(
    exprs: &[Expression],
    resolver: &impl VarResolver,
    free: &mut BTreeSet<usize>,
) -> Result<Vec<Term>, CompileError> {
    exprs
        .iter()
        .map(|e| {
            let (t, s) = lower(e, resolver, free)?;
            if s != Sort::Bool {
                return Err(CompileError::NonBoolean(s));
            }
            Ok(t)
        })
        .collect()
}

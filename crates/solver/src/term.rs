//! Solver-level terms.
//!
//! Terms are the lowered form of [`casegen_core::expr::Expression`]: `When`
//! has been flattened into implication, `In` into a disjunction of
//! equalities, and variable references into [`TermVar`] constants that are
//! created once per configuration variable and reused for its lifetime.
//! Terms are `Eq + Hash` so relational assertions can be keyed by term.

use casegen_core::{CmpOp, Value, ValueKind};
use std::fmt;

/// A solver sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    /// String sort.
    Str,
    /// Boolean sort.
    Bool,
    /// Integer sort.
    Int,
    /// Real sort.
    Real,
}

impl Sort {
    /// True for sorts that admit ordered comparisons.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Real)
    }
}

impl From<ValueKind> for Sort {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Str => Self::Str,
            ValueKind::Bool => Self::Bool,
            ValueKind::Int => Self::Int,
            ValueKind::Real => Self::Real,
        }
    }
}

/// A solver variable constant: one per configuration variable, identified by
/// the variable's arena index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermVar {
    /// Arena index of the owning configuration variable.
    pub id: usize,
    /// The variable's sort.
    pub sort: Sort,
}

impl TermVar {
    /// Construct the variable constant for an arena index.
    pub fn new(id: usize, sort: Sort) -> Self {
        Self { id, sort }
    }

    /// The term `self == value`.
    pub fn eq_value(self, value: &Value) -> Term {
        Term::Cmp {
            op: CmpOp::Eq,
            lhs: Box::new(Term::Var(self)),
            rhs: Box::new(Term::Const(value.clone())),
        }
    }
}

/// A lowered assertion term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Variable constant.
    Var(TermVar),
    /// Literal constant.
    Const(Value),
    /// Comparison.
    Cmp {
        /// Operator.
        op: CmpOp,
        /// Left operand.
        lhs: Box<Term>,
        /// Right operand.
        rhs: Box<Term>,
    },
    /// Conjunction.
    And(Vec<Term>),
    /// Disjunction.
    Or(Vec<Term>),
    /// Negation.
    Not(Box<Term>),
    /// Implication.
    Implies(Box<Term>, Box<Term>),
}

impl Term {
    /// Disjunction of `var == o` over the given options: the option-domain
    /// assertion for a variable.
    pub fn domain(var: TermVar, options: &[Value]) -> Term {
        Term::Or(options.iter().map(|o| var.eq_value(o)).collect())
    }

    /// Walk all variable constants occurring in this term.
    pub fn visit_vars(&self, f: &mut impl FnMut(TermVar)) {
        match self {
            Term::Var(v) => f(*v),
            Term::Const(_) => {}
            Term::Cmp { lhs, rhs, .. } => {
                lhs.visit_vars(f);
                rhs.visit_vars(f);
            }
            Term::And(ts) | Term::Or(ts) => {
                for t in ts {
                    t.visit_vars(f);
                }
            }
            Term::Not(t) => t.visit_vars(f),
            Term::Implies(a, b) => {
                a.visit_vars(f);
                b.visit_vars(f);
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "v{}", v.id),
            Term::Const(c) => write!(f, "{}", c),
            Term::Cmp { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Term::And(ts) => {
                write!(f, "(and")?;
                for t in ts {
                    write!(f, " {}", t)?;
                }
                write!(f, ")")
            }
            Term::Or(ts) => {
                write!(f, "(or")?;
                for t in ts {
                    write!(f, " {}", t)?;
                }
                write!(f, ")")
            }
            Term::Not(t) => write!(f, "(not {})", t),
            Term::Implies(a, b) => write!(f, "({} => {})", a, b),
        }
    }
}

//! The relational expression language.
//!
//! Relational assertions between configuration variables are written as
//! [`Expression`] trees: variable references and literals at the leaves,
//! comparisons and boolean connectives above them, and two preconditioned
//! forms (`Implies` and its tagged sibling `When`). The solver crate lowers
//! expressions to solver terms; this module only defines the surface
//! language and its builders.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators. Ordered comparisons apply to numeric variables only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    /// Equality.
    Eq,
    /// Disequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// A relational assertion expression over configuration variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    /// Constant literal.
    Lit(Value),

    /// Reference to a configuration variable by name.
    Var(String),

    /// Comparison: `lhs op rhs`.
    Cmp {
        /// Operator.
        op: CmpOp,
        /// Left operand.
        lhs: Box<Expression>,
        /// Right operand.
        rhs: Box<Expression>,
    },

    /// Set membership: sugar for `var == c₁ ∨ … ∨ var == cₙ`.
    In {
        /// The variable reference being constrained.
        var: Box<Expression>,
        /// Candidate constants.
        choices: Vec<Value>,
    },

    /// Conjunction.
    And(Vec<Expression>),

    /// Disjunction.
    Or(Vec<Expression>),

    /// Negation.
    Not(Box<Expression>),

    /// Material implication.
    Implies {
        /// Antecedent.
        antecedent: Box<Expression>,
        /// Consequent.
        consequent: Box<Expression>,
    },

    /// Preconditioned invariant: compiled like `Implies`, but tagged so the
    /// layer graph records antecedent variables as parents rather than peers.
    When {
        /// Antecedent (the precondition).
        antecedent: Box<Expression>,
        /// Consequent.
        consequent: Box<Expression>,
    },
}

impl Expression {
    fn cmp(self, op: CmpOp, rhs: impl Into<Expression>) -> Expression {
        Expression::Cmp {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs.into()),
        }
    }

    /// `self == rhs`.
    pub fn eq(self, rhs: impl Into<Expression>) -> Expression {
        self.cmp(CmpOp::Eq, rhs)
    }

    /// `self != rhs`.
    pub fn ne(self, rhs: impl Into<Expression>) -> Expression {
        self.cmp(CmpOp::Ne, rhs)
    }

    /// `self < rhs`.
    pub fn lt(self, rhs: impl Into<Expression>) -> Expression {
        self.cmp(CmpOp::Lt, rhs)
    }

    /// `self <= rhs`.
    pub fn le(self, rhs: impl Into<Expression>) -> Expression {
        self.cmp(CmpOp::Le, rhs)
    }

    /// `self > rhs`.
    pub fn gt(self, rhs: impl Into<Expression>) -> Expression {
        self.cmp(CmpOp::Gt, rhs)
    }

    /// `self >= rhs`.
    pub fn ge(self, rhs: impl Into<Expression>) -> Expression {
        self.cmp(CmpOp::Ge, rhs)
    }

    /// Set membership over the given candidate constants.
    pub fn is_in<V, I>(self, choices: I) -> Expression
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Expression::In {
            var: Box::new(self),
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Value> for Expression {
    fn from(v: Value) -> Self {
        Expression::Lit(v)
    }
}

impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::Lit(Value::from(s))
    }
}

impl From<String> for Expression {
    fn from(s: String) -> Self {
        Expression::Lit(Value::from(s))
    }
}

impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Expression::Lit(Value::from(b))
    }
}

impl From<i64> for Expression {
    fn from(i: i64) -> Self {
        Expression::Lit(Value::from(i))
    }
}

impl From<f64> for Expression {
    fn from(v: f64) -> Self {
        Expression::Lit(Value::from(v))
    }
}

/// Reference a configuration variable by name.
pub fn var(name: impl Into<String>) -> Expression {
    Expression::Var(name.into())
}

/// A constant literal.
pub fn lit(value: impl Into<Value>) -> Expression {
    Expression::Lit(value.into())
}

/// Conjunction of the given expressions.
pub fn all_of(exprs: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::And(exprs.into_iter().collect())
}

/// Disjunction of the given expressions.
pub fn any_of(exprs: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::Or(exprs.into_iter().collect())
}

/// Negation.
pub fn not(expr: Expression) -> Expression {
    Expression::Not(Box::new(expr))
}

/// Material implication.
pub fn implies(antecedent: Expression, consequent: Expression) -> Expression {
    Expression::Implies {
        antecedent: Box::new(antecedent),
        consequent: Box::new(consequent),
    }
}

/// Preconditioned invariant (see [`Expression::When`]).
pub fn when(antecedent: Expression, consequent: Expression) -> Expression {
    Expression::When {
        antecedent: Box::new(antecedent),
        consequent: Box::new(consequent),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lit(v) => write!(f, "{}", v),
            Self::Var(name) => write!(f, "{}", name),
            Self::Cmp { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Self::In { var, choices } => {
                write!(f, "({} in [", var)?;
                for (i, c) in choices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "])")
            }
            Self::And(exprs) => {
                write!(f, "(and")?;
                for e in exprs {
                    write!(f, " {}", e)?;
                }
                write!(f, ")")
            }
            Self::Or(exprs) => {
                write!(f, "(or")?;
                for e in exprs {
                    write!(f, " {}", e)?;
                }
                write!(f, ")")
            }
            Self::Not(e) => write!(f, "(not {})", e),
            Self::Implies {
                antecedent,
                consequent,
            } => write!(f, "({} => {})", antecedent, consequent),
            Self::When {
                antecedent,
                consequent,
            } => write!(f, "(when {} then {})", antecedent, consequent),
        }
    }
}

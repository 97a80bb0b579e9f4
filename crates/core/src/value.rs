//! Typed configuration values.
//!
//! Every configuration variable carries a value slot of exactly one kind
//! (string, bool, int, or real); an unset slot is `Option<Value>::None`.
//! Values are totally ordered and hashable so they can key validity maps
//! and solver domains.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A real-valued constant compared by its total order.
///
/// Wraps an `f64` so `Value` can be `Eq + Hash + Ord`. The engine never does
/// arithmetic on reals; it only round-trips host-supplied constants, so
/// bit-level identity (via `f64::total_cmp`) is the right equivalence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Real(f64);

impl Real {
    /// Wrap a raw `f64`.
    pub fn new(v: f64) -> Self {
        Self(v)
    }

    /// The underlying `f64`.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == std::cmp::Ordering::Equal
    }
}

impl Eq for Real {}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Real {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for Real {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for Real {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    /// String value.
    Str(String),
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer value.
    Int(i64),
    /// Real value.
    Real(Real),
}

impl Value {
    /// The kind discriminant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Str(_) => ValueKind::Str,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Real(_) => ValueKind::Real,
        }
    }

    /// The string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{}", s),
            // "True"/"False" is the display form the presentation layer
            // shows and parses back.
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(Real::new(v))
    }
}

/// Error raised when a display string cannot be parsed into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse '{input}' as a {kind} value")]
pub struct ParseValueError {
    /// The offending display string.
    pub input: String,
    /// The kind that was expected.
    pub kind: ValueKind,
}

/// The kind discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// String-valued variable.
    Str,
    /// Bool-valued variable.
    Bool,
    /// Int-valued variable.
    Int,
    /// Real-valued variable.
    Real,
}

impl ValueKind {
    /// Human-readable kind name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Real => "real",
        }
    }

    /// True for kinds that admit ordered comparisons.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Real)
    }

    /// Parse a display string (as shown by a presentation sink, marker glyph
    /// already stripped) into a value of this kind.
    pub fn parse_display(self, input: &str) -> Result<Value, ParseValueError> {
        let err = || ParseValueError {
            input: input.to_string(),
            kind: self,
        };
        match self {
            Self::Str => Ok(Value::Str(input.to_string())),
            Self::Bool => match input {
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                _ => Err(err()),
            },
            Self::Int => input.parse::<i64>().map(Value::Int).map_err(|_| err()),
            Self::Real => input
                .parse::<f64>()
                .map(|v| Value::Real(Real::new(v)))
                .map_err(|_| err()),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_detection() {
        assert_eq!(Value::from("cam").kind(), ValueKind::Str);
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
        assert_eq!(Value::from(42i64).kind(), ValueKind::Int);
        assert_eq!(Value::from(360.0).kind(), ValueKind::Real);
    }

    #[test]
    fn display_round_trip() {
        for (kind, display) in [
            (ValueKind::Str, "mom"),
            (ValueKind::Bool, "True"),
            (ValueKind::Int, "100"),
            (ValueKind::Real, "360"),
        ] {
            let value = kind.parse_display(display).unwrap();
            assert_eq!(value.to_string(), display);
        }
    }

    #[test]
    fn parse_rejects_wrong_kind() {
        assert!(ValueKind::Bool.parse_display("yes").is_err());
        assert!(ValueKind::Int.parse_display("10.5").is_err());
        assert!(ValueKind::Real.parse_display("Global").is_err());
    }

    #[test]
    fn real_total_order() {
        assert_eq!(Value::from(360.0), Value::from(360.0));
        assert!(Real::new(10.0) < Real::new(180.0));
        assert_ne!(Value::from(180.0), Value::from(181.0));
    }

    #[test]
    fn serde_round_trip() {
        for value in [
            Value::from("mom"),
            Value::from(true),
            Value::from(100i64),
            Value::from(360.0),
        ] {
            let json = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value, back);
        }
    }
}

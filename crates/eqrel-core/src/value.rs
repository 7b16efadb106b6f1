//! Scalar values held by variables.
//!
//! The resolver works on `f64`; a [`ValueKind`] decides which of those raw
//! numbers a variable may take and how the result is presented on read.

use std::fmt;

/// The scalar type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    /// Signed integer; only integral solutions are accepted.
    #[default]
    Int,
    /// Floating point.
    Float,
    /// Boolean, solved as `0` or `1`.
    Bool,
}

impl ValueKind {
    /// Returns the default value of this kind.
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Bool => Value::Bool(false),
        }
    }

    /// Returns true if `raw` is a legal value of this kind within `tolerance`.
    pub fn admits(self, raw: f64, tolerance: f64) -> bool {
        if !raw.is_finite() {
            return false;
        }
        match self {
            ValueKind::Int => (raw - raw.round()).abs() <= tolerance,
            ValueKind::Float => true,
            ValueKind::Bool => raw.abs() <= tolerance || (raw - 1.0).abs() <= tolerance,
        }
    }

    /// Returns true if values of this kind are discrete.
    pub fn is_discrete(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Bool)
    }
}

/// Which graph a variable belongs to.
///
/// Value variables and priority levels never share a relation; levels only
/// reach value relations as their priority tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// Ordinary variable whose value is read by clients.
    Value,
    /// Priority level ranking conditional relations.
    Priority,
}

/// A resolved scalar value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// Builds a value of `kind` from a raw solver number.
    pub fn from_raw(kind: ValueKind, raw: f64) -> Self {
        match kind {
            ValueKind::Int => Value::Int(raw.round() as i64),
            ValueKind::Float => Value::Float(raw),
            ValueKind::Bool => Value::Bool(raw > 0.5),
        }
    }

    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// Returns the value as a solver number.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
            Value::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Returns the integer, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
        }
    }
}

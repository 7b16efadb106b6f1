//! Relations in negation normal form.
//!
//! A [`Formula`] is what the resolver consumes: conjunctions and disjunctions
//! over [`Atom`]s, where every atom compares a numeric difference with zero.

use std::collections::BTreeSet;
use std::fmt;

use smallvec::SmallVec;

use super::poly::Poly;
use super::Expr;
use crate::id::VarId;

/// Comparison operator of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Returns the operator describing the negated comparison.
    pub fn negate(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }

    /// Returns the operator with operands swapped (`a < b` is `b > a`).
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            other => other,
        }
    }

    /// Tests `diff <op> 0` within `tolerance`.
    #[inline]
    pub fn holds(self, diff: f64, tolerance: f64) -> bool {
        if !diff.is_finite() {
            return false;
        }
        match self {
            CompareOp::Eq => diff.abs() <= tolerance,
            CompareOp::Ne => diff.abs() > tolerance,
            CompareOp::Lt => diff < -tolerance,
            CompareOp::Le => diff <= tolerance,
            CompareOp::Gt => diff > tolerance,
            CompareOp::Ge => diff >= -tolerance,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single comparison `diff <op> 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    op: CompareOp,
    diff: Expr,
    vars: SmallVec<[VarId; 4]>,
}

impl Atom {
    pub fn new(op: CompareOp, diff: Expr) -> Self {
        let vars = diff.vars().into_iter().map(|v| v.id).collect();
        Self { op, diff, vars }
    }

    #[inline]
    pub fn op(&self) -> CompareOp {
        self.op
    }

    #[inline]
    pub fn diff(&self) -> &Expr {
        &self.diff
    }

    /// Variables referenced by the atom, ordered by id.
    #[inline]
    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }

    #[inline]
    pub fn is_equality(&self) -> bool {
        self.op == CompareOp::Eq
    }

    /// Evaluates the atom when every variable is known.
    ///
    /// An undefined difference (division by zero) never holds.
    pub fn evaluate<F>(&self, lookup: &F, tolerance: f64) -> Option<bool>
    where
        F: Fn(VarId) -> Option<f64>,
    {
        if self.vars.iter().any(|v| lookup(*v).is_none()) {
            return None;
        }
        Some(
            self.diff
                .eval(lookup)
                .is_some_and(|d| self.op.holds(d, tolerance)),
        )
    }

    /// Returns the difference as a polynomial over the unknown variables.
    pub fn poly<F>(&self, lookup: &F) -> Option<Poly>
    where
        F: Fn(VarId) -> Option<f64>,
    {
        Poly::from_expr(&self.diff, lookup)
    }
}

/// A relation in negation normal form.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    Const(bool),
    Atom(Atom),
    All(Vec<Formula>),
    Any(Vec<Formula>),
}

impl Formula {
    /// Builds a conjunction, flattening nested conjunctions.
    pub fn all(parts: Vec<Formula>) -> Self {
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Formula::All(inner) => out.extend(inner),
                Formula::Const(true) => {}
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::Const(true),
            1 => out.pop().unwrap_or(Formula::Const(true)),
            _ => Formula::All(out),
        }
    }

    /// Builds a disjunction, flattening nested disjunctions.
    pub fn any(parts: Vec<Formula>) -> Self {
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Formula::Any(inner) => out.extend(inner),
                Formula::Const(false) => {}
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::Const(false),
            1 => out.pop().unwrap_or(Formula::Const(false)),
            _ => Formula::Any(out),
        }
    }

    /// Returns the variables referenced anywhere in the formula.
    pub fn vars(&self) -> BTreeSet<VarId> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<VarId>) {
        match self {
            Formula::Const(_) => {}
            Formula::Atom(a) => out.extend(a.vars().iter().copied()),
            Formula::All(parts) | Formula::Any(parts) => {
                for p in parts {
                    p.collect_vars(out);
                }
            }
        }
    }

    /// Returns true if any atom is an equality.
    ///
    /// Relations with an equality can pin values and select among candidate
    /// solutions; the others only confirm or reject them.
    pub fn has_equality(&self) -> bool {
        match self {
            Formula::Const(_) => false,
            Formula::Atom(a) => a.is_equality(),
            Formula::All(parts) | Formula::Any(parts) => parts.iter().any(Formula::has_equality),
        }
    }

    /// Splits a conjunction into its parts.
    pub fn into_conjuncts(self) -> Vec<Formula> {
        match self {
            Formula::All(parts) => parts,
            Formula::Const(true) => Vec::new(),
            other => vec![other],
        }
    }

    /// Evaluates the formula when every variable is known.
    pub fn evaluate<F>(&self, lookup: &F, tolerance: f64) -> Option<bool>
    where
        F: Fn(VarId) -> Option<f64>,
    {
        match self {
            Formula::Const(b) => Some(*b),
            Formula::Atom(a) => a.evaluate(lookup, tolerance),
            Formula::All(parts) => {
                let mut result = true;
                for p in parts {
                    result &= p.evaluate(lookup, tolerance)?;
                }
                Some(result)
            }
            Formula::Any(parts) => {
                let mut result = false;
                for p in parts {
                    result |= p.evaluate(lookup, tolerance)?;
                }
                Some(result)
            }
        }
    }
}

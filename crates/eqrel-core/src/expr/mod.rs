//! Expression builder for declaring relations.
//!
//! Expressions are plain trees over variable references and constants.
//! Arithmetic uses `std::ops`; comparisons and logic use named combinators,
//! since Rust comparison operators must return `bool`:
//!
//! ```
//! use eqrel_core::{Category, Expr, ValueKind, VarId, VarRef};
//!
//! let x = Expr::var(VarRef::new(VarId::new(0), ValueKind::Int, Category::Value));
//! let y = Expr::var(VarRef::new(VarId::new(1), ValueKind::Int, Category::Value));
//!
//! let rel = y.equals(2 * x.clone()).and(x.greater(0));
//! let formula = rel.to_formula().unwrap();
//! assert_eq!(formula.vars().len(), 2);
//! ```

mod formula;
mod poly;


use std::collections::BTreeMap;
use std::ops::{Add, Div, Mul, Neg, Not, Sub};

pub use formula::{Atom, CompareOp, Formula};
pub use poly::{Linear, Poly};

use crate::error::{EqError, Result};
use crate::id::VarId;
use crate::value::{Category, Value, ValueKind};

/// Reference to a variable inside an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub id: VarId,
    pub kind: ValueKind,
    pub category: Category,
}

impl VarRef {
    pub const fn new(id: VarId, kind: ValueKind, category: Category) -> Self {
        Self { id, kind, category }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(VarRef),
    Const(Value),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Logic(LogicOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Creates a variable leaf.
    pub fn var(var: VarRef) -> Self {
        Expr::Var(var)
    }

    /// Creates a constant leaf.
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Const(value.into())
    }

    fn compare(self, op: CompareOp, rhs: impl Into<Expr>) -> Expr {
        Expr::Compare(op, Box::new(self), Box::new(rhs.into()))
    }

    /// `self == rhs`
    pub fn equals(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Eq, rhs)
    }

    /// `self != rhs`
    pub fn not_equals(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ne, rhs)
    }

    /// `self < rhs`
    pub fn less(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Lt, rhs)
    }

    /// `self <= rhs`
    pub fn less_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Le, rhs)
    }

    /// `self > rhs`
    pub fn greater(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Gt, rhs)
    }

    /// `self >= rhs`
    pub fn greater_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.compare(CompareOp::Ge, rhs)
    }

    /// Compares with an explicit operator.
    pub fn cmp_with(self, op: CompareOp, rhs: impl Into<Expr>) -> Expr {
        self.compare(op, rhs)
    }

    /// `self && rhs`
    pub fn and(self, rhs: impl Into<Expr>) -> Expr {
        Expr::Logic(LogicOp::And, Box::new(self), Box::new(rhs.into()))
    }

    /// `self || rhs`
    pub fn or(self, rhs: impl Into<Expr>) -> Expr {
        Expr::Logic(LogicOp::Or, Box::new(self), Box::new(rhs.into()))
    }

    /// Returns the distinct variables referenced, ordered by id.
    pub fn vars(&self) -> Vec<VarRef> {
        let mut seen = BTreeMap::new();
        self.collect_vars(&mut seen);
        seen.into_values().collect()
    }

    fn collect_vars(&self, out: &mut BTreeMap<VarId, VarRef>) {
        match self {
            Expr::Var(v) => {
                out.insert(v.id, *v);
            }
            Expr::Const(_) => {}
            Expr::Neg(e) | Expr::Not(e) => e.collect_vars(out),
            Expr::Arith(_, a, b) | Expr::Compare(_, a, b) | Expr::Logic(_, a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
        }
    }

    /// Returns the single category of all referenced variables.
    ///
    /// `None` for variable-free expressions.
    ///
    /// # Errors
    ///
    /// Returns [`EqError::MixedCategory`] when both categories occur.
    pub fn category(&self) -> Result<Option<Category>> {
        let mut category = None;
        for var in self.vars() {
            match category {
                None => category = Some(var.category),
                Some(c) if c != var.category => return Err(EqError::MixedCategory),
                Some(_) => {}
            }
        }
        Ok(category)
    }

    /// Evaluates the expression numerically.
    ///
    /// Returns `None` when a variable is unknown, on division by zero, or for
    /// boolean-valued nodes.
    pub fn eval<F>(&self, lookup: &F) -> Option<f64>
    where
        F: Fn(VarId) -> Option<f64>,
    {
        match self {
            Expr::Var(v) => lookup(v.id),
            Expr::Const(c) => Some(c.as_f64()),
            Expr::Neg(e) => e.eval(lookup).map(|v| -v),
            Expr::Arith(op, a, b) => {
                let a = a.eval(lookup)?;
                let b = b.eval(lookup)?;
                match op {
                    ArithOp::Add => Some(a + b),
                    ArithOp::Sub => Some(a - b),
                    ArithOp::Mul => Some(a * b),
                    ArithOp::Div => {
                        if b == 0.0 {
                            None
                        } else {
                            Some(a / b)
                        }
                    }
                }
            }
            Expr::Not(_) | Expr::Compare(..) | Expr::Logic(..) => None,
        }
    }

    /// Converts a boolean-valued expression into a [`Formula`] in negation
    /// normal form.
    ///
    /// # Errors
    ///
    /// Returns [`EqError::InvalidExpression`] for numeric expressions used as
    /// relations and boolean expressions used inside arithmetic.
    pub fn to_formula(&self) -> Result<Formula> {
        self.formula(false)
    }

    fn formula(&self, negated: bool) -> Result<Formula> {
        match self {
            Expr::Const(Value::Bool(b)) => Ok(Formula::Const(*b != negated)),
            Expr::Const(c) => Err(EqError::InvalidExpression(format!(
                "numeric constant {} used as a relation",
                c
            ))),
            Expr::Var(v) if v.kind == ValueKind::Bool => {
                let target = if negated { 0.0 } else { 1.0 };
                let diff = Expr::Arith(
                    ArithOp::Sub,
                    Box::new(Expr::Var(*v)),
                    Box::new(Expr::Const(Value::Float(target))),
                );
                Ok(Formula::Atom(Atom::new(CompareOp::Eq, diff)))
            }
            Expr::Var(v) => Err(EqError::InvalidExpression(format!(
                "numeric variable {} used as a relation",
                v.id
            ))),
            Expr::Neg(_) | Expr::Arith(..) => Err(EqError::InvalidExpression(
                "arithmetic expression used as a relation".to_string(),
            )),
            Expr::Not(e) => e.formula(!negated),
            Expr::Compare(op, a, b) => {
                a.check_numeric()?;
                b.check_numeric()?;
                let op = if negated { op.negate() } else { *op };
                let diff = Expr::Arith(ArithOp::Sub, a.clone(), b.clone());
                Ok(Formula::Atom(Atom::new(op, diff)))
            }
            Expr::Logic(op, a, b) => {
                let a = a.formula(negated)?;
                let b = b.formula(negated)?;
                // De Morgan: a negated conjunction becomes a disjunction.
                let conjunctive = (*op == LogicOp::And) != negated;
                Ok(if conjunctive {
                    Formula::all(vec![a, b])
                } else {
                    Formula::any(vec![a, b])
                })
            }
        }
    }

    fn check_numeric(&self) -> Result<()> {
        match self {
            Expr::Var(_) | Expr::Const(_) => Ok(()),
            Expr::Neg(e) => e.check_numeric(),
            Expr::Arith(_, a, b) => {
                a.check_numeric()?;
                b.check_numeric()
            }
            Expr::Not(_) | Expr::Compare(..) | Expr::Logic(..) => Err(EqError::InvalidExpression(
                "boolean expression used inside arithmetic".to_string(),
            )),
        }
    }
}

impl From<VarRef> for Expr {
    fn from(v: VarRef) -> Self {
        Expr::Var(v)
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Const(v)
    }
}

macro_rules! impl_const_expr {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(v: $t) -> Self {
                    Expr::Const(Value::from(v))
                }
            }
        )*
    };
}

impl_const_expr!(i32, i64, f64, bool);

macro_rules! impl_arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::Arith($op, Box::new(self), Box::new(rhs.into()))
            }
        }
    };
}

impl_arith_op!(Add, add, ArithOp::Add);
impl_arith_op!(Sub, sub, ArithOp::Sub);
impl_arith_op!(Mul, mul, ArithOp::Mul);
impl_arith_op!(Div, div, ArithOp::Div);

/// Implements arithmetic with a scalar on the left, e.g. `2 * x`.
macro_rules! impl_scalar_lhs {
    ($($t:ty),*) => {
        $(
            impl Add<Expr> for $t {
                type Output = Expr;
                fn add(self, rhs: Expr) -> Expr {
                    Expr::from(self) + rhs
                }
            }

            impl Sub<Expr> for $t {
                type Output = Expr;
                fn sub(self, rhs: Expr) -> Expr {
                    Expr::from(self) - rhs
                }
            }

            impl Mul<Expr> for $t {
                type Output = Expr;
                fn mul(self, rhs: Expr) -> Expr {
                    Expr::from(self) * rhs
                }
            }

            impl Div<Expr> for $t {
                type Output = Expr;
                fn div(self, rhs: Expr) -> Expr {
                    Expr::from(self) / rhs
                }
            }
        )*
    };
}

// A single integer type keeps `2 * expr` inferable.
impl_scalar_lhs!(i64, f64);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

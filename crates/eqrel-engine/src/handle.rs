//! Client handles for variables and priority levels.
//!
//! A handle owns its engine record: dropping it destroys the variable and
//! every relation that referenced it.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Not, Sub};

use eqrel_core::{
    Category, CompareOp, DomainId, Expr, RelationId, Result, Value, ValueKind, VarId, VarRef,
};
use tracing::warn;

use crate::engine::Engine;

/// Anything backed by an engine variable.
pub trait Handle {
    /// Id of the underlying variable.
    fn var_id(&self) -> VarId;

    /// Engine owning the variable.
    fn engine(&self) -> &Engine;
}

/// A value variable.
///
/// Reading it solves its domain on demand:
///
/// ```
/// use eqrel_engine::Engine;
///
/// let engine = Engine::new();
/// let x = engine.int_var().unwrap();
/// let y = engine.int_var().unwrap();
/// engine.relate(x.equals(4)).unwrap();
/// engine.relate(y.equals(&x * 2)).unwrap();
/// assert_eq!(y.value().unwrap().as_i64(), Some(8));
/// ```
pub struct Var {
    id: VarId,
    kind: ValueKind,
    engine: Engine,
}

/// A priority level ranking conditional relations.
///
/// Levels are ordered with relations among themselves; higher ranks win.
pub struct PriorityLevel {
    id: VarId,
    engine: Engine,
}

impl Var {
    pub(crate) fn new(id: VarId, kind: ValueKind, engine: Engine) -> Self {
        Self { id, kind, engine }
    }

    #[inline]
    pub fn id(&self) -> VarId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Expression leaf for this variable.
    pub fn expr(&self) -> Expr {
        Expr::var(VarRef::new(self.id, self.kind, Category::Value))
    }

    /// Resolved value, solving the domain if it changed since the last read.
    pub fn value(&self) -> Result<Value> {
        self.engine.read(self)
    }

    /// Drops every relation referencing this variable.
    pub fn clear(&self) -> Result<()> {
        self.engine.clear(self)
    }

    /// Domain currently holding this variable.
    pub fn domain(&self) -> Result<DomainId> {
        self.engine.domain_of(self)
    }
}

impl PriorityLevel {
    pub(crate) fn new(id: VarId, engine: Engine) -> Self {
        Self { id, engine }
    }

    #[inline]
    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn expr(&self) -> Expr {
        Expr::var(VarRef::new(self.id, ValueKind::Int, Category::Priority))
    }

    /// Resolved rank of this level.
    pub fn rank(&self) -> Result<f64> {
        self.engine.rank(self)
    }

    /// Drops every ordering relation referencing this level. Relations tagged
    /// with the level keep it.
    pub fn clear(&self) -> Result<()> {
        self.engine.clear_level(self)
    }

    /// Declares `self > other`.
    pub fn above(&self, other: &PriorityLevel) -> Result<RelationId> {
        self.engine.order(self, CompareOp::Gt, other)
    }

    /// Declares `self < other`.
    pub fn below(&self, other: &PriorityLevel) -> Result<RelationId> {
        self.engine.order(self, CompareOp::Lt, other)
    }
}

impl Handle for Var {
    fn var_id(&self) -> VarId {
        self.id
    }

    fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Handle for PriorityLevel {
    fn var_id(&self) -> VarId {
        self.id
    }

    fn engine(&self) -> &Engine {
        &self.engine
    }
}

fn release(engine: &Engine, id: VarId) {
    if let Err(err) = engine.destroy(id) {
        warn!(event = "drop_failed", variable = %id, error = %err);
    }
}

impl Drop for Var {
    fn drop(&mut self) {
        release(&self.engine, self.id);
    }
}

impl Drop for PriorityLevel {
    fn drop(&mut self) {
        release(&self.engine, self.id);
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityLevel")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

macro_rules! impl_comparisons {
    ($t:ty) => {
        impl $t {
            /// `self == rhs`
            pub fn equals(&self, rhs: impl Into<Expr>) -> Expr {
                self.expr().equals(rhs)
            }

            /// `self != rhs`
            pub fn not_equals(&self, rhs: impl Into<Expr>) -> Expr {
                self.expr().not_equals(rhs)
            }

            /// `self < rhs`
            pub fn less(&self, rhs: impl Into<Expr>) -> Expr {
                self.expr().less(rhs)
            }

            /// `self <= rhs`
            pub fn less_eq(&self, rhs: impl Into<Expr>) -> Expr {
                self.expr().less_eq(rhs)
            }

            /// `self > rhs`
            pub fn greater(&self, rhs: impl Into<Expr>) -> Expr {
                self.expr().greater(rhs)
            }

            /// `self >= rhs`
            pub fn greater_eq(&self, rhs: impl Into<Expr>) -> Expr {
                self.expr().greater_eq(rhs)
            }

            pub fn cmp_with(&self, op: CompareOp, rhs: impl Into<Expr>) -> Expr {
                self.expr().cmp_with(op, rhs)
            }
        }

        impl From<&$t> for Expr {
            fn from(handle: &$t) -> Self {
                handle.expr()
            }
        }
    };
}

impl_comparisons!(Var);
impl_comparisons!(PriorityLevel);

macro_rules! impl_handle_arith {
    ($t:ty, $trait:ident, $method:ident) => {
        impl<R: Into<Expr>> $trait<R> for &$t {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                self.expr().$method(rhs)
            }
        }
    };
}

impl_handle_arith!(Var, Add, add);
impl_handle_arith!(Var, Sub, sub);
impl_handle_arith!(Var, Mul, mul);
impl_handle_arith!(Var, Div, div);
impl_handle_arith!(PriorityLevel, Add, add);
impl_handle_arith!(PriorityLevel, Sub, sub);
impl_handle_arith!(PriorityLevel, Mul, mul);
impl_handle_arith!(PriorityLevel, Div, div);

macro_rules! impl_scalar_handle {
    ($h:ty; $($t:ty),*) => {
        $(
            impl Add<&$h> for $t {
                type Output = Expr;
                fn add(self, rhs: &$h) -> Expr {
                    self + rhs.expr()
                }
            }

            impl Sub<&$h> for $t {
                type Output = Expr;
                fn sub(self, rhs: &$h) -> Expr {
                    self - rhs.expr()
                }
            }

            impl Mul<&$h> for $t {
                type Output = Expr;
                fn mul(self, rhs: &$h) -> Expr {
                    self * rhs.expr()
                }
            }

            impl Div<&$h> for $t {
                type Output = Expr;
                fn div(self, rhs: &$h) -> Expr {
                    self / rhs.expr()
                }
            }
        )*
    };
}

impl_scalar_handle!(Var; i64, f64);
impl_scalar_handle!(PriorityLevel; i64);

impl Neg for &Var {
    type Output = Expr;

    fn neg(self) -> Expr {
        -self.expr()
    }
}

impl Not for &Var {
    type Output = Expr;

    fn not(self) -> Expr {
        !self.expr()
    }
}

//! Multivariate polynomials with known variables substituted.
//!
//! The resolver converts atom differences into polynomials over the variables
//! still unknown in a branch. Degree and variable count decide whether an
//! equality can be solved in closed form.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Add, Mul, Neg, Sub};

use smallvec::SmallVec;

use super::{ArithOp, Expr};
use crate::id::VarId;

/// Coefficients smaller than this are treated as cancelled.
const PRUNE_EPSILON: f64 = 1e-12;

/// Sorted multiset of variables; empty for the constant term.
type Monomial = SmallVec<[VarId; 2]>;

/// A polynomial `sum(coefficient * monomial)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Poly {
    terms: BTreeMap<Monomial, f64>,
}

/// A polynomial of degree at most one: `sum(coeffs[v] * v) + constant`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Linear {
    pub coeffs: BTreeMap<VarId, f64>,
    pub constant: f64,
}

impl Poly {
    /// The zero polynomial.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(c: f64) -> Self {
        let mut p = Self::zero();
        p.insert(Monomial::new(), c);
        p
    }

    pub fn variable(id: VarId) -> Self {
        let mut p = Self::zero();
        let mut m = Monomial::new();
        m.push(id);
        p.insert(m, 1.0);
        p
    }

    fn insert(&mut self, monomial: Monomial, coefficient: f64) {
        let entry = self.terms.entry(monomial).or_insert(0.0);
        *entry += coefficient;
        self.prune();
    }

    fn prune(&mut self) {
        self.terms.retain(|_, c| c.abs() > PRUNE_EPSILON);
    }

    /// Converts an arithmetic expression, substituting variables `lookup`
    /// knows.
    ///
    /// Returns `None` for non-polynomial shapes: division by an expression
    /// that is not a non-zero constant, or boolean-valued nodes.
    pub fn from_expr<F>(expr: &Expr, lookup: &F) -> Option<Poly>
    where
        F: Fn(VarId) -> Option<f64>,
    {
        match expr {
            Expr::Var(v) => Some(match lookup(v.id) {
                Some(value) => Poly::constant(value),
                None => Poly::variable(v.id),
            }),
            Expr::Const(c) => Some(Poly::constant(c.as_f64())),
            Expr::Neg(e) => Some(-Poly::from_expr(e, lookup)?),
            Expr::Arith(op, a, b) => {
                let a = Poly::from_expr(a, lookup)?;
                let b = Poly::from_expr(b, lookup)?;
                match op {
                    ArithOp::Add => Some(a + b),
                    ArithOp::Sub => Some(a - b),
                    ArithOp::Mul => Some(a * b),
                    ArithOp::Div => {
                        let divisor = b.constant_value()?;
                        if divisor == 0.0 {
                            None
                        } else {
                            Some(a.scale(1.0 / divisor))
                        }
                    }
                }
            }
            Expr::Not(_) | Expr::Compare(..) | Expr::Logic(..) => None,
        }
    }

    /// Multiplies every coefficient by `factor`.
    pub fn scale(mut self, factor: f64) -> Self {
        for c in self.terms.values_mut() {
            *c *= factor;
        }
        self.prune();
        self
    }

    /// Returns the value if the polynomial has no unknowns.
    pub fn constant_value(&self) -> Option<f64> {
        match self.terms.len() {
            0 => Some(0.0),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(m, _)| m.is_empty())
                .map(|(_, c)| *c),
            _ => None,
        }
    }

    /// Returns the highest monomial degree.
    pub fn degree(&self) -> usize {
        self.terms.keys().map(|m| m.len()).max().unwrap_or(0)
    }

    /// Returns the unknown variables.
    pub fn unknowns(&self) -> BTreeSet<VarId> {
        self.terms.keys().flat_map(|m| m.iter().copied()).collect()
    }

    /// Returns the linear form, if the degree is at most one.
    pub fn as_linear(&self) -> Option<Linear> {
        let mut linear = Linear::default();
        for (m, c) in &self.terms {
            match m.as_slice() {
                [] => linear.constant = *c,
                [v] => {
                    linear.coeffs.insert(*v, *c);
                }
                _ => return None,
            }
        }
        Some(linear)
    }

    /// Returns `(variable, coefficients by power)` if exactly one unknown
    /// occurs.
    pub fn as_univariate(&self) -> Option<(VarId, Vec<f64>)> {
        let unknowns = self.unknowns();
        if unknowns.len() != 1 {
            return None;
        }
        let var = *unknowns.iter().next()?;
        let mut coeffs = vec![0.0; self.degree() + 1];
        for (m, c) in &self.terms {
            coeffs[m.len()] += *c;
        }
        Some((var, coeffs))
    }
}

impl Add for Poly {
    type Output = Poly;

    fn add(mut self, rhs: Poly) -> Poly {
        for (m, c) in rhs.terms {
            *self.terms.entry(m).or_insert(0.0) += c;
        }
        self.prune();
        self
    }
}

impl Sub for Poly {
    type Output = Poly;

    fn sub(self, rhs: Poly) -> Poly {
        self + (-rhs)
    }
}

impl Neg for Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        self.scale(-1.0)
    }
}

impl Mul for Poly {
    type Output = Poly;

    fn mul(self, rhs: Poly) -> Poly {
        let mut out = Poly::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &rhs.terms {
                let mut m: Monomial = ma.iter().chain(mb.iter()).copied().collect();
                m.sort_unstable();
                *out.terms.entry(m).or_insert(0.0) += ca * cb;
            }
        }
        out.prune();
        out
    }
}

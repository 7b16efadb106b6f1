//! Candidate branches and deterministic propagation.
//!
//! A [`Branch`] is a partial assignment plus the formulas not yet decided
//! under it. [`settle`] applies every deduction that needs no choice (known
//! atoms, linear equalities, single-variable quadratics) and stops at the
//! first real choice point.

use std::collections::BTreeMap;

use eqrel_core::expr::Linear;
use eqrel_core::{CompareOp, Formula, Value, VarId, VarRef};
use tracing::trace;

use super::linear::{eliminate, LinearOutcome};
use super::Context;
use crate::store::CheckFn;

/// An opaque check waiting for all its variables.
#[derive(Clone)]
pub(crate) struct PendingCheck<'a> {
    pub vars: &'a [VarRef],
    pub check: &'a CheckFn,
}

/// A partial assignment with its undecided formulas.
#[derive(Clone)]
pub(crate) struct Branch<'a> {
    pub values: BTreeMap<VarId, f64>,
    pub open: Vec<Formula>,
    pub checks: Vec<PendingCheck<'a>>,
}

/// Outcome of settling a branch.
pub(crate) enum Settled<'a> {
    /// A formula is violated.
    Dead,
    /// No deterministic progress left.
    Open(Branch<'a>),
    /// A choice point; alternatives in preference order.
    Split(Vec<Branch<'a>>),
}

impl<'a> Branch<'a> {
    pub(crate) fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            open: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// Returns a copy constrained by `formula`.
    pub(crate) fn with_formula(&self, formula: &Formula) -> Self {
        let mut next = self.clone();
        next.open.push(formula.clone());
        next
    }

    pub(crate) fn with_check(&self, check: PendingCheck<'a>) -> Self {
        let mut next = self.clone();
        next.checks.push(check);
        next
    }

    pub(crate) fn with_value(&self, var: VarId, value: f64) -> Self {
        let mut next = self.clone();
        next.values.insert(var, value);
        next
    }

    #[inline]
    pub(crate) fn get(&self, var: VarId) -> Option<f64> {
        self.values.get(&var).copied()
    }

    /// Assigns `value` if the variable's kind admits it, snapping discrete
    /// kinds to the exact integer.
    fn assign(&mut self, var: VarId, value: f64, ctx: &Context<'_>) -> bool {
        let kind = ctx.kind(var);
        if !kind.admits(value, ctx.config.tolerance) {
            return false;
        }
        let value = if kind.is_discrete() { value.round() } else { value };
        self.values.insert(var, value);
        true
    }
}

/// Substitutes known values and folds decided sub-formulas into constants.
fn simplify(formula: Formula, branch: &Branch<'_>, tolerance: f64) -> Formula {
    let lookup = |v: VarId| branch.get(v);
    match formula {
        Formula::Const(_) => formula,
        Formula::Atom(atom) => match atom.evaluate(&lookup, tolerance) {
            Some(holds) => Formula::Const(holds),
            None => match atom.poly(&lookup).and_then(|p| p.constant_value()) {
                Some(diff) => Formula::Const(atom.op().holds(diff, tolerance)),
                None => Formula::Atom(atom),
            },
        },
        Formula::All(parts) => {
            let parts: Vec<Formula> = parts
                .into_iter()
                .map(|p| simplify(p, branch, tolerance))
                .collect();
            if parts.iter().any(|p| *p == Formula::Const(false)) {
                Formula::Const(false)
            } else {
                Formula::all(parts)
            }
        }
        Formula::Any(parts) => {
            let parts: Vec<Formula> = parts
                .into_iter()
                .map(|p| simplify(p, branch, tolerance))
                .collect();
            if parts.iter().any(|p| *p == Formula::Const(true)) {
                Formula::Const(true)
            } else {
                Formula::any(parts)
            }
        }
    }
}

/// Runs every pending check whose variables are all known.
fn run_checks(branch: &mut Branch<'_>, ctx: &Context<'_>) -> bool {
    let mut pending = Vec::with_capacity(branch.checks.len());
    for check in std::mem::take(&mut branch.checks) {
        let values: Option<Vec<Value>> = check
            .vars
            .iter()
            .map(|v| branch.get(v.id).map(|raw| Value::from_raw(ctx.kind(v.id), raw)))
            .collect();
        match values {
            Some(values) => {
                if !(check.check)(&values) {
                    return false;
                }
            }
            None => pending.push(check),
        }
    }
    branch.checks = pending;
    true
}

/// Real roots of `c[0] + c[1] x + c[2] x^2`, in configured order.
fn quadratic_roots(coeffs: &[f64], ctx: &Context<'_>) -> Vec<f64> {
    let tolerance = ctx.config.tolerance;
    let (c, b, a) = (coeffs[0], coeffs[1], coeffs[2]);
    let disc = b * b - 4.0 * a * c;
    let mut roots = if disc < -tolerance {
        Vec::new()
    } else if disc <= tolerance {
        vec![-b / (2.0 * a)]
    } else {
        // |q| >= sqrt(disc) / 2, so both quotients are defined.
        let q = -0.5 * (b + b.signum() * disc.sqrt());
        vec![q / a, c / q]
    };
    ctx.config.root_order.sort(&mut roots);
    roots
}

/// Applies deterministic deductions until a choice point or a fixpoint.
pub(crate) fn settle<'a>(mut branch: Branch<'a>, ctx: &Context<'_>) -> Settled<'a> {
    let tolerance = ctx.config.tolerance;
    loop {
        if !run_checks(&mut branch, ctx) {
            return Settled::Dead;
        }

        let mut open = Vec::with_capacity(branch.open.len());
        for formula in std::mem::take(&mut branch.open) {
            match simplify(formula, &branch, tolerance) {
                Formula::Const(false) => return Settled::Dead,
                other => open.extend(other.into_conjuncts()),
            }
        }
        branch.open = open;

        let lookup = |v: VarId| branch.get(v);
        let mut equations: Vec<Linear> = Vec::new();
        let mut quadratic: Option<(VarId, Vec<f64>)> = None;
        for formula in &branch.open {
            let Formula::Atom(atom) = formula else {
                continue;
            };
            if atom.op() != CompareOp::Eq {
                continue;
            }
            let Some(poly) = atom.poly(&lookup) else {
                continue;
            };
            if let Some(linear) = poly.as_linear() {
                equations.push(linear);
            } else if quadratic.is_none() && poly.degree() == 2 {
                quadratic = poly.as_univariate();
            }
        }

        if !equations.is_empty() {
            match eliminate(&equations, tolerance) {
                LinearOutcome::Inconsistent => return Settled::Dead,
                LinearOutcome::Solved(solved) if !solved.is_empty() => {
                    for (var, value) in solved {
                        if !branch.assign(var, value, ctx) {
                            return Settled::Dead;
                        }
                    }
                    continue;
                }
                LinearOutcome::Solved(_) => {}
            }
        }

        if let Some((var, coeffs)) = quadratic {
            let mut children: Vec<Branch<'a>> = Vec::new();
            for root in quadratic_roots(&coeffs, ctx) {
                let mut child = branch.clone();
                if child.assign(var, root, ctx) {
                    children.push(child);
                }
            }
            return match children.len() {
                0 => Settled::Dead,
                1 => {
                    branch = children.remove(0);
                    continue;
                }
                _ => Settled::Split(children),
            };
        }

        let disjunction = branch
            .open
            .iter()
            .position(|f| matches!(f, Formula::Any(_)));
        if let Some(index) = disjunction {
            let Formula::Any(alternatives) = branch.open.swap_remove(index) else {
                return Settled::Dead;
            };
            let children = alternatives
                .iter()
                .map(|alt| branch.with_formula(alt))
                .collect();
            return Settled::Split(children);
        }

        return Settled::Open(branch);
    }
}

/// Expands `root` into every open branch reachable by deterministic
/// deductions, left alternatives first, capped at the configured number of
/// candidates.
pub(crate) fn propagate<'a>(root: Branch<'a>, ctx: &Context<'_>) -> Vec<Branch<'a>> {
    let limit = ctx.config.max_candidates;
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(branch) = stack.pop() {
        if out.len() >= limit {
            break;
        }
        match settle(branch, ctx) {
            Settled::Dead => {
                trace!(event = "branch_dead", domain = %ctx.domain);
            }
            Settled::Open(branch) => out.push(branch),
            Settled::Split(children) => stack.extend(children.into_iter().rev()),
        }
    }
    out
}

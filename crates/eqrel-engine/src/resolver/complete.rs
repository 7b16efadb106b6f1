//! Completion of an open branch into a full assignment.
//!
//! Linear equalities still open in a branch are reduced so that every pivot
//! variable is an affine form over the free ones, and the open linear atoms
//! are rewritten over the free variables only. Free variables then take the
//! value closest to their kind's default inside the bounds those atoms
//! imply; pivots follow through propagation. Completion is greedy: once a
//! value survives propagation it is kept.

use std::collections::{BTreeMap, BTreeSet};

use eqrel_core::expr::Linear;
use eqrel_core::{CompareOp, Formula, ValueKind, VarId};

use super::branch::{settle, Branch, Settled};
use super::linear::{pivot_forms, substitute};
use super::Context;

/// Number of values tried per variable before giving up.
const CANDIDATE_LIMIT: usize = 16;

/// Completes `branch`, returning a value for every variable of the domain.
pub(crate) fn complete(branch: Branch<'_>, ctx: &Context<'_>) -> Option<BTreeMap<VarId, f64>> {
    let mut state = settle(branch, ctx);
    loop {
        match state {
            Settled::Dead => return None,
            Settled::Split(children) => {
                return children.into_iter().find_map(|child| complete(child, ctx));
            }
            Settled::Open(open) => {
                let reduced = Reduced::of(&open, ctx)?;
                let Some(var) = reduced.next_var(&open, ctx) else {
                    let done = open.open.is_empty() && open.checks.is_empty();
                    return done.then_some(open.values);
                };
                state = assign_next(open, var, &reduced, ctx)?;
            }
        }
    }
}

/// Open linear atoms of a branch rewritten over its free variables.
#[derive(Debug, Default)]
struct Reduced {
    /// Unknowns determined by the open equalities.
    pivots: BTreeSet<VarId>,
    atoms: Vec<(CompareOp, Linear)>,
}

impl Reduced {
    /// Returns `None` if the open equalities contradict each other.
    fn of(branch: &Branch<'_>, ctx: &Context<'_>) -> Option<Self> {
        let lookup = |v: VarId| branch.get(v);
        let linear: Vec<(CompareOp, Linear)> = branch
            .open
            .iter()
            .filter_map(|formula| match formula {
                Formula::Atom(atom) => atom
                    .poly(&lookup)
                    .and_then(|p| p.as_linear())
                    .map(|l| (atom.op(), l)),
                _ => None,
            })
            .collect();
        let equations: Vec<Linear> = linear
            .iter()
            .filter(|(op, _)| *op == CompareOp::Eq)
            .map(|(_, l)| l.clone())
            .collect();
        let forms = pivot_forms(&equations, ctx.config.tolerance)?;

        let atoms = linear
            .iter()
            .map(|(op, l)| (*op, substitute(l, &forms)))
            .filter(|(_, l)| !l.coeffs.is_empty())
            .collect();
        Some(Self {
            pivots: forms.into_keys().collect(),
            atoms,
        })
    }

    /// Lowest free variable that is alone in some atom, else the lowest free
    /// unknown, else the lowest unknown overall.
    fn next_var(&self, branch: &Branch<'_>, ctx: &Context<'_>) -> Option<VarId> {
        let lone = self
            .atoms
            .iter()
            .filter(|(_, l)| l.coeffs.len() == 1)
            .filter_map(|(_, l)| l.coeffs.keys().next().copied())
            .min();
        let mut unknown = ctx
            .kinds
            .keys()
            .copied()
            .filter(|v| !branch.values.contains_key(v));
        lone.or_else(|| unknown.clone().find(|v| !self.pivots.contains(v)))
            .or_else(|| unknown.next())
    }
}

fn assign_next<'a>(
    branch: Branch<'a>,
    var: VarId,
    reduced: &Reduced,
    ctx: &Context<'_>,
) -> Option<Settled<'a>> {
    let bounds = Bounds::collect(reduced, var);
    for candidate in bounds.candidates(ctx.kind(var), ctx) {
        match settle(branch.with_value(var, candidate), ctx) {
            Settled::Dead => continue,
            state => return Some(state),
        }
    }
    None
}

/// Bounds on one variable implied by reduced atoms where it is the only
/// free variable.
#[derive(Debug, Default)]
struct Bounds {
    /// `(value, strict)`
    lower: Option<(f64, bool)>,
    upper: Option<(f64, bool)>,
    excluded: Vec<f64>,
}

impl Bounds {
    fn collect(reduced: &Reduced, var: VarId) -> Self {
        let mut bounds = Bounds::default();
        for (op, linear) in &reduced.atoms {
            if linear.coeffs.len() != 1 {
                continue;
            }
            let Some(&a) = linear.coeffs.get(&var) else {
                continue;
            };
            let threshold = -linear.constant / a;
            let op = if a < 0.0 { op.flip() } else { *op };
            match op {
                CompareOp::Lt => bounds.tighten_upper(threshold, true),
                CompareOp::Le => bounds.tighten_upper(threshold, false),
                CompareOp::Gt => bounds.tighten_lower(threshold, true),
                CompareOp::Ge => bounds.tighten_lower(threshold, false),
                CompareOp::Ne => bounds.excluded.push(threshold),
                CompareOp::Eq => {
                    bounds.tighten_lower(threshold, false);
                    bounds.tighten_upper(threshold, false);
                }
            }
        }
        bounds
    }

    fn tighten_lower(&mut self, value: f64, strict: bool) {
        let tighter = match self.lower {
            None => true,
            Some((current, current_strict)) => {
                value > current || (value == current && strict && !current_strict)
            }
        };
        if tighter {
            self.lower = Some((value, strict));
        }
    }

    fn tighten_upper(&mut self, value: f64, strict: bool) {
        let tighter = match self.upper {
            None => true,
            Some((current, current_strict)) => {
                value < current || (value == current && strict && !current_strict)
            }
        };
        if tighter {
            self.upper = Some((value, strict));
        }
    }

    /// Closed interval of admissible values for `kind`.
    fn range(&self, kind: ValueKind, ctx: &Context<'_>) -> (f64, f64) {
        let tolerance = ctx.config.tolerance;
        let step = ctx.config.strict_step();
        let (mut lo, mut hi) = match kind {
            ValueKind::Int | ValueKind::Bool => (
                self.lower.map_or(f64::NEG_INFINITY, |(t, strict)| {
                    if strict {
                        (t + tolerance).floor() + 1.0
                    } else {
                        (t - tolerance).ceil()
                    }
                }),
                self.upper.map_or(f64::INFINITY, |(t, strict)| {
                    if strict {
                        (t - tolerance).ceil() - 1.0
                    } else {
                        (t + tolerance).floor()
                    }
                }),
            ),
            ValueKind::Float => (
                self.lower
                    .map_or(f64::NEG_INFINITY, |(t, strict)| if strict { t + step } else { t }),
                self.upper
                    .map_or(f64::INFINITY, |(t, strict)| if strict { t - step } else { t }),
            ),
        };
        if kind == ValueKind::Bool {
            lo = lo.max(0.0);
            hi = hi.min(1.0);
        }
        (lo, hi)
    }

    /// Values to try, nearest to the kind's default first.
    fn candidates(&self, kind: ValueKind, ctx: &Context<'_>) -> Vec<f64> {
        let tolerance = ctx.config.tolerance;
        let (lo, hi) = self.range(kind, ctx);
        if lo > hi + tolerance {
            return Vec::new();
        }
        let default = kind.default_value().as_f64();
        let preferred = if default < lo {
            lo
        } else if default > hi {
            hi
        } else {
            default
        };

        let admissible = |c: f64| {
            c >= lo - tolerance
                && c <= hi + tolerance
                && !self.excluded.iter().any(|e| (c - e).abs() <= tolerance)
        };
        let mut out = Vec::with_capacity(CANDIDATE_LIMIT);
        if admissible(preferred) {
            out.push(preferred);
        }
        let mut offset = 1.0;
        while out.len() < CANDIDATE_LIMIT && offset <= (2 * CANDIDATE_LIMIT) as f64 {
            for c in [preferred + offset, preferred - offset] {
                if out.len() < CANDIDATE_LIMIT && admissible(c) {
                    out.push(c);
                }
            }
            offset += 1.0;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqrel_config::EngineConfig;
    use eqrel_core::DomainId;

    fn ctx<'a>(kinds: &'a BTreeMap<VarId, ValueKind>, config: &'a EngineConfig) -> Context<'a> {
        Context {
            domain: DomainId::new(0),
            kinds,
            config,
        }
    }

    #[test]
    fn test_int_strict_bounds() {
        let config = EngineConfig::default();
        let kinds = BTreeMap::from([(VarId::new(0), ValueKind::Int)]);
        let mut bounds = Bounds::default();
        bounds.tighten_lower(3.0, true);
        bounds.tighten_upper(7.0, true);
        assert_eq!(bounds.range(ValueKind::Int, &ctx(&kinds, &config)), (4.0, 6.0));
        assert_eq!(bounds.candidates(ValueKind::Int, &ctx(&kinds, &config))[0], 4.0);
    }

    #[test]
    fn test_float_strict_lower() {
        let config = EngineConfig::default();
        let kinds = BTreeMap::from([(VarId::new(0), ValueKind::Float)]);
        let mut bounds = Bounds::default();
        bounds.tighten_lower(0.0, true);
        let first = bounds.candidates(ValueKind::Float, &ctx(&kinds, &config))[0];
        assert!(first > 0.0);
        assert!(first <= config.strict_step());
    }

    #[test]
    fn test_default_preferred_when_unbounded() {
        let config = EngineConfig::default();
        let kinds = BTreeMap::new();
        let bounds = Bounds::default();
        let candidates = bounds.candidates(ValueKind::Int, &ctx(&kinds, &config));
        assert_eq!(&candidates[..3], &[0.0, 1.0, -1.0]);
        assert_eq!(candidates.len(), CANDIDATE_LIMIT);
    }

    #[test]
    fn test_exclusion_skipped() {
        let config = EngineConfig::default();
        let kinds = BTreeMap::new();
        let mut bounds = Bounds::default();
        bounds.excluded.push(0.0);
        let candidates = bounds.candidates(ValueKind::Int, &ctx(&kinds, &config));
        assert_eq!(candidates[0], 1.0);
    }

    #[test]
    fn test_bool_range_clamped() {
        let config = EngineConfig::default();
        let kinds = BTreeMap::new();
        let mut bounds = Bounds::default();
        bounds.tighten_lower(0.0, true);
        let candidates = bounds.candidates(ValueKind::Bool, &ctx(&kinds, &config));
        assert_eq!(candidates, vec![1.0]);
    }

    #[test]
    fn test_empty_range() {
        let config = EngineConfig::default();
        let kinds = BTreeMap::new();
        let mut bounds = Bounds::default();
        bounds.tighten_lower(5.0, false);
        bounds.tighten_upper(4.0, false);
        assert!(bounds.candidates(ValueKind::Int, &ctx(&kinds, &config)).is_empty());
    }
}

//! Priority-arbitrated resolver for a single domain.
//!
//! Mandatory relations are propagated first; the surviving candidate branches
//! are then narrowed by conditional relations in descending rank. A relation
//! containing an equality (a selector) is accepted if any candidate can take
//! it. A relation without one (a guard) is accepted only if the current
//! preferred candidate already satisfies it. The preferred candidate is
//! finally completed into a full assignment.

mod branch;
mod complete;
mod linear;


use std::collections::BTreeMap;

use eqrel_config::EngineConfig;
use eqrel_core::{DomainId, EqError, RelationId, Result, Value, ValueKind, VarId};
use tracing::trace;

use branch::{propagate, Branch, PendingCheck};
use complete::complete;

use crate::store::Predicate;

/// Shared inputs of one solve.
pub(crate) struct Context<'c> {
    pub domain: DomainId,
    pub kinds: &'c BTreeMap<VarId, ValueKind>,
    pub config: &'c EngineConfig,
}

impl Context<'_> {
    #[inline]
    pub(crate) fn kind(&self, var: VarId) -> ValueKind {
        self.kinds.get(&var).copied().unwrap_or_default()
    }
}

/// A relation as seen by the resolver.
pub(crate) struct Constraint<'a> {
    pub id: RelationId,
    pub predicate: &'a Predicate,
    /// Rank of the priority tag; `None` for mandatory relations.
    pub rank: Option<f64>,
}

/// Everything the resolver needs to solve one domain.
pub(crate) struct Problem<'a> {
    pub domain: DomainId,
    pub kinds: &'a BTreeMap<VarId, ValueKind>,
    pub constraints: Vec<Constraint<'a>>,
}

/// Outcome of a successful solve.
#[derive(Debug, Clone, Default)]
pub(crate) struct Solution {
    pub values: BTreeMap<VarId, f64>,
    /// Conditional relations that shaped the assignment, in arbitration order.
    pub accepted: Vec<RelationId>,
    pub skipped: Vec<RelationId>,
}

pub(crate) struct Resolver<'c> {
    config: &'c EngineConfig,
}

impl<'c> Resolver<'c> {
    pub(crate) fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    pub(crate) fn solve(&self, problem: &Problem<'_>) -> Result<Solution> {
        let ctx = Context {
            domain: problem.domain,
            kinds: problem.kinds,
            config: self.config,
        };

        let (mandatory, mut conditional): (Vec<&Constraint<'_>>, Vec<&Constraint<'_>>) =
            problem.constraints.iter().partition(|c| c.rank.is_none());

        let mut root = Branch::new();
        for constraint in &mandatory {
            root = constrain(&root, constraint);
        }
        let mut branches = completable(propagate(root, &ctx), &ctx);
        if branches.is_empty() {
            return Err(EqError::InfeasibleMandatory {
                domain: problem.domain,
            });
        }

        // Descending rank; equal ranks keep registration order.
        conditional.sort_by(|a, b| {
            let (ra, rb) = (a.rank.unwrap_or(0.0), b.rank.unwrap_or(0.0));
            rb.total_cmp(&ra).then(a.id.cmp(&b.id))
        });

        let mut solution = Solution::default();
        for constraint in conditional {
            let selector = constraint.predicate.is_selector();
            let mut extended = Vec::new();
            let mut head_ok = false;
            for (i, candidate) in branches.iter().enumerate() {
                let next = completable(propagate(constrain(candidate, constraint), &ctx), &ctx);
                if i == 0 {
                    head_ok = !next.is_empty();
                    if !selector && !head_ok {
                        break;
                    }
                }
                extended.extend(next);
            }

            let accept = if selector { !extended.is_empty() } else { head_ok };
            if accept {
                trace!(
                    event = "relation_accepted",
                    domain = %problem.domain,
                    relation = %constraint.id,
                    rank = constraint.rank.unwrap_or(0.0),
                    selector,
                );
                extended.truncate(self.config.max_candidates);
                branches = extended;
                solution.accepted.push(constraint.id);
            } else {
                trace!(
                    event = "relation_skipped",
                    domain = %problem.domain,
                    relation = %constraint.id,
                    rank = constraint.rank.unwrap_or(0.0),
                    selector,
                );
                solution.skipped.push(constraint.id);
            }
        }

        let head = branches.into_iter().next().ok_or_else(|| {
            EqError::Internal(format!("domain {} lost every candidate", problem.domain))
        })?;
        solution.values = complete(head, &ctx).ok_or_else(|| {
            EqError::Internal(format!(
                "domain {} candidate could not be completed",
                problem.domain
            ))
        })?;

        if self.config.verifies() {
            let accepted = &solution.accepted;
            for constraint in problem
                .constraints
                .iter()
                .filter(|c| c.rank.is_none() || accepted.contains(&c.id))
            {
                if !holds(constraint.predicate, &solution.values, &ctx) {
                    return Err(EqError::Internal(format!(
                        "relation {} violated by the solution of domain {}",
                        constraint.id, problem.domain
                    )));
                }
            }
        }

        Ok(solution)
    }
}

/// Adds a relation to a copy of `branch`.
fn constrain<'a>(branch: &Branch<'a>, constraint: &Constraint<'a>) -> Branch<'a> {
    match constraint.predicate {
        Predicate::Formula(formula) => branch.with_formula(formula),
        Predicate::Check { vars, check } => branch.with_check(PendingCheck { vars, check }),
    }
}

/// Keeps the branches that can be completed.
fn completable<'a>(branches: Vec<Branch<'a>>, ctx: &Context<'_>) -> Vec<Branch<'a>> {
    branches
        .into_iter()
        .filter(|b| complete(b.clone(), ctx).is_some())
        .collect()
}

/// Re-evaluates a relation against a full assignment.
fn holds(predicate: &Predicate, values: &BTreeMap<VarId, f64>, ctx: &Context<'_>) -> bool {
    let lookup = |v: VarId| values.get(&v).copied();
    match predicate {
        Predicate::Formula(formula) => {
            formula.evaluate(&lookup, ctx.config.tolerance) == Some(true)
        }
        Predicate::Check { vars, check } => {
            let args: Option<Vec<Value>> = vars
                .iter()
                .map(|v| lookup(v.id).map(|raw| Value::from_raw(ctx.kind(v.id), raw)))
                .collect();
            args.is_some_and(|args| check(&args))
        }
    }
}

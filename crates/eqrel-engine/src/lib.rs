//! eqrel Engine - Priority-arbitrated constraint resolution
//!
//! Variables are connected by relations. Connected variables form a domain,
//! which is solved as a unit the first time one of its members is read after
//! a change. Relations are either mandatory or tagged with a
//! [`PriorityLevel`]; conditional relations are honoured in descending rank
//! as long as they stay consistent with everything ranked above them.
//!
//! # Logging
//!
//! The engine emits structured `tracing` events under the `eqrel_engine`
//! target:
//! - **DEBUG**: `relation_declared`, `domain_merge`, `domain_split`,
//!   `solve_start`, `solve_end`
//! - **TRACE**: `relation_accepted`, `relation_skipped`, `branch_dead`
//! - **WARN**: `drop_failed` when a handle is dropped during a solve

mod engine;
mod handle;
mod resolver;
mod store;

#[cfg(test)]
mod engine_tests;

pub use engine::Engine;
pub use handle::{Handle, PriorityLevel, Var};
pub use store::DomainState;

pub use eqrel_config::{AssertMode, EngineConfig, RootOrder};
pub use eqrel_core::{
    Category, CompareOp, DomainId, EqError, Expr, RelationId, Result, Value, ValueKind, VarId,
};

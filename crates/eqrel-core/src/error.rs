//! Error types for eqrel

use thiserror::Error;

use crate::id::{DomainId, VarId};

/// Main error type for eqrel operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EqError {
    /// The mandatory relations of a domain have no joint solution.
    #[error("Infeasible mandatory constraints in domain {domain}")]
    InfeasibleMandatory {
        /// Domain whose mandatory set failed.
        domain: DomainId,
    },

    /// Priority level ordering relations contradict each other or form a cycle.
    #[error("Cyclic or inconsistent priority order in domain {domain}")]
    CyclicPriorityOrder {
        /// Priority domain whose ordering failed.
        domain: DomainId,
    },

    /// Value variables and priority levels were combined in one relation.
    #[error("Relation mixes value variables and priority levels")]
    MixedCategory,

    /// A domain was asked to solve while it was already solving.
    #[error("Re-entrant solve of domain {domain}")]
    ReentrantSolve {
        /// Domain that was being solved.
        domain: DomainId,
    },

    /// The variable was destroyed or never belonged to this engine.
    #[error("Unknown variable {0}")]
    UnknownVariable(VarId),

    /// The expression cannot be used as a relation.
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// Error in engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for eqrel operations.
pub type Result<T> = std::result::Result<T, EqError>;

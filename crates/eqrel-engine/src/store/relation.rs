//! Relation records.

use std::fmt;
use std::rc::Rc;

use eqrel_core::{Formula, RelationId, Value, VarId, VarRef};

/// Opaque evaluator over the values of a relation's variables, in
/// declaration order.
pub type CheckFn = Rc<dyn Fn(&[Value]) -> bool>;

/// What a relation requires.
#[derive(Clone)]
pub(crate) enum Predicate {
    /// Built with the expression builder; solvable.
    Formula(Formula),
    /// Opaque closure; only evaluated once every variable is known.
    Check { vars: Vec<VarRef>, check: CheckFn },
}

impl Predicate {
    /// Returns true if the predicate can pin values (contains an equality).
    pub(crate) fn is_selector(&self) -> bool {
        match self {
            Predicate::Formula(f) => f.has_equality(),
            Predicate::Check { .. } => false,
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Formula(formula) => f.debug_tuple("Formula").field(formula).finish(),
            Predicate::Check { vars, .. } => f
                .debug_struct("Check")
                .field("vars", vars)
                .finish_non_exhaustive(),
        }
    }
}

/// A declared relation.
#[derive(Debug, Clone)]
pub(crate) struct RelationRecord {
    pub id: RelationId,
    /// Distinct referenced variables, ordered by id.
    pub vars: Vec<VarId>,
    pub predicate: Predicate,
    /// Priority tag; `None` for mandatory relations.
    pub priority: Option<VarId>,
}

impl RelationRecord {
    #[inline]
    pub(crate) fn is_mandatory(&self) -> bool {
        self.priority.is_none()
    }
}

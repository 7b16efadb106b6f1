//! Domain records.

use std::collections::{BTreeMap, BTreeSet};

use eqrel_core::{Category, RelationId, VarId};

/// Solve state of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainState {
    /// The cached assignment is valid.
    Clean,
    /// Structure changed since the last solve.
    Dirty,
    /// A solve is in progress.
    Solving,
}

/// A group of variables connected by relations, solved as one unit.
#[derive(Debug, Clone)]
pub(crate) struct DomainRecord {
    pub category: Category,
    pub members: BTreeSet<VarId>,
    /// Contained relations; ids ascend with registration order.
    pub relations: BTreeSet<RelationId>,
    pub state: DomainState,
    /// Raw solved values of the last clean solve.
    pub cache: BTreeMap<VarId, f64>,
    /// Priority generation the cached ranks came from, when the domain has
    /// conditional relations.
    pub ranked_at: Option<u64>,
}

impl DomainRecord {
    /// A fresh domain holding only `var`.
    pub(crate) fn singleton(var: VarId, category: Category) -> Self {
        Self {
            category,
            members: BTreeSet::from([var]),
            relations: BTreeSet::new(),
            state: DomainState::Dirty,
            cache: BTreeMap::new(),
            ranked_at: None,
        }
    }

    /// Returns true if the cache may be served at `generation`.
    pub(crate) fn is_fresh(&self, generation: u64) -> bool {
        self.state == DomainState::Clean && self.ranked_at.map_or(true, |g| g == generation)
    }
}

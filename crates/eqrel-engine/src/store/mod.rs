//! Arena store for variables, domains and relations.
//!
//! The store owns every record and addresses them by id. Domains merge when a
//! relation spans several of them and split when a variable is cleared; a
//! domain is solved lazily the first time one of its members is read after a
//! change.
//!
//! Logging levels:
//! - **DEBUG**: Relation declarations, merges, splits, solve start/end
//! - **TRACE**: Per-relation arbitration (emitted by the resolver)

mod domain;
mod relation;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::time::Instant;

use eqrel_config::EngineConfig;
use eqrel_core::{
    Category, DomainId, EqError, RelationId, Result, Value, ValueKind, VarId, VarRef,
};
use tracing::debug;

pub use domain::DomainState;
pub use relation::CheckFn;

pub(crate) use domain::DomainRecord;
pub(crate) use relation::{Predicate, RelationRecord};

use crate::resolver::{Constraint, Problem, Resolver};

/// Per-variable bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct VarSlot {
    pub kind: ValueKind,
    pub category: Category,
    pub domain: DomainId,
    /// Relations referencing this variable.
    pub relations: Vec<RelationId>,
    /// Relations tagged with this variable as priority level.
    pub tagged: Vec<RelationId>,
    pub alive: bool,
}

/// Owner of all engine records.
#[derive(Debug)]
pub(crate) struct Store {
    config: EngineConfig,
    /// Never recycled: an `Expr` still holding a destroyed id must not alias
    /// a newer variable.
    vars: Vec<VarSlot>,
    domains: Vec<Option<DomainRecord>>,
    free_domains: Vec<DomainId>,
    /// Never recycled: relation ids double as registration order.
    relations: Vec<Option<RelationRecord>>,
    /// Bumped whenever a priority domain changes.
    priority_generation: u64,
}

impl Store {
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self {
            config,
            vars: Vec::new(),
            domains: Vec::new(),
            free_domains: Vec::new(),
            relations: Vec::new(),
            priority_generation: 0,
        }
    }

    /// Creates a variable in a fresh singleton domain.
    pub(crate) fn create_var(&mut self, kind: ValueKind, category: Category) -> VarId {
        let id = VarId::new(self.vars.len() as u32);
        let domain = self.alloc_domain(DomainRecord::singleton(id, category));
        self.vars.push(VarSlot {
            kind,
            category,
            domain,
            relations: Vec::new(),
            tagged: Vec::new(),
            alive: true,
        });
        id
    }

    pub(crate) fn slot(&self, var: VarId) -> Result<&VarSlot> {
        self.vars
            .get(var.index())
            .filter(|s| s.alive)
            .ok_or(EqError::UnknownVariable(var))
    }

    fn slot_mut(&mut self, var: VarId) -> Result<&mut VarSlot> {
        self.vars
            .get_mut(var.index())
            .filter(|s| s.alive)
            .ok_or(EqError::UnknownVariable(var))
    }

    pub(crate) fn domain(&self, id: DomainId) -> Result<&DomainRecord> {
        self.domains
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| EqError::Internal(format!("domain {} is not live", id)))
    }

    fn domain_mut(&mut self, id: DomainId) -> Result<&mut DomainRecord> {
        self.domains
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| EqError::Internal(format!("domain {} is not live", id)))
    }

    fn relation(&self, id: RelationId) -> Result<&RelationRecord> {
        self.relations
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| EqError::Internal(format!("relation {} is not live", id)))
    }

    pub(crate) fn domain_of(&self, var: VarId) -> Result<DomainId> {
        Ok(self.slot(var)?.domain)
    }

    /// Number of live domains.
    pub(crate) fn domain_count(&self) -> usize {
        self.domains.iter().flatten().count()
    }

    fn alloc_domain(&mut self, record: DomainRecord) -> DomainId {
        match self.free_domains.pop() {
            Some(id) => {
                self.domains[id.index()] = Some(record);
                id
            }
            None => {
                let id = DomainId::new(self.domains.len() as u32);
                self.domains.push(Some(record));
                id
            }
        }
    }

    fn free_domain(&mut self, id: DomainId) -> Option<DomainRecord> {
        let record = self.domains.get_mut(id.index())?.take();
        if record.is_some() {
            self.free_domains.push(id);
        }
        record
    }

    fn mark_dirty(&mut self, id: DomainId) -> Result<()> {
        let record = self.domain_mut(id)?;
        record.state = DomainState::Dirty;
        if record.category == Category::Priority {
            self.priority_generation += 1;
        }
        Ok(())
    }

    /// Registers a relation, merging the domains of its variables.
    ///
    /// All validation happens before the first mutation, so a rejected
    /// relation leaves the store untouched.
    pub(crate) fn register(
        &mut self,
        vars: &[VarRef],
        predicate: Predicate,
        priority: Option<VarId>,
    ) -> Result<RelationId> {
        let Some(first) = vars.first() else {
            return Err(EqError::InvalidExpression(
                "relation references no variables".to_string(),
            ));
        };
        for var in vars {
            let slot = self.slot(var.id)?;
            if slot.category != first.category || var.category != slot.category {
                return Err(EqError::MixedCategory);
            }
        }
        if let Some(level) = priority {
            if self.slot(level)?.category != Category::Priority {
                return Err(EqError::MixedCategory);
            }
        }

        let mut ids: Vec<VarId> = vars.iter().map(|v| v.id).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut target = self.slot(ids[0])?.domain;
        for var in &ids[1..] {
            let other = self.slot(*var)?.domain;
            if other != target {
                target = self.union(target, other)?;
            }
        }

        let id = RelationId::new(self.relations.len() as u32);
        for var in &ids {
            self.slot_mut(*var)?.relations.push(id);
        }
        if let Some(level) = priority {
            self.slot_mut(level)?.tagged.push(id);
        }
        self.domain_mut(target)?.relations.insert(id);
        self.mark_dirty(target)?;

        debug!(
            event = "relation_declared",
            relation = %id,
            domain = %target,
            variable_count = ids.len(),
            mandatory = priority.is_none(),
        );

        self.relations.push(Some(RelationRecord {
            id,
            vars: ids,
            predicate,
            priority,
        }));
        Ok(id)
    }

    /// Merges two domains; the larger one survives (lower id on ties).
    fn union(&mut self, a: DomainId, b: DomainId) -> Result<DomainId> {
        let len_a = self.domain(a)?.members.len();
        let len_b = self.domain(b)?.members.len();
        let (survivor, absorbed) = if len_a > len_b || (len_a == len_b && a < b) {
            (a, b)
        } else {
            (b, a)
        };

        let record = self
            .free_domain(absorbed)
            .ok_or_else(|| EqError::Internal(format!("domain {} is not live", absorbed)))?;
        for member in &record.members {
            self.vars[member.index()].domain = survivor;
        }

        let target = self.domain_mut(survivor)?;
        target.members.extend(record.members.iter().copied());
        target.relations.extend(record.relations.iter().copied());
        let member_count = target.members.len();
        self.mark_dirty(survivor)?;

        debug!(
            event = "domain_merge",
            survivor = %survivor,
            absorbed = %absorbed,
            member_count,
        );
        Ok(survivor)
    }

    /// Removes a relation from every index. Returns false if already gone.
    fn remove_relation(&mut self, id: RelationId) -> Result<bool> {
        let Some(record) = self.relations.get_mut(id.index()).and_then(Option::take) else {
            return Ok(false);
        };
        for var in &record.vars {
            if let Some(slot) = self.vars.get_mut(var.index()) {
                slot.relations.retain(|r| *r != id);
            }
        }
        if let Some(level) = record.priority {
            if let Some(slot) = self.vars.get_mut(level.index()) {
                slot.tagged.retain(|r| *r != id);
            }
        }
        let domain = self.vars[record.vars[0].index()].domain;
        self.domain_mut(domain)?.relations.remove(&id);
        self.mark_dirty(domain)?;
        Ok(true)
    }

    /// Detaches `var` into a new singleton domain, dropping every relation
    /// that referenced it.
    pub(crate) fn clear(&mut self, var: VarId) -> Result<()> {
        let slot = self.slot_mut(var)?;
        let old = slot.domain;
        let category = slot.category;
        let touching = std::mem::take(&mut slot.relations);

        let mut dropped = 0usize;
        for id in touching {
            if self.remove_relation(id)? {
                dropped += 1;
            }
        }

        let old_record = self.domain_mut(old)?;
        old_record.members.remove(&var);
        old_record.cache.remove(&var);
        if old_record.members.is_empty() {
            self.free_domain(old);
        } else {
            self.mark_dirty(old)?;
        }

        let fresh = self.alloc_domain(DomainRecord::singleton(var, category));
        self.slot_mut(var)?.domain = fresh;

        debug!(
            event = "domain_split",
            variable = %var,
            domain = %old,
            fresh = %fresh,
            dropped_relations = dropped,
        );
        Ok(())
    }

    /// Destroys `var`: clears it, drops relations tagged with it and frees
    /// its singleton domain.
    pub(crate) fn destroy(&mut self, var: VarId) -> Result<()> {
        self.clear(var)?;
        let tagged = std::mem::take(&mut self.slot_mut(var)?.tagged);
        for id in tagged {
            self.remove_relation(id)?;
        }
        let domain = self.slot(var)?.domain;
        self.free_domain(domain);
        self.slot_mut(var)?.alive = false;
        Ok(())
    }

    /// Reads the resolved value of `var`, solving its domain if needed.
    pub(crate) fn value(&mut self, var: VarId) -> Result<Value> {
        let slot = self.slot(var)?;
        let (kind, domain) = (slot.kind, slot.domain);
        self.ensure_solved(domain)?;
        let raw = self.domain(domain)?.cache.get(&var).copied();
        Ok(raw.map_or_else(|| kind.default_value(), |r| Value::from_raw(kind, r)))
    }

    /// Resolved rank of a priority level.
    pub(crate) fn rank(&mut self, level: VarId) -> Result<f64> {
        if self.slot(level)?.category != Category::Priority {
            return Err(EqError::MixedCategory);
        }
        Ok(self.value(level)?.as_f64())
    }

    /// Solves `id` unless its cache is fresh.
    pub(crate) fn ensure_solved(&mut self, id: DomainId) -> Result<()> {
        let generation = self.priority_generation;
        let record = self.domain_mut(id)?;
        if record.state == DomainState::Solving {
            return Err(EqError::ReentrantSolve { domain: id });
        }
        if record.is_fresh(generation) {
            return Ok(());
        }
        record.state = DomainState::Solving;

        let result = self.solve_domain(id);
        let record = self.domain_mut(id)?;
        match result {
            Ok((values, ranked)) => {
                record.cache = values;
                record.state = DomainState::Clean;
                record.ranked_at = ranked.then_some(generation);
                Ok(())
            }
            Err(err) => {
                record.state = DomainState::Dirty;
                Err(err)
            }
        }
    }

    /// Runs the resolver over one domain. The flag reports whether priority
    /// ranks were consulted.
    fn solve_domain(&mut self, id: DomainId) -> Result<(BTreeMap<VarId, f64>, bool)> {
        let started = Instant::now();
        let record = self.domain(id)?;
        let category = record.category;
        let kinds: BTreeMap<VarId, ValueKind> = record
            .members
            .iter()
            .map(|v| (*v, self.vars[v.index()].kind))
            .collect();
        let relations: Vec<RelationRecord> = record
            .relations
            .iter()
            .map(|r| self.relation(*r).cloned())
            .collect::<Result<_>>()?;

        let mut ranks: BTreeMap<VarId, f64> = BTreeMap::new();
        for level in relations.iter().filter_map(|r| r.priority) {
            if !ranks.contains_key(&level) {
                let rank = self.rank(level)?;
                ranks.insert(level, rank);
            }
        }

        let mandatory_count = relations.iter().filter(|r| r.is_mandatory()).count();
        debug!(
            event = "solve_start",
            domain = %id,
            variable_count = kinds.len(),
            mandatory_count,
            conditional_count = relations.len() - mandatory_count,
        );

        let problem = Problem {
            domain: id,
            kinds: &kinds,
            constraints: relations
                .iter()
                .map(|r| Constraint {
                    id: r.id,
                    predicate: &r.predicate,
                    rank: r.priority.and_then(|level| ranks.get(&level).copied()),
                })
                .collect(),
        };

        let solution = Resolver::new(&self.config)
            .solve(&problem)
            .map_err(|err| match (err, category) {
                (EqError::InfeasibleMandatory { domain }, Category::Priority) => {
                    EqError::CyclicPriorityOrder { domain }
                }
                (err, _) => err,
            })?;

        debug!(
            event = "solve_end",
            domain = %id,
            accepted = solution.accepted.len(),
            skipped = solution.skipped.len(),
            duration_us = started.elapsed().as_micros() as u64,
        );
        Ok((solution.values, !ranks.is_empty()))
    }
}

//! The engine: arena owner and public entry point.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use eqrel_config::EngineConfig;
use eqrel_core::{
    Category, CompareOp, DomainId, EqError, Expr, RelationId, Result, Value, ValueKind, VarId,
    VarRef,
};

use crate::handle::{Handle, PriorityLevel, Var};
use crate::store::{DomainState, Predicate, Store};

struct Shared {
    config: EngineConfig,
    store: RefCell<Store>,
    /// Domain whose read is in progress.
    active: Cell<Option<DomainId>>,
}

/// Owns every variable, relation and domain.
///
/// Engines are single-threaded. Cloning an engine yields another handle to
/// the same arena.
///
/// # Example
///
/// ```
/// use eqrel_engine::Engine;
///
/// let engine = Engine::new();
/// let low = engine.priority_level().unwrap();
/// let high = engine.priority_level().unwrap();
/// high.above(&low).unwrap();
///
/// let x = engine.int_var().unwrap();
/// engine.relate_with(x.equals(3), &low).unwrap();
/// engine.relate_with(x.equals(1), &high).unwrap();
/// assert_eq!(x.value().unwrap().as_i64(), Some(1));
/// ```
#[derive(Clone)]
pub struct Engine {
    shared: Rc<Shared>,
}

impl Engine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Creates an engine with a validated configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|err| EqError::Config(err.to_string()))?;
        Ok(Self::build(config))
    }

    /// Creates an engine from a TOML or YAML configuration file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = EngineConfig::load(path).map_err(|err| EqError::Config(err.to_string()))?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                store: RefCell::new(Store::new(config.clone())),
                config,
                active: Cell::new(None),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
        let mut store = self.shared.store.try_borrow_mut().map_err(|_| self.busy())?;
        f(&mut store)
    }

    fn busy(&self) -> EqError {
        match self.shared.active.get() {
            Some(domain) => EqError::ReentrantSolve { domain },
            None => EqError::Internal("engine store is already borrowed".to_string()),
        }
    }

    fn check_owner(&self, handle: &impl Handle) -> Result<VarId> {
        if Rc::ptr_eq(&self.shared, &handle.engine().shared) {
            Ok(handle.var_id())
        } else {
            Err(EqError::UnknownVariable(handle.var_id()))
        }
    }

    /// Creates a value variable of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EqError::ReentrantSolve`] when called from inside a custom
    /// relation evaluator during a solve.
    pub fn var(&self, kind: ValueKind) -> Result<Var> {
        let id = self.with_store(|store| Ok(store.create_var(kind, Category::Value)))?;
        Ok(Var::new(id, kind, self.clone()))
    }

    pub fn int_var(&self) -> Result<Var> {
        self.var(ValueKind::Int)
    }

    pub fn float_var(&self) -> Result<Var> {
        self.var(ValueKind::Float)
    }

    pub fn bool_var(&self) -> Result<Var> {
        self.var(ValueKind::Bool)
    }

    /// Creates an unordered priority level.
    ///
    /// # Errors
    ///
    /// Returns [`EqError::ReentrantSolve`] when called from inside a custom
    /// relation evaluator during a solve.
    pub fn priority_level(&self) -> Result<PriorityLevel> {
        let id = self.with_store(|store| Ok(store.create_var(ValueKind::Int, Category::Priority)))?;
        Ok(PriorityLevel::new(id, self.clone()))
    }

    /// Declares a mandatory relation.
    pub fn relate(&self, expr: impl Into<Expr>) -> Result<RelationId> {
        self.relate_expr(expr.into(), None)
    }

    /// Declares a relation that holds only if `level` ranks high enough.
    pub fn relate_with(&self, expr: impl Into<Expr>, level: &PriorityLevel) -> Result<RelationId> {
        let level = self.check_owner(level)?;
        self.relate_expr(expr.into(), Some(level))
    }

    fn relate_expr(&self, expr: Expr, level: Option<VarId>) -> Result<RelationId> {
        let formula = expr.to_formula()?;
        expr.category()?;
        let vars = expr.vars();
        self.with_store(|store| store.register(&vars, Predicate::Formula(formula), level))
    }

    /// Declares a relation checked by `check` once every variable has a
    /// value.
    ///
    /// The closure receives values in the order of `vars`. It cannot pin
    /// values, only accept or reject assignments.
    pub fn relate_fn<F>(
        &self,
        vars: &[&Var],
        level: Option<&PriorityLevel>,
        check: F,
    ) -> Result<RelationId>
    where
        F: Fn(&[Value]) -> bool + 'static,
    {
        let refs = vars
            .iter()
            .map(|v| {
                self.check_owner(*v)
                    .map(|id| VarRef::new(id, v.kind(), Category::Value))
            })
            .collect::<Result<Vec<_>>>()?;
        let level = level.map(|l| self.check_owner(l)).transpose()?;
        let predicate = Predicate::Check {
            vars: refs.clone(),
            check: Rc::new(check),
        };
        self.with_store(|store| store.register(&refs, predicate, level))
    }

    /// Declares a mandatory ordering `a <op> b` between priority levels.
    pub fn order(&self, a: &PriorityLevel, op: CompareOp, b: &PriorityLevel) -> Result<RelationId> {
        self.check_owner(a)?;
        self.check_owner(b)?;
        self.relate(a.cmp_with(op, b))
    }

    /// Resolved value of `var`.
    pub fn read(&self, var: &Var) -> Result<Value> {
        let id = self.check_owner(var)?;
        self.solved(id, |store| store.value(id))
    }

    /// Resolved rank of `level`.
    pub fn rank(&self, level: &PriorityLevel) -> Result<f64> {
        let id = self.check_owner(level)?;
        self.solved(id, |store| store.rank(id))
    }

    fn solved<T>(&self, id: VarId, f: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
        self.with_store(|store| {
            self.shared.active.set(Some(store.domain_of(id)?));
            let out = f(store);
            self.shared.active.set(None);
            out
        })
    }

    /// Drops every relation referencing `var`, moving it to a fresh domain.
    pub fn clear(&self, var: &Var) -> Result<()> {
        let id = self.check_owner(var)?;
        self.with_store(|store| store.clear(id))
    }

    /// Drops every ordering relation referencing `level`.
    pub fn clear_level(&self, level: &PriorityLevel) -> Result<()> {
        let id = self.check_owner(level)?;
        self.with_store(|store| store.clear(id))
    }

    pub(crate) fn destroy(&self, id: VarId) -> Result<()> {
        self.with_store(|store| store.destroy(id))
    }

    /// Domain currently holding `handle`.
    pub fn domain_of(&self, handle: &impl Handle) -> Result<DomainId> {
        let id = self.check_owner(handle)?;
        self.with_store(|store| store.domain_of(id))
    }

    /// Returns true if both handles share a domain.
    pub fn same_domain(&self, a: &impl Handle, b: &impl Handle) -> Result<bool> {
        Ok(self.domain_of(a)? == self.domain_of(b)?)
    }

    /// Number of variables in `domain`.
    pub fn domain_len(&self, domain: DomainId) -> Result<usize> {
        self.with_store(|store| Ok(store.domain(domain)?.members.len()))
    }

    /// Number of relations in `domain`.
    pub fn relation_count(&self, domain: DomainId) -> Result<usize> {
        self.with_store(|store| Ok(store.domain(domain)?.relations.len()))
    }

    pub fn domain_state(&self, domain: DomainId) -> Result<DomainState> {
        self.with_store(|store| Ok(store.domain(domain)?.state))
    }

    /// Number of live domains.
    pub fn domain_count(&self) -> Result<usize> {
        self.with_store(|store| Ok(store.domain_count()))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

use eqrel_config::EngineConfig;
use eqrel_core::{Category, EqError, Expr, Formula, Value, ValueKind, VarId, VarRef};

use super::*;

fn store() -> Store {
    Store::new(EngineConfig::default())
}

fn v(id: VarId) -> Expr {
    Expr::var(VarRef::new(id, ValueKind::Int, Category::Value))
}

fn p(id: VarId) -> Expr {
    Expr::var(VarRef::new(id, ValueKind::Int, Category::Priority))
}

fn relate(store: &mut Store, expr: Expr, priority: Option<VarId>) -> RelationId {
    let vars = expr.vars();
    let formula = expr.to_formula().unwrap();
    store
        .register(&vars, Predicate::Formula(formula), priority)
        .unwrap()
}

#[test]
fn test_new_var_has_singleton_domain() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Value);
    let b = s.create_var(ValueKind::Int, Category::Value);
    assert_ne!(s.domain_of(a).unwrap(), s.domain_of(b).unwrap());
    assert_eq!(s.domain_count(), 2);
}

#[test]
fn test_relation_merges_domains() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Value);
    let b = s.create_var(ValueKind::Int, Category::Value);
    let c = s.create_var(ValueKind::Int, Category::Value);
    relate(&mut s, v(a).equals(v(b)), None);
    relate(&mut s, v(b).equals(v(c)), None);

    let d = s.domain_of(a).unwrap();
    assert_eq!(s.domain_of(b).unwrap(), d);
    assert_eq!(s.domain_of(c).unwrap(), d);
    assert_eq!(s.domain(d).unwrap().members.len(), 3);
    assert_eq!(s.domain(d).unwrap().relations.len(), 2);
    assert_eq!(s.domain_count(), 1);
}

#[test]
fn test_merge_survivor_is_larger_domain() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Value);
    let b = s.create_var(ValueKind::Int, Category::Value);
    let c = s.create_var(ValueKind::Int, Category::Value);
    relate(&mut s, v(b).equals(v(c)), None);
    let big = s.domain_of(b).unwrap();
    relate(&mut s, v(a).equals(v(b)), None);
    assert_eq!(s.domain_of(a).unwrap(), big);
}

#[test]
fn test_clear_splits_and_drops_relations() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Value);
    let b = s.create_var(ValueKind::Int, Category::Value);
    relate(&mut s, v(a).equals(1).and(v(b).equals(2)), None);
    relate(&mut s, v(b).greater(0), None);
    let shared = s.domain_of(b).unwrap();

    s.clear(a).unwrap();

    assert_ne!(s.domain_of(a).unwrap(), s.domain_of(b).unwrap());
    assert_eq!(s.domain_of(b).unwrap(), shared);
    assert_eq!(s.domain(shared).unwrap().relations.len(), 1);
    assert!(s.slot(a).unwrap().relations.is_empty());
    assert_eq!(s.slot(b).unwrap().relations.len(), 1);
    assert_eq!(s.domain(shared).unwrap().state, DomainState::Dirty);
}

#[test]
fn test_clear_lone_var_recycles_domain() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Value);
    relate(&mut s, v(a).equals(5), None);
    s.clear(a).unwrap();
    assert_eq!(s.domain_count(), 1);
    assert_eq!(s.value(a).unwrap(), Value::Int(0));
}

#[test]
fn test_destroy_marks_variable_unknown() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Value);
    let b = s.create_var(ValueKind::Int, Category::Value);
    relate(&mut s, v(a).equals(v(b)), None);
    s.destroy(a).unwrap();

    assert_eq!(s.slot(a).unwrap_err(), EqError::UnknownVariable(a));
    assert!(s.slot(b).unwrap().relations.is_empty());
    assert_eq!(s.domain_count(), 1);
}

#[test]
fn test_destroyed_var_id_not_reused() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Value);
    s.destroy(a).unwrap();
    let b = s.create_var(ValueKind::Int, Category::Value);

    assert_ne!(a, b);
    assert_eq!(s.slot(a).unwrap_err(), EqError::UnknownVariable(a));
    assert!(s.slot(b).is_ok());
}

#[test]
fn test_destroy_level_drops_tagged_relations() {
    let mut s = store();
    let level = s.create_var(ValueKind::Int, Category::Priority);
    let x = s.create_var(ValueKind::Int, Category::Value);
    relate(&mut s, v(x).equals(7), Some(level));
    assert_eq!(s.value(x).unwrap(), Value::Int(7));

    s.destroy(level).unwrap();
    assert!(s.slot(x).unwrap().relations.is_empty());
    assert_eq!(s.value(x).unwrap(), Value::Int(0));
}

#[test]
fn test_mixed_category_rejected_without_mutation() {
    let mut s = store();
    let level = s.create_var(ValueKind::Int, Category::Priority);
    let x = s.create_var(ValueKind::Int, Category::Value);
    let expr = v(x).equals(p(level));
    let vars = expr.vars();
    let err = s
        .register(&vars, Predicate::Formula(expr.to_formula().unwrap()), None)
        .unwrap_err();
    assert_eq!(err, EqError::MixedCategory);
    assert_ne!(s.domain_of(x).unwrap(), s.domain_of(level).unwrap());
}

#[test]
fn test_value_tag_must_be_priority() {
    let mut s = store();
    let x = s.create_var(ValueKind::Int, Category::Value);
    let y = s.create_var(ValueKind::Int, Category::Value);
    let expr = v(x).equals(1);
    let vars = expr.vars();
    let err = s
        .register(&vars, Predicate::Formula(expr.to_formula().unwrap()), Some(y))
        .unwrap_err();
    assert_eq!(err, EqError::MixedCategory);
}

#[test]
fn test_empty_relation_rejected() {
    let mut s = store();
    let err = s
        .register(&[], Predicate::Formula(Formula::Const(true)), None)
        .unwrap_err();
    assert!(matches!(err, EqError::InvalidExpression(_)));
}

#[test]
fn test_solve_caches_until_change() {
    let mut s = store();
    let x = s.create_var(ValueKind::Int, Category::Value);
    relate(&mut s, v(x).equals(3), None);
    let d = s.domain_of(x).unwrap();
    assert_eq!(s.domain(d).unwrap().state, DomainState::Dirty);

    assert_eq!(s.value(x).unwrap(), Value::Int(3));
    assert_eq!(s.domain(d).unwrap().state, DomainState::Clean);

    relate(&mut s, v(x).greater(0), None);
    assert_eq!(s.domain(d).unwrap().state, DomainState::Dirty);
}

#[test]
fn test_priority_change_invalidates_ranked_cache() {
    let mut s = store();
    let low = s.create_var(ValueKind::Int, Category::Priority);
    let high = s.create_var(ValueKind::Int, Category::Priority);
    let x = s.create_var(ValueKind::Int, Category::Value);
    relate(&mut s, p(high).greater(p(low)), None);
    relate(&mut s, v(x).equals(1), Some(high));
    relate(&mut s, v(x).equals(2), Some(low));
    assert_eq!(s.value(x).unwrap(), Value::Int(1));

    s.clear(high).unwrap();
    relate(&mut s, p(low).greater(p(high)), None);
    assert_eq!(s.value(x).unwrap(), Value::Int(2));
}

#[test]
fn test_cyclic_priority_order() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Priority);
    let b = s.create_var(ValueKind::Int, Category::Priority);
    relate(&mut s, p(a).greater(p(b)), None);
    relate(&mut s, p(b).greater(p(a)), None);
    let d = s.domain_of(a).unwrap();
    assert_eq!(s.rank(a).unwrap_err(), EqError::CyclicPriorityOrder { domain: d });
}

#[test]
fn test_self_ranked_priority_domain_is_reentrant() {
    let mut s = store();
    let a = s.create_var(ValueKind::Int, Category::Priority);
    let b = s.create_var(ValueKind::Int, Category::Priority);
    relate(&mut s, p(a).greater(p(b)), Some(a));
    let d = s.domain_of(a).unwrap();
    assert_eq!(s.rank(b).unwrap_err(), EqError::ReentrantSolve { domain: d });
    assert_eq!(s.domain(d).unwrap().state, DomainState::Dirty);
}

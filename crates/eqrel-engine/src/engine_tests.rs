use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    AssertMode, CompareOp, DomainState, Engine, EngineConfig, EqError, RootOrder, Value, ValueKind,
};

#[test]
fn test_box_bounds() {
    let engine = Engine::new();
    let top = engine.int_var().unwrap();
    let bottom = engine.int_var().unwrap();
    engine.relate((&top - &bottom).greater_eq(0)).unwrap();
    engine.relate(top.equals(30)).unwrap();
    engine.relate(bottom.equals(0)).unwrap();

    assert_eq!(top.value().unwrap(), Value::Int(30));
    assert_eq!(bottom.value().unwrap(), Value::Int(0));
}

#[test]
fn test_quadratic_arbitration() {
    let engine = Engine::new();
    let low = engine.priority_level().unwrap();
    let high = engine.priority_level().unwrap();
    high.above(&low).unwrap();

    let x = engine.int_var().unwrap();
    let y = engine.int_var().unwrap();
    engine.relate((&x * &x).equals(144)).unwrap();
    engine.relate_with(x.greater(0), &low).unwrap();
    engine.relate_with(x.less(10), &high).unwrap();
    engine.relate_with(y.equals(2 * &x), &low).unwrap();

    assert_eq!(x.value().unwrap(), Value::Int(12));
    assert_eq!(y.value().unwrap(), Value::Int(24));
}

#[test]
fn test_ranked_equalities() {
    let engine = Engine::new();
    let low = engine.priority_level().unwrap();
    let med = engine.priority_level().unwrap();
    let high = engine.priority_level().unwrap();
    engine.order(&low, CompareOp::Lt, &med).unwrap();
    engine.order(&med, CompareOp::Lt, &high).unwrap();

    let x = engine.int_var().unwrap();
    engine.relate_with(x.equals(1), &high).unwrap();
    engine.relate_with(x.equals(2), &med).unwrap();
    engine.relate_with(x.equals(3), &low).unwrap();

    assert_eq!(x.value().unwrap(), Value::Int(1));
    assert!(high.rank().unwrap() > med.rank().unwrap());
    assert!(med.rank().unwrap() > low.rank().unwrap());
}

#[test]
fn test_level_arithmetic() {
    let engine = Engine::new();
    let low = engine.priority_level().unwrap();
    let high = engine.priority_level().unwrap();
    engine.relate(high.equals(&low + 5)).unwrap();
    engine.relate(low.equals(2)).unwrap();
    assert_eq!(high.rank().unwrap(), 7.0);
}

#[test]
fn test_clear_restores_conditional() {
    let engine = Engine::new();
    let init = engine.priority_level().unwrap();
    let a = engine.int_var().unwrap();
    let b = engine.int_var().unwrap();
    engine.relate_with(b.equals(1337), &init).unwrap();
    engine.relate(a.equals(1).and(b.equals(2))).unwrap();
    assert_eq!(b.value().unwrap(), Value::Int(2));

    a.clear().unwrap();
    assert_eq!(b.value().unwrap(), Value::Int(1337));
    assert_eq!(a.value().unwrap(), Value::Int(0));
}

#[test]
fn test_stacked_boxes() {
    let engine = Engine::new();
    let boxes: Vec<_> = (0..2)
        .map(|_| {
            let top = engine.int_var().unwrap();
            let bottom = engine.int_var().unwrap();
            let height = engine.int_var().unwrap();
            engine.relate(height.equals(&top - &bottom)).unwrap();
            engine.relate(height.greater_eq(0)).unwrap();
            (top, bottom, height)
        })
        .collect();
    let (t1, b1, h1) = &boxes[0];
    let (t2, b2, h2) = &boxes[1];
    engine.relate(t1.equals(30).and(b2.equals(0))).unwrap();
    engine.relate(b1.equals(t2).and(h1.equals(h2))).unwrap();

    assert!(engine.same_domain(t1, b2).unwrap());
    assert_eq!(t1.value().unwrap(), Value::Int(30));
    assert_eq!(b1.value().unwrap(), Value::Int(15));
    assert_eq!(t2.value().unwrap(), Value::Int(15));
    assert_eq!(b2.value().unwrap(), Value::Int(0));
}

#[test]
fn test_unrelated_variable_reads_default() {
    let engine = Engine::new();
    assert_eq!(engine.int_var().unwrap().value().unwrap(), Value::Int(0));
    assert_eq!(engine.float_var().unwrap().value().unwrap(), Value::Float(0.0));
    assert_eq!(engine.bool_var().unwrap().value().unwrap(), Value::Bool(false));
}

#[test]
fn test_float_and_bool_kinds() {
    let engine = Engine::new();
    let f = engine.float_var().unwrap();
    engine.relate((2.0 * &f).equals(5)).unwrap();
    assert_eq!(f.value().unwrap(), Value::Float(2.5));

    let flag = engine.bool_var().unwrap();
    let n = engine.int_var().unwrap();
    engine.relate(flag.expr()).unwrap();
    engine.relate(n.equals(&flag * 10)).unwrap();
    assert_eq!(flag.value().unwrap(), Value::Bool(true));
    assert_eq!(n.value().unwrap(), Value::Int(10));
}

#[test]
fn test_negated_bool() {
    let engine = Engine::new();
    let flag = engine.bool_var().unwrap();
    let n = engine.int_var().unwrap();
    engine.relate(!&flag).unwrap();
    engine.relate(n.equals(&flag + 4)).unwrap();
    assert_eq!(flag.value().unwrap(), Value::Bool(false));
    assert_eq!(n.value().unwrap(), Value::Int(4));
}

#[test]
fn test_disjunction() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    engine.relate(x.equals(4).or(x.equals(9))).unwrap();
    engine.relate(x.greater(5)).unwrap();
    assert_eq!(x.value().unwrap(), Value::Int(9));
}

#[test]
fn test_infeasible_mandatory() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    engine.relate(x.equals(1)).unwrap();
    engine.relate(x.equals(2)).unwrap();
    let domain = x.domain().unwrap();
    assert_eq!(
        x.value().unwrap_err(),
        EqError::InfeasibleMandatory { domain }
    );
    assert_eq!(engine.domain_state(domain).unwrap(), DomainState::Dirty);
}

#[test]
fn test_cyclic_priority_order() {
    let engine = Engine::new();
    let a = engine.priority_level().unwrap();
    let b = engine.priority_level().unwrap();
    a.above(&b).unwrap();
    b.above(&a).unwrap();

    let x = engine.int_var().unwrap();
    engine.relate_with(x.equals(1), &a).unwrap();
    assert!(matches!(
        x.value().unwrap_err(),
        EqError::CyclicPriorityOrder { .. }
    ));
}

#[test]
fn test_mixed_category_rejected() {
    let engine = Engine::new();
    let level = engine.priority_level().unwrap();
    let x = engine.int_var().unwrap();
    assert_eq!(
        engine.relate(x.equals(&level)).unwrap_err(),
        EqError::MixedCategory
    );
    assert!(!engine.same_domain(&x, &level).unwrap());
}

#[test]
fn test_constant_relation_rejected() {
    let engine = Engine::new();
    assert!(matches!(
        engine.relate(true).unwrap_err(),
        EqError::InvalidExpression(_)
    ));
}

#[test]
fn test_numeric_relation_rejected() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    assert!(matches!(
        engine.relate(&x + 1).unwrap_err(),
        EqError::InvalidExpression(_)
    ));
}

#[test]
fn test_merge_and_split_introspection() {
    let engine = Engine::new();
    let a = engine.int_var().unwrap();
    let b = engine.int_var().unwrap();
    let c = engine.int_var().unwrap();
    assert_eq!(engine.domain_count().unwrap(), 3);

    engine.relate(a.equals(&b)).unwrap();
    engine.relate(b.less(&c)).unwrap();
    let d = a.domain().unwrap();
    assert_eq!(engine.domain_len(d).unwrap(), 3);
    assert_eq!(engine.relation_count(d).unwrap(), 2);
    assert_eq!(engine.domain_count().unwrap(), 1);

    b.clear().unwrap();
    assert_eq!(engine.domain_count().unwrap(), 2);
    assert!(!engine.same_domain(&a, &b).unwrap());
    assert!(engine.same_domain(&a, &c).unwrap());
    assert_eq!(engine.relation_count(a.domain().unwrap()).unwrap(), 0);
}

#[test]
fn test_drop_removes_relations() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    {
        let y = engine.int_var().unwrap();
        engine.relate(x.equals(&y)).unwrap();
        engine.relate(y.equals(5)).unwrap();
        assert_eq!(x.value().unwrap(), Value::Int(5));
    }
    assert_eq!(x.value().unwrap(), Value::Int(0));
    assert_eq!(engine.domain_count().unwrap(), 1);
}

#[test]
fn test_drop_level_removes_tagged_relations() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    {
        let level = engine.priority_level().unwrap();
        engine.relate_with(x.equals(9), &level).unwrap();
        assert_eq!(x.value().unwrap(), Value::Int(9));
    }
    assert_eq!(x.value().unwrap(), Value::Int(0));
}

#[test]
fn test_foreign_handle_rejected() {
    let engine = Engine::new();
    let other = Engine::new();
    let x = other.int_var().unwrap();
    assert_eq!(engine.read(&x).unwrap_err(), EqError::UnknownVariable(x.id()));
}

#[test]
fn test_custom_check() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    engine.relate(x.greater_eq(0)).unwrap();
    engine
        .relate_fn(&[&x], None, |values: &[Value]| {
            values[0].as_i64().is_some_and(|v| v % 3 == 2)
        })
        .unwrap();
    assert_eq!(x.value().unwrap(), Value::Int(2));
}

#[test]
fn test_conditional_custom_check_skipped() {
    let engine = Engine::new();
    let level = engine.priority_level().unwrap();
    let x = engine.int_var().unwrap();
    engine.relate(x.equals(4)).unwrap();
    engine
        .relate_fn(&[&x], Some(&level), |values: &[Value]| values[0] == Value::Int(5))
        .unwrap();
    assert_eq!(x.value().unwrap(), Value::Int(4));
}

#[test]
fn test_reentrant_read_from_check() {
    let engine = Engine::new();
    let x = Rc::new(engine.int_var().unwrap());
    engine.relate(x.equals(1)).unwrap();

    let seen = Rc::new(RefCell::new(None));
    let (inner_engine, inner_x, inner_seen) = (engine.clone(), Rc::clone(&x), Rc::clone(&seen));
    engine
        .relate_fn(&[&*x], None, move |_| {
            *inner_seen.borrow_mut() = Some(inner_engine.read(&inner_x));
            true
        })
        .unwrap();

    assert_eq!(x.value().unwrap(), Value::Int(1));
    let domain = x.domain().unwrap();
    assert_eq!(
        seen.borrow().clone(),
        Some(Err(EqError::ReentrantSolve { domain }))
    );
}

#[test]
fn test_cache_reused_until_change() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    engine.relate(x.equals(3)).unwrap();
    let d = x.domain().unwrap();
    assert_eq!(engine.domain_state(d).unwrap(), DomainState::Dirty);
    assert_eq!(x.value().unwrap(), Value::Int(3));
    assert_eq!(engine.domain_state(d).unwrap(), DomainState::Clean);
    assert_eq!(x.value().unwrap(), Value::Int(3));
}

#[test]
fn test_config_root_order() {
    let engine =
        Engine::with_config(EngineConfig::default().with_root_order(RootOrder::Ascending))
            .unwrap();
    let x = engine.int_var().unwrap();
    engine.relate((&x * &x).equals(49)).unwrap();
    assert_eq!(x.value().unwrap(), Value::Int(-7));
}

#[test]
fn test_invalid_config_rejected() {
    let err = Engine::with_config(EngineConfig::default().with_tolerance(-1.0)).unwrap_err();
    assert!(matches!(err, EqError::Config(_)));
}

#[test]
fn test_verify_mode() {
    let engine =
        Engine::with_config(EngineConfig::default().with_assert_mode(AssertMode::Verify)).unwrap();
    let x = engine.var(ValueKind::Int).unwrap();
    let y = engine.var(ValueKind::Int).unwrap();
    engine.relate((&x + &y).equals(10)).unwrap();
    engine.relate((&x - &y).equals(2)).unwrap();
    assert_eq!(x.value().unwrap(), Value::Int(6));
    assert_eq!(y.value().unwrap(), Value::Int(4));
}

#[test]
fn test_inequality_beyond_default_window() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    let y = engine.int_var().unwrap();
    engine.relate((&x + &y).equals(100)).unwrap();
    engine.relate((&x - &y).greater_eq(50)).unwrap();

    let (x, y) = (
        x.value().unwrap().as_i64().unwrap(),
        y.value().unwrap().as_i64().unwrap(),
    );
    assert_eq!(x + y, 100);
    assert!(x - y >= 50);
}

#[test]
fn test_conditional_inequality_over_equality_accepted() {
    let engine = Engine::new();
    let level = engine.priority_level().unwrap();
    let x = engine.int_var().unwrap();
    let y = engine.int_var().unwrap();
    engine.relate((&x + &y).equals(100)).unwrap();
    engine.relate_with((&x - &y).greater_eq(150), &level).unwrap();
    assert_eq!(x.value().unwrap(), Value::Int(125));
    assert_eq!(y.value().unwrap(), Value::Int(-25));
}

#[test]
fn test_var_creation_inside_check_is_reentrant() {
    let engine = Engine::new();
    let x = engine.int_var().unwrap();
    engine.relate(x.equals(1)).unwrap();

    let seen = Rc::new(RefCell::new(None));
    let (inner_engine, inner_seen) = (engine.clone(), Rc::clone(&seen));
    engine
        .relate_fn(&[&x], None, move |_| {
            *inner_seen.borrow_mut() = Some(inner_engine.int_var().map(|v| v.id()));
            true
        })
        .unwrap();

    assert_eq!(x.value().unwrap(), Value::Int(1));
    let domain = x.domain().unwrap();
    assert_eq!(
        seen.borrow().clone(),
        Some(Err(EqError::ReentrantSolve { domain }))
    );
}

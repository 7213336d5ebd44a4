use layerkit_expression::{
    clear_expression_caches, evaluate_expression, Defines, Expression, ExpressionCache, Value,
};
use serde_json::json;

#[test]
fn test_same_property_names_compile_once() {
    let cache = ExpressionCache::new();
    let defines = Defines::new();
    let a = json!({"id": "a", "properties": {"a": 5}});
    let b = json!({"id": "b", "properties": {"a": 0}});

    assert_eq!(
        evaluate_expression("${a} > 1", Some(&a), &defines, &cache),
        Ok(Value::Bool(true))
    );
    assert_eq!(
        evaluate_expression("${a} > 1", Some(&b), &defines, &cache),
        Ok(Value::Bool(false))
    );
    assert_eq!(cache.compile_count(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_spliced_values_are_part_of_the_key() {
    let cache = ExpressionCache::new();
    let defines = Defines::new();
    let a = json!({"properties": {"h": 1}});
    let b = json!({"properties": {"h": 2}});
    let expr = "${$.properties.h} + 1";

    assert_eq!(
        evaluate_expression(expr, Some(&a), &defines, &cache),
        Ok(Value::Number(2.0))
    );
    assert_eq!(
        evaluate_expression(expr, Some(&b), &defines, &cache),
        Ok(Value::Number(3.0))
    );
    assert_eq!(
        evaluate_expression(expr, Some(&a), &defines, &cache),
        Ok(Value::Number(2.0))
    );
    assert_eq!(cache.compile_count(), 2);
}

#[test]
fn test_clearing_forces_recompilation() {
    let cache = ExpressionCache::new();
    let defines = Defines::new();
    let f = json!({"properties": {"a": 1}});

    evaluate_expression("${a} + 1", Some(&f), &defines, &cache).unwrap();
    assert!(clear_expression_caches("${a} + 1", Some(&f), &defines, &cache));
    evaluate_expression("${a} + 1", Some(&f), &defines, &cache).unwrap();
    assert_eq!(cache.compile_count(), 2);
}

#[test]
fn test_expression_carries_its_defines() {
    let cache = ExpressionCache::new();
    let mut defines = Defines::new();
    defines.insert("two".into(), "1 + 1".into());
    let expr = Expression::new("${two} * 3").with_defines(defines);
    assert_eq!(expr.evaluate(None, &cache), Ok(Value::Number(6.0)));
    assert!(expr.clear_cache(None, &cache));
    assert!(cache.is_empty());
}

//! Integration tests for expression evaluation through the compile cache.

use layerkit_expression::{
    evaluate_expression, ConditionalExpression, Defines, ExpressionCache, Value,
};
use serde_json::json;

fn check(expression: &str, expected: serde_json::Value, feature: serde_json::Value) {
    let cache = ExpressionCache::new();
    let result = evaluate_expression(expression, Some(&feature), &Defines::new(), &cache)
        .unwrap_or_else(|e| panic!("evaluate({expression}) failed: {e}"));
    assert_eq!(
        result.into_json().unwrap_or(serde_json::Value::Null),
        expected,
        "expression: {expression}"
    );
}

fn check_err(expression: &str, feature: serde_json::Value) -> String {
    let cache = ExpressionCache::new();
    evaluate_expression(expression, Some(&feature), &Defines::new(), &cache)
        .err()
        .unwrap_or_else(|| panic!("expected error for {expression}"))
        .to_string()
}

fn props(properties: serde_json::Value) -> serde_json::Value {
    json!({"id": "f1", "properties": properties})
}

// ----------------------------------------------------------------- Arithmetic

#[test]
fn test_arithmetic() {
    check("1 + 2 * 3", json!(7), json!({}));
    check("(1 + 2) * 3", json!(9), json!({}));
    check("7 % 4", json!(3), json!({}));
    check("1 / 4", json!(0.25), json!({}));
    check("-${a} + +2", json!(-1), props(json!({"a": 3})));
    check("'n' + 1", json!("n1"), json!({}));
    check("1 + '2'", json!("12"), json!({}));
    check("'v' + 0.0000001", json!("v1e-7"), json!({}));
}

#[test]
fn test_arithmetic_type_errors() {
    assert_eq!(
        check_err("true + 1", json!({})),
        "Operator \"+\" is not defined for boolean and number"
    );
    assert!(check_err("'a' * 2", json!({})).contains("\"*\""));
    assert!(check_err("-'a'", json!({})).contains("\"-\""));
}

#[test]
fn test_deep_nesting_is_an_error() {
    let nested = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
    assert_eq!(
        check_err(&nested, json!({})),
        "Expression nests deeper than 256 levels"
    );
    check(&format!("{}1{}", "(".repeat(64), ")".repeat(64)), json!(1), json!({}));
}

// ----------------------------------------------------------------- Comparison

#[test]
fn test_comparison() {
    check("${a} > 1", json!(true), props(json!({"a": 2})));
    check("${a} <= 1", json!(false), props(json!({"a": 2})));
    check("'abc' < 'abd'", json!(true), json!({}));
    check("1 === 1", json!(true), json!({}));
    check("1 === '1'", json!(false), json!({}));
    check("[1, 2] === [1, 2]", json!(true), json!({}));
    check("${missing} === undefined", json!(true), props(json!({})));
    check("${n} !== null", json!(false), props(json!({"n": null})));
}

#[test]
fn test_loose_equality_is_rejected() {
    assert!(check_err("1 == 1", json!({})).contains("=="));
}

// ----------------------------------------------------------------- Logical

#[test]
fn test_logical() {
    check("true && false", json!(false), json!({}));
    check("false || true", json!(true), json!({}));
    check("!false", json!(true), json!({}));
    // Short-circuit: the right side would be a type error.
    check("false && 1", json!(false), json!({}));
    check("true || 'x'", json!(true), json!({}));
}

#[test]
fn test_logical_requires_booleans() {
    assert!(check_err("1 && true", json!({})).contains("\"&&\" requires a boolean"));
    assert!(check_err("!1", json!({})).contains("\"!\" requires a boolean"));
}

#[test]
fn test_ternary() {
    check("${a} > 1 ? 'big' : 'small'", json!("big"), props(json!({"a": 5})));
    check("${a} > 1 ? 'big' : 'small'", json!("small"), props(json!({"a": 0})));
    assert_eq!(
        check_err("1 ? 2 : 3", json!({})),
        "Condition of a ternary expression must be a boolean, got number"
    );
}

// ----------------------------------------------------------------- Variables

#[test]
fn test_identifiers() {
    check("pop * 2", json!(20), props(json!({"pop": 10})));
    check("id", json!("f1"), props(json!({})));
    check("feature.pop", json!(10), props(json!({"pop": 10})));
    check("feature['with space']", json!(1), props(json!({"with space": 1})));
    check("${with space} + 1", json!(2), props(json!({"with space": 1})));
    check("${nested}.a[1]", json!(2), props(json!({"nested": {"a": [1, 2]}})));
}

#[test]
fn test_string_interpolation() {
    check(
        "'${name} (${kind})'",
        json!("Oslo (city)"),
        props(json!({"name": "Oslo", "kind": "city"})),
    );
    check("\"${n}\" + '!'", json!("1.5!"), props(json!({"n": 1.5})));
}

#[test]
fn test_jsonpath_splicing() {
    let feature = json!({
        "id": "f1",
        "properties": {"levels": [{"h": 10}, {"h": 20}]}
    });
    check("${$.properties.levels[1].h} * 2", json!(40), feature.clone());
    check("'id ${$.id}'", json!("id f1"), feature.clone());
    // Several matches: the expression degrades and no longer parses.
    check_err("${$.properties.levels[*].h} * 2", feature);
}

#[test]
fn test_keywords_and_conversions() {
    check("isNaN(NaN)", json!(true), json!({}));
    check("isFinite(Infinity)", json!(false), json!({}));
    check("Number('42') + 1", json!(43), json!({}));
    check("String(12) + 'px'", json!("12px"), json!({}));
    check("Boolean('')", json!(false), json!({}));
    check("round(PI * 100) / 100", json!(3.14), json!({}));
}

#[test]
fn test_functions() {
    check("max(${a}, 3)", json!(5), props(json!({"a": 5})));
    check("clamp(${a}, 0, 1)", json!(1), props(json!({"a": 5})));
    check("toUpperCase(${s})", json!("ABC"), props(json!({"s": "abc"})));
    check("substring('layerkit', 0, 5)", json!("layer"), json!({}));
    assert_eq!(check_err("nope(1)", json!({})), "Unknown function: nope");
}

// ----------------------------------------------------------------- Regex

#[test]
fn test_regexp() {
    check("${name} =~ regExp('^Os')", json!(true), props(json!({"name": "Oslo"})));
    check("${name} !~ regExp('^os', 'i')", json!(false), props(json!({"name": "Oslo"})));
    check("regExp('l(o)').exec(${name})", json!("o"), props(json!({"name": "Oslo"})));
    check("regExp('a').test('cat')", json!(true), json!({}));
    check("regExp('a', 'i').toString()", json!("/a/i"), json!({}));
    assert!(check_err("regExp('(')", json!({})).starts_with("Invalid regular expression"));
}

// ----------------------------------------------------------------- Colors

#[test]
fn test_color_literals() {
    check("color('red')", json!("#FF0000"), json!({}));
    check("rgba(255, 0, 0, 1)", json!("#FF0000"), json!({}));
    check("rgb(0, 128, 255)", json!("#0080FF"), json!({}));
    check("color()", json!("#FFFFFF"), json!({}));
    check("color('#00ff00', 0.5)", json!("#00FF0080"), json!({}));
    check("color('rgba(0, 0, 255, 0.5)')", json!("#0000FF80"), json!({}));
    check("hsl(0, 1, 0.5)", json!("#FF0000"), json!({}));
    check("hsla(0.5, 1, 0.5, 0)", json!("#00FFFF00"), json!({}));
    check("color(${c})", json!("#FFA500"), props(json!({"c": "orange"})));
    assert_eq!(check_err("color('nope')", json!({})), "Invalid color: nope");
}

// ----------------------------------------------------------------- Conditions

#[test]
fn test_conditional_first_match() {
    let conditions = ConditionalExpression::new(vec![
        ("${x} > 10".into(), "'big'".into()),
        ("true".into(), "'small'".into()),
    ]);
    let cache = ExpressionCache::new();
    let defines = Defines::new();
    let big = props(json!({"x": 20}));
    let small = props(json!({"x": 5}));
    assert_eq!(
        conditions.evaluate(Some(&big), &defines, &cache),
        Ok(Some(Value::from("big")))
    );
    assert_eq!(
        conditions.evaluate(Some(&small), &defines, &cache),
        Ok(Some(Value::from("small")))
    );
}

#[test]
fn test_bare_value_names_resolve_to_strings() {
    let conditions = ConditionalExpression::new(vec![
        ("${pop} > 1000000".into(), "red".into()),
        ("true".into(), "blue".into()),
    ]);
    let cache = ExpressionCache::new();
    let f = props(json!({"pop": 500}));
    assert_eq!(
        conditions.evaluate(Some(&f), &Defines::new(), &cache),
        Ok(Some(Value::from("blue")))
    );
}

#[test]
fn test_defines() {
    let cache = ExpressionCache::new();
    let mut defines = Defines::new();
    defines.insert("threshold".into(), "${base} * 10".into());
    let f = props(json!({"base": 2, "v": 25}));
    assert_eq!(
        evaluate_expression("${v} > ${threshold}", Some(&f), &defines, &cache),
        Ok(Value::Bool(true))
    );
}

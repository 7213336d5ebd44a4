use serde_json::Value;

/// Performs a deep equality check between two JSON values.
///
/// Numbers are compared by numeric value, so `1` and `1.0` are equal even
/// though `serde_json` stores them with different representations.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use layerkit_util::json_equal::deep_equal;
///
/// let a = json!({"foo": [1, 2, 3]});
/// let b = json!({"foo": [1.0, 2, 3]});
/// let c = json!({"foo": [1, 2, 4]});
///
/// assert!(deep_equal(&a, &b));
/// assert!(!deep_equal(&a, &c));
/// ```
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    deep_equal_ignoring(a, b, &[])
}

/// Deep equality that skips the listed object keys at every nesting level.
///
/// Used to compare documents whose identifiers are regenerated on every
/// load, e.g. two GeoJSON payloads that differ only in feature `id`s.
///
/// ```
/// use serde_json::json;
/// use layerkit_util::json_equal::deep_equal_ignoring;
///
/// let a = json!({"id": "a", "properties": {"pop": 1}});
/// let b = json!({"id": "b", "properties": {"pop": 1}});
///
/// assert!(deep_equal_ignoring(&a, &b, &["id"]));
/// ```
pub fn deep_equal_ignoring(a: &Value, b: &Value, ignored: &[&str]) -> bool {
    let kept = |key: &&String| !ignored.contains(&key.as_str());
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| deep_equal_ignoring(x, y, ignored))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.keys().filter(kept).count() == ys.keys().filter(kept).count()
                && xs.iter().filter(|(k, _)| kept(k)).all(|(k, x)| {
                    ys.get(k)
                        .is_some_and(|y| deep_equal_ignoring(x, y, ignored))
                })
        }
        // Remaining scalars, and values of different types.
        _ => a == b,
    }
}

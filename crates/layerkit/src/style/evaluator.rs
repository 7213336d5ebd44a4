use super::StyleValue;
use crate::model::{Appearance, Appearances, Feature, Layer};
use layerkit_expression::{evaluate_expression, Defines, ExpressionCache, FeatureContext, Value};
use serde_json::Map;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves appearance fields against an optional feature.
///
/// Literal fields pass through unchanged. Expression fields are compiled
/// through the shared [`ExpressionCache`]; a field whose expression fails,
/// evaluates to `undefined`, or matches no condition is left out of the
/// result. Declared categories are always kept, even when empty.
#[derive(Debug, Clone)]
pub struct StyleEvaluator {
    cache: Arc<ExpressionCache>,
    defines: Defines,
}

impl StyleEvaluator {
    pub fn new(cache: Arc<ExpressionCache>, defines: Defines) -> Self {
        Self { cache, defines }
    }

    pub fn cache(&self) -> &Arc<ExpressionCache> {
        &self.cache
    }

    pub fn defines(&self) -> &Defines {
        &self.defines
    }

    /// Evaluates the layer's declared appearances. Group layers have none.
    pub fn evaluate_layer(&self, layer: &Layer, feature: Option<&Feature>) -> Appearances {
        layer
            .appearances()
            .map(|a| self.evaluate(a, feature))
            .unwrap_or_default()
    }

    pub fn evaluate(&self, appearances: &Appearances, feature: Option<&Feature>) -> Appearances {
        let mut out = Appearances::default();
        for (category, fields) in appearances.iter() {
            let mut resolved = Appearance::new();
            for (field, raw) in fields {
                match self.evaluate_field(raw, feature) {
                    Ok(Some(value)) => {
                        resolved.insert(field.clone(), value);
                    }
                    Ok(None) => {}
                    Err(e) => match feature {
                        Some(f) => warn!(
                            feature = %f.id,
                            category = %category,
                            field = %field,
                            error = %e,
                            "appearance expression failed"
                        ),
                        None => debug!(
                            category = %category,
                            field = %field,
                            error = %e,
                            "layer-level appearance expression failed"
                        ),
                    },
                }
            }
            out.set(category, Some(resolved));
        }
        out
    }

    fn evaluate_field(
        &self,
        raw: &serde_json::Value,
        feature: Option<&Feature>,
    ) -> Result<Option<serde_json::Value>, layerkit_expression::ExpressionError> {
        let context = feature.map(|f| f as &dyn FeatureContext);
        let value = match StyleValue::classify(raw) {
            StyleValue::Literal(v) => return Ok(Some(v)),
            StyleValue::Expression(text) => {
                evaluate_expression(&text, context, &self.defines, &self.cache)?
            }
            StyleValue::Conditions(conditions) => {
                match conditions.evaluate(context, &self.defines, &self.cache)? {
                    Some(v) => v,
                    None => Value::Undefined,
                }
            }
        };
        Ok(value.into_json())
    }
}

/// Field-level merge: every field in `overrides` replaces the same field in
/// `appearances`. Categories present only in `overrides` are added.
pub fn merge_overrides(appearances: &Appearances, overrides: &Appearances) -> Appearances {
    let mut out = appearances.clone();
    for (category, fields) in overrides.iter() {
        let mut merged = out.get(category).cloned().unwrap_or_else(Map::new);
        for (field, value) in fields {
            merged.insert(field.clone(), value.clone());
        }
        out.set(category, Some(merged));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppearanceCategory, SimpleLayer};
    use serde_json::json;

    fn evaluator() -> StyleEvaluator {
        StyleEvaluator::new(Arc::new(ExpressionCache::new()), Defines::new())
    }

    fn marker(fields: serde_json::Value) -> Appearances {
        let mut a = Appearances::default();
        a.set(AppearanceCategory::Marker, fields.as_object().cloned());
        a
    }

    #[test]
    fn test_literals_and_expressions() {
        let appearances = marker(json!({
            "pointSize": 10,
            "pointColor": {"expression": "${pop} > 1000000 ? color('red') : color('blue')"},
            "label": {"expression": "'pop: ' + ${pop}"}
        }));
        let feature = Feature::new("a").with_properties(json!({"pop": 2000000}));
        let out = evaluator().evaluate(&appearances, Some(&feature));
        let m = out.get(AppearanceCategory::Marker).unwrap();
        assert_eq!(m["pointSize"], 10);
        assert_eq!(m["pointColor"], "#FF0000");
        assert_eq!(m["label"], "pop: 2000000");
    }

    #[test]
    fn test_conditions_first_match_wins() {
        let appearances = marker(json!({
            "pointColor": {"expression": {"conditions": [
                ["${pop} > 1000", "'big'"],
                ["true", "'small'"]
            ]}},
            "show": {"conditions": [["${pop} > 1000000000", "true"]]}
        }));
        let feature = Feature::new("a").with_properties(json!({"pop": 500}));
        let out = evaluator().evaluate(&appearances, Some(&feature));
        let m = out.get(AppearanceCategory::Marker).unwrap();
        assert_eq!(m["pointColor"], "small");
        assert!(!m.contains_key("show"));
    }

    #[test]
    fn test_failing_field_is_omitted() {
        let appearances = marker(json!({
            "bad": {"expression": "1 &&"},
            "typed": {"expression": "1 && true"},
            "good": {"expression": "1 + 1"}
        }));
        let out = evaluator().evaluate(&appearances, None);
        let m = out.get(AppearanceCategory::Marker).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m["good"], 2);
    }

    #[test]
    fn test_declared_empty_category_is_kept() {
        let layer: Layer = SimpleLayer::new("l")
            .with_appearance(AppearanceCategory::Polygon, json!({}))
            .into();
        let out = evaluator().evaluate_layer(&layer, None);
        assert_eq!(out.get(AppearanceCategory::Polygon), Some(&Map::new()));
        assert!(out.get(AppearanceCategory::Marker).is_none());
    }

    #[test]
    fn test_merge_overrides() {
        let base = marker(json!({"pointColor": "red", "pointSize": 4}));
        let mut overrides = marker(json!({"pointColor": "green"}));
        overrides.set(
            AppearanceCategory::Polyline,
            json!({"strokeWidth": 2}).as_object().cloned(),
        );
        let merged = merge_overrides(&base, &overrides);
        let m = merged.get(AppearanceCategory::Marker).unwrap();
        assert_eq!(m["pointColor"], "green");
        assert_eq!(m["pointSize"], 4);
        assert_eq!(
            merged.get(AppearanceCategory::Polyline).unwrap()["strokeWidth"],
            2
        );
    }
}

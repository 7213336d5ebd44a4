use layerkit_expression::ConditionalExpression;
use serde::Deserialize;
use serde_json::Value;

/// How an appearance field is written in layer JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// Any JSON value that is not an expression container. Passed through.
    Literal(Value),
    /// `{ "expression": "<text>" }`
    Expression(String),
    /// `{ "expression": { "conditions": [...] } }` or `{ "conditions": [...] }`
    Conditions(ConditionalExpression),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Container {
    Text { expression: String },
    Nested { expression: ConditionalExpression },
    Bare { conditions: Vec<(String, String)> },
}

impl StyleValue {
    /// Classifies a field value. Objects that look like containers but do
    /// not deserialize as one are treated as literals.
    pub fn classify(value: &Value) -> StyleValue {
        let Value::Object(obj) = value else {
            return StyleValue::Literal(value.clone());
        };
        if obj.len() != 1 || !(obj.contains_key("expression") || obj.contains_key("conditions")) {
            return StyleValue::Literal(value.clone());
        }
        match Container::deserialize(value) {
            Ok(Container::Text { expression }) => StyleValue::Expression(expression),
            Ok(Container::Nested { expression }) => StyleValue::Conditions(expression),
            Ok(Container::Bare { conditions }) => {
                StyleValue::Conditions(ConditionalExpression::new(conditions))
            }
            Err(_) => StyleValue::Literal(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify() {
        assert_eq!(
            StyleValue::classify(&json!("red")),
            StyleValue::Literal(json!("red"))
        );
        assert_eq!(
            StyleValue::classify(&json!({"expression": "color('red')"})),
            StyleValue::Expression("color('red')".into())
        );
        let conditions = ConditionalExpression::new(vec![("true".into(), "1".into())]);
        assert_eq!(
            StyleValue::classify(&json!({"expression": {"conditions": [["true", "1"]]}})),
            StyleValue::Conditions(conditions.clone())
        );
        assert_eq!(
            StyleValue::classify(&json!({"conditions": [["true", "1"]]})),
            StyleValue::Conditions(conditions)
        );
    }

    #[test]
    fn test_lookalikes_are_literals() {
        for value in [
            json!({"expression": 3}),
            json!({"expression": "x", "other": 1}),
            json!({"conditions": "nope"}),
            json!({"x": 1, "y": 2}),
        ] {
            assert_eq!(StyleValue::classify(&value), StyleValue::Literal(value));
        }
    }
}

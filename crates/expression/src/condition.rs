use crate::cache::ExpressionCache;
use crate::error::ExpressionError;
use crate::expression::evaluate_expression;
use crate::feature::FeatureContext;
use crate::replace::Defines;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Ordered `(condition, value)` expression pairs, evaluated first match wins.
///
/// Serialized as `{ "conditions": [["${pop} > 10", "'big'"], ...] }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalExpression {
    pub conditions: Vec<(String, String)>,
}

impl ConditionalExpression {
    pub fn new(conditions: Vec<(String, String)>) -> Self {
        Self { conditions }
    }

    /// Returns the value of the first condition that evaluates to `true`,
    /// or `None` when no condition matches.
    pub fn evaluate(
        &self,
        feature: Option<&dyn FeatureContext>,
        defines: &Defines,
        cache: &ExpressionCache,
    ) -> Result<Option<Value>, ExpressionError> {
        for (condition, value) in &self.conditions {
            if evaluate_expression(condition, feature, defines, cache)? == Value::Bool(true) {
                return evaluate_expression(value, feature, defines, cache).map(Some);
            }
        }
        Ok(None)
    }
}

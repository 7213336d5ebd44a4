use crate::cache::ExpressionCache;
use crate::error::ExpressionError;
use crate::feature::FeatureContext;
use crate::node::{lower, Literals, Node};
use crate::parser::parse;
use crate::replace::Defines;
use crate::value::Value;

/// A parsed and lowered expression, ready to evaluate against any feature.
#[derive(Debug)]
pub struct CompiledExpression {
    source: String,
    root: Node,
}

impl CompiledExpression {
    /// Parses already-substituted text. `literals` names the values spliced
    /// in during substitution.
    pub fn compile(source: &str, literals: Literals) -> Result<Self, ExpressionError> {
        let ast = parse(source)?;
        let root = lower(&ast, &literals)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// The substituted text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, feature: Option<&dyn FeatureContext>) -> Result<Value, ExpressionError> {
        self.root.evaluate(feature)
    }
}

/// Raw expression text together with the defines it is compiled with.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    raw: String,
    defines: Defines,
}

impl Expression {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            defines: Defines::new(),
        }
    }

    pub fn with_defines(mut self, defines: Defines) -> Self {
        self.defines = defines;
        self
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn evaluate(
        &self,
        feature: Option<&dyn FeatureContext>,
        cache: &ExpressionCache,
    ) -> Result<Value, ExpressionError> {
        cache.compile(&self.raw, feature, &self.defines)?.evaluate(feature)
    }

    /// Forces the next evaluation against `feature` to recompile.
    pub fn clear_cache(&self, feature: Option<&dyn FeatureContext>, cache: &ExpressionCache) -> bool {
        cache.clear_expression(&self.raw, feature, &self.defines)
    }
}

/// Evaluates raw expression text through `cache`.
pub fn evaluate_expression(
    raw: &str,
    feature: Option<&dyn FeatureContext>,
    defines: &Defines,
    cache: &ExpressionCache,
) -> Result<Value, ExpressionError> {
    cache.compile(raw, feature, defines)?.evaluate(feature)
}

/// Evicts the compiled form of `raw` for this feature and defines.
pub fn clear_expression_caches(
    raw: &str,
    feature: Option<&dyn FeatureContext>,
    defines: &Defines,
    cache: &ExpressionCache,
) -> bool {
    cache.clear_expression(raw, feature, defines)
}

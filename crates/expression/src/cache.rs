//! Compiled-expression cache keyed by substituted expression text.

use crate::error::ExpressionError;
use crate::expression::CompiledExpression;
use crate::feature::FeatureContext;
use crate::replace::{replace_defines, replace_variables, Defines, Substitution};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared store of compiled expressions.
///
/// Two raw expressions that substitute to the same text share one entry.
/// Failed compilations are not stored, so a broken expression is parsed
/// again on every use.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    compiled: RwLock<HashMap<String, Arc<CompiledExpression>>>,
    compiles: AtomicUsize,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the substitution passes and returns the cached compilation of
    /// the result, compiling it on a miss.
    pub fn compile(
        &self,
        raw: &str,
        feature: Option<&dyn FeatureContext>,
        defines: &Defines,
    ) -> Result<Arc<CompiledExpression>, ExpressionError> {
        let substitution = substitute(raw, feature, defines);
        if let Some(hit) = self.compiled.read().get(&substitution.expression) {
            return Ok(Arc::clone(hit));
        }
        self.compiles.fetch_add(1, Ordering::Relaxed);
        let compiled = Arc::new(CompiledExpression::compile(
            &substitution.expression,
            substitution.literals.into_iter().collect(),
        )?);
        tracing::trace!(expression = compiled.source(), "compiled expression");
        self.compiled
            .write()
            .insert(substitution.expression, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Evicts the entry `raw` compiles to for this feature and defines.
    /// Returns whether an entry was removed.
    pub fn clear_expression(
        &self,
        raw: &str,
        feature: Option<&dyn FeatureContext>,
        defines: &Defines,
    ) -> bool {
        let key = substitute(raw, feature, defines).expression;
        self.compiled.write().remove(&key).is_some()
    }

    /// Number of compilations performed, including failed ones.
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }

    pub fn clear(&self) {
        self.compiled.write().clear();
    }
}

fn substitute(raw: &str, feature: Option<&dyn FeatureContext>, defines: &Defines) -> Substitution {
    replace_variables(&replace_defines(raw, defines), feature)
}

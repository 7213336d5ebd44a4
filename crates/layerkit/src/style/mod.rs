//! Style evaluation: resolves every declared appearance field of a layer,
//! once at layer level and once per feature.

mod evaluator;
mod value;

pub use evaluator::{merge_overrides, StyleEvaluator};
pub use value::StyleValue;

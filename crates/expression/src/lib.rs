//! layerkit-expression - the style expression language.
//!
//! Expressions are short pieces of text evaluated once per feature, such as
//! `${pop} > 1000000 ? color('red') : rgba(0, 0, 255, 0.5)`. Compilation
//! runs in stages:
//!
//! 1. `${define}` placeholders are expanded from a [`Defines`] map.
//! 2. `${name}` and `${$.json.path}` references are rewritten
//!    ([`replace_variables`]); JSONPath references are resolved against the
//!    feature document and spliced in as literals.
//! 3. The rewritten text is looked up in an [`ExpressionCache`]; on a miss
//!    it is tokenized, parsed and lowered to an evaluator tree.
//!
//! Evaluation is a tree walk over a [`FeatureContext`] and yields a
//! [`Value`]. Operators are type checked: `&&`, `||`, `!` and the ternary
//! test need booleans, arithmetic other than string concatenation needs
//! numbers. Color functions evaluate to uppercase CSS hex strings.
//!
//! ```
//! use layerkit_expression::{evaluate_expression, Defines, ExpressionCache, Value};
//! use serde_json::json;
//!
//! let cache = ExpressionCache::new();
//! let feature = json!({"id": "a", "properties": {"pop": 2000000}});
//! let v = evaluate_expression(
//!     "${pop} > 1000000 ? color('red') : color('blue')",
//!     Some(&feature),
//!     &Defines::new(),
//!     &cache,
//! )
//! .unwrap();
//! assert_eq!(v, Value::from("#FF0000"));
//! ```

pub mod ast;
pub mod cache;
pub mod color;
pub mod condition;
pub mod error;
pub mod expression;
pub mod feature;
pub mod functions;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod replace;
pub mod value;

pub use cache::ExpressionCache;
pub use color::{parse_css_color, Rgba};
pub use condition::ConditionalExpression;
pub use error::ExpressionError;
pub use expression::{clear_expression_caches, evaluate_expression, CompiledExpression, Expression};
pub use feature::FeatureContext;
pub use replace::{replace_defines, replace_variables, Defines, Substitution};
pub use value::Value;

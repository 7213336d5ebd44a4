//! Built-in named functions, grouped by arity.

use crate::error::ExpressionError;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Evaluates a function over already-evaluated arguments.
pub type EvalFn = fn(&[Value]) -> Result<Value, ExpressionError>;

#[derive(Debug)]
pub struct FunctionDefinition {
    pub name: &'static str,
    pub arity: usize,
    pub eval_fn: EvalFn,
}

impl FunctionDefinition {
    pub fn call(&self, args: &[Value]) -> Result<Value, ExpressionError> {
        (self.eval_fn)(args)
    }
}

pub type FunctionMap = HashMap<&'static str, &'static FunctionDefinition>;

/// Builds a lookup map from function definitions.
pub fn functions_to_map(tables: &[&'static [FunctionDefinition]]) -> FunctionMap {
    let mut map = HashMap::new();
    for table in tables {
        for def in table.iter() {
            map.insert(def.name, def);
        }
    }
    map
}

/// Every built-in function by name.
pub fn functions_map() -> &'static FunctionMap {
    static MAP: OnceLock<FunctionMap> = OnceLock::new();
    MAP.get_or_init(|| functions_to_map(&[UNARY_FUNCTIONS, BINARY_FUNCTIONS, TERNARY_FUNCTIONS]))
}

fn num(name: &str, v: &Value) -> Result<f64, ExpressionError> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(ExpressionError::OperandType {
            op: name.to_string(),
            expected: "a number",
            found: other.type_name(),
        }),
    }
}

fn string<'a>(name: &str, v: &'a Value) -> Result<&'a str, ExpressionError> {
    match v {
        Value::String(s) => Ok(s),
        other => Err(ExpressionError::OperandType {
            op: name.to_string(),
            expected: "a string",
            found: other.type_name(),
        }),
    }
}

macro_rules! math1 {
    ($name:literal, $f:expr) => {
        FunctionDefinition {
            name: $name,
            arity: 1,
            eval_fn: |args| {
                let f: fn(f64) -> f64 = $f;
                Ok(Value::Number(f(num($name, &args[0])?)))
            },
        }
    };
}

macro_rules! math2 {
    ($name:literal, $f:expr) => {
        FunctionDefinition {
            name: $name,
            arity: 2,
            eval_fn: |args| {
                let f: fn(f64, f64) -> f64 = $f;
                Ok(Value::Number(f(num($name, &args[0])?, num($name, &args[1])?)))
            },
        }
    };
}

/// `Math.round`: halves round towards positive infinity.
fn js_round(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn js_sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn length_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    match &args[0] {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(items) => Ok(Value::Number(items.len() as f64)),
        other => Err(ExpressionError::OperandType {
            op: "length".into(),
            expected: "a string or an array",
            found: other.type_name(),
        }),
    }
}

fn to_upper_case_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    Ok(Value::String(string("toUpperCase", &args[0])?.to_uppercase()))
}

fn to_lower_case_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    Ok(Value::String(string("toLowerCase", &args[0])?.to_lowercase()))
}

fn trim_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    Ok(Value::String(string("trim", &args[0])?.trim().to_string()))
}

pub static UNARY_FUNCTIONS: &[FunctionDefinition] = &[
    math1!("abs", f64::abs),
    math1!("sqrt", f64::sqrt),
    math1!("cos", f64::cos),
    math1!("sin", f64::sin),
    math1!("tan", f64::tan),
    math1!("acos", f64::acos),
    math1!("asin", f64::asin),
    math1!("atan", f64::atan),
    math1!("radians", f64::to_radians),
    math1!("degrees", f64::to_degrees),
    math1!("sign", js_sign),
    math1!("floor", f64::floor),
    math1!("ceil", f64::ceil),
    math1!("round", js_round),
    math1!("exp", f64::exp),
    math1!("exp2", f64::exp2),
    math1!("log", f64::ln),
    math1!("log2", f64::log2),
    math1!("fract", |x| x - x.floor()),
    FunctionDefinition {
        name: "length",
        arity: 1,
        eval_fn: length_eval,
    },
    FunctionDefinition {
        name: "toUpperCase",
        arity: 1,
        eval_fn: to_upper_case_eval,
    },
    FunctionDefinition {
        name: "toLowerCase",
        arity: 1,
        eval_fn: to_lower_case_eval,
    },
    FunctionDefinition {
        name: "trim",
        arity: 1,
        eval_fn: trim_eval,
    },
];

fn starts_with_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    let s = string("startsWith", &args[0])?;
    Ok(Value::Bool(s.starts_with(string("startsWith", &args[1])?)))
}

fn ends_with_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    let s = string("endsWith", &args[0])?;
    Ok(Value::Bool(s.ends_with(string("endsWith", &args[1])?)))
}

/// `includes(haystack, needle)` over strings, or membership in an array.
fn includes_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    match &args[0] {
        Value::Array(items) => Ok(Value::Bool(items.contains(&args[1]))),
        other => {
            let s = string("includes", other)?;
            Ok(Value::Bool(s.contains(string("includes", &args[1])?)))
        }
    }
}

pub static BINARY_FUNCTIONS: &[FunctionDefinition] = &[
    math2!("atan2", f64::atan2),
    math2!("pow", f64::powf),
    math2!("min", f64::min),
    math2!("max", f64::max),
    FunctionDefinition {
        name: "startsWith",
        arity: 2,
        eval_fn: starts_with_eval,
    },
    FunctionDefinition {
        name: "endsWith",
        arity: 2,
        eval_fn: ends_with_eval,
    },
    FunctionDefinition {
        name: "includes",
        arity: 2,
        eval_fn: includes_eval,
    },
];

fn clamp_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    let x = num("clamp", &args[0])?;
    let lo = num("clamp", &args[1])?;
    let hi = num("clamp", &args[2])?;
    Ok(Value::Number(x.max(lo).min(hi)))
}

fn mix_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    let x = num("mix", &args[0])?;
    let y = num("mix", &args[1])?;
    let a = num("mix", &args[2])?;
    Ok(Value::Number(x * (1.0 - a) + y * a))
}

/// `String.prototype.substring`: indices are clamped and swapped if reversed.
fn substring_eval(args: &[Value]) -> Result<Value, ExpressionError> {
    let s = string("substring", &args[0])?;
    let len = s.chars().count();
    let index = |v: &Value| -> Result<usize, ExpressionError> {
        let n = num("substring", v)?;
        Ok(if n.is_nan() || n < 0.0 {
            0
        } else {
            (n.trunc() as usize).min(len)
        })
    };
    let (mut start, mut end) = (index(&args[1])?, index(&args[2])?);
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    Ok(Value::String(s.chars().skip(start).take(end - start).collect()))
}

pub static TERNARY_FUNCTIONS: &[FunctionDefinition] = &[
    FunctionDefinition {
        name: "clamp",
        arity: 3,
        eval_fn: clamp_eval,
    },
    FunctionDefinition {
        name: "mix",
        arity: 3,
        eval_fn: mix_eval,
    },
    FunctionDefinition {
        name: "substring",
        arity: 3,
        eval_fn: substring_eval,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    fn call(name: &str, args: &[Value]) -> Result<Value, ExpressionError> {
        functions_map()
            .get(name)
            .unwrap_or_else(|| panic!("missing {name}"))
            .call(args)
    }

    #[test]
    fn test_every_table_entry_is_reachable() {
        let total = UNARY_FUNCTIONS.len() + BINARY_FUNCTIONS.len() + TERNARY_FUNCTIONS.len();
        assert_eq!(functions_map().len(), total);
    }

    #[test]
    fn test_math() {
        assert_eq!(call("abs", &[n(-2.0)]), Ok(n(2.0)));
        assert_eq!(call("round", &[n(-2.5)]), Ok(n(-2.0)));
        assert_eq!(call("round", &[n(2.5)]), Ok(n(3.0)));
        assert_eq!(call("sign", &[n(-7.0)]), Ok(n(-1.0)));
        assert_eq!(call("fract", &[n(1.25)]), Ok(n(0.25)));
        assert_eq!(call("pow", &[n(2.0), n(10.0)]), Ok(n(1024.0)));
        assert_eq!(
            call("clamp", &[n(5.0), n(0.0), n(1.0)]),
            Ok(n(1.0))
        );
        assert_eq!(
            call("mix", &[n(0.0), n(10.0), n(0.25)]),
            Ok(n(2.5))
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(call("toUpperCase", &[Value::from("abc")]), Ok(Value::from("ABC")));
        assert_eq!(call("trim", &[Value::from("  x ")]), Ok(Value::from("x")));
        assert_eq!(call("length", &[Value::from("héllo")]), Ok(n(5.0)));
        assert_eq!(
            call("startsWith", &[Value::from("layer-1"), Value::from("layer")]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            call("substring", &[Value::from("abcdef"), n(4.0), n(1.0)]),
            Ok(Value::from("bcd"))
        );
        assert_eq!(
            call(
                "includes",
                &[Value::Array(vec![Value::from("a"), Value::from("b")]), Value::from("b")]
            ),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_type_errors_name_the_function() {
        assert_eq!(
            call("sqrt", &[Value::from("4")]),
            Err(ExpressionError::OperandType {
                op: "sqrt".into(),
                expected: "a number",
                found: "string",
            })
        );
    }
}

//! Evaluator tree.
//!
//! [`lower`] turns a parsed [`Expr`] into a [`Node`] tree with identifiers
//! resolved, functions bound to their definitions and string interpolation
//! split into parts. Evaluating a node is a plain tree walk.

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::color::{parse_css_color, Rgba, WHITE};
use crate::error::ExpressionError;
use crate::feature::FeatureContext;
use crate::functions::{functions_map, FunctionDefinition};
use crate::replace::decode_property_identifier;
use crate::value::{RegExpValue, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    IsNaN,
    IsFinite,
    Boolean,
    Number,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFunction {
    Color,
    Rgb,
    Rgba,
    Hsl,
    Hsla,
}

impl ColorFunction {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "color" => ColorFunction::Color,
            "rgb" => ColorFunction::Rgb,
            "rgba" => ColorFunction::Rgba,
            "hsl" => ColorFunction::Hsl,
            "hsla" => ColorFunction::Hsla,
            _ => return None,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            ColorFunction::Color => "color",
            ColorFunction::Rgb => "rgb",
            ColorFunction::Rgba => "rgba",
            ColorFunction::Hsl => "hsl",
            ColorFunction::Hsla => "hsla",
        }
    }

    fn arity(&self) -> (usize, usize, &'static str) {
        match self {
            ColorFunction::Color => (0, 2, "0 to 2"),
            ColorFunction::Rgb | ColorFunction::Hsl => (3, 3, "3"),
            ColorFunction::Rgba | ColorFunction::Hsla => (4, 4, "4"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Test,
    Exec,
    ToString,
}

#[derive(Debug, Clone)]
pub enum TemplatePart {
    Text(String),
    Property(String),
}

#[derive(Debug, Clone)]
pub enum Node {
    Literal(Value),
    /// `${name}` or `feature.name`: `undefined` when missing.
    Property(String),
    /// A bare identifier: the property value, or the name itself when the
    /// feature has no such property.
    Symbol(String),
    FeatureId,
    FeatureProperties,
    Template(Vec<TemplatePart>),
    Array(Vec<Node>),
    Unary(UnaryOp, Box<Node>),
    Conversion(Conversion, Box<Node>),
    Function(&'static FunctionDefinition, Vec<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Logical(LogicalOp, Box<Node>, Box<Node>),
    Conditional(Box<Node>, Box<Node>, Box<Node>),
    Member(Box<Node>, Box<Node>),
    Color(ColorFunction, Vec<Node>),
    RegExp(Vec<Node>),
    Method(Box<Node>, Method, Vec<Node>),
}

/// Named literals spliced in by `${$.path}` substitution.
pub type Literals = HashMap<String, serde_json::Value>;

fn keyword(name: &str) -> Option<Value> {
    Some(match name {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        "undefined" => Value::Undefined,
        "NaN" => Value::Number(f64::NAN),
        "Infinity" => Value::Number(f64::INFINITY),
        "PI" => Value::Number(std::f64::consts::PI),
        "E" => Value::Number(std::f64::consts::E),
        _ => return None,
    })
}

fn check_arity(
    name: &str,
    args: &[Expr],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), ExpressionError> {
    if args.len() < min || args.len() > max {
        return Err(ExpressionError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

pub fn lower(expr: &Expr, literals: &Literals) -> Result<Node, ExpressionError> {
    Ok(match expr {
        Expr::Number(n) => Node::Literal(Value::Number(*n)),
        Expr::String(s) => lower_string(s),
        Expr::Identifier(name) => lower_identifier(name, literals),
        Expr::Array(items) => Node::Array(lower_all(items, literals)?),
        Expr::Unary { op, argument } => Node::Unary(*op, Box::new(lower(argument, literals)?)),
        Expr::Binary { op, left, right } => Node::Binary(
            *op,
            Box::new(lower(left, literals)?),
            Box::new(lower(right, literals)?),
        ),
        Expr::Logical { op, left, right } => Node::Logical(
            *op,
            Box::new(lower(left, literals)?),
            Box::new(lower(right, literals)?),
        ),
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => Node::Conditional(
            Box::new(lower(test, literals)?),
            Box::new(lower(consequent, literals)?),
            Box::new(lower(alternate, literals)?),
        ),
        Expr::Member {
            object,
            property,
            computed,
        } => lower_member(object, property, *computed, literals)?,
        Expr::Call { callee, arguments } => lower_call(callee, arguments, literals)?,
    })
}

fn lower_all(items: &[Expr], literals: &Literals) -> Result<Vec<Node>, ExpressionError> {
    items.iter().map(|e| lower(e, literals)).collect()
}

fn lower_identifier(name: &str, literals: &Literals) -> Node {
    if let Some(value) = literals.get(name) {
        return Node::Literal(Value::from_json(value));
    }
    if let Some(property) = decode_property_identifier(name) {
        return Node::Property(property);
    }
    if let Some(value) = keyword(name) {
        return Node::Literal(value);
    }
    match name {
        "id" => Node::FeatureId,
        "feature" => Node::FeatureProperties,
        _ => Node::Symbol(name.to_string()),
    }
}

/// Splits `'a ${b} c'` into text and property parts.
fn lower_string(s: &str) -> Node {
    if !s.contains("${") {
        return Node::Literal(Value::String(s.to_string()));
    }
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        if start > 0 {
            parts.push(TemplatePart::Text(rest[..start].to_string()));
        }
        let name = rest[start + 2..start + len].trim();
        parts.push(TemplatePart::Property(name.to_string()));
        rest = &rest[start + len + 1..];
    }
    if !rest.is_empty() {
        parts.push(TemplatePart::Text(rest.to_string()));
    }
    Node::Template(parts)
}

fn lower_member(
    object: &Expr,
    property: &Expr,
    computed: bool,
    literals: &Literals,
) -> Result<Node, ExpressionError> {
    let object = lower(object, literals)?;
    if let (Node::FeatureProperties, Expr::String(name)) = (&object, property) {
        if !computed || !name.contains("${") {
            return Ok(Node::Property(name.clone()));
        }
    }
    let property = if computed {
        lower(property, literals)?
    } else {
        match property {
            Expr::String(name) => Node::Literal(Value::String(name.clone())),
            other => lower(other, literals)?,
        }
    };
    Ok(Node::Member(Box::new(object), Box::new(property)))
}

fn lower_call(
    callee: &Expr,
    arguments: &[Expr],
    literals: &Literals,
) -> Result<Node, ExpressionError> {
    match callee {
        Expr::Identifier(name) => lower_named_call(name, arguments, literals),
        Expr::Member {
            object,
            property,
            computed: false,
        } => {
            let Expr::String(name) = property.as_ref() else {
                return Err(ExpressionError::UnknownFunction("<member>".into()));
            };
            let (method, arity, expected) = match name.as_str() {
                "test" => (Method::Test, 1, "1"),
                "exec" => (Method::Exec, 1, "1"),
                "toString" => (Method::ToString, 0, "0"),
                _ => return Err(ExpressionError::UnknownFunction(name.clone())),
            };
            check_arity(name, arguments, arity, arity, expected)?;
            Ok(Node::Method(
                Box::new(lower(object, literals)?),
                method,
                lower_all(arguments, literals)?,
            ))
        }
        _ => Err(ExpressionError::UnknownFunction("<expression>".into())),
    }
}

fn lower_named_call(
    name: &str,
    arguments: &[Expr],
    literals: &Literals,
) -> Result<Node, ExpressionError> {
    let conversion = match name {
        "isNaN" => Some(Conversion::IsNaN),
        "isFinite" => Some(Conversion::IsFinite),
        "Boolean" => Some(Conversion::Boolean),
        "Number" => Some(Conversion::Number),
        "String" => Some(Conversion::String),
        _ => None,
    };
    if let Some(conversion) = conversion {
        check_arity(name, arguments, 1, 1, "1")?;
        return Ok(Node::Conversion(
            conversion,
            Box::new(lower(&arguments[0], literals)?),
        ));
    }
    if let Some(color) = ColorFunction::from_name(name) {
        let (min, max, expected) = color.arity();
        check_arity(name, arguments, min, max, expected)?;
        return Ok(Node::Color(color, lower_all(arguments, literals)?));
    }
    if name == "regExp" {
        check_arity(name, arguments, 1, 2, "1 or 2")?;
        let args = lower_all(arguments, literals)?;
        // Constant patterns compile once here instead of on every evaluation.
        if args.iter().all(|a| matches!(a, Node::Literal(_))) {
            return Ok(Node::Literal(build_regexp(&args, None)?));
        }
        return Ok(Node::RegExp(args));
    }
    let def = functions_map()
        .get(name)
        .copied()
        .ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))?;
    if arguments.len() != def.arity {
        return Err(ExpressionError::Arity {
            name: name.to_string(),
            expected: match def.arity {
                1 => "1",
                2 => "2",
                _ => "3",
            },
            got: arguments.len(),
        });
    }
    Ok(Node::Function(def, lower_all(arguments, literals)?))
}

fn build_regexp(
    args: &[Node],
    feature: Option<&dyn FeatureContext>,
) -> Result<Value, ExpressionError> {
    let pattern = args[0].evaluate(feature)?.to_js_string();
    let flags = match args.get(1) {
        Some(node) => node.evaluate(feature)?.to_js_string(),
        None => String::new(),
    };
    Ok(Value::RegExp(RegExpValue::new(&pattern, &flags)?))
}

fn property_value(feature: Option<&dyn FeatureContext>, name: &str) -> Option<Value> {
    feature
        .and_then(|f| f.property(name))
        .map(Value::from_json)
}

fn require_bool(op: &str, value: Value) -> Result<bool, ExpressionError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(ExpressionError::OperandType {
            op: op.to_string(),
            expected: "a boolean",
            found: other.type_name(),
        }),
    }
}

fn require_number(op: &str, value: &Value) -> Result<f64, ExpressionError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(ExpressionError::OperandType {
            op: op.to_string(),
            expected: "a number",
            found: other.type_name(),
        }),
    }
}

impl Node {
    /// Evaluates against a feature, or with no feature for layer-level
    /// values, in which case property references are `undefined`.
    pub fn evaluate(&self, feature: Option<&dyn FeatureContext>) -> Result<Value, ExpressionError> {
        match self {
            Node::Literal(value) => Ok(value.clone()),
            Node::Property(name) => Ok(property_value(feature, name).unwrap_or(Value::Undefined)),
            Node::Symbol(name) => {
                Ok(property_value(feature, name).unwrap_or_else(|| Value::String(name.clone())))
            }
            Node::FeatureId => Ok(feature
                .and_then(|f| f.id())
                .map(Value::from)
                .unwrap_or(Value::Undefined)),
            Node::FeatureProperties => Ok(feature
                .and_then(|f| f.properties())
                .map(|props| Value::Object(props.clone()))
                .unwrap_or(Value::Undefined)),
            Node::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Property(name) => {
                            if let Some(value) = property_value(feature, name) {
                                out.push_str(&value.to_js_string());
                            }
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Node::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|n| n.evaluate(feature))
                    .collect::<Result<_, _>>()?,
            )),
            Node::Unary(op, argument) => {
                let value = argument.evaluate(feature)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!require_bool("!", value)?)),
                    UnaryOp::Negate => Ok(Value::Number(-require_number("-", &value)?)),
                    UnaryOp::Plus => Ok(Value::Number(require_number("+", &value)?)),
                }
            }
            Node::Conversion(conversion, argument) => {
                let value = argument.evaluate(feature)?;
                Ok(match conversion {
                    Conversion::IsNaN => Value::Bool(value.to_number().is_nan()),
                    Conversion::IsFinite => Value::Bool(value.to_number().is_finite()),
                    Conversion::Boolean => Value::Bool(value.is_truthy()),
                    Conversion::Number => Value::Number(value.to_number()),
                    Conversion::String => Value::String(value.to_js_string()),
                })
            }
            Node::Function(def, args) => {
                let values = args
                    .iter()
                    .map(|n| n.evaluate(feature))
                    .collect::<Result<Vec<_>, _>>()?;
                def.call(&values)
            }
            Node::Binary(op, left, right) => {
                eval_binary(*op, left.evaluate(feature)?, right.evaluate(feature)?)
            }
            Node::Logical(op, left, right) => {
                let name = op.as_str();
                let left = require_bool(name, left.evaluate(feature)?)?;
                match (op, left) {
                    (LogicalOp::And, false) => Ok(Value::Bool(false)),
                    (LogicalOp::Or, true) => Ok(Value::Bool(true)),
                    _ => Ok(Value::Bool(require_bool(name, right.evaluate(feature)?)?)),
                }
            }
            Node::Conditional(test, consequent, alternate) => match test.evaluate(feature)? {
                Value::Bool(true) => consequent.evaluate(feature),
                Value::Bool(false) => alternate.evaluate(feature),
                other => Err(ExpressionError::NonBooleanTest(other.type_name())),
            },
            Node::Member(object, property) => {
                let object = object.evaluate(feature)?;
                let property = property.evaluate(feature)?;
                eval_member(object, property)
            }
            Node::Color(function, args) => eval_color(*function, args, feature),
            Node::RegExp(args) => build_regexp(args, feature),
            Node::Method(object, method, args) => {
                let object = object.evaluate(feature)?;
                let arg = match args.first() {
                    Some(node) => Some(node.evaluate(feature)?),
                    None => None,
                };
                eval_method(object, *method, arg)
            }
        }
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExpressionError> {
    let type_error = |left: &Value, right: &Value| ExpressionError::BinaryType {
        op: op.as_str(),
        left: left.type_name(),
        right: right.type_name(),
    };
    match op {
        BinaryOp::StrictEq => return Ok(Value::Bool(left == right)),
        BinaryOp::StrictNe => return Ok(Value::Bool(left != right)),
        BinaryOp::Match | BinaryOp::NotMatch => {
            let matched = match (&left, &right) {
                (Value::String(s), Value::RegExp(re)) | (Value::RegExp(re), Value::String(s)) => {
                    re.is_match(s)
                }
                _ => return Err(type_error(&left, &right)),
            };
            return Ok(Value::Bool(matched == (op == BinaryOp::Match)));
        }
        _ => {}
    }
    if op == BinaryOp::Add {
        match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => return Ok(Value::Number(a + b)),
            (Value::String(_), _) | (_, Value::String(_)) => {
                return Ok(Value::String(left.to_js_string() + &right.to_js_string()))
            }
            _ => return Err(type_error(&left, &right)),
        }
    }
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        let ordering = match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::Ge => a >= b,
            _ => return Err(type_error(&left, &right)),
        };
        return Ok(Value::Bool(ordering));
    }
    let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
        return Err(type_error(&left, &right));
    };
    let (a, b) = (*a, *b);
    Ok(match op {
        BinaryOp::Sub => Value::Number(a - b),
        BinaryOp::Mul => Value::Number(a * b),
        BinaryOp::Div => Value::Number(a / b),
        BinaryOp::Rem => Value::Number(a % b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Le => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Ge => Value::Bool(a >= b),
        _ => return Err(type_error(&left, &right)),
    })
}

fn eval_member(object: Value, property: Value) -> Result<Value, ExpressionError> {
    let index = |len: usize| match &property {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && (*n as usize) < len => {
            Some(*n as usize)
        }
        _ => None,
    };
    Ok(match &object {
        Value::Undefined | Value::Null => {
            return Err(ExpressionError::InvalidMember(object.type_name()))
        }
        Value::Object(map) => map
            .get(&property.to_js_string())
            .map(Value::from_json)
            .unwrap_or(Value::Undefined),
        Value::Array(items) => match index(items.len()) {
            Some(i) => items[i].clone(),
            None if property == Value::from("length") => Value::Number(items.len() as f64),
            None => Value::Undefined,
        },
        Value::String(s) => {
            let len = s.chars().count();
            match index(len) {
                Some(i) => s.chars().nth(i).map(Value::from).unwrap_or(Value::Undefined),
                None if property == Value::from("length") => Value::Number(len as f64),
                None => Value::Undefined,
            }
        }
        _ => Value::Undefined,
    })
}

fn eval_method(object: Value, method: Method, arg: Option<Value>) -> Result<Value, ExpressionError> {
    if method == Method::ToString {
        return Ok(Value::String(object.to_js_string()));
    }
    let Value::RegExp(re) = &object else {
        return Err(ExpressionError::OperandType {
            op: if method == Method::Test { "test" } else { "exec" }.to_string(),
            expected: "a regular expression",
            found: object.type_name(),
        });
    };
    let text = arg.map(|v| v.to_js_string()).unwrap_or_default();
    Ok(match method {
        Method::Test => Value::Bool(re.is_match(&text)),
        _ => re.exec(&text).map(Value::String).unwrap_or(Value::Null),
    })
}

fn eval_color(
    function: ColorFunction,
    args: &[Node],
    feature: Option<&dyn FeatureContext>,
) -> Result<Value, ExpressionError> {
    let name = function.name();
    let values = args
        .iter()
        .map(|n| n.evaluate(feature))
        .collect::<Result<Vec<_>, _>>()?;
    let color = match function {
        ColorFunction::Color => match values.as_slice() {
            [] => WHITE,
            [css, rest @ ..] => {
                let Value::String(css) = css else {
                    return Err(ExpressionError::OperandType {
                        op: name.to_string(),
                        expected: "a CSS color string",
                        found: css.type_name(),
                    });
                };
                let color =
                    parse_css_color(css).ok_or_else(|| ExpressionError::InvalidColor(css.clone()))?;
                match rest.first() {
                    Some(alpha) => color.with_alpha(require_number(name, alpha)?),
                    None => color,
                }
            }
        },
        _ => {
            let nums = values
                .iter()
                .map(|v| require_number(name, v))
                .collect::<Result<Vec<_>, _>>()?;
            let alpha = nums.get(3).copied().unwrap_or(1.0);
            match function {
                ColorFunction::Rgb | ColorFunction::Rgba => {
                    Rgba::from_bytes(nums[0], nums[1], nums[2], alpha)
                }
                _ => Rgba::from_hsl(nums[0], nums[1], nums[2], alpha),
            }
        }
    };
    Ok(Value::String(color.to_css_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    fn eval(text: &str, feature: &serde_json::Value) -> Result<Value, ExpressionError> {
        let node = lower(&parse(text)?, &Literals::new())?;
        node.evaluate(Some(feature))
    }

    #[test]
    fn test_symbol_falls_back_to_its_name() {
        let f = json!({"properties": {"kind": "park"}});
        assert_eq!(eval("kind", &f), Ok(Value::from("park")));
        assert_eq!(eval("red", &f), Ok(Value::from("red")));
    }

    #[test]
    fn test_feature_member_reads_properties() {
        let f = json!({"id": "x", "properties": {"a b": 3, "n": {"k": 1}}});
        assert_eq!(eval("feature['a b']", &f), Ok(Value::Number(3.0)));
        assert_eq!(eval("feature.n.k", &f), Ok(Value::Number(1.0)));
        assert_eq!(eval("feature.missing", &f), Ok(Value::Undefined));
        assert_eq!(eval("id", &f), Ok(Value::from("x")));
    }

    #[test]
    fn test_template() {
        let f = json!({"properties": {"name": "Oslo", "pop": 700000}});
        assert_eq!(
            eval("'${name} has ${pop}'", &f),
            Ok(Value::from("Oslo has 700000"))
        );
    }

    #[test]
    fn test_member_of_undefined_is_an_error() {
        let f = json!({"properties": {}});
        assert_eq!(
            eval("feature.a.b", &f),
            Err(ExpressionError::InvalidMember("undefined"))
        );
    }

    #[test]
    fn test_arrays_and_strings() {
        let f = json!({"properties": {}});
        assert_eq!(eval("[1, 2, 3][1]", &f), Ok(Value::Number(2.0)));
        assert_eq!(eval("[1, 2, 3].length", &f), Ok(Value::Number(3.0)));
        assert_eq!(eval("'abc'[2]", &f), Ok(Value::from("c")));
    }

    #[test]
    fn test_lowering_errors() {
        let f = json!({});
        assert_eq!(
            eval("nope(1)", &f),
            Err(ExpressionError::UnknownFunction("nope".into()))
        );
        assert_eq!(
            eval("abs(1, 2)", &f),
            Err(ExpressionError::Arity {
                name: "abs".into(),
                expected: "1",
                got: 2
            })
        );
        assert!(matches!(
            eval("rgb(1, 2)", &f),
            Err(ExpressionError::Arity { .. })
        ));
    }

    #[test]
    fn test_constant_regexp_is_precompiled() {
        let node = lower(&parse("regExp('^a', 'i')").unwrap(), &Literals::new()).unwrap();
        assert!(matches!(node, Node::Literal(Value::RegExp(_))));
    }

    #[test]
    fn test_spliced_literal() {
        let mut literals = Literals::new();
        literals.insert("__l_1".into(), json!({"v": [5]}));
        let node = lower(&parse("__l_1.v[0] * 2").unwrap(), &literals).unwrap();
        assert_eq!(node.evaluate(None), Ok(Value::Number(10.0)));
    }
}

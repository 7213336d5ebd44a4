use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unexpected token \"{found}\" at {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("Unclosed string literal starting at {0}")]
    UnclosedString(usize),

    #[error("Invalid number literal \"{0}\"")]
    InvalidNumber(String),

    #[error("Operator {0} is not supported")]
    UnsupportedOperator(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("\"{name}\" expects {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("Operator \"{op}\" is not defined for {left} and {right}")]
    BinaryType {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("\"{op}\" requires {expected}, got {found}")]
    OperandType {
        op: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Condition of a ternary expression must be a boolean, got {0}")]
    NonBooleanTest(&'static str),

    #[error("Cannot read member of {0}")]
    InvalidMember(&'static str),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid regular expression: {0}")]
    InvalidRegExp(String),

    #[error("Expression nests deeper than {0} levels")]
    TooDeep(usize),
}

//! Tokenizer for expression text.

use crate::error::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// String literal contents with escapes already resolved.
    String(String),
    Identifier(String),
    Punct(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Operators and punctuation, longest first so `===` wins over `==`.
const PUNCTUATION: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "=~", "!~", "<", ">", "+", "-", "*", "/",
    "%", "!", "?", ":", ",", ".", "(", ")", "[", "]",
];

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;
        if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            let (value, next) = read_number(&chars, pos)?;
            tokens.push(Spanned {
                token: Token::Number(value),
                pos: start,
            });
            pos = next;
        } else if c == '"' || c == '\'' {
            let (value, next) = read_string(&chars, pos)?;
            tokens.push(Spanned {
                token: Token::String(value),
                pos: start,
            });
            pos = next;
        } else if is_identifier_start(c) {
            while pos < chars.len() && is_identifier_part(chars[pos]) {
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Identifier(chars[start..pos].iter().collect()),
                pos: start,
            });
        } else {
            let punct = PUNCTUATION
                .iter()
                .find(|p| {
                    p.chars()
                        .enumerate()
                        .all(|(i, pc)| chars.get(pos + i) == Some(&pc))
                })
                .ok_or(ExpressionError::UnexpectedChar { ch: c, pos })?;
            pos += punct.len();
            tokens.push(Spanned {
                token: Token::Punct(punct),
                pos: start,
            });
        }
    }
    Ok(tokens)
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn read_number(chars: &[char], mut pos: usize) -> Result<(f64, usize), ExpressionError> {
    let start = pos;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    if chars.get(pos) == Some(&'.') {
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if matches!(chars.get(pos), Some('e') | Some('E')) {
        let mut exp = pos + 1;
        if matches!(chars.get(exp), Some('+') | Some('-')) {
            exp += 1;
        }
        if chars.get(exp).is_some_and(|d| d.is_ascii_digit()) {
            pos = exp;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    let text: String = chars[start..pos].iter().collect();
    // `1abc` is not a number followed by an identifier.
    if chars.get(pos).is_some_and(|c| is_identifier_start(*c)) {
        return Err(ExpressionError::InvalidNumber(format!("{text}{}", chars[pos])));
    }
    text.parse::<f64>()
        .map(|v| (v, pos))
        .map_err(|_| ExpressionError::InvalidNumber(text))
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize), ExpressionError> {
    let quote = chars[start];
    let mut pos = start + 1;
    let mut out = String::new();
    while pos < chars.len() {
        match chars[pos] {
            c if c == quote => return Ok((out, pos + 1)),
            '\\' => {
                let escaped = chars
                    .get(pos + 1)
                    .ok_or(ExpressionError::UnclosedString(start))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => *other,
                });
                pos += 2;
            }
            c => {
                out.push(c);
                pos += 1;
            }
        }
    }
    Err(ExpressionError::UnclosedString(start))
}

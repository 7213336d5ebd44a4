use crate::path::{Path, Selector, Step};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Path must start with '$'")]
    MissingRoot,
    #[error("Unexpected '{found}' at {pos}")]
    Unexpected { found: char, pos: usize },
    #[error("Path ends unexpectedly")]
    UnexpectedEnd,
    #[error("Unterminated string starting at {0}")]
    UnterminatedString(usize),
    #[error("Unknown escape '\\{0}'")]
    BadEscape(char),
    #[error("Index out of range at {0}")]
    BadIndex(usize),
}

/// Parses path text such as `$.properties.floors[0]['height']`.
pub fn parse(text: &str) -> Result<Path, ParseError> {
    let mut p = Parser {
        text,
        chars: text.char_indices().peekable(),
    };
    p.skip_ws();
    if p.bump() != Some('$') {
        return Err(ParseError::MissingRoot);
    }
    let mut path = Path::default();
    while let Some(step) = p.step()? {
        path.steps.push(step);
    }
    p.skip_ws();
    match p.chars.peek() {
        None => Ok(path),
        Some(&(pos, found)) => Err(ParseError::Unexpected { found, pos }),
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map_or(self.text.len(), |&(i, _)| i)
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn eat(&mut self, c: char) -> bool {
        self.chars.next_if(|&(_, next)| next == c).is_some()
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn unexpected(&mut self) -> ParseError {
        match self.chars.peek() {
            Some(&(pos, found)) => ParseError::Unexpected { found, pos },
            None => ParseError::UnexpectedEnd,
        }
    }

    fn step(&mut self) -> Result<Option<Step>, ParseError> {
        if self.eat('.') {
            if self.eat('.') {
                let selectors = if self.peek() == Some('[') {
                    self.bracket()?
                } else {
                    vec![self.dotted()?]
                };
                return Ok(Some(Step::Descendant(selectors)));
            }
            return Ok(Some(Step::Child(vec![self.dotted()?])));
        }
        if self.peek() == Some('[') {
            return Ok(Some(Step::Child(self.bracket()?)));
        }
        Ok(None)
    }

    /// The part after a dot: `*` or a bare name.
    fn dotted(&mut self) -> Result<Selector, ParseError> {
        if self.eat('*') {
            return Ok(Selector::Wildcard);
        }
        let start = self.pos();
        while self
            .chars
            .next_if(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '-')
            .is_some()
        {}
        let end = self.pos();
        if start == end {
            return Err(self.unexpected());
        }
        Ok(Selector::Name(self.text[start..end].to_string()))
    }

    /// `[sel, sel, ...]`
    fn bracket(&mut self) -> Result<Vec<Selector>, ParseError> {
        self.eat('[');
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            selectors.push(match self.peek() {
                Some(q @ ('\'' | '"')) => Selector::Name(self.quoted(q)?),
                Some('*') => {
                    self.bump();
                    Selector::Wildcard
                }
                Some('-' | '0'..='9') => Selector::Index(self.index()?),
                _ => return Err(self.unexpected()),
            });
            self.skip_ws();
            if self.eat(']') {
                return Ok(selectors);
            }
            if !self.eat(',') {
                return Err(self.unexpected());
            }
        }
    }

    fn index(&mut self) -> Result<i64, ParseError> {
        let start = self.pos();
        self.eat('-');
        while self.chars.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
        let end = self.pos();
        self.text[start..end]
            .parse()
            .map_err(|_| ParseError::BadIndex(start))
    }

    fn quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos();
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedString(start)),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(match self.bump() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some(c @ ('\\' | '\'' | '"' | '/')) => c,
                    Some(other) => return Err(ParseError::BadEscape(other)),
                    None => return Err(ParseError::UnterminatedString(start)),
                }),
                Some(c) => out.push(c),
            }
        }
    }
}

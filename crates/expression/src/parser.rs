//! Recursive-descent parser with precedence climbing for binary operators.
//!
//! Precedence, loosest first: `?:`, `||`, `&&`, `=== !== =~ !~`,
//! `< <= > >=`, `+ -`, `* / %`, unary `! - +`, then postfix member access
//! and calls.

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::error::ExpressionError;
use crate::lexer::{tokenize, Spanned, Token};

/// Deepest syntax tree the parser will build. Evaluation and drop both
/// recurse over the tree, so this also bounds their stack use.
pub const MAX_DEPTH: usize = 256;

pub fn parse(input: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_conditional()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(unexpected(tok)),
    }
}

enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn infix(punct: &str) -> Option<(u8, Infix)> {
    Some(match punct {
        "||" => (1, Infix::Logical(LogicalOp::Or)),
        "&&" => (2, Infix::Logical(LogicalOp::And)),
        "===" => (3, Infix::Binary(BinaryOp::StrictEq)),
        "!==" => (3, Infix::Binary(BinaryOp::StrictNe)),
        "=~" => (3, Infix::Binary(BinaryOp::Match)),
        "!~" => (3, Infix::Binary(BinaryOp::NotMatch)),
        "<" => (4, Infix::Binary(BinaryOp::Lt)),
        "<=" => (4, Infix::Binary(BinaryOp::Le)),
        ">" => (4, Infix::Binary(BinaryOp::Gt)),
        ">=" => (4, Infix::Binary(BinaryOp::Ge)),
        "+" => (5, Infix::Binary(BinaryOp::Add)),
        "-" => (5, Infix::Binary(BinaryOp::Sub)),
        "*" => (6, Infix::Binary(BinaryOp::Mul)),
        "/" => (6, Infix::Binary(BinaryOp::Div)),
        "%" => (6, Infix::Binary(BinaryOp::Rem)),
        _ => return None,
    })
}

fn unexpected(tok: &Spanned) -> ExpressionError {
    let found = match &tok.token {
        Token::Number(n) => crate::value::format_number(*n),
        Token::String(s) => format!("'{s}'"),
        Token::Identifier(name) => name.clone(),
        Token::Punct(p) => p.to_string(),
    };
    ExpressionError::UnexpectedToken {
        found,
        pos: tok.pos,
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self) -> Option<&'static str> {
        match self.peek() {
            Some(Spanned {
                token: Token::Punct(p),
                ..
            }) => Some(*p),
            _ => None,
        }
    }

    fn next(&mut self) -> Result<Spanned, ExpressionError> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExpressionError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn expect(&mut self, punct: &'static str) -> Result<(), ExpressionError> {
        let tok = self.next()?;
        if tok.token == Token::Punct(punct) {
            Ok(())
        } else {
            Err(unexpected(&tok))
        }
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExpressionError> {
        self.enter()?;
        let test = self.parse_binary(1)?;
        if self.peek_punct() != Some("?") {
            self.depth -= 1;
            return Ok(test);
        }
        self.pos += 1;
        let consequent = self.parse_conditional()?;
        self.expect(":")?;
        let alternate = self.parse_conditional()?;
        self.depth -= 1;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;
        while let Some(punct) = self.peek_punct() {
            if punct == "==" || punct == "!=" {
                return Err(ExpressionError::UnsupportedOperator(punct.to_string()));
            }
            let Some((prec, op)) = infix(punct) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            // Each chained operator nests the tree built so far one level.
            self.enter()?;
            let right = self.parse_binary(prec + 1)?;
            left = match op {
                Infix::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Infix::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        let op = match self.peek_punct() {
            Some("!") => UnaryOp::Not,
            Some("-") => UnaryOp::Negate,
            Some("+") => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        self.enter()?;
        let argument = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            argument: Box::new(argument),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.peek_punct(), Some(".") | Some("[") | Some("(")) {
                self.enter()?;
            }
            match self.peek_punct() {
                Some(".") => {
                    self.pos += 1;
                    let tok = self.next()?;
                    let Token::Identifier(name) = tok.token else {
                        return Err(unexpected(&tok));
                    };
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(Expr::String(name)),
                        computed: false,
                    };
                }
                Some("[") => {
                    self.pos += 1;
                    let property = self.parse_conditional()?;
                    self.expect("]")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: true,
                    };
                }
                Some("(") => {
                    self.pos += 1;
                    let arguments = self.parse_list(")")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        arguments,
                    };
                }
                _ => {
                    self.depth = base;
                    return Ok(expr);
                }
            }
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    fn parse_list(&mut self, close: &'static str) -> Result<Vec<Expr>, ExpressionError> {
        let mut items = Vec::new();
        if self.peek_punct() == Some(close) {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            items.push(self.parse_conditional()?);
            let tok = self.next()?;
            match tok.token {
                Token::Punct(",") => continue,
                Token::Punct(p) if p == close => return Ok(items),
                _ => return Err(unexpected(&tok)),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let tok = self.next()?;
        match tok.token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::String(s) => Ok(Expr::String(s)),
            Token::Identifier(name) => Ok(Expr::Identifier(name)),
            Token::Punct("(") => {
                let inner = self.parse_conditional()?;
                self.expect(")")?;
                Ok(inner)
            }
            Token::Punct("[") => Ok(Expr::Array(self.parse_list("]")?)),
            _ => Err(unexpected(&tok)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Identifier(name.to_string()))
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                left: num(1.0),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse("a - b - c").unwrap(),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    left: ident("a"),
                    right: ident("b"),
                }),
                right: ident("c"),
            }
        );
    }

    #[test]
    fn test_logical_binds_looser_than_comparison() {
        let Expr::Logical { op, left, .. } = parse("a > 1 && b").unwrap() else {
            panic!("expected logical");
        };
        assert_eq!(op, LogicalOp::And);
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Gt, .. }));
    }

    #[test]
    fn test_ternary_nests_right() {
        let Expr::Conditional { alternate, .. } = parse("a ? 1 : b ? 2 : 3").unwrap() else {
            panic!("expected conditional");
        };
        assert!(matches!(*alternate, Expr::Conditional { .. }));
    }

    #[test]
    fn test_member_and_call() {
        assert_eq!(
            parse("feature['a b'].c").unwrap(),
            Expr::Member {
                object: Box::new(Expr::Member {
                    object: ident("feature"),
                    property: Box::new(Expr::String("a b".into())),
                    computed: true,
                }),
                property: Box::new(Expr::String("c".into())),
                computed: false,
            }
        );
        assert_eq!(
            parse("max(1, 2)").unwrap(),
            Expr::Call {
                callee: ident("max"),
                arguments: vec![Expr::Number(1.0), Expr::Number(2.0)],
            }
        );
        assert_eq!(
            parse("color()").unwrap(),
            Expr::Call {
                callee: ident("color"),
                arguments: vec![],
            }
        );
    }

    #[test]
    fn test_unary_chain() {
        assert_eq!(
            parse("!!a").unwrap(),
            Expr::Unary {
                op: UnaryOp::Not,
                argument: Box::new(Expr::Unary {
                    op: UnaryOp::Not,
                    argument: ident("a"),
                }),
            }
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("1 +"), Err(ExpressionError::UnexpectedEnd));
        assert_eq!(
            parse("a == b"),
            Err(ExpressionError::UnsupportedOperator("==".into()))
        );
        assert_eq!(
            parse("1 2"),
            Err(ExpressionError::UnexpectedToken {
                found: "2".into(),
                pos: 2
            })
        );
        assert!(parse("(1").is_err());
        assert!(parse("[1, 2").is_err());
    }

    #[test]
    fn test_nesting_is_bounded() {
        let deep = |open: &str, close: &str| {
            format!("{}1{}", open.repeat(10_000), close.repeat(10_000))
        };
        let too_deep = Err(ExpressionError::TooDeep(MAX_DEPTH));
        assert_eq!(parse(&deep("(", ")")), too_deep);
        assert_eq!(parse(&deep("[", "]")), too_deep);
        assert_eq!(parse(&deep("max(", ")")), too_deep);
        assert_eq!(parse(&deep("!", "")), too_deep);
        assert_eq!(parse(&deep("1 ? 1 : ", "")), too_deep);
        assert_eq!(parse(&vec!["a"; 10_000].join(" + ")), too_deep);
        assert_eq!(parse(&format!("a{}", ".b".repeat(10_000))), too_deep);

        assert!(parse(&format!("{}1{}", "(".repeat(100), ")".repeat(100))).is_ok());
        assert!(parse(&vec!["a"; 100].join(" + ")).is_ok());
    }
}

//! Tokenizer and parser for the script language

use super::ScriptError;
use serde_json::Value;

// Longest operators first so `<=` wins over `<`
const PUNCTUATION: [&str; 23] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", ",", ".", ";", "!",
    "-", "+", "*", "/", "%", "<", ">",
];

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call { name: String, args: Vec<Expr> },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Parse a script into its sequence of expressions
pub fn parse_program(source: &str) -> Result<Vec<Expr>, ScriptError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, cursor: 0 };
    let mut program = Vec::new();

    loop {
        while parser.eat(";") {}
        if parser.peek() == &TokenKind::Eof {
            break;
        }
        program.push(parser.expression()?);
    }
    Ok(program)
}

fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if source[position..].starts_with("//") {
            while let Some((_, c)) = chars.next() {
                if c == '\n' {
                    break;
                }
            }
            continue;
        }

        let kind = if c.is_ascii_digit() {
            let mut end = position;
            let mut seen_dot = false;
            while let Some(&(i, c)) = chars.peek() {
                let fraction = c == '.'
                    && !seen_dot
                    && source[i + 1..].starts_with(|n: char| n.is_ascii_digit());
                if !(c.is_ascii_digit() || fraction) {
                    break;
                }
                seen_dot |= fraction;
                end = i + c.len_utf8();
                chars.next();
            }
            let number = source[position..end]
                .parse()
                .map_err(|_| ScriptError::syntax("malformed number", position))?;
            TokenKind::Number(number)
        } else if c == '"' || c == '\'' {
            chars.next();
            TokenKind::Str(string_literal(&mut chars, c, position)?)
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let mut end = position;
            while let Some(&(i, c)) = chars.peek() {
                if !(c.is_alphanumeric() || c == '_' || c == '$') {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            TokenKind::Ident(source[position..end].to_string())
        } else {
            let punct = PUNCTUATION
                .iter()
                .find(|p| source[position..].starts_with(**p))
                .ok_or_else(|| ScriptError::syntax(format!("unexpected character {c:?}"), position))?;
            for _ in 0..punct.len() {
                chars.next();
            }
            TokenKind::Punct(match *punct {
                "===" => "==",
                "!==" => "!=",
                other => other,
            })
        };
        tokens.push(Token { kind, position });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: source.len(),
    });
    Ok(tokens)
}

fn string_literal(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, ScriptError> {
    let mut text = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            c if c == quote => return Ok(text),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, other)) => text.push(other),
                None => break,
            },
            other => text.push(other),
        }
    }
    Err(ScriptError::syntax("unterminated string", start))
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)].kind
    }

    fn position(&self) -> usize {
        self.tokens[self.cursor.min(self.tokens.len() - 1)].position
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        kind
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), TokenKind::Punct(p) if *p == punct) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), ScriptError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(ScriptError::syntax(
                format!("expected `{punct}`"),
                self.position(),
            ))
        }
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.binary(0)
    }

    fn binary(&mut self, min_precedence: u8) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        while let Some((op, precedence)) = self.binary_op()
            && precedence >= min_precedence
        {
            self.cursor += 1;
            let right = self.binary(precedence + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let TokenKind::Punct(p) = self.peek() else {
            return None;
        };
        Some(match *p {
            "||" => (BinaryOp::Or, 0),
            "&&" => (BinaryOp::And, 1),
            "==" => (BinaryOp::Eq, 2),
            "!=" => (BinaryOp::NotEq, 2),
            "<" => (BinaryOp::Less, 3),
            "<=" => (BinaryOp::LessEq, 3),
            ">" => (BinaryOp::Greater, 3),
            ">=" => (BinaryOp::GreaterEq, 3),
            "+" => (BinaryOp::Add, 4),
            "-" => (BinaryOp::Sub, 4),
            "*" => (BinaryOp::Mul, 5),
            "/" => (BinaryOp::Div, 5),
            "%" => (BinaryOp::Rem, 5),
            _ => return None,
        })
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.eat("!") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat("-") {
            return Ok(Expr::Unary(UnaryOp::Negate, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                let position = self.position();
                match self.advance() {
                    TokenKind::Ident(name) => expr = Expr::Member(Box::new(expr), name),
                    _ => return Err(ScriptError::syntax("expected property name", position)),
                }
            } else if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if matches!(self.peek(), TokenKind::Punct("(")) {
                let Expr::Name(name) = expr else {
                    return Err(ScriptError::syntax(
                        "only builtin functions can be called",
                        self.position(),
                    ));
                };
                self.cursor += 1;
                expr = Expr::Call {
                    name,
                    args: self.items(")")?,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let position = self.position();
        match self.advance() {
            TokenKind::Number(n) => super::eval::number(n)
                .map(Expr::Literal)
                .map_err(|_| ScriptError::syntax("number out of range", position)),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Name(name),
            }),
            TokenKind::Punct("(") => {
                let expr = self.expression()?;
                self.expect(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => Ok(Expr::List(self.items("]")?)),
            TokenKind::Punct(p) => Err(ScriptError::syntax(format!("unexpected `{p}`"), position)),
            TokenKind::Eof => Err(ScriptError::syntax("unexpected end of script", position)),
        }
    }

    /// Comma-separated expressions up to and including `close`
    fn items(&mut self, close: &str) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }
}

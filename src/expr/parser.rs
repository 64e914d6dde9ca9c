use serde_json::{Map, Number, Value};

use super::lexer::{Token, TokenKind};
use super::{EvalError, EvalResult};

pub const MAX_DEPTH: usize = 64;

/// Recursive-descent parser over the literal grammar.
///
/// `None` from a value production means `undefined`: object members holding
/// it are dropped and array slots become `null`, the same shape
/// `JSON.stringify` would give.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse_document(mut self) -> EvalResult<Value> {
        let value = self.value()?.unwrap_or(Value::Null);
        let trailing = self.peek();
        if trailing.kind != TokenKind::Eof {
            return Err(EvalError::syntax(
                "unexpected input after expression",
                trailing.offset,
            ));
        }
        Ok(value)
    }

    fn value(&mut self) -> EvalResult<Option<Value>> {
        let token = self.advance();
        match token.kind {
            TokenKind::LBrace => self.nested(token.offset, Self::object).map(Some),
            TokenKind::LBracket => self.nested(token.offset, Self::array).map(Some),
            TokenKind::LParen => {
                let inner = self.nested(token.offset, Self::value)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Str(s) => Ok(Some(Value::String(s))),
            TokenKind::Number(n) => number(n, token.offset).map(Some),
            TokenKind::Minus | TokenKind::Plus => {
                let negate = token.kind == TokenKind::Minus;
                let operand = self.advance();
                match operand.kind {
                    TokenKind::Number(n) => number(if negate { -n } else { n }, operand.offset).map(Some),
                    _ => Err(EvalError::syntax("expected a number after sign", operand.offset)),
                }
            }
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Some(Value::Bool(true))),
                "false" => Ok(Some(Value::Bool(false))),
                "null" => Ok(Some(Value::Null)),
                "undefined" => Ok(None),
                _ => Err(EvalError::syntax(
                    format!("identifier '{}' is not a value", name),
                    token.offset,
                )),
            },
            TokenKind::Eof => Err(EvalError::syntax("unexpected end of input", token.offset)),
            other => Err(EvalError::syntax(
                format!("unexpected token {:?}", other),
                token.offset,
            )),
        }
    }

    fn nested<T>(
        &mut self,
        offset: usize,
        production: fn(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::syntax("expression nests too deeply", offset));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    fn object(&mut self) -> EvalResult<Value> {
        let mut map = Map::new();
        loop {
            let token = self.advance();
            let key = match token.kind {
                TokenKind::RBrace => return Ok(Value::Object(map)),
                TokenKind::Ident(name) => name,
                TokenKind::Str(s) => s,
                TokenKind::Number(n) => number_key(n),
                _ => {
                    return Err(EvalError::syntax("expected a property name", token.offset));
                }
            };
            self.expect(TokenKind::Colon, "':'")?;
            match self.value()? {
                Some(value) => {
                    map.insert(key, value);
                }
                None => {
                    map.remove(&key);
                }
            }

            let sep = self.advance();
            match sep.kind {
                TokenKind::Comma => continue,
                TokenKind::RBrace => return Ok(Value::Object(map)),
                _ => return Err(EvalError::syntax("expected ',' or '}'", sep.offset)),
            }
        }
    }

    fn array(&mut self) -> EvalResult<Value> {
        let mut items = Vec::new();
        loop {
            if self.peek().kind == TokenKind::RBracket {
                self.advance();
                return Ok(Value::Array(items));
            }
            items.push(self.value()?.unwrap_or(Value::Null));

            let sep = self.advance();
            match sep.kind {
                TokenKind::Comma => continue,
                TokenKind::RBracket => return Ok(Value::Array(items)),
                _ => return Err(EvalError::syntax("expected ',' or ']'", sep.offset)),
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> EvalResult<()> {
        let token = self.advance();
        if token.kind == kind {
            Ok(())
        } else {
            Err(EvalError::syntax(format!("expected {}", what), token.offset))
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Token {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .cloned()
            .unwrap_or(Token {
                kind: TokenKind::Eof,
                offset: 0,
            })
    }
}

fn number(n: f64, offset: usize) -> EvalResult<Value> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| EvalError::syntax("number is not finite", offset))
}

fn number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

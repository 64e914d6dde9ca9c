use super::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Comma,
    Plus,
    Minus,
    Number(f64),
    Str(String),
    Ident(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
        }
    }

    pub fn tokenize(mut self) -> EvalResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.pos));
                return Ok(tokens);
            }
            tokens.push(self.next_token()?);
        }
    }

    fn next_token(&mut self) -> EvalResult<Token> {
        let start = self.pos;
        let ch = self.advance();

        let kind = match ch {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '"' | '\'' | '`' => TokenKind::Str(self.string(ch, start)?),
            c if c.is_ascii_digit() => TokenKind::Number(self.number(start)?),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                TokenKind::Number(self.number(start)?)
            }
            c if is_ident_start(c) => {
                while self.peek().is_some_and(is_ident_continue) {
                    self.advance();
                }
                TokenKind::Ident(self.source[start..self.pos].iter().collect())
            }
            other => {
                return Err(EvalError::syntax(format!("unexpected character '{}'", other), start));
            }
        };

        Ok(Token::new(kind, start))
    }

    fn skip_trivia(&mut self) -> EvalResult<()> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '/' && self.peek_at(1) == Some('/') {
                while !self.is_at_end() && self.peek() != Some('\n') {
                    self.advance();
                }
            } else if c == '/' && self.peek_at(1) == Some('*') {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.is_at_end() {
                        return Err(EvalError::syntax("unterminated comment", start));
                    }
                    if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                        self.pos += 2;
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn number(&mut self, start: usize) -> EvalResult<f64> {
        let first = self.source[start];
        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits: String = self.source[digits_start..self.pos].iter().collect();
            return u64::from_str_radix(&digits, 16)
                .map(|v| v as f64)
                .map_err(|_| EvalError::syntax("invalid hex literal", start));
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.advance();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek().is_some_and(is_ident_start) {
            return Err(EvalError::syntax("identifier directly after number", self.pos));
        }

        let text: String = self.source[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map_err(|_| EvalError::syntax(format!("invalid number '{}'", text), start))
    }

    fn string(&mut self, quote: char, start: usize) -> EvalResult<String> {
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(EvalError::syntax("unterminated string", start));
            };
            self.advance();
            match c {
                c if c == quote => return Ok(out),
                '\n' if quote != '`' => {
                    return Err(EvalError::syntax("unterminated string", start));
                }
                '$' if quote == '`' && self.peek() == Some('{') => {
                    return Err(EvalError::syntax(
                        "template interpolation is not supported",
                        self.pos - 1,
                    ));
                }
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> EvalResult<()> {
        let at = self.pos;
        let Some(c) = self.peek() else {
            return Err(EvalError::syntax("unterminated escape", at));
        };
        self.advance();
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'v' => out.push('\u{000B}'),
            '0' => out.push('\0'),
            '\n' => {}
            'x' => {
                let code = self.hex_digits(2, at)?;
                out.push(char::from_u32(code).ok_or_else(|| EvalError::syntax("bad escape", at))?);
            }
            'u' => {
                let code = if self.peek() == Some('{') {
                    self.advance();
                    let digits_start = self.pos;
                    while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.advance();
                    }
                    let digits: String = self.source[digits_start..self.pos].iter().collect();
                    if self.peek() != Some('}') {
                        return Err(EvalError::syntax("bad unicode escape", at));
                    }
                    self.advance();
                    u32::from_str_radix(&digits, 16)
                        .map_err(|_| EvalError::syntax("bad unicode escape", at))?
                } else {
                    self.hex_digits(4, at)?
                };
                // Lone surrogates have no `char`; substitute like a lossy decode.
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize, at: usize) -> EvalResult<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| EvalError::syntax("bad escape", at))?;
            self.advance();
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.pos];
        self.pos += 1;
        c
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.source.get(self.pos + ahead).copied()
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

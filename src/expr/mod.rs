//! Evaluator for inline chart expressions.
//!
//! Inline charts arrive as JavaScript-flavoured object literals
//! (`{type:'bar',data:{labels:['a'],datasets:[{data:[1]}]}}`). They are read
//! with a literal-only grammar: objects, arrays, strings, numbers, booleans,
//! `null` and `undefined`. Nothing in the grammar names a function, a global
//! or an operator beyond a numeric sign, so there is no context to escape
//! from and no way to loop.

mod lexer;
mod parser;

use std::fmt;

use serde_json::Value;

pub use parser::MAX_DEPTH;

/// Longest expression accepted, in bytes.
pub const MAX_SOURCE_LEN: usize = 64 * 1024;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Refused by the looping-construct pre-check; never parsed.
    Rejected,
    Syntax,
}

#[derive(Debug, Clone)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
    pub offset: Option<usize>,
}

impl EvalError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: EvalErrorKind::Rejected,
            message: message.into(),
            offset: None,
        }
    }

    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: EvalErrorKind::Syntax,
            message: message.into(),
            offset: Some(offset),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EvalErrorKind::Rejected => write!(f, "Input is not allowed"),
            EvalErrorKind::Syntax => match self.offset {
                Some(offset) => write!(f, "Invalid input\n{} at offset {}", self.message, offset),
                None => write!(f, "Invalid input\n{}", self.message),
            },
        }
    }
}

impl std::error::Error for EvalError {}

/// Shallow pre-check for `for(` / `while(`, any case.
pub fn contains_loop_construct(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.contains("for(") || lower.contains("while(")
}

/// Screen and evaluate one inline chart expression.
pub fn evaluate(source: &str) -> EvalResult<Value> {
    if contains_loop_construct(source) {
        return Err(EvalError::rejected("looping construct"));
    }
    evaluate_literal(source)
}

/// Evaluate without the pre-check.
pub fn evaluate_literal(source: &str) -> EvalResult<Value> {
    if source.len() > MAX_SOURCE_LEN {
        return Err(EvalError::syntax(
            format!("expression longer than {} bytes", MAX_SOURCE_LEN),
            MAX_SOURCE_LEN,
        ));
    }
    let tokens = lexer::Lexer::new(source).tokenize()?;
    parser::Parser::new(tokens).parse_document()
}

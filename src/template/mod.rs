//! Templating module
//!
//! Replaces every `@{{ expression }}` marker in a text with the evaluated
//! result of the expression. Markers are matched non-greedily, never span a
//! line break and do not nest. The scan is a single left-to-right pass, so a
//! value containing a marker is emitted as-is.
//!
//! Expressions use a small grammar (see [`parser`]) with read/write access to
//! the session of the caller.

mod eval;
mod lexer;
mod parser;

use crate::session::{Session, Value};
use std::fmt::Write;
use thiserror::Error;

pub const MARKER_OPEN: &str = "@{{";
pub const MARKER_CLOSE: &str = "}}";

/// Rendered in place of a null result
pub const NULL_TEXT: &str = "[NULL]";

/// Failure inside a single expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unexpected character `{0}` at {1}")]
    UnexpectedChar(char, usize),

    #[error("unterminated string starting at {0}")]
    UnterminatedString(usize),

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("unexpected token {found} at {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("only session keys can be assigned")]
    InvalidAssignTarget,

    #[error("operator `{op}` cannot apply to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,
}

/// Failure rendering a template, with the location of the offending marker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expression `{expression}` at byte {offset}: {source}")]
pub struct TemplateError {
    pub offset: usize,
    pub expression: String,
    #[source]
    pub source: ExprError,
}

/// Evaluate a single expression against a session
pub fn evaluate(source: &str, session: &mut Session) -> Result<Value, ExprError> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::Parser::new(tokens).parse_program()?;
    eval::eval_program(&program, session)
}

/// Render all markers in `text`
pub fn render(session: &mut Session, text: &str) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut offset = 0;

    while let Some(start) = rest.find(MARKER_OPEN) {
        let body_start = start + MARKER_OPEN.len();
        let body = &rest[body_start..];
        let line = body.split('\n').next().unwrap_or_default();

        let Some(end) = line.find(MARKER_CLOSE) else {
            // No close on this line: emit the opener literally and keep scanning
            out.push_str(&rest[..body_start]);
            offset += body_start;
            rest = body;
            continue;
        };

        out.push_str(&rest[..start]);
        let source = &body[..end];
        let value = evaluate(source, session).map_err(|source_err| TemplateError {
            offset: offset + start,
            expression: source.trim().to_string(),
            source: source_err,
        })?;
        if value.is_null() {
            out.push_str(NULL_TEXT);
        } else {
            let _ = write!(out, "{value}");
        }

        let consumed = body_start + end + MARKER_CLOSE.len();
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

#![allow(clippy::result_large_err)]
//! tdeep-json: extended JSON for expected values.
//!
//! Accepts JSON plus comments, trailing commas, raw strings (`r<...>`),
//! Go-style numeric literals, placeholders (`$1`, `$name`) and operator
//! calls (`$^NotZero`, `Between(1, 5)`). Operators are built by a caller
//! supplied callback, so the parser knows none of them.
//!
//! # Public API
//!
//! - [`parse()`] / [`parse_str()`] -- document to [`Value`] tree
//! - [`ParseOpts`], [`OpCall`], [`OpFn`] -- substitutions and operator callback
//! - [`ParseError`], [`PosError`], [`Position`] -- diagnostics
//! - [`Json`] -- operator matching a got value against a parsed document

pub mod error;
pub mod lexer;
pub mod matcher;
mod number;
mod parser;
pub mod position;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tdeep_core::{BoxError, Value};
use tracing::debug;

// ── Convenience re-exports ───────────────────────────────────────────

pub use error::{ParseError, PosError};
pub use matcher::Json;
pub use position::Position;

/// An operator call found in a document.
#[derive(Debug, Clone)]
pub struct OpCall {
    pub name: String,
    pub params: Vec<Value>,
}

/// Builds the value of an operator call; errors are reported at `Position`.
pub type OpFn = Arc<dyn Fn(OpCall, Position) -> Result<Value, BoxError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ParseOpts {
    /// Values of `$1`, `$2`, ...
    pub placeholders: Vec<Value>,
    pub placeholders_by_name: HashMap<String, Value>,
    pub op_fn: Option<OpFn>,
}

impl fmt::Debug for ParseOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOpts")
            .field("placeholders", &self.placeholders)
            .field("placeholders_by_name", &self.placeholders_by_name)
            .field("op_fn", &self.op_fn.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ParseOpts {
    pub fn with_placeholders(mut self, placeholders: Vec<Value>) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: Value) -> Self {
        self.placeholders_by_name.insert(name.into(), value);
        self
    }

    pub fn with_op_fn<F>(mut self, op_fn: F) -> Self
    where
        F: Fn(OpCall, Position) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.op_fn = Some(Arc::new(op_fn));
        self
    }
}

/// Parses a UTF-8 document.
pub fn parse(src: &[u8], opts: &ParseOpts) -> Result<Value, ParseError> {
    let text = std::str::from_utf8(src).map_err(|e| ParseError {
        errors: vec![PosError::new(
            "invalid UTF-8 encoding",
            position_of(&src[..e.valid_up_to()]),
        )],
    })?;
    parse_str(text, opts)
}

pub fn parse_str(src: &str, opts: &ParseOpts) -> Result<Value, ParseError> {
    parser::parse_at(src, opts, Position::default()).map_err(|errors| {
        debug!(errors = errors.len(), "extended JSON rejected");
        ParseError { errors }
    })
}

/// Position just past a valid UTF-8 prefix.
fn position_of(valid: &[u8]) -> Position {
    let mut pos = Position::default();
    let text = String::from_utf8_lossy(valid);
    let chars: Vec<char> = text.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        pos.advance(*c, chars.get(i + 1).copied());
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_utf8_is_located() {
        let err = parse(b"[1,\n \xff]", &ParseOpts::default()).expect_err("invalid");
        assert_eq!(err.len(), 1);
        assert_eq!(
            err.to_string(),
            "invalid UTF-8 encoding at line 2:1 (pos 5)"
        );
    }

    #[test]
    fn opts_debug_hides_callback() {
        let opts = ParseOpts::default().with_op_fn(|_, _| Ok(Value::Invalid));
        assert!(format!("{:?}", opts).contains("op_fn: Some(\"<fn>\")"));
    }
}

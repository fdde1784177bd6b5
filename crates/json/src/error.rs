//! Parse diagnostics.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::position::Position;

/// One positioned diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PosError {
    pub message: String,
    pub pos: Position,
}

impl PosError {
    pub fn new(message: impl Into<String>, pos: Position) -> Self {
        PosError {
            message: message.into(),
            pos,
        }
    }
}

impl fmt::Display for PosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.pos)
    }
}

/// Every error found in a document, in source order. Rendered one per line.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", render(.errors))]
pub struct ParseError {
    pub errors: Vec<PosError>,
}

impl ParseError {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

fn render(errors: &[PosError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_newline_joined() {
        let second = Position {
            bpos: 9,
            pos: 9,
            line: 2,
            col: 3,
        };
        let err = ParseError {
            errors: vec![
                PosError::new("unknown placeholder \"$a\"", Position::default()),
                PosError::new("unknown placeholder \"$b\"", second),
            ],
        };
        assert_eq!(
            err.to_string(),
            "unknown placeholder \"$a\" at line 1:0 (pos 0)\nunknown placeholder \"$b\" at line 2:3 (pos 9)"
        );
    }
}

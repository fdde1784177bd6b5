//! One diagnosed mismatch, possibly chained to others.

use std::fmt;

use super::{indent_into, ErrorSummary, Location, Path};
use crate::value::Value;

/// Environment variable controlling the error cap, named in the
/// "too many errors" sentinel.
pub const MAX_ERRORS_ENV: &str = "TDEEP_MAX_ERRORS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Data disagreement.
    Mismatch,
    /// A value could not be handed to user code.
    CannotCompare,
    /// Boolean-mode sentinel, carries no diagnostic.
    Boolean,
    /// Terminates a capped error chain.
    TooMany,
}

/// Content shown on the `got:`/`expected:` lines.
#[derive(Debug, Clone)]
pub enum Shown {
    Value(Value),
    /// Pre-rendered text, shown verbatim (type names, `nil`).
    Raw(String),
}

impl fmt::Display for Shown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shown::Value(v) => write!(f, "{}", v),
            Shown::Raw(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    /// Set by the context collecting the error when left empty.
    pub path: Option<Path>,
    /// May contain `%%`, replaced by the path.
    pub message: String,
    pub got: Option<Shown>,
    pub expected: Option<Shown>,
    /// Replaces the got/expected pair when set.
    pub summary: Option<ErrorSummary>,
    pub location: Option<Location>,
    pub origin: Option<Box<Error>>,
    pub next: Option<Box<Error>>,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Error {
        Error {
            kind: ErrorKind::Mismatch,
            path: None,
            message: message.into(),
            got: None,
            expected: None,
            summary: None,
            location: None,
            origin: None,
            next: None,
        }
    }

    pub fn boolean() -> Box<Error> {
        Box::new(Error {
            kind: ErrorKind::Boolean,
            ..Error::new("")
        })
    }

    pub fn too_many() -> Box<Error> {
        Box::new(Error {
            kind: ErrorKind::TooMany,
            ..Error::new(format!(
                "Too many errors (use {}=-1 to see all)",
                MAX_ERRORS_ENV
            ))
        })
    }

    pub fn cannot_compare(summary: impl Into<String>) -> Error {
        Error {
            kind: ErrorKind::CannotCompare,
            summary: Some(ErrorSummary::text(summary)),
            ..Error::new("cannot compare")
        }
    }

    pub fn with_got(mut self, got: &Value) -> Self {
        self.got = Some(Shown::Value(got.clone()));
        self
    }

    pub fn with_expected(mut self, expected: &Value) -> Self {
        self.expected = Some(Shown::Value(expected.clone()));
        self
    }

    pub fn with_got_raw(mut self, got: impl Into<String>) -> Self {
        self.got = Some(Shown::Raw(got.into()));
        self
    }

    pub fn with_expected_raw(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(Shown::Raw(expected.into()));
        self
    }

    pub fn with_summary(mut self, summary: ErrorSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn with_origin(mut self, origin: Box<Error>) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_path(mut self, path: Path) -> Self {
        self.path = Some(path);
        self
    }

    pub fn is_boolean(&self) -> bool {
        self.kind == ErrorKind::Boolean
    }

    pub fn is_too_many(&self) -> bool {
        self.kind == ErrorKind::TooMany
    }

    /// Iterates over this error and its `next` siblings.
    pub fn iter(&self) -> ErrorIter<'_> {
        ErrorIter { cur: Some(self) }
    }

    /// Number of errors in the chain, sentinels included.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Appends `next` at the end of the chain.
    pub fn push_next(&mut self, next: Box<Error>) {
        let mut slot = &mut self.next;
        while let Some(node) = slot {
            slot = &mut node.next;
        }
        *slot = Some(next);
    }

    /// Renders the whole chain, each line prefixed with `prefix`.
    pub fn append(&self, buf: &mut String, prefix: &str) {
        if self.is_boolean() {
            return;
        }
        let eol_prefix = format!("\n{}", prefix);
        buf.push_str(prefix);

        if self.is_too_many() {
            buf.push_str(&self.message);
            return;
        }

        let path = self
            .path
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_default();
        match self.message.find("%%") {
            Some(pos) => {
                buf.push_str(&self.message[..pos]);
                buf.push_str(&path);
                buf.push_str(&self.message[pos + 2..]);
            }
            None => {
                buf.push_str(&path);
                buf.push_str(": ");
                buf.push_str(&self.message);
            }
        }

        let value_indent = format!("{}\t          ", prefix);
        match &self.summary {
            Some(summary) => {
                buf.push('\n');
                summary.append(buf, &format!("{}\t", prefix));
            }
            None => {
                buf.push_str(&eol_prefix);
                buf.push_str("\t     got: ");
                indent_into(buf, &shown(&self.got), &value_indent);
                buf.push_str(&eol_prefix);
                buf.push_str("\texpected: ");
                indent_into(buf, &shown(&self.expected), &value_indent);
            }
        }

        if let Some(origin) = &self.origin {
            buf.push_str(&eol_prefix);
            buf.push_str("Originates from following error:\n");
            origin.append(buf, &format!("{}\t", prefix));
        }

        if let Some(location) = &self.location {
            let same_as_next = self
                .next
                .as_ref()
                .is_some_and(|n| n.location.as_ref() == Some(location));
            if location.is_initialized() && !location.behind_cmp && !same_as_next {
                buf.push_str(&eol_prefix);
                buf.push_str("[under operator ");
                buf.push_str(&location.to_string());
                buf.push(']');
            }
        }

        if let Some(next) = &self.next {
            buf.push('\n');
            next.append(buf, prefix);
        }
    }
}

fn shown(s: &Option<Shown>) -> String {
    s.as_ref().map(|s| s.to_string()).unwrap_or_default()
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::new();
        self.append(&mut buf, "");
        f.write_str(&buf)
    }
}

impl std::error::Error for Error {}

pub struct ErrorIter<'a> {
    cur: Option<&'a Error>,
}

impl<'a> Iterator for ErrorIter<'a> {
    type Item = &'a Error;

    fn next(&mut self) -> Option<&'a Error> {
        let cur = self.cur?;
        self.cur = cur.next.as_deref();
        Some(cur)
    }
}

//! Traversal context, paths and error records.

mod context;
mod error;
mod location;
mod path;
mod summary;

pub use context::Context;
pub use error::{Error, ErrorIter, ErrorKind, Shown, MAX_ERRORS_ENV};
pub use location::Location;
pub use path::{Level, LevelKind, Path};
pub use summary::{ErrorSummary, SummaryItem};

/// Appends `text`, every line after the first prefixed with `indent`.
pub(crate) fn indent_into(buf: &mut String, text: &str, indent: &str) {
    let mut lines = text.split('\n');
    if let Some(first) = lines.next() {
        buf.push_str(first);
    }
    for line in lines {
        buf.push('\n');
        buf.push_str(indent);
        buf.push_str(line);
    }
}

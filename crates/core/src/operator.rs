//! Contract shared by every matcher placed on the expected side.

use std::fmt;

use crate::ctxerr::{Context, Error, Location};
use crate::types::Type;
use crate::value::Value;

/// A polymorphic expected value.
///
/// `match_value` reports mismatches through [`Context::collect_error`]
/// and returns its result, so accumulation and boolean mode are honored.
pub trait Operator: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn match_value(&self, ctx: &Context, got: &Value) -> Result<(), Box<Error>>;

    /// The concrete type this operator compares against, when known.
    fn type_behind(&self) -> Option<Type> {
        None
    }

    fn location(&self) -> Option<&Location> {
        None
    }

    /// Whether `match_value` accepts an absent got value.
    fn handle_invalid(&self) -> bool {
        false
    }

    /// Text shown on the `expected:` line.
    fn describe(&self) -> String {
        format!("{}()", self.name())
    }
}

/// Name and construction site, embedded by operator implementations.
#[derive(Debug, Clone)]
pub struct OpBase {
    pub name: &'static str,
    pub location: Location,
}

impl OpBase {
    #[track_caller]
    pub fn new(name: &'static str) -> Self {
        OpBase {
            name,
            location: Location::capture(name),
        }
    }
}

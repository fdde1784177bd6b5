//! The `JSON` operator: an expected value written as extended JSON.

use tdeep_core::deep::deep_value_equal;
use tdeep_core::{Context, Error, Location, OpBase, Operator, Type, Value};

use crate::{parse_str, ParseError, ParseOpts};

/// Matches got against the tree parsed from its source, operators and
/// placeholders included.
#[derive(Debug, Clone)]
pub struct Json {
    base: OpBase,
    expected: Value,
}

impl Json {
    /// # Panics
    /// When `src` does not parse.
    #[track_caller]
    pub fn new(src: &str, opts: ParseOpts) -> Self {
        match Json::try_new(src, opts) {
            Ok(json) => json,
            Err(e) => panic!("JSON(): bad usage: {}", e),
        }
    }

    #[track_caller]
    pub fn try_new(src: &str, opts: ParseOpts) -> Result<Self, ParseError> {
        let base = OpBase::new("JSON");
        let expected = parse_str(src, &opts)?;
        Ok(Json { base, expected })
    }

    pub fn expected(&self) -> &Value {
        &self.expected
    }
}

impl Operator for Json {
    fn name(&self) -> &str {
        self.base.name
    }

    fn match_value(&self, ctx: &Context, got: &Value) -> Result<(), Box<Error>> {
        deep_value_equal(ctx, got, &self.expected)
    }

    fn type_behind(&self) -> Option<Type> {
        self.expected.type_of()
    }

    fn location(&self) -> Option<&Location> {
        Some(&self.base.location)
    }

    fn handle_invalid(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("JSON({})", self.expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdeep_core::operators::op;

    #[test]
    fn null_document_matches_nil() {
        let json = Json::new("null", ParseOpts::default());
        assert!(deep_value_equal(&Context::default(), &Value::Invalid, &op(json)).is_ok());
    }

    #[test]
    fn describe_shows_parsed_tree() {
        let json = Json::new("[1, \"a\"]", ParseOpts::default());
        assert!(json.describe().starts_with("JSON("));
        assert_eq!(json.type_behind().map(|t| t.to_string()).as_deref(), Some("[]interface {}"));
    }

    #[test]
    #[should_panic(expected = "JSON(): bad usage")]
    fn bad_source_panics() {
        Json::new("{", ParseOpts::default());
    }
}

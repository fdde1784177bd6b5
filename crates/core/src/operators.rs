//! A small set of operators built on the [`Operator`] contract.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::ctxerr::{Context, Error, Location};
use crate::deep::deep_value_equal;
use crate::operator::{OpBase, Operator};
use crate::ordering;
use crate::types::Type;
use crate::value::Value;

// ──────────────────────────────────────────────
// Ignore
// ──────────────────────────────────────────────

/// Matches anything, nil included.
#[derive(Debug, Clone)]
pub struct Ignore {
    base: OpBase,
}

impl Ignore {
    #[track_caller]
    pub fn new() -> Self {
        Ignore {
            base: OpBase::new("Ignore"),
        }
    }
}

impl Default for Ignore {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for Ignore {
    fn name(&self) -> &str {
        self.base.name
    }

    fn match_value(&self, _ctx: &Context, _got: &Value) -> Result<(), Box<Error>> {
        Ok(())
    }

    fn location(&self) -> Option<&Location> {
        Some(&self.base.location)
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

// ──────────────────────────────────────────────
// NotZero
// ──────────────────────────────────────────────

/// Matches any value that is not the zero value of its type.
#[derive(Debug, Clone)]
pub struct NotZero {
    base: OpBase,
}

impl NotZero {
    #[track_caller]
    pub fn new() -> Self {
        NotZero {
            base: OpBase::new("NotZero"),
        }
    }
}

impl Default for NotZero {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for NotZero {
    fn name(&self) -> &str {
        self.base.name
    }

    fn match_value(&self, ctx: &Context, got: &Value) -> Result<(), Box<Error>> {
        if !got.is_zero() {
            return Ok(());
        }
        ctx.collect_error(
            Error::new("zero value")
                .with_got(got)
                .with_expected_raw(self.describe()),
        )
    }

    fn location(&self) -> Option<&Location> {
        Some(&self.base.location)
    }

    fn handle_invalid(&self) -> bool {
        true
    }
}

// ──────────────────────────────────────────────
// Between
// ──────────────────────────────────────────────

/// Matches values of `from`'s type with `from ≤ got ≤ to`.
#[derive(Debug, Clone)]
pub struct Between {
    base: OpBase,
    from: Value,
    to: Value,
}

impl Between {
    /// # Panics
    /// When `from` and `to` do not share a type.
    #[track_caller]
    pub fn new(from: Value, to: Value) -> Self {
        assert!(
            from.ty().is_some() && from.ty() == to.ty(),
            "Between: from and to must have the same type, got {} and {}",
            from,
            to
        );
        let (from, to) = match ordering::cmp(&from, &to) {
            Ordering::Greater => (to, from),
            _ => (from, to),
        };
        Between {
            base: OpBase::new("Between"),
            from,
            to,
        }
    }
}

impl Operator for Between {
    fn name(&self) -> &str {
        self.base.name
    }

    fn match_value(&self, ctx: &Context, got: &Value) -> Result<(), Box<Error>> {
        if got.ty() != self.from.ty() {
            let got_ty = got.ty().map(|t| t.to_string()).unwrap_or_else(|| "nil".into());
            let expected_ty = self.from.ty().map(|t| t.to_string()).unwrap_or_default();
            return ctx.collect_error(
                Error::new("type mismatch")
                    .with_got_raw(got_ty)
                    .with_expected_raw(expected_ty),
            );
        }
        let below = ordering::cmp(got, &self.from) == Ordering::Less;
        let above = ordering::cmp(got, &self.to) == Ordering::Greater;
        if !below && !above {
            return Ok(());
        }
        ctx.collect_error(
            Error::new("values differ")
                .with_got(got)
                .with_expected_raw(self.describe()),
        )
    }

    fn type_behind(&self) -> Option<Type> {
        self.from.type_of()
    }

    fn location(&self) -> Option<&Location> {
        Some(&self.base.location)
    }

    fn describe(&self) -> String {
        format!("{} ≤ got ≤ {}", self.from, self.to)
    }
}

// ──────────────────────────────────────────────
// All
// ──────────────────────────────────────────────

/// Matches when every item matches; the first failing item is reported
/// with its own error as origin.
#[derive(Debug, Clone)]
pub struct All {
    base: OpBase,
    items: Vec<Value>,
}

impl All {
    #[track_caller]
    pub fn new(items: Vec<Value>) -> Self {
        All {
            base: OpBase::new("All"),
            items,
        }
    }
}

impl Operator for All {
    fn name(&self) -> &str {
        self.base.name
    }

    fn match_value(&self, ctx: &Context, got: &Value) -> Result<(), Box<Error>> {
        let total = self.items.len();
        for (idx, item) in self.items.iter().enumerate() {
            let sub = ctx
                .reset_errors()
                .add_custom_level(&format!(" <All#{}/{}>", idx + 1, total));
            let Err(origin) = deep_value_equal(&sub, got, item) else {
                continue;
            };
            if ctx.boolean_error {
                return Err(Error::boolean());
            }
            let mut err = Error::new(format!("compared (part {} of {})", idx + 1, total))
                .with_got(got)
                .with_expected(item);
            if item.is_operator() {
                err = err.with_origin(origin);
            }
            return ctx.collect_error(err);
        }
        Ok(())
    }

    fn type_behind(&self) -> Option<Type> {
        self.items
            .iter()
            .find_map(|item| match item {
                Value::Operator(op) => op.type_behind(),
                v => v.type_of(),
            })
    }

    fn location(&self) -> Option<&Location> {
        Some(&self.base.location)
    }

    fn handle_invalid(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        let items: Vec<String> = self.items.iter().map(|i| i.to_string()).collect();
        format!("All({})", items.join(",\n    "))
    }
}

/// Shorthand for `Value::Operator(Arc::new(op))`.
pub fn op<O: Operator + 'static>(op: O) -> Value {
    Value::Operator(Arc::new(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(op: impl Operator + 'static, got: Value) -> Result<(), Box<Error>> {
        let ctx = Context::default();
        deep_value_equal(&ctx, &got, &Value::op(op))
    }

    #[test]
    fn ignore_accepts_nil() {
        assert!(check(Ignore::new(), Value::Invalid).is_ok());
        assert!(check(Ignore::new(), 12.into()).is_ok());
    }

    #[test]
    fn not_zero() {
        assert!(check(NotZero::new(), 12.into()).is_ok());
        let err = check(NotZero::new(), 0.into()).expect_err("zero");
        assert_eq!(err.message, "zero value");
        assert!(err.location.is_some());
        assert!(check(NotZero::new(), Value::Invalid).is_err());
    }

    #[test]
    fn between_bounds_are_inclusive() {
        let b = || Between::new(3.into(), 1.into());
        assert!(check(b(), 1.into()).is_ok());
        assert!(check(b(), 3.into()).is_ok());
        let err = check(b(), 4.into()).expect_err("above");
        assert_eq!(err.message, "values differ");
        assert_eq!(err.expected.map(|e| e.to_string()).as_deref(), Some("1 ≤ got ≤ 3"));
        let err = check(b(), "2".into()).expect_err("type");
        assert_eq!(err.message, "type mismatch");
    }

    #[test]
    fn all_reports_origin() {
        let all = All::new(vec![op(NotZero::new()), op(Between::new(1.into(), 5.into()))]);
        assert!(check(all.clone(), 3.into()).is_ok());
        let err = check(all, 7.into()).expect_err("out of range");
        assert_eq!(err.message, "compared (part 2 of 2)");
        let origin = err.origin.expect("origin");
        assert_eq!(
            origin.path.map(|p| p.to_string()).as_deref(),
            Some("DATA <All#2/2>")
        );
    }
}

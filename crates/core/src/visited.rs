//! Cycle detection for reference-shaped values.

use std::collections::HashSet;

use crate::types::{Kind, Type};
use crate::value::Value;

/// Set of `(lower address, higher address, type)` triples already compared
/// during one top-level call.
#[derive(Debug, Default)]
pub struct Visited {
    seen: HashSet<(usize, usize, Type)>,
}

impl Visited {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pair `(a, b)` and returns `true` when it was already
    /// recorded. Only pointers, maps, non-nil slices and non-nil interfaces
    /// take part; every other kind returns `false`.
    ///
    /// Both values are expected to have the same type.
    pub fn record(&mut self, a: &Value, b: &Value) -> bool {
        match a.kind() {
            Kind::Ptr | Kind::Map | Kind::Slice | Kind::Interface => {}
            _ => return false,
        }
        if a.is_nil() || b.is_nil() {
            return false;
        }
        let ty = match a.ty() {
            Some(t) => t.clone(),
            None => return false,
        };
        let (x, y) = (a.addr(), b.addr());
        !self.seen.insert((x.min(y), x.max(y), ty))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_unordered() {
        let mut v = Visited::new();
        let a = Value::ptr(1.into());
        let b = Value::ptr(1.into());
        assert!(!v.record(&a, &b));
        assert!(v.record(&b, &a));
        assert!(v.record(&a, &b));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn value_kinds_are_never_recorded() {
        let mut v = Visited::new();
        let (a, b) = (Value::from(1), Value::from(1));
        assert!(!v.record(&a, &b));
        assert!(!v.record(&a, &b));
        assert!(v.is_empty());
    }

    #[test]
    fn nil_slices_are_skipped() {
        let mut v = Visited::new();
        let a = Value::nil_slice(&Type::int());
        let b = Value::slice(&Type::int(), vec![]);
        assert!(!v.record(&a, &b));
        assert!(!v.record(&a, &b));
        let c = b.clone();
        assert!(!v.record(&b, &c));
        assert!(v.record(&b, &c));
    }
}

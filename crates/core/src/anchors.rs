//! Sentinel values standing in for operators inside literal structures.
//!
//! `add_anchor` manufactures a value of the requested type that is very
//! unlikely to appear in real data, and remembers which operator it stands
//! for. During traversal the engine resolves expected values through the
//! registry before comparing them literally.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::debug;

use crate::operator::Operator;
use crate::types::{Kind, Type};
use crate::value::{Complex, Value};

/// Builds the `n`th anchor of a struct type.
pub type StructBuilder = Arc<dyn Fn(usize) -> Value + Send + Sync>;

/// Hashable projection of a value: the value itself for comparable
/// scalars, the address for references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HashKey {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(u64),
    Complex(u64, u64),
    Str(String),
    Addr(usize),
    Seq(Vec<HashKey>),
}

fn hash_key(v: &Value) -> Option<HashKey> {
    Some(match v {
        Value::Bool(_, b) => HashKey::Bool(*b),
        Value::Int(_, i) => HashKey::Int(*i),
        Value::Uint(_, u) => HashKey::Uint(*u),
        Value::Float(_, f) => HashKey::Float(f.to_bits()),
        Value::Complex(_, c) => HashKey::Complex(c.re.to_bits(), c.im.to_bits()),
        Value::String(_, s) => HashKey::Str(s.clone()),
        Value::UnsafePointer(_, a) => HashKey::Addr(*a),
        Value::Ptr(..) | Value::Chan(..) => match v.addr() {
            0 => HashKey::Nil,
            a => HashKey::Addr(a),
        },
        Value::Array(_, items) | Value::Struct(_, items) => {
            HashKey::Seq(items.iter().map(hash_key).collect::<Option<_>>()?)
        }
        Value::Interface(_, None) => HashKey::Nil,
        Value::Interface(_, Some(inner)) => hash_key(inner)?,
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AnchorKey {
    ty: Type,
    key: HashKey,
}

struct Anchor {
    /// Keeps reference-shaped sentinels alive so their address stays unique.
    _sentinel: Value,
    op: Arc<dyn Operator>,
}

#[derive(Default)]
struct Inner {
    anchors: HashMap<AnchorKey, Anchor>,
    persist: bool,
    next: usize,
    builders: HashMap<Type, StructBuilder>,
}

#[derive(Default)]
pub struct AnchorRegistry {
    inner: Mutex<Inner>,
}

impl fmt::Debug for AnchorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("AnchorRegistry")
            .field("anchors", &inner.anchors.len())
            .field("persist", &inner.persist)
            .finish()
    }
}

fn int_sentinel(bits: u32, n: usize, ty: &Type) -> i64 {
    let min = if bits >= 64 {
        i64::MIN
    } else {
        -(1i64 << (bits - 1))
    };
    match i64::try_from(n)
        .ok()
        .and_then(|n| min.checked_add(1)?.checked_add(n))
    {
        Some(v) if v < 0 => v,
        _ => panic!("too many anchors of type {}", ty),
    }
}

fn uint_sentinel(bits: u32, n: usize, ty: &Type) -> u64 {
    let max = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    match u64::try_from(n)
        .ok()
        .and_then(|n| max.checked_sub(1)?.checked_sub(n))
    {
        Some(v) if v > max / 2 => v,
        _ => panic!("too many anchors of type {}", ty),
    }
}

/// Representable values just above the lowest finite float.
fn float_sentinel(bits: u32, n: usize) -> f64 {
    if bits == 32 {
        f32::from_bits((-f32::MAX).to_bits() - 1 - n as u32) as f64
    } else {
        f64::from_bits((-f64::MAX).to_bits() - 1 - n as u64)
    }
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers how anchors of the struct type `ty` are built. The builder
    /// receives a counter distinct for every anchor and must return a value
    /// of type `ty` made of comparable fields.
    ///
    /// # Panics
    /// When `ty` is not a struct type.
    pub fn add_anchorable_struct_type<F>(&self, ty: &Type, builder: F)
    where
        F: Fn(usize) -> Value + Send + Sync + 'static,
    {
        assert_eq!(
            ty.kind(),
            Kind::Struct,
            "add_anchorable_struct_type: {} is not a struct type",
            ty
        );
        debug!(type_name = %ty, "registering anchorable struct type");
        self.lock().builders.insert(ty.clone(), Arc::new(builder));
    }

    /// Returns a fresh sentinel of type `ty` standing for `op`.
    ///
    /// # Panics
    /// When `ty` cannot be anchored: bool, func, interface and array types,
    /// struct types without a builder, or struct builders returning a value
    /// that is not comparable.
    pub fn add_anchor(&self, ty: &Type, op: Arc<dyn Operator>) -> Value {
        let kind = ty.kind();
        // The lock is released before a struct builder runs, so builders
        // may use the registry themselves.
        let (n, builder) = {
            let mut inner = self.lock();
            let n = inner.next;
            inner.next += 1;
            let builder = match kind {
                Kind::Struct => match inner.builders.get(ty) {
                    Some(b) => Some(b.clone()),
                    None => panic!(
                        "{} struct type is not supported as an anchor. Try add_anchorable_struct_type",
                        ty
                    ),
                },
                _ => None,
            };
            (n, builder)
        };
        let t = ty.clone();
        let sentinel = match (kind, builder) {
            (k, _) if k.is_int() => Value::Int(t, int_sentinel(k.bits(), n, ty)),
            (k, _) if k.is_uint() => Value::Uint(t, uint_sentinel(k.bits(), n, ty)),
            (Kind::Float32 | Kind::Float64, _) => Value::Float(t, float_sentinel(kind.bits(), n)),
            (Kind::Complex64 | Kind::Complex128, _) => {
                let part = float_sentinel(kind.bits() / 2, n);
                Value::Complex(t, Complex::new(part, part))
            }
            (Kind::String, _) => Value::String(t, format!("<tdeep anchor #{}>", n)),
            (Kind::Ptr, _) => Value::Ptr(t, Some(Arc::new(OnceLock::new()))),
            (Kind::Map, _) => Value::Map(t, Some(Arc::new(Vec::new()))),
            (Kind::Slice, _) => Value::Slice(t, Some(Arc::new(Vec::new()))),
            (Kind::Chan, _) => Value::Chan(t, Some(Arc::new(()))),
            (Kind::Struct, Some(builder)) => {
                let v = builder(n);
                assert!(
                    v.ty() == Some(ty),
                    "anchor builder of {} returned a {} value",
                    ty,
                    v.ty().map(|t| t.to_string()).unwrap_or_else(|| "nil".into())
                );
                v
            }
            _ => panic!("{} kind is not supported as an anchor", kind),
        };

        let key = match hash_key(&sentinel) {
            Some(key) => key,
            None => panic!("{} type is not comparable, it cannot be an anchor", ty),
        };
        let anchor_key = AnchorKey {
            ty: ty.clone(),
            key,
        };
        let mut inner = self.lock();
        if inner.anchors.contains_key(&anchor_key) {
            panic!("anchor builder of {} returned an already used value", ty);
        }
        debug!(type_name = %ty, operator = op.name(), anchor = n, "anchor added");
        inner.anchors.insert(
            anchor_key,
            Anchor {
                _sentinel: sentinel.clone(),
                op,
            },
        );
        sentinel
    }

    /// The operator `v` stands for, when `v` is a registered anchor.
    pub fn resolve_anchor(&self, v: &Value) -> Option<Arc<dyn Operator>> {
        let inner = self.lock();
        if inner.anchors.is_empty() {
            return None;
        }
        let key = AnchorKey {
            ty: v.ty()?.clone(),
            key: hash_key(v)?,
        };
        inner.anchors.get(&key).map(|a| a.op.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().anchors.is_empty()
    }

    /// Keeps anchors across comparisons until a forced reset.
    pub fn set_anchors_persist(&self, persist: bool) {
        self.lock().persist = persist;
    }

    pub fn anchors_persist(&self) -> bool {
        self.lock().persist
    }

    /// Forgets every anchor, unless they persist and `force` is not set.
    pub fn reset_anchors(&self, force: bool) {
        let mut inner = self.lock();
        if inner.persist && !force {
            return;
        }
        if !inner.anchors.is_empty() {
            debug!(count = inner.anchors.len(), "resetting anchors");
        }
        inner.anchors.clear();
        inner.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{Ignore, NotZero};
    use crate::types::FieldDef;

    fn op() -> Arc<dyn Operator> {
        Arc::new(NotZero::new())
    }

    #[test]
    fn numeric_sentinels_are_distinct_and_extreme() {
        let reg = AnchorRegistry::new();
        let a = reg.add_anchor(&Type::int(), op());
        let b = reg.add_anchor(&Type::int(), op());
        assert!(matches!(a, Value::Int(_, v) if v == i64::MIN + 1));
        assert!(matches!(b, Value::Int(_, v) if v == i64::MIN + 2));

        let c = reg.add_anchor(&Type::uint8(), op());
        assert!(matches!(c, Value::Uint(_, v) if v == 255 - 1 - 2));

        let d = reg.add_anchor(&Type::float64(), op());
        assert!(matches!(d, Value::Float(_, f) if f > -f64::MAX && f < -1e307));
    }

    #[test]
    fn resolution_is_keyed_by_type() {
        let reg = AnchorRegistry::new();
        let a = reg.add_anchor(&Type::int(), op());
        assert!(reg.resolve_anchor(&a).is_some());
        assert!(reg.resolve_anchor(&Value::Int(Type::int64(), i64::MIN + 1)).is_none());
        assert!(reg.resolve_anchor(&0.into()).is_none());
    }

    #[test]
    fn strings_and_references() {
        let reg = AnchorRegistry::new();
        let s = reg.add_anchor(&Type::string(), op());
        assert_eq!(s.as_str(), Some("<tdeep anchor #0>"));
        let p = reg.add_anchor(&Type::ptr_to(&Type::int()), Arc::new(Ignore::new()));
        assert!(reg.resolve_anchor(&p).is_some());
        assert!(reg
            .resolve_anchor(&Value::ptr(0.into()))
            .is_none());
    }

    #[test]
    fn struct_anchors_need_a_builder() {
        let t = Type::new_struct("main", "Point");
        t.define_fields(vec![
            FieldDef::new("X", Type::int()),
            FieldDef::new("Y", Type::int()),
        ]);
        let reg = AnchorRegistry::new();
        let tt = t.clone();
        reg.add_anchorable_struct_type(&t, move |n| {
            Value::structure(&tt, vec![Value::from(i64::MIN + n as i64), 0.into()])
        });
        let a = reg.add_anchor(&t, op());
        assert!(reg.resolve_anchor(&a).is_some());
    }

    #[test]
    fn struct_builders_may_use_the_registry() {
        let t = Type::new_struct("main", "Pair");
        t.define_fields(vec![FieldDef::new("A", Type::int())]);
        let reg = Arc::new(AnchorRegistry::new());
        let (tt, inner_reg) = (t.clone(), Arc::downgrade(&reg));
        reg.add_anchorable_struct_type(&t, move |_| {
            let a = match inner_reg.upgrade() {
                Some(reg) => reg.add_anchor(&Type::int(), Arc::new(Ignore::new())),
                None => Value::from(0),
            };
            Value::structure(&tt, vec![a])
        });
        let pair = reg.add_anchor(&t, op());
        assert!(reg.resolve_anchor(&pair).is_some());
        assert!(reg
            .resolve_anchor(&Value::Int(Type::int(), i64::MIN + 2))
            .is_some());
    }

    #[test]
    #[should_panic(expected = "struct type is not supported as an anchor")]
    fn unregistered_struct_panics() {
        let t = Type::new_struct("main", "Other");
        t.define_fields(vec![]);
        AnchorRegistry::new().add_anchor(&t, op());
    }

    #[test]
    #[should_panic(expected = "bool kind is not supported")]
    fn bool_panics() {
        AnchorRegistry::new().add_anchor(&Type::bool(), op());
    }

    #[test]
    fn reset_respects_persistence() {
        let reg = AnchorRegistry::new();
        reg.set_anchors_persist(true);
        let a = reg.add_anchor(&Type::int(), op());
        reg.reset_anchors(false);
        assert!(reg.resolve_anchor(&a).is_some());
        reg.reset_anchors(true);
        assert!(reg.resolve_anchor(&a).is_none());
        assert!(reg.is_empty());
    }
}

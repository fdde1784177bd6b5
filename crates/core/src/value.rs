//! Dynamic values compared by the engine.
//!
//! `Value` is a closed sum over every shape the engine knows how to walk.
//! Reference-shaped payloads (`Pointer`, `SliceRef`, `MapRef`, `Handle`)
//! are shared `Arc`s: their address is the identity used for cycle
//! detection, ordering tie-breaks and anchors.

use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::sync::{Arc, OnceLock};

use crate::operator::Operator;
use crate::ordering;
use crate::types::{Kind, Type};
use crate::visited::Visited;

/// Shared set-once pointee cell. An unset cell dereferences to the zero
/// value of the pointer's element type.
///
/// Cells are reference counted: a cycle built through [`Value::new_pointer`]
/// is never freed. Keep cyclic graphs short-lived.
pub type Pointer = Arc<OnceLock<Value>>;

/// Shared slice buffer.
pub type SliceRef = Arc<Vec<Value>>;

/// Shared map entries, in insertion order.
pub type MapRef = Arc<Vec<(Value, Value)>>;

/// Opaque identity of a func or chan value.
pub type Handle = Arc<()>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.im.is_sign_negative() || self.im.is_nan() {
            ""
        } else {
            "+"
        };
        write!(
            f,
            "({}{}{}i)",
            format_float(self.re),
            sign,
            format_float(self.im)
        )
    }
}

/// A runtime value. Every variant but `Invalid` and `Operator` carries its type.
#[derive(Clone)]
pub enum Value {
    /// Absent value or untyped nil.
    Invalid,
    Bool(Type, bool),
    Int(Type, i64),
    Uint(Type, u64),
    Float(Type, f64),
    Complex(Type, Complex),
    String(Type, String),
    Array(Type, Vec<Value>),
    Slice(Type, Option<SliceRef>),
    Map(Type, Option<MapRef>),
    Struct(Type, Vec<Value>),
    Ptr(Type, Option<Pointer>),
    Interface(Type, Option<Box<Value>>),
    Func(Type, Option<Handle>),
    Chan(Type, Option<Handle>),
    UnsafePointer(Type, usize),
    /// A live matcher, only meaningful on the expected side.
    Operator(Arc<dyn Operator>),
}

static INVALID: Value = Value::Invalid;

impl Value {
    // ──────────────────────────────────────────────
    // Constructors
    // ──────────────────────────────────────────────

    pub fn slice(elem: &Type, items: Vec<Value>) -> Value {
        Value::Slice(Type::slice_of(elem), Some(Arc::new(items)))
    }

    pub fn nil_slice(elem: &Type) -> Value {
        Value::Slice(Type::slice_of(elem), None)
    }

    pub fn array(elem: &Type, items: Vec<Value>) -> Value {
        Value::Array(Type::array_of(elem, items.len()), items)
    }

    pub fn map(key: &Type, value: &Type, entries: Vec<(Value, Value)>) -> Value {
        Value::Map(Type::map_of(key, value), Some(Arc::new(entries)))
    }

    pub fn nil_map(key: &Type, value: &Type) -> Value {
        Value::Map(Type::map_of(key, value), None)
    }

    /// A struct value, fields given in declaration order.
    ///
    /// # Panics
    /// When `ty` is not a struct type or the field count does not match.
    pub fn structure(ty: &Type, fields: Vec<Value>) -> Value {
        assert_eq!(
            ty.kind(),
            Kind::Struct,
            "cannot build a struct value of type {}",
            ty
        );
        assert_eq!(
            ty.fields().len(),
            fields.len(),
            "{} has {} fields, {} given",
            ty,
            ty.fields().len(),
            fields.len()
        );
        Value::Struct(ty.clone(), fields)
    }

    /// A pointer to a fresh copy of `v`.
    ///
    /// # Panics
    /// When `v` is invalid or an operator.
    pub fn ptr(v: Value) -> Value {
        let ty = match v.ty() {
            Some(t) => Type::ptr_to(t),
            None => panic!("cannot take the address of {}", v),
        };
        let cell = OnceLock::new();
        let _ = cell.set(v);
        Value::Ptr(ty, Some(Arc::new(cell)))
    }

    pub fn nil_ptr(elem: &Type) -> Value {
        Value::Ptr(Type::ptr_to(elem), None)
    }

    /// A pointer whose pointee is set later through the returned cell,
    /// which is how cyclic graphs are built. Such cycles leak, see [`Pointer`].
    pub fn new_pointer(elem: &Type) -> (Value, Pointer) {
        let cell: Pointer = Arc::new(OnceLock::new());
        (Value::Ptr(Type::ptr_to(elem), Some(cell.clone())), cell)
    }

    /// Wraps `v` in the empty interface.
    pub fn any(v: Value) -> Value {
        Value::iface(&Type::any(), v)
    }

    /// Wraps `v` in the interface type `ty`; an invalid `v` gives a nil interface.
    pub fn iface(ty: &Type, v: Value) -> Value {
        match v {
            Value::Invalid => Value::Interface(ty.clone(), None),
            v => Value::Interface(ty.clone(), Some(Box::new(v))),
        }
    }

    pub fn nil_any() -> Value {
        Value::Interface(Type::any(), None)
    }

    /// A non-nil func value with a fresh identity.
    pub fn func(ty: &Type) -> Value {
        Value::Func(ty.clone(), Some(Arc::new(())))
    }

    /// A non-nil chan value with a fresh identity.
    pub fn chan(elem: &Type) -> Value {
        Value::Chan(Type::chan_of(elem), Some(Arc::new(())))
    }

    pub fn op<O: Operator + 'static>(op: O) -> Value {
        Value::Operator(Arc::new(op))
    }

    // ──────────────────────────────────────────────
    // Introspection
    // ──────────────────────────────────────────────

    /// The dynamic type. `None` for invalid values and operators.
    pub fn ty(&self) -> Option<&Type> {
        match self {
            Value::Invalid | Value::Operator(_) => None,
            Value::Bool(t, _)
            | Value::Int(t, _)
            | Value::Uint(t, _)
            | Value::Float(t, _)
            | Value::Complex(t, _)
            | Value::String(t, _)
            | Value::Array(t, _)
            | Value::Slice(t, _)
            | Value::Map(t, _)
            | Value::Struct(t, _)
            | Value::Ptr(t, _)
            | Value::Interface(t, _)
            | Value::Func(t, _)
            | Value::Chan(t, _)
            | Value::UnsafePointer(t, _) => Some(t),
        }
    }

    /// The dynamic type, operators reporting a dedicated marker type.
    pub fn type_of(&self) -> Option<Type> {
        match self {
            Value::Operator(_) => Some(Type::operator_marker()),
            v => v.ty().cloned(),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Invalid => Kind::Invalid,
            Value::Operator(_) => Kind::Interface,
            v => v.ty().map(Type::kind).unwrap_or(Kind::Invalid),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Value::Invalid)
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Value::Operator(_))
    }

    pub fn as_operator(&self) -> Option<&Arc<dyn Operator>> {
        match self {
            Value::Operator(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Value::Invalid
                | Value::Slice(_, None)
                | Value::Map(_, None)
                | Value::Ptr(_, None)
                | Value::Interface(_, None)
                | Value::Func(_, None)
                | Value::Chan(_, None)
        )
    }

    /// Identity of reference-shaped values, 0 for nil and value-shaped ones.
    pub fn addr(&self) -> usize {
        match self {
            Value::Slice(_, Some(s)) => Arc::as_ptr(s) as usize,
            Value::Map(_, Some(m)) => Arc::as_ptr(m) as usize,
            Value::Ptr(_, Some(p)) => Arc::as_ptr(p) as usize,
            Value::Func(_, Some(h)) | Value::Chan(_, Some(h)) => Arc::as_ptr(h) as usize,
            Value::Interface(_, Some(b)) => &**b as *const Value as usize,
            Value::UnsafePointer(_, a) => *a,
            _ => 0,
        }
    }

    /// Number of elements of arrays, slices, maps and bytes of strings.
    pub fn len(&self) -> usize {
        match self {
            Value::String(_, s) => s.len(),
            Value::Array(_, items) => items.len(),
            Value::Slice(_, Some(items)) => items.len(),
            Value::Map(_, Some(entries)) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Invalid => true,
            Value::Operator(_) => false,
            Value::Bool(_, b) => !b,
            Value::Int(_, i) => *i == 0,
            Value::Uint(_, u) => *u == 0,
            Value::Float(_, f) => *f == 0.0,
            Value::Complex(_, c) => c.re == 0.0 && c.im == 0.0,
            Value::String(_, s) => s.is_empty(),
            Value::UnsafePointer(_, a) => *a == 0,
            Value::Array(_, items) | Value::Struct(_, items) => items.iter().all(Value::is_zero),
            v => v.is_nil(),
        }
    }

    /// Whether an unexported value of this shape can still be copied out
    /// and handed to user code.
    pub fn is_copyable(&self) -> bool {
        match self {
            Value::Bool(..)
            | Value::Int(..)
            | Value::Uint(..)
            | Value::Float(..)
            | Value::Complex(..)
            | Value::String(..) => true,
            Value::Array(_, items) | Value::Struct(_, items) => items.iter().all(Value::is_copyable),
            _ => false,
        }
    }

    /// Pointee of a pointer, content of an interface.
    pub fn elem(&self) -> Option<Cow<'_, Value>> {
        match self {
            Value::Ptr(t, Some(cell)) => Some(match cell.get() {
                Some(v) => Cow::Borrowed(v),
                None => Cow::Owned(t.elem().map(Type::zero).unwrap_or(Value::Invalid)),
            }),
            Value::Interface(_, Some(v)) => Some(Cow::Borrowed(v)),
            _ => None,
        }
    }

    /// Content of an interface, or [`Value::Invalid`] for a nil one.
    pub fn elem_or_invalid(&self) -> &Value {
        match self {
            Value::Interface(_, Some(v)) => v,
            _ => &INVALID,
        }
    }

    pub fn field(&self, i: usize) -> Option<&Value> {
        match self {
            Value::Struct(_, fields) => fields.get(i),
            _ => None,
        }
    }

    pub fn index(&self, i: usize) -> Option<&Value> {
        self.items().and_then(|items| items.get(i))
    }

    /// Elements of arrays and non-nil slices.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Array(_, items) => Some(items),
            Value::Slice(_, Some(items)) => Some(items),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        match self {
            Value::Map(_, Some(entries)) => entries,
            _ => &[],
        }
    }

    /// Looks a key up using value ordering equality.
    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        self.entries().iter().find_map(|(k, v)| {
            let mut visited = Visited::new();
            ordering::compare(&mut visited, k, key)
                .is_eq()
                .then_some(v)
        })
    }

    /// Map keys sorted by value ordering.
    pub fn sorted_keys(&self) -> Vec<&Value> {
        let mut keys: Vec<&Value> = self.entries().iter().map(|(k, _)| k).collect();
        ordering::sort(&mut keys);
        keys
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(_, s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content as `f64` for int, uint and float kinds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(_, i) => Some(*i as f64),
            Value::Uint(_, u) => Some(*u as f64),
            Value::Float(_, f) => Some(*f),
            _ => None,
        }
    }

    // ──────────────────────────────────────────────
    // JSON
    // ──────────────────────────────────────────────

    /// Builds the generic tree a JSON decoder produces: `nil`, `bool`,
    /// `float64`, `string`, `[]interface {}` and `map[string]interface {}`,
    /// every composite element wrapped in `interface {}`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Invalid,
            serde_json::Value::Bool(b) => Value::from(*b),
            serde_json::Value::Number(n) => Value::from(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => Value::slice(
                &Type::any(),
                items
                    .iter()
                    .map(|item| Value::any(Value::from_json(item)))
                    .collect(),
            ),
            serde_json::Value::Object(obj) => Value::map(
                &Type::string(),
                &Type::any(),
                obj.iter()
                    .map(|(k, v)| (Value::from(k.as_str()), Value::any(Value::from_json(v))))
                    .collect(),
            ),
        }
    }
}

// ──────────────────────────────────────────────
// Conversions
// ──────────────────────────────────────────────

macro_rules! from_scalar {
    ($variant:ident, $ctor:ident, $cast:ty; $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(Type::$ctor(), v as $cast)
                }
            }
        )*
    };
}

// Untyped integer literals are `i32` in Rust, so `i32` maps to `int` like
// untyped constants do; `int32` values are built explicitly.
from_scalar!(Int, int, i64; i32, i64, isize);
from_scalar!(Int, int8, i64; i8);
from_scalar!(Int, int16, i64; i16);
from_scalar!(Uint, uint, u64; u64, usize);
from_scalar!(Uint, uint8, u64; u8);
from_scalar!(Uint, uint16, u64; u16);
from_scalar!(Uint, uint32, u64; u32);
from_scalar!(Float, float32, f64; f32);
from_scalar!(Float, float64, f64; f64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(Type::bool(), v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Type::string(), v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Type::string(), v)
    }
}

impl From<Complex> for Value {
    fn from(v: Complex) -> Self {
        Value::Complex(Type::complex128(), v)
    }
}

// ──────────────────────────────────────────────
// Rendering
// ──────────────────────────────────────────────

pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        (if f > 0.0 { "+Inf" } else { "-Inf" }).to_string()
    } else {
        format!("{}", f)
    }
}

struct Printer {
    /// Pointers currently being rendered, to cut cycles.
    stack: Vec<usize>,
}

impl Printer {
    fn render(&mut self, v: &Value) -> String {
        match v {
            Value::Invalid => "nil".to_string(),
            Value::Operator(op) => op.describe(),
            Value::Bool(t, b) => prefixed(t, &Type::bool(), b.to_string()),
            Value::Int(t, i) => prefixed(t, &Type::int(), i.to_string()),
            Value::Uint(t, u) => format!("({}) {}", t, u),
            Value::Float(t, f) => prefixed(t, &Type::float64(), format_float(*f)),
            Value::Complex(t, c) => prefixed(t, &Type::complex128(), c.to_string()),
            Value::String(t, s) => prefixed(t, &Type::string(), format!("{:?}", s)),
            Value::UnsafePointer(t, a) => format!("({})({:#x})", t, a),
            Value::Func(t, h) | Value::Chan(t, h) => match h {
                Some(h) => format!("({})({:#x})", t, Arc::as_ptr(h) as usize),
                None => format!("({})(nil)", t),
            },
            Value::Slice(t, None) | Value::Map(t, None) | Value::Ptr(t, None) => {
                format!("({})(nil)", t)
            }
            Value::Interface(_, None) => "nil".to_string(),
            Value::Interface(_, Some(inner)) => self.render(inner),
            Value::Ptr(t, Some(_)) => {
                let addr = v.addr();
                if self.stack.contains(&addr) {
                    return format!("({})({:#x})", t, addr);
                }
                self.stack.push(addr);
                let inner = match v.elem() {
                    Some(pointee) => self.render(&pointee),
                    None => "nil".to_string(),
                };
                self.stack.pop();
                format!("&{}", inner)
            }
            Value::Array(t, items) => {
                let parts: Vec<String> = items.iter().map(|i| self.render(i)).collect();
                braced(t, parts)
            }
            Value::Slice(t, Some(items)) => {
                let addr = v.addr();
                if self.stack.contains(&addr) {
                    return format!("({})({:#x})", t, addr);
                }
                self.stack.push(addr);
                let parts: Vec<String> = items.iter().map(|i| self.render(i)).collect();
                self.stack.pop();
                braced(t, parts)
            }
            Value::Map(t, Some(_)) => {
                let addr = v.addr();
                if self.stack.contains(&addr) {
                    return format!("({})({:#x})", t, addr);
                }
                self.stack.push(addr);
                let parts: Vec<String> = v
                    .sorted_keys()
                    .into_iter()
                    .map(|k| {
                        let val = v.map_get(k).unwrap_or(&INVALID);
                        format!("{}: {}", self.render(k), self.render(val))
                    })
                    .collect();
                self.stack.pop();
                braced(t, parts)
            }
            Value::Struct(t, fields) => {
                let parts: Vec<String> = t
                    .fields()
                    .iter()
                    .zip(fields)
                    .map(|(def, f)| format!("{}: {}", def.name, self.render(f)))
                    .collect();
                braced(t, parts)
            }
        }
    }
}

fn prefixed(t: &Type, default: &Type, text: String) -> String {
    if t == default {
        text
    } else {
        format!("({}) {}", t, text)
    }
}

fn braced(t: &Type, parts: Vec<String>) -> String {
    if !parts.iter().any(|p| p.contains('\n')) {
        return format!("{}{{{}}}", t, parts.join(", "));
    }
    let mut out = format!("{}{{\n", t);
    for part in parts {
        for line in part.lines() {
            let _ = writeln!(out, "  {}", line);
        }
        // The last line of each element carries the separator.
        out.pop();
        out.push_str(",\n");
    }
    out.push('}');
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer { stack: Vec::new() };
        f.write_str(&printer.render(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

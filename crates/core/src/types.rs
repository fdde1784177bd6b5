//! Type descriptors for dynamically-shaped values.
//!
//! A [`Type`] plays the part a runtime type plays under reflection: it
//! names the shape of a [`Value`], renders Go-like type names for
//! diagnostics and may carry an `Equal`/`Compare` method table.
//!
//! Identity is by rendered full name: two named types are identical when
//! their package path and name match, two unnamed types when their
//! structures match.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::value::{Complex, Value};

// ──────────────────────────────────────────────
// Kinds
// ──────────────────────────────────────────────

/// The flat discriminant of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    Array,
    Slice,
    Map,
    Ptr,
    Struct,
    Interface,
    Func,
    Chan,
    UnsafePointer,
}

const SCALAR_KINDS: [Kind; 19] = [
    Kind::Bool,
    Kind::Int,
    Kind::Int8,
    Kind::Int16,
    Kind::Int32,
    Kind::Int64,
    Kind::Uint,
    Kind::Uint8,
    Kind::Uint16,
    Kind::Uint32,
    Kind::Uint64,
    Kind::Uintptr,
    Kind::Float32,
    Kind::Float64,
    Kind::Complex64,
    Kind::Complex128,
    Kind::String,
    Kind::UnsafePointer,
    Kind::Interface,
];

impl Kind {
    pub fn is_int(self) -> bool {
        matches!(
            self,
            Kind::Int | Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64
        )
    }

    pub fn is_uint(self) -> bool {
        matches!(
            self,
            Kind::Uint | Kind::Uint8 | Kind::Uint16 | Kind::Uint32 | Kind::Uint64 | Kind::Uintptr
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Kind::Float32 | Kind::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, Kind::Complex64 | Kind::Complex128)
    }

    /// Integers, unsigned integers and floats.
    pub fn is_numeric(self) -> bool {
        self.is_int() || self.is_uint() || self.is_float()
    }

    /// Bit width of sized numeric kinds. `int`, `uint` and `uintptr` are 64 bits wide.
    pub fn bits(self) -> u32 {
        match self {
            Kind::Int8 | Kind::Uint8 => 8,
            Kind::Int16 | Kind::Uint16 => 16,
            Kind::Int32 | Kind::Uint32 | Kind::Float32 => 32,
            Kind::Complex64 => 64,
            Kind::Complex128 => 128,
            _ => 64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uintptr => "uintptr",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Slice => "slice",
            Kind::Map => "map",
            Kind::Ptr => "ptr",
            Kind::Struct => "struct",
            Kind::Interface => "interface",
            Kind::Func => "func",
            Kind::Chan => "chan",
            Kind::UnsafePointer => "unsafe.Pointer",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Type descriptors
// ──────────────────────────────────────────────

/// `Equal(T) bool`-shaped method attached to a named type.
pub type EqualMethod = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// `Compare(T) int`-shaped method attached to a named type.
pub type CompareMethod = Arc<dyn Fn(&Value, &Value) -> i32 + Send + Sync>;

/// Qualified name of a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub pkg_path: String,
    pub name: String,
}

impl TypeName {
    fn render(&self, full: bool) -> String {
        if self.pkg_path.is_empty() {
            return self.name.clone();
        }
        let pkg = if full {
            self.pkg_path.as_str()
        } else {
            self.pkg_path
                .rsplit('/')
                .next()
                .unwrap_or(self.pkg_path.as_str())
        };
        format!("{}.{}", pkg, self.name)
    }
}

/// A struct field declaration.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        FieldDef {
            name: name.into(),
            ty,
        }
    }

    /// A field is exported when its name starts with an uppercase letter.
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

/// Structural part of a type.
#[derive(Debug, Clone)]
pub enum TypeRepr {
    Scalar(Kind),
    Array { elem: Type, len: usize },
    Slice { elem: Type },
    Map { key: Type, value: Type },
    Ptr { elem: Type },
    Struct { fields: OnceLock<Vec<FieldDef>> },
    Func { signature: String },
    Chan { elem: Type },
}

#[derive(Clone)]
struct TypeInner {
    name: Option<TypeName>,
    repr: TypeRepr,
    equal: Option<EqualMethod>,
    compare: Option<CompareMethod>,
    short: OnceLock<String>,
    full: OnceLock<String>,
}

/// Runtime type descriptor. Cheap to clone.
#[derive(Clone)]
pub struct Type(Arc<TypeInner>);

impl Type {
    fn from_repr(name: Option<TypeName>, repr: TypeRepr) -> Type {
        Type(Arc::new(TypeInner {
            name,
            repr,
            equal: None,
            compare: None,
            short: OnceLock::new(),
            full: OnceLock::new(),
        }))
    }

    fn builtin(kind: Kind) -> Type {
        static BUILTINS: OnceLock<Vec<Type>> = OnceLock::new();
        let all = BUILTINS.get_or_init(|| {
            SCALAR_KINDS
                .iter()
                .map(|k| Type::from_repr(None, TypeRepr::Scalar(*k)))
                .collect()
        });
        let idx = SCALAR_KINDS
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_else(|| panic!("{} is not a builtin kind", kind));
        all[idx].clone()
    }

    pub fn bool() -> Type {
        Type::builtin(Kind::Bool)
    }
    pub fn int() -> Type {
        Type::builtin(Kind::Int)
    }
    pub fn int8() -> Type {
        Type::builtin(Kind::Int8)
    }
    pub fn int16() -> Type {
        Type::builtin(Kind::Int16)
    }
    pub fn int32() -> Type {
        Type::builtin(Kind::Int32)
    }
    pub fn int64() -> Type {
        Type::builtin(Kind::Int64)
    }
    pub fn uint() -> Type {
        Type::builtin(Kind::Uint)
    }
    pub fn uint8() -> Type {
        Type::builtin(Kind::Uint8)
    }
    pub fn uint16() -> Type {
        Type::builtin(Kind::Uint16)
    }
    pub fn uint32() -> Type {
        Type::builtin(Kind::Uint32)
    }
    pub fn uint64() -> Type {
        Type::builtin(Kind::Uint64)
    }
    pub fn uintptr() -> Type {
        Type::builtin(Kind::Uintptr)
    }
    pub fn float32() -> Type {
        Type::builtin(Kind::Float32)
    }
    pub fn float64() -> Type {
        Type::builtin(Kind::Float64)
    }
    pub fn complex64() -> Type {
        Type::builtin(Kind::Complex64)
    }
    pub fn complex128() -> Type {
        Type::builtin(Kind::Complex128)
    }
    pub fn string() -> Type {
        Type::builtin(Kind::String)
    }
    pub fn unsafe_pointer() -> Type {
        Type::builtin(Kind::UnsafePointer)
    }

    /// The empty interface, `interface {}`.
    pub fn any() -> Type {
        Type::builtin(Kind::Interface)
    }

    /// The predeclared `error` interface.
    pub fn error() -> Type {
        static ERROR: OnceLock<Type> = OnceLock::new();
        ERROR
            .get_or_init(|| Type::named("", "error", &Type::any()))
            .clone()
    }

    /// Pseudo type reported for operator values.
    pub fn operator_marker() -> Type {
        static OPERATOR: OnceLock<Type> = OnceLock::new();
        OPERATOR
            .get_or_init(|| Type::named("tdeep", "Operator", &Type::any()))
            .clone()
    }

    pub fn slice_of(elem: &Type) -> Type {
        Type::from_repr(None, TypeRepr::Slice { elem: elem.clone() })
    }

    pub fn array_of(elem: &Type, len: usize) -> Type {
        Type::from_repr(
            None,
            TypeRepr::Array {
                elem: elem.clone(),
                len,
            },
        )
    }

    pub fn map_of(key: &Type, value: &Type) -> Type {
        Type::from_repr(
            None,
            TypeRepr::Map {
                key: key.clone(),
                value: value.clone(),
            },
        )
    }

    pub fn ptr_to(elem: &Type) -> Type {
        Type::from_repr(None, TypeRepr::Ptr { elem: elem.clone() })
    }

    pub fn chan_of(elem: &Type) -> Type {
        Type::from_repr(None, TypeRepr::Chan { elem: elem.clone() })
    }

    /// A func type; `signature` is rendered after `func`, e.g. `"(int) bool"`.
    pub fn func(signature: impl Into<String>) -> Type {
        Type::from_repr(
            None,
            TypeRepr::Func {
                signature: signature.into(),
            },
        )
    }

    /// An unnamed struct type with its fields.
    pub fn struct_of(fields: Vec<FieldDef>) -> Type {
        let cell = OnceLock::new();
        let _ = cell.set(fields);
        Type::from_repr(None, TypeRepr::Struct { fields: cell })
    }

    /// A named struct type whose fields are attached later with
    /// [`Type::define_fields`], so self-referential shapes can be described.
    pub fn new_struct(pkg_path: impl Into<String>, name: impl Into<String>) -> Type {
        Type::from_repr(
            Some(TypeName {
                pkg_path: pkg_path.into(),
                name: name.into(),
            }),
            TypeRepr::Struct {
                fields: OnceLock::new(),
            },
        )
    }

    /// A named type sharing the structure of `underlying`.
    pub fn named(pkg_path: impl Into<String>, name: impl Into<String>, underlying: &Type) -> Type {
        Type::from_repr(
            Some(TypeName {
                pkg_path: pkg_path.into(),
                name: name.into(),
            }),
            underlying.0.repr.clone(),
        )
    }

    /// Attaches the fields of a struct type created by [`Type::new_struct`].
    ///
    /// # Panics
    /// When the type is not a struct or its fields are already defined.
    pub fn define_fields(&self, fields: Vec<FieldDef>) {
        match &self.0.repr {
            TypeRepr::Struct { fields: cell } => {
                if cell.set(fields).is_err() {
                    panic!("fields of {} are already defined", self);
                }
            }
            _ => panic!("cannot define fields on non-struct type {}", self),
        }
    }

    /// Attaches an `Equal(T) bool` method. Methods must be attached before
    /// the type is shared with other descriptors.
    pub fn with_equal<F>(mut self, f: F) -> Type
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        assert!(
            self.is_named(),
            "methods can only be attached to named types, not {}",
            self
        );
        Arc::make_mut(&mut self.0).equal = Some(Arc::new(f));
        self
    }

    /// Attaches a `Compare(T) int` method, used by value ordering.
    pub fn with_compare<F>(mut self, f: F) -> Type
    where
        F: Fn(&Value, &Value) -> i32 + Send + Sync + 'static,
    {
        assert!(
            self.is_named(),
            "methods can only be attached to named types, not {}",
            self
        );
        Arc::make_mut(&mut self.0).compare = Some(Arc::new(f));
        self
    }

    // -- Accessors ---------------------------------------------

    pub fn kind(&self) -> Kind {
        match &self.0.repr {
            TypeRepr::Scalar(k) => *k,
            TypeRepr::Array { .. } => Kind::Array,
            TypeRepr::Slice { .. } => Kind::Slice,
            TypeRepr::Map { .. } => Kind::Map,
            TypeRepr::Ptr { .. } => Kind::Ptr,
            TypeRepr::Struct { .. } => Kind::Struct,
            TypeRepr::Func { .. } => Kind::Func,
            TypeRepr::Chan { .. } => Kind::Chan,
        }
    }

    pub fn repr(&self) -> &TypeRepr {
        &self.0.repr
    }

    pub fn is_named(&self) -> bool {
        self.0.name.is_some()
    }

    pub fn type_name(&self) -> Option<&TypeName> {
        self.0.name.as_ref()
    }

    /// Element type of arrays, slices, pointers and channels; value type of maps.
    pub fn elem(&self) -> Option<&Type> {
        match &self.0.repr {
            TypeRepr::Array { elem, .. }
            | TypeRepr::Slice { elem }
            | TypeRepr::Ptr { elem }
            | TypeRepr::Chan { elem } => Some(elem),
            TypeRepr::Map { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&Type> {
        match &self.0.repr {
            TypeRepr::Map { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Length of array types, 0 otherwise.
    pub fn array_len(&self) -> usize {
        match &self.0.repr {
            TypeRepr::Array { len, .. } => *len,
            _ => 0,
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        match &self.0.repr {
            TypeRepr::Struct { fields } => fields.get().map(Vec::as_slice).unwrap_or(&[]),
            _ => &[],
        }
    }

    pub fn equal_method(&self) -> Option<&EqualMethod> {
        self.0.equal.as_ref()
    }

    pub fn compare_method(&self) -> Option<&CompareMethod> {
        self.0.compare.as_ref()
    }

    /// Short rendering, package path reduced to its last segment.
    pub fn name(&self) -> &str {
        self.0.short.get_or_init(|| self.render(false))
    }

    /// Rendering with full package paths; this is the identity of the type.
    pub fn full_name(&self) -> &str {
        self.0.full.get_or_init(|| self.render(true))
    }

    /// Whether both types share the same structure, names ignored at the top level.
    pub fn same_underlying(&self, other: &Type) -> bool {
        self.render_repr(true) == other.render_repr(true)
    }

    /// Whether a value of this type can be passed where `target` is expected.
    pub fn assignable_to(&self, target: &Type) -> bool {
        self == target || (target.kind() == Kind::Interface && *target == Type::any())
    }

    fn render(&self, full: bool) -> String {
        match &self.0.name {
            Some(n) => n.render(full),
            None => self.render_repr(full),
        }
    }

    fn render_repr(&self, full: bool) -> String {
        let sub = |t: &Type| if full { t.full_name() } else { t.name() }.to_string();
        match &self.0.repr {
            TypeRepr::Scalar(Kind::Interface) => "interface {}".to_string(),
            TypeRepr::Scalar(k) => k.as_str().to_string(),
            TypeRepr::Array { elem, len } => format!("[{}]{}", len, sub(elem)),
            TypeRepr::Slice { elem } => format!("[]{}", sub(elem)),
            TypeRepr::Map { key, value } => format!("map[{}]{}", sub(key), sub(value)),
            TypeRepr::Ptr { elem } => format!("*{}", sub(elem)),
            TypeRepr::Chan { elem } => format!("chan {}", sub(elem)),
            TypeRepr::Func { signature } => format!("func{}", signature),
            TypeRepr::Struct { fields } => {
                let fields = fields.get().map(Vec::as_slice).unwrap_or(&[]);
                if fields.is_empty() {
                    return "struct {}".to_string();
                }
                let body: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", f.name, sub(&f.ty)))
                    .collect();
                format!("struct {{ {} }}", body.join("; "))
            }
        }
    }

    /// The zero value of this type.
    pub fn zero(&self) -> Value {
        let t = self.clone();
        match self.kind() {
            Kind::Invalid => Value::Invalid,
            Kind::Bool => Value::Bool(t, false),
            k if k.is_int() => Value::Int(t, 0),
            k if k.is_uint() => Value::Uint(t, 0),
            k if k.is_float() => Value::Float(t, 0.0),
            k if k.is_complex() => Value::Complex(t, Complex::default()),
            Kind::String => Value::String(t, String::new()),
            Kind::UnsafePointer => Value::UnsafePointer(t, 0),
            Kind::Array => {
                let elems = match self.elem() {
                    Some(elem) => (0..self.array_len()).map(|_| elem.zero()).collect(),
                    None => Vec::new(),
                };
                Value::Array(t, elems)
            }
            Kind::Struct => {
                let fields = self.fields().iter().map(|f| f.ty.zero()).collect();
                Value::Struct(t, fields)
            }
            Kind::Slice => Value::Slice(t, None),
            Kind::Map => Value::Map(t, None),
            Kind::Ptr => Value::Ptr(t, None),
            Kind::Func => Value::Func(t, None),
            Kind::Chan => Value::Chan(t, None),
            _ => Value::Interface(t, None),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.full_name() == other.full_name()
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name().hash(state);
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.full_name())
    }
}

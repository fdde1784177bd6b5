//! The recursive comparison engine.
//!
//! At every node, in order: absent values, smuggle hooks (got side only),
//! operators and anchors, cmp hooks, `Equal` methods, type checks, the
//! visited set, then a per-kind structural comparison.

use std::sync::{Arc, OnceLock};

use tracing::trace;

use crate::config::Config;
use crate::ctxerr::{Context, Error, ErrorSummary};
use crate::hooks::HookFailure;
use crate::operator::Operator;
use crate::types::{Kind, Type, TypeRepr};
use crate::value::Value;

/// Compares `got` against `expected`.
///
/// Mismatches go through [`Context::collect_error`]: `Ok` means either a
/// match or that every mismatch was accumulated in the context, `Err`
/// means the traversal must stop.
///
/// # Panics
/// When `got` is an operator.
pub fn deep_value_equal(ctx: &Context, got: &Value, expected: &Value) -> Result<(), Box<Error>> {
    if got.is_operator() {
        panic!("found an operator in got param, operators can only be used in the expected one");
    }
    if !got.is_valid() || !expected.is_valid() {
        return compare_invalid(ctx, got, expected);
    }

    if !ctx.hooks.is_empty() {
        if let Some(ty) = got.ty() {
            if ctx.in_unexported && !got.is_copyable() && ctx.hooks.handles(ty) {
                return ctx.collect_error(Error::cannot_compare(
                    "unexported field that cannot be overridden",
                ));
            }
        }
        match ctx.hooks.smuggle(got) {
            Ok(Some(smuggled)) => {
                trace!(path = %ctx.path, "got value smuggled by hook");
                if smuggled.is_operator() {
                    panic!("smuggle hook returned an operator");
                }
                if !smuggled.is_valid() {
                    return compare_invalid(ctx, &smuggled, expected);
                }
                return compare_values(ctx, &smuggled, expected);
            }
            Ok(None) => {}
            Err(e) => {
                return ctx.collect_error(
                    Error::new("Smuggle hook failed")
                        .with_got(got)
                        .with_summary(ErrorSummary::text(e.to_string())),
                )
            }
        }
    }

    compare_values(ctx, got, expected)
}

/// Pass/fail comparison in boolean mode, for operators.
pub fn deep_value_equal_ok(ctx: &Context, got: &Value, expected: &Value) -> bool {
    deep_value_equal(&ctx.boolean(), got, expected).is_ok()
}

/// Top-level comparison. Non-persistent anchors of `config` are cleared
/// afterwards.
pub fn cmp_deeply(got: &Value, expected: &Value, config: &Config) -> Result<(), Box<Error>> {
    let ctx = config.new_context();
    let result = deep_value_equal(&ctx, got, expected);
    config.anchors.reset_anchors(false);
    match (result, ctx.merge_errors()) {
        (Ok(()), None) => Ok(()),
        (Ok(()), Some(merged)) => Err(merged),
        (Err(err), None) => Err(err),
        (Err(err), Some(mut merged)) => {
            merged.push_next(err);
            Err(merged)
        }
    }
}

/// Whether `got` matches `expected` under the default configuration.
pub fn eq_deeply(got: &Value, expected: &Value) -> bool {
    eq_deeply_with(got, expected, &Config::default())
}

pub fn eq_deeply_with(got: &Value, expected: &Value, config: &Config) -> bool {
    let ctx = config.new_context().boolean();
    let ok = deep_value_equal(&ctx, got, expected).is_ok();
    config.anchors.reset_anchors(false);
    ok
}

// ──────────────────────────────────────────────
// Node comparison
// ──────────────────────────────────────────────

fn compare_invalid(ctx: &Context, got: &Value, expected: &Value) -> Result<(), Box<Error>> {
    if let Value::Operator(op) = expected {
        if op.handle_invalid() {
            return match_operator(ctx, op, got);
        }
    }
    match (got.is_valid(), expected.is_valid()) {
        (false, false) => Ok(()),
        (false, true) => {
            if expected.kind() == Kind::Interface && expected.is_nil() {
                return Ok(());
            }
            ctx.collect_error(
                Error::new("values differ")
                    .with_got_raw("nil")
                    .with_expected(expected),
            )
        }
        (true, _) => {
            if got.kind() == Kind::Interface && got.is_nil() {
                return Ok(());
            }
            ctx.collect_error(
                Error::new("values differ")
                    .with_got(got)
                    .with_expected_raw("nil"),
            )
        }
    }
}

fn match_operator(ctx: &Context, op: &Arc<dyn Operator>, got: &Value) -> Result<(), Box<Error>> {
    // Operators see the content of interfaces.
    if let Value::Interface(..) = got {
        let inner = got.elem_or_invalid();
        if !inner.is_valid() && !op.handle_invalid() {
            return ctx.collect_error(
                Error::new("values differ")
                    .with_got_raw("nil")
                    .with_expected_raw(op.describe()),
            );
        }
        return match_operator(ctx, op, inner);
    }
    if ctx.in_unexported && got.is_valid() && !got.is_copyable() {
        return ctx.collect_error(Error::cannot_compare(
            "unexported field that cannot be overridden",
        ));
    }
    trace!(operator = op.name(), path = %ctx.path, "delegating to operator");
    op.match_value(&ctx.with_operator(op.clone()), got)
}

fn values_differ(ctx: &Context, got: &Value, expected: &Value) -> Result<(), Box<Error>> {
    ctx.collect_error(
        Error::new("values differ")
            .with_got(got)
            .with_expected(expected),
    )
}

fn type_mismatch(got: &Type, expected: &Type) -> Error {
    let (mut g, mut e) = (got.name(), expected.name());
    if g == e {
        g = got.full_name();
        e = expected.full_name();
    }
    Error::new("type mismatch")
        .with_got_raw(g)
        .with_expected_raw(e)
}

fn compare_values(ctx: &Context, got: &Value, expected: &Value) -> Result<(), Box<Error>> {
    if let Value::Operator(op) = expected {
        return match_operator(ctx, op, got);
    }
    if let Some(op) = ctx.anchors.resolve_anchor(expected) {
        return match_operator(ctx, &op, got);
    }

    if !ctx.hooks.is_empty() {
        if let Some(outcome) = ctx.hooks.cmp(got, expected) {
            return match outcome {
                Ok(()) => Ok(()),
                Err(HookFailure::Boolean) => values_differ(ctx, got, expected),
                Err(HookFailure::Error(e)) => ctx.collect_error(
                    Error::new(e.to_string())
                        .with_got(got)
                        .with_expected(expected),
                ),
            };
        }
    }

    if let Some(ty) = got.ty() {
        if (ctx.use_equal || ctx.hooks.use_equal(ty)) && expected.ty() == Some(ty) {
            if let Some(equal) = ty.equal_method() {
                if equal(got, expected) {
                    return Ok(());
                }
                return ctx.collect_error(
                    Error::new("got.Equal(expected) failed")
                        .with_got(got)
                        .with_expected(expected),
                );
            }
        }
    }

    let got_ty = match (got.ty(), expected.ty()) {
        (Some(g), Some(e)) if g == e => g,
        (got_ty, expected_ty) => {
            if got.kind() == Kind::Interface {
                return deep_value_equal(ctx, got.elem_or_invalid(), expected);
            }
            if expected.kind() == Kind::Interface {
                return deep_value_equal(ctx, got, expected.elem_or_invalid());
            }
            let (Some(got_ty), Some(expected_ty)) = (got_ty, expected_ty) else {
                return values_differ(ctx, got, expected);
            };
            if ctx.be_lax {
                if let Some(converted) = lax_convert(expected, got_ty) {
                    return deep_value_equal(ctx, got, &converted);
                }
            }
            return ctx.collect_error(type_mismatch(got_ty, expected_ty));
        }
    };

    if ctx.record_visit(got, expected) {
        trace!(path = %ctx.path, "pair already visited");
        return Ok(());
    }

    match (got, expected) {
        (Value::Array(_, g), Value::Array(_, e)) => {
            for (i, (g, e)) in g.iter().zip(e).enumerate() {
                deep_value_equal(&ctx.add_array_index(i), g, e)?;
            }
            Ok(())
        }
        (Value::Slice(..), Value::Slice(..)) => compare_slices(ctx, got, expected),
        (Value::Interface(..), Value::Interface(..)) => {
            deep_value_equal(ctx, got.elem_or_invalid(), expected.elem_or_invalid())
        }
        (Value::Ptr(..), Value::Ptr(..)) => compare_pointers(ctx, got, expected),
        (Value::Struct(_, g), Value::Struct(_, e)) => compare_structs(ctx, got_ty, g, e),
        (Value::Map(..), Value::Map(..)) => compare_maps(ctx, got, expected),
        (Value::Func(_, g), Value::Func(_, e)) => {
            if g.is_none() && e.is_none() {
                return Ok(());
            }
            ctx.collect_error(
                Error::new("functions mismatch")
                    .with_summary(ErrorSummary::text("<can not be compared>")),
            )
        }
        (Value::Chan(..), Value::Chan(..))
        | (Value::UnsafePointer(..), Value::UnsafePointer(..)) => {
            if got.addr() == expected.addr() {
                return Ok(());
            }
            values_differ(ctx, got, expected)
        }
        (Value::Bool(_, g), Value::Bool(_, e)) if g == e => Ok(()),
        (Value::Int(_, g), Value::Int(_, e)) if g == e => Ok(()),
        (Value::Uint(_, g), Value::Uint(_, e)) if g == e => Ok(()),
        (Value::Float(_, g), Value::Float(_, e)) if g == e => Ok(()),
        (Value::Complex(_, g), Value::Complex(_, e)) if g.re == e.re && g.im == e.im => Ok(()),
        (Value::String(_, g), Value::String(_, e)) if g == e => Ok(()),
        _ => values_differ(ctx, got, expected),
    }
}

fn compare_pointers(ctx: &Context, got: &Value, expected: &Value) -> Result<(), Box<Error>> {
    if got.addr() == expected.addr() {
        return Ok(());
    }
    if got.is_nil() || expected.is_nil() {
        let (g, e) = if got.is_nil() {
            ("nil", "non-nil")
        } else {
            ("non-nil", "nil")
        };
        return ctx.collect_error(
            Error::new("nil pointer")
                .with_got_raw(g)
                .with_expected_raw(e),
        );
    }
    match (got.elem(), expected.elem()) {
        (Some(g), Some(e)) => deep_value_equal(&ctx.add_ptr(1), &g, &e),
        _ => Ok(()),
    }
}

fn compare_structs(
    ctx: &Context,
    ty: &Type,
    got: &[Value],
    expected: &[Value],
) -> Result<(), Box<Error>> {
    let ignore_unexported = ctx.ignore_unexported || ctx.hooks.ignore_unexported(ty);
    for (i, def) in ty.fields().iter().enumerate() {
        let exported = def.is_exported();
        if ignore_unexported && !exported {
            continue;
        }
        let (Some(g), Some(e)) = (got.get(i), expected.get(i)) else {
            continue;
        };
        let sub = ctx.add_field(&def.name);
        let sub = if exported { sub } else { sub.in_unexported(true) };
        deep_value_equal(&sub, g, e)?;
    }
    Ok(())
}

fn compare_slices(ctx: &Context, got: &Value, expected: &Value) -> Result<(), Box<Error>> {
    match (got.is_nil(), expected.is_nil()) {
        (true, true) => return Ok(()),
        (true, false) | (false, true) => {
            let (g, e) = if got.is_nil() {
                ("nil", "not nil")
            } else {
                ("not nil", "nil")
            };
            return ctx.collect_error(
                Error::new("nil slice")
                    .with_got_raw(g)
                    .with_expected_raw(e),
            );
        }
        (false, false) => {}
    }

    let g = got.items().unwrap_or(&[]);
    let e = expected.items().unwrap_or(&[]);
    if got.addr() == expected.addr() && g.len() == e.len() {
        return Ok(());
    }

    let common = g.len().min(e.len());
    for i in 0..common {
        deep_value_equal(&ctx.add_array_index(i), &g[i], &e[i])?;
    }
    if g.len() == e.len() {
        return Ok(());
    }

    let missing: Vec<&Value> = e[common..].iter().collect();
    let extra: Vec<&Value> = g[common..].iter().collect();
    ctx.collect_error(
        Error::new(format!("comparing slices, from index #{}", common))
            .with_summary(set_summary("item", &missing, &extra)),
    )
}

fn compare_maps(ctx: &Context, got: &Value, expected: &Value) -> Result<(), Box<Error>> {
    match (got.is_nil(), expected.is_nil()) {
        (true, true) => return Ok(()),
        (true, false) | (false, true) => {
            let (g, e) = if got.is_nil() {
                ("nil", "not nil")
            } else {
                ("not nil", "nil")
            };
            return ctx.collect_error(
                Error::new("nil map")
                    .with_got_raw(g)
                    .with_expected_raw(e),
            );
        }
        (false, false) => {}
    }
    if got.addr() == expected.addr() {
        return Ok(());
    }

    let mut missing = Vec::new();
    let mut found = 0;
    for key in expected.sorted_keys() {
        let (Some(g), Some(e)) = (got.map_get(key), expected.map_get(key)) else {
            missing.push(key);
            continue;
        };
        found += 1;
        deep_value_equal(&ctx.add_map_key(key), g, e)?;
    }

    if found == got.len() && missing.is_empty() {
        return Ok(());
    }
    let extra: Vec<&Value> = if found == got.len() {
        Vec::new()
    } else {
        got.sorted_keys()
            .into_iter()
            .filter(|k| expected.map_get(k).is_none())
            .collect()
    };
    ctx.collect_error(
        Error::new("comparing hash keys of %%").with_summary(set_summary("key", &missing, &extra)),
    )
}

/// "Missing N items" / "Extra key" style summary.
fn set_summary(noun: &str, missing: &[&Value], extra: &[&Value]) -> ErrorSummary {
    let label = |what: &str, n: usize| {
        if n == 1 {
            format!("{} {}", what, noun)
        } else {
            format!("{} {} {}s", what, n, noun)
        }
    };
    let list = |values: &[&Value]| {
        let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        format!("({})", items.join(",\n "))
    };
    let mut items: Vec<(String, String)> = Vec::new();
    if !missing.is_empty() {
        items.push((label("Missing", missing.len()), list(missing)));
    }
    if !extra.is_empty() {
        items.push((label("Extra", extra.len()), list(extra)));
    }
    let mut iter = items.into_iter();
    let Some((label, value)) = iter.next() else {
        return ErrorSummary::text("");
    };
    let mut summary = ErrorSummary::item(label, value);
    for (label, value) in iter {
        summary.push(label, value);
    }
    summary
}

// ──────────────────────────────────────────────
// Lax conversions
// ──────────────────────────────────────────────

fn truncate_int(i: i64, bits: u32) -> i64 {
    if bits >= 64 {
        return i;
    }
    let shift = 64 - bits;
    (i << shift) >> shift
}

fn truncate_uint(u: u64, bits: u32) -> u64 {
    if bits >= 64 {
        return u;
    }
    u & ((1u64 << bits) - 1)
}

fn retype(v: &Value, ty: &Type) -> Option<Value> {
    let t = ty.clone();
    Some(match v {
        Value::Bool(_, b) => Value::Bool(t, *b),
        Value::Int(_, i) => Value::Int(t, *i),
        Value::Uint(_, u) => Value::Uint(t, *u),
        Value::Float(_, f) => Value::Float(t, *f),
        Value::Complex(_, c) => Value::Complex(t, *c),
        Value::String(_, s) => Value::String(t, s.clone()),
        Value::Array(_, items) => Value::Array(t, items.clone()),
        Value::Slice(_, s) => Value::Slice(t, s.clone()),
        Value::Map(_, m) => Value::Map(t, m.clone()),
        Value::Struct(_, fields) => Value::Struct(t, fields.clone()),
        Value::Ptr(_, p) => Value::Ptr(t, p.clone()),
        Value::Interface(_, i) => Value::Interface(t, i.clone()),
        Value::Func(_, h) => Value::Func(t, h.clone()),
        Value::Chan(_, h) => Value::Chan(t, h.clone()),
        Value::UnsafePointer(_, a) => Value::UnsafePointer(t, *a),
        Value::Invalid | Value::Operator(_) => return None,
    })
}

/// Converts `v` to `target` the way a lax comparison allows: numbers
/// between numeric kinds, complex numbers between complex kinds, strings
/// between string kinds and to/from byte and rune slices, slices to
/// arrays and array pointers when long enough, and any value to a type
/// sharing its underlying structure.
pub(crate) fn lax_convert(v: &Value, target: &Type) -> Option<Value> {
    let tk = target.kind();
    let t = target.clone();

    if tk.is_numeric() {
        let out = if tk.is_int() {
            let i = match v {
                Value::Int(_, i) => *i,
                Value::Uint(_, u) => *u as i64,
                Value::Float(_, f) => *f as i64,
                _ => return None,
            };
            Value::Int(t, truncate_int(i, tk.bits()))
        } else if tk.is_uint() {
            let u = match v {
                Value::Int(_, i) => *i as u64,
                Value::Uint(_, u) => *u,
                Value::Float(_, f) => *f as u64,
                _ => return None,
            };
            Value::Uint(t, truncate_uint(u, tk.bits()))
        } else {
            let f = v.as_f64()?;
            Value::Float(t, if tk.bits() == 32 { f as f32 as f64 } else { f })
        };
        return Some(out);
    }

    match (v, target.repr()) {
        (Value::Complex(_, c), _) if tk.is_complex() => {
            let mut c = *c;
            if tk == Kind::Complex64 {
                c.re = c.re as f32 as f64;
                c.im = c.im as f32 as f64;
            }
            Some(Value::Complex(t, c))
        }
        (Value::String(_, s), _) if tk == Kind::String => Some(Value::String(t, s.clone())),
        (Value::String(_, s), TypeRepr::Slice { elem }) => match elem.kind() {
            Kind::Uint8 => {
                let bytes = s.bytes().map(|b| Value::Uint(elem.clone(), u64::from(b)));
                Some(Value::Slice(t, Some(Arc::new(bytes.collect()))))
            }
            Kind::Int32 => {
                let runes = s.chars().map(|c| Value::Int(elem.clone(), i64::from(u32::from(c))));
                Some(Value::Slice(t, Some(Arc::new(runes.collect()))))
            }
            _ => None,
        },
        (Value::Slice(st, items), _) if tk == Kind::String => {
            let items = items.as_deref().map(Vec::as_slice).unwrap_or(&[]);
            match st.elem().map(Type::kind) {
                Some(Kind::Uint8) => {
                    let bytes: Vec<u8> = items
                        .iter()
                        .map(|b| match b {
                            Value::Uint(_, u) => *u as u8,
                            _ => 0,
                        })
                        .collect();
                    Some(Value::String(t, String::from_utf8_lossy(&bytes).into_owned()))
                }
                Some(Kind::Int32) => {
                    let s: String = items
                        .iter()
                        .map(|r| match r {
                            Value::Int(_, i) => u32::try_from(*i)
                                .ok()
                                .and_then(char::from_u32)
                                .unwrap_or(char::REPLACEMENT_CHARACTER),
                            _ => char::REPLACEMENT_CHARACTER,
                        })
                        .collect();
                    Some(Value::String(t, s))
                }
                _ => None,
            }
        }
        (Value::Slice(st, Some(items)), TypeRepr::Array { elem, len })
            if st.elem() == Some(elem) && items.len() >= *len =>
        {
            Some(Value::Array(t, items[..*len].to_vec()))
        }
        (Value::Slice(st, Some(items)), TypeRepr::Ptr { elem: array }) => match array.repr() {
            TypeRepr::Array { elem, len } if st.elem() == Some(elem) && items.len() >= *len => {
                let cell = OnceLock::new();
                let _ = cell.set(Value::Array(array.clone(), items[..*len].to_vec()));
                Some(Value::Ptr(t, Some(Arc::new(cell))))
            }
            _ => None,
        },
        _ => match v.ty() {
            Some(vt) if vt.same_underlying(target) => retype(v, target),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lax_numeric_conversions() {
        let c = lax_convert(&Value::from(300), &Type::uint8()).expect("numeric");
        assert!(matches!(c, Value::Uint(_, 44)));
        let c = lax_convert(&Value::from(-1), &Type::int8()).expect("numeric");
        assert!(matches!(c, Value::Int(_, -1)));
        let c = lax_convert(&Value::from(2.9), &Type::int()).expect("numeric");
        assert!(matches!(c, Value::Int(_, 2)));
        assert!(lax_convert(&Value::from(65), &Type::string()).is_none());
    }

    #[test]
    fn lax_string_conversions() {
        let bytes = lax_convert(&"hé".into(), &Type::slice_of(&Type::uint8())).expect("bytes");
        assert_eq!(bytes.len(), 3);
        let back = lax_convert(&bytes, &Type::string()).expect("string");
        assert_eq!(back.as_str(), Some("hé"));
        let runes = lax_convert(&"hé".into(), &Type::slice_of(&Type::int32())).expect("runes");
        assert_eq!(runes.len(), 2);
    }

    #[test]
    fn lax_slice_to_array() {
        let s = Value::slice(&Type::int(), vec![1.into(), 2.into(), 3.into()]);
        let arr = lax_convert(&s, &Type::array_of(&Type::int(), 2)).expect("array");
        assert_eq!(arr.len(), 2);
        assert!(lax_convert(&s, &Type::array_of(&Type::int(), 4)).is_none());
        let p = lax_convert(&s, &Type::ptr_to(&Type::array_of(&Type::int(), 3))).expect("ptr");
        assert_eq!(p.elem().map(|a| a.len()), Some(3));
    }

    #[test]
    fn lax_named_underlying() {
        let celsius = Type::named("main", "Celsius", &Type::string());
        let c = lax_convert(&"x".into(), &celsius).expect("same underlying");
        assert_eq!(c.ty(), Some(&celsius));
    }

    #[test]
    fn set_summary_labels() {
        let one = Value::from(1);
        let two = Value::from(2);
        let s = set_summary("item", &[&one], &[]);
        assert_eq!(s, ErrorSummary::item("Missing item", "(1)"));
        let s = set_summary("key", &[], &[&one, &two]);
        assert_eq!(s, ErrorSummary::item("Extra 2 keys", "(1,\n 2)"));
    }
}

//! Total order over values, used to iterate map keys deterministically
//! and to sort values in diagnostics.
//!
//! NaN sorts before every float, itself included: `compare(NaN, NaN)` is
//! `Less`.

use std::cmp::Ordering;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::value::Value;
use crate::visited::Visited;

/// Compares `a` and `b`, consulting `visited` to cut cycles.
pub fn compare(visited: &mut Visited, a: &Value, b: &Value) -> Ordering {
    match (a.is_valid(), b.is_valid()) {
        (false, false) => return Ordering::Equal,
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        (true, true) => {}
    }

    if let (Value::Operator(x), Value::Operator(y)) = (a, b) {
        return x.name().cmp(y.name()).then_with(|| {
            let (px, py) = (
                std::sync::Arc::as_ptr(x) as *const () as usize,
                std::sync::Arc::as_ptr(y) as *const () as usize,
            );
            px.cmp(&py)
        });
    }

    let (ta, tb) = match (a.type_of(), b.type_of()) {
        (Some(ta), Some(tb)) => (ta, tb),
        _ => return Ordering::Equal,
    };
    if ta != tb {
        return ta
            .name()
            .cmp(tb.name())
            .then_with(|| ta.full_name().cmp(tb.full_name()));
    }

    if let Some(method) = ta.compare_method() {
        match catch_unwind(AssertUnwindSafe(|| method(a, b))) {
            Ok(n) => return n.cmp(&0),
            Err(_) => warn!(
                type_name = %ta,
                "Compare method panicked, falling back to structural ordering"
            ),
        }
    }

    match (a, b) {
        (Value::Bool(_, x), Value::Bool(_, y)) => x.cmp(y),
        (Value::Int(_, x), Value::Int(_, y)) => x.cmp(y),
        (Value::Uint(_, x), Value::Uint(_, y)) => x.cmp(y),
        (Value::Float(_, x), Value::Float(_, y)) => compare_float(*x, *y),
        (Value::Complex(_, x), Value::Complex(_, y)) => {
            compare_float(x.re, y.re).then_with(|| compare_float(x.im, y.im))
        }
        (Value::String(_, x), Value::String(_, y)) => x.cmp(y),
        (Value::UnsafePointer(_, x), Value::UnsafePointer(_, y)) => x.cmp(y),
        (Value::Array(_, x), Value::Array(_, y)) | (Value::Struct(_, x), Value::Struct(_, y)) => {
            compare_seq(visited, x, y)
        }
        (Value::Slice(_, x), Value::Slice(_, y)) => match (x, y) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => {
                if visited.record(a, b) {
                    return Ordering::Equal;
                }
                compare_seq(visited, x, y)
            }
        },
        (Value::Ptr(_, x), Value::Ptr(_, y)) => match (x, y) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(_), Some(_)) => {
                if a.addr() == b.addr() || visited.record(a, b) {
                    return Ordering::Equal;
                }
                match (a.elem(), b.elem()) {
                    (Some(x), Some(y)) => compare(visited, &x, &y),
                    _ => Ordering::Equal,
                }
            }
        },
        (Value::Interface(..), Value::Interface(..)) => {
            if visited.record(a, b) {
                return Ordering::Equal;
            }
            compare(visited, a.elem_or_invalid(), b.elem_or_invalid())
        }
        (Value::Map(..), Value::Map(..)) => a
            .len()
            .cmp(&b.len())
            .then_with(|| a.addr().cmp(&b.addr())),
        (Value::Func(..), Value::Func(..)) | (Value::Chan(..), Value::Chan(..)) => {
            a.addr().cmp(&b.addr())
        }
        _ => Ordering::Equal,
    }
}

fn compare_float(x: f64, y: f64) -> Ordering {
    if x.is_nan() {
        return Ordering::Less;
    }
    if y.is_nan() {
        return Ordering::Greater;
    }
    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

/// First differing element decides, then length.
fn compare_seq(visited: &mut Visited, x: &[Value], y: &[Value]) -> Ordering {
    for (a, b) in x.iter().zip(y) {
        match compare(visited, a, b) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    x.len().cmp(&y.len())
}

/// Compares with a fresh visited set.
pub fn cmp(a: &Value, b: &Value) -> Ordering {
    compare(&mut Visited::new(), a, b)
}

/// Sorts values in place. Pairs that each sort before the other (NaN
/// against NaN) are kept in place so the sort sees a consistent order.
pub fn sort(values: &mut [&Value]) {
    values.sort_by(|a, b| match cmp(a, b) {
        Ordering::Less if cmp(b, a) == Ordering::Less => Ordering::Equal,
        other => other,
    });
}

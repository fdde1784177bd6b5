//! Property tests of the total order used to sort map keys.

use std::cmp::Ordering;

use proptest::prelude::*;
use tdeep_core::ordering::{cmp, sort};
use tdeep_core::{Type, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<u8>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => scalar(),
        1 => prop::collection::vec(any::<i32>().prop_map(Value::from), 0..5)
            .prop_map(|items| Value::slice(&Type::int(), items)),
        1 => scalar().prop_map(Value::any),
        1 => scalar().prop_map(Value::ptr),
    ]
}

proptest! {
    #[test]
    fn reflexive(a in value()) {
        prop_assert_eq!(cmp(&a, &a), Ordering::Equal);
    }

    #[test]
    fn antisymmetric(a in value(), b in value()) {
        prop_assert_eq!(cmp(&a, &b), cmp(&b, &a).reverse());
    }

    #[test]
    fn transitive(a in value(), b in value(), c in value()) {
        if cmp(&a, &b) != Ordering::Greater && cmp(&b, &c) != Ordering::Greater {
            prop_assert_ne!(cmp(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn sort_is_ordered(items in prop::collection::vec(value(), 0..12)) {
        let mut refs: Vec<&Value> = items.iter().collect();
        sort(&mut refs);
        for pair in refs.windows(2) {
            prop_assert_ne!(cmp(pair[0], pair[1]), Ordering::Greater);
        }
    }
}

#[test]
fn nan_is_never_equal() {
    let nan = Value::from(f64::NAN);
    assert_eq!(cmp(&nan, &nan), Ordering::Less);
    assert_eq!(cmp(&nan, &Value::from(1.0)), Ordering::Less);
    assert_eq!(cmp(&Value::from(1.0), &nan), Ordering::Greater);

    let one = Value::from(1.0);
    let mut keys = vec![&one, &nan, &nan];
    sort(&mut keys);
    assert_eq!(keys.last().and_then(|v| v.as_f64()), Some(1.0));
}

#[test]
fn types_order_by_name_first() {
    assert_eq!(cmp(&Value::from(1), &Value::from("a")), Ordering::Less);
    assert_eq!(cmp(&Value::Invalid, &Value::from(false)), Ordering::Less);
}

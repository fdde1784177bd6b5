//! End-to-end comparisons through `cmp_deeply`.

use std::sync::Arc;

use serde_json::json;
use tdeep_core::operators::{op, All, Between, Ignore, NotZero};
use tdeep_core::{cmp_deeply, eq_deeply, Config, ErrorKind, FieldDef, Type, Value};

fn ab_type() -> Type {
    let t = Type::new_struct("main", "T");
    t.define_fields(vec![
        FieldDef::new("A", Type::int()),
        FieldDef::new("B", Type::string()),
    ]);
    t
}

fn ab(t: &Type, a: Value, b: Value) -> Value {
    Value::structure(t, vec![a, b])
}

fn node_type() -> Type {
    let node = Type::new_struct("main", "Node");
    node.define_fields(vec![
        FieldDef::new("Val", Type::int()),
        FieldDef::new("Next", Type::ptr_to(&node)),
    ]);
    node
}

/// Two nodes pointing at each other, returns a pointer to the first one.
fn ring(node: &Type, first: i32, second: i32) -> Value {
    let (pa, ca) = Value::new_pointer(node);
    let (pb, cb) = Value::new_pointer(node);
    ca.set(Value::structure(node, vec![first.into(), pb]))
        .expect("first pointee");
    cb.set(Value::structure(node, vec![second.into(), pa.clone()]))
        .expect("second pointee");
    pa
}

// ──────────────────────────────────────────────
// Structs, paths and rendering
// ──────────────────────────────────────────────

#[test]
fn struct_field_differs() {
    let t = ab_type();
    let config = Config::default().with_max_errors(-1);
    let err = cmp_deeply(
        &ab(&t, 1.into(), "y".into()),
        &ab(&t, 1.into(), "x".into()),
        &config,
    )
    .expect_err("B differs");
    assert_eq!(err.count(), 1);
    assert_eq!(err.message, "values differ");
    assert_eq!(
        err.path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("DATA.B")
    );
    assert_eq!(
        err.to_string(),
        "DATA.B: values differ\n\t     got: \"y\"\n\texpected: \"x\""
    );
}

#[test]
fn equal_structs_pass() {
    let t = ab_type();
    assert!(cmp_deeply(
        &ab(&t, 1.into(), "x".into()),
        &ab(&t, 1.into(), "x".into()),
        &Config::default()
    )
    .is_ok());
    assert!(eq_deeply(
        &ab(&t, 1.into(), "x".into()),
        &ab(&t, 1.into(), "x".into())
    ));
    assert!(!eq_deeply(
        &ab(&t, 2.into(), "x".into()),
        &ab(&t, 1.into(), "x".into())
    ));
}

#[test]
fn root_name_is_configurable() {
    let err = cmp_deeply(&1.into(), &2.into(), &Config::default().with_root_name("resp"))
        .expect_err("differ");
    assert!(err.to_string().starts_with("resp: values differ"));
}

// ──────────────────────────────────────────────
// Cycles
// ──────────────────────────────────────────────

#[test]
fn cyclic_structures_terminate() {
    let node = node_type();
    assert!(cmp_deeply(&ring(&node, 1, 2), &ring(&node, 1, 2), &Config::default()).is_ok());

    let err = cmp_deeply(&ring(&node, 1, 2), &ring(&node, 1, 3), &Config::default())
        .expect_err("second value differs");
    assert_eq!(
        err.path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("DATA.Next.Val")
    );
}

#[test]
fn self_referencing_slice() {
    let any_slice = Type::slice_of(&Type::any());
    let (p1, c1) = Value::new_pointer(&any_slice);
    let (p2, c2) = Value::new_pointer(&any_slice);
    c1.set(Value::slice(&Type::any(), vec![Value::any(p1.clone())]))
        .expect("set");
    c2.set(Value::slice(&Type::any(), vec![Value::any(p2.clone())]))
        .expect("set");
    assert!(eq_deeply(&p1, &p2));
}

// ──────────────────────────────────────────────
// Maps and slices
// ──────────────────────────────────────────────

#[test]
fn map_keys_missing_and_extra() {
    let m = |entries: Vec<(&str, i32)>| {
        Value::map(
            &Type::string(),
            &Type::int(),
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    };
    let err = cmp_deeply(
        &m(vec![("a", 1), ("c", 3)]),
        &m(vec![("b", 2), ("a", 1)]),
        &Config::default(),
    )
    .expect_err("keys differ");
    assert_eq!(
        err.to_string(),
        "comparing hash keys of DATA\n\tMissing key: (\"b\")\n\t  Extra key: (\"c\")"
    );

    let err = cmp_deeply(&m(vec![("a", 1)]), &m(vec![("a", 2)]), &Config::default())
        .expect_err("value differs");
    assert_eq!(
        err.path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("DATA[\"a\"]")
    );
}

#[test]
fn slices_length_and_nil() {
    let s = |v: Vec<i32>| Value::slice(&Type::int(), v.into_iter().map(Value::from).collect());
    let err = cmp_deeply(&s(vec![1, 2, 3, 4]), &s(vec![1, 2]), &Config::default())
        .expect_err("extra items");
    assert_eq!(
        err.to_string(),
        "DATA: comparing slices, from index #2\n\tExtra 2 items: (3,\n\t                4)"
    );

    let err = cmp_deeply(&s(vec![1]), &s(vec![1, 5]), &Config::default()).expect_err("missing");
    assert!(err.to_string().contains("Missing item: (5)"));

    let err = cmp_deeply(&Value::nil_slice(&Type::int()), &s(vec![]), &Config::default())
        .expect_err("nil vs empty");
    assert_eq!(err.message, "nil slice");
}

// ──────────────────────────────────────────────
// Types and lax mode
// ──────────────────────────────────────────────

#[test]
fn type_mismatch_names_both_types() {
    let err = cmp_deeply(&1.into(), &"1".into(), &Config::default()).expect_err("types differ");
    assert_eq!(
        err.to_string(),
        "DATA: type mismatch\n\t     got: int\n\texpected: string"
    );

    let a = Type::named("github.com/a/pkg", "T", &Type::int());
    let b = Type::named("github.com/b/pkg", "T", &Type::int());
    let err = cmp_deeply(&Value::Int(a, 1), &Value::Int(b, 1), &Config::default())
        .expect_err("same short name");
    assert!(err.to_string().contains("got: github.com/a/pkg.T"));
}

#[test]
fn lax_mode_converts_expected() {
    let got = Value::Int(Type::int64(), 42);
    assert!(cmp_deeply(&got, &42.into(), &Config::default()).is_err());
    assert!(cmp_deeply(&got, &42.into(), &Config::default().lax(true)).is_ok());

    let bytes = Value::slice(
        &Type::uint8(),
        b"ab".iter().map(|b| Value::from(*b)).collect(),
    );
    assert!(cmp_deeply(&bytes, &"ab".into(), &Config::default().lax(true)).is_ok());
}

#[test]
fn interfaces_are_unwrapped() {
    assert!(eq_deeply(&Value::any(12.into()), &12.into()));
    assert!(eq_deeply(&12.into(), &Value::any(12.into())));
    assert!(eq_deeply(&Value::nil_any(), &Value::Invalid));
    let err = cmp_deeply(&Value::nil_any(), &12.into(), &Config::default()).expect_err("nil");
    assert_eq!(err.to_string(), "DATA: values differ\n\t     got: nil\n\texpected: 12");
}

#[test]
fn nil_pointers() {
    let err = cmp_deeply(
        &Value::nil_ptr(&Type::int()),
        &Value::ptr(1.into()),
        &Config::default(),
    )
    .expect_err("nil");
    assert_eq!(err.message, "nil pointer");
    let err = cmp_deeply(&Value::ptr(1.into()), &Value::ptr(2.into()), &Config::default())
        .expect_err("pointee");
    assert_eq!(
        err.path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("*DATA")
    );
}

#[test]
fn functions_only_match_when_nil() {
    let f = Type::func("()");
    assert!(eq_deeply(&Value::Func(f.clone(), None), &Value::Func(f.clone(), None)));
    let err = cmp_deeply(&Value::func(&f), &Value::func(&f), &Config::default()).expect_err("funcs");
    assert_eq!(err.message, "functions mismatch");
}

// ──────────────────────────────────────────────
// Hooks and Equal methods
// ──────────────────────────────────────────────

#[test]
fn cmp_hook_wins_over_structure() {
    let t = ab_type();
    let config = Config::default();
    config.hooks.add_cmp_hook(&t, |got, expected| {
        got.field(0).and_then(Value::as_f64) == expected.field(0).and_then(Value::as_f64)
    });
    assert!(cmp_deeply(
        &ab(&t, 1.into(), "y".into()),
        &ab(&t, 1.into(), "x".into()),
        &config
    )
    .is_ok());
    let err = cmp_deeply(
        &ab(&t, 2.into(), "x".into()),
        &ab(&t, 1.into(), "x".into()),
        &config,
    )
    .expect_err("hook says no");
    assert_eq!(err.message, "values differ");
    assert_eq!(
        err.path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("DATA")
    );
}

#[test]
fn fallible_hook_message_is_reported() {
    let config = Config::default();
    config
        .hooks
        .add_fallible_cmp_hook(&Type::string(), |_, _| Err("strings are never equal".into()));
    let err = cmp_deeply(&"a".into(), &"a".into(), &config).expect_err("hook error");
    assert_eq!(err.message, "strings are never equal");
}

#[test]
fn smuggle_applies_before_equal_method() {
    let celsius = Type::named("main", "Celsius", &Type::float64()).with_equal(|_, _| false);
    let config = Config::default();
    config.hooks.add_use_equal(&[celsius.clone()]);
    config.hooks.add_smuggle_hook(&celsius, |v| {
        Value::from(v.as_f64().unwrap_or_default())
    });
    assert!(cmp_deeply(&Value::Float(celsius.clone(), 20.0), &20.0.into(), &config).is_ok());
}

#[test]
fn use_equal_method() {
    let modulo = Type::named("main", "Mod10", &Type::int()).with_equal(|a, b| match (a, b) {
        (Value::Int(_, x), Value::Int(_, y)) => x % 10 == y % 10,
        _ => false,
    });
    let (a, b) = (Value::Int(modulo.clone(), 13), Value::Int(modulo.clone(), 3));
    assert!(cmp_deeply(&a, &b, &Config::default()).is_err());
    assert!(cmp_deeply(&a, &b, &Config::default().use_equal(true)).is_ok());
    let err = cmp_deeply(
        &a,
        &Value::Int(modulo, 4),
        &Config::default().use_equal(true),
    )
    .expect_err("13 vs 4");
    assert_eq!(err.message, "got.Equal(expected) failed");
}

#[test]
fn ignore_unexported_fields() {
    let t = Type::new_struct("main", "Secret");
    t.define_fields(vec![
        FieldDef::new("Name", Type::string()),
        FieldDef::new("token", Type::string()),
    ]);
    let got = Value::structure(&t, vec!["bob".into(), "abc".into()]);
    let expected = Value::structure(&t, vec!["bob".into(), "xyz".into()]);
    assert!(cmp_deeply(&got, &expected, &Config::default()).is_err());
    assert!(cmp_deeply(&got, &expected, &Config::default().ignore_unexported(true)).is_ok());

    let config = Config::default();
    config.hooks.add_ignore_unexported(&[t.clone()]);
    assert!(cmp_deeply(&got, &expected, &config).is_ok());
}

#[test]
fn unexported_reference_cannot_reach_an_operator() {
    let t = Type::new_struct("main", "Hidden");
    t.define_fields(vec![FieldDef::new("ptr", Type::ptr_to(&Type::int()))]);
    let got = Value::structure(&t, vec![Value::ptr(1.into())]);
    let expected = Value::Struct(t, vec![op(NotZero::new())]);
    let err = cmp_deeply(&got, &expected, &Config::default()).expect_err("cannot compare");
    assert_eq!(err.kind, ErrorKind::CannotCompare);
    assert_eq!(
        err.path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("DATA.ptr")
    );
}

// ──────────────────────────────────────────────
// Operators and anchors
// ──────────────────────────────────────────────

#[test]
fn operators_inside_literal_trees() {
    let got = Value::from_json(&json!({"age": 42, "name": "Bob", "tags": ["a", "b"]}));
    let expected = Value::map(
        &Type::string(),
        &Type::any(),
        vec![
            ("age".into(), Value::any(op(Between::new(18.0.into(), 99.0.into())))),
            ("name".into(), Value::any(op(NotZero::new()))),
            ("tags".into(), Value::any(op(Ignore::new()))),
        ],
    );
    assert!(cmp_deeply(&got, &expected, &Config::default()).is_ok());
}

#[test]
fn operator_failure_carries_location() {
    let err = cmp_deeply(&0.into(), &op(All::new(vec![op(NotZero::new())])), &Config::default())
        .expect_err("zero");
    let text = err.to_string();
    assert!(text.starts_with("DATA: compared (part 1 of 1)"), "{}", text);
    assert!(text.contains("Originates from following error:"), "{}", text);
    assert!(text.contains("[under operator All at "), "{}", text);
}

#[test]
fn anchored_not_zero() {
    let t = ab_type();
    let config = Config::default();

    let anchor = config.anchors.add_anchor(&Type::int(), Arc::new(NotZero::new()));
    let expected = ab(&t, anchor, "x".into());
    assert!(cmp_deeply(&ab(&t, 5.into(), "x".into()), &expected, &config).is_ok());
    // Non-persistent anchors are gone once the comparison ends.
    assert!(config.anchors.is_empty());

    let anchor = config.anchors.add_anchor(&Type::int(), Arc::new(NotZero::new()));
    let expected = ab(&t, anchor, "x".into());
    let err = cmp_deeply(&ab(&t, 0.into(), "x".into()), &expected, &config).expect_err("zero");
    assert_eq!(err.message, "zero value");
    assert_eq!(
        err.path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("DATA.A")
    );
    assert!(err.to_string().contains("[under operator NotZero at "));
}

#[test]
fn anchors_take_precedence_over_hooks() {
    let t = ab_type();
    let config = Config::default();
    config.hooks.add_cmp_hook(&Type::int(), |got, expected| match (got, expected) {
        (Value::Int(_, g), Value::Int(_, e)) => g % 2 == e % 2,
        _ => false,
    });
    let anchor = config.anchors.add_anchor(&Type::int(), Arc::new(NotZero::new()));
    let expected = ab(&t, anchor, "x".into());
    assert!(cmp_deeply(&ab(&t, 7.into(), "x".into()), &expected, &config).is_ok());

    let anchor = config.anchors.add_anchor(&Type::int(), Arc::new(NotZero::new()));
    let expected = ab(&t, anchor, "x".into());
    let err = cmp_deeply(&ab(&t, 0.into(), "x".into()), &expected, &config).expect_err("zero");
    assert_eq!(err.message, "zero value");

    // The hook still applies to plain ints.
    assert!(cmp_deeply(&ab(&t, 7.into(), "x".into()), &ab(&t, 3.into(), "x".into()), &config).is_ok());
}

#[test]
fn anchors_take_precedence_over_equal_methods() {
    let never = Type::named("main", "Never", &Type::int()).with_equal(|_, _| false);
    let config = Config::default().use_equal(true);
    let anchor = config.anchors.add_anchor(&never, Arc::new(NotZero::new()));
    assert!(cmp_deeply(&Value::Int(never, 5), &anchor, &config).is_ok());
}

#[test]
fn persistent_anchors_survive_comparisons() {
    let config = Config::default();
    config.anchors.set_anchors_persist(true);
    let anchor = config.anchors.add_anchor(&Type::string(), Arc::new(NotZero::new()));
    assert!(cmp_deeply(&"a".into(), &anchor, &config).is_ok());
    assert!(cmp_deeply(&"b".into(), &anchor, &config).is_ok());
    config.anchors.reset_anchors(true);
    assert!(cmp_deeply(&"b".into(), &anchor, &config).is_err());
}

// ──────────────────────────────────────────────
// Error accumulation
// ──────────────────────────────────────────────

fn three_fields() -> (Value, Value) {
    let t = Type::new_struct("main", "Three");
    t.define_fields(vec![
        FieldDef::new("A", Type::int()),
        FieldDef::new("B", Type::int()),
        FieldDef::new("C", Type::int()),
    ]);
    (
        Value::structure(&t, vec![1.into(), 2.into(), 3.into()]),
        Value::structure(&t, vec![10.into(), 20.into(), 30.into()]),
    )
}

#[test]
fn error_cap_appends_sentinel() {
    let (got, expected) = three_fields();
    let err = cmp_deeply(&got, &expected, &Config::default().with_max_errors(2))
        .expect_err("three mismatches");
    let chain: Vec<_> = err.iter().collect();
    assert_eq!(chain.len(), 3);
    assert_eq!(
        chain[0].path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("DATA.A")
    );
    assert_eq!(
        chain[1].path.as_ref().map(|p| p.to_string()).as_deref(),
        Some("DATA.B")
    );
    assert!(chain[2].is_too_many());
    assert!(err
        .to_string()
        .ends_with("\nToo many errors (use TDEEP_MAX_ERRORS=-1 to see all)"));
}

#[test]
fn unlimited_errors_and_stop_at_first() {
    let (got, expected) = three_fields();
    let all = cmp_deeply(&got, &expected, &Config::default().with_max_errors(-1))
        .expect_err("three mismatches");
    assert_eq!(all.count(), 3);
    assert!(all.iter().all(|e| !e.is_too_many()));

    let first = cmp_deeply(&got, &expected, &Config::default().with_max_errors(1))
        .expect_err("first mismatch");
    assert_eq!(first.count(), 1);
}

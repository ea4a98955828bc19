//! Equality and ordering across value kinds.
mod common;

use cadr::runtime::{
    compare::{eql, equal, gequal, greater, less, lequal},
    context::Runtime,
    error::Result,
    function::{func_f1, func_n1},
    number::{float, integer},
    pair::{cons, list},
    string::{lazy_str, string_from_chars, string_lit, string_own},
    symbol::make_symbol,
    value::Value,
    vector::vector_from_slice,
};
use num_bigint::BigInt;
use proptest::prelude::*;

use common::ints;

fn identity(_: &mut Runtime, _: Value, x: Value) -> Result<Value> {
    Ok(x)
}

/// Shape of a value to build inside a runtime.
#[derive(Debug, Clone)]
enum Shape {
    Int(i64),
    Chr(char),
    Text(String),
    Float(f64),
    List(Vec<Shape>),
    Vector(Vec<Shape>),
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (-1000i64..1000).prop_map(Shape::Int),
        proptest::char::range('a', 'z').prop_map(Shape::Chr),
        "[a-z]{0,6}".prop_map(Shape::Text),
        (-1.0e6f64..1.0e6).prop_map(Shape::Float),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Shape::List),
            prop::collection::vec(inner, 0..4).prop_map(Shape::Vector),
        ]
    })
}

fn build(rt: &mut Runtime, shape: &Shape) -> Value {
    match shape {
        Shape::Int(n) => Value::Fixnum(*n),
        Shape::Chr(c) => Value::Char(*c),
        Shape::Text(s) => string_own(rt, s),
        Shape::Float(x) => float(rt, *x),
        Shape::List(items) => {
            let items: Vec<Value> = items.iter().map(|s| build(rt, s)).collect();
            list(rt, &items)
        }
        Shape::Vector(items) => {
            let items: Vec<Value> = items.iter().map(|s| build(rt, s)).collect();
            vector_from_slice(rt, &items)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn equal_is_reflexive(shape in arb_shape()) {
        let mut rt = Runtime::new();
        let value = build(&mut rt, &shape);
        prop_assert!(equal(&mut rt, value, value).unwrap());
    }

    #[test]
    fn independently_built_values_are_equal(shape in arb_shape()) {
        let mut rt = Runtime::new();
        let a = build(&mut rt, &shape);
        let b = build(&mut rt, &shape);
        prop_assert!(equal(&mut rt, a, b).unwrap());
    }

    #[test]
    fn every_string_representation_is_equal(text in "[a-z ]{0,12}") {
        let mut rt = Runtime::new();
        let lit = string_lit(&mut rt, text.as_str());
        let own = string_from_chars(&mut rt, text.chars().collect());
        let chunk = string_lit(&mut rt, text.as_str());
        let chunks = list(&mut rt, &[chunk]);
        let lazy = lazy_str(&mut rt, chunks, Some(""), None).unwrap();
        prop_assert!(equal(&mut rt, lit, own).unwrap());
        prop_assert!(equal(&mut rt, own, lazy).unwrap());
    }

    #[test]
    fn fixnum_order_is_total(a in -50i64..50, b in -50i64..50) {
        let mut rt = Runtime::new();
        let (x, y) = (Value::Fixnum(a), Value::Fixnum(b));
        let lt = less(&mut rt, x, y).unwrap();
        let gt = greater(&mut rt, x, y).unwrap();
        prop_assert_eq!(lt, a < b);
        prop_assert_eq!(gt, a > b);
        prop_assert_eq!(lequal(&mut rt, x, y).unwrap(), !gt);
        prop_assert_eq!(gequal(&mut rt, x, y).unwrap(), !lt);
    }
}

#[test]
fn lists_built_twice_are_equal() {
    let mut rt = Runtime::new();
    let a = ints(&mut rt, &[1, 2, 3]);
    let b = ints(&mut rt, &[1, 2, 3]);
    let longer = ints(&mut rt, &[1, 2, 3, 4]);
    assert!(equal(&mut rt, a, b).unwrap());
    assert!(!equal(&mut rt, a, longer).unwrap());
    assert!(a != b, "distinct allocations are not eq");
}

#[test]
fn eql_compares_boxed_numbers_by_value() {
    let mut rt = Runtime::new();
    let x = float(&mut rt, 2.5);
    let y = float(&mut rt, 2.5);
    assert!(eql(&rt, x, y));
    let big: BigInt = BigInt::from(i64::MAX) * 3;
    let p = integer(&mut rt, big.clone());
    let q = integer(&mut rt, big);
    assert!(eql(&rt, p, q));
    let s = string_lit(&mut rt, "a");
    let t = string_lit(&mut rt, "a");
    assert!(!eql(&rt, s, t));
    assert!(equal(&mut rt, s, t).unwrap());
}

#[test]
fn equality_does_not_cross_numeric_kinds() {
    let mut rt = Runtime::new();
    let one = float(&mut rt, 1.0);
    assert!(!equal(&mut rt, one, Value::Fixnum(1)).unwrap());
    assert!(!less(&mut rt, one, Value::Fixnum(1)).unwrap());
    let bigger = float(&mut rt, 1.5);
    assert!(less(&mut rt, Value::Fixnum(1), bigger).unwrap());
}

#[test]
fn functions_compare_by_code_and_environment() {
    let mut rt = Runtime::new();
    let env = ints(&mut rt, &[1]);
    let same_env = ints(&mut rt, &[1]);
    let f = func_f1(&mut rt, env, identity);
    let g = func_f1(&mut rt, same_env, identity);
    assert!(equal(&mut rt, f, g).unwrap());
    let h = func_n1(&mut rt, identity);
    assert!(!equal(&mut rt, f, h).unwrap());
}

#[test]
fn mixed_kinds_order_by_precedence() {
    let mut rt = Runtime::new();
    let word = string_lit(&mut rt, "b");
    let sym = make_symbol(&mut rt, "a");
    let pair = cons(&mut rt, Value::Fixnum(1), Value::Nil);
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(0)]);
    assert!(less(&mut rt, Value::Fixnum(99), word).unwrap());
    assert!(less(&mut rt, word, sym).unwrap());
    assert!(less(&mut rt, sym, pair).unwrap());
    assert!(less(&mut rt, pair, v).unwrap());
    assert!(!less(&mut rt, v, pair).unwrap());

    let short = ints(&mut rt, &[1, 2]);
    let long = ints(&mut rt, &[1, 2, 0]);
    assert!(less(&mut rt, short, long).unwrap());
}

#[test]
fn unordered_kinds_raise() {
    let mut rt = Runtime::new();
    let f = func_n1(&mut rt, identity);
    let err = less(&mut rt, f, Value::Fixnum(1)).unwrap_err();
    assert_eq!(err.kind(), "type-mismatch");
    insta::assert_snapshot!(err.to_string(), @"less: cannot compare #<function> and 1");
}

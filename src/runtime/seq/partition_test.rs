use std::{cell::Cell, rc::Rc};

use crate::runtime::{
    context::Runtime,
    error::Result,
    function::{Arity, func_host, func_n1},
    lazy::lazy_pending,
    pair::list,
    render::render,
    string::string_lit,
    value::Value,
    vector::vector_from_slice,
};

use super::{partition, partition_by, seq_items, split, split_star, tuples};

fn nums(rt: &mut Runtime, items: &[i64]) -> Value {
    let items: Vec<Value> = items.iter().copied().map(Value::Fixnum).collect();
    list(rt, &items)
}

/// Forces every piece, then renders.
fn shown(rt: &mut Runtime, pieces: Value) -> String {
    seq_items(rt, pieces).unwrap();
    render(rt, pieces)
}

fn parity(_: &mut Runtime, _: Value, x: Value) -> Result<Value> {
    Ok(Value::Fixnum(x.as_fixnum().map_or(0, |n| n.rem_euclid(2))))
}

#[test]
fn tuples_with_and_without_fill() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[1, 2, 3, 4, 5]);
    let pairs = tuples(&mut rt, 2, l, Value::Missing).unwrap();
    assert!(lazy_pending(&rt, pairs));
    assert_eq!(shown(&mut rt, pairs), "((1 2) (3 4) (5))");
    let padded = tuples(&mut rt, 2, l, Value::Fixnum(0)).unwrap();
    assert_eq!(shown(&mut rt, padded), "((1 2) (3 4) (5 0))");

    let s = string_lit(&mut rt, "abcde");
    let chunks = tuples(&mut rt, 2, s, Value::Char('x')).unwrap();
    assert_eq!(shown(&mut rt, chunks), "(\"ab\" \"cd\" \"ex\")");

    assert_eq!(tuples(&mut rt, 3, Value::Nil, Value::Missing).unwrap(), Value::Nil);
    assert_eq!(tuples(&mut rt, 0, l, Value::Missing).unwrap_err().kind(), "range");
}

#[test]
fn partition_by_calls_the_key_once_per_element() {
    let mut rt = Runtime::new();
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let key = func_host(&mut rt, Arity::exact(1), move |_, args| {
        seen.set(seen.get() + 1);
        Ok(Value::Fixnum(args[0].as_fixnum().map_or(0, |n| n.rem_euclid(2))))
    });
    let l = nums(&mut rt, &[1, 3, 2, 4, 5]);
    let runs = partition_by(&mut rt, key, l).unwrap();
    assert_eq!(shown(&mut rt, runs), "((1 3) (2 4) (5))");
    assert_eq!(calls.get(), 5);

    let f = func_n1(&mut rt, parity);
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(2), Value::Fixnum(4)]);
    let runs = partition_by(&mut rt, f, v).unwrap();
    assert_eq!(shown(&mut rt, runs), "(#(2 4))");
}

#[test]
fn partition_ignores_indices_that_do_not_advance() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[0, 1, 2, 3, 4, 5]);
    let cuts = nums(&mut rt, &[2, 4]);
    let pieces = partition(&mut rt, l, cuts).unwrap();
    assert_eq!(shown(&mut rt, pieces), "((0 1) (2 3) (4 5))");

    let cuts = nums(&mut rt, &[0, 2, 2, 9]);
    let pieces = partition(&mut rt, l, cuts).unwrap();
    assert_eq!(shown(&mut rt, pieces), "((0 1) (2 3 4 5))");

    let pieces = partition(&mut rt, l, Value::Fixnum(-2)).unwrap();
    assert_eq!(shown(&mut rt, pieces), "((0 1 2 3) (4 5))");

    let pieces = partition(&mut rt, l, Value::Nil).unwrap();
    assert_eq!(shown(&mut rt, pieces), "((0 1 2 3 4 5))");
}

#[test]
fn split_yields_empty_pieces_at_the_edges() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[0, 1, 2, 3]);
    let cuts = nums(&mut rt, &[0, 2]);
    let pieces = split(&mut rt, l, cuts).unwrap();
    assert_eq!(shown(&mut rt, pieces), "(nil (0 1) (2 3))");

    let pieces = split(&mut rt, l, Value::Fixnum(4)).unwrap();
    assert_eq!(shown(&mut rt, pieces), "((0 1 2 3) nil)");
}

#[test]
fn split_star_drops_the_cut_element() {
    let mut rt = Runtime::new();
    let s = string_lit(&mut rt, "a,b,c");
    let cuts = nums(&mut rt, &[1, 3]);
    let pieces = split_star(&mut rt, s, cuts).unwrap();
    assert_eq!(shown(&mut rt, pieces), "(\"a\" \"b\" \"c\")");

    let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2), Value::Fixnum(3)]);
    let pieces = split_star(&mut rt, v, Value::Fixnum(-1)).unwrap();
    assert_eq!(shown(&mut rt, pieces), "(#(1 2) #())");
}

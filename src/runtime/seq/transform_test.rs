use crate::runtime::{
    context::Runtime,
    error::Result,
    function::{Arity, func_host, func_n1, func_n2},
    pair::list,
    render::render,
    string::string_lit,
    value::Value,
    vector::vector_from_slice,
};

use super::{flatten, keep_if, mapcar, mapdo, mappend, reduce_left, reduce_right, remove_if};

fn nums(rt: &mut Runtime, items: &[i64]) -> Value {
    let items: Vec<Value> = items.iter().copied().map(Value::Fixnum).collect();
    list(rt, &items)
}

fn add(_: &mut Runtime, _: Value, a: Value, b: Value) -> Result<Value> {
    Ok(Value::Fixnum(a.as_fixnum().unwrap_or(0) + b.as_fixnum().unwrap_or(0)))
}

fn pair_up(rt: &mut Runtime, _: Value, a: Value, b: Value) -> Result<Value> {
    Ok(list(rt, &[a, b]))
}

fn twice(rt: &mut Runtime, _: Value, x: Value) -> Result<Value> {
    Ok(list(rt, &[x, x]))
}

fn is_odd(_: &mut Runtime, _: Value, x: Value) -> Result<Value> {
    Ok(Value::from_bool(x.as_fixnum().is_some_and(|n| n % 2 != 0)))
}

fn upcase(_: &mut Runtime, _: Value, x: Value) -> Result<Value> {
    match x {
        Value::Char(c) => Ok(Value::Char(c.to_ascii_uppercase())),
        other => Ok(other),
    }
}

#[test]
fn mapcar_stops_at_the_shortest_and_takes_the_first_kind() {
    let mut rt = Runtime::new();
    let f = func_n2(&mut rt, add);
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2), Value::Fixnum(3)]);
    let l = nums(&mut rt, &[10, 20]);
    let sums = mapcar(&mut rt, f, &[v, l]).unwrap();
    assert_eq!(render(&rt, sums), "#(11 22)");

    let up = func_n1(&mut rt, upcase);
    let s = string_lit(&mut rt, "abc");
    let shout = mapcar(&mut rt, up, &[s]).unwrap();
    assert_eq!(render(&rt, shout), "\"ABC\"");
}

#[test]
fn mappend_splices_results() {
    let mut rt = Runtime::new();
    let f = func_n1(&mut rt, twice);
    let l = nums(&mut rt, &[1, 2]);
    let doubled = mappend(&mut rt, f, &[l]).unwrap();
    assert_eq!(render(&rt, doubled), "(1 1 2 2)");

    let zip = func_n2(&mut rt, pair_up);
    let a = nums(&mut rt, &[1, 2]);
    let b = nums(&mut rt, &[3, 4]);
    let zipped = mappend(&mut rt, zip, &[a, b]).unwrap();
    assert_eq!(render(&rt, zipped), "(1 3 2 4)");
}

#[test]
fn mapdo_is_for_effect() {
    let mut rt = Runtime::new();
    let seen = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = std::rc::Rc::clone(&seen);
    let f = func_host(&mut rt, Arity::exact(1), move |_, _| {
        counter.set(counter.get() + 1);
        Ok(Value::T)
    });
    let l = nums(&mut rt, &[1, 2, 3]);
    assert_eq!(mapdo(&mut rt, f, &[l]).unwrap(), Value::Nil);
    assert_eq!(seen.get(), 3);
}

#[test]
fn filtering_keeps_the_kind() {
    let mut rt = Runtime::new();
    let odd = func_n1(&mut rt, is_odd);
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2), Value::Fixnum(3)]);
    let kept = keep_if(&mut rt, odd, v, Value::Nil).unwrap();
    assert_eq!(render(&rt, kept), "#(1 3)");
    let removed = remove_if(&mut rt, odd, v, Value::Nil).unwrap();
    assert_eq!(render(&rt, removed), "#(2)");
}

#[test]
fn folds_with_and_without_a_seed() {
    let mut rt = Runtime::new();
    let plus = func_n2(&mut rt, add);
    let l = nums(&mut rt, &[1, 2, 3]);
    assert_eq!(reduce_left(&mut rt, plus, l, Value::Missing, Value::Nil).unwrap(), Value::Fixnum(6));
    assert_eq!(reduce_left(&mut rt, plus, l, Value::Fixnum(10), Value::Nil).unwrap(), Value::Fixnum(16));

    let pair = func_n2(&mut rt, pair_up);
    let nested = reduce_right(&mut rt, pair, l, Value::Nil, Value::Nil).unwrap();
    assert_eq!(render(&rt, nested), "(1 (2 (3 nil)))");
    let unseeded = reduce_right(&mut rt, pair, l, Value::Missing, Value::Nil).unwrap();
    assert_eq!(render(&rt, unseeded), "(1 (2 3))");
}

#[test]
fn empty_fold_without_seed_calls_f_with_no_arguments() {
    let mut rt = Runtime::new();
    let f = func_host(&mut rt, Arity::new(2, 2, false).unwrap(), |_, args| {
        Ok(Value::from_bool(args.iter().all(|a| a.is_missing())))
    });
    assert_eq!(reduce_left(&mut rt, f, Value::Nil, Value::Missing, Value::Nil).unwrap(), Value::T);
    let single = nums(&mut rt, &[4]);
    assert_eq!(reduce_left(&mut rt, f, single, Value::Missing, Value::Nil).unwrap(), Value::Fixnum(4));
}

#[test]
fn flatten_drops_nils() {
    let mut rt = Runtime::new();
    let inner = nums(&mut rt, &[2, 3]);
    let deeper = list(&mut rt, &[inner, Value::Nil]);
    let l = list(&mut rt, &[Value::Fixnum(1), deeper, Value::Fixnum(4)]);
    let flat = flatten(&mut rt, l).unwrap();
    assert_eq!(render(&rt, flat), "(1 2 3 4)");
}

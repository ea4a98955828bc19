use crate::runtime::{
    config::RuntimeConfig,
    context::Runtime,
    error::Result,
    function::{func_n1, func_n2},
    map::{map_get, map_keys},
    pair::{cons, list},
    render::render,
    seq::car,
    string::{string_lit, string_own},
    value::Value,
    vector::vector_from_slice,
};

use super::{grade, group_by, seq_items, shuffle, sort, sort_group, unique};

fn nums(rt: &mut Runtime, items: &[i64]) -> Value {
    let items: Vec<Value> = items.iter().copied().map(Value::Fixnum).collect();
    list(rt, &items)
}

fn head(rt: &mut Runtime, _: Value, x: Value) -> Result<Value> {
    car(rt, x)
}

fn descending(_: &mut Runtime, _: Value, a: Value, b: Value) -> Result<Value> {
    Ok(Value::from_bool(a.as_fixnum() > b.as_fixnum()))
}

fn parity(_: &mut Runtime, _: Value, x: Value) -> Result<Value> {
    Ok(Value::Fixnum(x.as_fixnum().map_or(0, |n| n.rem_euclid(2))))
}

#[test]
fn lists_are_relinked_in_order() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[3, 1, 2]);
    let sorted = sort(&mut rt, l, Value::Nil, Value::Nil).unwrap();
    assert_eq!(render(&rt, sorted), "(1 2 3)");
    let down = func_n2(&mut rt, descending);
    let sorted = sort(&mut rt, sorted, down, Value::Nil).unwrap();
    assert_eq!(render(&rt, sorted), "(3 2 1)");
}

#[test]
fn list_sort_is_stable() {
    let mut rt = Runtime::new();
    let key = func_n1(&mut rt, head);
    let rows: Vec<Value> = [(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')]
        .into_iter()
        .map(|(k, tag)| cons(&mut rt, Value::Fixnum(k), Value::Char(tag)))
        .collect();
    let l = list(&mut rt, &rows);
    let sorted = sort(&mut rt, l, Value::Nil, key).unwrap();
    assert_eq!(
        render(&rt, sorted),
        "((1 . #\\b) (1 . #\\d) (2 . #\\a) (2 . #\\c))"
    );
}

#[test]
fn vectors_sort_in_place_past_the_pivot_threshold() {
    let config = RuntimeConfig {
        sort_pivot_threshold: 4,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(config);
    let items: Vec<Value> = [9, 4, 7, 1, 8, 2, 6, 3, 5, 0]
        .into_iter()
        .map(Value::Fixnum)
        .collect();
    let v = vector_from_slice(&mut rt, &items);
    let sorted = sort(&mut rt, v, Value::Nil, Value::Nil).unwrap();
    assert_eq!(sorted, v);
    assert_eq!(render(&rt, v), "#(0 1 2 3 4 5 6 7 8 9)");
}

#[test]
fn strings_sort_unless_literal() {
    let mut rt = Runtime::new();
    let s = string_own(&mut rt, "dcab");
    sort(&mut rt, s, Value::Nil, Value::Nil).unwrap();
    assert_eq!(render(&rt, s), "\"abcd\"");
    let lit = string_lit(&mut rt, "ba");
    let err = sort(&mut rt, lit, Value::Nil, Value::Nil).unwrap_err();
    assert_eq!(err.kind(), "type-mismatch");
}

#[test]
fn incomparable_elements_raise() {
    let mut rt = Runtime::new();
    let f = func_n1(&mut rt, head);
    let g = func_n1(&mut rt, parity);
    let l = list(&mut rt, &[f, g]);
    assert!(sort(&mut rt, l, Value::Nil, Value::Nil).is_err());
}

#[test]
fn grade_leaves_the_input_alone() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[30, 10, 20, 10]);
    let order = grade(&mut rt, l, Value::Nil, Value::Nil).unwrap();
    assert_eq!(render(&rt, order), "(1 3 2 0)");
    assert_eq!(render(&rt, l), "(30 10 20 10)");
}

#[test]
fn shuffle_is_a_permutation() {
    let config = RuntimeConfig {
        shuffle_seed: Some(7),
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(config);
    let l = nums(&mut rt, &[1, 2, 3, 4, 5, 6]);
    let shuffled = shuffle(&mut rt, l).unwrap();
    let copy = seq_items(&mut rt, shuffled).unwrap();
    let copy = list(&mut rt, &copy);
    let sorted = sort(&mut rt, copy, Value::Nil, Value::Nil).unwrap();
    assert_eq!(render(&rt, sorted), "(1 2 3 4 5 6)");

    let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2)]);
    assert_eq!(shuffle(&mut rt, v).unwrap(), v);
}

#[test]
fn sort_group_collects_runs_of_equal_keys() {
    let mut rt = Runtime::new();
    let key = func_n1(&mut rt, parity);
    let l = nums(&mut rt, &[1, 2, 3, 4, 5]);
    let groups = sort_group(&mut rt, l, key, Value::Nil).unwrap();
    assert_eq!(render(&rt, groups), "((2 4) (1 3 5))");
}

#[test]
fn unique_keeps_first_occurrences() {
    let mut rt = Runtime::new();
    let a = string_lit(&mut rt, "a");
    let b = string_lit(&mut rt, "b");
    let a2 = string_own(&mut rt, "a");
    let l = list(&mut rt, &[a, b, a2]);
    let result = unique(&mut rt, l, Value::Nil).unwrap();
    assert_eq!(seq_items(&mut rt, result).unwrap(), vec![a, b]);
    let s = string_lit(&mut rt, "mississippi");
    let letters = unique(&mut rt, s, Value::Nil).unwrap();
    assert_eq!(render(&rt, letters), "\"misp\"");
}

#[test]
fn group_by_preserves_insertion_order() {
    let mut rt = Runtime::new();
    let key = func_n1(&mut rt, parity);
    let l = nums(&mut rt, &[3, 2, 5, 4]);
    let groups = group_by(&mut rt, key, l).unwrap();
    assert_eq!(
        map_keys(&mut rt, groups).unwrap(),
        vec![Value::Fixnum(1), Value::Fixnum(0)]
    );
    let odd = map_get(&mut rt, groups, Value::Fixnum(1)).unwrap().unwrap();
    assert_eq!(render(&rt, odd), "(3 5)");
}

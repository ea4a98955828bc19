use crate::runtime::{
    context::Runtime,
    map::{MapKind, make_map, map_count, map_set},
    pair::list,
    render::render,
    string::{string_lit, string_own},
    value::Value,
    vector::vector_from_slice,
};

use super::{nthcdr, replace, sel, sub};

fn nums(rt: &mut Runtime, items: &[i64]) -> Value {
    let items: Vec<Value> = items.iter().copied().map(Value::Fixnum).collect();
    list(rt, &items)
}

fn shown(rt: &Runtime, value: Value) -> String {
    render(rt, value)
}

#[test]
fn bounds_default_and_clamp() {
    let mut rt = Runtime::new();
    let v = vector_from_slice(
        &mut rt,
        &[Value::Fixnum(0), Value::Fixnum(1), Value::Fixnum(2), Value::Fixnum(3)],
    );
    let all = sub(&mut rt, v, Value::Nil, Value::Missing).unwrap();
    assert_eq!(shown(&rt, all), "#(0 1 2 3)");
    let clamped = sub(&mut rt, v, Value::Fixnum(2), Value::Fixnum(99)).unwrap();
    assert_eq!(shown(&rt, clamped), "#(2 3)");
    let inverted = sub(&mut rt, v, Value::Fixnum(3), Value::Fixnum(1)).unwrap();
    assert_eq!(shown(&rt, inverted), "#()");
    let from_end = sub(&mut rt, v, Value::T, Value::Nil).unwrap();
    assert_eq!(shown(&rt, from_end), "#()");
}

#[test]
fn negative_from_with_zero_to_runs_through_the_end() {
    let mut rt = Runtime::new();
    let s = string_lit(&mut rt, "abcdef");
    let tail = sub(&mut rt, s, Value::Fixnum(-2), Value::Fixnum(0)).unwrap();
    assert_eq!(shown(&rt, tail), "\"ef\"");
    let middle = sub(&mut rt, s, Value::Fixnum(-4), Value::Fixnum(-1)).unwrap();
    assert_eq!(shown(&rt, middle), "\"cde\"");
}

#[test]
fn open_list_tail_is_shared() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[1, 2, 3]);
    let tail = sub(&mut rt, l, Value::Fixnum(1), Value::T).unwrap();
    assert_eq!(tail, nthcdr(&mut rt, 1, l).unwrap());
    let front = sub(&mut rt, l, Value::Nil, Value::Fixnum(2)).unwrap();
    assert_eq!(shown(&rt, front), "(1 2)");
    let last_two = sub(&mut rt, l, Value::Fixnum(-2), Value::Nil).unwrap();
    assert_eq!(shown(&rt, last_two), "(2 3)");
}

#[test]
fn non_index_bounds_raise() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[1]);
    let err = sub(&mut rt, l, Value::Char('a'), Value::Nil).unwrap_err();
    assert_eq!(err.kind(), "type-mismatch");
    assert!(sub(&mut rt, Value::Fixnum(4), Value::Nil, Value::Nil).is_err());
}

#[test]
fn replacing_a_vector_span_shifts_the_tail() {
    let mut rt = Runtime::new();
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2), Value::Fixnum(3)]);
    let items = nums(&mut rt, &[7, 8, 9]);
    let same = replace(&mut rt, v, items, Value::Fixnum(1), Value::Fixnum(2)).unwrap();
    assert_eq!(same, v);
    assert_eq!(shown(&rt, v), "#(1 7 8 9 3)");
}

#[test]
fn replacing_in_a_list_relinks_cells() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[1, 2, 3, 4]);
    let items = nums(&mut rt, &[0]);
    let result = replace(&mut rt, l, items, Value::Fixnum(1), Value::Fixnum(3)).unwrap();
    assert_eq!(result, l);
    assert_eq!(shown(&rt, l), "(1 0 4)");

    let head = replace(&mut rt, l, Value::Nil, Value::Nil, Value::Fixnum(1)).unwrap();
    assert_eq!(shown(&rt, head), "(0 4)");
}

#[test]
fn replacing_string_characters() {
    let mut rt = Runtime::new();
    let s = string_own(&mut rt, "hello");
    let items = string_lit(&mut rt, "J");
    replace(&mut rt, s, items, Value::Fixnum(0), Value::Fixnum(1)).unwrap();
    assert_eq!(shown(&rt, s), "\"Jello\"");

    let lit = string_lit(&mut rt, "fixed");
    let err = replace(&mut rt, lit, items, Value::Nil, Value::Nil).unwrap_err();
    assert!(err.to_string().contains("literal"));

    let bad = nums(&mut rt, &[1]);
    assert!(replace(&mut rt, s, bad, Value::Nil, Value::Nil).is_err());
}

#[test]
fn index_list_replacement_assigns_in_order() {
    let mut rt = Runtime::new();
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(0), Value::Fixnum(0), Value::Fixnum(0)]);
    let items = nums(&mut rt, &[5, 6, 7]);
    let indices = nums(&mut rt, &[2, 0]);
    replace(&mut rt, v, items, indices, Value::Nil).unwrap();
    assert_eq!(shown(&rt, v), "#(6 0 5)");
}

#[test]
fn selection_skips_missing_indices() {
    let mut rt = Runtime::new();
    let s = string_lit(&mut rt, "abcd");
    let indices = nums(&mut rt, &[3, 9, -4, 1]);
    let picked = sel(&mut rt, s, indices).unwrap();
    assert_eq!(shown(&rt, picked), "\"dab\"");

    let m = make_map(&mut rt, MapKind::Eql);
    map_set(&mut rt, m, Value::Fixnum(1), Value::T).unwrap();
    map_set(&mut rt, m, Value::Fixnum(2), Value::T).unwrap();
    let keys = nums(&mut rt, &[2, 3]);
    let picked = sel(&mut rt, m, keys).unwrap();
    assert_eq!(map_count(&rt, picked).unwrap(), 1);
}

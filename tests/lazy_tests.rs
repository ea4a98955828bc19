//! Lazy pairs, adapters and combinators.
mod common;

use std::{cell::Cell, rc::Rc};

use cadr::runtime::{
    compare::equal,
    context::Runtime,
    error::Result,
    function::{Arity, func_host, func_n1},
    lazy::{
        InputSource, interpose, lazy_cons, lazy_cycle, lazy_iterate, lazy_mapcar, lazy_pending,
        lazy_stream, take,
    },
    pair::rplaca,
    render::render,
    seq::{car, cdr, length, sub},
    string::string_lit,
    value::Value,
};
use proptest::prelude::*;

use common::{counter, fixnums, ints};

fn double(_: &mut Runtime, _: Value, x: Value) -> Result<Value> {
    Ok(Value::Fixnum(x.as_fixnum().unwrap_or(0) * 2))
}

#[test]
fn take_two_of_an_infinite_counter() {
    let mut rt = Runtime::new();
    let (f, calls) = counter(&mut rt);
    let numbers = lazy_iterate(&mut rt, f);
    let first_two = take(&mut rt, 2, numbers).unwrap();
    assert_eq!(fixnums(&mut rt, first_two), vec![0, 1]);
    assert_eq!(calls.get(), 2);
    assert_eq!(render(&rt, numbers), "(0 1 ...)");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn each_cell_runs_its_generator_once(reads in 1usize..6, depth in 0usize..6) {
        let mut rt = Runtime::new();
        let (f, calls) = counter(&mut rt);
        let numbers = lazy_iterate(&mut rt, f);
        let mut cell = numbers;
        for _ in 0..depth {
            cell = cdr(&mut rt, cell).unwrap();
        }
        for _ in 0..reads {
            prop_assert_eq!(car(&mut rt, cell).unwrap(), Value::Fixnum(depth as i64));
        }
        prop_assert_eq!(calls.get(), depth as i64 + 1);
    }
}

#[test]
fn a_silent_generator_leaves_a_single_nil() {
    let mut rt = Runtime::new();
    let g = func_host(&mut rt, Arity::exact(1), |_, _| Ok(Value::Nil));
    let cell = lazy_cons(&mut rt, g);
    assert!(lazy_pending(&rt, cell));
    assert_eq!(length(&mut rt, cell).unwrap(), 1);
    assert_eq!(car(&mut rt, cell).unwrap(), Value::Nil);
    assert!(!lazy_pending(&rt, cell));
}

#[test]
fn generators_fill_their_own_cell() {
    let mut rt = Runtime::new();
    let seen = Rc::new(Cell::new(false));
    let flag = Rc::clone(&seen);
    let g = func_host(&mut rt, Arity::exact(1), move |rt, args| {
        flag.set(true);
        rplaca(rt, args[0], Value::Char('z'))
    });
    let cell = lazy_cons(&mut rt, g);
    assert!(!seen.get());
    assert_eq!(render(&rt, cell), "(...)");
    assert_eq!(car(&mut rt, cell).unwrap(), Value::Char('z'));
    assert!(seen.get());
}

struct Lines(Vec<&'static str>);

impl InputSource for Lines {
    fn next_item(&mut self, rt: &mut Runtime) -> Result<Option<Value>> {
        if self.0.is_empty() {
            return Ok(None);
        }
        let line = self.0.remove(0);
        Ok(Some(string_lit(rt, line)))
    }
}

#[test]
fn streams_end_when_the_source_does() {
    let mut rt = Runtime::new();
    let lines = lazy_stream(&mut rt, Box::new(Lines(vec!["a", "b"]))).unwrap();
    assert_eq!(length(&mut rt, lines).unwrap(), 2);
    assert_eq!(render(&rt, lines), "(\"a\" \"b\")");
}

#[test]
fn combinators_compose_over_infinite_lists() {
    let mut rt = Runtime::new();
    let (f, _) = counter(&mut rt);
    let numbers = lazy_iterate(&mut rt, f);
    let twice = func_n1(&mut rt, double);
    let evens = lazy_mapcar(&mut rt, twice, numbers).unwrap();
    let window = sub(&mut rt, evens, Value::Fixnum(2), Value::Fixnum(5)).unwrap();
    assert_eq!(fixnums(&mut rt, window), vec![4, 6, 8]);

    let pattern = ints(&mut rt, &[1, 2]);
    let cycle = lazy_cycle(&mut rt, pattern).unwrap();
    let spaced = interpose(&mut rt, Value::Fixnum(0), cycle).unwrap();
    let head = take(&mut rt, 5, spaced).unwrap();
    assert_eq!(fixnums(&mut rt, head), vec![1, 0, 2, 0, 1]);
}

#[test]
fn equality_forces_lazy_lists() {
    let mut rt = Runtime::new();
    let (f, _) = counter(&mut rt);
    let numbers = lazy_iterate(&mut rt, f);
    let lazy = take(&mut rt, 3, numbers).unwrap();
    let eager = ints(&mut rt, &[0, 1, 2]);
    assert!(equal(&mut rt, lazy, eager).unwrap());
}

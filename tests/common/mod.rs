#![allow(dead_code)]

use std::{cell::Cell, rc::Rc};

use cadr::runtime::{
    context::Runtime,
    function::{Arity, func_host},
    pair::list,
    seq::seq_items,
    value::Value,
};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ints(rt: &mut Runtime, items: &[i64]) -> Value {
    let items: Vec<Value> = items.iter().copied().map(Value::Fixnum).collect();
    list(rt, &items)
}

/// Fixnum elements of any sequence, forcing lazy ones.
pub fn fixnums(rt: &mut Runtime, seq: Value) -> Vec<i64> {
    seq_items(rt, seq)
        .unwrap()
        .into_iter()
        .filter_map(Value::as_fixnum)
        .collect()
}

/// Zero-argument callable yielding 0, 1, 2, ... and a count of its calls.
pub fn counter(rt: &mut Runtime) -> (Value, Rc<Cell<i64>>) {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let f = func_host(rt, Arity::exact(0), move |_, _| {
        let n = seen.get();
        seen.set(n + 1);
        Ok(Value::Fixnum(n))
    });
    (f, calls)
}

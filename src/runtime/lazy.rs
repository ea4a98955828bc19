//! Lazy pairs and the combinators built on them.
//!
//! A combinator cell is a [`LazyCons`](crate::runtime::pair::LazyCons) whose
//! fields are preloaded with the state its generator needs (usually the
//! remaining source) and whose generator is a native closure over the
//! combinator's constant arguments. Forcing replaces the state with the
//! cell's real head and rest, chaining a fresh pending cell when more output
//! may follow.
//!
//! Combinators never look further into their source than the element they
//! are producing, except where noted: a cell must exist only when it has an
//! element, so predicates that decide whether a next element exists are run
//! one step ahead.
use std::{cell::RefCell, rc::Rc};

use tracing::{trace, warn};

use crate::runtime::{
    call::{call0, call1},
    context::Runtime,
    error::{Error, Result},
    foreign::{ForeignClass, foreign_payload, make_foreign},
    function::{Fn1, func_f1},
    gc::HeapObject,
    pair::{LazyState, cons, list, make_lazy_cons_with, rplaca, rplacd},
    render::render,
    seq::{SeqKind, car, cdr, nthcdr, search::apply_key, seq_info, seq_items, sub, tolist},
    value::Value,
};

pub use crate::runtime::pair::make_lazy_cons as lazy_cons;

/// Runs the generator of a pending lazy pair; a forced pair or any other
/// value is left alone.
///
/// The state becomes `Forced` before the generator runs, so a generator that
/// reaches its own cell again sees whatever it has stored so far rather than
/// running twice. A generator that fails puts the cell back to pending with
/// its preloaded fields restored, and the next access runs it again.
pub fn force(rt: &mut Runtime, cell: Value) -> Result<()> {
    let Some(handle) = cell.as_handle() else {
        return Ok(());
    };
    let (generator, head, rest) = match rt.heap.get_mut(handle) {
        HeapObject::LazyCons(lazy) => match lazy.state {
            LazyState::Pending(generator) => {
                lazy.state = LazyState::Forced;
                (generator, lazy.head, lazy.rest)
            }
            LazyState::Forced => return Ok(()),
        },
        _ => return Ok(()),
    };
    trace!(?handle, "forcing lazy pair");
    let forced = rt.anchored(|rt| {
        rt.anchor(cell);
        rt.anchor(generator);
        rt.anchor(head);
        rt.anchor(rest);
        call1(rt, generator, cell).map(|_| ())
    });
    if let Err(err) = forced {
        warn!(?handle, %err, "lazy generator failed; cell stays pending");
        if let HeapObject::LazyCons(lazy) = rt.heap.get_mut(handle) {
            lazy.state = LazyState::Pending(generator);
            lazy.head = head;
            lazy.rest = rest;
        }
        rt.heap.write_barrier(handle, generator);
        rt.heap.write_barrier(handle, head);
        rt.heap.write_barrier(handle, rest);
        return Err(err);
    }
    Ok(())
}

/// Whether `cell` is a lazy pair that has not been forced yet.
pub fn lazy_pending(rt: &Runtime, cell: Value) -> bool {
    matches!(
        rt.object(cell),
        Some(HeapObject::LazyCons(lazy)) if matches!(lazy.state, LazyState::Pending(_))
    )
}

/// Raw fields of a pair, without forcing. Inside a generator these are the
/// preloaded state.
pub(crate) fn cell_fields(rt: &Runtime, cell: Value) -> (Value, Value) {
    match rt.object(cell) {
        Some(HeapObject::LazyCons(lazy)) => (lazy.head, lazy.rest),
        Some(HeapObject::Cons(pair)) => (pair.head, pair.rest),
        _ => (Value::Nil, Value::Nil),
    }
}

/// A pending cell whose generator is `body` closed over `env`.
pub(crate) fn lazy_cell(rt: &mut Runtime, env: Value, body: Fn1, head: Value, rest: Value) -> Value {
    let generator = func_f1(rt, env, body);
    make_lazy_cons_with(rt, generator, head, rest)
}

/// Stores the real contents of a forced cell.
pub(crate) fn settle(rt: &mut Runtime, cell: Value, head: Value, rest: Value) -> Result<Value> {
    rplaca(rt, cell, head)?;
    rplacd(rt, cell, rest)?;
    Ok(Value::Nil)
}

/// Reads the elements of a small list built with [`list`].
pub(crate) fn unpack<const N: usize>(rt: &Runtime, env: Value) -> [Value; N] {
    let mut out = [Value::Nil; N];
    let mut cursor = env;
    for slot in out.iter_mut() {
        match rt.object(cursor) {
            Some(HeapObject::Cons(pair)) => {
                *slot = pair.head;
                cursor = pair.rest;
            }
            _ => break,
        }
    }
    out
}

/// Whether a list tail has another element.
pub(crate) fn has_more(rt: &Runtime, tail: Value) -> bool {
    seq_info(rt, tail).kind == SeqKind::ListLike
}

/// Lists are used as they are; vectors and strings are listed once.
pub(crate) fn source_list(rt: &mut Runtime, seq: Value) -> Result<Value> {
    match seq_info(rt, seq).kind {
        SeqKind::Empty | SeqKind::ListLike => Ok(seq),
        SeqKind::VectorLike => tolist(rt, seq),
        _ => Err(Error::type_mismatch(
            "lazy",
            format!("{} is not a sequence", render(rt, seq)),
        )),
    }
}

fn iterate_cell(rt: &mut Runtime, f: Value, cell: Value) -> Result<Value> {
    let head = call0(rt, f)?;
    rt.anchored(|rt| {
        rt.anchor(head);
        let next = lazy_cell(rt, f, iterate_cell, Value::Nil, Value::Nil);
        settle(rt, cell, head, next)
    })
}

/// Infinite list of successive results of calling `f` with no arguments.
/// Each forced cell calls `f` once.
pub fn lazy_iterate(rt: &mut Runtime, f: Value) -> Value {
    lazy_cell(rt, f, iterate_cell, Value::Nil, Value::Nil)
}

/// External source of items for [`lazy_stream`].
pub trait InputSource {
    /// The next item, or `None` once the source is exhausted.
    fn next_item(&mut self, rt: &mut Runtime) -> Result<Option<Value>>;
}

type SharedSource = Rc<RefCell<Box<dyn InputSource>>>;

struct SourceClass;

impl ForeignClass for SourceClass {
    fn name(&self) -> &str {
        "input-source"
    }
}

fn pull(rt: &mut Runtime, source: Value) -> Result<Option<Value>> {
    let Some(shared) = foreign_payload::<SharedSource>(rt, source).cloned() else {
        return Err(Error::type_mismatch("lazy-stream", "not an input source"));
    };
    let mut source = shared
        .try_borrow_mut()
        .map_err(|_| Error::type_mismatch("lazy-stream", "input source read re-entrantly"))?;
    source.next_item(rt)
}

fn stream_cell(rt: &mut Runtime, source: Value, cell: Value) -> Result<Value> {
    let (head, _) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        rt.anchor(head);
        let rest = match pull(rt, source)? {
            Some(next) => lazy_cell(rt, source, stream_cell, next, Value::Nil),
            None => Value::Nil,
        };
        settle(rt, cell, head, rest)
    })
}

/// Adapts `source` into a list, one item at a time. Each cell holds its item
/// and reads the following one when forced, so the list ends exactly where
/// the source does.
pub fn lazy_stream(rt: &mut Runtime, source: Box<dyn InputSource>) -> Result<Value> {
    let shared: SharedSource = Rc::new(RefCell::new(source));
    let handle = make_foreign(rt, Rc::new(SourceClass), Vec::new(), Box::new(shared));
    rt.anchored(|rt| {
        rt.anchor(handle);
        Ok(match pull(rt, handle)? {
            Some(first) => lazy_cell(rt, handle, stream_cell, first, Value::Nil),
            None => Value::Nil,
        })
    })
}

fn cycle_cell(rt: &mut Runtime, whole: Value, cell: Value) -> Result<Value> {
    let (_, cursor) = cell_fields(rt, cell);
    let head = car(rt, cursor)?;
    let mut next = cdr(rt, cursor)?;
    if !has_more(rt, next) {
        next = whole;
    }
    rt.anchored(|rt| {
        rt.anchor(head);
        rt.anchor(next);
        let rest = lazy_cell(rt, whole, cycle_cell, Value::Nil, next);
        settle(rt, cell, head, rest)
    })
}

/// The elements of `seq` repeated without end; nil for an empty sequence.
pub fn lazy_cycle(rt: &mut Runtime, seq: Value) -> Result<Value> {
    let whole = source_list(rt, seq)?;
    if !has_more(rt, whole) {
        return Ok(Value::Nil);
    }
    Ok(lazy_cell(rt, whole, cycle_cell, Value::Nil, whole))
}

fn take_cell(rt: &mut Runtime, _env: Value, cell: Value) -> Result<Value> {
    let (count, source) = cell_fields(rt, cell);
    let count = count.as_fixnum().unwrap_or(0);
    let head = car(rt, source)?;
    let next = cdr(rt, source)?;
    rt.anchored(|rt| {
        rt.anchor(head);
        let rest = if count > 1 && has_more(rt, next) {
            lazy_cell(rt, Value::Nil, take_cell, Value::Fixnum(count - 1), next)
        } else {
            Value::Nil
        };
        settle(rt, cell, head, rest)
    })
}

/// The first `n` elements. Lists are taken lazily; other sequences yield a
/// sub-sequence.
pub fn take(rt: &mut Runtime, n: usize, seq: Value) -> Result<Value> {
    match seq_info(rt, seq).kind {
        SeqKind::ListLike if n > 0 => Ok(lazy_cell(
            rt,
            Value::Nil,
            take_cell,
            Value::from(n),
            seq,
        )),
        SeqKind::ListLike | SeqKind::Empty => Ok(Value::Nil),
        _ => sub(rt, seq, Value::Fixnum(0), Value::from(n)),
    }
}

fn test_item(rt: &mut Runtime, pred: Value, key: Value, item: Value) -> Result<bool> {
    let keyed = apply_key(rt, key, item)?;
    Ok(call1(rt, pred, keyed)?.is_truthy())
}

fn take_while_cell(rt: &mut Runtime, env: Value, cell: Value) -> Result<Value> {
    let [pred, key] = unpack::<2>(rt, env);
    let (head, source) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        rt.anchor(head);
        let next = cdr(rt, source)?;
        rt.anchor(next);
        let rest = if has_more(rt, next) {
            let item = car(rt, next)?;
            if test_item(rt, pred, key, item)? {
                lazy_cell(rt, env, take_while_cell, item, next)
            } else {
                Value::Nil
            }
        } else {
            Value::Nil
        };
        settle(rt, cell, head, rest)
    })
}

/// Leading elements whose key satisfies `pred`. Each cell tests the element
/// after it before it settles.
pub fn take_while(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    let source = source_list(rt, seq)?;
    if !has_more(rt, source) {
        return Ok(Value::Nil);
    }
    rt.anchored(|rt| {
        rt.anchor(source);
        let first = car(rt, source)?;
        if !test_item(rt, pred, key, first)? {
            return Ok(Value::Nil);
        }
        let env = list(rt, &[pred, key]);
        Ok(lazy_cell(rt, env, take_while_cell, first, source))
    })
}

fn take_until_cell(rt: &mut Runtime, env: Value, cell: Value) -> Result<Value> {
    let [pred, key] = unpack::<2>(rt, env);
    let (_, source) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        let head = car(rt, source)?;
        rt.anchor(head);
        let next = cdr(rt, source)?;
        let rest = if !test_item(rt, pred, key, head)? && has_more(rt, next) {
            lazy_cell(rt, env, take_until_cell, Value::Nil, next)
        } else {
            Value::Nil
        };
        settle(rt, cell, head, rest)
    })
}

/// Leading elements up to and including the first whose key satisfies `pred`.
pub fn take_until(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    let source = source_list(rt, seq)?;
    if !has_more(rt, source) {
        return Ok(Value::Nil);
    }
    let env = list(rt, &[pred, key]);
    Ok(lazy_cell(rt, env, take_until_cell, Value::Nil, source))
}

/// Everything after the first `n` elements: a shared tail of a list, a
/// sub-sequence otherwise.
pub fn drop(rt: &mut Runtime, n: usize, seq: Value) -> Result<Value> {
    match seq_info(rt, seq).kind {
        SeqKind::ListLike | SeqKind::Empty => nthcdr(rt, n, seq),
        _ => sub(rt, seq, Value::from(n), Value::T),
    }
}

/// Skips leading elements while `stop` answers false. With `inclusive`, the
/// element that stopped the scan is skipped too.
fn drop_by(
    rt: &mut Runtime,
    seq: Value,
    inclusive: bool,
    mut stop: impl FnMut(&mut Runtime, Value) -> Result<bool>,
) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        match seq_info(rt, seq).kind {
            SeqKind::ListLike => {
                let mut cursor = seq;
                while has_more(rt, cursor) {
                    let item = car(rt, cursor)?;
                    if stop(rt, item)? {
                        return if inclusive { cdr(rt, cursor) } else { Ok(cursor) };
                    }
                    cursor = cdr(rt, cursor)?;
                }
                Ok(Value::Nil)
            }
            SeqKind::Empty => Ok(Value::Nil),
            _ => {
                let items = seq_items(rt, seq)?;
                let mut index = items.len();
                for (at, &item) in items.iter().enumerate() {
                    if stop(rt, item)? {
                        index = if inclusive { at + 1 } else { at };
                        break;
                    }
                }
                sub(rt, seq, Value::from(index), Value::T)
            }
        }
    })
}

/// Skips leading elements whose key satisfies `pred`.
pub fn drop_while(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    drop_by(rt, seq, false, |rt, item| Ok(!test_item(rt, pred, key, item)?))
}

/// Skips leading elements up to and including the first whose key satisfies
/// `pred`.
pub fn drop_until(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    drop_by(rt, seq, true, |rt, item| test_item(rt, pred, key, item))
}

fn mapcar_cell(rt: &mut Runtime, f: Value, cell: Value) -> Result<Value> {
    let (_, source) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        let item = car(rt, source)?;
        let head = call1(rt, f, item)?;
        rt.anchor(head);
        let next = cdr(rt, source)?;
        let rest = if has_more(rt, next) {
            lazy_cell(rt, f, mapcar_cell, Value::Nil, next)
        } else {
            Value::Nil
        };
        settle(rt, cell, head, rest)
    })
}

/// `f` applied to each element, one call per forced cell.
pub fn lazy_mapcar(rt: &mut Runtime, f: Value, seq: Value) -> Result<Value> {
    let source = source_list(rt, seq)?;
    if !has_more(rt, source) {
        return Ok(Value::Nil);
    }
    Ok(lazy_cell(rt, f, mapcar_cell, Value::Nil, source))
}

/// The first element of `source` whose key test equals `keep`, and the tail
/// after it.
fn next_kept(
    rt: &mut Runtime,
    pred: Value,
    key: Value,
    keep: bool,
    source: Value,
) -> Result<Option<(Value, Value)>> {
    let mut cursor = source;
    rt.anchored(|rt| {
        rt.anchor(source);
        while has_more(rt, cursor) {
            let item = car(rt, cursor)?;
            let next = cdr(rt, cursor)?;
            if test_item(rt, pred, key, item)? == keep {
                return Ok(Some((item, next)));
            }
            cursor = next;
        }
        Ok(None)
    })
}

fn filter_cell(rt: &mut Runtime, env: Value, cell: Value) -> Result<Value> {
    let [pred, key, keep] = unpack::<3>(rt, env);
    let (head, source) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        rt.anchor(head);
        let rest = match next_kept(rt, pred, key, keep.is_truthy(), source)? {
            Some((item, tail)) => lazy_cell(rt, env, filter_cell, item, tail),
            None => Value::Nil,
        };
        settle(rt, cell, head, rest)
    })
}

fn lazy_filter(rt: &mut Runtime, pred: Value, seq: Value, key: Value, keep: bool) -> Result<Value> {
    let source = source_list(rt, seq)?;
    rt.anchored(|rt| {
        rt.anchor(source);
        match next_kept(rt, pred, key, keep, source)? {
            Some((item, tail)) => {
                let env = list(rt, &[pred, key, Value::from_bool(keep)]);
                Ok(lazy_cell(rt, env, filter_cell, item, tail))
            }
            None => Ok(Value::Nil),
        }
    })
}

/// Lazily the elements whose key satisfies `pred`. Finding each element
/// scans past the rejected ones before it.
pub fn keep_if_lazy(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    lazy_filter(rt, pred, seq, key, true)
}

pub fn remove_if_lazy(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    lazy_filter(rt, pred, seq, key, false)
}

/// The next atom in a stack of pending lists, and the stack that remains.
fn next_atom(rt: &mut Runtime, stack: Value) -> Result<Option<(Value, Value)>> {
    let mut stack = stack;
    rt.anchored(|rt| {
        loop {
            rt.anchor(stack);
            if stack.is_nil() {
                return Ok(None);
            }
            let top = car(rt, stack)?;
            let below = cdr(rt, stack)?;
            if !has_more(rt, top) {
                stack = below;
                continue;
            }
            let item = car(rt, top)?;
            let after = cdr(rt, top)?;
            stack = cons(rt, after, below);
            match seq_info(rt, item).kind {
                SeqKind::Empty => {}
                SeqKind::ListLike => {
                    rt.anchor(stack);
                    stack = cons(rt, item, stack);
                }
                _ => return Ok(Some((item, stack))),
            }
        }
    })
}

fn flatten_cell(rt: &mut Runtime, _env: Value, cell: Value) -> Result<Value> {
    let (head, stack) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        rt.anchor(head);
        let rest = match next_atom(rt, stack)? {
            Some((item, stack)) => lazy_cell(rt, Value::Nil, flatten_cell, item, stack),
            None => Value::Nil,
        };
        settle(rt, cell, head, rest)
    })
}

/// Lazy counterpart of [`flatten`](crate::runtime::seq::flatten): nested
/// lists are spliced in as they are reached and nils are dropped. An atom
/// flattens to a one-element list.
pub fn lazy_flatten(rt: &mut Runtime, seq: Value) -> Result<Value> {
    match seq_info(rt, seq).kind {
        SeqKind::Empty => Ok(Value::Nil),
        SeqKind::ListLike => {
            let stack = list(rt, &[seq]);
            match next_atom(rt, stack)? {
                Some((item, stack)) => Ok(lazy_cell(rt, Value::Nil, flatten_cell, item, stack)),
                None => Ok(Value::Nil),
            }
        }
        _ => Ok(list(rt, &[seq])),
    }
}

fn interpose_cell(rt: &mut Runtime, sep: Value, cell: Value) -> Result<Value> {
    let (_, source) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        let head = car(rt, source)?;
        rt.anchor(head);
        let next = cdr(rt, source)?;
        let rest = if has_more(rt, next) {
            let tail = lazy_cell(rt, sep, interpose_cell, Value::Nil, next);
            rt.anchor(tail);
            cons(rt, sep, tail)
        } else {
            Value::Nil
        };
        settle(rt, cell, head, rest)
    })
}

/// `sep` between each pair of adjacent elements.
pub fn interpose(rt: &mut Runtime, sep: Value, seq: Value) -> Result<Value> {
    let source = source_list(rt, seq)?;
    if !has_more(rt, source) {
        return Ok(Value::Nil);
    }
    Ok(lazy_cell(rt, sep, interpose_cell, Value::Nil, source))
}

/// Pops leading empty sequences off `pending`. Returns the next non-empty
/// one as a list and what remains, or the final sequence as-is when only one
/// is left so that it is shared as the tail.
fn next_segment(rt: &mut Runtime, pending: Value) -> Result<Segment> {
    let mut pending = pending;
    rt.anchored(|rt| {
        loop {
            rt.anchor(pending);
            if !has_more(rt, pending) {
                return Ok(Segment::End);
            }
            let seq = car(rt, pending)?;
            let rest = cdr(rt, pending)?;
            if !has_more(rt, rest) {
                return Ok(Segment::Tail(seq));
            }
            let seq = source_list(rt, seq)?;
            if has_more(rt, seq) {
                return Ok(Segment::Next(seq, rest));
            }
            pending = rest;
        }
    })
}

enum Segment {
    End,
    Tail(Value),
    Next(Value, Value),
}

fn segment_start(rt: &mut Runtime, segment: Segment) -> Value {
    match segment {
        Segment::End => Value::Nil,
        Segment::Tail(seq) => seq,
        Segment::Next(seq, pending) => lazy_cell(rt, pending, append_cell, Value::Nil, seq),
    }
}

fn append_cell(rt: &mut Runtime, pending: Value, cell: Value) -> Result<Value> {
    let (_, source) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        let head = car(rt, source)?;
        rt.anchor(head);
        let next = cdr(rt, source)?;
        let rest = if has_more(rt, next) {
            lazy_cell(rt, pending, append_cell, Value::Nil, next)
        } else {
            let segment = next_segment(rt, pending)?;
            segment_start(rt, segment)
        };
        settle(rt, cell, head, rest)
    })
}

/// Concatenation that walks each sequence only as far as it is read. The
/// last sequence is shared as the tail.
pub fn lazy_append(rt: &mut Runtime, seqs: &[Value]) -> Result<Value> {
    rt.anchored(|rt| {
        for &seq in seqs {
            rt.anchor(seq);
        }
        let pending = list(rt, seqs);
        let segment = next_segment(rt, pending)?;
        Ok(segment_start(rt, segment))
    })
}

//! Lazy partitioning: fixed-size tuples, runs of equal keys, and cuts at
//! index positions. Every piece takes the kind of the input sequence.
use crate::runtime::{
    call::call1,
    compare::equal,
    context::Runtime,
    error::{Error, Result},
    function::functionp,
    lazy::{cell_fields, has_more, lazy_cell, settle, source_list, unpack},
    number::index_of,
    pair::{ListBuilder, cons, list},
    value::Value,
};

use super::{SeqKind, car, cdr, length, make_like, seq_info, seq_items};

fn tuple_cell(rt: &mut Runtime, env: Value, cell: Value) -> Result<Value> {
    let [size, fill, like] = unpack::<3>(rt, env);
    let (_, source) = cell_fields(rt, cell);
    let size = size.as_fixnum().unwrap_or(1).max(1) as usize;
    rt.anchored(|rt| {
        let mut out = ListBuilder::anchored();
        let mut cursor = source;
        let mut taken = 0;
        while taken < size && has_more(rt, cursor) {
            let item = car(rt, cursor)?;
            out.push(rt, item)?;
            cursor = cdr(rt, cursor)?;
            taken += 1;
        }
        if !fill.is_missing() {
            for _ in taken..size {
                out.push(rt, fill)?;
            }
        }
        let piece = out.finish();
        let head = make_like(rt, piece, like)?;
        rt.anchor(head);
        let rest = if has_more(rt, cursor) {
            lazy_cell(rt, env, tuple_cell, Value::Nil, cursor)
        } else {
            Value::Nil
        };
        settle(rt, cell, head, rest)
    })
}

/// Consecutive groups of `n` elements. The last group is short unless
/// `fill` is supplied (not missing), in which case it is padded with `fill`.
pub fn tuples(rt: &mut Runtime, n: usize, seq: Value, fill: Value) -> Result<Value> {
    if n == 0 {
        return Err(Error::range("tuples", "tuple size must be positive"));
    }
    let source = source_list(rt, seq)?;
    if !has_more(rt, source) {
        return Ok(Value::Nil);
    }
    rt.anchored(|rt| {
        rt.anchor(source);
        let env = list(rt, &[Value::from(n), fill, seq]);
        Ok(lazy_cell(rt, env, tuple_cell, Value::Nil, source))
    })
}

fn run_cell(rt: &mut Runtime, env: Value, cell: Value) -> Result<Value> {
    let [f, like] = unpack::<2>(rt, env);
    let (first_key, source) = cell_fields(rt, cell);
    rt.anchored(|rt| {
        let mut out = ListBuilder::anchored();
        let first = car(rt, source)?;
        out.push(rt, first)?;
        let mut last_key = first_key;
        let mut next_key = Value::Nil;
        let mut cursor = cdr(rt, source)?;
        while has_more(rt, cursor) {
            rt.anchor(cursor);
            let item = car(rt, cursor)?;
            next_key = call1(rt, f, item)?;
            rt.anchor(next_key);
            if !equal(rt, last_key, next_key)? {
                break;
            }
            out.push(rt, item)?;
            last_key = next_key;
            cursor = cdr(rt, cursor)?;
        }
        let piece = out.finish();
        let head = make_like(rt, piece, like)?;
        rt.anchor(head);
        let rest = if has_more(rt, cursor) {
            lazy_cell(rt, env, run_cell, next_key, cursor)
        } else {
            Value::Nil
        };
        settle(rt, cell, head, rest)
    })
}

/// Maximal runs of adjacent elements whose `f` images are [`equal`]. `f` is
/// called once per element.
pub fn partition_by(rt: &mut Runtime, f: Value, seq: Value) -> Result<Value> {
    let source = source_list(rt, seq)?;
    if !has_more(rt, source) {
        return Ok(Value::Nil);
    }
    rt.anchored(|rt| {
        rt.anchor(source);
        let first = car(rt, source)?;
        let key = call1(rt, f, first)?;
        rt.anchor(key);
        let env = list(rt, &[f, seq]);
        Ok(lazy_cell(rt, env, run_cell, key, source))
    })
}

/// How an index list cuts a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cut {
    /// Pieces start at each index; empty pieces are never produced.
    Partition,
    /// Like `Partition`, but an index at the current position yields an
    /// empty piece, and every used index is followed by a piece.
    Split,
    /// Like `Split`, and the element at each index is dropped.
    SplitStar,
}

impl Cut {
    fn code(self) -> i64 {
        match self {
            Cut::Partition => 0,
            Cut::Split => 1,
            Cut::SplitStar => 2,
        }
    }

    fn from_code(code: i64) -> Cut {
        match code {
            1 => Cut::Split,
            2 => Cut::SplitStar,
            _ => Cut::Partition,
        }
    }
}

fn piece_cell(rt: &mut Runtime, env: Value, cell: Value) -> Result<Value> {
    let [mode, like] = unpack::<2>(rt, env);
    let cut = Cut::from_code(mode.as_fixnum().unwrap_or(0));
    let (state, source) = cell_fields(rt, cell);
    let (base, mut indices) = cell_fields(rt, state);
    let base = base.as_fixnum().unwrap_or(0);

    let mut next = None;
    loop {
        let (head, rest) = cell_fields(rt, indices);
        let Some(index) = head.as_fixnum() else {
            break;
        };
        indices = rest;
        if index > base || (index == base && cut != Cut::Partition) {
            next = Some(index);
            break;
        }
    }

    let Some(index) = next else {
        let head = make_like(rt, source, like)?;
        return settle(rt, cell, head, Value::Nil);
    };

    rt.anchored(|rt| {
        let mut out = ListBuilder::anchored();
        let mut cursor = source;
        for _ in base..index {
            if !has_more(rt, cursor) {
                break;
            }
            let item = car(rt, cursor)?;
            out.push(rt, item)?;
            cursor = cdr(rt, cursor)?;
        }
        let mut next_base = index;
        if cut == Cut::SplitStar && has_more(rt, cursor) {
            cursor = cdr(rt, cursor)?;
            next_base += 1;
        }
        rt.anchor(cursor);
        let piece = out.finish();
        let head = make_like(rt, piece, like)?;
        rt.anchor(head);
        let more = match cut {
            Cut::Partition => has_more(rt, cursor),
            Cut::Split | Cut::SplitStar => true,
        };
        let rest = if more {
            let state = cons(rt, Value::Fixnum(next_base), indices);
            rt.anchor(state);
            lazy_cell(rt, env, piece_cell, state, cursor)
        } else {
            Value::Nil
        };
        settle(rt, cell, head, rest)
    })
}

/// Normalizes an index argument into a list of fixnums: a function is
/// called on the sequence first, a single index becomes a one-element list,
/// and negative indices count from the end.
fn cut_indices(rt: &mut Runtime, op: &'static str, seq: Value, indices: Value) -> Result<Vec<i64>> {
    let indices = if functionp(rt, indices) {
        call1(rt, indices, seq)?
    } else {
        indices
    };
    let raw = match seq_info(rt, indices).kind {
        SeqKind::Empty | SeqKind::ListLike | SeqKind::VectorLike => seq_items(rt, indices)?,
        _ => vec![indices],
    };
    let mut out = Vec::with_capacity(raw.len());
    let mut len = None;
    for value in raw {
        let mut index = index_of(op, value)?;
        if index < 0 {
            let total = match len {
                Some(total) => total,
                None => {
                    let total = length(rt, seq)? as i64;
                    len = Some(total);
                    total
                }
            };
            index += total;
        }
        out.push(index);
    }
    Ok(out)
}

fn cut_at(rt: &mut Runtime, op: &'static str, seq: Value, indices: Value, cut: Cut) -> Result<Value> {
    let source = source_list(rt, seq)?;
    if !has_more(rt, source) {
        return Ok(Value::Nil);
    }
    rt.anchored(|rt| {
        rt.anchor(source);
        let cuts = cut_indices(rt, op, seq, indices)?;
        if cuts.is_empty() {
            return Ok(list(rt, &[seq]));
        }
        let cuts: Vec<Value> = cuts.into_iter().map(Value::Fixnum).collect();
        let cuts = list(rt, &cuts);
        rt.anchor(cuts);
        let state = cons(rt, Value::Fixnum(0), cuts);
        rt.anchor(state);
        let env = list(rt, &[Value::Fixnum(cut.code()), seq]);
        Ok(lazy_cell(rt, env, piece_cell, state, source))
    })
}

/// Pieces starting at each of `indices`; indices not beyond the previous cut
/// are ignored, so no piece is empty.
pub fn partition(rt: &mut Runtime, seq: Value, indices: Value) -> Result<Value> {
    cut_at(rt, "partition", seq, indices, Cut::Partition)
}

/// Like [`partition`], but a repeated index or one at the start yields an
/// empty piece, and a cut at the end yields a trailing empty piece.
pub fn split(rt: &mut Runtime, seq: Value, indices: Value) -> Result<Value> {
    cut_at(rt, "split", seq, indices, Cut::Split)
}

/// Like [`split`], dropping the element at each cut.
pub fn split_star(rt: &mut Runtime, seq: Value, indices: Value) -> Result<Value> {
    cut_at(rt, "split*", seq, indices, Cut::SplitStar)
}

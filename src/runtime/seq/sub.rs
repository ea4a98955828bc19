use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    foreign::foreign_class,
    gc::Place,
    pair::ListBuilder,
    render::render,
    string::{splice_chars, str_content, string_from_chars},
    value::{TypeTag, Value},
    vector::{splice_vec, vec_items, vector_from_slice},
};

use super::{SeqIter, SeqKind, cdr, length, make_like, nthcdr, seq_info, seq_items, seq_ref, seq_refset};

/// A bound as written by the caller, before the length is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
    At(i64),
}

fn parse_from(rt: &Runtime, op: &'static str, from: Value) -> Result<Bound> {
    match from {
        Value::Nil | Value::Missing => Ok(Bound::Start),
        Value::T => Ok(Bound::End),
        Value::Fixnum(n) => Ok(Bound::At(n)),
        _ => Err(bad_index(rt, op, from)),
    }
}

fn parse_to(rt: &Runtime, op: &'static str, to: Value) -> Result<Bound> {
    match to {
        Value::Nil | Value::Missing | Value::T => Ok(Bound::End),
        Value::Fixnum(n) => Ok(Bound::At(n)),
        _ => Err(bad_index(rt, op, to)),
    }
}

fn bad_index(rt: &Runtime, op: &'static str, index: Value) -> Error {
    Error::type_mismatch(op, format!("{} is not a valid index", render(rt, index)))
}

/// Resolves `from`/`to` against `len`.
///
/// Negative values count from the end; a negative `from` with a `to` of zero
/// means "through the end". Both bounds clamp into `[0, len]` and an
/// inverted pair collapses to an empty span.
fn resolve(from: Bound, to: Bound, len: usize) -> (usize, usize) {
    let len_i = len as i64;
    let mut to = to;
    let from = match from {
        Bound::Start => 0,
        Bound::End => len_i,
        Bound::At(n) if n < 0 => {
            if to == Bound::At(0) {
                to = Bound::End;
            }
            n + len_i
        }
        Bound::At(n) => n,
    };
    let to = match to {
        Bound::Start => 0,
        Bound::End => len_i,
        Bound::At(n) if n < 0 => n + len_i,
        Bound::At(n) => n,
    };
    let from = from.clamp(0, len_i) as usize;
    let to = to.clamp(0, len_i) as usize;
    if from >= to { (from, from) } else { (from, to) }
}

fn needs_length(from: Bound, to: Bound) -> bool {
    matches!(from, Bound::End | Bound::At(i64::MIN..=-1)) || matches!(to, Bound::At(i64::MIN..=-1))
}

/// Sub-sequence `from..to` of the same kind as `seq`.
///
/// Lists are walked without taking their length unless a bound is negative,
/// so positive bounds work on infinite lazy lists. An open `to` on a list
/// returns the shared tail.
pub fn sub(rt: &mut Runtime, seq: Value, from: Value, to: Value) -> Result<Value> {
    let from_b = parse_from(rt, "sub", from)?;
    let to_b = parse_to(rt, "sub", to)?;
    let info = seq_info(rt, seq);
    match (info.kind, info.tag) {
        (SeqKind::Empty, _) => Ok(Value::Nil),
        (SeqKind::ListLike, _) => sub_list(rt, seq, from_b, to_b),
        (SeqKind::VectorLike, TypeTag::Vector) => {
            let items = vec_items(rt, seq)?;
            let (from, to) = resolve(from_b, to_b, items.len());
            Ok(vector_from_slice(rt, &items[from..to]))
        }
        (SeqKind::VectorLike, TypeTag::Foreign) => {
            let len = length(rt, seq)?;
            let (from, to) = resolve(from_b, to_b, len);
            let Some(class) = foreign_class(rt, seq) else {
                return Ok(Value::Nil);
            };
            rt.anchored(|rt| {
                rt.anchor(seq);
                let mut out = ListBuilder::anchored();
                for i in from..to {
                    let item = class.index(rt, seq, i)?;
                    out.push(rt, item)?;
                }
                Ok(out.finish())
            })
        }
        (SeqKind::VectorLike, _) => {
            let chars = str_content(rt, seq)?;
            let (from, to) = resolve(from_b, to_b, chars.len());
            Ok(string_from_chars(rt, chars[from..to].to_vec()))
        }
        _ => Err(Error::type_mismatch(
            "sub",
            format!("{} is not a sequence", render(rt, seq)),
        )),
    }
}

fn sub_list(rt: &mut Runtime, list: Value, from: Bound, to: Bound) -> Result<Value> {
    let (from, to) = if needs_length(from, to) {
        let len = length(rt, list)?;
        let (f, t) = resolve(from, to, len);
        let to = if t == len { Bound::End } else { Bound::At(t as i64) };
        (f, to)
    } else {
        let f = match from {
            Bound::At(n) => n as usize,
            _ => 0,
        };
        (f, to)
    };
    rt.anchored(|rt| {
        rt.anchor(list);
        let start = nthcdr(rt, from, list)?;
        let Bound::At(to) = to else {
            return Ok(start);
        };
        let mut out = ListBuilder::anchored();
        let mut cursor = start;
        let mut index = from as i64;
        while index < to && !cursor.is_nil() {
            let item = super::car(rt, cursor)?;
            out.push(rt, item)?;
            cursor = cdr(rt, cursor)?;
            index += 1;
        }
        Ok(out.finish())
    })
}

/// Replaces `from..to` of `seq` with the elements of `items`.
///
/// Vectors and mutable strings are modified in place, shifting the tail.
/// For lists, the cells before `from` are kept and relinked; the return
/// value is the new list head. When `from` is itself a list or vector it is
/// taken as a list of indices and each is assigned the next element of
/// `items`.
pub fn replace(rt: &mut Runtime, seq: Value, items: Value, from: Value, to: Value) -> Result<Value> {
    if matches!(rt.classify(from), TypeTag::Cons | TypeTag::LazyCons | TypeTag::Vector) {
        return replace_indices(rt, seq, items, from);
    }
    let from_b = parse_from(rt, "replace", from)?;
    let to_b = parse_to(rt, "replace", to)?;
    let info = seq_info(rt, seq);
    match (info.kind, info.tag) {
        (SeqKind::Empty, _) => {
            let list = rt.anchored(|rt| {
                let mut out = ListBuilder::anchored();
                out.push_all(rt, items)?;
                Ok(out.finish())
            })?;
            Ok(list)
        }
        (SeqKind::ListLike, TypeTag::Cons | TypeTag::LazyCons) => {
            replace_list(rt, seq, items, from_b, to_b)
        }
        (SeqKind::VectorLike, TypeTag::Vector) => {
            let len = length(rt, seq)?;
            let (from, to) = resolve(from_b, to_b, len);
            let new_items = seq_items(rt, items)?;
            splice_vec(rt, seq, from, to, &new_items)?;
            Ok(seq)
        }
        (SeqKind::VectorLike, TypeTag::Lit) => Err(Error::type_mismatch(
            "replace",
            format!("cannot modify literal string {}", render(rt, seq)),
        )),
        (SeqKind::VectorLike, TypeTag::Str | TypeTag::LazyStr) => {
            let len = length(rt, seq)?;
            let (from, to) = resolve(from_b, to_b, len);
            let chars = item_chars(rt, items)?;
            splice_chars(rt, seq, from, to, &chars)?;
            Ok(seq)
        }
        _ => Err(Error::type_mismatch(
            "replace",
            format!("cannot modify {}", render(rt, seq)),
        )),
    }
}

fn item_chars(rt: &mut Runtime, items: Value) -> Result<Vec<char>> {
    seq_items(rt, items)?
        .into_iter()
        .map(|item| match item {
            Value::Char(c) => Ok(c),
            other => Err(Error::type_mismatch(
                "replace",
                format!("cannot store {} in a string", render(rt, other)),
            )),
        })
        .collect()
}

fn replace_list(rt: &mut Runtime, list: Value, items: Value, from: Bound, to: Bound) -> Result<Value> {
    let len = length(rt, list)?;
    let (from, to) = resolve(from, to, len);
    rt.anchored(|rt| {
        rt.anchor(list);
        let tail = nthcdr(rt, to, list)?;
        rt.anchor(tail);
        let mut middle = ListBuilder::anchored();
        middle.push_all(rt, items)?;
        let spliced = middle.finish_with(rt, tail)?;
        if from == 0 {
            return Ok(spliced);
        }
        let before = nthcdr(rt, from - 1, list)?;
        if let Some(handle) = before.as_handle() {
            rt.heap.set(handle, Place::Rest, spliced)?;
        }
        Ok(list)
    })
}

fn replace_indices(rt: &mut Runtime, seq: Value, items: Value, indices: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        rt.anchor(items);
        rt.anchor(indices);
        let mut index_iter = SeqIter::begin(rt, indices)?;
        let mut item_iter = SeqIter::begin(rt, items)?;
        while let Some(index) = index_iter.next(rt)? {
            let Some(item) = item_iter.next(rt)? else {
                break;
            };
            seq_refset(rt, seq, index, item)?;
        }
        Ok(seq)
    })
}

/// Elements of `seq` at each index in `indices`, in the kind of `seq`.
/// Indices outside the sequence are skipped.
pub fn sel(rt: &mut Runtime, seq: Value, indices: Value) -> Result<Value> {
    if rt.classify(seq) == TypeTag::Map {
        return select_map(rt, seq, indices);
    }
    let len = length(rt, seq)? as i64;
    rt.anchored(|rt| {
        rt.anchor(seq);
        rt.anchor(indices);
        let mut out = ListBuilder::anchored();
        let mut iter = SeqIter::begin(rt, indices)?;
        while let Some(index) = iter.next(rt)? {
            let Value::Fixnum(n) = index else {
                return Err(bad_index(rt, "sel", index));
            };
            let n = if n < 0 { n + len } else { n };
            if (0..len).contains(&n) {
                let item = seq_ref(rt, seq, Value::Fixnum(n))?;
                out.push(rt, item)?;
            }
        }
        let list = out.finish();
        make_like(rt, list, seq)
    })
}

fn select_map(rt: &mut Runtime, map: Value, keys: Value) -> Result<Value> {
    use crate::runtime::map::{make_map, map_get, map_kind, map_set};
    let kind = map_kind(rt, map)?;
    let out = make_map(rt, kind);
    rt.anchored(|rt| {
        rt.anchor(out);
        let mut iter = SeqIter::begin(rt, keys)?;
        while let Some(key) = iter.next(rt)? {
            if let Some(value) = map_get(rt, map, key)? {
                map_set(rt, out, key, value)?;
            }
        }
        Ok(out)
    })
}

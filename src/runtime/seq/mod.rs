//! Generic sequence protocol.
//!
//! Every algorithm in this module tree is written against four things only:
//! the classification returned by [`seq_info`], the [`SeqIter`] iteration
//! protocol, and the primitives head/rest ([`car`]/[`cdr`]), indexed get/set
//! ([`seq_ref`]/[`seq_refset`]), key lookup (maps) and [`length`]. A new
//! container kind, including a foreign class, plugs in by answering those.
//!
//! Algorithms that call user functions or force lazy cells keep their inputs
//! and partial results anchored for the duration of the call.
use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    foreign::foreign_class,
    gc::HeapObject,
    lazy::force,
    map::{make_map, map_count, map_entry_from, map_get, map_kind, map_set},
    number::index_of,
    pair::{ListBuilder, cons, rplaca},
    render::render,
    string::{
        chr_str_set, length_str, lazy_str_force_upto, str_content, string_from_chars,
    },
    value::{TypeTag, Value},
    vector::{copy_vec, length_vec, vec_from_list, vec_set, vecref},
};

pub mod partition;
pub mod search;
pub mod setops;
pub mod sort;
pub mod sub;
pub mod transform;
pub mod window;

pub use partition::{partition, partition_by, split, split_star, tuples};
pub use search::{
    all, count_if, ends_with, find, find_if, find_max, find_min, in_seq, member, member_if,
    mismatch, none, pos, pos_if, rfind, rpos, some, starts_with,
};
pub use setops::{diff, isec, symdiff, uni};
pub use sort::{grade, group_by, shuffle, sort, sort_group, unique};
pub use sub::{replace, sel, sub};
pub use transform::{flatten, keep_if, mapcar, mapdo, mappend, reduce_left, reduce_right, remove_if};
pub use window::{Boundary, MAX_WINDOW, window_map, window_mappend};

/// Sequence classification of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqKind {
    NotSeq,
    Empty,
    ListLike,
    VectorLike,
    MapLike,
}

/// A value together with its tag and sequence kind.
#[derive(Debug, Clone, Copy)]
pub struct SeqInfo {
    pub object: Value,
    pub tag: TypeTag,
    pub kind: SeqKind,
}

/// Classifies `value`.
///
/// A pure function of the tag, except for foreign objects: a class with a
/// head accessor is list-like, otherwise one with a length accessor is
/// vector-like, otherwise the object is not a sequence.
pub fn seq_info(rt: &Runtime, value: Value) -> SeqInfo {
    let tag = rt.classify(value);
    let kind = match tag {
        TypeTag::Nil => SeqKind::Empty,
        TypeTag::Cons | TypeTag::LazyCons => SeqKind::ListLike,
        TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr | TypeTag::Vector => SeqKind::VectorLike,
        TypeTag::Map => SeqKind::MapLike,
        TypeTag::Foreign => match foreign_class(rt, value) {
            Some(class) if class.has_head() => SeqKind::ListLike,
            Some(class) if class.has_length() => SeqKind::VectorLike,
            _ => SeqKind::NotSeq,
        },
        _ => SeqKind::NotSeq,
    };
    SeqInfo {
        object: value,
        tag,
        kind,
    }
}

fn not_a_sequence(rt: &Runtime, op: &'static str, value: Value) -> Error {
    Error::type_mismatch(op, format!("{} is not a sequence", render(rt, value)))
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    Done,
    List(Value),
    Indexed(usize),
    /// Byte offset into a literal string.
    Text(usize),
    Map(usize),
}

/// Iterator over any sequence.
///
/// The iterator does not anchor the sequence; callers that invoke callables
/// between steps anchor it themselves.
#[derive(Debug, Clone, Copy)]
pub struct SeqIter {
    info: SeqInfo,
    cursor: Cursor,
}

impl SeqIter {
    pub fn begin(rt: &Runtime, value: Value) -> Result<SeqIter> {
        let info = seq_info(rt, value);
        let cursor = Self::start(info);
        if info.kind == SeqKind::NotSeq {
            return Err(Error::type_mismatch(
                "seq-begin",
                format!("unsupported object {}", render(rt, value)),
            ));
        }
        Ok(SeqIter { info, cursor })
    }

    fn start(info: SeqInfo) -> Cursor {
        match info.kind {
            SeqKind::Empty | SeqKind::NotSeq => Cursor::Done,
            SeqKind::ListLike => Cursor::List(info.object),
            SeqKind::VectorLike if info.tag == TypeTag::Lit => Cursor::Text(0),
            SeqKind::VectorLike => Cursor::Indexed(0),
            SeqKind::MapLike => Cursor::Map(0),
        }
    }

    pub fn info(&self) -> SeqInfo {
        self.info
    }

    /// Restarts from the first element.
    pub fn rewind(&mut self) {
        self.cursor = Self::start(self.info);
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, rt: &mut Runtime) -> Result<Option<Value>> {
        match self.cursor {
            Cursor::Done => Ok(None),
            Cursor::List(at) => {
                if at.is_nil() {
                    self.cursor = Cursor::Done;
                    return Ok(None);
                }
                let item = car(rt, at)?;
                self.cursor = Cursor::List(cdr(rt, at)?);
                Ok(Some(item))
            }
            Cursor::Indexed(index) => {
                // The bound is checked on every step: the sequence may change
                // length while it is being iterated.
                match element_at(rt, self.info.object, index)? {
                    Some(item) => {
                        self.cursor = Cursor::Indexed(index + 1);
                        Ok(Some(item))
                    }
                    None => {
                        self.cursor = Cursor::Done;
                        Ok(None)
                    }
                }
            }
            Cursor::Text(offset) => {
                let next = match rt.object(self.info.object) {
                    Some(HeapObject::Lit(text)) => text[offset..].chars().next(),
                    _ => None,
                };
                match next {
                    Some(ch) => {
                        self.cursor = Cursor::Text(offset + ch.len_utf8());
                        Ok(Some(Value::Char(ch)))
                    }
                    None => {
                        self.cursor = Cursor::Done;
                        Ok(None)
                    }
                }
            }
            Cursor::Map(pos) => match map_entry_from(rt, self.info.object, pos)? {
                Some((next, key, value)) => {
                    self.cursor = Cursor::Map(next);
                    Ok(Some(cons(rt, key, value)))
                }
                None => {
                    self.cursor = Cursor::Done;
                    Ok(None)
                }
            },
        }
    }
}

/// Element `index` of a vector-like value, or `None` past the end.
fn element_at(rt: &mut Runtime, seq: Value, index: usize) -> Result<Option<Value>> {
    if rt.classify(seq) == TypeTag::LazyStr && !lazy_str_force_upto(rt, seq, index)? {
        return Ok(None);
    }
    match rt.object(seq) {
        Some(HeapObject::Vector(vec)) => return Ok(vec.as_slice().get(index).copied()),
        Some(HeapObject::Lit(text)) => return Ok(text.chars().nth(index).map(Value::Char)),
        Some(HeapObject::Str(s)) => return Ok(s.as_chars().get(index).copied().map(Value::Char)),
        Some(HeapObject::LazyStr(l)) => return Ok(l.prefix.get(index).copied().map(Value::Char)),
        _ => {}
    }
    match foreign_class(rt, seq) {
        Some(class) => {
            if index < class.length(rt, seq)? {
                Ok(Some(class.index(rt, seq, index)?))
            } else {
                Ok(None)
            }
        }
        None => Err(not_a_sequence(rt, "seq-next", seq)),
    }
}

/// Collects every element of `seq`.
pub fn seq_items(rt: &mut Runtime, seq: Value) -> Result<Vec<Value>> {
    let mut iter = SeqIter::begin(rt, seq)?;
    let mut items = Vec::new();
    while let Some(item) = iter.next(rt)? {
        items.push(item);
    }
    Ok(items)
}

/// Head of a list-like value; element zero of a vector or string. Forces a
/// lazy pair.
pub fn car(rt: &mut Runtime, value: Value) -> Result<Value> {
    match rt.classify(value) {
        TypeTag::Nil => Ok(Value::Nil),
        TypeTag::Cons => match rt.object(value) {
            Some(HeapObject::Cons(cell)) => Ok(cell.head),
            _ => Ok(Value::Nil),
        },
        TypeTag::LazyCons => {
            force(rt, value)?;
            match rt.object(value) {
                Some(HeapObject::LazyCons(cell)) => Ok(cell.head),
                _ => Ok(Value::Nil),
            }
        }
        TypeTag::Vector | TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr => {
            Ok(element_at(rt, value, 0)?.unwrap_or(Value::Nil))
        }
        TypeTag::Foreign => match foreign_class(rt, value) {
            Some(class) if class.has_head() => class.head(rt, value),
            Some(class) if class.has_length() => {
                Ok(element_at(rt, value, 0)?.unwrap_or(Value::Nil))
            }
            _ => Err(Error::type_mismatch(
                "car",
                format!("{} is not a cons", render(rt, value)),
            )),
        },
        _ => Err(Error::type_mismatch(
            "car",
            format!("{} is not a cons", render(rt, value)),
        )),
    }
}

/// Rest of a list-like value; everything after element zero of a vector or
/// string (nil when that would be empty). Forces a lazy pair.
pub fn cdr(rt: &mut Runtime, value: Value) -> Result<Value> {
    match rt.classify(value) {
        TypeTag::Nil => Ok(Value::Nil),
        TypeTag::Cons => match rt.object(value) {
            Some(HeapObject::Cons(cell)) => Ok(cell.rest),
            _ => Ok(Value::Nil),
        },
        TypeTag::LazyCons => {
            force(rt, value)?;
            match rt.object(value) {
                Some(HeapObject::LazyCons(cell)) => Ok(cell.rest),
                _ => Ok(Value::Nil),
            }
        }
        TypeTag::Vector | TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr => {
            if element_at(rt, value, 1)?.is_some() {
                sub(rt, value, Value::Fixnum(1), Value::T)
            } else {
                Ok(Value::Nil)
            }
        }
        TypeTag::Foreign => match foreign_class(rt, value) {
            Some(class) if class.has_head() => class.rest(rt, value),
            _ => Err(Error::type_mismatch(
                "cdr",
                format!("{} is not a cons", render(rt, value)),
            )),
        },
        _ => Err(Error::type_mismatch(
            "cdr",
            format!("{} is not a cons", render(rt, value)),
        )),
    }
}

/// Applies a path of `a` (head) and `d` (rest) steps, read right to left as
/// in the accessor names: `cxr(rt, "ad", x)` is `car(cdr(x))`.
pub fn cxr(rt: &mut Runtime, path: &str, value: Value) -> Result<Value> {
    let mut value = value;
    for step in path.chars().rev() {
        value = match step {
            'a' => car(rt, value)?,
            'd' => cdr(rt, value)?,
            other => {
                return Err(Error::type_mismatch(
                    "cxr",
                    format!("bad path step {:?}", other),
                ));
            }
        };
    }
    Ok(value)
}

macro_rules! cxr_accessors {
    ($($name:ident => $path:literal),* $(,)?) => {
        $(
            pub fn $name(rt: &mut Runtime, value: Value) -> Result<Value> {
                cxr(rt, $path, value)
            }
        )*
    };
}

cxr_accessors! {
    caar => "aa", cadr => "ad", cdar => "da", cddr => "dd",
    caaar => "aaa", caadr => "aad", cadar => "ada", caddr => "add",
    cdaar => "daa", cdadr => "dad", cddar => "dda", cdddr => "ddd",
}

/// `n` applications of [`cdr`].
pub fn nthcdr(rt: &mut Runtime, n: usize, list: Value) -> Result<Value> {
    let mut cursor = list;
    for _ in 0..n {
        if cursor.is_nil() {
            break;
        }
        cursor = cdr(rt, cursor)?;
    }
    Ok(cursor)
}

pub fn nth(rt: &mut Runtime, n: usize, list: Value) -> Result<Value> {
    let tail = nthcdr(rt, n, list)?;
    car(rt, tail)
}

/// Number of elements. Walks (and forces) list-like sequences.
pub fn length(rt: &mut Runtime, seq: Value) -> Result<usize> {
    let info = seq_info(rt, seq);
    match (info.kind, info.tag) {
        (SeqKind::Empty, _) => Ok(0),
        (SeqKind::VectorLike, TypeTag::Vector) => length_vec(rt, seq),
        (SeqKind::VectorLike, TypeTag::Foreign) => match foreign_class(rt, seq) {
            Some(class) => class.length(rt, seq),
            None => Err(not_a_sequence(rt, "length", seq)),
        },
        (SeqKind::VectorLike, _) => length_str(rt, seq),
        (SeqKind::MapLike, _) => map_count(rt, seq),
        (SeqKind::ListLike, _) => {
            let mut count = 0;
            let mut cursor = seq;
            while !cursor.is_nil() {
                cursor = cdr(rt, cursor)?;
                count += 1;
            }
            Ok(count)
        }
        (SeqKind::NotSeq, _) => Err(not_a_sequence(rt, "length", seq)),
    }
}

/// Whether `seq` has no elements. Never forces more than one element.
pub fn empty(rt: &mut Runtime, seq: Value) -> Result<bool> {
    let info = seq_info(rt, seq);
    match info.kind {
        SeqKind::Empty => Ok(true),
        SeqKind::ListLike => Ok(false),
        SeqKind::VectorLike => Ok(element_at(rt, seq, 0)?.is_none()),
        SeqKind::MapLike => Ok(map_count(rt, seq)? == 0),
        SeqKind::NotSeq => Err(not_a_sequence(rt, "empty", seq)),
    }
}

/// `seq`, or nil when it is empty.
pub fn nullify(rt: &mut Runtime, seq: Value) -> Result<Value> {
    if seq_info(rt, seq).kind != SeqKind::NotSeq && empty(rt, seq)? {
        Ok(Value::Nil)
    } else {
        Ok(seq)
    }
}

/// Resolves an index (negative counts from the end) against a length the
/// caller only computes when needed.
fn signed_index(
    rt: &mut Runtime,
    op: &'static str,
    seq: Value,
    index: Value,
) -> Result<Option<usize>> {
    let index = index_of(op, index)?;
    if index >= 0 {
        return Ok(Some(index as usize));
    }
    let len = length(rt, seq)? as i64;
    let resolved = index + len;
    Ok((resolved >= 0).then_some(resolved as usize))
}

/// Indexed read. Lists answer nil past the end; vectors and strings raise
/// `RangeError`; maps look the index up as a key.
pub fn seq_ref(rt: &mut Runtime, seq: Value, index: Value) -> Result<Value> {
    let info = seq_info(rt, seq);
    match (info.kind, info.tag) {
        (SeqKind::Empty, _) => Ok(Value::Nil),
        (SeqKind::MapLike, _) => Ok(map_get(rt, seq, index)?.unwrap_or(Value::Nil)),
        (SeqKind::ListLike, _) => match signed_index(rt, "ref", seq, index)? {
            Some(n) => nth(rt, n, seq),
            None => Ok(Value::Nil),
        },
        (SeqKind::VectorLike, TypeTag::Vector) => vecref(rt, seq, index_of("ref", index)?),
        (SeqKind::VectorLike, _) => {
            let resolved = signed_index(rt, "ref", seq, index)?;
            match resolved {
                Some(n) => match element_at(rt, seq, n)? {
                    Some(item) => Ok(item),
                    None => Err(out_of_range(rt, "ref", seq, index)),
                },
                None => Err(out_of_range(rt, "ref", seq, index)),
            }
        }
        (SeqKind::NotSeq, _) => Err(not_a_sequence(rt, "ref", seq)),
    }
}

fn out_of_range(rt: &Runtime, op: &'static str, seq: Value, index: Value) -> Error {
    Error::range(
        op,
        format!(
            "index {} is out of range for {}",
            render(rt, index),
            render(rt, seq)
        ),
    )
}

/// Indexed write through the barrier. Returns `item`.
pub fn seq_refset(rt: &mut Runtime, seq: Value, index: Value, item: Value) -> Result<Value> {
    let info = seq_info(rt, seq);
    match (info.kind, info.tag) {
        (SeqKind::MapLike, _) => map_set(rt, seq, index, item),
        (SeqKind::ListLike, _) => {
            let n = signed_index(rt, "refset", seq, index)?
                .ok_or_else(|| out_of_range(rt, "refset", seq, index))?;
            let cell = nthcdr(rt, n, seq)?;
            if !rt.classify(cell).is_cons() {
                return Err(out_of_range(rt, "refset", seq, index));
            }
            rplaca(rt, cell, item)?;
            Ok(item)
        }
        (SeqKind::VectorLike, TypeTag::Vector) => vec_set(rt, seq, index_of("refset", index)?, item),
        (SeqKind::VectorLike, TypeTag::Foreign) => {
            let n = signed_index(rt, "refset", seq, index)?
                .ok_or_else(|| out_of_range(rt, "refset", seq, index))?;
            match foreign_class(rt, seq) {
                Some(class) => class.set_index(rt, seq, n, item)?,
                None => return Err(not_a_sequence(rt, "refset", seq)),
            }
            Ok(item)
        }
        (SeqKind::VectorLike, _) => {
            let Value::Char(ch) = item else {
                return Err(Error::type_mismatch(
                    "refset",
                    format!("cannot store {} in a string", render(rt, item)),
                ));
            };
            let n = signed_index(rt, "refset", seq, index)?
                .ok_or_else(|| out_of_range(rt, "refset", seq, index))?;
            chr_str_set(rt, seq, n, ch)?;
            Ok(item)
        }
        (SeqKind::Empty | SeqKind::NotSeq, _) => Err(Error::type_mismatch(
            "refset",
            format!("cannot modify {}", render(rt, seq)),
        )),
    }
}

/// The elements of `seq` as a list. Lists are returned as they are.
pub fn tolist(rt: &mut Runtime, seq: Value) -> Result<Value> {
    match seq_info(rt, seq).kind {
        SeqKind::Empty | SeqKind::ListLike if rt.classify(seq) != TypeTag::Foreign => Ok(seq),
        _ => rt.anchored(|rt| {
            rt.anchor(seq);
            let mut out = ListBuilder::anchored();
            out.push_all(rt, seq)?;
            Ok(out.finish())
        }),
    }
}

/// Converts `list` into the kind of `like`: a vector for vectors, a string
/// for strings when every element is a character, a list otherwise.
pub fn make_like(rt: &mut Runtime, list: Value, like: Value) -> Result<Value> {
    match rt.classify(like) {
        TypeTag::Vector => vec_from_list(rt, list),
        TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr => {
            let items = seq_items(rt, list)?;
            let chars: Option<Vec<char>> = items
                .iter()
                .map(|item| match item {
                    Value::Char(c) => Some(*c),
                    _ => None,
                })
                .collect();
            match chars {
                Some(chars) => Ok(string_from_chars(rt, chars)),
                None => Ok(list),
            }
        }
        _ => Ok(list),
    }
}

/// Shallow copy of the same kind.
pub fn copy_seq(rt: &mut Runtime, seq: Value) -> Result<Value> {
    let info = seq_info(rt, seq);
    match (info.kind, info.tag) {
        (SeqKind::Empty, _) => Ok(Value::Nil),
        (SeqKind::VectorLike, TypeTag::Vector) => copy_vec(rt, seq),
        (SeqKind::VectorLike, TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr) => {
            let chars = str_content(rt, seq)?;
            Ok(string_from_chars(rt, chars))
        }
        (SeqKind::MapLike, _) => {
            let kind = map_kind(rt, seq)?;
            let copy = make_map(rt, kind);
            rt.anchored(|rt| {
                rt.anchor(copy);
                let mut pos = 0;
                while let Some((next, key, value)) = map_entry_from(rt, seq, pos)? {
                    map_set(rt, copy, key, value)?;
                    pos = next;
                }
                Ok(copy)
            })
        }
        (SeqKind::NotSeq, _) => Err(not_a_sequence(rt, "copy", seq)),
        _ => rt.anchored(|rt| {
            rt.anchor(seq);
            let mut out = ListBuilder::anchored();
            out.push_all(rt, seq)?;
            Ok(out.finish())
        }),
    }
}

/// Elements in reverse order, in the kind of `seq`.
pub fn reverse(rt: &mut Runtime, seq: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        let mut iter = SeqIter::begin(rt, seq)?;
        let mut out = Value::Nil;
        while let Some(item) = iter.next(rt)? {
            out = cons(rt, item, out);
            rt.anchor(out);
        }
        make_like(rt, out, seq)
    })
}

/// Concatenation. Every list but the last is copied and the last is shared;
/// a vector or string as the first non-nil operand yields a vector or string.
pub fn append(rt: &mut Runtime, seqs: &[Value]) -> Result<Value> {
    let Some((&last, init)) = seqs.split_last() else {
        return Ok(Value::Nil);
    };
    rt.anchored(|rt| {
        for &seq in seqs {
            rt.anchor(seq);
        }
        let first = seqs.iter().copied().find(|s| !s.is_nil()).unwrap_or(Value::Nil);
        let mut out = ListBuilder::anchored();
        for &seq in init {
            out.push_all(rt, seq)?;
        }
        match rt.classify(first) {
            TypeTag::Vector | TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr => {
                out.push_all(rt, last)?;
                let list = out.finish();
                make_like(rt, list, first)
            }
            _ => {
                let tail = match seq_info(rt, last).kind {
                    SeqKind::Empty | SeqKind::ListLike | SeqKind::NotSeq => last,
                    _ => tolist(rt, last)?,
                };
                out.finish_with(rt, tail)
            }
        }
    })
}

/// The last `n` elements: the last `n` cells of a list, or a sub-sequence.
pub fn last(rt: &mut Runtime, seq: Value, n: usize) -> Result<Value> {
    if seq_info(rt, seq).kind == SeqKind::ListLike && rt.classify(seq).is_cons() {
        let mut lead = nthcdr(rt, n, seq)?;
        let mut trail = seq;
        while rt.classify(lead).is_cons() {
            lead = cdr(rt, lead)?;
            trail = cdr(rt, trail)?;
        }
        return Ok(trail);
    }
    let len = length(rt, seq)? as i64;
    sub(rt, seq, Value::Fixnum((len - n as i64).max(0)), Value::T)
}

/// Everything except the last `n` elements.
pub fn butlast(rt: &mut Runtime, seq: Value, n: usize) -> Result<Value> {
    let len = length(rt, seq)? as i64;
    sub(rt, seq, Value::Fixnum(0), Value::Fixnum((len - n as i64).max(0)))
}

#[cfg(test)]
mod mod_test;
#[cfg(test)]
mod sort_test;
#[cfg(test)]
mod sub_test;
#[cfg(test)]
mod transform_test;
#[cfg(test)]
mod partition_test;

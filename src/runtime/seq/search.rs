//! Searching. Every operation takes an optional `test` (two arguments,
//! default [`equal`]) and an optional `key` (one argument, default identity);
//! nil or the missing sentinel selects the default.
use crate::runtime::{
    call::{call1, call2},
    compare::{equal, greater, less},
    context::Runtime,
    error::Result,
    value::Value,
};

use super::{SeqIter, SeqKind, car, cdr, seq_info, sub};

pub(crate) fn apply_key(rt: &mut Runtime, key: Value, item: Value) -> Result<Value> {
    match key.supplied() {
        Some(f) => call1(rt, f, item),
        None => Ok(item),
    }
}

pub(crate) fn apply_test(rt: &mut Runtime, test: Value, a: Value, b: Value) -> Result<bool> {
    match test.supplied() {
        Some(f) => Ok(call2(rt, f, a, b)?.is_truthy()),
        None => equal(rt, a, b),
    }
}

fn apply_pred(rt: &mut Runtime, pred: Value, key: Value, item: Value) -> Result<Value> {
    let keyed = apply_key(rt, key, item)?;
    call1(rt, pred, keyed)
}

/// Walks `seq` calling `visit(rt, element)` until it answers `true`.
/// Returns the index and element it stopped at.
fn scan(
    rt: &mut Runtime,
    seq: Value,
    anchors: &[Value],
    mut visit: impl FnMut(&mut Runtime, Value) -> Result<bool>,
) -> Result<Option<(usize, Value)>> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        for &value in anchors {
            rt.anchor(value);
        }
        let mut iter = SeqIter::begin(rt, seq)?;
        let mut index = 0;
        while let Some(item) = iter.next(rt)? {
            if visit(rt, item)? {
                return Ok(Some((index, item)));
            }
            index += 1;
        }
        Ok(None)
    })
}

/// Like [`scan`] but visits every element and keeps the last hit.
fn scan_last(
    rt: &mut Runtime,
    seq: Value,
    anchors: &[Value],
    mut visit: impl FnMut(&mut Runtime, Value) -> Result<bool>,
) -> Result<Option<(usize, Value)>> {
    let mut found = None;
    let mut index = 0;
    scan(rt, seq, anchors, |rt, item| {
        if visit(rt, item)? {
            found = Some((index, item));
        }
        index += 1;
        Ok(false)
    })?;
    Ok(found)
}

/// First element whose key matches `item`, or nil.
pub fn find(rt: &mut Runtime, item: Value, seq: Value, test: Value, key: Value) -> Result<Value> {
    let hit = scan(rt, seq, &[item], |rt, elem| {
        let keyed = apply_key(rt, key, elem)?;
        apply_test(rt, test, item, keyed)
    })?;
    Ok(hit.map_or(Value::Nil, |(_, elem)| elem))
}

/// Last element whose key matches `item`, or nil.
pub fn rfind(rt: &mut Runtime, item: Value, seq: Value, test: Value, key: Value) -> Result<Value> {
    let hit = scan_last(rt, seq, &[item], |rt, elem| {
        let keyed = apply_key(rt, key, elem)?;
        apply_test(rt, test, item, keyed)
    })?;
    Ok(hit.map_or(Value::Nil, |(_, elem)| elem))
}

pub fn find_if(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    let hit = scan(rt, seq, &[], |rt, elem| {
        Ok(apply_pred(rt, pred, key, elem)?.is_truthy())
    })?;
    Ok(hit.map_or(Value::Nil, |(_, elem)| elem))
}

/// Index of the first match as a fixnum, or nil.
pub fn pos(rt: &mut Runtime, item: Value, seq: Value, test: Value, key: Value) -> Result<Value> {
    let hit = scan(rt, seq, &[item], |rt, elem| {
        let keyed = apply_key(rt, key, elem)?;
        apply_test(rt, test, item, keyed)
    })?;
    Ok(hit.map_or(Value::Nil, |(index, _)| Value::from(index)))
}

pub fn rpos(rt: &mut Runtime, item: Value, seq: Value, test: Value, key: Value) -> Result<Value> {
    let hit = scan_last(rt, seq, &[item], |rt, elem| {
        let keyed = apply_key(rt, key, elem)?;
        apply_test(rt, test, item, keyed)
    })?;
    Ok(hit.map_or(Value::Nil, |(index, _)| Value::from(index)))
}

pub fn pos_if(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    let hit = scan(rt, seq, &[], |rt, elem| {
        Ok(apply_pred(rt, pred, key, elem)?.is_truthy())
    })?;
    Ok(hit.map_or(Value::Nil, |(index, _)| Value::from(index)))
}

/// The tail of `seq` starting at the first match, or nil. Lists share the
/// tail; other sequences yield a sub-sequence.
pub fn member(rt: &mut Runtime, item: Value, seq: Value, test: Value, key: Value) -> Result<Value> {
    member_by(rt, seq, &[item], |rt, elem| {
        let keyed = apply_key(rt, key, elem)?;
        apply_test(rt, test, item, keyed)
    })
}

pub fn member_if(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    member_by(rt, seq, &[], |rt, elem| {
        Ok(apply_pred(rt, pred, key, elem)?.is_truthy())
    })
}

fn member_by(
    rt: &mut Runtime,
    seq: Value,
    anchors: &[Value],
    mut matches: impl FnMut(&mut Runtime, Value) -> Result<bool>,
) -> Result<Value> {
    if seq_info(rt, seq).kind != SeqKind::ListLike {
        return match scan(rt, seq, anchors, matches)? {
            Some((index, _)) => sub(rt, seq, Value::from(index), Value::T),
            None => Ok(Value::Nil),
        };
    }
    rt.anchored(|rt| {
        rt.anchor(seq);
        for &value in anchors {
            rt.anchor(value);
        }
        let mut cursor = seq;
        while !cursor.is_nil() {
            let elem = car(rt, cursor)?;
            if matches(rt, elem)? {
                return Ok(cursor);
            }
            cursor = cdr(rt, cursor)?;
        }
        Ok(Value::Nil)
    })
}

pub fn in_seq(rt: &mut Runtime, seq: Value, item: Value, test: Value, key: Value) -> Result<bool> {
    let hit = scan(rt, seq, &[item], |rt, elem| {
        let keyed = apply_key(rt, key, elem)?;
        apply_test(rt, test, item, keyed)
    })?;
    Ok(hit.is_some())
}

pub fn count_if(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<usize> {
    let mut count = 0;
    scan(rt, seq, &[], |rt, elem| {
        if apply_pred(rt, pred, key, elem)?.is_truthy() {
            count += 1;
        }
        Ok(false)
    })?;
    Ok(count)
}

/// First true result of `pred`, or nil.
pub fn some(rt: &mut Runtime, seq: Value, pred: Value, key: Value) -> Result<Value> {
    let mut result = Value::Nil;
    scan(rt, seq, &[], |rt, elem| {
        result = apply_pred(rt, pred, key, elem)?;
        Ok(result.is_truthy())
    })?;
    Ok(result)
}

/// Nil at the first false result; otherwise the last result (t when empty).
pub fn all(rt: &mut Runtime, seq: Value, pred: Value, key: Value) -> Result<Value> {
    let mut result = Value::T;
    scan(rt, seq, &[], |rt, elem| {
        result = apply_pred(rt, pred, key, elem)?;
        Ok(!result.is_truthy())
    })?;
    Ok(result)
}

pub fn none(rt: &mut Runtime, seq: Value, pred: Value, key: Value) -> Result<bool> {
    Ok(!some(rt, seq, pred, key)?.is_truthy())
}

/// Element whose key wins under `test` (default [`greater`]), first one on
/// ties; nil when empty.
pub fn find_max(rt: &mut Runtime, seq: Value, test: Value, key: Value) -> Result<Value> {
    find_extreme(rt, seq, test, key, greater)
}

/// Like [`find_max`] with [`less`] as the default test.
pub fn find_min(rt: &mut Runtime, seq: Value, test: Value, key: Value) -> Result<Value> {
    find_extreme(rt, seq, test, key, less)
}

fn find_extreme(
    rt: &mut Runtime,
    seq: Value,
    test: Value,
    key: Value,
    default: fn(&mut Runtime, Value, Value) -> Result<bool>,
) -> Result<Value> {
    let mut best: Option<(Value, Value)> = None;
    scan(rt, seq, &[], |rt, elem| {
        let keyed = apply_key(rt, key, elem)?;
        let wins = match best {
            None => true,
            Some((_, best_key)) => match test.supplied() {
                Some(f) => call2(rt, f, keyed, best_key)?.is_truthy(),
                None => default(rt, keyed, best_key)?,
            },
        };
        if wins {
            rt.anchor(keyed);
            best = Some((elem, keyed));
        }
        Ok(false)
    })?;
    Ok(best.map_or(Value::Nil, |(elem, _)| elem))
}

/// Index of the first position where the sequences differ, or nil when
/// they are the same length and every element matches.
pub fn mismatch(rt: &mut Runtime, left: Value, right: Value, test: Value, key: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(left);
        rt.anchor(right);
        let mut li = SeqIter::begin(rt, left)?;
        let mut ri = SeqIter::begin(rt, right)?;
        let mut index = 0usize;
        loop {
            match (li.next(rt)?, ri.next(rt)?) {
                (None, None) => return Ok(Value::Nil),
                (Some(a), Some(b)) => {
                    let ka = apply_key(rt, key, a)?;
                    let kb = apply_key(rt, key, b)?;
                    if !apply_test(rt, test, ka, kb)? {
                        return Ok(Value::from(index));
                    }
                }
                _ => return Ok(Value::from(index)),
            }
            index += 1;
        }
    })
}

/// Whether every element of `prefix` matches the start of `seq`.
pub fn starts_with(rt: &mut Runtime, prefix: Value, seq: Value, test: Value, key: Value) -> Result<bool> {
    rt.anchored(|rt| {
        rt.anchor(prefix);
        rt.anchor(seq);
        let mut pi = SeqIter::begin(rt, prefix)?;
        let mut si = SeqIter::begin(rt, seq)?;
        while let Some(p) = pi.next(rt)? {
            let Some(s) = si.next(rt)? else {
                return Ok(false);
            };
            let ks = apply_key(rt, key, s)?;
            if !apply_test(rt, test, p, ks)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

/// Whether every element of `suffix` matches the end of `seq`.
pub fn ends_with(rt: &mut Runtime, suffix: Value, seq: Value, test: Value, key: Value) -> Result<bool> {
    rt.anchored(|rt| {
        rt.anchor(suffix);
        rt.anchor(seq);
        let tail = super::seq_items(rt, suffix)?;
        let items = super::seq_items(rt, seq)?;
        if tail.len() > items.len() {
            return Ok(false);
        }
        let start = items.len() - tail.len();
        for (&t, &s) in tail.iter().zip(&items[start..]) {
            let ks = apply_key(rt, key, s)?;
            if !apply_test(rt, test, t, ks)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

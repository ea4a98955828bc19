//! Set algebra over arbitrary sequences.
//!
//! Membership is decided by pairwise `test` over `key` images, so every
//! operation is O(n·m). Results keep the first operand's relative order and
//! take the kind of the first operand.
use crate::runtime::{
    context::Runtime,
    error::Result,
    pair::ListBuilder,
    value::Value,
};

use super::{
    make_like,
    search::{apply_key, apply_test},
    seq_items,
};

/// Elements of `seq` paired with their key images.
fn keyed(rt: &mut Runtime, seq: Value, key: Value) -> Result<Vec<(Value, Value)>> {
    let items = seq_items(rt, seq)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        rt.anchor(item);
        let image = apply_key(rt, key, item)?;
        rt.anchor(image);
        out.push((item, image));
    }
    Ok(out)
}

fn contains(rt: &mut Runtime, set: &[(Value, Value)], image: Value, test: Value) -> Result<bool> {
    for &(_, other) in set {
        if apply_test(rt, test, image, other)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `left` elements kept when their membership in `right` matches `wanted`.
fn filter_by_membership(
    rt: &mut Runtime,
    left: Value,
    right: Value,
    test: Value,
    key: Value,
    wanted: bool,
) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(left);
        rt.anchor(right);
        let lefts = keyed(rt, left, key)?;
        let rights = keyed(rt, right, key)?;
        let mut out = ListBuilder::anchored();
        for &(item, image) in &lefts {
            if contains(rt, &rights, image, test)? == wanted {
                out.push(rt, item)?;
            }
        }
        let list = out.finish();
        make_like(rt, list, left)
    })
}

/// Builds a result from all of `left`, then folds each `right` element into
/// it with `fold`.
fn merge_into_left<F>(
    rt: &mut Runtime,
    left: Value,
    right: Value,
    key: Value,
    mut fold: F,
) -> Result<Value>
where
    F: FnMut(&mut Runtime, &mut Vec<(Value, Value)>, (Value, Value)) -> Result<()>,
{
    rt.anchored(|rt| {
        rt.anchor(left);
        rt.anchor(right);
        let mut acc = keyed(rt, left, key)?;
        for entry in keyed(rt, right, key)? {
            fold(rt, &mut acc, entry)?;
        }
        let mut out = ListBuilder::anchored();
        for (item, _) in acc {
            out.push(rt, item)?;
        }
        let list = out.finish();
        make_like(rt, list, left)
    })
}

/// Elements of `left`, then each element of `right` not already in the
/// result.
pub fn uni(rt: &mut Runtime, left: Value, right: Value, test: Value, key: Value) -> Result<Value> {
    merge_into_left(rt, left, right, key, |rt, acc, (item, image)| {
        if !contains(rt, acc, image, test)? {
            acc.push((item, image));
        }
        Ok(())
    })
}

/// Elements of `left` found in `right`.
pub fn isec(rt: &mut Runtime, left: Value, right: Value, test: Value, key: Value) -> Result<Value> {
    filter_by_membership(rt, left, right, test, key, true)
}

/// Elements of `left` not found in `right`.
pub fn diff(rt: &mut Runtime, left: Value, right: Value, test: Value, key: Value) -> Result<Value> {
    filter_by_membership(rt, left, right, test, key, false)
}

/// Elements in exactly one of the two sequences: `left`'s first. Each
/// `right` element cancels the first matching element of the result, or is
/// appended when nothing matches, so duplicates cancel one for one.
pub fn symdiff(rt: &mut Runtime, left: Value, right: Value, test: Value, key: Value) -> Result<Value> {
    merge_into_left(rt, left, right, key, |rt, acc, (item, image)| {
        let mut found = None;
        for (at, &(_, other)) in acc.iter().enumerate() {
            if apply_test(rt, test, other, image)? {
                found = Some(at);
                break;
            }
        }
        match found {
            Some(at) => {
                acc.remove(at);
            }
            None => acc.push((item, image)),
        }
        Ok(())
    })
}

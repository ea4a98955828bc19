//! Sorting, shuffling and grouping.
//!
//! Lists are sorted with a stable top-down merge sort that relinks the
//! existing cells. Vectors and mutable strings are sorted in place with a
//! quicksort: median-of-three pivot above the configured size threshold,
//! middle element below it, Lomuto partition. Vector sorting is not stable.
use rand::Rng;

use crate::runtime::{
    call::call2,
    compare::{equal, less},
    context::Runtime,
    error::{Error, Result},
    gc::Place,
    map::{MapKind, make_map, map_get, map_set},
    pair::{ListBuilder, list},
    render::render,
    string::{splice_chars, str_content},
    value::{TypeTag, Value},
};

use super::{SeqIter, SeqKind, make_like, search::apply_key, seq_info, seq_items};

/// An element and the key it sorts by.
#[derive(Debug, Clone, Copy)]
struct Keyed {
    item: Value,
    key: Value,
}

fn before(rt: &mut Runtime, lessfn: Value, a: Value, b: Value) -> Result<bool> {
    match lessfn.supplied() {
        Some(f) => Ok(call2(rt, f, a, b)?.is_truthy()),
        None => less(rt, a, b),
    }
}

/// Pairs every element of `seq` with its key image; both are anchored in
/// the caller's scope.
fn keyed_items(rt: &mut Runtime, seq: Value, key: Value) -> Result<Vec<Keyed>> {
    let mut iter = SeqIter::begin(rt, seq)?;
    let mut out = Vec::new();
    while let Some(item) = iter.next(rt)? {
        rt.anchor(item);
        let image = apply_key(rt, key, item)?;
        rt.anchor(image);
        out.push(Keyed { item, key: image });
    }
    Ok(out)
}

/// Stable top-down merge sort of `order` (indices into `items`).
fn merge_sort(
    rt: &mut Runtime,
    items: &[Keyed],
    order: &mut Vec<usize>,
    lessfn: Value,
) -> Result<()> {
    if order.len() < 2 {
        return Ok(());
    }
    let mut right = order.split_off(order.len() / 2);
    merge_sort(rt, items, order, lessfn)?;
    merge_sort(rt, items, &mut right, lessfn)?;
    let left = std::mem::take(order);
    order.reserve(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        // Take from the right only when strictly smaller: equal keys keep
        // their original order.
        if before(rt, lessfn, items[right[j]].key, items[left[i]].key)? {
            order.push(right[j]);
            j += 1;
        } else {
            order.push(left[i]);
            i += 1;
        }
    }
    order.extend_from_slice(&left[i..]);
    order.extend_from_slice(&right[j..]);
    Ok(())
}

fn stable_order(rt: &mut Runtime, items: &[Keyed], lessfn: Value) -> Result<Vec<usize>> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    merge_sort(rt, items, &mut order, lessfn)?;
    Ok(order)
}

fn median_of_three(rt: &mut Runtime, items: &[Keyed], lo: usize, hi: usize, lessfn: Value) -> Result<usize> {
    let mid = lo + (hi - lo) / 2;
    let (a, b, c) = (items[lo].key, items[mid].key, items[hi].key);
    let index = if before(rt, lessfn, a, b)? {
        if before(rt, lessfn, b, c)? {
            mid
        } else if before(rt, lessfn, a, c)? {
            hi
        } else {
            lo
        }
    } else if before(rt, lessfn, a, c)? {
        lo
    } else if before(rt, lessfn, b, c)? {
        hi
    } else {
        mid
    };
    Ok(index)
}

/// Quicksorts `items[lo..=hi]`, recursing into the smaller partition and
/// looping on the larger one.
fn quicksort(
    rt: &mut Runtime,
    items: &mut [Keyed],
    mut lo: usize,
    mut hi: usize,
    lessfn: Value,
    threshold: usize,
) -> Result<()> {
    while lo < hi {
        let size = hi - lo + 1;
        let pivot = if size > threshold {
            median_of_three(rt, items, lo, hi, lessfn)?
        } else {
            lo + (hi - lo) / 2
        };
        items.swap(pivot, hi);
        let pivot_key = items[hi].key;
        let mut store = lo;
        for i in lo..hi {
            if before(rt, lessfn, items[i].key, pivot_key)? {
                items.swap(i, store);
                store += 1;
            }
        }
        items.swap(store, hi);
        if store - lo < hi - store {
            if store > lo {
                quicksort(rt, items, lo, store - 1, lessfn, threshold)?;
            }
            lo = store + 1;
        } else {
            quicksort(rt, items, store + 1, hi, lessfn, threshold)?;
            if store == lo {
                break;
            }
            hi = store - 1;
        }
    }
    Ok(())
}

/// Sorts `seq` by `lessfn` (default [`less`]) applied to `key` images.
///
/// Lists are relinked and the new head returned; vectors and mutable
/// strings are sorted in place and returned. Literal strings cannot be
/// sorted.
pub fn sort(rt: &mut Runtime, seq: Value, lessfn: Value, key: Value) -> Result<Value> {
    let info = seq_info(rt, seq);
    match (info.kind, info.tag) {
        (SeqKind::Empty, _) => Ok(Value::Nil),
        (SeqKind::ListLike, TypeTag::Cons | TypeTag::LazyCons) => sort_list(rt, seq, lessfn, key),
        (SeqKind::VectorLike, TypeTag::Vector) => sort_vector(rt, seq, lessfn, key),
        (SeqKind::VectorLike, TypeTag::Str | TypeTag::LazyStr) => sort_string(rt, seq, lessfn, key),
        (SeqKind::VectorLike, TypeTag::Lit) => Err(Error::type_mismatch(
            "sort",
            format!("cannot sort literal string {}", render(rt, seq)),
        )),
        _ => Err(Error::type_mismatch(
            "sort",
            format!("cannot sort {}", render(rt, seq)),
        )),
    }
}

fn sort_list(rt: &mut Runtime, list: Value, lessfn: Value, key: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(list);
        rt.anchor(lessfn);
        let mut cells = Vec::new();
        let mut cursor = list;
        while !cursor.is_nil() {
            rt.anchor(cursor);
            cells.push(cursor);
            cursor = super::cdr(rt, cursor)?;
        }
        let items = keyed_items(rt, list, key)?;
        let order = stable_order(rt, &items, lessfn)?;
        // Every cell is anchored above, so relinking cannot lose any.
        let mut next = Value::Nil;
        for &index in order.iter().rev() {
            let cell = cells[index];
            if let Some(handle) = cell.as_handle() {
                rt.heap.set(handle, Place::Head, items[index].item)?;
                rt.heap.set(handle, Place::Rest, next)?;
            }
            next = cell;
        }
        Ok(next)
    })
}

fn sort_vector(rt: &mut Runtime, vec: Value, lessfn: Value, key: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(vec);
        rt.anchor(lessfn);
        let mut items = keyed_items(rt, vec, key)?;
        if items.len() > 1 {
            let threshold = rt.config().sort_pivot_threshold;
            let hi = items.len() - 1;
            quicksort(rt, &mut items, 0, hi, lessfn, threshold)?;
        }
        if let Some(handle) = vec.as_handle() {
            for (index, entry) in items.iter().enumerate() {
                rt.heap.set(handle, Place::Index(index), entry.item)?;
            }
        }
        Ok(vec)
    })
}

fn sort_string(rt: &mut Runtime, s: Value, lessfn: Value, key: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(s);
        rt.anchor(lessfn);
        let mut items = keyed_items(rt, s, key)?;
        if items.len() > 1 {
            let threshold = rt.config().sort_pivot_threshold;
            let hi = items.len() - 1;
            quicksort(rt, &mut items, 0, hi, lessfn, threshold)?;
        }
        let chars: Vec<char> = items
            .iter()
            .filter_map(|entry| match entry.item {
                Value::Char(c) => Some(c),
                _ => None,
            })
            .collect();
        let len = str_content(rt, s)?.len();
        splice_chars(rt, s, 0, len, &chars)?;
        Ok(s)
    })
}

/// Randomly permutes `seq` (Fisher-Yates). Vectors and mutable strings are
/// permuted in place; other sequences yield a new sequence of their kind.
pub fn shuffle(rt: &mut Runtime, seq: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        let mut items = seq_items(rt, seq)?;
        for &item in &items {
            rt.anchor(item);
        }
        for i in (1..items.len()).rev() {
            let j = rt.rng().gen_range(0..=i);
            items.swap(i, j);
        }
        match rt.classify(seq) {
            TypeTag::Vector => {
                if let Some(handle) = seq.as_handle() {
                    for (index, &item) in items.iter().enumerate() {
                        rt.heap.set(handle, Place::Index(index), item)?;
                    }
                }
                Ok(seq)
            }
            TypeTag::Str | TypeTag::LazyStr => {
                let chars: Vec<char> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Char(c) => Some(*c),
                        _ => None,
                    })
                    .collect();
                splice_chars(rt, seq, 0, chars.len(), &chars)?;
                Ok(seq)
            }
            _ => {
                let shuffled = list(rt, &items);
                make_like(rt, shuffled, seq)
            }
        }
    })
}

/// The permutation of indices that would stably sort `seq`, as a list of
/// fixnums. `seq` itself is not modified.
pub fn grade(rt: &mut Runtime, seq: Value, lessfn: Value, key: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        rt.anchor(lessfn);
        let items = keyed_items(rt, seq, key)?;
        let order = stable_order(rt, &items, lessfn)?;
        let indices: Vec<Value> = order.into_iter().map(Value::from).collect();
        Ok(list(rt, &indices))
    })
}

/// Stably sorts a copy of `seq` by `key`, then groups runs of equal keys.
/// Returns a list of groups, each in the kind of `seq`.
pub fn sort_group(rt: &mut Runtime, seq: Value, key: Value, lessfn: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        rt.anchor(lessfn);
        let items = keyed_items(rt, seq, key)?;
        let order = stable_order(rt, &items, lessfn)?;
        let mut groups = ListBuilder::anchored();
        let mut run: Vec<Value> = Vec::new();
        let mut run_key: Option<Value> = None;
        for index in order {
            let entry = items[index];
            if let Some(current) = run_key
                && !equal(rt, current, entry.key)?
            {
                let group = list(rt, &run);
                let group = make_like(rt, group, seq)?;
                groups.push(rt, group)?;
                run.clear();
            }
            run_key = Some(entry.key);
            run.push(entry.item);
        }
        if !run.is_empty() {
            let group = list(rt, &run);
            let group = make_like(rt, group, seq)?;
            groups.push(rt, group)?;
        }
        Ok(groups.finish())
    })
}

/// Keeps the first element for each distinct `key` image (by `equal`),
/// in the kind of `seq`.
pub fn unique(rt: &mut Runtime, seq: Value, key: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        let seen = make_map(rt, MapKind::Equal);
        rt.anchor(seen);
        let mut out = ListBuilder::anchored();
        let mut iter = SeqIter::begin(rt, seq)?;
        while let Some(item) = iter.next(rt)? {
            rt.anchor(item);
            let image = apply_key(rt, key, item)?;
            if map_get(rt, seen, image)?.is_none() {
                map_set(rt, seen, image, Value::T)?;
                out.push(rt, item)?;
            }
        }
        let result = out.finish();
        make_like(rt, result, seq)
    })
}

/// Map from each `key` image (by `equal`) to the list of elements having
/// it, in their original order.
pub fn group_by(rt: &mut Runtime, key: Value, seq: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(seq);
        rt.anchor(key);
        let groups = make_map(rt, MapKind::Equal);
        rt.anchor(groups);
        let mut members: Vec<Vec<Value>> = Vec::new();
        let mut keys: Vec<Value> = Vec::new();
        let mut iter = SeqIter::begin(rt, seq)?;
        while let Some(item) = iter.next(rt)? {
            rt.anchor(item);
            let image = apply_key(rt, key, item)?;
            match map_get(rt, groups, image)? {
                Some(Value::Fixnum(slot)) => members[slot as usize].push(item),
                _ => {
                    map_set(rt, groups, image, Value::from(members.len()))?;
                    keys.push(image);
                    members.push(vec![item]);
                }
            }
        }
        for (image, items) in keys.into_iter().zip(members) {
            let group = list(rt, &items);
            map_set(rt, groups, image, group)?;
        }
        Ok(groups)
    })
}

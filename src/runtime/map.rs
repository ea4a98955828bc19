use std::collections::HashMap;

use crate::runtime::{
    compare::{eql, equal, hash_value},
    context::Runtime,
    error::{Error, Result},
    gc::HeapObject,
    pair::{ListBuilder, cons},
    render::render,
    value::{TypeTag, Value},
};

/// Key comparison a map uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    /// Value equality: identity plus numeric equality.
    Eql,
    /// Structural equality.
    Equal,
}

/// Key/value association.
///
/// Entries are kept in insertion order. Each entry carries an `order` stamp
/// that never changes, and iteration positions are expressed in stamps, so
/// removal during an iteration neither skips nor repeats entries. Removal
/// leaves a hole; once holes outnumber the live entries the table is
/// compacted and the buckets rebuilt from the stored hashes.
/// `fallback` is an ordered chain of other maps consulted on a miss.
#[derive(Debug, Clone)]
pub struct Map {
    pub(crate) kind: MapKind,
    entries: Vec<Slot>,
    buckets: HashMap<u64, Vec<usize>>,
    count: usize,
    next_order: usize,
    pub(crate) fallback: Vec<Value>,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    order: usize,
    hash: u64,
    pair: Option<(Value, Value)>,
}

/// Holes tolerated before a removal compacts the table.
const MIN_HOLES: usize = 8;

impl Map {
    pub fn new(kind: MapKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            buckets: HashMap::new(),
            count: 0,
            next_order: 0,
            fallback: Vec::new(),
        }
    }

    pub fn kind(&self) -> MapKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Slots in use, holes included.
    pub(crate) fn capacity_used(&self) -> usize {
        self.entries.len()
    }

    /// Live entries in enumeration order.
    pub(crate) fn live(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.entries.iter().filter_map(|slot| slot.pair)
    }

    pub(crate) fn trace(&self, out: &mut Vec<Value>) {
        for (key, value) in self.live() {
            out.push(key);
            out.push(value);
        }
        out.extend_from_slice(&self.fallback);
    }

    /// First live entry at or after position `pos`, with the position after it.
    pub(crate) fn entry_from(&self, pos: usize) -> Option<(usize, Value, Value)> {
        let start = self.entries.partition_point(|slot| slot.order < pos);
        self.entries[start..]
            .iter()
            .find_map(|slot| slot.pair.map(|(k, v)| (slot.order + 1, k, v)))
    }

    fn insert(&mut self, hash: u64, key: Value, value: Value) {
        let index = self.entries.len();
        self.entries.push(Slot {
            order: self.next_order,
            hash,
            pair: Some((key, value)),
        });
        self.next_order += 1;
        self.buckets.entry(hash).or_default().push(index);
        self.count += 1;
    }

    fn remove_at(&mut self, index: usize) -> Option<Value> {
        let slot = &mut self.entries[index];
        let old = slot.pair.take().map(|(_, v)| v);
        let hash = slot.hash;
        if let Some(indices) = self.buckets.get_mut(&hash) {
            indices.retain(|&i| i != index);
            if indices.is_empty() {
                self.buckets.remove(&hash);
            }
        }
        self.count -= 1;
        let holes = self.entries.len() - self.count;
        if holes > MIN_HOLES && holes > self.count {
            self.compact();
        }
        old
    }

    fn compact(&mut self) {
        self.entries.retain(|slot| slot.pair.is_some());
        self.buckets.clear();
        for (index, slot) in self.entries.iter().enumerate() {
            self.buckets.entry(slot.hash).or_default().push(index);
        }
    }
}

pub fn make_map(rt: &mut Runtime, kind: MapKind) -> Value {
    rt.alloc(HeapObject::Map(Map::new(kind)))
}

pub fn mapp(rt: &Runtime, value: Value) -> bool {
    rt.classify(value) == TypeTag::Map
}

fn map_ref<'a>(rt: &'a Runtime, op: &'static str, value: Value) -> Result<&'a Map> {
    match rt.object(value) {
        Some(HeapObject::Map(map)) => Ok(map),
        _ => Err(Error::type_mismatch(
            op,
            format!("{} is not a hash", render(rt, value)),
        )),
    }
}

fn map_mut<'a>(rt: &'a mut Runtime, op: &'static str, value: Value) -> Result<&'a mut Map> {
    map_ref(rt, op, value)?;
    let Some(handle) = value.as_handle() else {
        return Err(Error::type_mismatch(op, "not a hash"));
    };
    match rt.heap.get_mut(handle) {
        HeapObject::Map(map) => Ok(map),
        _ => Err(Error::type_mismatch(op, "not a hash")),
    }
}

pub fn map_count(rt: &Runtime, map: Value) -> Result<usize> {
    Ok(map_ref(rt, "hash-count", map)?.len())
}

pub fn map_kind(rt: &Runtime, map: Value) -> Result<MapKind> {
    Ok(map_ref(rt, "hash-kind", map)?.kind)
}

fn keys_match(rt: &mut Runtime, kind: MapKind, a: Value, b: Value) -> Result<bool> {
    match kind {
        MapKind::Eql => Ok(eql(rt, a, b)),
        MapKind::Equal => equal(rt, a, b),
    }
}

/// Slot index of `key` in `map` itself (fallbacks not consulted).
fn find_slot(rt: &mut Runtime, map: Value, key: Value) -> Result<(u64, Option<usize>)> {
    let kind = map_ref(rt, "gethash", map)?.kind;
    let hash = hash_value(rt, key, kind)?;
    let candidates: Vec<(usize, Value)> = {
        let m = map_ref(rt, "gethash", map)?;
        m.buckets
            .get(&hash)
            .map(|slots| {
                slots
                    .iter()
                    .filter_map(|&i| m.entries[i].pair.map(|(k, _)| (i, k)))
                    .collect()
            })
            .unwrap_or_default()
    };
    for (slot, candidate) in candidates {
        if keys_match(rt, kind, candidate, key)? {
            return Ok((hash, Some(slot)));
        }
    }
    Ok((hash, None))
}

/// Looks `key` up in `map`, then in each fallback map in order.
pub fn map_get(rt: &mut Runtime, map: Value, key: Value) -> Result<Option<Value>> {
    let (_, slot) = find_slot(rt, map, key)?;
    let m = map_ref(rt, "gethash", map)?;
    if let Some(slot) = slot
        && let Some((_, value)) = m.entries[slot].pair
    {
        return Ok(Some(value));
    }
    let fallback = m.fallback.clone();
    for other in fallback {
        if let Some(value) = map_get(rt, other, key)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Lookup returning `default` on a miss.
pub fn map_get_or(rt: &mut Runtime, map: Value, key: Value, default: Value) -> Result<Value> {
    Ok(map_get(rt, map, key)?.unwrap_or(default))
}

/// Inserts or updates. Returns `value`.
pub fn map_set(rt: &mut Runtime, map: Value, key: Value, value: Value) -> Result<Value> {
    let (hash, slot) = find_slot(rt, map, key)?;
    let m = map_mut(rt, "sethash", map)?;
    match slot {
        Some(slot) => m.entries[slot].pair = Some((key, value)),
        None => m.insert(hash, key, value),
    }
    if let Some(handle) = map.as_handle() {
        rt.heap.write_barrier(handle, key);
        rt.heap.write_barrier(handle, value);
    }
    Ok(value)
}

/// Removes `key`; returns the value it had.
pub fn map_remove(rt: &mut Runtime, map: Value, key: Value) -> Result<Option<Value>> {
    let (_, slot) = find_slot(rt, map, key)?;
    let Some(slot) = slot else {
        return Ok(None);
    };
    Ok(map_mut(rt, "remhash", map)?.remove_at(slot))
}

/// Replaces the fallback chain with the maps in `chain`.
pub fn map_set_fallback(rt: &mut Runtime, map: Value, chain: &[Value]) -> Result<()> {
    for &other in chain {
        map_ref(rt, "hash-fallback", other)?;
    }
    map_mut(rt, "hash-fallback", map)?.fallback = chain.to_vec();
    if let Some(handle) = map.as_handle() {
        for &other in chain {
            rt.heap.write_barrier(handle, other);
        }
    }
    Ok(())
}

/// Entry at or after iteration position `pos`.
pub(crate) fn map_entry_from(rt: &Runtime, map: Value, pos: usize) -> Result<Option<(usize, Value, Value)>> {
    Ok(map_ref(rt, "hash-next", map)?.entry_from(pos))
}

/// Every `(key . value)` pair in enumeration order.
pub fn map_pairs(rt: &mut Runtime, map: Value) -> Result<Value> {
    let entries: Vec<(Value, Value)> = map_ref(rt, "hash-pairs", map)?.live().collect();
    let mut out = ListBuilder::new();
    for (key, value) in entries {
        let pair = cons(rt, key, value);
        out.push(rt, pair)?;
    }
    Ok(out.finish())
}

pub fn map_keys(rt: &mut Runtime, map: Value) -> Result<Vec<Value>> {
    Ok(map_ref(rt, "hash-keys", map)?.live().map(|(k, _)| k).collect())
}

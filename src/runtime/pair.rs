use tracing::trace;

use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    gc::{HeapObject, Place},
    render::render,
    seq::{replace, seq_refset},
    value::{TypeTag, Value},
};

/// Ordinary pair cell.
#[derive(Debug, Clone, Copy)]
pub struct Cons {
    pub head: Value,
    pub rest: Value,
}

/// Pair whose contents are produced by a one-shot generator.
///
/// The generator receives the cell as its only argument and fills `head` and
/// `rest` through [`rplaca`] / [`rplacd`]. While the state is `Pending`, the
/// fields hold whatever the constructor preloaded and must not be read as
/// list contents.
#[derive(Debug, Clone, Copy)]
pub struct LazyCons {
    pub head: Value,
    pub rest: Value,
    pub state: LazyState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyState {
    Pending(Value),
    Forced,
}

/// Builds a pair, reusing a released cell when one is available.
pub fn cons(rt: &mut Runtime, head: Value, rest: Value) -> Value {
    if let Some(handle) = rt.pair_free_list.pop() {
        if let HeapObject::Cons(cell) = rt.heap.get_mut(handle) {
            cell.head = head;
            cell.rest = rest;
        }
        // A recycled cell may already be mature.
        rt.heap.write_barrier(handle, head);
        rt.heap.write_barrier(handle, rest);
        return Value::Obj(handle);
    }
    rt.alloc(HeapObject::Cons(Cons { head, rest }))
}

/// Builds a pending lazy pair around `generator`.
pub fn make_lazy_cons(rt: &mut Runtime, generator: Value) -> Value {
    make_lazy_cons_with(rt, generator, Value::Nil, Value::Nil)
}

/// Builds a pending lazy pair whose fields are preloaded with generator state.
pub fn make_lazy_cons_with(rt: &mut Runtime, generator: Value, head: Value, rest: Value) -> Value {
    rt.alloc(HeapObject::LazyCons(LazyCons {
        head,
        rest,
        state: LazyState::Pending(generator),
    }))
}

/// Releases a pair onto the free list with both fields cleared.
///
/// The caller promises nothing else references `pair`. Values that are not
/// ordinary conses are ignored.
pub fn release_pair(rt: &mut Runtime, pair: Value) {
    if !rt.config().recycle_pairs {
        return;
    }
    let Value::Obj(handle) = pair else {
        return;
    };
    if let HeapObject::Cons(cell) = rt.heap.get_mut(handle) {
        cell.head = Value::Nil;
        cell.rest = Value::Nil;
        rt.pair_free_list.push(handle);
        trace!(free = rt.pair_free_list.len(), "pair released");
    }
}

/// Releases every cell of a proper list.
pub fn release_list(rt: &mut Runtime, list: Value) {
    let mut cursor = list;
    while let Some(HeapObject::Cons(cell)) = rt.object(cursor) {
        let next = cell.rest;
        release_pair(rt, cursor);
        cursor = next;
    }
}

pub fn pair_free_count(rt: &Runtime) -> usize {
    rt.pair_free_list.len()
}

pub fn consp(rt: &Runtime, value: Value) -> bool {
    rt.classify(value).is_cons()
}

pub fn atom(rt: &Runtime, value: Value) -> bool {
    !consp(rt, value)
}

pub fn listp(rt: &Runtime, value: Value) -> bool {
    value.is_nil() || consp(rt, value)
}

/// Replaces the head of a pair, or element zero of a vector or string.
pub fn rplaca(rt: &mut Runtime, target: Value, value: Value) -> Result<Value> {
    match (rt.classify(target), target) {
        (TypeTag::Cons | TypeTag::LazyCons, Value::Obj(handle)) => {
            rt.heap.set(handle, Place::Head, value)?;
            Ok(target)
        }
        (TypeTag::Vector | TypeTag::Str | TypeTag::LazyStr, _) => {
            seq_refset(rt, target, Value::Fixnum(0), value)?;
            Ok(target)
        }
        _ => Err(Error::type_mismatch(
            "rplaca",
            format!("cannot modify {}", render(rt, target)),
        )),
    }
}

/// Replaces the rest of a pair, or everything after element zero of a vector
/// or string.
pub fn rplacd(rt: &mut Runtime, target: Value, value: Value) -> Result<Value> {
    match (rt.classify(target), target) {
        (TypeTag::Cons | TypeTag::LazyCons, Value::Obj(handle)) => {
            rt.heap.set(handle, Place::Rest, value)?;
            Ok(target)
        }
        (TypeTag::Vector | TypeTag::Str | TypeTag::LazyStr, _) => {
            replace(rt, target, value, Value::Fixnum(1), Value::T)?;
            Ok(target)
        }
        _ => Err(Error::type_mismatch(
            "rplacd",
            format!("cannot modify {}", render(rt, target)),
        )),
    }
}

/// Builds a proper list from a slice.
pub fn list(rt: &mut Runtime, items: &[Value]) -> Value {
    items
        .iter()
        .rev()
        .fold(Value::Nil, |rest, &item| cons(rt, item, rest))
}

/// Builds a proper list from an iterator.
pub fn list_from_iter(rt: &mut Runtime, items: impl IntoIterator<Item = Value>) -> Value {
    let items: Vec<Value> = items.into_iter().collect();
    list(rt, &items)
}

/// Appends to a list in order, keeping a pointer to the last cell.
///
/// A builder created with [`ListBuilder::anchored`] anchors its head as soon
/// as the first cell exists; use it inside [`Runtime::anchored`] when the
/// caller invokes callables between pushes.
#[derive(Debug, Default)]
pub struct ListBuilder {
    head: Value,
    tail: Option<Value>,
    anchor: bool,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchored() -> Self {
        Self {
            anchor: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_nil()
    }

    pub fn push(&mut self, rt: &mut Runtime, item: Value) -> Result<()> {
        let cell = cons(rt, item, Value::Nil);
        self.link(rt, cell)?;
        self.tail = Some(cell);
        Ok(())
    }

    /// Pushes every element of `seq`.
    pub fn push_all(&mut self, rt: &mut Runtime, seq: Value) -> Result<()> {
        let mut iter = crate::runtime::seq::SeqIter::begin(rt, seq)?;
        while let Some(item) = iter.next(rt)? {
            self.push(rt, item)?;
        }
        Ok(())
    }

    fn link(&mut self, rt: &mut Runtime, cell: Value) -> Result<()> {
        match self.tail.and_then(|tail| tail.as_handle()) {
            Some(tail) => rt.heap.set(tail, Place::Rest, cell),
            None => {
                self.head = cell;
                if self.anchor {
                    rt.anchor(cell);
                }
                Ok(())
            }
        }
    }

    /// Finishes the list with `tail` shared (not copied) as its rest.
    pub fn finish_with(mut self, rt: &mut Runtime, tail: Value) -> Result<Value> {
        if tail.is_nil() {
            return Ok(self.head);
        }
        self.link(rt, tail)?;
        Ok(self.head)
    }

    pub fn finish(self) -> Value {
        self.head
    }
}

use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    gc::{HeapObject, Place},
    pair::list,
    render::render,
    string::grown_capacity,
    value::{TypeTag, Value},
};

/// Contiguous indexable storage.
///
/// `alloc` is the logical capacity. It only ever grows: shrinking the length
/// keeps the storage.
#[derive(Debug, Clone)]
pub struct Vector {
    pub(crate) items: Vec<Value>,
    pub(crate) alloc: usize,
}

impl Vector {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.alloc
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }
}

/// Vector of `len` copies of `init`.
pub fn vector(rt: &mut Runtime, len: usize, init: Value) -> Result<Value> {
    let mut items = Vec::new();
    items
        .try_reserve_exact(len)
        .map_err(|err| Error::allocation("vector", err.to_string()))?;
    items.resize(len, init);
    Ok(rt.alloc(HeapObject::Vector(Vector { items, alloc: len })))
}

/// Vector holding a copy of `items`.
pub fn vector_from_slice(rt: &mut Runtime, items: &[Value]) -> Value {
    rt.alloc(HeapObject::Vector(Vector {
        items: items.to_vec(),
        alloc: items.len(),
    }))
}

pub fn vectorp(rt: &Runtime, value: Value) -> bool {
    rt.classify(value) == TypeTag::Vector
}

fn not_a_vector(rt: &Runtime, op: &'static str, value: Value) -> Error {
    Error::type_mismatch(op, format!("{} is not a vector", render(rt, value)))
}

fn vector_ref<'a>(rt: &'a Runtime, op: &'static str, value: Value) -> Result<&'a Vector> {
    match rt.object(value) {
        Some(HeapObject::Vector(vec)) => Ok(vec),
        _ => Err(not_a_vector(rt, op, value)),
    }
}

fn vector_mut<'a>(rt: &'a mut Runtime, op: &'static str, value: Value) -> Result<&'a mut Vector> {
    if !vectorp(rt, value) {
        return Err(not_a_vector(rt, op, value));
    }
    let Some(handle) = value.as_handle() else {
        return Err(Error::type_mismatch(op, "not a vector"));
    };
    match rt.heap.get_mut(handle) {
        HeapObject::Vector(vec) => Ok(vec),
        _ => Err(Error::type_mismatch(op, "not a vector")),
    }
}

pub fn length_vec(rt: &Runtime, value: Value) -> Result<usize> {
    Ok(vector_ref(rt, "length-vec", value)?.len())
}

/// Allocated capacity.
pub fn size_vec(rt: &Runtime, value: Value) -> Result<usize> {
    Ok(vector_ref(rt, "size-vec", value)?.capacity())
}

/// Snapshot of the elements.
pub fn vec_items(rt: &Runtime, value: Value) -> Result<Vec<Value>> {
    Ok(vector_ref(rt, "vec-items", value)?.items.clone())
}

/// Resolves a possibly negative index against `len`.
pub(crate) fn resolve_index(op: &'static str, index: i64, len: usize) -> Result<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved as usize >= len {
        return Err(Error::range(
            op,
            format!("index {} is out of range for length {}", index, len),
        ));
    }
    Ok(resolved as usize)
}

/// Element at `index`; negative indices count from the end.
pub fn vecref(rt: &Runtime, value: Value, index: i64) -> Result<Value> {
    let vec = vector_ref(rt, "vecref", value)?;
    let index = resolve_index("vecref", index, vec.len())?;
    Ok(vec.items[index])
}

/// Stores `item` at `index`; negative indices count from the end.
pub fn vec_set(rt: &mut Runtime, value: Value, index: i64, item: Value) -> Result<Value> {
    let len = length_vec(rt, value)?;
    let index = resolve_index("vec-set", index, len)?;
    if let Some(handle) = value.as_handle() {
        rt.heap.set(handle, Place::Index(index), item)?;
    }
    Ok(item)
}

/// Changes the length. New slots are nil; capacity grows by at least a
/// quarter when it must grow at all and never shrinks.
pub fn vec_set_length(rt: &mut Runtime, value: Value, new_len: usize) -> Result<Value> {
    let vec = vector_mut(rt, "vec-set-length", value)?;
    let alloc = grown_capacity("vec-set-length", vec.alloc, new_len)?;
    if alloc != vec.alloc {
        let additional = alloc - vec.items.len();
        vec.items
            .try_reserve_exact(additional)
            .map_err(|err| Error::allocation("vec-set-length", err.to_string()))?;
        vec.alloc = alloc;
    }
    vec.items.resize(new_len, Value::Nil);
    Ok(value)
}

/// Appends `item`, growing the storage as needed. Returns `item`.
pub fn vec_push(rt: &mut Runtime, value: Value, item: Value) -> Result<Value> {
    let len = length_vec(rt, value)?;
    let new_len = len
        .checked_add(1)
        .ok_or_else(|| Error::overflow("vec-push", "overflow"))?;
    vec_set_length(rt, value, new_len)?;
    if let Some(handle) = value.as_handle() {
        rt.heap.set(handle, Place::Index(len), item)?;
    }
    Ok(item)
}

/// Replaces `from..to` with `items`, shifting the tail.
pub(crate) fn splice_vec(
    rt: &mut Runtime,
    value: Value,
    from: usize,
    to: usize,
    items: &[Value],
) -> Result<()> {
    let vec = vector_mut(rt, "replace-vec", value)?;
    let new_len = vec.items.len() - (to - from) + items.len();
    let alloc = grown_capacity("replace-vec", vec.alloc, new_len)?;
    if alloc != vec.alloc {
        let additional = alloc.saturating_sub(vec.items.len());
        vec.items
            .try_reserve_exact(additional)
            .map_err(|err| Error::allocation("replace-vec", err.to_string()))?;
        vec.alloc = alloc;
    }
    vec.items.splice(from..to, items.iter().copied());
    if let Some(handle) = value.as_handle() {
        for &item in items {
            rt.heap.write_barrier(handle, item);
        }
    }
    Ok(())
}

/// Concatenates any sequences into a new vector.
pub fn cat_vec(rt: &mut Runtime, seqs: &[Value]) -> Result<Value> {
    let mut items = Vec::new();
    for &seq in seqs {
        let mut iter = crate::runtime::seq::SeqIter::begin(rt, seq)?;
        while let Some(item) = iter.next(rt)? {
            items.push(item);
        }
    }
    Ok(vector_from_slice(rt, &items))
}

pub fn copy_vec(rt: &mut Runtime, value: Value) -> Result<Value> {
    let items = vec_items(rt, value)?;
    Ok(vector_from_slice(rt, &items))
}

/// Vector holding the elements of a list.
pub fn vec_from_list(rt: &mut Runtime, list: Value) -> Result<Value> {
    cat_vec(rt, &[list])
}

pub fn list_from_vec(rt: &mut Runtime, value: Value) -> Result<Value> {
    let items = vec_items(rt, value)?;
    Ok(list(rt, &items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_grows_capacity_monotonically() {
        let mut rt = Runtime::new();
        let v = vector(&mut rt, 0, Value::Nil).unwrap();
        let mut last_capacity = 0;
        for i in 0..100 {
            vec_push(&mut rt, v, Value::Fixnum(i)).unwrap();
            let capacity = size_vec(&rt, v).unwrap();
            assert!(capacity >= last_capacity);
            assert!(capacity >= (i + 1) as usize);
            last_capacity = capacity;
        }
        assert_eq!(length_vec(&rt, v).unwrap(), 100);
        assert_eq!(vecref(&rt, v, 42).unwrap(), Value::Fixnum(42));
    }

    #[test]
    fn growth_is_at_least_a_quarter() {
        let mut rt = Runtime::new();
        let v = vector(&mut rt, 8, Value::Nil).unwrap();
        vec_set_length(&mut rt, v, 9).unwrap();
        assert_eq!(size_vec(&rt, v).unwrap(), 10);
        vec_set_length(&mut rt, v, 2).unwrap();
        assert_eq!(size_vec(&rt, v).unwrap(), 10);
        assert_eq!(length_vec(&rt, v).unwrap(), 2);
    }

    #[test]
    fn negative_index_counts_from_end() {
        let mut rt = Runtime::new();
        let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2), Value::Fixnum(3)]);
        assert_eq!(vecref(&rt, v, -1).unwrap(), Value::Fixnum(3));
        vec_set(&mut rt, v, -3, Value::T).unwrap();
        assert_eq!(vecref(&rt, v, 0).unwrap(), Value::T);
        assert_eq!(vecref(&rt, v, 3).unwrap_err().kind(), "range");
        assert_eq!(vecref(&rt, v, -4).unwrap_err().kind(), "range");
    }

    #[test]
    fn oversized_length_overflows() {
        let mut rt = Runtime::new();
        let v = vector(&mut rt, 0, Value::Nil).unwrap();
        let err = vec_set_length(&mut rt, v, usize::MAX).unwrap_err();
        assert_eq!(err.kind(), "overflow");
    }

    #[test]
    fn non_vectors_are_rejected() {
        let rt = Runtime::new();
        assert_eq!(
            length_vec(&rt, Value::Fixnum(3)).unwrap_err().to_string(),
            "length-vec: 3 is not a vector"
        );
    }
}

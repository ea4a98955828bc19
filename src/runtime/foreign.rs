use std::{
    any::Any,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    rc::Rc,
};

use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    gc::HeapObject,
    value::Value,
};

/// Behaviour of a family of foreign objects.
///
/// The class object is the foreign object's secondary tag. Sequence
/// classification only probes [`ForeignClass::has_length`] and
/// [`ForeignClass::has_head`]; the remaining hooks back the four sequence
/// primitives and equality.
pub trait ForeignClass {
    fn name(&self) -> &str;

    fn has_length(&self) -> bool {
        false
    }

    fn has_head(&self) -> bool {
        false
    }

    fn length(&self, _rt: &mut Runtime, _obj: Value) -> Result<usize> {
        Err(Error::type_mismatch("length", format!("{} has no length", self.name())))
    }

    fn index(&self, _rt: &mut Runtime, _obj: Value, _index: usize) -> Result<Value> {
        Err(Error::type_mismatch("ref", format!("{} is not indexable", self.name())))
    }

    fn set_index(&self, _rt: &mut Runtime, _obj: Value, _index: usize, _item: Value) -> Result<()> {
        Err(Error::type_mismatch("refset", format!("{} is not indexable", self.name())))
    }

    fn head(&self, _rt: &mut Runtime, _obj: Value) -> Result<Value> {
        Err(Error::type_mismatch("car", format!("{} has no head", self.name())))
    }

    fn rest(&self, _rt: &mut Runtime, _obj: Value) -> Result<Value> {
        Err(Error::type_mismatch("cdr", format!("{} has no rest", self.name())))
    }

    /// Equality between two objects of this class. Identity by default.
    fn equal(&self, _rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
        Ok(a == b)
    }

    /// An ordinary value this object is equivalent to, consulted before
    /// [`ForeignClass::equal`] and by the ordering.
    fn substitute(&self, _rt: &mut Runtime, _obj: Value) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Hash consistent with [`ForeignClass::equal`].
    fn hash(&self, _rt: &mut Runtime, obj: Value) -> Result<u64> {
        let mut hasher = DefaultHasher::new();
        obj.hash(&mut hasher);
        Ok(hasher.finish())
    }
}

pub struct Foreign {
    pub(crate) class: Rc<dyn ForeignClass>,
    /// Values the object holds; traced by the collector.
    pub(crate) slots: Vec<Value>,
    pub(crate) payload: Box<dyn Any>,
}

pub fn make_foreign(
    rt: &mut Runtime,
    class: Rc<dyn ForeignClass>,
    slots: Vec<Value>,
    payload: Box<dyn Any>,
) -> Value {
    rt.alloc(HeapObject::Foreign(Foreign {
        class,
        slots,
        payload,
    }))
}

pub fn foreign_class(rt: &Runtime, value: Value) -> Option<Rc<dyn ForeignClass>> {
    match rt.object(value) {
        Some(HeapObject::Foreign(obj)) => Some(Rc::clone(&obj.class)),
        _ => None,
    }
}

pub fn foreign_slot(rt: &Runtime, value: Value, index: usize) -> Result<Value> {
    match rt.object(value) {
        Some(HeapObject::Foreign(obj)) => obj.slots.get(index).copied().ok_or_else(|| {
            Error::range("foreign-slot", format!("no slot {} in {}", index, obj.class.name()))
        }),
        _ => Err(Error::type_mismatch("foreign-slot", "not a foreign object")),
    }
}

pub fn foreign_slot_count(rt: &Runtime, value: Value) -> Result<usize> {
    match rt.object(value) {
        Some(HeapObject::Foreign(obj)) => Ok(obj.slots.len()),
        _ => Err(Error::type_mismatch("foreign-slot", "not a foreign object")),
    }
}

/// Stores into a slot through the write barrier.
pub fn set_foreign_slot(rt: &mut Runtime, value: Value, index: usize, item: Value) -> Result<()> {
    let Some(handle) = value.as_handle() else {
        return Err(Error::type_mismatch("set-foreign-slot", "not a foreign object"));
    };
    match rt.heap.get_mut(handle) {
        HeapObject::Foreign(obj) => match obj.slots.get_mut(index) {
            Some(slot) => *slot = item,
            None => {
                return Err(Error::range(
                    "set-foreign-slot",
                    format!("no slot {} in {}", index, obj.class.name()),
                ));
            }
        },
        _ => return Err(Error::type_mismatch("set-foreign-slot", "not a foreign object")),
    }
    rt.heap.write_barrier(handle, item);
    Ok(())
}

pub fn foreign_payload<T: 'static>(rt: &Runtime, value: Value) -> Option<&T> {
    match rt.object(value) {
        Some(HeapObject::Foreign(obj)) => obj.payload.downcast_ref::<T>(),
        _ => None,
    }
}

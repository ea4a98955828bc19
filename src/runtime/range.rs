use crate::runtime::{
    compare::{less, lequal},
    context::Runtime,
    error::{Error, Result},
    gc::{HeapObject, Place},
    render::render,
    value::{TypeTag, Value},
};

/// A `(from, to)` pair of endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Range {
    pub from: Value,
    pub to: Value,
}

pub fn rcons(rt: &mut Runtime, from: Value, to: Value) -> Value {
    rt.alloc(HeapObject::Range(Range { from, to }))
}

pub fn rangep(rt: &Runtime, value: Value) -> bool {
    rt.classify(value) == TypeTag::Range
}

pub fn range_parts(rt: &Runtime, value: Value) -> Result<Range> {
    match rt.object(value) {
        Some(HeapObject::Range(range)) => Ok(*range),
        _ => Err(Error::type_mismatch(
            "range",
            format!("{} is not a range", render(rt, value)),
        )),
    }
}

pub fn range_from(rt: &Runtime, value: Value) -> Result<Value> {
    Ok(range_parts(rt, value)?.from)
}

pub fn range_to(rt: &Runtime, value: Value) -> Result<Value> {
    Ok(range_parts(rt, value)?.to)
}

pub fn set_from(rt: &mut Runtime, range: Value, from: Value) -> Result<Value> {
    range_parts(rt, range)?;
    if let Some(handle) = range.as_handle() {
        rt.heap.set(handle, Place::From, from)?;
    }
    Ok(range)
}

pub fn set_to(rt: &mut Runtime, range: Value, to: Value) -> Result<Value> {
    range_parts(rt, range)?;
    if let Some(handle) = range.as_handle() {
        rt.heap.set(handle, Place::To, to)?;
    }
    Ok(range)
}

/// `from <= x <= to`.
pub fn in_range(rt: &mut Runtime, range: Value, x: Value) -> Result<bool> {
    let Range { from, to } = range_parts(rt, range)?;
    Ok(lequal(rt, from, x)? && lequal(rt, x, to)?)
}

/// `from <= x < to`.
pub fn in_range_star(rt: &mut Runtime, range: Value, x: Value) -> Result<bool> {
    let Range { from, to } = range_parts(rt, range)?;
    Ok(lequal(rt, from, x)? && less(rt, x, to)?)
}

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    gc::{GcHeap, HeapObject},
    value::Value,
};

/// Numeric comparison interface consumed from the arithmetic library.
///
/// The value layer never does arithmetic itself; it only asks these two
/// questions, each total over fixnums, extended-precision integers, floats
/// and characters.
pub trait Arithmetic {
    fn less(&self, heap: &GcHeap, a: Value, b: Value) -> Result<bool>;
    fn num_eq(&self, heap: &GcHeap, a: Value, b: Value) -> Result<bool>;
}

/// Borrowed view of a numeric value.
#[derive(Debug, Clone, Copy)]
pub enum Num<'a> {
    Int(i64),
    Big(&'a BigInt),
    Float(f64),
}

impl<'a> Num<'a> {
    /// Views `value` as a number. Characters count as their code point.
    pub fn of(heap: &'a GcHeap, value: Value) -> Option<Num<'a>> {
        match value {
            Value::Fixnum(n) => Some(Num::Int(n)),
            Value::Char(c) => Some(Num::Int(c as i64)),
            Value::Obj(handle) => match heap.get(handle) {
                HeapObject::Float(f) => Some(Num::Float(*f)),
                HeapObject::BigNum(big) => Some(Num::Big(big)),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Big(big) => big.to_f64().unwrap_or(f64::NAN),
            Num::Float(f) => f,
        }
    }

    /// `None` when either side is NaN.
    pub fn compare(self, other: Num<'_>) -> Option<Ordering> {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
            (Num::Int(a), Num::Big(b)) => Some(BigInt::from(a).cmp(b)),
            (Num::Big(a), Num::Int(b)) => Some((*a).cmp(&BigInt::from(b))),
            (Num::Big(a), Num::Big(b)) => Some(a.cmp(b)),
            (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
        }
    }
}

/// Default [`Arithmetic`] over the built-in numeric representations.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardArithmetic;

impl StandardArithmetic {
    fn operands<'a>(
        heap: &'a GcHeap,
        op: &'static str,
        a: Value,
        b: Value,
    ) -> Result<(Num<'a>, Num<'a>)> {
        match (Num::of(heap, a), Num::of(heap, b)) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(Error::type_mismatch(op, "operands must be numbers")),
        }
    }
}

impl Arithmetic for StandardArithmetic {
    fn less(&self, heap: &GcHeap, a: Value, b: Value) -> Result<bool> {
        let (x, y) = Self::operands(heap, "<", a, b)?;
        Ok(x.compare(y) == Some(Ordering::Less))
    }

    fn num_eq(&self, heap: &GcHeap, a: Value, b: Value) -> Result<bool> {
        let (x, y) = Self::operands(heap, "=", a, b)?;
        Ok(x.compare(y) == Some(Ordering::Equal))
    }
}

/// Boxes a float.
pub fn float(rt: &mut Runtime, f: f64) -> Value {
    rt.alloc(HeapObject::Float(f))
}

/// Returns an integer value, as a fixnum whenever it fits.
pub fn integer(rt: &mut Runtime, n: BigInt) -> Value {
    match n.to_i64() {
        Some(small) => Value::Fixnum(small),
        None => rt.alloc(HeapObject::BigNum(n)),
    }
}

pub fn float_value(rt: &Runtime, value: Value) -> Option<f64> {
    match rt.object(value)? {
        HeapObject::Float(f) => Some(*f),
        _ => None,
    }
}

pub fn numberp(rt: &Runtime, value: Value) -> bool {
    rt.classify(value).is_number()
}

/// Extracts a non-negative machine index from a fixnum.
pub fn index_of(op: &'static str, value: Value) -> Result<i64> {
    match value {
        Value::Fixnum(n) => Ok(n),
        _ => Err(Error::type_mismatch(op, "index must be an integer")),
    }
}

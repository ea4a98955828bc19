use std::rc::Rc;

use crate::runtime::{context::Runtime, gc::HeapObject, value::Value};

/// Uninterned symbol carrying only its name. Interning belongs to the
/// package layer.
pub fn make_symbol(rt: &mut Runtime, name: &str) -> Value {
    rt.alloc(HeapObject::Symbol(Rc::from(name)))
}

/// Name of a symbol-like value: real symbols plus the immediates that print
/// as symbols.
pub fn symbol_name(rt: &Runtime, value: Value) -> Option<Rc<str>> {
    match value {
        Value::Nil => Some(Rc::from("nil")),
        Value::T => Some(Rc::from("t")),
        Value::Missing => Some(Rc::from(":")),
        Value::Obj(_) => match rt.object(value) {
            Some(HeapObject::Symbol(name)) => Some(Rc::clone(name)),
            _ => None,
        },
        _ => None,
    }
}

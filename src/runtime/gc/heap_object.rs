use std::rc::Rc;

use num_bigint::BigInt;

use crate::runtime::{
    foreign::Foreign,
    function::{Function, FunctionKind},
    map::Map,
    pair::{Cons, LazyCons, LazyState},
    range::Range,
    string::{LazyStr, MutStr},
    value::{TypeTag, Value},
    vector::Vector,
};

/// Heap-allocated object payload.
///
/// This is a closed set of variants; the only open extension point is
/// [`HeapObject::Foreign`], whose class object supplies a secondary tag and
/// capability hooks.
pub enum HeapObject {
    Symbol(Rc<str>),
    Cons(Cons),
    LazyCons(LazyCons),
    /// Immutable, externally owned text.
    Lit(Rc<str>),
    Str(MutStr),
    LazyStr(LazyStr),
    Vector(Vector),
    Function(Function),
    Map(Map),
    Range(Range),
    Float(f64),
    BigNum(BigInt),
    Foreign(Foreign),
}

impl HeapObject {
    pub fn tag(&self) -> TypeTag {
        match self {
            HeapObject::Symbol(_) => TypeTag::Symbol,
            HeapObject::Cons(_) => TypeTag::Cons,
            HeapObject::LazyCons(_) => TypeTag::LazyCons,
            HeapObject::Lit(_) => TypeTag::Lit,
            HeapObject::Str(_) => TypeTag::Str,
            HeapObject::LazyStr(_) => TypeTag::LazyStr,
            HeapObject::Vector(_) => TypeTag::Vector,
            HeapObject::Function(_) => TypeTag::Function,
            HeapObject::Map(_) => TypeTag::Map,
            HeapObject::Range(_) => TypeTag::Range,
            HeapObject::Float(_) => TypeTag::Float,
            HeapObject::BigNum(_) => TypeTag::BigNum,
            HeapObject::Foreign(_) => TypeTag::Foreign,
        }
    }

    /// Pushes every value this object references onto `out`.
    pub(crate) fn trace(&self, out: &mut Vec<Value>) {
        match self {
            HeapObject::Cons(cons) => {
                out.push(cons.head);
                out.push(cons.rest);
            }
            HeapObject::LazyCons(lcons) => {
                out.push(lcons.head);
                out.push(lcons.rest);
                if let LazyState::Pending(generator) = lcons.state {
                    out.push(generator);
                }
            }
            HeapObject::LazyStr(lstr) => out.push(lstr.list),
            HeapObject::Vector(vec) => out.extend_from_slice(&vec.items),
            HeapObject::Function(fun) => {
                out.push(fun.env);
                if let FunctionKind::Interpreted { form } = &fun.kind {
                    out.push(*form);
                }
            }
            HeapObject::Map(map) => map.trace(out),
            HeapObject::Range(range) => {
                out.push(range.from);
                out.push(range.to);
            }
            HeapObject::Foreign(foreign) => out.extend_from_slice(&foreign.slots),
            HeapObject::Symbol(_)
            | HeapObject::Lit(_)
            | HeapObject::Str(_)
            | HeapObject::Float(_)
            | HeapObject::BigNum(_) => {}
        }
    }
}

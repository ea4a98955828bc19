use std::fmt;

use crate::runtime::gc::GcHandle;

/// Runtime value passed through every generic operation.
///
/// ## Representation
///
/// A value is either an *immediate* encoded without allocation (`Nil`, `T`,
/// `Missing`, small integers and characters) or a reference into the
/// [`GcHeap`](crate::runtime::gc::GcHeap). References are generational
/// handles, so a handle to a reclaimed slot can never be confused with the
/// object that later reuses the slot.
///
/// `Value` is `Copy`; the derived equality is identity (`eq`): same immediate
/// bits or same heap handle. Value and structural equality live in
/// [`compare`](crate::runtime::compare).
///
/// ### The empty value
///
/// `Nil` is the single "nothing" value. It is the empty list, boolean false
/// and a valid zero-length instance of every sequence kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Value {
    /// Empty list, false, and the empty instance of every sequence kind.
    #[default]
    Nil,
    /// Canonical truth value.
    T,
    /// Placeholder for an optional argument the caller did not supply.
    Missing,
    /// Small integer.
    Fixnum(i64),
    /// Character.
    Char(char),
    /// Reference to a heap object.
    Obj(GcHandle),
}

/// Runtime-visible discriminant of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Nil,
    T,
    Missing,
    Fixnum,
    Char,
    Symbol,
    Cons,
    LazyCons,
    Lit,
    Str,
    LazyStr,
    Vector,
    Function,
    Map,
    Range,
    Float,
    BigNum,
    Foreign,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Nil => "null",
            TypeTag::T => "t",
            TypeTag::Missing => "missing",
            TypeTag::Fixnum => "fixnum",
            TypeTag::Char => "chr",
            TypeTag::Symbol => "sym",
            TypeTag::Cons => "cons",
            TypeTag::LazyCons => "lcons",
            TypeTag::Lit => "lit",
            TypeTag::Str => "str",
            TypeTag::LazyStr => "lstr",
            TypeTag::Vector => "vec",
            TypeTag::Function => "fun",
            TypeTag::Map => "hash",
            TypeTag::Range => "range",
            TypeTag::Float => "float",
            TypeTag::BigNum => "bignum",
            TypeTag::Foreign => "cobj",
        }
    }

    /// Pair-like tags: ordinary and lazy conses.
    pub fn is_cons(self) -> bool {
        matches!(self, TypeTag::Cons | TypeTag::LazyCons)
    }

    /// Character-sequence tags in any of the three representations.
    pub fn is_string(self) -> bool {
        matches!(self, TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr)
    }

    pub fn is_number(self) -> bool {
        matches!(self, TypeTag::Fixnum | TypeTag::Float | TypeTag::BigNum)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Truthiness: everything except `Nil` is true.
    pub fn is_truthy(self) -> bool {
        !matches!(self, Value::Nil)
    }

    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Converts a Rust boolean into `T` or `Nil`.
    pub fn from_bool(b: bool) -> Value {
        if b { Value::T } else { Value::Nil }
    }

    /// Treats `Missing` and `Nil` as "not supplied".
    pub fn supplied(self) -> Option<Value> {
        match self {
            Value::Nil | Value::Missing => None,
            other => Some(other),
        }
    }

    pub fn as_handle(self) -> Option<GcHandle> {
        match self {
            Value::Obj(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_fixnum(self) -> Option<i64> {
        match self {
            Value::Fixnum(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_heap(self) -> bool {
        matches!(self, Value::Obj(_))
    }

    /// Tag of an immediate. `None` for heap references, which need the heap.
    pub fn immediate_tag(self) -> Option<TypeTag> {
        match self {
            Value::Nil => Some(TypeTag::Nil),
            Value::T => Some(TypeTag::T),
            Value::Missing => Some(TypeTag::Missing),
            Value::Fixnum(_) => Some(TypeTag::Fixnum),
            Value::Char(_) => Some(TypeTag::Char),
            Value::Obj(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Fixnum(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Fixnum(n as i64)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

//! Identity, value and structural equality, plus the cross-type total order.
//!
//! Ordering ranks values by a fixed precedence before applying a per-kind
//! rule:
//!
//! | precedence | kinds |
//! |------------|-------|
//! | 1 | fixnum, character, float, bignum |
//! | 2 | range |
//! | 3 | literal, mutable and lazy strings |
//! | 4 | nil, t, symbols |
//! | 5 | ordinary and lazy pairs |
//! | 6 | vectors |
//! | 0 | everything else: comparing it raises `TypeMismatch` |
use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    foreign::foreign_class,
    function::function_of,
    gc::HeapObject,
    map::{MapKind, map_count, map_entry_from, map_get, map_kind},
    number::Num,
    range::range_parts,
    render::render,
    seq::{car, cdr},
    string::{str_content, str_lt},
    symbol::symbol_name,
    value::{TypeTag, Value},
    vector::vec_items,
};

const HASH_DEPTH_LIMIT: usize = 8;
const HASH_ELEMENT_LIMIT: usize = 32;

/// Identity: same immediate or same heap object.
pub fn eq(a: Value, b: Value) -> bool {
    a == b
}

/// Identity, plus numeric equality for floats and bignums, plus ranges whose
/// endpoints are `eql`.
pub fn eql(rt: &Runtime, a: Value, b: Value) -> bool {
    if a == b {
        return true;
    }
    match (rt.object(a), rt.object(b)) {
        // Floats must also agree in sign, so 0.0 and -0.0 stay distinct.
        (Some(HeapObject::Float(x)), Some(HeapObject::Float(y))) => {
            x.is_sign_negative() == y.is_sign_negative() && num_eq(rt, a, b)
        }
        (Some(HeapObject::BigNum(_)), Some(HeapObject::BigNum(_))) => num_eq(rt, a, b),
        (Some(HeapObject::Range(x)), Some(HeapObject::Range(y))) => {
            let (x, y) = (*x, *y);
            eql(rt, x.from, y.from) && eql(rt, x.to, y.to)
        }
        _ => false,
    }
}

fn num_eq(rt: &Runtime, a: Value, b: Value) -> bool {
    rt.arithmetic().num_eq(&rt.heap, a, b).unwrap_or(false)
}

/// Structural equality. May force lazy pairs and strings.
pub fn equal(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    let (mut a, mut b) = (a, b);
    loop {
        if a == b {
            return Ok(true);
        }
        let (ta, tb) = (rt.classify(a), rt.classify(b));
        match ta {
            TypeTag::Cons | TypeTag::LazyCons if tb.is_cons() => {
                let (ha, hb) = (car(rt, a)?, car(rt, b)?);
                if !equal(rt, ha, hb)? {
                    return Ok(false);
                }
                a = cdr(rt, a)?;
                b = cdr(rt, b)?;
                continue;
            }
            TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr if tb.is_string() => {
                let left = str_content(rt, a)?;
                let right = str_content(rt, b)?;
                return Ok(left == right);
            }
            TypeTag::Vector if tb == TypeTag::Vector => return vectors_equal(rt, a, b),
            TypeTag::Function if tb == TypeTag::Function => {
                let (Some(fa), Some(fb)) = (function_of(rt, a), function_of(rt, b)) else {
                    return Ok(false);
                };
                if fa.arity != fb.arity || !fa.same_code(&fb) {
                    return Ok(false);
                }
                a = fa.env;
                b = fb.env;
                continue;
            }
            TypeTag::Float | TypeTag::BigNum if tb == ta => return Ok(eql(rt, a, b)),
            TypeTag::Range if tb == TypeTag::Range => {
                let (x, y) = (range_parts(rt, a)?, range_parts(rt, b)?);
                return Ok(equal(rt, x.from, y.from)? && equal(rt, x.to, y.to)?);
            }
            TypeTag::Map if tb == TypeTag::Map => return maps_equal(rt, a, b),
            TypeTag::Foreign => {
                if let Some(class) = foreign_class(rt, a) {
                    if let Some(sub) = class.substitute(rt, a)? {
                        a = sub;
                        continue;
                    }
                    if let Some(other) = foreign_class(rt, b)
                        && std::rc::Rc::ptr_eq(&class, &other)
                    {
                        return class.equal(rt, a, b);
                    }
                }
            }
            _ => {}
        }
        if tb == TypeTag::Foreign
            && let Some(class) = foreign_class(rt, b)
            && let Some(sub) = class.substitute(rt, b)?
        {
            b = sub;
            continue;
        }
        return Ok(false);
    }
}

fn vectors_equal(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    let (xs, ys) = match (rt.object(a), rt.object(b)) {
        (Some(HeapObject::Vector(x)), Some(HeapObject::Vector(y))) => {
            if x.len() != y.len() {
                return Ok(false);
            }
            (x.items.clone(), y.items.clone())
        }
        _ => return Ok(false),
    };
    for (x, y) in xs.into_iter().zip(ys) {
        if !equal(rt, x, y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn maps_equal(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    use crate::runtime::map::map_count;
    if map_kind(rt, a)? != map_kind(rt, b)? || map_count(rt, a)? != map_count(rt, b)? {
        return Ok(false);
    }
    let mut pos = 0;
    while let Some((next, key, value)) = map_entry_from(rt, a, pos)? {
        match map_get(rt, b, key)? {
            Some(other) if equal(rt, value, other)? => pos = next,
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Ordering class of a tag; 0 means "not comparable".
pub fn precedence(tag: TypeTag) -> u8 {
    match tag {
        TypeTag::Fixnum | TypeTag::Char | TypeTag::Float | TypeTag::BigNum => 1,
        TypeTag::Range => 2,
        TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr => 3,
        TypeTag::Nil | TypeTag::T | TypeTag::Symbol => 4,
        TypeTag::Cons | TypeTag::LazyCons => 5,
        TypeTag::Vector => 6,
        TypeTag::Missing | TypeTag::Function | TypeTag::Map | TypeTag::Foreign => 0,
    }
}

fn substitute(rt: &mut Runtime, value: Value) -> Result<Option<Value>> {
    match foreign_class(rt, value) {
        Some(class) => class.substitute(rt, value),
        None => Ok(None),
    }
}

/// Total order across types.
///
/// Values of different precedence order by precedence. Pairs compare at their
/// first point of difference, vectors lexicographically then by length,
/// ranges by `from` then `to`.
pub fn less(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    let (mut a, mut b) = (a, b);
    loop {
        if let Some(sub) = substitute(rt, a)? {
            a = sub;
            continue;
        }
        if let Some(sub) = substitute(rt, b)? {
            b = sub;
            continue;
        }
        let (pa, pb) = (precedence(rt.classify(a)), precedence(rt.classify(b)));
        if pa == 0 || pb == 0 {
            return Err(Error::type_mismatch(
                "less",
                format!("cannot compare {} and {}", render(rt, a), render(rt, b)),
            ));
        }
        if pa != pb {
            return Ok(pa < pb);
        }
        return match pa {
            1 => {
                let arith = rt.arithmetic();
                arith.less(&rt.heap, a, b)
            }
            2 => {
                let (x, y) = (range_parts(rt, a)?, range_parts(rt, b)?);
                if less(rt, x.from, y.from)? {
                    Ok(true)
                } else if equal(rt, x.from, y.from)? {
                    less(rt, x.to, y.to)
                } else {
                    Ok(false)
                }
            }
            3 => str_lt(rt, a, b),
            4 => {
                let left = symbol_name(rt, a).map(|n| n.to_string()).unwrap_or_default();
                let right = symbol_name(rt, b).map(|n| n.to_string()).unwrap_or_default();
                Ok(left < right)
            }
            5 => {
                let (ha, hb) = (car(rt, a)?, car(rt, b)?);
                if less(rt, ha, hb)? {
                    return Ok(true);
                }
                if !equal(rt, ha, hb)? {
                    return Ok(false);
                }
                a = cdr(rt, a)?;
                b = cdr(rt, b)?;
                continue;
            }
            _ => vector_less(rt, a, b),
        };
    }
}

fn vector_less(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    let (xs, ys) = match (rt.object(a), rt.object(b)) {
        (Some(HeapObject::Vector(x)), Some(HeapObject::Vector(y))) => {
            (x.items.clone(), y.items.clone())
        }
        _ => return Err(Error::type_mismatch("less", "expected vectors")),
    };
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        if less(rt, x, y)? {
            return Ok(true);
        }
        if less(rt, y, x)? {
            return Ok(false);
        }
    }
    Ok(xs.len() < ys.len())
}

pub fn greater(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    less(rt, b, a)
}

pub fn lequal(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    Ok(less(rt, a, b)? || equal(rt, a, b)?)
}

pub fn gequal(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    Ok(less(rt, b, a)? || equal(rt, a, b)?)
}

/// Hash consistent with `eql` (`MapKind::Eql`) or `equal` (`MapKind::Equal`).
pub fn hash_value(rt: &mut Runtime, value: Value, kind: MapKind) -> Result<u64> {
    let mut hasher = DefaultHasher::new();
    hash_into(rt, value, kind, HASH_DEPTH_LIMIT, &mut hasher)?;
    Ok(hasher.finish())
}

/// Kind mixed into a hash. Representations that `equal` treats as one kind
/// share a class under `MapKind::Equal`.
fn hash_class(tag: TypeTag, kind: MapKind) -> TypeTag {
    match (tag, kind) {
        (TypeTag::Lit | TypeTag::LazyStr, MapKind::Equal) => TypeTag::Str,
        (TypeTag::LazyCons, MapKind::Equal) => TypeTag::Cons,
        _ => tag,
    }
}

fn hash_into(
    rt: &mut Runtime,
    value: Value,
    kind: MapKind,
    depth: usize,
    hasher: &mut DefaultHasher,
) -> Result<()> {
    let tag = rt.classify(value);
    if kind == MapKind::Equal
        && tag == TypeTag::Foreign
        && let Some(class) = foreign_class(rt, value)
        && let Some(sub) = class.substitute(rt, value)?
    {
        return hash_into(rt, sub, kind, depth, hasher);
    }
    hash_class(tag, kind).hash(hasher);
    if depth == 0 {
        return Ok(());
    }
    match tag {
        TypeTag::Float | TypeTag::BigNum => match Num::of(&rt.heap, value) {
            Some(Num::Float(f)) => f.to_bits().hash(hasher),
            Some(Num::Big(big)) => big.hash(hasher),
            _ => value.hash(hasher),
        },
        TypeTag::Range => {
            let range = range_parts(rt, value)?;
            hash_into(rt, range.from, kind, depth - 1, hasher)?;
            hash_into(rt, range.to, kind, depth - 1, hasher)?;
        }
        TypeTag::Lit | TypeTag::Str | TypeTag::LazyStr if kind == MapKind::Equal => {
            str_content(rt, value)?.hash(hasher);
        }
        TypeTag::Cons | TypeTag::LazyCons if kind == MapKind::Equal => {
            let mut cursor = value;
            let mut count = 0;
            while rt.classify(cursor).is_cons() && count < HASH_ELEMENT_LIMIT {
                let head = car(rt, cursor)?;
                hash_into(rt, head, kind, depth - 1, hasher)?;
                cursor = cdr(rt, cursor)?;
                count += 1;
            }
            if count < HASH_ELEMENT_LIMIT {
                hash_into(rt, cursor, kind, depth - 1, hasher)?;
            }
        }
        TypeTag::Vector if kind == MapKind::Equal => {
            let items = vec_items(rt, value)?;
            items.len().hash(hasher);
            for item in items.into_iter().take(HASH_ELEMENT_LIMIT) {
                hash_into(rt, item, kind, depth - 1, hasher)?;
            }
        }
        TypeTag::Function if kind == MapKind::Equal => {
            if let Some(fun) = function_of(rt, value) {
                fun.arity.fixed.hash(hasher);
                hash_into(rt, fun.env, kind, depth - 1, hasher)?;
            }
        }
        TypeTag::Map if kind == MapKind::Equal => {
            map_count(rt, value)?.hash(hasher);
        }
        TypeTag::Foreign if kind == MapKind::Equal => {
            if let Some(class) = foreign_class(rt, value) {
                class.hash(rt, value)?.hash(hasher);
            }
        }
        _ => value.hash(hasher),
    }
    Ok(())
}

//! Generic invocation.
//!
//! [`call0`]..[`call4`] are the fast paths: they hand the arguments straight
//! to a native body wired for exactly that many parameters, with no optional
//! slots and no rest list. Every other shape goes through [`invoke`], which
//! checks arity, fills omitted optionals with [`Value::Missing`], gathers
//! excess arguments of a variadic callable into a rest list, and gives
//! sequences, maps and ranges their call semantics.
use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    function::{Function, FunctionKind, Native},
    gc::HeapObject,
    map::map_get,
    pair::{consp, list},
    range::{in_range_star, range_parts},
    render::render,
    seq::{SeqKind, sel, seq_info, seq_ref, sub},
    value::{TypeTag, Value},
};

/// Applies `callee` to `args`.
pub fn invoke(rt: &mut Runtime, callee: Value, args: &[Value]) -> Result<Value> {
    match rt.object(callee) {
        Some(HeapObject::Function(fun)) => {
            let fun = fun.clone();
            apply(rt, &fun, args)
        }
        _ => call_object(rt, callee, args),
    }
}

fn apply(rt: &mut Runtime, fun: &Function, args: &[Value]) -> Result<Value> {
    let arity = fun.arity;
    if args.len() < arity.required() {
        return Err(Error::missing_arguments(fun.display_name()));
    }
    if !arity.variadic && args.len() > arity.fixed {
        return Err(Error::too_many_arguments(fun.display_name()));
    }
    let supplied = args.len().min(arity.fixed);
    let mut fixed = Vec::with_capacity(arity.fixed + 1);
    fixed.extend_from_slice(&args[..supplied]);
    fixed.resize(arity.fixed, Value::Missing);

    rt.anchored(|rt| {
        let rest = if arity.variadic && args.len() > arity.fixed {
            let rest = list(rt, &args[arity.fixed..]);
            rt.anchor(rest);
            rest
        } else {
            Value::Nil
        };
        let env = fun.env;
        match &fun.kind {
            FunctionKind::Native(native) => match native {
                Native::F0(body) => body(rt, env),
                Native::F1(body) => body(rt, env, fixed[0]),
                Native::F2(body) => body(rt, env, fixed[0], fixed[1]),
                Native::F3(body) => body(rt, env, fixed[0], fixed[1], fixed[2]),
                Native::F4(body) => body(rt, env, fixed[0], fixed[1], fixed[2], fixed[3]),
                Native::N(body) => body(rt, env, &fixed),
                Native::Variadic(body) => body(rt, env, &fixed, rest),
                Native::Host(body) => {
                    if arity.variadic {
                        fixed.push(rest);
                    }
                    body(rt, &fixed)
                }
            },
            FunctionKind::Interpreted { form } => match rt.interpreter() {
                Some(interpreter) => interpreter.apply(rt, *form, env, &fixed, rest),
                None => Err(Error::type_mismatch(
                    "call",
                    format!("no interpreter installed to run {}", fun.display_name()),
                )),
            },
            FunctionKind::Compiled(code) => code.execute(rt, env, args),
        }
    })
}

/// Call semantics of non-function values.
fn call_object(rt: &mut Runtime, callee: Value, args: &[Value]) -> Result<Value> {
    let shown = |rt: &Runtime| render(rt, callee);
    match rt.classify(callee) {
        TypeTag::Map => match *args {
            [] => Err(Error::missing_arguments(shown(rt))),
            [key] => Ok(map_get(rt, callee, key)?.unwrap_or(Value::Nil)),
            [key, default] => Ok(map_get(rt, callee, key)?.unwrap_or(default)),
            _ => Err(Error::too_many_arguments(shown(rt))),
        },
        TypeTag::Range => match *args {
            [] => Err(Error::missing_arguments(shown(rt))),
            [x] => Ok(Value::from_bool(in_range_star(rt, callee, x)?)),
            _ => Err(Error::too_many_arguments(shown(rt))),
        },
        _ => {
            let kind = seq_info(rt, callee).kind;
            if !matches!(kind, SeqKind::Empty | SeqKind::ListLike | SeqKind::VectorLike) {
                return Err(Error::type_mismatch(
                    "call",
                    format!("{} is not callable", shown(rt)),
                ));
            }
            match *args {
                [] => Err(Error::missing_arguments(shown(rt))),
                [index] if consp(rt, index) || rt.classify(index) == TypeTag::Vector => {
                    sel(rt, callee, index)
                }
                [index] if rt.classify(index) == TypeTag::Range => {
                    let range = range_parts(rt, index)?;
                    sub(rt, callee, range.from, range.to)
                }
                [index] => seq_ref(rt, callee, index),
                [from, to] => sub(rt, callee, from, to),
                _ => Err(Error::too_many_arguments(shown(rt))),
            }
        }
    }
}

/// Native body of `callee` when it is wired for exactly the given shape.
fn exact_native(rt: &Runtime, callee: Value) -> Option<(Native, Value)> {
    match rt.object(callee) {
        Some(HeapObject::Function(Function {
            kind: FunctionKind::Native(native),
            env,
            arity,
            ..
        })) if arity.optional == 0 && !arity.variadic => Some((native.clone(), *env)),
        _ => None,
    }
}

pub fn call0(rt: &mut Runtime, callee: Value) -> Result<Value> {
    match exact_native(rt, callee) {
        Some((Native::F0(body), env)) => body(rt, env),
        _ => invoke(rt, callee, &[]),
    }
}

pub fn call1(rt: &mut Runtime, callee: Value, a: Value) -> Result<Value> {
    match exact_native(rt, callee) {
        Some((Native::F1(body), env)) => body(rt, env, a),
        _ => invoke(rt, callee, &[a]),
    }
}

pub fn call2(rt: &mut Runtime, callee: Value, a: Value, b: Value) -> Result<Value> {
    match exact_native(rt, callee) {
        Some((Native::F2(body), env)) => body(rt, env, a, b),
        _ => invoke(rt, callee, &[a, b]),
    }
}

pub fn call3(rt: &mut Runtime, callee: Value, a: Value, b: Value, c: Value) -> Result<Value> {
    match exact_native(rt, callee) {
        Some((Native::F3(body), env)) => body(rt, env, a, b, c),
        _ => invoke(rt, callee, &[a, b, c]),
    }
}

pub fn call4(
    rt: &mut Runtime,
    callee: Value,
    a: Value,
    b: Value,
    c: Value,
    d: Value,
) -> Result<Value> {
    match exact_native(rt, callee) {
        Some((Native::F4(body), env)) => body(rt, env, a, b, c, d),
        _ => invoke(rt, callee, &[a, b, c, d]),
    }
}

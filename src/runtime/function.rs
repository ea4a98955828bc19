use std::{fmt, rc::Rc};

use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    gc::HeapObject,
    value::Value,
};

/// Largest fixed parameter count a native function can be bound to.
pub const MAX_NATIVE_FIXED: usize = 8;

/// Every native receives the runtime and its captured environment first.
pub type Fn0 = fn(&mut Runtime, Value) -> Result<Value>;
pub type Fn1 = fn(&mut Runtime, Value, Value) -> Result<Value>;
pub type Fn2 = fn(&mut Runtime, Value, Value, Value) -> Result<Value>;
pub type Fn3 = fn(&mut Runtime, Value, Value, Value, Value) -> Result<Value>;
pub type Fn4 = fn(&mut Runtime, Value, Value, Value, Value, Value) -> Result<Value>;
/// Fixed parameters passed as a slice of exactly `fixed` values.
pub type FnN = fn(&mut Runtime, Value, &[Value]) -> Result<Value>;
/// Fixed parameters plus the excess arguments as a rest list.
pub type FnVariadic = fn(&mut Runtime, Value, &[Value], Value) -> Result<Value>;
/// Host closure; receives the fixed parameters, then the rest list when
/// variadic.
pub type HostFn = Rc<dyn Fn(&mut Runtime, &[Value]) -> Result<Value>>;

/// A callable's declared shape.
///
/// `optional` counts how many of the `fixed` parameters may be omitted, so
/// `optional <= fixed` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub fixed: usize,
    pub optional: usize,
    pub variadic: bool,
}

impl Arity {
    pub fn new(fixed: usize, optional: usize, variadic: bool) -> Result<Self> {
        if optional > fixed {
            return Err(Error::type_mismatch(
                "func",
                format!("{} optional parameters exceed {} fixed", optional, fixed),
            ));
        }
        Ok(Self {
            fixed,
            optional,
            variadic,
        })
    }

    pub const fn exact(fixed: usize) -> Self {
        Self {
            fixed,
            optional: 0,
            variadic: false,
        }
    }

    pub const fn variadic(fixed: usize) -> Self {
        Self {
            fixed,
            optional: 0,
            variadic: true,
        }
    }

    /// Parameters the caller must supply.
    pub fn required(&self) -> usize {
        self.fixed - self.optional
    }
}

/// Native body, discriminated by how it receives its arguments.
#[derive(Clone)]
pub enum Native {
    F0(Fn0),
    F1(Fn1),
    F2(Fn2),
    F3(Fn3),
    F4(Fn4),
    N(FnN),
    Variadic(FnVariadic),
    Host(HostFn),
}

impl Native {
    /// Fixed count this body is hard-wired for, if any.
    fn wired_fixed(&self) -> Option<usize> {
        match self {
            Native::F0(_) => Some(0),
            Native::F1(_) => Some(1),
            Native::F2(_) => Some(2),
            Native::F3(_) => Some(3),
            Native::F4(_) => Some(4),
            Native::N(_) | Native::Variadic(_) | Native::Host(_) => None,
        }
    }

    fn same_code(&self, other: &Native) -> bool {
        match (self, other) {
            (Native::F0(a), Native::F0(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Native::F1(a), Native::F1(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Native::F2(a), Native::F2(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Native::F3(a), Native::F3(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Native::F4(a), Native::F4(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Native::N(a), Native::N(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Native::Variadic(a), Native::Variadic(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Native::Host(a), Native::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Interpreted-closure evaluator, supplied by the interpreter layer.
pub trait Interpreter {
    /// Applies the closure body `form` in `env` to the fixed arguments
    /// (missing optionals already filled) and the rest list.
    fn apply(
        &self,
        rt: &mut Runtime,
        form: Value,
        env: Value,
        args: &[Value],
        rest: Value,
    ) -> Result<Value>;
}

/// Compiled-closure code, supplied by the bytecode engine.
pub trait CompiledCode {
    fn arity(&self) -> Arity;
    /// Bulk entry point: receives the arguments exactly as supplied.
    fn execute(&self, rt: &mut Runtime, env: Value, args: &[Value]) -> Result<Value>;
}

#[derive(Clone)]
pub enum FunctionKind {
    Native(Native),
    Interpreted { form: Value },
    Compiled(Rc<dyn CompiledCode>),
}

/// Callable object.
///
/// The environment is shared, not owned: several callables may capture the
/// same environment value.
#[derive(Clone)]
pub struct Function {
    pub kind: FunctionKind,
    pub env: Value,
    pub arity: Arity,
    pub name: Option<Rc<str>>,
}

impl Function {
    /// Same representation kind and same code. Environments are compared by
    /// the caller.
    pub fn same_code(&self, other: &Function) -> bool {
        match (&self.kind, &other.kind) {
            (FunctionKind::Native(a), FunctionKind::Native(b)) => a.same_code(b),
            (FunctionKind::Interpreted { .. }, FunctionKind::Interpreted { .. }) => true,
            (FunctionKind::Compiled(a), FunctionKind::Compiled(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("#<function {}>", name),
            None => "#<function>".to_string(),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Builds a native callable after checking that `body` can honor `arity`.
pub fn native(rt: &mut Runtime, env: Value, body: Native, arity: Arity) -> Result<Value> {
    let fits = match (&body, body.wired_fixed()) {
        (_, Some(k)) => !arity.variadic && arity.fixed == k,
        (Native::N(_), None) => !arity.variadic && arity.fixed <= MAX_NATIVE_FIXED,
        (Native::Variadic(_), None) => arity.variadic,
        (_, None) => true,
    };
    if !fits || arity.optional > arity.fixed {
        return Err(Error::type_mismatch(
            "func",
            format!(
                "native body cannot take {} fixed / {} optional{}",
                arity.fixed,
                arity.optional,
                if arity.variadic { " / variadic" } else { "" }
            ),
        ));
    }
    Ok(alloc_function(rt, FunctionKind::Native(body), env, arity))
}

fn alloc_function(rt: &mut Runtime, kind: FunctionKind, env: Value, arity: Arity) -> Value {
    rt.alloc(HeapObject::Function(Function {
        kind,
        env,
        arity,
        name: None,
    }))
}

pub fn func_n0(rt: &mut Runtime, f: Fn0) -> Value {
    func_f0(rt, Value::Nil, f)
}

pub fn func_n1(rt: &mut Runtime, f: Fn1) -> Value {
    func_f1(rt, Value::Nil, f)
}

pub fn func_n2(rt: &mut Runtime, f: Fn2) -> Value {
    func_f2(rt, Value::Nil, f)
}

pub fn func_n3(rt: &mut Runtime, f: Fn3) -> Value {
    func_f3(rt, Value::Nil, f)
}

pub fn func_n4(rt: &mut Runtime, f: Fn4) -> Value {
    func_f4(rt, Value::Nil, f)
}

pub fn func_f0(rt: &mut Runtime, env: Value, f: Fn0) -> Value {
    alloc_function(rt, FunctionKind::Native(Native::F0(f)), env, Arity::exact(0))
}

pub fn func_f1(rt: &mut Runtime, env: Value, f: Fn1) -> Value {
    alloc_function(rt, FunctionKind::Native(Native::F1(f)), env, Arity::exact(1))
}

pub fn func_f2(rt: &mut Runtime, env: Value, f: Fn2) -> Value {
    alloc_function(rt, FunctionKind::Native(Native::F2(f)), env, Arity::exact(2))
}

pub fn func_f3(rt: &mut Runtime, env: Value, f: Fn3) -> Value {
    alloc_function(rt, FunctionKind::Native(Native::F3(f)), env, Arity::exact(3))
}

pub fn func_f4(rt: &mut Runtime, env: Value, f: Fn4) -> Value {
    alloc_function(rt, FunctionKind::Native(Native::F4(f)), env, Arity::exact(4))
}

/// Host closure with an arbitrary shape.
pub fn func_host(
    rt: &mut Runtime,
    arity: Arity,
    f: impl Fn(&mut Runtime, &[Value]) -> Result<Value> + 'static,
) -> Value {
    alloc_function(rt, FunctionKind::Native(Native::Host(Rc::new(f))), Value::Nil, arity)
}

/// Interpreted closure over `form`, applied by the installed [`Interpreter`].
pub fn func_interp(rt: &mut Runtime, env: Value, form: Value, arity: Arity) -> Value {
    alloc_function(rt, FunctionKind::Interpreted { form }, env, arity)
}

/// Compiled closure; the shape comes from the code object.
pub fn func_compiled(rt: &mut Runtime, env: Value, code: Rc<dyn CompiledCode>) -> Value {
    let arity = code.arity();
    alloc_function(rt, FunctionKind::Compiled(code), env, arity)
}

/// Attaches a display name used in error messages.
pub fn set_function_name(rt: &mut Runtime, fun: Value, name: &str) -> Result<Value> {
    if let Some(handle) = fun.as_handle()
        && let HeapObject::Function(f) = rt.heap.get_mut(handle)
    {
        f.name = Some(Rc::from(name));
        return Ok(fun);
    }
    Err(Error::type_mismatch("func-set-name", "not a function"))
}

pub fn functionp(rt: &Runtime, value: Value) -> bool {
    matches!(rt.object(value), Some(HeapObject::Function(_)))
}

/// Snapshot of a callable's record.
pub fn function_of(rt: &Runtime, value: Value) -> Option<Function> {
    match rt.object(value) {
        Some(HeapObject::Function(f)) => Some(f.clone()),
        _ => None,
    }
}

pub fn func_get_env(rt: &Runtime, fun: Value) -> Result<Value> {
    function_of(rt, fun)
        .map(|f| f.env)
        .ok_or_else(|| Error::type_mismatch("func-get-env", "not a function"))
}

pub fn func_set_env(rt: &mut Runtime, fun: Value, env: Value) -> Result<Value> {
    match fun.as_handle() {
        Some(handle) if functionp(rt, fun) => {
            rt.heap.set(handle, crate::runtime::gc::Place::Env, env)?;
            Ok(fun)
        }
        _ => Err(Error::type_mismatch("func-set-env", "not a function")),
    }
}

use std::fmt::{self, Write};

use crate::runtime::{
    context::Runtime,
    gc::HeapObject,
    pair::LazyState,
    value::Value,
};

const MAX_DEPTH: usize = 16;
const MAX_ITEMS: usize = 256;

/// Printed form of a value for diagnostics and tests.
///
/// Rendering never forces anything: a pending lazy pair prints as `...` and
/// an unrealized lazy-string tail as `...` inside the quotes. Deep or long
/// structures are cut off with `...`.
pub fn render(rt: &Runtime, value: Value) -> String {
    Rendered { rt, value }.to_string()
}

/// [`fmt::Display`] adapter over a value and the runtime that owns it.
pub struct Rendered<'a> {
    pub rt: &'a Runtime,
    pub value: Value,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(self.rt, self.value, MAX_DEPTH, f)
    }
}

fn write_value(rt: &Runtime, value: Value, depth: usize, f: &mut impl Write) -> fmt::Result {
    match value {
        Value::Nil => f.write_str("nil"),
        Value::T => f.write_str("t"),
        Value::Missing => f.write_str(":"),
        Value::Fixnum(n) => write!(f, "{}", n),
        Value::Char(c) => write!(f, "#\\{}", char_name(c)),
        Value::Obj(handle) => {
            if !rt.heap.is_live(handle) {
                return f.write_str("#<freed>");
            }
            if depth == 0 {
                return f.write_str("...");
            }
            match rt.heap.get(handle) {
                HeapObject::Symbol(name) => f.write_str(name),
                HeapObject::Cons(_) | HeapObject::LazyCons(_) => write_list(rt, value, depth, f),
                HeapObject::Lit(text) => write_quoted(text.chars(), false, f),
                HeapObject::Str(s) => write_quoted(s.as_chars().iter().copied(), false, f),
                HeapObject::LazyStr(lstr) => {
                    write_quoted(lstr.prefix.iter().copied(), !lstr.list.is_nil(), f)
                }
                HeapObject::Vector(vec) => {
                    f.write_str("#(")?;
                    write_items(rt, vec.as_slice(), depth, f)?;
                    f.write_char(')')
                }
                HeapObject::Function(fun) => f.write_str(&fun.display_name()),
                HeapObject::Map(map) => {
                    f.write_str("#H(")?;
                    let mut first = true;
                    for (i, (key, val)) in map.live().enumerate() {
                        if i == MAX_ITEMS {
                            f.write_str(" ...")?;
                            break;
                        }
                        if !first {
                            f.write_char(' ')?;
                        }
                        first = false;
                        f.write_char('(')?;
                        write_value(rt, key, depth - 1, f)?;
                        f.write_char(' ')?;
                        write_value(rt, val, depth - 1, f)?;
                        f.write_char(')')?;
                    }
                    f.write_char(')')
                }
                HeapObject::Range(range) => {
                    f.write_str("#R(")?;
                    write_value(rt, range.from, depth - 1, f)?;
                    f.write_char(' ')?;
                    write_value(rt, range.to, depth - 1, f)?;
                    f.write_char(')')
                }
                HeapObject::Float(x) => write!(f, "{:?}", x),
                HeapObject::BigNum(big) => write!(f, "{}", big),
                HeapObject::Foreign(obj) => write!(f, "#<{}>", obj.class.name()),
            }
        }
    }
}

fn write_items(rt: &Runtime, items: &[Value], depth: usize, f: &mut impl Write) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i == MAX_ITEMS {
            return f.write_str(" ...");
        }
        if i > 0 {
            f.write_char(' ')?;
        }
        write_value(rt, *item, depth - 1, f)?;
    }
    Ok(())
}

fn write_list(rt: &Runtime, list: Value, depth: usize, f: &mut impl Write) -> fmt::Result {
    f.write_char('(')?;
    let mut cursor = list;
    let mut count = 0;
    loop {
        let (head, rest) = match rt.object(cursor) {
            Some(HeapObject::Cons(cell)) => (cell.head, cell.rest),
            Some(HeapObject::LazyCons(cell)) => match cell.state {
                LazyState::Forced => (cell.head, cell.rest),
                LazyState::Pending(_) => {
                    if count > 0 {
                        f.write_char(' ')?;
                    }
                    f.write_str("...")?;
                    break;
                }
            },
            _ => {
                if !cursor.is_nil() {
                    f.write_str(" . ")?;
                    write_value(rt, cursor, depth - 1, f)?;
                }
                break;
            }
        };
        if count == MAX_ITEMS {
            f.write_str(" ...")?;
            break;
        }
        if count > 0 {
            f.write_char(' ')?;
        }
        write_value(rt, head, depth - 1, f)?;
        count += 1;
        cursor = rest;
    }
    f.write_char(')')
}

fn write_quoted(chars: impl Iterator<Item = char>, pending: bool, f: &mut impl Write) -> fmt::Result {
    f.write_char('"')?;
    for c in chars {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    if pending {
        f.write_str("...")?;
    }
    f.write_char('"')
}

fn char_name(c: char) -> String {
    match c {
        ' ' => "space".to_string(),
        '\n' => "newline".to_string(),
        '\t' => "tab".to_string(),
        '\0' => "nul".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{
        function::func_n0,
        number::float,
        pair::{cons, list, make_lazy_cons},
        range::rcons,
        string::string_own,
        symbol::make_symbol,
        vector::vector_from_slice,
    };

    fn zero(_: &mut Runtime, _: Value) -> crate::runtime::error::Result<Value> {
        Ok(Value::Nil)
    }

    #[test]
    fn renders_atoms() {
        let mut rt = Runtime::new();
        let sym = make_symbol(&mut rt, "foo");
        let f = float(&mut rt, 2.0);
        assert_eq!(render(&rt, Value::Nil), "nil");
        assert_eq!(render(&rt, Value::Missing), ":");
        assert_eq!(render(&rt, Value::Char('a')), "#\\a");
        assert_eq!(render(&rt, Value::Char(' ')), "#\\space");
        assert_eq!(render(&rt, sym), "foo");
        assert_eq!(render(&rt, f), "2.0");
    }

    #[test]
    fn renders_compound_values() {
        let mut rt = Runtime::new();
        let dotted = cons(&mut rt, Value::Fixnum(1), Value::Fixnum(2));
        let s = string_own(&mut rt, "a\"b");
        let items = list(&mut rt, &[dotted, s]);
        let vec = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::T]);
        let range = rcons(&mut rt, Value::Fixnum(1), Value::Fixnum(3));
        assert_eq!(render(&rt, items), "((1 . 2) \"a\\\"b\")");
        assert_eq!(render(&rt, vec), "#(1 t)");
        assert_eq!(render(&rt, range), "#R(1 3)");
    }

    #[test]
    fn pending_lazy_cell_is_not_forced() {
        let mut rt = Runtime::new();
        let generator = func_n0(&mut rt, zero);
        let lazy = make_lazy_cons(&mut rt, generator);
        let items = cons(&mut rt, Value::Fixnum(0), lazy);
        assert_eq!(render(&rt, items), "(0 ...)");
    }
}

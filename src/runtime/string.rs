use std::rc::Rc;

use tracing::trace;

use crate::runtime::{
    context::Runtime,
    error::{Error, Result},
    gc::HeapObject,
    pair::cons,
    render::render,
    seq::{car, cdr},
    value::{TypeTag, Value},
};

const DEFAULT_TERMINATOR: &str = "\n";

/// Owned, growable character sequence.
///
/// `alloc` is the logical capacity and always leaves room for a terminator:
/// `alloc >= chars.len() + 1`.
#[derive(Debug, Clone)]
pub struct MutStr {
    pub(crate) chars: Vec<char>,
    pub(crate) alloc: usize,
}

impl MutStr {
    pub fn new(chars: Vec<char>) -> Self {
        let alloc = chars.len() + 1;
        Self { chars, alloc }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.alloc
    }

    pub fn as_chars(&self) -> &[char] {
        &self.chars
    }
}

/// Character sequence realized on demand from a list of chunks.
///
/// `prefix` is what has been realized so far. Each chunk popped from `list`
/// is appended followed by `term`. `limit`, when present, counts how many
/// more chunks may be realized; at zero, realization stops for good.
#[derive(Debug, Clone)]
pub struct LazyStr {
    pub(crate) prefix: Vec<char>,
    pub(crate) list: Value,
    pub(crate) term: Rc<str>,
    pub(crate) limit: Option<usize>,
}

/// Immutable literal text.
pub fn string_lit(rt: &mut Runtime, text: impl Into<Rc<str>>) -> Value {
    rt.alloc(HeapObject::Lit(text.into()))
}

/// Mutable string holding a copy of `text`.
pub fn string_own(rt: &mut Runtime, text: &str) -> Value {
    string_from_chars(rt, text.chars().collect())
}

pub fn string_from_chars(rt: &mut Runtime, chars: Vec<char>) -> Value {
    rt.alloc(HeapObject::Str(MutStr::new(chars)))
}

/// Mutable string of `len` copies of `ch`.
pub fn mkstring(rt: &mut Runtime, len: usize, ch: char) -> Result<Value> {
    let mut chars = Vec::new();
    chars
        .try_reserve_exact(len)
        .map_err(|err| Error::allocation("mkstring", err.to_string()))?;
    chars.resize(len, ch);
    Ok(string_from_chars(rt, chars))
}

pub fn stringp(rt: &Runtime, value: Value) -> bool {
    rt.classify(value).is_string()
}

fn not_a_string(rt: &Runtime, op: &'static str, value: Value) -> Error {
    Error::type_mismatch(op, format!("{} is not a string", render(rt, value)))
}

/// Character content of any string representation. Lazy strings are forced
/// completely.
pub fn str_content(rt: &mut Runtime, value: Value) -> Result<Vec<char>> {
    if rt.classify(value) == TypeTag::LazyStr {
        lazy_str_force(rt, value)?;
    }
    match rt.object(value) {
        Some(HeapObject::Lit(text)) => Ok(text.chars().collect()),
        Some(HeapObject::Str(s)) => Ok(s.chars.clone()),
        Some(HeapObject::LazyStr(lstr)) => Ok(lstr.prefix.clone()),
        Some(HeapObject::Symbol(name)) => Ok(name.chars().collect()),
        _ => Err(not_a_string(rt, "string", value)),
    }
}

/// Rust `String` view of a string value.
pub fn string_value(rt: &mut Runtime, value: Value) -> Result<String> {
    Ok(str_content(rt, value)?.into_iter().collect())
}

/// Number of characters; forces lazy strings.
pub fn length_str(rt: &mut Runtime, value: Value) -> Result<usize> {
    if rt.classify(value) == TypeTag::LazyStr {
        lazy_str_force(rt, value)?;
    }
    match rt.object(value) {
        Some(HeapObject::Lit(text)) => Ok(text.chars().count()),
        Some(HeapObject::Str(s)) => Ok(s.len()),
        Some(HeapObject::LazyStr(lstr)) => Ok(lstr.prefix.len()),
        _ => Err(not_a_string(rt, "length-str", value)),
    }
}

/// Character at `index`, realizing a lazy string only as far as needed.
pub fn chr_str(rt: &mut Runtime, value: Value, index: usize) -> Result<char> {
    if rt.classify(value) == TypeTag::LazyStr {
        lazy_str_force_upto(rt, value, index)?;
    }
    let ch = match rt.object(value) {
        Some(HeapObject::Lit(text)) => text.chars().nth(index),
        Some(HeapObject::Str(s)) => s.chars.get(index).copied(),
        Some(HeapObject::LazyStr(lstr)) => lstr.prefix.get(index).copied(),
        _ => return Err(not_a_string(rt, "chr-str", value)),
    };
    ch.ok_or_else(|| {
        Error::range(
            "chr-str",
            format!("index {} is out of range for {}", index, render(rt, value)),
        )
    })
}

/// Stores `ch` at `index` of a mutable (or realized lazy) string.
pub fn chr_str_set(rt: &mut Runtime, value: Value, index: usize, ch: char) -> Result<()> {
    if rt.classify(value) == TypeTag::LazyStr {
        lazy_str_force_upto(rt, value, index)?;
    }
    let shown = render(rt, value);
    let Some(handle) = value.as_handle() else {
        return Err(not_a_string(rt, "chr-str-set", value));
    };
    let chars = match rt.heap.get_mut(handle) {
        HeapObject::Str(s) => &mut s.chars,
        HeapObject::LazyStr(lstr) => &mut lstr.prefix,
        HeapObject::Lit(_) => {
            return Err(Error::type_mismatch(
                "chr-str-set",
                format!("cannot modify literal string {}", shown),
            ));
        }
        _ => return Err(Error::type_mismatch("chr-str-set", format!("{} is not a string", shown))),
    };
    match chars.get_mut(index) {
        Some(slot) => {
            *slot = ch;
            Ok(())
        }
        None => Err(Error::range(
            "chr-str-set",
            format!("index {} is out of range for {}", index, shown),
        )),
    }
}

/// New capacity for a buffer of `alloc` that must hold `needed` items:
/// grow by a quarter, or to `needed` if that is larger.
pub(crate) fn grown_capacity(op: &'static str, alloc: usize, needed: usize) -> Result<usize> {
    const MAX_ITEMS: usize = (isize::MAX as usize) / 8;
    if needed > MAX_ITEMS {
        return Err(Error::overflow(op, format!("size {} is too large", needed)));
    }
    if needed <= alloc {
        return Ok(alloc);
    }
    if alloc >= MAX_ITEMS - MAX_ITEMS / 5 {
        return Ok(MAX_ITEMS);
    }
    Ok((alloc + alloc / 4).max(needed))
}

/// Appends `tail` (a string or a character) to a mutable string.
pub fn string_extend(rt: &mut Runtime, value: Value, tail: Value) -> Result<Value> {
    let extra: Vec<char> = match tail {
        Value::Char(c) => vec![c],
        _ if stringp(rt, tail) => str_content(rt, tail)?,
        _ => {
            return Err(Error::type_mismatch(
                "string-extend",
                format!("tail {} bad type", render(rt, tail)),
            ));
        }
    };
    append_chars(rt, "string-extend", value, &extra)?;
    Ok(value)
}

fn append_chars(rt: &mut Runtime, op: &'static str, value: Value, extra: &[char]) -> Result<()> {
    if rt.classify(value) != TypeTag::Str {
        return Err(Error::type_mismatch(
            op,
            format!("{} is not a mutable string", render(rt, value)),
        ));
    }
    let Some(handle) = value.as_handle() else {
        return Err(not_a_string(rt, op, value));
    };
    let HeapObject::Str(s) = rt.heap.get_mut(handle) else {
        return Err(Error::type_mismatch(op, "not a mutable string"));
    };
    let len = s.chars.len();
    let needed = len
        .checked_add(extra.len())
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| Error::overflow(op, "overflow"))?;
    let alloc = grown_capacity(op, s.alloc, needed)?;
    if alloc != s.alloc {
        s.chars
            .try_reserve_exact(alloc - 1 - len)
            .map_err(|err| Error::allocation(op, err.to_string()))?;
        s.alloc = alloc;
    }
    s.chars.extend_from_slice(extra);
    Ok(())
}

/// Replaces the characters in `from..to` of a mutable string with `items`,
/// shifting the tail and adjusting length and capacity.
pub(crate) fn splice_chars(
    rt: &mut Runtime,
    value: Value,
    from: usize,
    to: usize,
    items: &[char],
) -> Result<()> {
    if rt.classify(value) == TypeTag::LazyStr {
        lazy_str_force(rt, value)?;
    }
    let shown = render(rt, value);
    let Some(handle) = value.as_handle() else {
        return Err(Error::type_mismatch("replace-str", format!("{} is not a string", shown)));
    };
    let (chars, alloc) = match rt.heap.get_mut(handle) {
        HeapObject::Str(s) => (&mut s.chars, Some(&mut s.alloc)),
        HeapObject::LazyStr(lstr) => (&mut lstr.prefix, None),
        HeapObject::Lit(_) => {
            return Err(Error::type_mismatch(
                "replace-str",
                format!("cannot modify literal string {}", shown),
            ));
        }
        _ => return Err(Error::type_mismatch("replace-str", format!("{} is not a string", shown))),
    };
    chars.splice(from..to, items.iter().copied());
    if let Some(alloc) = alloc {
        *alloc = (*alloc).max(chars.len() + 1);
    }
    Ok(())
}

/// Concatenates strings (or characters), optionally separated by `sep`.
pub fn cat_str(rt: &mut Runtime, items: &[Value], sep: Option<Value>) -> Result<Value> {
    let sep = match sep {
        Some(Value::Char(c)) => vec![c],
        Some(s) => str_content(rt, s)?,
        None => Vec::new(),
    };
    let mut out: Vec<char> = Vec::new();
    for (i, &item) in items.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(&sep);
        }
        match item {
            Value::Char(c) => out.push(c),
            Value::Nil => {}
            _ => out.extend(str_content(rt, item)?),
        }
    }
    Ok(string_from_chars(rt, out))
}

/// Mutable copy of any string.
pub fn copy_str(rt: &mut Runtime, value: Value) -> Result<Value> {
    let chars = str_content(rt, value)?;
    Ok(string_from_chars(rt, chars))
}

/// Lexicographic comparison by character.
pub fn str_lt(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    let left = str_content(rt, a)?;
    let right = str_content(rt, b)?;
    Ok(left < right)
}

pub fn str_eq(rt: &mut Runtime, a: Value, b: Value) -> Result<bool> {
    let left = str_content(rt, a)?;
    let right = str_content(rt, b)?;
    Ok(left == right)
}

/// Builds a lazy string over `list`, a list-like sequence of chunks.
///
/// The first chunk is realized at construction. `term` defaults to a
/// newline; `limit` caps how many chunks are ever realized.
pub fn lazy_str(
    rt: &mut Runtime,
    list: Value,
    term: Option<&str>,
    limit: Option<usize>,
) -> Result<Value> {
    let term: Rc<str> = Rc::from(term.unwrap_or(DEFAULT_TERMINATOR));
    let lstr = rt.alloc(HeapObject::LazyStr(LazyStr {
        prefix: Vec::new(),
        list,
        term,
        limit,
    }));
    if !list.is_nil() {
        rt.anchored(|rt| {
            rt.anchor(lstr);
            realize_chunk(rt, lstr).map(|_| ())
        })?;
    }
    Ok(lstr)
}

fn lazy_parts(rt: &Runtime, lstr: Value) -> Result<(Value, Option<usize>, usize)> {
    match rt.object(lstr) {
        Some(HeapObject::LazyStr(l)) => Ok((l.list, l.limit, l.prefix.len())),
        _ => Err(Error::type_mismatch(
            "lazy-str-force",
            format!("{} is not a lazy string", render(rt, lstr)),
        )),
    }
}

/// Pops one chunk into the prefix. Returns `false` when nothing could be
/// realized: the list is exhausted, the cap is zero, or the next chunk is nil.
fn realize_chunk(rt: &mut Runtime, lstr: Value) -> Result<bool> {
    let (list, limit, _) = lazy_parts(rt, lstr)?;
    if list.is_nil() || limit == Some(0) {
        return Ok(false);
    }
    let next = car(rt, list)?;
    if next.is_nil() {
        return Ok(false);
    }
    let chunk = match next {
        Value::Char(c) => vec![c],
        _ if stringp(rt, next) => str_content(rt, next)?,
        _ => {
            return Err(Error::type_mismatch(
                "lazy-str-force",
                format!("chunk {} is not a string", render(rt, next)),
            ));
        }
    };
    let rest = cdr(rt, list)?;
    let Some(handle) = lstr.as_handle() else {
        return Ok(false);
    };
    rt.heap.write_barrier(handle, rest);
    if let HeapObject::LazyStr(l) = rt.heap.get_mut(handle) {
        l.list = rest;
        l.prefix.extend_from_slice(&chunk);
        let term: Vec<char> = l.term.chars().collect();
        l.prefix.extend_from_slice(&term);
        if let Some(limit) = l.limit.as_mut() {
            *limit -= 1;
        }
    }
    trace!(chunk = chunk.len(), "lazy string realized a chunk");
    Ok(true)
}

/// Realizes the whole lazy string and returns its prefix length.
pub fn lazy_str_force(rt: &mut Runtime, lstr: Value) -> Result<usize> {
    rt.anchored(|rt| {
        rt.anchor(lstr);
        while realize_chunk(rt, lstr)? {}
        Ok(lazy_parts(rt, lstr)?.2)
    })
}

/// Realizes chunks until `index` is inside the prefix or nothing more can
/// be realized. Returns whether `index` is now valid.
pub fn lazy_str_force_upto(rt: &mut Runtime, lstr: Value, index: usize) -> Result<bool> {
    rt.anchored(|rt| {
        rt.anchor(lstr);
        loop {
            let len = lazy_parts(rt, lstr)?.2;
            if index < len {
                return Ok(true);
            }
            if !realize_chunk(rt, lstr)? {
                return Ok(false);
            }
        }
    })
}

/// The unrealized chunks, with the realized prefix split back into chunks
/// at each terminator and prepended.
pub fn lazy_str_get_trailing_list(rt: &mut Runtime, lstr: Value, index: usize) -> Result<Value> {
    let (list, prefix, term) = match rt.object(lstr) {
        Some(HeapObject::LazyStr(l)) => (l.list, l.prefix.clone(), l.term.clone()),
        _ => {
            return Err(Error::type_mismatch(
                "lazy-str-get-trailing-list",
                format!("{} is not a lazy string", render(rt, lstr)),
            ));
        }
    };
    let start = index.min(prefix.len());
    let remaining: String = prefix[start..].iter().collect();
    let mut pieces: Vec<&str> = remaining.split(&*term).collect();
    if remaining.ends_with(&*term) {
        pieces.pop();
    }
    let chunks: Vec<Value> = pieces
        .into_iter()
        .map(|piece| string_own(rt, piece))
        .collect();
    let mut out = list;
    for &chunk in chunks.iter().rev() {
        out = cons(rt, chunk, out);
    }
    Ok(out)
}

fn length_probe(rt: &mut Runtime, value: Value, len: usize) -> Result<usize> {
    match rt.classify(value) {
        TypeTag::LazyStr => {
            lazy_str_force_upto(rt, value, len)?;
            Ok(lazy_parts(rt, value)?.2)
        }
        TypeTag::Lit | TypeTag::Str => length_str(rt, value),
        _ => Err(not_a_string(rt, "length-str", value)),
    }
}

/// `length(value) > len` without forcing a lazy string past `len`.
pub fn length_str_gt(rt: &mut Runtime, value: Value, len: usize) -> Result<bool> {
    Ok(length_probe(rt, value, len)? > len)
}

pub fn length_str_ge(rt: &mut Runtime, value: Value, len: usize) -> Result<bool> {
    Ok(length_probe(rt, value, len.saturating_sub(1))? >= len)
}

pub fn length_str_lt(rt: &mut Runtime, value: Value, len: usize) -> Result<bool> {
    length_str_ge(rt, value, len).map(|ge| !ge)
}

pub fn length_str_le(rt: &mut Runtime, value: Value, len: usize) -> Result<bool> {
    length_str_gt(rt, value, len).map(|gt| !gt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::pair::list;

    fn chunks(rt: &mut Runtime, parts: &[&str]) -> Value {
        let items: Vec<Value> = parts.iter().map(|p| string_lit(rt, *p)).collect();
        list(rt, &items)
    }

    #[test]
    fn extend_grows_by_a_quarter() {
        let mut rt = Runtime::new();
        let s = string_own(&mut rt, "abcdefgh");
        let tail = string_lit(&mut rt, "i");
        string_extend(&mut rt, s, tail).unwrap();
        match rt.object(s) {
            Some(HeapObject::Str(m)) => {
                assert_eq!(m.len(), 9);
                assert_eq!(m.capacity(), 11);
            }
            _ => panic!("expected Str"),
        }
    }

    #[test]
    fn extend_rejects_literals() {
        let mut rt = Runtime::new();
        let s = string_lit(&mut rt, "abc");
        let err = string_extend(&mut rt, s, Value::Char('d')).unwrap_err();
        assert_eq!(err.kind(), "type-mismatch");
    }

    #[test]
    fn lazy_string_realizes_on_demand() {
        let mut rt = Runtime::new();
        let src = chunks(&mut rt, &["ab", "cd", "ef"]);
        let lstr = lazy_str(&mut rt, src, Some(","), None).unwrap();
        assert_eq!(lazy_parts(&rt, lstr).unwrap().2, 3);

        assert_eq!(chr_str(&mut rt, lstr, 4).unwrap(), 'd');
        assert_eq!(lazy_parts(&rt, lstr).unwrap().2, 6);

        assert_eq!(string_value(&mut rt, lstr).unwrap(), "ab,cd,ef,");
    }

    #[test]
    fn limit_stops_realization_permanently() {
        let mut rt = Runtime::new();
        let src = chunks(&mut rt, &["a", "b", "c"]);
        let lstr = lazy_str(&mut rt, src, None, Some(2)).unwrap();
        assert_eq!(length_str(&mut rt, lstr).unwrap(), 4);
        assert!(!lazy_str_force_upto(&mut rt, lstr, 10).unwrap());
        assert_eq!(string_value(&mut rt, lstr).unwrap(), "a\nb\n");
    }

    #[test]
    fn nil_chunk_ends_the_string() {
        let mut rt = Runtime::new();
        let a = string_lit(&mut rt, "a");
        let b = string_lit(&mut rt, "b");
        let src = list(&mut rt, &[a, Value::Nil, b]);
        let lstr = lazy_str(&mut rt, src, Some(""), None).unwrap();
        assert_eq!(string_value(&mut rt, lstr).unwrap(), "a");
    }

    #[test]
    fn length_probes_force_only_what_they_need() {
        let mut rt = Runtime::new();
        let src = chunks(&mut rt, &["abc", "def", "ghi"]);
        let lstr = lazy_str(&mut rt, src, Some(""), None).unwrap();
        assert!(length_str_gt(&mut rt, lstr, 4).unwrap());
        assert_eq!(lazy_parts(&rt, lstr).unwrap().2, 6);
        assert!(length_str_lt(&mut rt, lstr, 100).unwrap());
    }

    #[test]
    fn bad_chunk_stays_in_the_list() {
        let mut rt = Runtime::new();
        let ab = string_lit(&mut rt, "ab");
        let src = list(&mut rt, &[ab, Value::Fixnum(5)]);
        let lstr = lazy_str(&mut rt, src, Some(""), None).unwrap();
        for _ in 0..2 {
            let err = lazy_str_force(&mut rt, lstr).unwrap_err();
            assert_eq!(err.kind(), "type-mismatch");
        }
        let (unread, _, realized) = lazy_parts(&rt, lstr).unwrap();
        assert_eq!(realized, 2);
        assert_eq!(render(&rt, unread), "(5)");
    }

    #[test]
    fn trailing_list_splits_the_unread_prefix() {
        let mut rt = Runtime::new();
        let src = chunks(&mut rt, &["one", "two", "three"]);
        let lstr = lazy_str(&mut rt, src, None, None).unwrap();
        lazy_str_force_upto(&mut rt, lstr, 5).unwrap();
        let rest = lazy_str_get_trailing_list(&mut rt, lstr, 4).unwrap();
        assert_eq!(render(&rt, rest), "(\"two\" \"three\")");
    }

    #[test]
    fn cat_str_with_separator() {
        let mut rt = Runtime::new();
        let a = string_lit(&mut rt, "x");
        let b = string_own(&mut rt, "y");
        let joined = cat_str(&mut rt, &[a, b, Value::Char('z')], Some(Value::Char('-'))).unwrap();
        assert_eq!(string_value(&mut rt, joined).unwrap(), "x-y-z");
    }
}

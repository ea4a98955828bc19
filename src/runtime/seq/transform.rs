use crate::runtime::{
    call::{call1, call2, invoke},
    context::Runtime,
    error::Result,
    pair::ListBuilder,
    value::Value,
};

use super::{SeqIter, SeqKind, car, cdr, make_like, search::apply_key, seq_info, seq_items};

/// Steps all of `seqs` in lockstep until the shortest runs out, handing
/// each row of elements to `visit`.
fn lockstep(
    rt: &mut Runtime,
    seqs: &[Value],
    mut visit: impl FnMut(&mut Runtime, &[Value]) -> Result<()>,
) -> Result<()> {
    let mut iters = Vec::with_capacity(seqs.len());
    for &seq in seqs {
        rt.anchor(seq);
        iters.push(SeqIter::begin(rt, seq)?);
    }
    let mut row = Vec::with_capacity(seqs.len());
    loop {
        row.clear();
        for iter in iters.iter_mut() {
            match iter.next(rt)? {
                Some(item) => row.push(item),
                None => return Ok(()),
            }
        }
        visit(rt, &row)?;
    }
}

/// Calls `f` on each row of elements and collects the results in the kind
/// of the first sequence.
pub fn mapcar(rt: &mut Runtime, f: Value, seqs: &[Value]) -> Result<Value> {
    let Some(&first) = seqs.first() else {
        return Ok(Value::Nil);
    };
    rt.anchored(|rt| {
        rt.anchor(f);
        let mut out = ListBuilder::anchored();
        lockstep(rt, seqs, |rt, row| {
            let result = invoke(rt, f, row)?;
            out.push(rt, result)
        })?;
        let list = out.finish();
        make_like(rt, list, first)
    })
}

/// Like [`mapcar`], appending the sequences `f` returns.
pub fn mappend(rt: &mut Runtime, f: Value, seqs: &[Value]) -> Result<Value> {
    let Some(&first) = seqs.first() else {
        return Ok(Value::Nil);
    };
    rt.anchored(|rt| {
        rt.anchor(f);
        let mut out = ListBuilder::anchored();
        lockstep(rt, seqs, |rt, row| {
            let result = invoke(rt, f, row)?;
            rt.anchor(result);
            out.push_all(rt, result)
        })?;
        let list = out.finish();
        make_like(rt, list, first)
    })
}

/// Calls `f` for effect on each row of elements. Returns nil.
pub fn mapdo(rt: &mut Runtime, f: Value, seqs: &[Value]) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(f);
        lockstep(rt, seqs, |rt, row| invoke(rt, f, row).map(|_| ()))?;
        Ok(Value::Nil)
    })
}

fn filter(rt: &mut Runtime, pred: Value, seq: Value, key: Value, keep: bool) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(pred);
        let mut out = ListBuilder::anchored();
        lockstep(rt, &[seq], |rt, row| {
            let item = row[0];
            let keyed = apply_key(rt, key, item)?;
            if call1(rt, pred, keyed)?.is_truthy() == keep {
                out.push(rt, item)?;
            }
            Ok(())
        })?;
        let list = out.finish();
        make_like(rt, list, seq)
    })
}

/// Elements whose key satisfies `pred`, in the kind of `seq`.
pub fn keep_if(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    filter(rt, pred, seq, key, true)
}

/// Elements whose key does not satisfy `pred`.
pub fn remove_if(rt: &mut Runtime, pred: Value, seq: Value, key: Value) -> Result<Value> {
    filter(rt, pred, seq, key, false)
}

/// Left fold. Without `init` (missing), the first element seeds the fold;
/// an empty sequence then yields `f()`.
pub fn reduce_left(rt: &mut Runtime, f: Value, seq: Value, init: Value, key: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(f);
        let mut acc = if init.is_missing() { None } else { Some(init) };
        lockstep(rt, &[seq], |rt, row| {
            let item = apply_key(rt, key, row[0])?;
            let next = match acc {
                Some(acc) => call2(rt, f, acc, item)?,
                None => item,
            };
            rt.anchor(next);
            acc = Some(next);
            Ok(())
        })?;
        match acc {
            Some(acc) => Ok(acc),
            None => invoke(rt, f, &[]),
        }
    })
}

/// Right fold: `f(x0, f(x1, ... f(xn, init)))`. Without `init`, the last
/// element seeds the fold.
pub fn reduce_right(rt: &mut Runtime, f: Value, seq: Value, init: Value, key: Value) -> Result<Value> {
    rt.anchored(|rt| {
        rt.anchor(f);
        rt.anchor(seq);
        let items = seq_items(rt, seq)?;
        let mut acc = if init.is_missing() { None } else { Some(init) };
        for &item in items.iter().rev() {
            let item = apply_key(rt, key, item)?;
            let next = match acc {
                Some(acc) => call2(rt, f, item, acc)?,
                None => item,
            };
            rt.anchor(next);
            acc = Some(next);
        }
        match acc {
            Some(acc) => Ok(acc),
            None => invoke(rt, f, &[]),
        }
    })
}

/// Splices nested lists into one flat list, dropping nils.
pub fn flatten(rt: &mut Runtime, list: Value) -> Result<Value> {
    fn walk(rt: &mut Runtime, list: Value, out: &mut ListBuilder) -> Result<()> {
        let mut cursor = list;
        while !cursor.is_nil() {
            if seq_info(rt, cursor).kind != SeqKind::ListLike {
                return out.push(rt, cursor);
            }
            let item = car(rt, cursor)?;
            match seq_info(rt, item).kind {
                SeqKind::Empty => {}
                SeqKind::ListLike => walk(rt, item, out)?,
                _ => out.push(rt, item)?,
            }
            cursor = cdr(rt, cursor)?;
        }
        Ok(())
    }
    rt.anchored(|rt| {
        rt.anchor(list);
        let mut out = ListBuilder::anchored();
        walk(rt, list, &mut out)?;
        Ok(out.finish())
    })
}

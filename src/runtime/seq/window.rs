use crate::runtime::{
    call::invoke,
    context::Runtime,
    error::{Error, Result},
    lazy::{lazy_cycle, take},
    pair::{ListBuilder, list},
    render::render,
    value::Value,
};

use super::{SeqKind, append, make_like, reverse, seq_info, seq_items};

/// Largest window `2r + 1` a caller may ask for.
pub const MAX_WINDOW: usize = 1025;

/// What a window sees past either end of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// The sequence tiled end to end.
    Wrap,
    /// The sequence mirrored at each edge, edge element repeated.
    Reflect,
    /// A sequence supplies the left padding from its first `r` elements and
    /// the right padding from the next `r` (nil past its end); any other
    /// value pads both sides.
    Explicit(Value),
}

/// The first `r` elements of the infinite `cycle`.
fn cycle_prefix(rt: &mut Runtime, r: usize, cycle: Value) -> Result<Vec<Value>> {
    rt.anchor(cycle);
    let prefix = take(rt, r, cycle)?;
    rt.anchor(prefix);
    seq_items(rt, prefix)
}

/// Left and right padding, each `r` elements, for `items` (non-empty).
fn padding(
    rt: &mut Runtime,
    r: usize,
    boundary: Boundary,
    items: &[Value],
) -> Result<(Vec<Value>, Vec<Value>)> {
    match boundary {
        Boundary::Wrap => {
            let forward = list(rt, items);
            rt.anchor(forward);
            let right_cycle = lazy_cycle(rt, forward)?;
            let right = cycle_prefix(rt, r, right_cycle)?;
            let backward = reverse(rt, forward)?;
            rt.anchor(backward);
            let left_cycle = lazy_cycle(rt, backward)?;
            let mut left = cycle_prefix(rt, r, left_cycle)?;
            left.reverse();
            Ok((left, right))
        }
        Boundary::Reflect => {
            let forward = list(rt, items);
            rt.anchor(forward);
            let backward = reverse(rt, forward)?;
            rt.anchor(backward);
            let mirror_right = append(rt, &[backward, forward])?;
            let right_cycle = lazy_cycle(rt, mirror_right)?;
            let right = cycle_prefix(rt, r, right_cycle)?;
            let mirror_left = append(rt, &[forward, backward])?;
            let left_cycle = lazy_cycle(rt, mirror_left)?;
            let mut left = cycle_prefix(rt, r, left_cycle)?;
            left.reverse();
            Ok((left, right))
        }
        Boundary::Explicit(fill) => match seq_info(rt, fill).kind {
            SeqKind::Empty | SeqKind::ListLike | SeqKind::VectorLike => {
                let given = seq_items(rt, fill)?;
                let pick = |i: usize| given.get(i).copied().unwrap_or(Value::Nil);
                Ok(((0..r).map(pick).collect(), (r..2 * r).map(pick).collect()))
            }
            _ => Ok((vec![fill; r], vec![fill; r])),
        },
    }
}

fn window_walk(
    rt: &mut Runtime,
    r: usize,
    boundary: Boundary,
    f: Value,
    seq: Value,
    concatenate: bool,
) -> Result<Value> {
    let width = 2 * r + 1;
    if r == 0 || width > MAX_WINDOW {
        return Err(Error::range(
            "window-map",
            format!("radius {} gives a window outside 3..={}", r, MAX_WINDOW),
        ));
    }
    match seq_info(rt, seq).kind {
        SeqKind::Empty => return Ok(Value::Nil),
        SeqKind::ListLike | SeqKind::VectorLike => {}
        _ => {
            return Err(Error::type_mismatch(
                "window-map",
                format!("{} is not a sequence", render(rt, seq)),
            ));
        }
    }
    rt.anchored(|rt| {
        rt.anchor(seq);
        rt.anchor(f);
        if let Boundary::Explicit(fill) = boundary {
            rt.anchor(fill);
        }
        let items = seq_items(rt, seq)?;
        let (left, right) = padding(rt, r, boundary, &items)?;
        let mut padded = left;
        padded.extend_from_slice(&items);
        padded.extend(right);

        let mut out = ListBuilder::anchored();
        for window in padded.windows(width) {
            let result = invoke(rt, f, window)?;
            if concatenate {
                rt.anchor(result);
                out.push_all(rt, result)?;
            } else {
                out.push(rt, result)?;
            }
        }
        let list = out.finish();
        make_like(rt, list, seq)
    })
}

/// Calls `f` with the `2r + 1` elements centered on each element of `seq`,
/// padded past the ends by `boundary`, and collects the results in the kind
/// of `seq`.
pub fn window_map(rt: &mut Runtime, r: usize, boundary: Boundary, f: Value, seq: Value) -> Result<Value> {
    window_walk(rt, r, boundary, f, seq, false)
}

/// Like [`window_map`], appending the sequences `f` returns.
pub fn window_mappend(
    rt: &mut Runtime,
    r: usize,
    boundary: Boundary,
    f: Value,
    seq: Value,
) -> Result<Value> {
    window_walk(rt, r, boundary, f, seq, true)
}

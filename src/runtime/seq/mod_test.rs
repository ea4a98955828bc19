use crate::runtime::{
    context::Runtime,
    map::{MapKind, make_map, map_set},
    pair::{cons, list},
    render::render,
    string::{string_lit, string_own},
    value::Value,
    vector::vector_from_slice,
};

use super::{
    SeqIter, SeqKind, append, butlast, caddr, car, cdr, copy_seq, empty, last, length, make_like,
    nth, nthcdr, nullify, reverse, seq_info, seq_items, seq_ref, seq_refset, tolist,
};

fn nums(rt: &mut Runtime, items: &[i64]) -> Value {
    let items: Vec<Value> = items.iter().copied().map(Value::Fixnum).collect();
    list(rt, &items)
}

#[test]
fn classification_follows_the_tag() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[1]);
    let v = vector_from_slice(&mut rt, &[]);
    let s = string_lit(&mut rt, "x");
    let m = make_map(&mut rt, MapKind::Equal);
    assert_eq!(seq_info(&rt, Value::Nil).kind, SeqKind::Empty);
    assert_eq!(seq_info(&rt, l).kind, SeqKind::ListLike);
    assert_eq!(seq_info(&rt, v).kind, SeqKind::VectorLike);
    assert_eq!(seq_info(&rt, s).kind, SeqKind::VectorLike);
    assert_eq!(seq_info(&rt, m).kind, SeqKind::MapLike);
    assert_eq!(seq_info(&rt, Value::Fixnum(3)).kind, SeqKind::NotSeq);
}

#[test]
fn iteration_can_rewind() {
    let mut rt = Runtime::new();
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2)]);
    let mut iter = SeqIter::begin(&rt, v).unwrap();
    assert_eq!(iter.next(&mut rt).unwrap(), Some(Value::Fixnum(1)));
    assert_eq!(iter.next(&mut rt).unwrap(), Some(Value::Fixnum(2)));
    assert_eq!(iter.next(&mut rt).unwrap(), None);
    iter.rewind();
    assert_eq!(iter.next(&mut rt).unwrap(), Some(Value::Fixnum(1)));
}

#[test]
fn literal_strings_iterate_by_character() {
    let mut rt = Runtime::new();
    let text = "añb€".repeat(2_000);
    let s = string_lit(&mut rt, text.as_str());
    let mut iter = SeqIter::begin(&rt, s).unwrap();
    let mut seen = String::new();
    while let Some(item) = iter.next(&mut rt).unwrap() {
        let Value::Char(ch) = item else {
            panic!("strings yield characters");
        };
        seen.push(ch);
    }
    assert_eq!(seen, text);
    iter.rewind();
    assert_eq!(iter.next(&mut rt).unwrap(), Some(Value::Char('a')));
    assert_eq!(iter.next(&mut rt).unwrap(), Some(Value::Char('ñ')));
}

#[test]
fn maps_iterate_as_pairs_in_insertion_order() {
    let mut rt = Runtime::new();
    let m = make_map(&mut rt, MapKind::Eql);
    map_set(&mut rt, m, Value::Fixnum(2), Value::Char('b')).unwrap();
    map_set(&mut rt, m, Value::Fixnum(1), Value::Char('a')).unwrap();
    let pairs = tolist(&mut rt, m).unwrap();
    assert_eq!(render(&rt, pairs), "((2 . #\\b) (1 . #\\a))");
}

#[test]
fn non_sequences_cannot_begin() {
    let rt = Runtime::new();
    let err = SeqIter::begin(&rt, Value::Char('x')).unwrap_err();
    assert!(err.to_string().contains("unsupported object"));
}

#[test]
fn head_and_rest_of_vectors_and_strings() {
    let mut rt = Runtime::new();
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2), Value::Fixnum(3)]);
    assert_eq!(car(&mut rt, v).unwrap(), Value::Fixnum(1));
    let rest = cdr(&mut rt, v).unwrap();
    assert_eq!(render(&rt, rest), "#(2 3)");

    let s = string_own(&mut rt, "a");
    assert_eq!(car(&mut rt, s).unwrap(), Value::Char('a'));
    assert_eq!(cdr(&mut rt, s).unwrap(), Value::Nil);
    assert!(car(&mut rt, Value::Fixnum(1)).is_err());
}

#[test]
fn accessor_paths_and_positions() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[10, 20, 30, 40]);
    assert_eq!(caddr(&mut rt, l).unwrap(), Value::Fixnum(30));
    assert_eq!(nth(&mut rt, 3, l).unwrap(), Value::Fixnum(40));
    assert_eq!(nth(&mut rt, 9, l).unwrap(), Value::Nil);
    let tail = nthcdr(&mut rt, 2, l).unwrap();
    assert_eq!(render(&rt, tail), "(30 40)");
    assert_eq!(length(&mut rt, l).unwrap(), 4);
}

#[test]
fn indexing_counts_negative_from_the_end() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[1, 2, 3]);
    assert_eq!(seq_ref(&mut rt, l, Value::Fixnum(-1)).unwrap(), Value::Fixnum(3));
    seq_refset(&mut rt, l, Value::Fixnum(0), Value::Fixnum(9)).unwrap();
    assert_eq!(render(&rt, l), "(9 2 3)");
    let err = seq_refset(&mut rt, l, Value::Fixnum(5), Value::Nil).unwrap_err();
    assert_eq!(err.kind(), "range");
}

#[test]
fn emptiness_and_nullify() {
    let mut rt = Runtime::new();
    let v = vector_from_slice(&mut rt, &[]);
    assert!(empty(&mut rt, v).unwrap());
    assert_eq!(nullify(&mut rt, v).unwrap(), Value::Nil);
    let s = string_own(&mut rt, "x");
    assert_eq!(nullify(&mut rt, s).unwrap(), s);
}

#[test]
fn make_like_keeps_strings_only_for_characters() {
    let mut rt = Runtime::new();
    let s = string_lit(&mut rt, "ab");
    let chars = list(&mut rt, &[Value::Char('x'), Value::Char('y')]);
    let made = make_like(&mut rt, chars, s).unwrap();
    assert_eq!(render(&rt, made), "\"xy\"");
    let mixed = list(&mut rt, &[Value::Char('x'), Value::Fixnum(1)]);
    let made = make_like(&mut rt, mixed, s).unwrap();
    assert_eq!(made, mixed);
}

#[test]
fn copies_and_reversals_keep_the_kind() {
    let mut rt = Runtime::new();
    let v = vector_from_slice(&mut rt, &[Value::Fixnum(1), Value::Fixnum(2)]);
    let copy = copy_seq(&mut rt, v).unwrap();
    assert_ne!(copy, v);
    assert_eq!(render(&rt, copy), "#(1 2)");
    let back = reverse(&mut rt, v).unwrap();
    assert_eq!(render(&rt, back), "#(2 1)");
    let s = string_lit(&mut rt, "abc");
    let back = reverse(&mut rt, s).unwrap();
    assert_eq!(render(&rt, back), "\"cba\"");
}

#[test]
fn append_shares_the_last_list() {
    let mut rt = Runtime::new();
    let a = nums(&mut rt, &[1, 2]);
    let b = nums(&mut rt, &[3]);
    let joined = append(&mut rt, &[a, Value::Nil, b]).unwrap();
    assert_eq!(render(&rt, joined), "(1 2 3)");
    assert_eq!(nthcdr(&mut rt, 2, joined).unwrap(), b);
    assert_ne!(joined, a);

    let dotted = append(&mut rt, &[a, Value::Fixnum(7)]).unwrap();
    assert_eq!(render(&rt, dotted), "(1 2 . 7)");

    let v = vector_from_slice(&mut rt, &[Value::Fixnum(0)]);
    let joined = append(&mut rt, &[v, a]).unwrap();
    assert_eq!(render(&rt, joined), "#(0 1 2)");
}

#[test]
fn last_and_butlast() {
    let mut rt = Runtime::new();
    let l = nums(&mut rt, &[1, 2, 3]);
    let tail = last(&mut rt, l, 2).unwrap();
    assert_eq!(render(&rt, tail), "(2 3)");
    assert_eq!(last(&mut rt, l, 10).unwrap(), l);
    let front = butlast(&mut rt, l, 1).unwrap();
    assert_eq!(render(&rt, front), "(1 2)");
    let s = string_lit(&mut rt, "hello");
    let end = last(&mut rt, s, 3).unwrap();
    assert_eq!(render(&rt, end), "\"llo\"");
}

#[test]
fn walking_an_improper_list_raises_at_the_atom() {
    let mut rt = Runtime::new();
    let dotted = cons(&mut rt, Value::Fixnum(1), Value::Fixnum(2));
    let err = seq_items(&mut rt, dotted).unwrap_err();
    assert_eq!(err.kind(), "type-mismatch");
}

//! Root and indirect views over shared text.

use core_state::{Buffers, Error};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn root_of_indirect_is_its_base() {
    let mut b = Buffers::new();
    let base = b.create_root("base");
    let ind = b.create_indirect(base, "base-indirect").unwrap();
    assert_eq!(b.root_of(ind).unwrap(), Some(base));
    assert_eq!(b.root_of(base).unwrap(), None);
}

#[test]
fn indirect_view_starts_with_base_point_and_narrowing() {
    let mut b = Buffers::new();
    let base = b.create_root("base");
    b.insert(base, "one two three").unwrap();
    b.narrow(base, 4, 7).unwrap();
    b.goto_char(base, 5).unwrap();
    let ind = b.create_indirect(base, "ind").unwrap();
    assert_eq!(b.point(ind).unwrap(), 5);
    assert_eq!(b.text(ind).unwrap(), "two");

    // Narrowing stays per view.
    b.widen(ind).unwrap();
    assert_eq!(b.text(ind).unwrap(), "one two three");
    assert_eq!(b.text(base).unwrap(), "two");
}

#[test]
fn edits_through_either_view_are_shared() {
    let mut b = Buffers::new();
    let base = b.create_root("base");
    b.insert(base, "abc").unwrap();
    let ind = b.create_indirect(base, "ind").unwrap();
    b.goto_char(ind, 0).unwrap();
    b.insert(ind, ">> ").unwrap();
    assert_eq!(b.full_text(base).unwrap(), ">> abc");
    b.delete_region(base, 3, 6).unwrap();
    assert_eq!(b.full_text(ind).unwrap(), ">> ");
    assert!(b.is_modified(ind).unwrap());
    assert_eq!(b.modified_tick(ind).unwrap(), b.modified_tick(base).unwrap());
    // One undo log for both.
    assert_eq!(b.undo_entries(ind).unwrap(), b.undo_entries(base).unwrap());
}

#[test]
fn indirect_of_a_killed_base_is_invalid() {
    let mut b = Buffers::new();
    let base = b.create_root("base");
    b.kill(base).unwrap();
    assert!(matches!(
        b.create_indirect(base, "late"),
        Err(Error::InvalidArgument(_))
    ));
    assert!(b.buffer_list().is_empty());
    assert_eq!(b.kill(base), Err(Error::NotFound(base)));
}

#[test]
fn erase_narrowed_view_clears_whole_text_and_widens() {
    let mut b = Buffers::new();
    let v = b.create_root("v");
    b.insert(v, "line one\nline two\n").unwrap();
    b.undo_boundary(v).unwrap();
    b.narrow(v, 5, 8).unwrap();
    b.erase(v).unwrap();
    assert_eq!(b.full_text(v).unwrap(), "");
    assert_eq!((b.point_min(v).unwrap(), b.point_max(v).unwrap()), (0, 0));
    assert!(!b.is_narrowed(v).unwrap());
    // Recorded like any deletion.
    b.undo_boundary(v).unwrap();
    b.undo(v).unwrap();
    assert_eq!(b.full_text(v).unwrap(), "line one\nline two\n");
}

#[test]
fn erase_of_an_indirect_view_empties_the_base() {
    let mut b = Buffers::new();
    let base = b.create_root("base");
    b.insert(base, "shared").unwrap();
    let ind = b.create_indirect(base, "ind").unwrap();
    b.erase(ind).unwrap();
    assert_eq!(b.buffer_size(base).unwrap(), 0);
    assert_eq!(b.point(base).unwrap(), 0);
}

#[test]
fn set_unmodified_resets_modified_flag_but_not_ticks() {
    let mut b = Buffers::new();
    let v = b.create_root("v");
    b.insert(v, "x").unwrap();
    let tick = b.modified_tick(v).unwrap();
    b.set_unmodified(v).unwrap();
    assert!(!b.is_modified(v).unwrap());
    assert_eq!(b.modified_tick(v).unwrap(), tick);
    assert_eq!(b.chars_modified_tick(v).unwrap(), tick);
}

#[test]
fn with_current_restores_previous_view_on_error() {
    let mut b = Buffers::new();
    let first = b.create_root("first");
    let second = b.create_root("second");
    assert_eq!(b.current(), Some(first));
    let result: Result<(), Error> = b.with_current(second, |b| {
        assert_eq!(b.current(), Some(second));
        b.delete_region(second, 0, 10).map(|_| ())
    });
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(b.current(), Some(first));
}

#[test]
fn with_current_falls_back_when_previous_view_dies() {
    let mut b = Buffers::new();
    let first = b.create_root("first");
    let second = b.create_root("second");
    b.with_current(second, |b| b.kill(first)).unwrap();
    assert_eq!(b.current(), Some(second));
}

#[derive(Debug, Clone)]
enum Op {
    Root,
    Indirect(usize),
    Erase(usize),
    Kill(usize),
    Insert(usize, String),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Root),
        (0usize..8).prop_map(Op::Indirect),
        (0usize..8).prop_map(Op::Erase),
        (0usize..8).prop_map(Op::Kill),
        ((0usize..8), "[a-z]{0,4}").prop_map(|(i, s)| Op::Insert(i, s)),
    ]
}

proptest! {
    #[test]
    fn buffer_list_never_has_duplicates(ops in prop::collection::vec(op(), 0..40)) {
        let mut b = Buffers::new();
        for op in ops {
            let live = b.buffer_list();
            let pick = |i: usize| live.get(i % live.len().max(1)).copied();
            match op {
                Op::Root => { b.create_root("buf"); }
                Op::Indirect(i) => if let Some(v) = pick(i) { let _ = b.create_indirect(v, "ind"); },
                Op::Erase(i) => if let Some(v) = pick(i) { b.erase(v).unwrap(); },
                Op::Kill(i) => if let Some(v) = pick(i) { b.kill(v).unwrap(); },
                Op::Insert(i, s) => if let Some(v) = pick(i) { b.insert(v, &s).unwrap(); },
            }
            let list = b.buffer_list();
            let mut dedup = list.clone();
            dedup.sort();
            dedup.dedup();
            prop_assert_eq!(dedup.len(), list.len());
            let roots = b.root_list();
            prop_assert!(roots.iter().all(|r| b.root_of(*r).unwrap().is_none()));
            let mut names: Vec<String> = list.iter().map(|v| b.name(*v).unwrap().to_owned()).collect();
            names.sort();
            names.dedup();
            prop_assert_eq!(names.len(), list.len());
        }
    }
}

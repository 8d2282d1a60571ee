//! First-change hooks, property restoration and the file-lock call points.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::bail;
use core_state::{
    Buffers, ChangeHooks, Error, LockOwner, LockProtocol, LockState, Symbol, Value, ViewId,
};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    FirstChange(ViewId),
    Restore(ViewId, usize, usize, String, Value),
    Lock(ViewId, PathBuf),
    Unlock(ViewId, PathBuf),
}

type Journal = Rc<RefCell<Vec<Call>>>;

struct RecordingHooks(Journal);

impl ChangeHooks for RecordingHooks {
    fn first_change(&mut self, root: ViewId) {
        self.0.borrow_mut().push(Call::FirstChange(root));
    }

    fn restore_property(
        &mut self,
        root: ViewId,
        begin: usize,
        end: usize,
        property: &Symbol,
        value: &Value,
    ) {
        self.0.borrow_mut().push(Call::Restore(
            root,
            begin,
            end,
            property.name().to_owned(),
            value.clone(),
        ));
    }
}

struct RecordingLock {
    journal: Journal,
    refuse: Option<PathBuf>,
}

impl LockProtocol for RecordingLock {
    fn lock(&mut self, root: ViewId, path: &Path) -> anyhow::Result<()> {
        if self.refuse.as_deref() == Some(path) {
            bail!("{} is locked by someone else", path.display());
        }
        self.journal
            .borrow_mut()
            .push(Call::Lock(root, path.to_owned()));
        Ok(())
    }

    fn unlock(&mut self, root: ViewId, path: &Path) {
        self.journal
            .borrow_mut()
            .push(Call::Unlock(root, path.to_owned()));
    }

    fn query(&self, path: &Path) -> LockState {
        if self.refuse.as_deref() == Some(path) {
            LockState::OtherOwner(LockOwner {
                user: "ann".into(),
                host: "build.example".into(),
                pid: 4242,
            })
        } else {
            LockState::Unlocked
        }
    }
}

fn recording(refuse: Option<&str>) -> (Buffers, Journal) {
    let journal = Journal::default();
    let mut b = Buffers::new();
    b.set_hooks(Box::new(RecordingHooks(journal.clone())));
    b.set_lock_protocol(Box::new(RecordingLock {
        journal: journal.clone(),
        refuse: refuse.map(PathBuf::from),
    }));
    (b, journal)
}

#[test]
fn first_change_fires_once_until_saved() {
    let (mut b, journal) = recording(None);
    let v = b.create_root("notes");
    b.insert(v, "a").unwrap();
    b.insert(v, "b").unwrap();
    b.record_property_change(v, 0, 1, "face", Value::Nil).unwrap();
    assert_eq!(*journal.borrow(), vec![Call::FirstChange(v)]);

    b.set_unmodified(v).unwrap();
    let ind = b.create_indirect(v, "notes-view").unwrap();
    b.insert(ind, "c").unwrap();
    // Hooks always name the root.
    assert_eq!(
        *journal.borrow(),
        vec![Call::FirstChange(v), Call::FirstChange(v)]
    );
}

#[test]
fn first_change_is_silent_while_undo_is_disabled() {
    let (mut b, journal) = recording(None);
    let v = b.create_root("scratch");
    b.disable_undo(v).unwrap();
    b.insert(v, "quiet").unwrap();
    assert!(journal.borrow().is_empty());
    assert!(b.is_modified(v).unwrap());
}

#[test]
fn undo_of_property_change_asks_hooks_to_restore() {
    let (mut b, journal) = recording(None);
    let v = b.create_root("props");
    b.insert(v, "styled").unwrap();
    b.undo_boundary(v).unwrap();
    b.record_property_change(v, 1, 3, "face", "plain").unwrap();
    b.undo_boundary(v).unwrap();
    journal.borrow_mut().clear();
    b.undo(v).unwrap();
    assert_eq!(
        *journal.borrow(),
        vec![Call::Restore(v, 1, 4, "face".into(), Value::from("plain"))]
    );
    assert_eq!(b.full_text(v).unwrap(), "styled");
}

#[test]
fn first_modification_of_visited_text_takes_the_lock() {
    let (mut b, journal) = recording(None);
    let v = b.create_root("main.rs");
    b.set_visited_file(v, Some("/src/main.rs".into())).unwrap();
    b.insert(v, "fn main() {}").unwrap();
    b.insert(v, "\n").unwrap();
    b.set_unmodified(v).unwrap();
    assert_eq!(
        *journal.borrow(),
        vec![
            Call::Lock(v, "/src/main.rs".into()),
            Call::FirstChange(v),
            Call::Unlock(v, "/src/main.rs".into()),
        ]
    );
}

#[test]
fn refused_lock_leaves_text_untouched() {
    let (mut b, journal) = recording(Some("/shared/todo.txt"));
    let v = b.create_root("todo.txt");
    b.set_visited_file(v, Some("/shared/todo.txt".into())).unwrap();
    assert!(matches!(b.insert(v, "x"), Err(Error::Lock(_))));
    assert_eq!(b.buffer_size(v).unwrap(), 0);
    assert!(!b.is_modified(v).unwrap());
    assert!(b.undo_entries(v).unwrap().is_empty());
    assert!(journal.borrow().is_empty());
    assert!(matches!(
        b.file_lock_state(v).unwrap(),
        LockState::OtherOwner(owner) if owner.to_string() == "ann@build.example.4242"
    ));
}

#[test]
fn revisiting_or_killing_releases_the_lock() {
    let (mut b, journal) = recording(None);
    let v = b.create_root("a.txt");
    b.set_visited_file(v, Some("/a.txt".into())).unwrap();
    b.insert(v, "edit").unwrap();
    b.set_visited_file(v, Some("/b.txt".into())).unwrap();
    b.kill(v).unwrap();
    let calls: Vec<Call> = journal
        .borrow()
        .iter()
        .filter(|c| !matches!(c, Call::FirstChange(_)))
        .cloned()
        .collect();
    assert_eq!(
        calls,
        vec![
            Call::Lock(v, "/a.txt".into()),
            Call::Lock(v, "/b.txt".into()),
            Call::Unlock(v, "/a.txt".into()),
            Call::Unlock(v, "/b.txt".into()),
        ]
    );
}

#[test]
fn revisiting_the_same_file_keeps_the_lock() {
    let (mut b, journal) = recording(None);
    let v = b.create_root("a.txt");
    b.set_visited_file(v, Some("/a.txt".into())).unwrap();
    b.insert(v, "edit").unwrap();
    b.set_visited_file(v, Some("/a.txt".into())).unwrap();
    b.insert(v, " more").unwrap();
    b.set_unmodified(v).unwrap();
    let calls: Vec<Call> = journal
        .borrow()
        .iter()
        .filter(|c| !matches!(c, Call::FirstChange(_)))
        .cloned()
        .collect();
    assert_eq!(
        calls,
        vec![
            Call::Lock(v, "/a.txt".into()),
            Call::Unlock(v, "/a.txt".into()),
        ]
    );
}

#[test]
fn indirect_views_cannot_visit_files() {
    let (mut b, _) = recording(None);
    let v = b.create_root("base");
    let ind = b.create_indirect(v, "ind").unwrap();
    assert!(matches!(
        b.set_visited_file(ind, Some("/x".into())),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(b.visited_file(v).unwrap(), None);
}

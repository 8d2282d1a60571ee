//! Buffer state engine: views over shared text, overlays, markers and a
//! bounded, command-grouped undo log.
//!
//! Layout:
//! - [`Buffers`] is the registry of live views and the entry point for every
//!   operation. A root view owns its text; indirect views share a root's
//!   text, overlays, markers and undo log while keeping their own point and
//!   narrowing.
//! - [`ChangeNotifier`] is the single path by which text and recorded
//!   property changes happen. It keeps the text, marker and overlay
//!   positions, undo log and modification ticks consistent before returning.
//! - [`UndoLog`] holds the history as an arena of records linked newest to
//!   oldest. [`UndoLog::truncate`] drops the oldest command groups once the
//!   log outgrows the [`UndoLimits`].
//! - [`ChangeHooks`] and [`LockProtocol`] are the seams to the embedding
//!   program: first-change notification, property restoration on undo and
//!   file locking.
//!
//! Everything is single-threaded and synchronous. Tracing targets:
//! `state.buffer`, `state.overlay`, `state.undo`.

mod buffers;
pub mod error;
pub mod hooks;
pub mod lock;
pub mod marker;
pub mod notify;
pub mod overlay;
pub mod undo;
pub mod value;
pub mod view;

pub use buffers::Buffers;
pub use error::{Error, Result};
pub use hooks::{ChangeHooks, NoopChangeHooks};
pub use lock::{LockOwner, LockOwnerParseError, LockProtocol, LockState, NoLocking};
pub use marker::{MarkerAdjustment, MarkerId};
pub use notify::ChangeNotifier;
pub use overlay::{Overlay, OverlayId};
pub use undo::{OuterLimitHandler, Truncation, UndoEntry, UndoLimits, UndoLog};
pub use value::{PropertyList, Symbol, Value};
pub use view::{BufferView, SharedText, ViewId};

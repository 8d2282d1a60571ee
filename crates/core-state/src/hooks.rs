//! Change hooks invoked by edit transactions.

use crate::value::{Symbol, Value};
use crate::view::ViewId;

/// Callbacks fired by [`ChangeNotifier`](crate::notify::ChangeNotifier) and
/// undo replay. Every method defaults to a no-op.
pub trait ChangeHooks {
    /// First modification of an unmodified root while undo is enabled. The
    /// undo record for the change is appended right after this returns.
    fn first_change(&mut self, _root: ViewId) {}

    /// Undo of a property change: restore `property` to `value` over
    /// `[begin, end)` of `root`.
    fn restore_property(
        &mut self,
        _root: ViewId,
        _begin: usize,
        _end: usize,
        _property: &Symbol,
        _value: &Value,
    ) {
    }
}

/// Default no-op hooks implementation.
pub struct NoopChangeHooks;

impl ChangeHooks for NoopChangeHooks {}

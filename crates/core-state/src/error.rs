//! Error taxonomy for buffer, overlay, marker and undo operations.
//!
//! Arguments are always validated before anything is mutated, so an `Err`
//! means the call had no effect. The one exception is `Buffers::undo`, which
//! can fail partway through a group after earlier records were replayed.

use thiserror::Error;

use crate::view::ViewId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("wrong type argument: {0}")]
    WrongType(String),

    #[error("no live buffer {0}")]
    NotFound(ViewId),

    #[error("no undo information in this buffer")]
    Disabled,

    #[error("no further undo information")]
    NoFurtherUndo,

    #[error("undo log is being truncated; re-entrant truncation rejected")]
    Reentrant,

    #[error("file lock failed: {0}")]
    Lock(String),
}

impl Error {
    pub(crate) fn out_of_range(begin: usize, end: usize, min: usize, max: usize) -> Self {
        Error::InvalidArgument(format!(
            "args out of range: {begin}..{end} not within {min}..{max}"
        ))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

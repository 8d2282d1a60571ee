//! File-lock protocol consulted when a visited root is first modified.
//!
//! The lock itself lives outside this crate; only the owner format
//! `<user>@<host>.<pid>` and the call points are fixed here.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::view::ViewId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOwner {
    pub user: String,
    pub host: String,
    pub pid: u32,
}

impl fmt::Display for LockOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}.{}", self.user, self.host, self.pid)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockOwnerParseError {
    #[error("lock owner `{0}` has no `@` separator")]
    MissingHost(String),
    #[error("lock owner `{0}` has no `.` before the pid")]
    MissingPid(String),
    #[error("lock owner `{0}` has a non-numeric pid")]
    BadPid(String),
}

impl FromStr for LockOwner {
    type Err = LockOwnerParseError;

    /// User names may contain `@` and host names may contain `.`, so the
    /// last occurrence of each separator is the one that counts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user, rest) = s
            .rsplit_once('@')
            .ok_or_else(|| LockOwnerParseError::MissingHost(s.to_owned()))?;
        let (host, pid) = rest
            .rsplit_once('.')
            .ok_or_else(|| LockOwnerParseError::MissingPid(s.to_owned()))?;
        let pid = pid
            .parse()
            .map_err(|_| LockOwnerParseError::BadPid(s.to_owned()))?;
        Ok(Self {
            user: user.to_owned(),
            host: host.to_owned(),
            pid,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    SelfOwned,
    OtherOwner(LockOwner),
}

pub trait LockProtocol {
    /// Called before the first modification of an unmodified root that
    /// visits `path`. An error aborts the modification.
    fn lock(&mut self, root: ViewId, path: &Path) -> anyhow::Result<()>;

    /// Called when the root is saved, killed or starts visiting another file.
    fn unlock(&mut self, root: ViewId, path: &Path);

    fn query(&self, path: &Path) -> LockState;
}

/// Protocol that never locks anything.
pub struct NoLocking;

impl LockProtocol for NoLocking {
    fn lock(&mut self, _root: ViewId, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    fn unlock(&mut self, _root: ViewId, _path: &Path) {}

    fn query(&self, _path: &Path) -> LockState {
        LockState::Unlocked
    }
}

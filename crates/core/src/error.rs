// SPDX-License-Identifier: MIT

//! Shared error vocabulary (`spec.md` §7). Each downstream crate derives
//! its own `thiserror` enum for its own failure modes; this type is the
//! coarse classification the CLI uses to decide an exit code / message
//! shape, independent of which crate produced the error.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Invalid,
    Integrity,
    Locked,
    LockLost,
    Cycle,
    GraphDrift,
    Cancelled,
    TaskFailed,
    TaskError,
    Storage,
    Codec,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Locked => "locked",
            ErrorKind::LockLost => "lock_lost",
            ErrorKind::Cycle => "cycle",
            ErrorKind::GraphDrift => "graph_drift",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::TaskFailed => "task_failed",
            ErrorKind::TaskError => "task_error",
            ErrorKind::Storage => "storage",
            ErrorKind::Codec => "codec",
        };
        write!(f, "{s}")
    }
}

/// Implemented by each crate's error enum so the CLI can classify any
/// error uniformly without downcasting.
pub trait HasErrorKind {
    fn kind(&self) -> ErrorKind;
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

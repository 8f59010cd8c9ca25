// SPDX-License-Identifier: MIT

use e3_core::{ErrorKind, HasErrorKind};
use thiserror::Error;

/// Internal plumbing errors a runner implementation converts into
/// `TaskResult::Error` before returning — `execute` itself never returns a
/// `Result` (`spec.md` §4.H).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("task {0} not found in the object store")]
    TaskNotFound(e3_core::Hash),
    #[error("task command IR is not valid UTF-8")]
    MalformedCommandIr,
    #[error("cancelled")]
    Cancelled,
    #[error("task exited with status {0}")]
    NonZeroExit(std::process::ExitStatus),
    #[error(transparent)]
    Package(#[from] e3_package::PackageError),
    #[error(transparent)]
    Store(#[from] e3_store::StoreError),
    #[error(transparent)]
    Codec(#[from] e3_core::CodecError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HasErrorKind for RunnerError {
    fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::TaskNotFound(_) => ErrorKind::NotFound,
            RunnerError::MalformedCommandIr => ErrorKind::Invalid,
            RunnerError::Cancelled => ErrorKind::Cancelled,
            RunnerError::NonZeroExit(_) => ErrorKind::TaskFailed,
            RunnerError::Package(e) => e.kind(),
            RunnerError::Store(e) => e.kind(),
            RunnerError::Codec(_) => ErrorKind::Codec,
            RunnerError::Io(_) => ErrorKind::Storage,
        }
    }
}

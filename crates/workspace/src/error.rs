// SPDX-License-Identifier: MIT

use crate::lock::LockError;
use e3_core::{ErrorKind, HasErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace {0:?} not found")]
    NotFound(String),
    #[error("workspace {0:?} is not deployed")]
    NotDeployed(String),
    #[error("workspace {0:?} already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Package(#[from] e3_package::PackageError),
    #[error(transparent)]
    Tree(#[from] e3_store::TreeError),
    #[error(transparent)]
    Store(#[from] e3_store::StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed workspace state: {0}")]
    Codec(#[from] serde_json::Error),
}

impl HasErrorKind for WorkspaceError {
    fn kind(&self) -> ErrorKind {
        match self {
            WorkspaceError::NotFound(_) => ErrorKind::NotFound,
            WorkspaceError::NotDeployed(_) => ErrorKind::NotFound,
            WorkspaceError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            WorkspaceError::Lock(e) => e.kind(),
            WorkspaceError::Package(e) => e.kind(),
            WorkspaceError::Tree(e) => e.kind(),
            WorkspaceError::Store(e) => e.kind(),
            WorkspaceError::Io(_) => ErrorKind::Storage,
            WorkspaceError::Codec(_) => ErrorKind::Codec,
        }
    }
}

// SPDX-License-Identifier: MIT

use e3_core::{ErrorKind, HasErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("package not found: {0}")]
    NotFound(String),
    #[error("ambiguous package name {name:?}: {count} versions imported, specify name@version")]
    Ambiguous { name: String, count: usize },
    #[error(
        "package {name}@{version} already imported with hash {existing}, refusing to overwrite with {incoming} (pass force to override)"
    )]
    AlreadyExists {
        name: String,
        version: String,
        existing: e3_core::Hash,
        incoming: e3_core::Hash,
    },
    #[error("invalid package zip: {0}")]
    Invalid(String),
    #[error("zip entry {entry:?} hashes to {actual}, not its own name")]
    Integrity { entry: String, actual: e3_core::Hash },
    #[error(transparent)]
    InvalidHash(#[from] e3_core::hash::InvalidHash),
    #[error(transparent)]
    Store(#[from] e3_store::StoreError),
    #[error(transparent)]
    Tree(#[from] e3_store::TreeError),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed package object: {0}")]
    Codec(#[from] serde_json::Error),
}

impl HasErrorKind for PackageError {
    fn kind(&self) -> ErrorKind {
        match self {
            PackageError::NotFound(_) => ErrorKind::NotFound,
            PackageError::Ambiguous { .. } | PackageError::Invalid(_) => ErrorKind::Invalid,
            PackageError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            PackageError::Integrity { .. } => ErrorKind::Integrity,
            PackageError::InvalidHash(_) => ErrorKind::Invalid,
            PackageError::Store(e) => e.kind(),
            PackageError::Tree(e) => e.kind(),
            PackageError::Zip(_) | PackageError::Io(_) => ErrorKind::Storage,
            PackageError::Codec(_) => ErrorKind::Codec,
        }
    }
}

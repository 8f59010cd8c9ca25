// SPDX-License-Identifier: MIT

//! `DataRef`: the tagged variant referencing data in the object store, or
//! denoting unassigned/null inline.

use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to data at a tree location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataRef {
    /// Placeholder for a not-yet-computed task output.
    Unassigned,
    /// Inline null, chosen when the declared type is "null".
    Null,
    /// Reference to a value blob.
    Value { hash: Hash },
    /// Reference to a tree object.
    Tree { hash: Hash },
}

impl DataRef {
    pub fn unassigned() -> Self {
        DataRef::Unassigned
    }

    pub fn null() -> Self {
        DataRef::Null
    }

    pub fn value(hash: Hash) -> Self {
        DataRef::Value { hash }
    }

    pub fn tree(hash: Hash) -> Self {
        DataRef::Tree { hash }
    }

    /// The hash carried by `Value`/`Tree` refs, if any.
    pub fn hash(&self) -> Option<&Hash> {
        match self {
            DataRef::Value { hash } | DataRef::Tree { hash } => Some(hash),
            DataRef::Unassigned | DataRef::Null => None,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, DataRef::Unassigned)
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, DataRef::Tree { .. })
    }

    /// Status of the dataset this ref points at, without fetching the
    /// value.
    pub fn status(&self) -> DatasetStatus {
        match self {
            DataRef::Unassigned => DatasetStatus::Unassigned,
            DataRef::Null => DatasetStatus::Null,
            DataRef::Value { .. } => DatasetStatus::Computed,
            DataRef::Tree { .. } => DatasetStatus::Assigned,
        }
    }
}

impl fmt::Display for DataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRef::Unassigned => write!(f, "unassigned"),
            DataRef::Null => write!(f, "null"),
            DataRef::Value { hash } => write!(f, "value({})", hash.abbrev(12)),
            DataRef::Tree { hash } => write!(f, "tree({})", hash.abbrev(12)),
        }
    }
}

/// Coarse-grained status of a dataset, derived from its `DataRef` without
/// resolving the underlying blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    Assigned,
    Unassigned,
    Null,
    Computed,
}

#[cfg(test)]
#[path = "dataref_tests.rs"]
mod tests;

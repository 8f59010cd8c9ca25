// SPDX-License-Identifier: MIT

//! Tree paths: an ordered sequence of field segments identifying a
//! location in a data tree. Accepts both URL form (`/a/b/c`) and dotted
//! form (`a.b.c`); both parse to the same internal representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of field-name segments. The empty path is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TreePath(Vec<String>);

impl TreePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse either `/a/b/c` or `a.b.c` form.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return Self::root();
        }
        let sep: char = if s.contains('/') { '/' } else { '.' };
        let segments = s
            .trim_start_matches('/')
            .split(sep)
            .filter(|seg| !seg.is_empty())
            .map(|seg| seg.to_string())
            .collect();
        Self(segments)
    }

    pub fn push(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// The first segment and the remainder, if any.
    pub fn split_first(&self) -> Option<(&str, TreePath)> {
        self.0
            .split_first()
            .map(|(head, tail)| (head.as_str(), TreePath(tail.to_vec())))
    }

    /// The parent path and final segment, if this path isn't the root.
    pub fn split_last(&self) -> Option<(TreePath, &str)> {
        self.0
            .split_last()
            .map(|(last, init)| (TreePath(init.to_vec()), last.as_str()))
    }

    /// True iff `self` is a prefix of `other` (including equal paths).
    pub fn is_prefix_of(&self, other: &TreePath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// True iff `self` and `other` overlap: one is a prefix of the other
    /// (equal, ancestor, or descendant).
    pub fn overlaps(&self, other: &TreePath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    pub fn dotted(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "/{}", self.0.join("/"))
        }
    }
}

impl From<&str> for TreePath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl TryFrom<String> for TreePath {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Ok(Self::parse(&s))
    }
}

impl From<TreePath> for String {
    fn from(p: TreePath) -> Self {
        p.dotted()
    }
}

#[cfg(test)]
#[path = "treepath_tests.rs"]
mod tests;

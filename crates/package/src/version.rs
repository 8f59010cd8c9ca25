// SPDX-License-Identifier: MIT

//! Version string ordering for bare-name resolution (`spec.md` §4.D).
//!
//! "Lexicographic-compatible": dot-separated segments compare numerically
//! where every segment parses as an integer (so `2.9` < `2.10`), and fall
//! back to plain string comparison otherwise (so pre-release-ish strings
//! like `2.0.0-rc1` still order deterministically instead of panicking).

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Numeric(u64),
    Text(String),
}

/// A parsed, orderable version string. Keeps the original string for
/// display/round-tripping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('.')
            .map(|seg| match seg.parse::<u64>() {
                Ok(n) => Segment::Numeric(n),
                Err(_) => Segment::Text(seg.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        for pair in self.segments.iter().zip(other.segments.iter()) {
            let ord = match pair {
                (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
                (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
                // A numeric segment outranks a text segment at the same
                // position (`2.0` > `2.0-rc`), matching semver's rule
                // that a plain release outranks a pre-release tag.
                (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
                (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.segments.len().cmp(&other.segments.len())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;

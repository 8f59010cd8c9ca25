// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Content-addressed object store, the data-tree engine built on top of
//! it, and the mark-and-sweep garbage collector.

pub mod archive;
pub mod gc;
pub mod objects;
pub mod tree;

pub use archive::Parsed as ParsedArchive;
pub use gc::{GcOptions, GcReport};
pub use objects::{ObjectStore, StoreError};
pub use tree::{Tree, TreeEntry, TreeError};

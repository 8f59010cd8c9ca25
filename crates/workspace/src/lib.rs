// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Workspace directory management: deployed state, advisory locking, and
//! export (`spec.md` §4.E, §4.F).

pub mod error;
pub mod lock;
pub mod model;
pub mod store;

pub use error::WorkspaceError;
pub use lock::{current_holder, LockError, LockHandle, LockHolder, LockOperation, LockService, LockState};
pub use model::WorkspaceState;
pub use store::WorkspaceStore;

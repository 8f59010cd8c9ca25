// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use e3_core::Hash;
use serde::{Deserialize, Serialize};

/// Persistent state of a deployed workspace (`spec.md` §3). An
/// un-deployed workspace has no state file at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    pub package_name: String,
    pub package_version: String,
    pub package_hash: Hash,
    pub deployed_at: DateTime<Utc>,
    pub root_hash: Hash,
    pub root_updated_at: DateTime<Utc>,
}

// SPDX-License-Identifier: MIT

//! Repository location lookup (`spec.md` §6.4): explicit argument,
//! `$E3_REPO`, walking up from the current directory like a VCS, then
//! `~/.e3`. Grounded on the teacher's `oj_daemon::env::state_dir`
//! precedence (env var override, then an XDG-style default), generalized
//! with the cwd-ancestor walk `spec.md` additionally requires.

use crate::error::EngineError;
use crate::repo::Repo;
use std::path::{Path, PathBuf};

pub const E3_REPO_ENV: &str = "E3_REPO";

/// Resolve a repository location per the lookup order, without opening
/// it. `explicit` is a caller-supplied `--repo` style argument; an
/// explicit path or `$E3_REPO` must already be a valid repository, while
/// the cwd-ancestor walk and the `~/.e3` fallback are an exact match or
/// nothing.
pub fn discover(explicit: Option<&Path>) -> Result<PathBuf, EngineError> {
    if let Some(path) = explicit {
        return if Repo::is_valid(path) {
            Ok(path.to_path_buf())
        } else {
            Err(EngineError::InvalidRepo(path.to_path_buf()))
        };
    }

    if let Ok(env_path) = std::env::var(E3_REPO_ENV) {
        let path = PathBuf::from(env_path);
        return if Repo::is_valid(&path) {
            Ok(path)
        } else {
            Err(EngineError::InvalidRepo(path))
        };
    }

    if let Some(found) = walk_up_from_cwd()? {
        return Ok(found);
    }

    let home = dirs::home_dir().ok_or(EngineError::NoHomeDir)?;
    Ok(home.join(".e3"))
}

fn walk_up_from_cwd() -> Result<Option<PathBuf>, EngineError> {
    let mut dir = std::env::current_dir()?;
    loop {
        if Repo::is_valid(&dir) {
            return Ok(Some(dir));
        }
        if !dir.pop() {
            return Ok(None);
        }
    }
}

/// Resolve and open a repository, initializing the `~/.e3` fallback if
/// nothing else matched and it doesn't exist yet.
pub fn discover_and_open(explicit: Option<&Path>) -> Result<Repo, EngineError> {
    match discover(explicit) {
        Ok(path) if Repo::is_valid(&path) => Repo::open(path),
        Ok(path) => Repo::init(path),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;

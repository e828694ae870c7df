//! Loader for the followers list the run iterates over.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::model::UserRecord;

/// Read the ordered user list. A missing or unparsable file aborts the run.
pub fn load(path: &Path) -> Result<Vec<UserRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read followers file {}", path.display()))?;
    let users: Vec<UserRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid followers file {}", path.display()))?;
    Ok(users)
}

//! On-disk store of per-user chat archives.
//!
//! The presence of `<dir>/<name>.json` is the only record that a user has been
//! processed. Writes land in a temporary sibling first and are renamed into
//! place, so a crash mid-write never leaves a file that looks complete.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::model::ChatArchive;

#[derive(Debug, Clone)]
pub struct ArchiveStore {
    dir: PathBuf,
}

impl ArchiveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create output dir {}", self.dir.display()))
    }

    pub fn path_for(&self, display_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(display_name)))
    }

    /// Whether an archive is already on disk. Any error other than "not found"
    /// is returned, never read as absent.
    pub async fn exists(&self, display_name: &str) -> Result<bool> {
        let path = self.path_for(display_name);
        fs::try_exists(&path)
            .await
            .with_context(|| format!("failed to check {}", path.display()))
    }

    pub async fn write(&self, archive: &ChatArchive) -> Result<PathBuf> {
        let path = self.path_for(&archive.display_name);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(archive).context("failed to serialize archive")?;
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to move archive into {}", path.display()))?;
        Ok(path)
    }

    pub async fn read(&self, display_name: &str) -> Result<ChatArchive> {
        let path = self.path_for(display_name);
        let raw = fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("invalid archive {}", path.display()))
    }
}

/// File-safe form of a display name, one-to-one with its input. Separators,
/// characters rejected by common filesystems, `%` itself and a leading `.`
/// are percent-encoded byte by byte. The empty name becomes a lone `%`, which
/// no other name can produce.
fn file_stem(display_name: &str) -> String {
    if display_name.is_empty() {
        return "%".to_string();
    }
    let mut stem = String::with_capacity(display_name.len());
    for (i, c) in display_name.chars().enumerate() {
        let escape = matches!(c, '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            || c.is_control()
            || (i == 0 && c == '.');
        if escape {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                stem.push_str(&format!("%{:02X}", byte));
            }
        } else {
            stem.push(c);
        }
    }
    stem
}

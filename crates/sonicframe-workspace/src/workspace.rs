//! Sandboxed temp-file workspace (spec §4.9).
//!
//! All paths handed out are rooted under one directory; `delete_temp_file`
//! refuses anything that canonicalizes outside of it, the way a shared
//! scratch directory must if several stages are reading each other's
//! hand-off files by path.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{WorkspaceError, WorkspaceResult};

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct WorkspaceStats {
    pub total_files: u64,
    pub total_size_bytes: u64,
    pub old_files: u64,
    pub old_files_size_bytes: u64,
}

#[derive(Clone)]
pub struct TempWorkspace {
    root: PathBuf,
}

impl TempWorkspace {
    pub async fn new(root: impl Into<PathBuf>) -> WorkspaceResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn create_temp_file(&self, extension: &str) -> WorkspaceResult<PathBuf> {
        let name = format!("{}.{}", uuid::Uuid::new_v4(), extension.trim_start_matches('.'));
        let path = self.root.join(name);
        fs::File::create(&path).await?;
        Ok(path)
    }

    pub async fn create_temp_directory(&self) -> WorkspaceResult<PathBuf> {
        let path = self.root.join(uuid::Uuid::new_v4().to_string());
        fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// Idempotent: deleting a path that is already gone is not an error.
    /// Refuses to touch anything outside the sandbox root.
    pub async fn delete_temp_file(&self, path: impl AsRef<Path>) -> WorkspaceResult<()> {
        let path = path.as_ref();
        self.ensure_within_sandbox(path)?;
        match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {
                if let Err(e) = fs::remove_dir_all(path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(e.into());
                    }
                }
            }
            Ok(_) => {
                if let Err(e) = fs::remove_file(path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(e.into());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn ensure_within_sandbox(&self, path: &Path) -> WorkspaceResult<()> {
        // A path that doesn't exist yet can't be canonicalized; fall back
        // to a lexical prefix check in that case.
        let candidate = path
            .canonicalize()
            .unwrap_or_else(|_| self.root.join(path.file_name().unwrap_or_default()));
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        if !candidate.starts_with(&root) {
            return Err(WorkspaceError::OutsideSandbox(path.display().to_string()));
        }
        Ok(())
    }

    pub async fn stats(&self, old_age: chrono::Duration) -> WorkspaceResult<WorkspaceStats> {
        let now = Utc::now();
        let mut stats = WorkspaceStats::default();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                continue;
            }
            stats.total_files += 1;
            stats.total_size_bytes += meta.len();
            if is_older_than(&meta, now, old_age) {
                stats.old_files += 1;
                stats.old_files_size_bytes += meta.len();
            }
        }
        Ok(stats)
    }

    /// Evicts every file (not subdirectory) older than `max_age`. Returns
    /// the number of files removed.
    pub async fn cleanup_old_files(&self, max_age: chrono::Duration) -> WorkspaceResult<u64> {
        let now = Utc::now();
        let mut removed = 0u64;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                continue;
            }
            if is_older_than(&meta, now, max_age) {
                let path = entry.path();
                if let Err(e) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "failed to evict stale temp file");
                } else {
                    debug!(path = %path.display(), "evicted stale temp file");
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn is_older_than(meta: &std::fs::Metadata, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
    let Ok(modified) = meta.modified() else {
        return false;
    };
    let modified: DateTime<Utc> = modified.into();
    (now - modified) > max_age
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_root() -> (TempWorkspace, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ws = TempWorkspace::new(dir.path()).await.unwrap();
        (ws, dir)
    }

    #[tokio::test]
    async fn create_and_delete_temp_file_is_idempotent() {
        let (ws, _guard) = temp_root().await;
        let path = ws.create_temp_file("mp3").await.unwrap();
        assert!(path.exists());
        ws.delete_temp_file(&path).await.unwrap();
        assert!(!path.exists());
        // second delete of the same (now missing) path is not an error
        ws.delete_temp_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn delete_refuses_path_outside_sandbox() {
        let (ws, _guard) = temp_root().await;
        let outside = std::env::temp_dir().join("sonicframe-sandbox-escape-test");
        tokio::fs::write(&outside, b"x").await.unwrap();
        let result = ws.delete_temp_file(&outside).await;
        assert!(result.is_err());
        let _ = tokio::fs::remove_file(&outside).await;
    }

    #[tokio::test]
    async fn stats_counts_files_and_sizes() {
        let (ws, _guard) = temp_root().await;
        let path = ws.create_temp_file("bin").await.unwrap();
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let stats = ws.stats(chrono::Duration::hours(24)).await.unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_size_bytes, 10);
        assert_eq!(stats.old_files, 0);
    }

    #[tokio::test]
    async fn cleanup_old_files_removes_nothing_when_all_fresh() {
        let (ws, _guard) = temp_root().await;
        ws.create_temp_file("bin").await.unwrap();
        let removed = ws.cleanup_old_files(chrono::Duration::hours(24)).await.unwrap();
        assert_eq!(removed, 0);
    }
}

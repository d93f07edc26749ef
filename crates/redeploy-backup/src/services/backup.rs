use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use redeploy_core::UpdaterConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Directory inside a project that holds its snapshots
pub const BACKUP_DIR_NAME: &str = "backups";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Nothing to back up in {0}")]
    NothingToBackUp(PathBuf),
}

impl BackupError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One snapshot directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub created_at: NaiveDateTime,
    pub path: PathBuf,
}

/// Snapshots a project's configuration files and prunes old snapshots
#[derive(Debug, Clone)]
pub struct BackupManager {
    retention: usize,
    timestamp_format: String,
}

impl BackupManager {
    pub fn new(retention: usize, timestamp_format: impl Into<String>) -> Self {
        Self {
            retention,
            timestamp_format: timestamp_format.into(),
        }
    }

    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self::new(config.backup_retention, config.timestamp_format.clone())
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn backup_root(project_dir: &Path) -> PathBuf {
        project_dir.join(BACKUP_DIR_NAME)
    }

    /// Copy `files` (relative to `project_dir`) into a new timestamped
    /// directory, then prune older snapshots.
    ///
    /// The new snapshot always survives pruning, so a retention of 0 behaves
    /// like a retention of 1.
    pub async fn snapshot(
        &self,
        project_dir: &Path,
        files: &[PathBuf],
    ) -> Result<BackupRecord, BackupError> {
        if files.is_empty() {
            return Err(BackupError::NothingToBackUp(project_dir.to_path_buf()));
        }

        let now = Local::now();
        let root = Self::backup_root(project_dir);
        let target = unique_dir(&root, &now.format(&self.timestamp_format).to_string()).await;

        tokio::fs::create_dir_all(&target)
            .await
            .map_err(|e| BackupError::io(&target, e))?;

        for file in files {
            let source = project_dir.join(file);
            let Some(file_name) = file.file_name() else {
                continue;
            };
            let destination = target.join(file_name);
            if let Err(e) = tokio::fs::copy(&source, &destination).await {
                // Leave no half-written snapshot behind
                let _ = tokio::fs::remove_dir_all(&target).await;
                return Err(BackupError::io(&source, e));
            }
            debug!("Backed up {} to {}", source.display(), destination.display());
        }

        info!("Created backup {}", target.display());
        let record = BackupRecord {
            created_at: now.naive_local(),
            path: target,
        };

        match self
            .prune(project_dir, self.retention.max(1), Some(&record.path))
            .await
        {
            Ok(removed) if !removed.is_empty() => {
                info!("Pruned {} old backup(s)", removed.len());
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to prune old backups: {}", e),
        }

        Ok(record)
    }

    /// All snapshots of a project, most recent first
    pub async fn list(&self, project_dir: &Path) -> Result<Vec<BackupRecord>, BackupError> {
        let root = Self::backup_root(project_dir);
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&root)
            .await
            .map_err(|e| BackupError::io(&root, e))?;

        let mut dated = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackupError::io(&root, e))?
        {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping unreadable backup entry {}: {}", path.display(), e);
                    continue;
                }
            };
            if !metadata.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let (created_at, sequence) = match self.parse_name(&name) {
                Some(parsed) => parsed,
                None => match metadata.modified() {
                    Ok(modified) => (DateTime::<Local>::from(modified).naive_local(), 0),
                    Err(_) => (NaiveDateTime::MIN, 0),
                },
            };
            dated.push((sequence, BackupRecord { created_at, path }));
        }

        // Same timestamp: the higher collision suffix is the newer snapshot
        dated.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_seq.cmp(a_seq))
                .then_with(|| b.path.cmp(&a.path))
        });
        let records = dated.into_iter().map(|(_, record)| record).collect();
        Ok(records)
    }

    /// Delete all but the newest `keep` snapshots; `protect` is never removed
    /// and counts toward `keep`. Returns the removed directories.
    pub async fn prune(
        &self,
        project_dir: &Path,
        keep: usize,
        protect: Option<&Path>,
    ) -> Result<Vec<PathBuf>, BackupError> {
        let mut records = self.list(project_dir).await?;
        // Stable sort: protected snapshot first, the rest stay newest first
        records.sort_by_key(|record| Some(record.path.as_path()) != protect);

        let mut removed = Vec::new();
        for record in records.into_iter().skip(keep) {
            if Some(record.path.as_path()) == protect {
                continue;
            }
            match tokio::fs::remove_dir_all(&record.path).await {
                Ok(()) => {
                    debug!("Removed old backup {}", record.path.display());
                    removed.push(record.path);
                }
                Err(e) => warn!("Failed to remove backup {}: {}", record.path.display(), e),
            }
        }

        Ok(removed)
    }

    /// Timestamp and collision suffix of a snapshot directory name
    fn parse_name(&self, name: &str) -> Option<(NaiveDateTime, u32)> {
        if let Some(created_at) = self.parse_stamp(name) {
            return Some((created_at, 0));
        }
        let (base, suffix) = name.rsplit_once('-')?;
        let sequence = suffix.parse::<u32>().ok()?;
        self.parse_stamp(base).map(|created_at| (created_at, sequence))
    }

    // Date-only formats render midnight
    fn parse_stamp(&self, value: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value, &self.timestamp_format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, &self.timestamp_format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }
}

/// Directory for a new snapshot named `name`. Collisions get a `-N` suffix one
/// above the highest already present, so a pruned name is never handed out
/// again.
async fn unique_dir(root: &Path, name: &str) -> PathBuf {
    let prefix = format!("{}-", name);
    let mut highest: Option<u32> = None;

    if let Ok(mut entries) = tokio::fs::read_dir(root).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let entry_name = entry.file_name().to_string_lossy().to_string();
            let sequence = if entry_name == name {
                Some(0)
            } else {
                entry_name
                    .strip_prefix(&prefix)
                    .and_then(|suffix| suffix.parse::<u32>().ok())
            };
            highest = highest.max(sequence);
        }
    }

    match highest {
        None => root.join(name),
        Some(sequence) => root.join(format!("{}-{}", name, sequence + 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_with_collision_suffix() {
        let manager = BackupManager::new(3, "%Y%m%d_%H%M%S");
        let (plain, plain_seq) = manager.parse_name("20240105_101500").unwrap();
        let (suffixed, suffixed_seq) = manager.parse_name("20240105_101500-2").unwrap();
        assert_eq!(plain, suffixed);
        assert_eq!(plain_seq, 0);
        assert_eq!(suffixed_seq, 2);
        assert!(manager.parse_name("notes").is_none());
    }

    #[test]
    fn test_parse_name_with_date_only_format() {
        let manager = BackupManager::new(3, "%Y%m%d");
        let (day, sequence) = manager.parse_name("20240105-11").unwrap();
        assert_eq!(
            day,
            NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(sequence, 11);
    }

    #[tokio::test]
    async fn test_unique_dir_appends_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("stamp")).unwrap();
        std::fs::create_dir(dir.path().join("stamp-1")).unwrap();
        assert_eq!(unique_dir(dir.path(), "stamp").await, dir.path().join("stamp-2"));
        assert_eq!(unique_dir(dir.path(), "other").await, dir.path().join("other"));
    }

    #[tokio::test]
    async fn test_unique_dir_skips_past_pruned_names() {
        let dir = tempfile::tempdir().unwrap();
        // "stamp" and "stamp-1" were pruned already
        std::fs::create_dir(dir.path().join("stamp-3")).unwrap();
        std::fs::create_dir(dir.path().join("stamp-2")).unwrap();
        std::fs::create_dir(dir.path().join("stampede")).unwrap();
        assert_eq!(unique_dir(dir.path(), "stamp").await, dir.path().join("stamp-4"));
    }
}

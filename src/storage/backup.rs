//! Rotating file-copy backups of the database
//!
//! A backup is a plain copy of the database file named
//! `ai_study_advisor_backup_<YYYYmmdd_HHMMSS_ffffff>.db`. The timestamp is fixed
//! width, so sorting names sorts backups oldest to newest. Only the newest
//! [`DEFAULT_KEEP`] are retained.
//!
//! Where backups go is decided by a [`BackupLocation`]: either probing an ordered list
//! of candidate directories, or one fixed directory.

use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use crate::Result;
use super::SqliteStore;

/// File name prefix shared by every backup
pub const BACKUP_PREFIX: &str = "ai_study_advisor_backup_";

/// Number of backups kept after rotation
pub const DEFAULT_KEEP: usize = 5;

const PROBE_FILE: &str = "test_write";

/// In-flight copies carry this extension until complete, so rotation never counts them
const PARTIAL_EXTENSION: &str = "db.partial";

/// Decides which directory the next backup is written to
pub trait BackupLocation: Send + Sync {
    /// A writable directory, or `None` when no usable directory exists
    fn resolve(&self) -> Option<PathBuf>;
}

/// Walks candidate directories in order and picks the first one that accepts a test write
#[derive(Debug, Clone)]
pub struct ProbedLocation {
    candidates: Vec<PathBuf>,
}

impl ProbedLocation {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// The standard candidates: the persistent directory, next to the database, then the working directory
    pub fn for_database(persistent_dir: &Path, db_path: &Path) -> Self {
        let mut candidates = vec![persistent_dir.join("backups")];
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            candidates.push(parent.join("backups"));
        }
        candidates.push(PathBuf::from("./backups"));
        candidates.dedup();
        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }
}

impl BackupLocation for ProbedLocation {
    fn resolve(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find(|dir| match probe_writable(dir) {
                Ok(()) => {
                    tracing::debug!("Using backup directory: {}", dir.display());
                    true
                }
                Err(e) => {
                    tracing::warn!("Cannot use backup directory {}: {}", dir.display(), e);
                    false
                }
            })
            .cloned()
    }
}

/// Always uses one configured directory, creating it if needed
#[derive(Debug, Clone)]
pub struct FixedLocation {
    dir: PathBuf,
}

impl FixedLocation {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BackupLocation for FixedLocation {
    fn resolve(&self) -> Option<PathBuf> {
        match fs::create_dir_all(&self.dir) {
            Ok(()) => Some(self.dir.clone()),
            Err(e) => {
                tracing::warn!("Cannot use backup directory {}: {}", self.dir.display(), e);
                None
            }
        }
    }
}

/// Create the directory and check it accepts a write
fn probe_writable(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let probe = dir.join(PROBE_FILE);
    fs::write(&probe, b"test")?;
    fs::remove_file(&probe)
}

/// Takes backups and rotates old ones away
pub struct BackupManager {
    location: Box<dyn BackupLocation>,
    keep: usize,
}

impl BackupManager {
    pub fn new(location: Box<dyn BackupLocation>) -> Self {
        Self { location, keep: DEFAULT_KEEP }
    }

    /// Best-effort backup: failures are logged, never returned.
    ///
    /// Returns the path of the new backup when one was written.
    pub fn create_backup(&self, store: &SqliteStore) -> Option<PathBuf> {
        match self.try_create_backup(store) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Backup creation failed: {}", e);
                None
            }
        }
    }

    /// Copy the database into the resolved directory and prune old copies
    pub fn try_create_backup(&self, store: &SqliteStore) -> Result<Option<PathBuf>> {
        let Some(dir) = self.location.resolve() else {
            tracing::warn!("No writable backup directory found");
            return Ok(None);
        };

        if let Err(e) = store.checkpoint() {
            tracing::warn!("WAL checkpoint before backup failed: {}", e);
        }

        let target = dir.join(backup_file_name(Utc::now()));
        let partial = target.with_extension(PARTIAL_EXTENSION);
        if let Err(e) = fs::copy(store.path(), &partial) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        fs::rename(&partial, &target)?;
        tracing::info!("Database backup created: {}", target.display());

        let removed = prune_backups(&dir, self.keep)?;
        if removed > 0 {
            tracing::debug!("Removed {} old backup(s) from {}", removed, dir.display());
        }

        Ok(Some(target))
    }
}

/// Backup file name for a point in time
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{}{}.db", BACKUP_PREFIX, at.format("%Y%m%d_%H%M%S_%6f"))
}

/// Backups in `dir`, oldest first
pub fn list_backups(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}*.db",
        glob::Pattern::escape(&dir.to_string_lossy()),
        BACKUP_PREFIX
    );
    let mut backups: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    backups.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(backups)
}

/// Delete all but the newest `keep` backups in `dir`, returning how many were removed
pub fn prune_backups(dir: &Path, keep: usize) -> Result<usize> {
    let backups = list_backups(dir)?;
    let excess = backups.len().saturating_sub(keep);
    for old in &backups[..excess] {
        fs::remove_file(old)?;
    }
    Ok(excess)
}

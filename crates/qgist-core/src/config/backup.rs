//! Numbered backups next to the live config file.
//!
//! # Disk layout
//!
//! ```text
//! pluginmanager.json         live document
//! pluginmanager.json.bak.1   newest snapshot
//! pluginmanager.json.bak.2
//! ...
//! pluginmanager.json.bak.N   oldest snapshot (N = max_backups)
//! ```
//!
//! A save stages the new document in `<file>.tmp`, then commits it:
//! shift `bak.k → bak.k+1` from the top down, move the live file to `bak.1`,
//! and move the staged file over the live one. Every rename is journaled;
//! if any step fails the journal is replayed backwards, so the live file and
//! the chain end up exactly as they were.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::options::Rotation;
use crate::error::{ConfigError, Result};

/// One backup file found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backup {
    /// Position in the chain, `1` being the newest.
    pub index: usize,
    pub path: PathBuf,
}

/// Backup chain of a single live file.
#[derive(Clone, Debug)]
pub struct BackupSet {
    live: PathBuf,
    max_backups: usize,
    rotation: Rotation,
}

impl BackupSet {
    pub fn new(live: impl Into<PathBuf>, max_backups: usize, rotation: Rotation) -> Self {
        Self {
            live: live.into(),
            max_backups,
            rotation,
        }
    }

    /// Path of backup slot `index` (`<file>.bak.<index>`).
    pub fn slot(&self, index: usize) -> PathBuf {
        self.sibling(&format!("bak.{index}"))
    }

    /// Path used to stage a new document before it is committed.
    pub fn staging_path(&self) -> PathBuf {
        self.sibling("tmp")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.live.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(suffix);
        self.live.with_file_name(name)
    }

    /// Existing backups, newest first. Includes slots beyond the current
    /// limit left over from an earlier, larger `max_backups`.
    pub fn list(&self) -> Result<Vec<Backup>> {
        let dir = parent_dir(&self.live);
        let Some(file_name) = self.live.file_name().and_then(|n| n.to_str()) else {
            return Ok(Vec::new());
        };
        let prefix = format!("{file_name}.bak.");

        let entries = fs::read_dir(dir).map_err(|e| ConfigError::io(dir, e))?;
        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::io(dir, e))?;
            let name = entry.file_name();
            let Some(index) = name
                .to_str()
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|n| n.parse::<usize>().ok())
            else {
                continue;
            };
            if index > 0 && entry.path().is_file() {
                backups.push(Backup {
                    index,
                    path: entry.path(),
                });
            }
        }
        backups.sort_by_key(|b| b.index);
        Ok(backups)
    }

    /// Delete every backup. Returns how many files were removed.
    pub fn prune(&self) -> Result<usize> {
        let backups = self.list()?;
        for backup in &backups {
            fs::remove_file(&backup.path).map_err(|e| ConfigError::io(&backup.path, e))?;
        }
        info!("Removed {} backup(s) of {}", backups.len(), self.live.display());
        Ok(backups.len())
    }

    /// Rotate the chain and move `staged` over the live file.
    ///
    /// On failure every rename already performed is undone; `staged` is left
    /// in place for the caller to clean up.
    pub fn commit(&self, staged: &Path) -> Result<()> {
        let mut journal = Journal::default();
        match self.rotate_and_replace(staged, &mut journal) {
            Ok(()) => {
                journal.finish();
                Ok(())
            }
            Err(e) => {
                journal.rollback();
                Err(e)
            }
        }
    }

    fn rotate_and_replace(&self, staged: &Path, journal: &mut Journal) -> Result<()> {
        if self.live.exists() && self.max_backups > 0 {
            let oldest = self.slot(self.max_backups);
            if oldest.exists() {
                match self.rotation {
                    Rotation::Strict => {
                        return Err(ConfigError::Backup {
                            path: self.live.clone(),
                            reason: format!(
                                "too many old backups (limit {})",
                                self.max_backups
                            ),
                        });
                    }
                    Rotation::EvictOldest => {
                        let evicted = self.sibling("bak.evicted");
                        journal.rename(&oldest, &evicted).map_err(|e| self.backup_error(e))?;
                        journal.evicted = Some(evicted);
                        debug!("Evicting oldest backup {}", oldest.display());
                    }
                }
            }

            for index in (1..self.max_backups).rev() {
                let from = self.slot(index);
                if from.exists() {
                    journal
                        .rename(&from, &self.slot(index + 1))
                        .map_err(|e| self.backup_error(e))?;
                }
            }

            journal
                .rename(&self.live, &self.slot(1))
                .map_err(|e| self.backup_error(e))?;
        }

        journal
            .rename(staged, &self.live)
            .map_err(|e| ConfigError::io(&self.live, e))?;
        Ok(())
    }

    fn backup_error(&self, e: std::io::Error) -> ConfigError {
        ConfigError::Backup {
            path: self.live.clone(),
            reason: e.to_string(),
        }
    }
}

/// Parent directory of `path`, treating a bare file name as `.`.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// ─────────────────────────────────────────────
// Rename journal
// ─────────────────────────────────────────────

#[derive(Default)]
struct Journal {
    renames: Vec<(PathBuf, PathBuf)>,
    evicted: Option<PathBuf>,
}

impl Journal {
    fn rename(&mut self, from: &Path, to: &Path) -> std::io::Result<()> {
        fs::rename(from, to)?;
        self.renames.push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    fn rollback(self) {
        for (from, to) in self.renames.into_iter().rev() {
            if let Err(e) = fs::rename(&to, &from) {
                warn!(
                    "Rollback failed: could not move {} back to {}: {}",
                    to.display(),
                    from.display(),
                    e
                );
            }
        }
        debug!("Backup rotation rolled back");
    }

    fn finish(self) {
        if let Some(evicted) = self.evicted {
            if let Err(e) = fs::remove_file(&evicted) {
                warn!("Failed to remove evicted backup {}: {}", evicted.display(), e);
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    /// Stage `content` and commit it, the way the store saves.
    fn save(set: &BackupSet, content: &str) -> Result<()> {
        let staged = set.staging_path();
        fs::write(&staged, content).unwrap();
        let result = set.commit(&staged);
        if result.is_err() {
            let _ = fs::remove_file(&staged);
        }
        result
    }

    #[test]
    fn test_slot_names() {
        let set = BackupSet::new("/tmp/qgist/pluginmanager.json", 3, Rotation::Strict);
        assert_eq!(set.slot(2), PathBuf::from("/tmp/qgist/pluginmanager.json.bak.2"));
        assert_eq!(set.staging_path(), PathBuf::from("/tmp/qgist/pluginmanager.json.tmp"));
    }

    #[test]
    fn test_first_commit_creates_live_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 3, Rotation::Strict);

        save(&set, "v1").unwrap();
        assert_eq!(read(&live), "v1");
        assert!(set.list().unwrap().is_empty());
        assert!(!set.staging_path().exists());
    }

    #[test]
    fn test_rotation_shifts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 3, Rotation::Strict);

        for version in ["v1", "v2", "v3", "v4"] {
            save(&set, version).unwrap();
        }

        assert_eq!(read(&live), "v4");
        assert_eq!(read(&set.slot(1)), "v3");
        assert_eq!(read(&set.slot(2)), "v2");
        assert_eq!(read(&set.slot(3)), "v1");
        let indices: Vec<usize> = set.list().unwrap().iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_strict_rotation_fails_when_full_and_leaves_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 2, Rotation::Strict);

        for version in ["v1", "v2", "v3"] {
            save(&set, version).unwrap();
        }

        let err = save(&set, "v4").unwrap_err();
        assert!(matches!(err, ConfigError::Backup { .. }));
        assert!(err.to_string().contains("too many old backups"));
        assert_eq!(read(&live), "v3");
        assert_eq!(read(&set.slot(1)), "v2");
        assert_eq!(read(&set.slot(2)), "v1");
        assert!(!set.slot(3).exists());
    }

    #[test]
    fn test_evict_oldest_drops_last_slot() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 2, Rotation::EvictOldest);

        for version in ["v1", "v2", "v3", "v4"] {
            save(&set, version).unwrap();
        }

        assert_eq!(read(&live), "v4");
        assert_eq!(read(&set.slot(1)), "v3");
        assert_eq!(read(&set.slot(2)), "v2");
        assert_eq!(set.list().unwrap().len(), 2);
        assert!(!set.sibling("bak.evicted").exists());
    }

    #[test]
    fn test_zero_backups_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 0, Rotation::Strict);

        save(&set, "v1").unwrap();
        save(&set, "v2").unwrap();
        assert_eq!(read(&live), "v2");
        assert!(set.list().unwrap().is_empty());
    }

    #[test]
    fn test_gaps_in_chain_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 4, Rotation::Strict);
        fs::write(&live, "live").unwrap();
        fs::write(set.slot(2), "old").unwrap();

        save(&set, "new").unwrap();
        assert_eq!(read(&live), "new");
        assert_eq!(read(&set.slot(1)), "live");
        assert_eq!(read(&set.slot(3)), "old");
        assert!(!set.slot(2).exists());
    }

    #[test]
    fn test_failed_final_rename_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 3, Rotation::Strict);
        save(&set, "v1").unwrap();
        save(&set, "v2").unwrap();

        // A staged path that does not exist makes the last rename fail.
        let err = set.commit(&dir.path().join("missing.tmp")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(read(&live), "v2");
        assert_eq!(read(&set.slot(1)), "v1");
        assert!(!set.slot(2).exists());
    }

    #[test]
    fn test_failed_commit_after_eviction_restores_oldest_slot() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 2, Rotation::EvictOldest);
        for version in ["v1", "v2", "v3"] {
            save(&set, version).unwrap();
        }

        let err = set.commit(&dir.path().join("missing.tmp")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(read(&live), "v3");
        assert_eq!(read(&set.slot(1)), "v2");
        assert_eq!(read(&set.slot(2)), "v1");
        assert!(!set.sibling("bak.evicted").exists());
    }

    #[test]
    fn test_list_ignores_unrelated_files_and_includes_stale_slots() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("config.json");
        let set = BackupSet::new(&live, 2, Rotation::Strict);
        fs::write(set.slot(1), "a").unwrap();
        fs::write(set.slot(7), "b").unwrap();
        fs::write(dir.path().join("config.json.bak.x"), "c").unwrap();
        fs::write(dir.path().join("other.json.bak.1"), "d").unwrap();

        let indices: Vec<usize> = set.list().unwrap().iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![1, 7]);

        assert_eq!(set.prune().unwrap(), 2);
        assert!(set.list().unwrap().is_empty());
        assert!(dir.path().join("other.json.bak.1").exists());
    }

    #[test]
    fn test_parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("config.json")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/etc/config.json")), Path::new("/etc"));
    }
}

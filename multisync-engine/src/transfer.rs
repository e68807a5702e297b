//! Transfer executor: folder creation, copy-into-missing and update-stale.
//!
//! ## `update` sequence
//!
//! 1. Back up the stale destination through the [`BackupPolicy`].
//!    A failed backup aborts before the destination is touched.
//! 2. With `atomic_replace` (default): copy the newest file to
//!    `<dest>.multisync.tmp` (clearing a leftover one first), then rename it
//!    over `dest`. A failed copy or rename removes the tmp file and leaves
//!    `dest` as it was.
//! 3. Without it: remove `dest`, then copy the newest file in.
//!
//! In dry-run mode every operation succeeds without touching the disk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use multisync_core::RootId;

use crate::error::TransferError;
use crate::fs::FileSystem;

/// Suffix of the temporary sibling used for atomic replacement.
pub const TMP_SUFFIX: &str = ".multisync.tmp";

/// The stale file about to be replaced.
#[derive(Debug, Clone, Copy)]
pub struct BackupTarget<'a> {
    pub root: RootId,
    /// Path relative to the root, e.g. `docs/report.odt`.
    pub relative: &'a Path,
    pub path: &'a Path,
}

/// Hook run before a stale destination is replaced.
pub trait BackupPolicy: Send + Sync {
    fn backup(&self, fs: &dyn FileSystem, target: BackupTarget<'_>) -> Result<(), TransferError>;
}

/// Takes no backup and always reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackup;

impl BackupPolicy for NoBackup {
    fn backup(&self, _fs: &dyn FileSystem, _target: BackupTarget<'_>) -> Result<(), TransferError> {
        Ok(())
    }
}

/// Copies stale files to `<dir>/<run stamp>/<root id>/<relative path>`.
///
/// The stamp has millisecond resolution. An existing backup is never
/// overwritten: the backup, and with it the update, fails instead.
#[derive(Debug, Clone)]
pub struct DirectoryBackup {
    run_dir: PathBuf,
}

impl DirectoryBackup {
    pub fn new(dir: impl Into<PathBuf>, started_at: DateTime<Utc>) -> Self {
        let stamp = started_at.format("%Y%m%dT%H%M%S%.3f").to_string();
        Self {
            run_dir: dir.into().join(stamp),
        }
    }

    pub fn location(&self, target: BackupTarget<'_>) -> PathBuf {
        self.run_dir
            .join(target.root.0.to_string())
            .join(target.relative)
    }
}

impl BackupPolicy for DirectoryBackup {
    fn backup(&self, fs: &dyn FileSystem, target: BackupTarget<'_>) -> Result<(), TransferError> {
        let location = self.location(target);
        let wrap = |source| TransferError::Backup {
            path: target.path.to_path_buf(),
            source,
        };
        if let Some(parent) = location.parent() {
            fs.create_dir_all(parent).map_err(wrap)?;
        }
        fs.copy(target.path, &location).map_err(wrap)?;
        tracing::debug!("backed up {} to {}", target.path.display(), location.display());
        Ok(())
    }
}

pub struct TransferExecutor<'a> {
    fs: &'a dyn FileSystem,
    backup: Box<dyn BackupPolicy + 'a>,
    atomic_replace: bool,
    dry_run: bool,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self {
            fs,
            backup: Box::new(NoBackup),
            atomic_replace: true,
            dry_run: false,
        }
    }

    pub fn with_backup(mut self, backup: impl BackupPolicy + 'a) -> Self {
        self.backup = Box::new(backup);
        self
    }

    pub fn atomic_replace(mut self, enabled: bool) -> Self {
        self.atomic_replace = enabled;
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn create_dir(&self, path: &Path) -> Result<(), TransferError> {
        if self.dry_run {
            return Ok(());
        }
        self.fs
            .create_dir(path)
            .map_err(|source| TransferError::CreateDir {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Copy `source` into a root that does not have the file yet.
    pub fn copy(&self, source: &Path, dest: &Path) -> Result<(), TransferError> {
        if self.dry_run {
            return Ok(());
        }
        self.fs.copy(source, dest).map_err(|e| copy_err(source, dest, e))
    }

    /// Replace the stale file at `target.path` with `source`.
    pub fn update(&self, source: &Path, target: BackupTarget<'_>) -> Result<(), TransferError> {
        if self.dry_run {
            return Ok(());
        }
        self.backup.backup(self.fs, target)?;

        let dest = target.path;
        if self.atomic_replace {
            return self.replace_via_tmp(source, dest);
        }

        self.fs
            .remove_file(dest)
            .map_err(|source| TransferError::Remove {
                path: dest.to_path_buf(),
                source,
            })?;
        self.fs.copy(source, dest).map_err(|e| copy_err(source, dest, e))
    }

    fn replace_via_tmp(&self, source: &Path, dest: &Path) -> Result<(), TransferError> {
        let tmp = tmp_path(dest);
        if let Ok(Some(_)) = self.fs.stat(&tmp) {
            tracing::debug!("removing leftover {}", tmp.display());
            let _ = self.fs.remove_file(&tmp);
        }
        if let Err(e) = self.fs.copy(source, &tmp) {
            let _ = self.fs.remove_file(&tmp);
            return Err(copy_err(source, &tmp, e));
        }
        if let Err(source) = self.fs.rename(&tmp, dest) {
            let _ = self.fs.remove_file(&tmp);
            return Err(TransferError::Replace {
                path: dest.to_path_buf(),
                source,
            });
        }
        Ok(())
    }
}

/// `<dest>.multisync.tmp` next to `dest`.
pub fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(TMP_SUFFIX);
    dest.with_file_name(name)
}

fn copy_err(from: &Path, to: &Path, source: std::io::Error) -> TransferError {
    TransferError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}

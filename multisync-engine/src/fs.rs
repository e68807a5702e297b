//! Filesystem seam used by the builder, the merge walk and the transfer executor.
//!
//! [`LocalFs`] is the production implementation. Tests wrap it to inject
//! failures for specific paths.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::SystemTime;

use filetime::FileTime;

/// One name returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: OsString,
    pub is_dir: bool,
}

/// What the merge walk needs to know about an existing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub is_dir: bool,
    pub modified: SystemTime,
    pub len: u64,
}

/// Primitive filesystem operations.
///
/// `stat` returns `Ok(None)` when nothing exists at the path. Symlinks are
/// followed, so a link to a directory lists and merges like a directory.
pub trait FileSystem: Send + Sync {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;
    fn stat(&self, path: &Path) -> io::Result<Option<Stat>>;
    fn create_dir(&self, path: &Path) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Copy file contents and carry the source's modification time over.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] when `to` exists; callers
    /// that replace a file remove or rename around it themselves.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            // `metadata` follows symlinks; a dangling link is listed as a file.
            let is_dir = std::fs::metadata(&path)
                .map(|m| m.is_dir())
                .unwrap_or(false);
            entries.push(DirEntry {
                name: entry.file_name(),
                is_dir,
            });
        }
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> io::Result<Option<Stat>> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(Some(Stat {
                is_dir: meta.is_dir(),
                modified: meta.modified()?,
                len: meta.len(),
            })),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let meta = std::fs::metadata(from)?;
        let mut reader = File::open(from)?;
        let mut writer = OpenOptions::new().write(true).create_new(true).open(to)?;
        let written = io::copy(&mut reader, &mut writer)
            .and_then(|_| writer.set_permissions(meta.permissions()))
            .and_then(|_| writer.sync_all());
        drop(writer);
        if let Err(err) = written {
            let _ = std::fs::remove_file(to);
            return Err(err);
        }
        filetime::set_file_mtime(to, FileTime::from_last_modification_time(&meta))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::set_file_mtime;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn stat_missing_path_is_none() {
        let tmp = TempDir::new().unwrap();
        let stat = LocalFs.stat(&tmp.path().join("nope")).unwrap();
        assert!(stat.is_none());
    }

    #[test]
    fn list_reports_dirs_and_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();

        let mut entries = LocalFs.list(tmp.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![
                DirEntry { name: "a.txt".into(), is_dir: false },
                DirEntry { name: "sub".into(), is_dir: true },
            ]
        );
    }

    #[test]
    fn copy_preserves_source_mtime() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.txt");
        let dst = tmp.path().join("dst.txt");
        fs::write(&src, "payload").unwrap();
        let old = FileTime::from_unix_time(1_000_000, 0);
        set_file_mtime(&src, old).unwrap();

        LocalFs.copy(&src, &dst).unwrap();

        let meta = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), old);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
    }

    #[test]
    fn copy_never_overwrites_an_existing_file() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("older.txt");
        let dst = tmp.path().join("newer.txt");
        fs::write(&src, "older").unwrap();
        fs::write(&dst, "newer").unwrap();

        let err = LocalFs.copy(&src, &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "newer");
    }
}

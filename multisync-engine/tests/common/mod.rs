#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use filetime::{set_file_mtime, FileTime};
use multisync_core::{Root, SyncOptions};
use multisync_engine::fs::{DirEntry, FileSystem, LocalFs, Stat};
use multisync_engine::{run_with, ExclusionPolicy, NoExclusions, OutcomeEvent, RunReport};
use tempfile::TempDir;

/// Arbitrary fixed base so test mtimes are far from "now".
pub const BASE: i64 = 1_600_000_000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `n` empty root directories named `r0`, `r1`, ... with ids `0..n`.
pub fn roots(n: u32) -> (TempDir, Vec<Root>) {
    init_logging();
    let tmp = TempDir::new().expect("tempdir");
    let roots = (0..n)
        .map(|i| {
            let path = tmp.path().join(format!("r{i}"));
            fs::create_dir_all(&path).expect("create root");
            Root::new(i, path)
        })
        .collect();
    (tmp, roots)
}

/// Write `content` at `rel` under `root` with mtime `BASE + secs`.
pub fn put(root: &Root, rel: &str, content: &str, secs: i64) -> PathBuf {
    let path = root.path.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, content).expect("write file");
    set_file_mtime(&path, FileTime::from_unix_time(BASE + secs, 0)).expect("set mtime");
    path
}

pub fn read(root: &Root, rel: &str) -> String {
    fs::read_to_string(root.path.join(rel)).expect("read file")
}

pub fn mtime(path: &Path) -> i64 {
    let meta = fs::metadata(path).expect("metadata");
    FileTime::from_last_modification_time(&meta).unix_seconds()
}

/// Relative path -> file content (`None` for directories) of everything under `dir`.
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Option<Vec<u8>>>) {
        for entry in fs::read_dir(dir).expect("read_dir") {
            let path = entry.expect("entry").path();
            let rel = path.strip_prefix(base).expect("prefix").to_path_buf();
            if path.is_dir() {
                out.insert(rel, None);
                walk(base, &path, out);
            } else {
                out.insert(rel, Some(fs::read(&path).expect("read")));
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(dir, dir, &mut out);
    out
}

pub fn sync(roots: &[Root], options: &SyncOptions) -> (Vec<OutcomeEvent>, RunReport) {
    sync_on(&LocalFs, roots, &NoExclusions, options)
}

pub fn sync_on(
    fs: &dyn FileSystem,
    roots: &[Root],
    policy: &dyn ExclusionPolicy,
    options: &SyncOptions,
) -> (Vec<OutcomeEvent>, RunReport) {
    let mut events = Vec::new();
    let report = run_with(fs, roots, policy, options, &mut events).expect("run");
    (events, report)
}

/// Local filesystem that refuses `create_dir` or `list` for chosen paths and
/// logs every mutating call.
#[derive(Default)]
pub struct ScriptedFs {
    pub refuse_mkdir: Vec<PathBuf>,
    pub refuse_list: Vec<PathBuf>,
    pub log: Mutex<Vec<String>>,
}

impl ScriptedFs {
    pub fn refusing_mkdir(path: impl Into<PathBuf>) -> Self {
        Self {
            refuse_mkdir: vec![path.into()],
            ..Self::default()
        }
    }

    pub fn refusing_list(path: impl Into<PathBuf>) -> Self {
        Self {
            refuse_list: vec![path.into()],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().expect("log lock").clone()
    }

    fn record(&self, call: String) {
        self.log.lock().expect("log lock").push(call);
    }
}

impl FileSystem for ScriptedFs {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        if self.refuse_list.iter().any(|p| p == dir) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"));
        }
        LocalFs.list(dir)
    }

    fn stat(&self, path: &Path) -> io::Result<Option<Stat>> {
        LocalFs.stat(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        self.record(format!("mkdir {}", path.display()));
        if self.refuse_mkdir.iter().any(|p| p == path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"));
        }
        LocalFs.create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        LocalFs.create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.record(format!("copy {} {}", from.display(), to.display()));
        LocalFs.copy(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.record(format!("remove {}", path.display()));
        LocalFs.remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.record(format!("rename {} {}", from.display(), to.display()));
        LocalFs.rename(from, to)
    }
}

//! Shared run entrypoint used by the worker and the CLI.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use multisync_core::{Profile, Root, RootId, SyncOptions};

use crate::builder::TreeBuilder;
use crate::error::EngineError;
use crate::event::{EventKind, EventSink, OutcomeEvent};
use crate::exclusion::{ExclusionPolicy, RuleSetPolicy};
use crate::frontier::Frontier;
use crate::fs::{FileSystem, LocalFs};
use crate::merge::MergeEngine;
use crate::transfer::{DirectoryBackup, TransferExecutor};

/// Aggregate of one run, derived from the same events the sink received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: Option<DateTime<Utc>>,
    /// Entries the exclusion policy dropped.
    pub skipped: usize,
    /// Names that are a file in some roots and a directory in others.
    pub conflicts: usize,
    pub folders_created: usize,
    pub files_copied: usize,
    pub files_updated: usize,
    /// Events reported with `success = false`.
    pub failures: usize,
    /// Entries in the built tree.
    pub entries: usize,
    /// Configured roots that were not on disk when the run started.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable_roots: Vec<RootId>,
    pub dry_run: bool,
    pub duration_ms: u64,
}

impl RunReport {
    /// No operation failed.
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }

    /// Successful creations, copies and updates.
    pub fn changes(&self) -> usize {
        self.folders_created + self.files_copied + self.files_updated
    }
}

/// Forwards events while counting them into a report.
struct Tally<'s> {
    inner: &'s mut dyn EventSink,
    report: RunReport,
}

impl EventSink for Tally<'_> {
    fn emit(&mut self, event: OutcomeEvent) {
        if !event.success {
            self.report.failures += 1;
        } else {
            match event.kind {
                EventKind::FolderCreated => self.report.folders_created += 1,
                EventKind::FileCopied => self.report.files_copied += 1,
                EventKind::FileUpdated => self.report.files_updated += 1,
            }
        }
        self.inner.emit(event);
    }
}

/// Mirror `roots` on the local filesystem.
pub fn run(
    roots: &[Root],
    policy: &dyn ExclusionPolicy,
    options: &SyncOptions,
    sink: &mut dyn EventSink,
) -> Result<RunReport, EngineError> {
    run_with(&LocalFs, roots, policy, options, sink)
}

/// Mirror a profile's roots using the rules stored with it.
pub fn run_profile(profile: &Profile, sink: &mut dyn EventSink) -> Result<RunReport, EngineError> {
    let policy = RuleSetPolicy::from_profile(profile)?;
    tracing::info!(
        "syncing profile '{}' across {} roots",
        profile.name,
        profile.roots.len()
    );
    run(&profile.roots, &policy, &profile.options, sink)
}

/// Build the tree over every available root, then merge it.
///
/// Roots missing from disk are left out with a warning; at least two must
/// remain. Per-entry failures are reported through `sink` only.
pub fn run_with(
    fs: &dyn FileSystem,
    roots: &[Root],
    policy: &dyn ExclusionPolicy,
    options: &SyncOptions,
    sink: &mut dyn EventSink,
) -> Result<RunReport, EngineError> {
    let started_at = Utc::now();
    let clock = Instant::now();

    let (available, unavailable) = partition_roots(fs, roots)?;
    if available.len() < 2 {
        return Err(EngineError::NotEnoughRoots {
            available: available.len(),
        });
    }

    let mut builder = TreeBuilder::new(fs, policy)?;
    if let Some(dir) = &options.backup_dir {
        for path in backup_paths_in_roots(&available, dir) {
            tracing::debug!("backup directory {} is inside a root; not syncing it", path.display());
            builder = builder.reserve(path);
        }
    }
    let tree = builder.build_tree(Frontier::from_roots(available.iter().copied()));
    tracing::debug!(
        "built tree with {} entries, {} skipped",
        tree.entry_count(),
        builder.skipped()
    );

    let mut executor = TransferExecutor::new(fs)
        .atomic_replace(options.atomic_replace)
        .dry_run(options.dry_run);
    if let Some(dir) = &options.backup_dir {
        executor = executor.with_backup(DirectoryBackup::new(dir, started_at));
    }

    let mut tally = Tally {
        inner: sink,
        report: RunReport::default(),
    };
    let mut engine = MergeEngine::new(fs, executor, options);
    engine.merge(
        &tree,
        tree.root(),
        Frontier::from_roots(available.iter().copied()),
        Path::new(""),
        &mut tally,
    );

    let report = RunReport {
        started_at: Some(started_at),
        skipped: builder.skipped(),
        conflicts: engine.conflicts(),
        entries: tree.entry_count(),
        unavailable_roots: unavailable,
        dry_run: options.dry_run,
        duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
        ..tally.report
    };
    tracing::info!(
        "run finished: {} created, {} copied, {} updated, {} failed",
        report.folders_created,
        report.files_copied,
        report.files_updated,
        report.failures
    );
    Ok(report)
}

/// Where `backup_dir` appears inside any of `roots`, spelled with the root's
/// own path so it matches what the builder lists.
fn backup_paths_in_roots(roots: &[&Root], backup_dir: &Path) -> Vec<PathBuf> {
    let backup = canonical(backup_dir);
    roots
        .iter()
        .filter_map(|root| {
            let relative = backup.strip_prefix(canonical(&root.path)).ok()?;
            (!relative.as_os_str().is_empty()).then(|| root.path.join(relative))
        })
        .collect()
}

/// Canonical form of `path`, or of its nearest existing ancestor with the
/// rest appended, so a backup directory not created yet still resolves.
fn canonical(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(resolved) = std::fs::canonicalize(current) {
            return missing.iter().rev().fold(resolved, |acc, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn partition_roots<'r>(
    fs: &dyn FileSystem,
    roots: &'r [Root],
) -> Result<(Vec<&'r Root>, Vec<RootId>), EngineError> {
    let mut available = Vec::new();
    let mut unavailable = Vec::new();
    for root in roots {
        match fs.stat(&root.path) {
            Ok(Some(stat)) if stat.is_dir => available.push(root),
            Ok(Some(_)) => {
                return Err(EngineError::RootNotDirectory {
                    path: root.path.clone(),
                })
            }
            Ok(None) => {
                tracing::warn!("root {} ({}) does not exist; skipping it", root.id, root.path.display());
                unavailable.push(root.id);
            }
            Err(e) => {
                tracing::warn!("root {} ({}) is unreadable: {}", root.id, root.path.display(), e);
                unavailable.push(root.id);
            }
        }
    }
    Ok((available, unavailable))
}

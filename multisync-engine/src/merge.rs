//! Merge walk over a built [`SyncTree`].
//!
//! Directories are created in every root of the frontier that lacks them;
//! a root whose creation failed is left out of the child frontier, so its
//! copy of the subtree is skipped for the rest of the run. Roots where an
//! entry's existence could not be checked are neither read nor written. Files are ranked
//! across the frontier (see [`compare`](crate::compare)) and the newest copy
//! is pushed to missing and stale roots. Every side effect becomes exactly
//! one [`OutcomeEvent`], successful or not, and no failure stops the walk.

use std::path::Path;

use multisync_core::SyncOptions;

use crate::compare::{rank, Action, FileCompare, FileStamp, MtimeCompare, Slot};
use crate::event::{EventKind, EventSink, OutcomeEvent};
use crate::frontier::Frontier;
use crate::fs::FileSystem;
use crate::transfer::{BackupTarget, TransferExecutor};
use crate::tree::{NodeId, SyncNode, SyncTree};

pub struct MergeEngine<'a> {
    fs: &'a dyn FileSystem,
    executor: TransferExecutor<'a>,
    compare: Box<dyn FileCompare + 'a>,
    options: &'a SyncOptions,
    conflicts: usize,
}

impl<'a> MergeEngine<'a> {
    pub fn new(fs: &'a dyn FileSystem, executor: TransferExecutor<'a>, options: &'a SyncOptions) -> Self {
        Self {
            fs,
            executor,
            compare: Box::new(MtimeCompare::with_tolerance_ms(options.mtime_tolerance_ms)),
            options,
            conflicts: 0,
        }
    }

    /// Swap the freshness comparison, e.g. for a content-aware one in tests.
    pub fn with_compare(mut self, compare: impl FileCompare + 'a) -> Self {
        self.compare = Box::new(compare);
        self
    }

    /// Names left untouched because they are a file in one root and a
    /// directory in another.
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    /// Merge every child of `node`, whose location in each root is `frontier`.
    pub fn merge(
        &mut self,
        tree: &SyncTree,
        node: NodeId,
        frontier: Frontier,
        relative: &Path,
        sink: &mut dyn EventSink,
    ) {
        for &child in tree.children(node) {
            let entry = tree.get(child);
            let rel = relative.join(&entry.name);

            if entry.is_mixed() {
                tracing::warn!(
                    "'{}' is a directory in some roots and a file in others; leaving it alone",
                    rel.display()
                );
                self.conflicts += 1;
                continue;
            }

            if entry.is_dir {
                let child_frontier = self.ensure_dir(entry, &frontier, sink);
                self.merge(tree, child, child_frontier, &rel, sink);
            } else {
                self.merge_file(entry, &frontier, &rel, sink);
            }
        }
    }

    /// Create `entry` where it is missing and return the frontier one level down.
    fn ensure_dir(&self, entry: &SyncNode, frontier: &Frontier, sink: &mut dyn EventSink) -> Frontier {
        let dry_run = self.executor.is_dry_run();
        let mut child_frontier = Frontier::new();

        for (id, path) in frontier.paths_of(&entry.name) {
            if entry.exists_in(id) {
                child_frontier.insert(id, path);
                continue;
            }
            if entry.is_unknown_in(id) {
                continue;
            }

            let event = OutcomeEvent::folder_created(path.clone(), id).planned(dry_run);
            match self.executor.create_dir(&path) {
                Ok(()) => {
                    tracing::info!("created folder {}", path.display());
                    sink.emit(event);
                    child_frontier.insert(id, path);
                }
                Err(e) => {
                    tracing::warn!("{e}");
                    sink.emit(event.failed(source_text(&e)));
                }
            }
        }
        child_frontier
    }

    fn merge_file(&self, entry: &SyncNode, frontier: &Frontier, rel: &Path, sink: &mut dyn EventSink) {
        let targets: Vec<_> = frontier.paths_of(&entry.name).collect();
        let slots: Vec<Slot> = targets
            .iter()
            .map(|(id, path)| {
                if entry.is_unknown_in(*id) {
                    return Slot::Unreadable;
                }
                if !entry.exists_in(*id) {
                    return Slot::Missing;
                }
                match self.fs.stat(path) {
                    Ok(Some(stat)) if !stat.is_dir => Slot::Present(FileStamp {
                        root: *id,
                        path: path.clone(),
                        modified: stat.modified,
                        len: stat.len,
                    }),
                    Ok(Some(_)) => {
                        tracing::warn!("{} turned into a directory during the run", path.display());
                        Slot::Unreadable
                    }
                    Ok(None) => {
                        tracing::warn!("{} vanished during the run", path.display());
                        Slot::Unreadable
                    }
                    Err(e) => {
                        tracing::warn!("cannot read metadata of {}: {}", path.display(), e);
                        Slot::Unreadable
                    }
                }
            })
            .collect();

        let Some(ranked) = rank(&slots, self.compare.as_ref(), self.options.ranking) else {
            return;
        };
        let source = ranked.newest.path.as_path();
        let dry_run = self.executor.is_dry_run();

        for (i, (id, dest)) in targets.iter().enumerate() {
            let (kind, result) = match ranked.action(i) {
                Action::Keep => continue,
                Action::Copy => (EventKind::FileCopied, self.executor.copy(source, dest)),
                Action::Update => {
                    let target = BackupTarget {
                        root: *id,
                        relative: rel,
                        path: dest,
                    };
                    (EventKind::FileUpdated, self.executor.update(source, target))
                }
            };

            let event =
                OutcomeEvent::transfer(kind, source.to_path_buf(), dest.clone(), *id).planned(dry_run);
            match result {
                Ok(()) => {
                    tracing::info!("{}: {} -> {}", kind, source.display(), dest.display());
                    sink.emit(event);
                }
                Err(e) => {
                    tracing::warn!("{e}");
                    sink.emit(event.failed(source_text(&e)));
                }
            }
        }
    }
}

/// Error text of the failed primitive, without the path context.
fn source_text(err: &crate::error::TransferError) -> String {
    std::error::Error::source(err)
        .map(|s| s.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TreeBuilder;
    use crate::exclusion::NoExclusions;
    use crate::fs::LocalFs;
    use multisync_core::{Ranking, Root, RootId};
    use std::fs;
    use tempfile::TempDir;

    fn setup(n: u32) -> (TempDir, Vec<Root>) {
        let tmp = TempDir::new().unwrap();
        let roots = (0..n)
            .map(|i| {
                let path = tmp.path().join(format!("r{i}"));
                fs::create_dir_all(&path).unwrap();
                Root::new(i, path)
            })
            .collect();
        (tmp, roots)
    }

    fn merge(roots: &[Root], options: &SyncOptions) -> (Vec<OutcomeEvent>, usize) {
        let fs = LocalFs;
        let tree = TreeBuilder::new(&fs, &NoExclusions)
            .unwrap()
            .build_tree(Frontier::from_roots(roots));
        let executor = TransferExecutor::new(&fs).dry_run(options.dry_run);
        let mut engine = MergeEngine::new(&fs, executor, options);
        let mut events = Vec::new();
        engine.merge(&tree, tree.root(), Frontier::from_roots(roots), Path::new(""), &mut events);
        (events, engine.conflicts())
    }

    #[test]
    fn nested_directories_created_before_their_files() {
        let (_tmp, roots) = setup(2);
        fs::create_dir_all(roots[0].path.join("a/b")).unwrap();
        fs::write(roots[0].path.join("a/b/f.txt"), "x").unwrap();

        let (events, _) = merge(&roots, &SyncOptions::default());
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::FolderCreated, EventKind::FolderCreated, EventKind::FileCopied]
        );
        assert_eq!(fs::read_to_string(roots[1].path.join("a/b/f.txt")).unwrap(), "x");
    }

    #[test]
    fn mixed_entries_are_counted_and_untouched() {
        let (_tmp, roots) = setup(2);
        fs::create_dir(roots[0].path.join("clash")).unwrap();
        fs::write(roots[0].path.join("clash/inner"), "x").unwrap();
        fs::write(roots[1].path.join("clash"), "file").unwrap();

        let (events, conflicts) = merge(&roots, &SyncOptions::default());
        assert!(events.is_empty());
        assert_eq!(conflicts, 1);
        assert_eq!(fs::read_to_string(roots[1].path.join("clash")).unwrap(), "file");
    }

    #[test]
    fn dry_run_reports_nested_work_without_writing() {
        let (_tmp, roots) = setup(2);
        fs::create_dir_all(roots[0].path.join("d")).unwrap();
        fs::write(roots[0].path.join("d/f"), "x").unwrap();

        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };
        let (events, _) = merge(&roots, &options);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.success && e.dry_run));
        assert!(!roots[1].path.join("d").exists());
    }

    #[test]
    fn unknown_roots_are_neither_read_nor_written() {
        let (_tmp, roots) = setup(2);
        fs::write(roots[0].path.join("f"), "x").unwrap();
        fs::create_dir(roots[0].path.join("d")).unwrap();

        let local = LocalFs;
        let mut tree = TreeBuilder::new(&local, &NoExclusions)
            .unwrap()
            .build_tree(Frontier::from_roots(&roots));
        for name in ["f", "d"] {
            let id = tree.find(name).unwrap();
            tree.get_mut(id).mark_unknown(RootId(1));
        }

        let options = SyncOptions::default();
        let mut engine = MergeEngine::new(&local, TransferExecutor::new(&local), &options);
        let mut events = Vec::new();
        engine.merge(&tree, tree.root(), Frontier::from_roots(&roots), Path::new(""), &mut events);

        assert!(events.is_empty(), "events: {events:?}");
        assert!(!roots[1].path.join("f").exists());
        assert!(!roots[1].path.join("d").exists());
    }

    #[test]
    fn ranking_option_is_honoured() {
        let (_tmp, roots) = setup(2);
        for root in &roots {
            fs::write(root.path.join("f"), root.id.0.to_string()).unwrap();
        }
        let options = SyncOptions {
            ranking: Ranking::ByMtime,
            mtime_tolerance_ms: 60_000,
            ..SyncOptions::default()
        };
        let (events, _) = merge(&roots, &options);
        assert!(events.is_empty(), "within tolerance means equal");
    }
}

//! Tree builder: one lock-step listing pass across every root.
//!
//! For each node the builder lists the directory in every root of the
//! current frontier and unions the surviving names (sorted, so the tree shape
//! does not depend on listing order). Listings only supply names: whether a
//! root holds a name is decided by a `stat` of the resolved path in that
//! root, so a root whose listing failed is still seen to hold its files.
//! Directories get a child frontier and are descended into immediately, so
//! only the active path's frontiers are alive at any time.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use multisync_core::RootId;

use crate::error::EngineError;
use crate::exclusion::{ExclusionPolicy, NameFilter};
use crate::frontier::Frontier;
use crate::fs::FileSystem;
use crate::transfer::TMP_SUFFIX;
use crate::tree::{NodeId, SyncTree};

pub struct TreeBuilder<'a> {
    fs: &'a dyn FileSystem,
    policy: &'a dyn ExclusionPolicy,
    name_filter: NameFilter,
    reserved: Vec<PathBuf>,
    skipped: usize,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(fs: &'a dyn FileSystem, policy: &'a dyn ExclusionPolicy) -> Result<Self, EngineError> {
        Ok(Self {
            fs,
            policy,
            name_filter: NameFilter::new(policy.filters())?,
            reserved: Vec::new(),
            skipped: 0,
        })
    }

    /// Leave the absolute `path` out of the tree, e.g. a backup directory
    /// that lives inside one of the roots. The root holding it is treated as
    /// unknown for that name, so nothing is created or copied over it.
    pub fn reserve(mut self, path: impl Into<PathBuf>) -> Self {
        self.reserved.push(path.into());
        self
    }

    /// Entries dropped by the exclusion policy so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Build a fresh tree for the top-level `frontier`.
    pub fn build_tree(&mut self, frontier: Frontier) -> SyncTree {
        let mut tree = SyncTree::new();
        let top = tree.root();
        self.build(&mut tree, top, frontier, Path::new(""));
        tree
    }

    /// Append the children of `node`, found under every root of `frontier`.
    ///
    /// `relative` is the path of `node` relative to the roots; it is what the
    /// exclusion policy sees as the parent of each listed name.
    pub fn build(&mut self, tree: &mut SyncTree, node: NodeId, frontier: Frontier, relative: &Path) {
        // name -> roots whose listing returned it, with the listed kind.
        let mut seen: BTreeMap<OsString, Vec<(RootId, bool)>> = BTreeMap::new();
        for (id, dir) in frontier.iter() {
            let entries = match self.fs.list(dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("{} vanished before listing", dir.display());
                    continue;
                }
                Err(e) => {
                    tracing::warn!("cannot list {} in root {}: {}", dir.display(), id, e);
                    continue;
                }
            };
            for entry in entries {
                if is_leftover_tmp(&entry.name) {
                    tracing::debug!(
                        "ignoring leftover temporary file {}",
                        dir.join(&entry.name).display()
                    );
                    continue;
                }
                if !self.name_filter.admits(&entry) || self.is_reserved(&dir.join(&entry.name)) {
                    continue;
                }
                seen.entry(entry.name).or_default().push((id, entry.is_dir));
            }
        }

        tracing::debug!("{} names under '{}'", seen.len(), relative.display());

        for (name, listed) in seen {
            if self.policy.is_excluded(relative, &name) {
                tracing::debug!("excluded: {}", relative.join(&name).display());
                self.skipped += 1;
                continue;
            }

            let child = tree.add_child(node, name.clone());
            let mut child_frontier = Frontier::new();
            for (id, dir) in frontier.iter() {
                let path = dir.join(&name);
                let Some(presence) = self.existence(&path, id, &name, &listed) else {
                    tree.get_mut(child).mark_unknown(id);
                    continue;
                };
                match presence {
                    Presence::Absent => {}
                    Presence::File => tree.get_mut(child).add_root(id, false),
                    Presence::Dir => {
                        tree.get_mut(child).add_root(id, true);
                        child_frontier.insert(id, path);
                    }
                }
            }

            if !child_frontier.is_empty() {
                self.build(tree, child, child_frontier, &relative.join(&name));
            }
        }
    }

    /// Whether `path` exists in root `id`; `None` when that cannot be told.
    fn existence(
        &self,
        path: &Path,
        id: RootId,
        name: &OsStr,
        listed: &[(RootId, bool)],
    ) -> Option<Presence> {
        if self.is_reserved(path) {
            tracing::debug!("{} is reserved; not syncing it", path.display());
            return None;
        }
        match self.fs.stat(path) {
            Ok(Some(stat)) if stat.is_dir => Some(Presence::Dir),
            Ok(Some(_)) => Some(Presence::File),
            Ok(None) => Some(Presence::Absent),
            Err(e) => match listed.iter().find(|(listed_id, _)| *listed_id == id) {
                Some((_, true)) => Some(Presence::Dir),
                Some((_, false)) => Some(Presence::File),
                None => {
                    tracing::warn!(
                        "cannot tell whether {:?} exists in root {}: {}; leaving it alone",
                        name,
                        id,
                        e
                    );
                    None
                }
            },
        }
    }

    fn is_reserved(&self, path: &Path) -> bool {
        self.reserved.iter().any(|r| path == r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Absent,
    File,
    Dir,
}

/// Temporary siblings written by an interrupted atomic update.
fn is_leftover_tmp(name: &OsString) -> bool {
    name.to_string_lossy().ends_with(TMP_SUFFIX)
}

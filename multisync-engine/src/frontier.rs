//! Root frontier: where the current tree position lives in each root.
//!
//! One frontier exists per recursion depth. The frame that builds a child
//! frontier hands it to the deeper call by value, so it is dropped when that
//! call returns.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use multisync_core::{Root, RootId};

/// Ordered `root id → absolute path` mapping.
///
/// Iteration follows insertion order, which is root registration order at the
/// top level. That order only matters for tie-breaks while ranking files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    entries: Vec<(RootId, PathBuf)>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The top-level frontier for a set of roots.
    pub fn from_roots<'a>(roots: impl IntoIterator<Item = &'a Root>) -> Self {
        let mut frontier = Self::new();
        for root in roots {
            frontier.insert(root.id, root.path.clone());
        }
        frontier
    }

    /// Insert or replace the path for `id`; a replaced id keeps its position.
    pub fn insert(&mut self, id: RootId, path: PathBuf) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = path,
            None => self.entries.push((id, path)),
        }
    }

    pub fn get(&self, id: RootId) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, path)| path.as_path())
    }

    pub fn contains(&self, id: RootId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RootId, &Path)> {
        self.entries.iter().map(|(id, path)| (*id, path.as_path()))
    }

    pub fn ids(&self) -> impl Iterator<Item = RootId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Absolute path of `name` under every root of this frontier.
    pub fn paths_of<'a>(&'a self, name: &'a OsStr) -> impl Iterator<Item = (RootId, PathBuf)> + 'a {
        self.entries.iter().map(move |(id, dir)| (*id, dir.join(name)))
    }
}

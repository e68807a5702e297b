//! Arena-backed sync tree.
//!
//! Nodes live in one `Vec` and refer to their children by [`NodeId`]. Index 0
//! is the synthetic, unnamed top node. A tree is built once per run and
//! dropped after the merge walk.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path};

use multisync_core::RootId;

/// Index of a node inside its [`SyncTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One discovered entry, annotated with the roots that contain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncNode {
    pub name: OsString,
    /// True when at least one root holds this entry as a directory.
    pub is_dir: bool,
    /// Roots where an entry of this name exists at this position.
    pub present_in: BTreeSet<RootId>,
    /// Subset of `present_in` where the entry is a directory.
    pub dir_in: BTreeSet<RootId>,
    /// Roots where it could not be determined whether the entry exists.
    /// Nothing is read from or written to them for this entry.
    pub unknown_in: BTreeSet<RootId>,
    pub children: Vec<NodeId>,
}

impl SyncNode {
    fn new(name: OsString) -> Self {
        Self {
            name,
            is_dir: false,
            present_in: BTreeSet::new(),
            dir_in: BTreeSet::new(),
            unknown_in: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    pub fn exists_in(&self, id: RootId) -> bool {
        self.present_in.contains(&id)
    }

    /// Directory in some roots and a plain file in others.
    pub fn is_mixed(&self) -> bool {
        !self.dir_in.is_empty() && self.dir_in.len() != self.present_in.len()
    }

    /// Record that `id` holds this entry; `as_dir` marks it a directory there.
    pub fn add_root(&mut self, id: RootId, as_dir: bool) {
        self.present_in.insert(id);
        if as_dir {
            self.is_dir = true;
            self.dir_in.insert(id);
        }
    }

    pub fn is_unknown_in(&self, id: RootId) -> bool {
        self.unknown_in.contains(&id)
    }

    /// Record that the existence check for `id` failed.
    pub fn mark_unknown(&mut self, id: RootId) {
        self.unknown_in.insert(id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTree {
    nodes: Vec<SyncNode>,
}

impl Default for SyncTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTree {
    pub fn new() -> Self {
        let mut top = SyncNode::new(OsString::new());
        top.is_dir = true;
        Self { nodes: vec![top] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> &SyncNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut SyncNode {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Append a new, empty child under `parent`.
    pub fn add_child(&mut self, parent: NodeId, name: OsString) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SyncNode::new(name));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Number of discovered entries, not counting the synthetic top node.
    pub fn entry_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Resolve a relative path such as `a/b/c.txt` to its node.
    pub fn find(&self, relative: impl AsRef<Path>) -> Option<NodeId> {
        let mut current = self.root();
        for component in relative.as_ref().components() {
            let Component::Normal(name) = component else {
                continue;
            };
            current = self.child_named(current, name)?;
        }
        Some(current)
    }

    pub fn child_named(&self, parent: NodeId, name: &OsStr) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.get(*id).name.as_os_str() == name)
    }
}

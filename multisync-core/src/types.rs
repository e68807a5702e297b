//! Domain types for multisync profiles.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::rules::{RuleGroup, RuleKind};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of one mirrored folder inside a profile.
///
/// Ids are assigned in registration order and never reused within a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RootId(pub u32);

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for RootId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A strongly-typed name for a sync profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileName(pub String);

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProfileName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProfileName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Roots
// ---------------------------------------------------------------------------

/// One of the folders kept mirrored by a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub id: RootId,
    /// Absolute path of the folder on disk.
    pub path: PathBuf,
}

impl Root {
    pub fn new(id: impl Into<RootId>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How the freshest copy of a file is chosen among roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    /// Group numbering from pairwise comparisons visited in root order.
    #[default]
    Pairwise,
    /// Explicit ordering by modification time.
    ByMtime,
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ranking::Pairwise => write!(f, "pairwise"),
            Ranking::ByMtime => write!(f, "by_mtime"),
        }
    }
}

/// Per-profile knobs for a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    #[serde(default)]
    pub ranking: Ranking,
    /// Modification times closer than this are considered equal.
    #[serde(default)]
    pub mtime_tolerance_ms: u64,
    /// Where stale files are copied before being replaced. `None` takes no backup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    /// Replace stale files through a temporary sibling + rename.
    #[serde(default = "default_atomic_replace")]
    pub atomic_replace: bool,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_atomic_replace() -> bool {
    true
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            ranking: Ranking::default(),
            mtime_tolerance_ms: 0,
            backup_dir: None,
            atomic_replace: default_atomic_replace(),
            dry_run: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A named sync set: the roots to mirror plus the rules and options used
/// while mirroring them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: ProfileName,
    pub roots: Vec<Root>,
    #[serde(default = "RuleGroup::default_filters")]
    pub filters: RuleGroup,
    #[serde(default = "RuleGroup::default_blacklist")]
    pub blacklist: RuleGroup,
    #[serde(default)]
    pub options: SyncOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Build a fresh profile, assigning root ids `0..n` in the given order.
    pub fn new(name: ProfileName, paths: Vec<PathBuf>) -> Result<Self, ProfileError> {
        let now = Utc::now();
        let mut profile = Self {
            name,
            roots: Vec::with_capacity(paths.len()),
            filters: RuleGroup::default_filters(),
            blacklist: RuleGroup::default_blacklist(),
            options: SyncOptions::default(),
            created_at: now,
            updated_at: now,
        };
        for path in paths {
            profile.add_root(path)?;
        }
        if profile.roots.len() < 2 {
            return Err(ProfileError::TooFewRoots {
                count: profile.roots.len(),
            });
        }
        Ok(profile)
    }

    /// Register another folder, returning the id it was given.
    pub fn add_root(&mut self, path: PathBuf) -> Result<RootId, ProfileError> {
        if self.roots.iter().any(|r| r.path == path) {
            return Err(ProfileError::DuplicateRoot { path });
        }
        let id = self.next_root_id();
        self.roots.push(Root { id, path });
        self.updated_at = Utc::now();
        Ok(id)
    }

    pub fn root(&self, id: RootId) -> Option<&Root> {
        self.roots.iter().find(|r| r.id == id)
    }

    pub fn root_paths(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(|r| r.path.as_path())
    }

    /// The rule group of the requested kind.
    pub fn rules(&self, kind: RuleKind) -> &RuleGroup {
        match kind {
            RuleKind::Filters => &self.filters,
            RuleKind::Blacklist => &self.blacklist,
        }
    }

    pub fn rules_mut(&mut self, kind: RuleKind) -> &mut RuleGroup {
        self.updated_at = Utc::now();
        match kind {
            RuleKind::Filters => &mut self.filters,
            RuleKind::Blacklist => &mut self.blacklist,
        }
    }

    fn next_root_id(&self) -> RootId {
        self.roots
            .iter()
            .map(|r| r.id.0 + 1)
            .max()
            .map(RootId)
            .unwrap_or(RootId(0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

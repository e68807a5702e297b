//! Exclusion policy consumed by the tree builder.
//!
//! Two gates apply while listing a directory:
//!
//! 1. **Name filters** ([`ExclusionPolicy::filters`]) restrict which *files*
//!    are listed at all. Directories always pass, and an empty filter list
//!    admits every file.
//! 2. **Exclusion** ([`ExclusionPolicy::is_excluded`]) is asked for every
//!    surviving name with the relative path of its parent. Excluded entries
//!    are dropped together with their whole subtree and counted as skipped.
//!
//! The policy is a pure function of `(parent, name)`; no traversal state is
//! kept between calls.

use std::ffi::OsStr;
use std::path::Path;

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use multisync_core::{Profile, RuleGroup, RuleKind};

use crate::error::EngineError;
use crate::fs::DirEntry;

pub trait ExclusionPolicy: Send + Sync {
    /// Wildcard patterns that file names must match to be listed.
    fn filters(&self) -> &[String];

    /// Whether `name`, found inside the relative directory `parent`, is skipped.
    fn is_excluded(&self, parent: &Path, name: &OsStr) -> bool;
}

/// Policy that lists and keeps everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExclusions;

impl ExclusionPolicy for NoExclusions {
    fn filters(&self) -> &[String] {
        &[]
    }

    fn is_excluded(&self, _parent: &Path, _name: &OsStr) -> bool {
        false
    }
}

/// Policy compiled from a profile's filter and blacklist rule groups.
///
/// Blacklist patterns are matched against both the bare name and the
/// slash-separated path relative to the roots, so `*.bak` skips backups
/// anywhere while `cache/tmp` only skips that one directory.
#[derive(Debug, Clone)]
pub struct RuleSetPolicy {
    filters: Vec<String>,
    blacklist: GlobSet,
}

impl RuleSetPolicy {
    pub fn new(filters: &RuleGroup, blacklist: &RuleGroup) -> Result<Self, EngineError> {
        // Validate filter patterns up front so a typo fails the run early.
        compile(RuleKind::Filters, filters.iter())?;
        Ok(Self {
            filters: filters.data.clone(),
            blacklist: compile(RuleKind::Blacklist, blacklist.iter())?,
        })
    }

    pub fn from_profile(profile: &Profile) -> Result<Self, EngineError> {
        Self::new(&profile.filters, &profile.blacklist)
    }
}

impl ExclusionPolicy for RuleSetPolicy {
    fn filters(&self) -> &[String] {
        &self.filters
    }

    fn is_excluded(&self, parent: &Path, name: &OsStr) -> bool {
        if self.blacklist.is_empty() {
            return false;
        }
        self.blacklist.is_match(name) || self.blacklist.is_match(parent.join(name))
    }
}

/// Compiled form of [`ExclusionPolicy::filters`] used during listing.
#[derive(Debug, Clone)]
pub(crate) struct NameFilter {
    set: GlobSet,
}

impl NameFilter {
    pub(crate) fn new(patterns: &[String]) -> Result<Self, EngineError> {
        Ok(Self {
            set: compile(RuleKind::Filters, patterns.iter().map(String::as_str))?,
        })
    }

    pub(crate) fn admits(&self, entry: &DirEntry) -> bool {
        entry.is_dir || self.set.is_empty() || self.set.is_match(&entry.name)
    }
}

fn compile<'a>(
    kind: RuleKind,
    patterns: impl IntoIterator<Item = &'a str>,
) -> Result<GlobSet, EngineError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(glob(kind, pattern)?);
    }
    builder.build().map_err(|source| EngineError::InvalidPattern {
        kind,
        pattern: String::new(),
        source,
    })
}

fn glob(kind: RuleKind, pattern: &str) -> Result<Glob, EngineError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| EngineError::InvalidPattern {
            kind,
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(kind: RuleKind, items: &[&str]) -> RuleGroup {
        let mut g = RuleGroup::new(kind, "test");
        g.import_data(items.iter().copied());
        g
    }

    fn policy(filters: &[&str], blacklist: &[&str]) -> RuleSetPolicy {
        RuleSetPolicy::new(
            &group(RuleKind::Filters, filters),
            &group(RuleKind::Blacklist, blacklist),
        )
        .expect("policy")
    }

    #[test]
    fn blacklist_matches_bare_names_anywhere() {
        let p = policy(&[], &["*.bak", ".git"]);
        assert!(p.is_excluded(Path::new(""), OsStr::new("notes.bak")));
        assert!(p.is_excluded(Path::new("deep/er"), OsStr::new("old.bak")));
        assert!(p.is_excluded(Path::new("project"), OsStr::new(".git")));
        assert!(!p.is_excluded(Path::new(""), OsStr::new("notes.txt")));
    }

    #[test]
    fn blacklist_relative_path_is_position_sensitive() {
        let p = policy(&[], &["cache/tmp"]);
        assert!(p.is_excluded(Path::new("cache"), OsStr::new("tmp")));
        assert!(!p.is_excluded(Path::new("other"), OsStr::new("tmp")));
    }

    #[test]
    fn star_does_not_cross_directories() {
        let p = policy(&[], &["build/*"]);
        assert!(p.is_excluded(Path::new("build"), OsStr::new("out.o")));
        assert!(!p.is_excluded(Path::new("build/nested"), OsStr::new("out.o")));
    }

    #[test]
    fn name_filter_admits_dirs_and_matching_files() {
        let filter = NameFilter::new(&["*.txt".to_string()]).expect("filter");
        let dir = DirEntry { name: "photos".into(), is_dir: true };
        let txt = DirEntry { name: "a.txt".into(), is_dir: false };
        let jpg = DirEntry { name: "a.jpg".into(), is_dir: false };
        assert!(filter.admits(&dir));
        assert!(filter.admits(&txt));
        assert!(!filter.admits(&jpg));
    }

    #[test]
    fn empty_name_filter_admits_everything() {
        let filter = NameFilter::new(&[]).expect("filter");
        let jpg = DirEntry { name: "a.jpg".into(), is_dir: false };
        assert!(filter.admits(&jpg));
    }

    #[test]
    fn invalid_pattern_reports_kind_and_pattern() {
        let err = RuleSetPolicy::new(
            &group(RuleKind::Filters, &[]),
            &group(RuleKind::Blacklist, &["a[b"]),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("blacklist"), "got: {msg}");
        assert!(msg.contains("a[b"), "got: {msg}");
    }

    #[test]
    fn no_exclusions_keeps_everything() {
        assert!(NoExclusions.filters().is_empty());
        assert!(!NoExclusions.is_excluded(Path::new("x"), OsStr::new("y")));
    }
}

//! File freshness comparison and multi-root ranking.
//!
//! ## Pairwise ranking
//!
//! Roots are visited in frontier order while a running "newest" pointer and a
//! group counter are maintained:
//!
//! - the first present root gets group 0 and becomes newest;
//! - a root comparing *newer* than newest becomes newest and gets
//!   `counter + 1` (the counter advances);
//! - a root comparing *equal* gets the counter's value;
//! - a root comparing *older* gets `counter - 1`;
//! - a root without the file gets [`MISSING`].
//!
//! Afterwards every root whose group is below the final counter is stale.
//! This assumes the comparison is transitive. With a non-zero mtime tolerance
//! it is not, and the outcome can depend on root order; [`Ranking::ByMtime`]
//! ranks against the single newest timestamp instead.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use multisync_core::{Ranking, RootId};

/// Group number for roots that do not hold the file.
pub const MISSING: i64 = -2;

/// Result of comparing file A against file B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Older,
    Equal,
    Newer,
}

/// Modification descriptor of one copy of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub root: RootId,
    pub path: PathBuf,
    pub modified: SystemTime,
    pub len: u64,
}

/// Three-way comparison between two copies. Must be side-effect free.
pub trait FileCompare: Send + Sync {
    fn compare(&self, a: &FileStamp, b: &FileStamp) -> Freshness;
}

/// Compares modification times, treating differences within `tolerance` as equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtimeCompare {
    pub tolerance: Duration,
}

impl MtimeCompare {
    pub fn with_tolerance_ms(ms: u64) -> Self {
        Self {
            tolerance: Duration::from_millis(ms),
        }
    }
}

impl FileCompare for MtimeCompare {
    fn compare(&self, a: &FileStamp, b: &FileStamp) -> Freshness {
        match a.modified.duration_since(b.modified) {
            Ok(ahead) if ahead > self.tolerance => Freshness::Newer,
            Ok(_) => Freshness::Equal,
            Err(behind) if behind.duration() > self.tolerance => Freshness::Older,
            Err(_) => Freshness::Equal,
        }
    }
}

/// What one root holds for the file being ranked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// The root does not have the file.
    Missing,
    Present(FileStamp),
    /// The root has something there but it could not be inspected.
    Unreadable,
}

/// What the merge walk must do for one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Copy,
    Update,
    Keep,
}

/// Ranking outcome for one file across a frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    /// Group per slot, in slot order; `None` for unreadable slots.
    pub groups: Vec<Option<i64>>,
    /// Group of the newest copy.
    pub latest: i64,
    pub newest: FileStamp,
}

impl Ranked {
    pub fn action(&self, slot: usize) -> Action {
        match self.groups.get(slot).copied().flatten() {
            Some(MISSING) => Action::Copy,
            Some(group) if group < self.latest => Action::Update,
            _ => Action::Keep,
        }
    }
}

/// Rank the copies of one file. Returns `None` when no slot holds a readable copy.
pub fn rank(slots: &[Slot], compare: &dyn FileCompare, ranking: Ranking) -> Option<Ranked> {
    match ranking {
        Ranking::Pairwise => rank_pairwise(slots, compare),
        Ranking::ByMtime => rank_by_mtime(slots, compare),
    }
}

fn rank_pairwise(slots: &[Slot], compare: &dyn FileCompare) -> Option<Ranked> {
    let mut groups = Vec::with_capacity(slots.len());
    let mut newest: Option<&FileStamp> = None;
    let mut latest = 0i64;

    for slot in slots {
        let group = match slot {
            Slot::Missing => Some(MISSING),
            Slot::Unreadable => None,
            Slot::Present(stamp) => match newest {
                None => {
                    newest = Some(stamp);
                    Some(latest)
                }
                Some(current) => match compare.compare(stamp, current) {
                    Freshness::Equal => Some(latest),
                    Freshness::Newer => {
                        newest = Some(stamp);
                        latest += 1;
                        Some(latest)
                    }
                    Freshness::Older => Some(latest - 1),
                },
            },
        };
        groups.push(group);
    }

    newest.map(|stamp| Ranked {
        groups,
        latest,
        newest: stamp.clone(),
    })
}

fn rank_by_mtime(slots: &[Slot], compare: &dyn FileCompare) -> Option<Ranked> {
    // First copy with the greatest raw mtime wins ties, keeping root order stable.
    let newest = slots
        .iter()
        .filter_map(|slot| match slot {
            Slot::Present(stamp) => Some(stamp),
            _ => None,
        })
        .fold(None::<&FileStamp>, |best, stamp| match best {
            Some(b) if b.modified >= stamp.modified => Some(b),
            _ => Some(stamp),
        })?;

    let groups = slots
        .iter()
        .map(|slot| match slot {
            Slot::Missing => Some(MISSING),
            Slot::Unreadable => None,
            Slot::Present(stamp) => match compare.compare(stamp, newest) {
                Freshness::Older => Some(0),
                Freshness::Equal | Freshness::Newer => Some(1),
            },
        })
        .collect();

    Some(Ranked {
        groups,
        latest: 1,
        newest: newest.clone(),
    })
}

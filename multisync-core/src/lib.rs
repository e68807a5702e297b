//! multisync core library: profiles and the rule groups stored in them.
//!
//! Public API surface:
//! - [`types`]: newtypes, roots, profiles and sync options
//! - [`rules`]: filter / blacklist rule groups
//! - [`error`]: [`ProfileError`]
//! - [`registry`]: load / save / init / list profiles

pub mod error;
pub mod registry;
pub mod rules;
pub mod types;

pub use error::ProfileError;
pub use rules::{RuleGroup, RuleKind};
pub use types::{Profile, ProfileName, Ranking, Root, RootId, SyncOptions};

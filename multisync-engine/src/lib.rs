//! # multisync-engine
//!
//! Tree discovery and multi-root merge.
//!
//! A run lists every root in lock-step ([`builder`]), producing one arena
//! tree ([`tree`]) whose nodes record which roots hold each entry. The merge
//! walk ([`merge`]) then creates missing directories, ranks the copies of
//! every file ([`compare`]) and pushes the freshest one to missing or stale
//! roots ([`transfer`]). Each side effect is reported as an
//! [`OutcomeEvent`] to an [`EventSink`].
//!
//! Call [`run`] (or [`run_profile`]) to do both passes for a set of roots.

pub mod builder;
pub mod compare;
pub mod error;
pub mod event;
pub mod exclusion;
pub mod frontier;
pub mod fs;
pub mod merge;
pub mod pipeline;
pub mod transfer;
pub mod tree;

pub use error::{EngineError, TransferError};
pub use event::{EventKind, EventSink, OutcomeEvent};
pub use exclusion::{ExclusionPolicy, NoExclusions, RuleSetPolicy};
pub use frontier::Frontier;
pub use fs::{FileSystem, LocalFs};
pub use pipeline::{run, run_profile, run_with, RunReport};
pub use tree::{NodeId, SyncNode, SyncTree};

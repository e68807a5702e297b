//! Error types for multisync-engine.

use std::path::PathBuf;

use thiserror::Error;

use multisync_core::RuleKind;

/// Run-level failures. Per-entry filesystem failures never surface here;
/// they become failed [`OutcomeEvent`](crate::OutcomeEvent)s instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A filter or blacklist pattern is not a valid glob.
    #[error("invalid {kind} pattern '{pattern}': {source}")]
    InvalidPattern {
        kind: RuleKind,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A configured root exists but is not a directory.
    #[error("root {path} is not a directory")]
    RootNotDirectory { path: PathBuf },

    /// Fewer than two roots exist on disk, so there is nothing to mirror.
    #[error("need at least 2 available roots to sync, found {available}")]
    NotEnoughRoots { available: usize },
}

/// Failure of a single transfer step, carrying the primitive's error.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not back up {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not replace {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

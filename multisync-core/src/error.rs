//! Error types for multisync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from profile and rule-group operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse profile at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.multisync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The profile YAML file did not exist at the expected path.
    #[error("profile not found at {path}")]
    ProfileNotFound { path: PathBuf },

    /// `init` was asked to create a profile that is already registered.
    #[error("profile '{name}' already exists")]
    ProfileExists { name: String },

    /// Profile names become file names; separators and empty names are rejected.
    #[error("invalid profile name '{name}'")]
    InvalidName { name: String },

    /// A sync set needs at least two roots to mirror anything.
    #[error("a profile needs at least 2 roots, got {count}")]
    TooFewRoots { count: usize },

    /// The same folder was registered twice in one profile.
    #[error("root {path} is already part of the profile")]
    DuplicateRoot { path: PathBuf },

    /// A key/value settings map could not be turned back into a rule group.
    #[error("invalid rule settings: {0}")]
    InvalidSettings(String),
}

use thiserror::Error;

/// Error surface for the worker and the watch loop.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// A worker thread or the async runtime could not be started.
    #[error("could not start {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("profile error: {0}")]
    Profile(#[from] multisync_core::ProfileError),

    #[error("sync error: {0}")]
    Engine(#[from] multisync_engine::EngineError),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("no root of profile '{profile}' can be watched")]
    NothingToWatch { profile: String },
}

pub(crate) fn spawn_err(name: impl Into<String>, source: std::io::Error) -> DaemonError {
    DaemonError::Spawn {
        name: name.into(),
        source,
    }
}

//! Background execution for multisync: the [`Worker`] that runs one sync off
//! the caller's thread, and the watch loop that re-runs a profile after
//! debounced filesystem changes.

mod error;
pub mod paths;
mod runtime;
mod worker;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, start_blocking, watch};
pub use worker::{Priority, Worker, WorkerHandle};

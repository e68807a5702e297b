//! Background worker: one build + merge run off the caller's thread.
//!
//! Events stream through an unbounded channel while the run progresses; the
//! completion signal is a oneshot sent after the event sender has been
//! dropped, so a receiver that drains events until `None` and then awaits
//! completion has seen every event of the run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use multisync_core::Profile;
use multisync_engine::{run_profile, EngineError, EventSink, OutcomeEvent, RunReport};

use crate::error::{spawn_err, DaemonError};

/// Scheduling hint for a run. Recorded on the worker thread and its span;
/// the OS priority is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Idle,
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
    TimeCritical,
}

impl Priority {
    pub const ALL: [Priority; 7] = [
        Priority::Idle,
        Priority::Lowest,
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Highest,
        Priority::TimeCritical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Idle => "idle",
            Priority::Lowest => "lowest",
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Highest => "highest",
            Priority::TimeCritical => "time_critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| format!("unknown priority '{s}'"))
    }
}

/// Forwards engine events into a tokio channel.
struct ChannelSink(mpsc::UnboundedSender<OutcomeEvent>);

impl EventSink for ChannelSink {
    fn emit(&mut self, event: OutcomeEvent) {
        if self.0.send(event).is_err() {
            tracing::debug!("worker handle dropped; discarding event");
        }
    }
}

pub struct Worker {
    profile: Profile,
}

impl Worker {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    /// Launch the run on a dedicated thread.
    pub fn start(self, priority: Priority) -> Result<WorkerHandle, DaemonError> {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (done_tx, done) = oneshot::channel();
        let profile = self.profile;
        let thread_name = format!("multisync-{}-{}", profile.name, priority);

        std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let span = tracing::info_span!("worker", profile = %profile.name, %priority);
                let _guard = span.enter();
                tracing::info!(roots = profile.roots.len(), "run started");

                let mut sink = ChannelSink(event_tx);
                let result = run_profile(&profile, &mut sink);
                drop(sink);

                match &result {
                    Ok(report) => tracing::info!(
                        changes = report.changes(),
                        failures = report.failures,
                        duration_ms = report.duration_ms,
                        "run finished",
                    ),
                    Err(err) => tracing::error!(error = %err, "run aborted"),
                }
                let _ = done_tx.send(result);
            })
            .map_err(|e| spawn_err(thread_name, e))?;

        Ok(WorkerHandle { events, done })
    }
}

/// Caller's end of a running [`Worker`].
pub struct WorkerHandle {
    events: mpsc::UnboundedReceiver<OutcomeEvent>,
    done: oneshot::Receiver<Result<RunReport, EngineError>>,
}

impl WorkerHandle {
    /// Next outcome event; `None` once the run has emitted its last one.
    pub async fn next_event(&mut self) -> Option<OutcomeEvent> {
        self.events.recv().await
    }

    /// Wait for the completion signal. Events not yet received are dropped.
    pub async fn finished(self) -> Result<RunReport, DaemonError> {
        let result = self
            .done
            .await
            .map_err(|_| DaemonError::ChannelClosed("worker completion"))?;
        Ok(result?)
    }

    /// Drain every event, then wait for completion.
    pub async fn collect(mut self) -> Result<(Vec<OutcomeEvent>, RunReport), DaemonError> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        let report = self.finished().await?;
        Ok((events, report))
    }
}

//! Outcome events and the sink they are delivered to.

use std::path::PathBuf;
use std::sync::mpsc;

use serde::Serialize;

use multisync_core::RootId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FolderCreated,
    FileCopied,
    FileUpdated,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::FolderCreated => write!(f, "folder created"),
            EventKind::FileCopied => write!(f, "file copied"),
            EventKind::FileUpdated => write!(f, "file updated"),
        }
    }
}

/// Record of one completed or failed filesystem operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeEvent {
    pub kind: EventKind,
    /// File the content came from; `None` for folder creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub dest: PathBuf,
    /// Root that `dest` belongs to.
    pub root: RootId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The operation was only planned, nothing was written.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

impl OutcomeEvent {
    pub fn folder_created(dest: PathBuf, root: RootId) -> Self {
        Self {
            kind: EventKind::FolderCreated,
            source: None,
            dest,
            root,
            success: true,
            error: None,
            dry_run: false,
        }
    }

    pub fn transfer(kind: EventKind, source: PathBuf, dest: PathBuf, root: RootId) -> Self {
        Self {
            kind,
            source: Some(source),
            dest,
            root,
            success: true,
            error: None,
            dry_run: false,
        }
    }

    /// Mark this event as failed with the primitive's error text.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn planned(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Receiver of outcome events, in the order the merge walk produces them.
///
/// Implementations that hand events to another thread are responsible for
/// their own synchronisation; the engine only calls `emit` from the thread
/// running the merge.
pub trait EventSink {
    fn emit(&mut self, event: OutcomeEvent);
}

impl EventSink for Vec<OutcomeEvent> {
    fn emit(&mut self, event: OutcomeEvent) {
        self.push(event);
    }
}

impl EventSink for mpsc::Sender<OutcomeEvent> {
    fn emit(&mut self, event: OutcomeEvent) {
        if self.send(event).is_err() {
            tracing::debug!("event receiver dropped; discarding outcome event");
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: OutcomeEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_carries_error_text() {
        let event = OutcomeEvent::folder_created(PathBuf::from("/b/sub"), RootId(1))
            .failed("Permission denied");
        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("Permission denied"));
        assert!(event.source.is_none());
    }

    #[test]
    fn std_channel_sink_delivers_across_threads() {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            let mut sink = tx;
            sink.emit(OutcomeEvent::transfer(
                EventKind::FileCopied,
                PathBuf::from("/a/x"),
                PathBuf::from("/b/x"),
                RootId(1),
            ));
        });
        handle.join().unwrap();
        let event = rx.recv().unwrap();
        assert_eq!(event.kind, EventKind::FileCopied);
    }

    #[test]
    fn closed_channel_does_not_panic() {
        let (mut tx, rx) = mpsc::channel::<OutcomeEvent>();
        drop(rx);
        tx.emit(OutcomeEvent::folder_created(PathBuf::from("/x"), RootId(0)));
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use multisync_core::Profile;
use multisync_engine::transfer::tmp_path;

use crate::error::{spawn_err, DaemonError};
use crate::paths::{is_transfer_tmp, DEBOUNCE_RETENTION, DEBOUNCE_WINDOW};
use crate::worker::{Priority, Worker};

/// Watch a profile in the foreground and block the current thread until
/// ctrl-c.
pub fn start_blocking(profile: Profile) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| spawn_err("tokio-runtime", e))?;
    runtime.block_on(run(profile))
}

/// Watch a profile until ctrl-c.
pub async fn run(profile: Profile) -> Result<(), DaemonError> {
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(4);

    let watch_handle = {
        let shutdown = shutdown_tx.clone();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = watch(profile, rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    tokio::select! {
        _ = shutdown_rx.recv() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                tracing::warn!(error = %err, "ctrl-c handler failed");
            }
            tracing::info!("shutting down watcher");
            let _ = shutdown_tx.send(());
        }
    }

    match watch_handle.await {
        Ok(result) => result,
        Err(_) => Err(DaemonError::ChannelClosed("watch task")),
    }
}

/// Run the profile once, then again after every debounced change under any
/// of its roots, until `shutdown` fires.
///
/// Paths written by a run are fed into the debounce table, so the watcher
/// does not re-trigger on its own copies.
pub async fn watch(profile: Profile, mut shutdown: broadcast::Receiver<()>) -> Result<(), DaemonError> {
    let profile = canonical_roots(profile);
    let backup_dir = profile
        .options
        .backup_dir
        .as_ref()
        .map(|dir| fs::canonicalize(dir).unwrap_or_else(|_| dir.clone()));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut _watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;

    let mut watched = 0usize;
    for root in &profile.roots {
        if !root.path.is_dir() {
            tracing::warn!(root = %root.id, path = %root.path.display(), "root unavailable, not watching");
            continue;
        }
        _watcher.watch(&root.path, RecursiveMode::Recursive)?;
        tracing::debug!(path = %root.path.display(), "watching root");
        watched += 1;
    }
    if watched == 0 {
        return Err(DaemonError::NothingToWatch {
            profile: profile.name.to_string(),
        });
    }

    let mut debounce = HashMap::<PathBuf, Instant>::new();
    run_once(&profile, &mut debounce).await;

    let mut due: Option<Instant> = None;
    loop {
        let pending = async move {
            match due {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown.recv() => break,
            _ = pending => {
                due = None;
                run_once(&profile, &mut debounce).await;
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                let now = Instant::now();
                let triggered = event
                    .paths
                    .iter()
                    .filter(|path| !is_transfer_tmp(path))
                    .filter(|path| !backup_dir.as_ref().is_some_and(|dir| path.starts_with(dir)))
                    .any(|path| should_process_event(&mut debounce, path, now));
                if triggered {
                    due = Some(now + DEBOUNCE_WINDOW);
                }
            }
        }
    }

    Ok(())
}

async fn run_once(profile: &Profile, debounce: &mut HashMap<PathBuf, Instant>) {
    let handle = match Worker::new(profile.clone()).start(Priority::Low) {
        Ok(handle) => handle,
        Err(err) => {
            tracing::error!(error = %err, "could not start worker");
            return;
        }
    };

    match handle.collect().await {
        Ok((events, report)) => {
            let now = Instant::now();
            for event in &events {
                debounce.insert(event.dest.clone(), now);
                debounce.insert(tmp_path(&event.dest), now);
            }
            for event in events.iter().filter(|e| !e.success) {
                tracing::warn!(
                    kind = %event.kind,
                    dest = %event.dest.display(),
                    error = event.error.as_deref().unwrap_or(""),
                    "operation failed",
                );
            }
            tracing::info!(
                profile = %profile.name,
                changes = report.changes(),
                failures = report.failures,
                skipped = report.skipped,
                duration_ms = report.duration_ms,
                "watch-triggered sync completed",
            );
        }
        Err(err) => tracing::error!(profile = %profile.name, error = %err, "watch-triggered sync failed"),
    }
}

/// Notify reports canonical paths; the roots must match them for the
/// debounce table to recognise a run's own writes.
fn canonical_roots(mut profile: Profile) -> Profile {
    for root in &mut profile.roots {
        if let Ok(canonical) = fs::canonicalize(&root.path) {
            root.path = canonical;
        }
    }
    profile
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn should_process_event(debounce: &mut HashMap<PathBuf, Instant>, path: &Path, now: Instant) -> bool {
    should_process_event_with_threshold(debounce, path, now, DEBOUNCE_WINDOW)
}

fn should_process_event_with_threshold(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
    threshold: Duration,
) -> bool {
    debounce.retain(|_, seen_at| now.duration_since(*seen_at) <= DEBOUNCE_RETENTION);
    match debounce.get(path) {
        Some(last_seen) if now.duration_since(*last_seen) < threshold => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}

/// Install the fmt subscriber; engine `log` records are bridged into it.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisync_core::ProfileName;
    use notify::event::{AccessKind, CreateKind};
    use tempfile::TempDir;
    use tokio::time::advance;

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn debounce_coalesces_rapid_events() {
        let threshold = Duration::from_millis(100);
        let mut debounce = HashMap::<PathBuf, Instant>::new();
        let path = PathBuf::from("/tmp/root0/notes.txt");
        let mut triggers = 0usize;

        for _ in 0..5 {
            if should_process_event_with_threshold(&mut debounce, &path, Instant::now(), threshold) {
                triggers += 1;
            }
            advance(Duration::from_millis(10)).await;
        }
        assert_eq!(triggers, 1, "rapid saves should collapse to one trigger");

        advance(Duration::from_millis(150)).await;
        assert!(should_process_event_with_threshold(
            &mut debounce,
            &path,
            Instant::now(),
            threshold
        ));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn freshly_written_paths_are_absorbed() {
        let mut debounce = HashMap::<PathBuf, Instant>::new();
        let written = PathBuf::from("/r1/copied.txt");
        debounce.insert(written.clone(), Instant::now());

        advance(Duration::from_millis(100)).await;
        assert!(!should_process_event(&mut debounce, &written, Instant::now()));
        assert!(should_process_event(
            &mut debounce,
            Path::new("/r1/user-edit.txt"),
            Instant::now()
        ));
    }

    #[test]
    fn access_events_are_ignored() {
        assert!(is_relevant_event_kind(&EventKind::Create(CreateKind::File)));
        assert!(!is_relevant_event_kind(&EventKind::Access(AccessKind::Any)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn watch_syncs_at_start_and_after_changes() {
        let tmp = TempDir::new().expect("tmp");
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        fs::create_dir_all(&a).expect("mkdir a");
        fs::create_dir_all(&b).expect("mkdir b");
        fs::write(a.join("before.txt"), "before").expect("write");
        let profile = Profile::new(ProfileName::from("watched"), vec![a.clone(), b.clone()])
            .expect("profile");

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(watch(profile, shutdown_rx));

        assert!(wait_for(&b.join("before.txt")).await, "initial run copies");

        fs::write(a.join("after.txt"), "after").expect("write");
        assert!(wait_for(&b.join("after.txt")).await, "change triggers a run");

        shutdown_tx.send(()).expect("shutdown");
        task.await.expect("join").expect("watch");
    }

    async fn wait_for(path: &Path) -> bool {
        for _ in 0..100 {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    #[tokio::test]
    async fn watch_without_any_root_fails() {
        let tmp = TempDir::new().expect("tmp");
        let profile = Profile::new(
            ProfileName::from("ghost"),
            vec![tmp.path().join("x"), tmp.path().join("y")],
        )
        .expect("profile");
        let (_tx, rx) = broadcast::channel(1);
        let err = watch(profile, rx).await.unwrap_err();
        assert!(matches!(err, DaemonError::NothingToWatch { .. }));
    }
}

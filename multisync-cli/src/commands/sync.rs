//! `multisync sync`: mirror a profile's roots once.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use multisync_daemon::{Priority, Worker};
use multisync_engine::{EventKind, OutcomeEvent, RunReport};

use super::profile::load;

/// Arguments for `multisync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Profile to run.
    pub profile: String,

    /// Show what would be created, copied or updated without touching any root.
    #[arg(long)]
    pub dry_run: bool,

    /// Print events and the run report as one JSON document.
    #[arg(long)]
    pub json: bool,

    /// Scheduling hint for the worker thread.
    #[arg(long, default_value = "normal")]
    pub priority: Priority,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    profile: &'a str,
    events: &'a [OutcomeEvent],
    report: &'a RunReport,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let mut profile = load(&self.profile)?;
        if self.dry_run {
            profile.options.dry_run = true;
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        let json = self.json;
        let prefix = if profile.options.dry_run { "[dry-run] " } else { "" };
        let (events, report) = runtime.block_on(async {
            let mut handle = Worker::new(profile).start(self.priority)?;
            let mut events = Vec::new();
            while let Some(event) = handle.next_event().await {
                if !json {
                    print_event(prefix, &event);
                }
                events.push(event);
            }
            let report = handle.finished().await?;
            anyhow::Ok((events, report))
        })
        .with_context(|| format!("sync failed for '{}'", self.profile))?;

        if json {
            let out = JsonOutput {
                profile: &self.profile,
                events: &events,
                report: &report,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&out).context("failed to encode report")?
            );
        } else {
            print_summary(prefix, &self.profile, &report);
        }

        if report.failures > 0 {
            bail!(
                "{} operation(s) failed while syncing '{}'",
                report.failures,
                self.profile
            );
        }
        Ok(())
    }
}

fn print_event(prefix: &str, event: &OutcomeEvent) {
    let symbol = match (event.success, event.kind) {
        (false, _) => "✗".red(),
        (true, EventKind::FolderCreated) => "+".green(),
        (true, EventKind::FileCopied) => "→".green(),
        (true, EventKind::FileUpdated) => "✎".cyan(),
    };
    match &event.error {
        Some(error) => println!(
            "{prefix}  {symbol}  {} {} ({})",
            event.kind,
            event.dest.display(),
            error.red()
        ),
        None => println!("{prefix}  {symbol}  {} {}", event.kind, event.dest.display()),
    }
}

fn print_summary(prefix: &str, profile: &str, report: &RunReport) {
    if report.changes() == 0 && report.failures == 0 {
        println!("{prefix}✓ '{profile}' is up to date");
    } else {
        println!(
            "{prefix}✓ '{profile}' synced ({} folders, {} copied, {} updated, {} failed)",
            report.folders_created, report.files_copied, report.files_updated, report.failures
        );
    }
    if report.skipped > 0 {
        println!("  {} entries excluded by rules", report.skipped);
    }
    if report.conflicts > 0 {
        println!(
            "  {} {} names are a file in one root and a folder in another",
            "!".yellow(),
            report.conflicts
        );
    }
    for id in &report.unavailable_roots {
        println!("  {} root {id} was unavailable", "!".yellow());
    }
}

//! `multisync watch`: keep a profile mirrored until ctrl-c.

use anyhow::{Context, Result};
use clap::Args;

use super::profile::load;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Profile to watch.
    pub profile: String,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let profile = load(&self.profile)?;
        println!(
            "Watching {} roots of '{}' (ctrl-c to stop)",
            profile.roots.len(),
            profile.name
        );
        multisync_daemon::start_blocking(profile)
            .with_context(|| format!("watch failed for '{}'", self.profile))
    }
}

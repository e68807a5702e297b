//! `multisync rule add|remove|list`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use multisync_core::{registry, ProfileName, RuleKind};

use super::profile::load;

#[derive(Subcommand, Debug)]
pub enum RuleCommand {
    /// Add a pattern to a profile's filters or blacklist.
    Add(RuleArgs),

    /// Drop a pattern from a profile's filters or blacklist.
    Remove(RuleArgs),

    /// Print a profile's patterns.
    List {
        /// Profile name.
        profile: String,

        /// Only show this group (filters | blacklist).
        #[arg(long)]
        kind: Option<RuleKind>,
    },
}

#[derive(Args, Debug)]
pub struct RuleArgs {
    /// Profile name.
    pub profile: String,

    /// Which group to edit: filters | blacklist.
    #[arg(long)]
    pub kind: RuleKind,

    /// Wildcard for filters; name or relative path for the blacklist.
    pub pattern: String,
}

pub fn run(cmd: RuleCommand) -> Result<()> {
    match cmd {
        RuleCommand::Add(args) => add(args),
        RuleCommand::Remove(args) => remove(args),
        RuleCommand::List { profile, kind } => list(&profile, kind),
    }
}

fn add(args: RuleArgs) -> Result<()> {
    let mut added = false;
    registry::update_profile(&ProfileName::from(args.profile.clone()), |profile| {
        added = profile.rules_mut(args.kind).add_item(args.pattern.clone());
        Ok(())
    })
    .with_context(|| format!("failed to update profile '{}'", args.profile))?;

    if added {
        println!("✓ Added '{}' to {} of '{}'", args.pattern, args.kind, args.profile);
    } else {
        println!(
            "{} '{}' is already in {} of '{}'",
            "!".yellow(),
            args.pattern,
            args.kind,
            args.profile
        );
    }
    Ok(())
}

fn remove(args: RuleArgs) -> Result<()> {
    let mut present = false;
    registry::update_profile(&ProfileName::from(args.profile.clone()), |profile| {
        let group = profile.rules_mut(args.kind);
        present = group.iter().any(|item| item == args.pattern);
        group.remove_item(&args.pattern);
        Ok(())
    })
    .with_context(|| format!("failed to update profile '{}'", args.profile))?;

    if present {
        println!("✓ Removed '{}' from {} of '{}'", args.pattern, args.kind, args.profile);
    } else {
        println!(
            "{} '{}' was not in {} of '{}'",
            "!".yellow(),
            args.pattern,
            args.kind,
            args.profile
        );
    }
    Ok(())
}

fn list(profile: &str, kind: Option<RuleKind>) -> Result<()> {
    let profile = load(profile)?;
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => vec![RuleKind::Filters, RuleKind::Blacklist],
    };
    for kind in kinds {
        let group = profile.rules(kind);
        println!("{} ({})", kind.to_string().bold(), group.name);
        if group.is_empty() {
            println!("  {}", "none".dimmed());
        }
        for item in group.iter() {
            println!("  {item}");
        }
    }
    Ok(())
}

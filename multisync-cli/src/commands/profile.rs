//! `multisync profile init|list|show|add-root|remove`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use multisync_core::{registry, Profile, ProfileName, Ranking};

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Create a profile mirroring two or more folders.
    Init(InitArgs),

    /// List stored profiles.
    List,

    /// Print one profile's roots, rules and options.
    Show {
        /// Profile name.
        name: String,
    },

    /// Add another folder to an existing profile.
    AddRoot {
        /// Profile name.
        name: String,
        /// Folder to add.
        path: PathBuf,
    },

    /// Change sync options of a profile.
    Set(SetArgs),

    /// Delete a profile. The folders themselves are left alone.
    Remove {
        /// Profile name.
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Profile name (letters, digits, `-` and `_`).
    pub name: String,

    /// Folders to keep mirrored, in tie-break order.
    #[arg(required = true, num_args = 2..)]
    pub roots: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Profile name.
    pub name: String,

    /// How the newest copy is chosen: pairwise | by_mtime.
    #[arg(long, value_parser = parse_ranking)]
    pub ranking: Option<Ranking>,

    /// Treat modification times this close (in ms) as equal.
    #[arg(long)]
    pub tolerance_ms: Option<u64>,

    /// Copy replaced files under this folder before overwriting them.
    #[arg(long, conflicts_with = "no_backup")]
    pub backup_dir: Option<PathBuf>,

    /// Stop taking backups.
    #[arg(long)]
    pub no_backup: bool,

    /// Replace stale files via a temporary copy and rename.
    #[arg(long)]
    pub atomic_replace: Option<bool>,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "profile")]
    name: String,
    #[tabled(rename = "roots")]
    roots: usize,
    #[tabled(rename = "filters")]
    filters: usize,
    #[tabled(rename = "blacklist")]
    blacklist: usize,
    #[tabled(rename = "ranking")]
    ranking: String,
    #[tabled(rename = "updated")]
    updated: String,
}

pub fn run(cmd: ProfileCommand) -> Result<()> {
    match cmd {
        ProfileCommand::Init(args) => init(args),
        ProfileCommand::List => list(),
        ProfileCommand::Show { name } => show(&name),
        ProfileCommand::AddRoot { name, path } => add_root(&name, &path),
        ProfileCommand::Set(args) => set(args),
        ProfileCommand::Remove { name } => remove(&name),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let roots = args
        .roots
        .iter()
        .map(|p| absolute(p))
        .collect::<Result<Vec<_>>>()?;
    for root in &roots {
        if !root.is_dir() {
            println!("{} {} does not exist yet", "!".yellow(), root.display());
        }
    }

    let profile = registry::init_profile(ProfileName::from(args.name.clone()), roots)
        .with_context(|| format!("failed to create profile '{}'", args.name))?;

    println!(
        "✓ Created profile '{}' with {} roots",
        profile.name,
        profile.roots.len()
    );
    Ok(())
}

fn list() -> Result<()> {
    let profiles = registry::list_profiles().context("failed to read profiles")?;
    if profiles.is_empty() {
        println!("No profiles yet.");
        println!("Run: multisync profile init <name> <folder> <folder>...");
        return Ok(());
    }

    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|p| ProfileRow {
            name: p.name.to_string(),
            roots: p.roots.len(),
            filters: p.filters.len(),
            blacklist: p.blacklist.len(),
            ranking: p.options.ranking.to_string(),
            updated: p.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn show(name: &str) -> Result<()> {
    let profile = load(name)?;
    print_profile(&profile);
    Ok(())
}

fn add_root(name: &str, path: &Path) -> Result<()> {
    let path = absolute(path)?;
    let mut added = None;
    registry::update_profile(&ProfileName::from(name), |profile| {
        added = Some(profile.add_root(path.clone())?);
        Ok(())
    })
    .with_context(|| format!("failed to add {} to '{name}'", path.display()))?;

    if let Some(id) = added {
        println!("✓ Added root {id} ({}) to '{name}'", path.display());
    }
    Ok(())
}

fn set(args: SetArgs) -> Result<()> {
    let backup_dir = args.backup_dir.as_deref().map(absolute).transpose()?;
    let profile = registry::update_profile(&ProfileName::from(args.name.clone()), |profile| {
        let options = &mut profile.options;
        if let Some(ranking) = args.ranking {
            options.ranking = ranking;
        }
        if let Some(ms) = args.tolerance_ms {
            options.mtime_tolerance_ms = ms;
        }
        if let Some(dir) = backup_dir {
            options.backup_dir = Some(dir);
        }
        if args.no_backup {
            options.backup_dir = None;
        }
        if let Some(atomic) = args.atomic_replace {
            options.atomic_replace = atomic;
        }
        Ok(())
    })
    .with_context(|| format!("failed to update profile '{}'", args.name))?;

    print_profile(&profile);
    Ok(())
}

fn remove(name: &str) -> Result<()> {
    registry::remove_profile(&ProfileName::from(name))
        .with_context(|| format!("failed to remove profile '{name}'"))?;
    println!("✓ Removed profile '{name}'");
    Ok(())
}

pub(crate) fn load(name: &str) -> Result<Profile> {
    registry::load_profile(&ProfileName::from(name)).with_context(|| {
        format!("failed to load profile '{name}' (see `multisync profile list`)")
    })
}

fn print_profile(profile: &Profile) {
    println!("{}", profile.name.to_string().bold());
    println!("roots:");
    for root in &profile.roots {
        let marker = if root.path.is_dir() {
            "●".green()
        } else {
            "●".red()
        };
        println!("  {marker} {:<4} {}", root.id.to_string(), root.path.display());
    }
    for group in [&profile.filters, &profile.blacklist] {
        if group.is_empty() {
            println!("{} ({}): none", group.kind, group.name);
        } else {
            println!("{} ({}): {}", group.kind, group.name, group.data.join(", "));
        }
    }

    let options = &profile.options;
    println!("ranking: {}", options.ranking);
    println!("mtime tolerance: {} ms", options.mtime_tolerance_ms);
    println!("atomic replace: {}", options.atomic_replace);
    match &options.backup_dir {
        Some(dir) => println!("backups: {}", dir.display()),
        None => println!("backups: off"),
    }
}

fn parse_ranking(s: &str) -> std::result::Result<Ranking, String> {
    match s.to_ascii_lowercase().replace('-', "_").as_str() {
        "pairwise" => Ok(Ranking::Pairwise),
        "by_mtime" | "mtime" => Ok(Ranking::ByMtime),
        other => Err(format!("unknown ranking '{other}'; expected: pairwise, by_mtime")),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("could not determine current directory")?;
    Ok(cwd.join(path))
}

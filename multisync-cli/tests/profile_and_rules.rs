use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use multisync_core::{registry, ProfileName, Ranking};
use tempfile::TempDir;

fn multisync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("multisync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1");
    cmd
}

fn folders(workspace: &TempDir, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|n| {
            let p = workspace.path().join(n);
            fs::create_dir_all(&p).expect("mkdir");
            p
        })
        .collect()
}

fn init(home: &TempDir, name: &str, roots: &[PathBuf]) {
    multisync_cmd(home.path())
        .args(["profile", "init", name])
        .args(roots)
        .assert()
        .success()
        .stdout(contains(format!("Created profile '{name}' with {} roots", roots.len())));
}

#[test]
fn init_list_show_and_remove() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let roots = folders(&workspace, &["laptop", "nas"]);

    init(&home, "photos", &roots);

    multisync_cmd(home.path())
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(contains("photos"))
        .stdout(contains("pairwise"));

    multisync_cmd(home.path())
        .args(["profile", "show", "photos"])
        .assert()
        .success()
        .stdout(contains("#0"))
        .stdout(contains("#1"))
        .stdout(contains(roots[1].display().to_string()))
        .stdout(contains("backups: off"));

    multisync_cmd(home.path())
        .args(["profile", "remove", "photos"])
        .assert()
        .success()
        .stdout(contains("Removed profile 'photos'"));

    multisync_cmd(home.path())
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(contains("No profiles yet."));
    assert!(roots.iter().all(|r| r.is_dir()), "folders are left alone");
}

#[test]
fn init_needs_two_roots_and_a_fresh_name() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let roots = folders(&workspace, &["a", "b"]);

    multisync_cmd(home.path())
        .args(["profile", "init", "solo"])
        .arg(&roots[0])
        .assert()
        .failure();

    init(&home, "pair", &roots);
    multisync_cmd(home.path())
        .args(["profile", "init", "pair"])
        .args(&roots)
        .assert()
        .failure()
        .stderr(contains("already exists"));
}

#[test]
fn add_root_assigns_the_next_id() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let roots = folders(&workspace, &["a", "b", "c"]);
    init(&home, "docs", &roots[..2]);

    multisync_cmd(home.path())
        .args(["profile", "add-root", "docs"])
        .arg(&roots[2])
        .assert()
        .success()
        .stdout(contains("Added root #2"));

    multisync_cmd(home.path())
        .args(["profile", "add-root", "docs"])
        .arg(&roots[2])
        .assert()
        .failure()
        .stderr(contains("already part of the profile"));

    let profile = registry::load_profile_at(home.path(), &ProfileName::from("docs")).expect("load");
    assert_eq!(profile.roots.len(), 3);
    assert_eq!(profile.roots[2].path, roots[2]);
}

#[test]
fn set_updates_sync_options() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let roots = folders(&workspace, &["a", "b"]);
    let backups = workspace.path().join("backups");
    init(&home, "work", &roots);

    multisync_cmd(home.path())
        .args(["profile", "set", "work", "--ranking", "by-mtime", "--tolerance-ms", "2000"])
        .arg("--backup-dir")
        .arg(&backups)
        .args(["--atomic-replace", "false"])
        .assert()
        .success()
        .stdout(contains("ranking: by_mtime"));

    let profile = registry::load_profile_at(home.path(), &ProfileName::from("work")).expect("load");
    assert_eq!(profile.options.ranking, Ranking::ByMtime);
    assert_eq!(profile.options.mtime_tolerance_ms, 2000);
    assert_eq!(profile.options.backup_dir.as_deref(), Some(backups.as_path()));
    assert!(!profile.options.atomic_replace);

    multisync_cmd(home.path())
        .args(["profile", "set", "work", "--no-backup"])
        .assert()
        .success()
        .stdout(contains("backups: off"));

    multisync_cmd(home.path())
        .args(["profile", "set", "work", "--ranking", "random"])
        .assert()
        .failure();
}

#[test]
fn rules_can_be_added_listed_and_removed() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let roots = folders(&workspace, &["a", "b"]);
    init(&home, "code", &roots);

    multisync_cmd(home.path())
        .args(["rule", "add", "code", "--kind", "blacklist", "target"])
        .assert()
        .success()
        .stdout(contains("Added 'target' to blacklist of 'code'"));
    multisync_cmd(home.path())
        .args(["rule", "add", "code", "--kind", "blacklist", "target"])
        .assert()
        .success()
        .stdout(contains("already in blacklist"));
    multisync_cmd(home.path())
        .args(["rule", "add", "code", "--kind", "filter", "*.rs"])
        .assert()
        .success();

    multisync_cmd(home.path())
        .args(["rule", "list", "code"])
        .assert()
        .success()
        .stdout(contains("filters (Filter #1)"))
        .stdout(contains("*.rs"))
        .stdout(contains("blacklist (Blacklist)"))
        .stdout(contains("target"));

    let profile = registry::load_profile_at(home.path(), &ProfileName::from("code")).expect("load");
    assert_eq!(profile.blacklist.data, vec!["target".to_string()]);
    assert_eq!(profile.filters.data, vec!["*.rs".to_string()]);

    multisync_cmd(home.path())
        .args(["rule", "remove", "code", "--kind", "blacklist", "target"])
        .assert()
        .success()
        .stdout(contains("Removed 'target'"));
    multisync_cmd(home.path())
        .args(["rule", "list", "code", "--kind", "blacklist"])
        .assert()
        .success()
        .stdout(contains("none"));
}

#[test]
fn unknown_rule_kind_is_rejected() {
    let home = TempDir::new().expect("home");
    let workspace = TempDir::new().expect("workspace");
    let roots = folders(&workspace, &["a", "b"]);
    init(&home, "code", &roots);

    multisync_cmd(home.path())
        .args(["rule", "add", "code", "--kind", "whitelist", "*.rs"])
        .assert()
        .failure()
        .stderr(contains("unknown rule type"));
}

//! Per-profile YAML store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.multisync/
//!   profiles/
//!     <profile_name>.yaml   (one file per profile, mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::ProfileError;
use crate::types::{Profile, ProfileName};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.multisync/profiles/`. Pure, no I/O.
pub fn profiles_root_at(home: &Path) -> PathBuf {
    home.join(".multisync").join("profiles")
}

/// `<home>/.multisync/profiles/`
///
/// Creates the directory (mode `0700`) if it does not yet exist.
pub fn profiles_dir_at(home: &Path) -> Result<PathBuf, ProfileError> {
    let dir = profiles_root_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

/// `<home>/.multisync/profiles/<name>.yaml`. Pure, no I/O.
pub fn profile_path_at(home: &Path, name: &ProfileName) -> PathBuf {
    profiles_root_at(home).join(format!("{}.yaml", name.0))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load a single profile from `<home>/.multisync/profiles/<name>.yaml`.
///
/// Returns `ProfileError::ProfileNotFound` if absent,
/// `ProfileError::Parse` (with path + line context) if malformed YAML.
pub fn load_profile_at(home: &Path, name: &ProfileName) -> Result<Profile, ProfileError> {
    let path = profile_path_at(home, name);
    if !path.exists() {
        return Err(ProfileError::ProfileNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ProfileError::Parse { path, source: e })
}

/// `load_profile_at` convenience wrapper.
pub fn load_profile(name: &ProfileName) -> Result<Profile, ProfileError> {
    load_profile_at(&home()?, name)
}

/// Return every stored profile, sorted by name.
///
/// Leftover `.yaml.tmp` files from an interrupted save are ignored.
pub fn list_profiles_at(home: &Path) -> Result<Vec<Profile>, ProfileError> {
    let dir = profiles_root_at(home);
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut entries: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut profiles = Vec::new();
    for entry in entries {
        let fname = entry.file_name();
        if !fname.to_string_lossy().ends_with(".yaml") {
            continue;
        }
        let contents = std::fs::read_to_string(entry.path())?;
        let profile: Profile = serde_yaml::from_str(&contents).map_err(|e| ProfileError::Parse {
            path: entry.path(),
            source: e,
        })?;
        profiles.push(profile);
    }
    Ok(profiles)
}

/// `list_profiles_at` convenience wrapper.
pub fn list_profiles() -> Result<Vec<Profile>, ProfileError> {
    list_profiles_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save a profile to `<home>/.multisync/profiles/<name>.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_profile_at(home: &Path, profile: &Profile) -> Result<(), ProfileError> {
    validate_name(&profile.name)?;
    profiles_dir_at(home)?;
    let path = profile_path_at(home, &profile.name);
    let tmp_path = path.with_file_name(format!("{}.yaml.tmp", profile.name.0));

    let yaml = serde_yaml::to_string(profile)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_profile_at` convenience wrapper.
pub fn save_profile(profile: &Profile) -> Result<(), ProfileError> {
    save_profile_at(&home()?, profile)
}

// ---------------------------------------------------------------------------
// 4. Init / remove
// ---------------------------------------------------------------------------

/// Create and persist a new profile mirroring `roots`.
///
/// Fails with `ProfileExists` rather than silently replacing a stored profile.
pub fn init_profile_at(
    home: &Path,
    name: ProfileName,
    roots: Vec<PathBuf>,
) -> Result<Profile, ProfileError> {
    validate_name(&name)?;
    if profile_path_at(home, &name).exists() {
        return Err(ProfileError::ProfileExists { name: name.0 });
    }
    let profile = Profile::new(name, roots)?;
    save_profile_at(home, &profile)?;
    Ok(profile)
}

/// `init_profile_at` convenience wrapper.
pub fn init_profile(name: ProfileName, roots: Vec<PathBuf>) -> Result<Profile, ProfileError> {
    init_profile_at(&home()?, name, roots)
}

/// Load, mutate and save a profile in one step, bumping `updated_at`.
pub fn update_profile_at<F>(home: &Path, name: &ProfileName, f: F) -> Result<Profile, ProfileError>
where
    F: FnOnce(&mut Profile) -> Result<(), ProfileError>,
{
    let mut profile = load_profile_at(home, name)?;
    f(&mut profile)?;
    profile.updated_at = Utc::now();
    save_profile_at(home, &profile)?;
    Ok(profile)
}

/// `update_profile_at` convenience wrapper.
pub fn update_profile<F>(name: &ProfileName, f: F) -> Result<Profile, ProfileError>
where
    F: FnOnce(&mut Profile) -> Result<(), ProfileError>,
{
    update_profile_at(&home()?, name, f)
}

/// Delete a stored profile. The mirrored folders themselves are untouched.
pub fn remove_profile_at(home: &Path, name: &ProfileName) -> Result<(), ProfileError> {
    let path = profile_path_at(home, name);
    if !path.exists() {
        return Err(ProfileError::ProfileNotFound { path });
    }
    std::fs::remove_file(&path)?;
    Ok(())
}

/// `remove_profile_at` convenience wrapper.
pub fn remove_profile(name: &ProfileName) -> Result<(), ProfileError> {
    remove_profile_at(&home()?, name)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ProfileError> {
    dirs::home_dir().ok_or(ProfileError::HomeNotFound)
}

fn validate_name(name: &ProfileName) -> Result<(), ProfileError> {
    let bad = name.0.is_empty()
        || name.0 == "."
        || name.0 == ".."
        || name.0.contains(['/', '\\']);
    if bad {
        return Err(ProfileError::InvalidName {
            name: name.0.clone(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ProfileError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ProfileError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ProfileError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ProfileError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

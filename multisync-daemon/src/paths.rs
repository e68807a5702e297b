use std::path::Path;
use std::time::Duration;

use multisync_engine::transfer::TMP_SUFFIX;

/// Quiet period after the last relevant change before a watch run starts.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// How long a path stays in the debounce table.
pub const DEBOUNCE_RETENTION: Duration = Duration::from_secs(30);

/// Temporary sibling left by an atomic update.
pub fn is_transfer_tmp(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(TMP_SUFFIX))
        .unwrap_or(false)
}

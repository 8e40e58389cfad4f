use std::fs::{self, File};
use std::path::Path;
use std::time::SystemTime;

/// Creates the parent directories of `path` if it has any.
pub fn prepare_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Resets the modification time of a produced output to the Unix epoch so build caches
/// only ever see content changes.
pub fn stamp_epoch(path: &Path) -> std::io::Result<()> {
    let file = File::options().write(true).open(path)?;
    file.set_modified(SystemTime::UNIX_EPOCH)
}

/// Converts a root-relative path to a `/`-separated entry name.
pub fn to_entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

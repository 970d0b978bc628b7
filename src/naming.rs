use crate::error::ExportError;
use crate::Result;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Joins the backup prefix and the original file name
pub const PREFIX_SEPARATOR: &str = "_";

/// Build the backup file name `<prefix>_<file_name>`
pub fn backup_file_name(prefix: &str, file_name: &OsStr) -> OsString {
    let mut name = OsString::with_capacity(prefix.len() + PREFIX_SEPARATOR.len() + file_name.len());
    name.push(prefix);
    name.push(PREFIX_SEPARATOR);
    name.push(file_name);
    name
}

/// Resolve where the backup of `file_name` lands inside `destination`.
///
/// Pure path arithmetic: nothing is checked on disk.
pub fn backup_path(destination: &Path, prefix: &str, file_name: &OsStr) -> PathBuf {
    destination.join(backup_file_name(prefix, file_name))
}

/// Reject prefixes that would move the backup out of its directory or produce
/// names most filesystems refuse.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(ExportError::validation("Backup prefix must not be empty"));
    }

    const SEPARATORS: &[char] = &['/', '\\'];
    let bad: String = prefix.chars().filter(|c| SEPARATORS.contains(c)).collect();
    if !bad.is_empty() {
        return Err(ExportError::validation(format!(
            "Backup prefix contains path separators: {bad}"
        )));
    }

    if prefix.chars().any(|c| c.is_control()) {
        return Err(ExportError::validation(
            "Backup prefix contains control characters",
        ));
    }

    Ok(())
}

/// Check that a generated backup name fits within `max_length` bytes
pub fn validate_backup_name(name: &OsStr, max_length: usize) -> Result<()> {
    if name.len() > max_length {
        return Err(ExportError::validation(format!(
            "Backup filename too long: {} chars (max: {max_length})",
            name.len()
        )));
    }
    Ok(())
}

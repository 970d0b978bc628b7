use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Substring marking transient database-engine files that are never exported.
pub const JOURNAL_MARKER: &str = "journal";

/// A file name discovered directly inside the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: OsString,
}

impl SourceFile {
    pub fn new(name: impl Into<OsString>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Lossy display form, for logs and messages
    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

/// Check whether an entry name belongs to a journal file
pub fn is_journal(name: &OsStr) -> bool {
    name.to_string_lossy().contains(JOURNAL_MARKER)
}

/// List the exportable entries directly inside `dir`, in filesystem order.
///
/// An unreadable directory yields an empty list: nothing to export is not an
/// error. Entries that fail to read are skipped. No recursion.
pub fn list_source_files(dir: &Path) -> Vec<SourceFile> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                directory = %dir.display(),
                error = %e,
                "Source directory cannot be listed, treating as empty"
            );
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(directory = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        let name = entry.file_name();
        if is_journal(&name) {
            debug!(name = %name.to_string_lossy(), "Skipping journal file");
            continue;
        }
        files.push(SourceFile::new(name));
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn names(files: &[SourceFile]) -> Vec<String> {
        let mut names: Vec<String> = files.iter().map(|f| f.display_name()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_journal_files_are_filtered() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("app.db")).unwrap();
        File::create(dir.path().join("app.db-journal")).unwrap();
        File::create(dir.path().join("cache.db")).unwrap();
        File::create(dir.path().join("journal")).unwrap();

        let files = list_source_files(dir.path());
        assert_eq!(names(&files), vec!["app.db", "cache.db"]);
        assert!(files.iter().all(|f| !f.display_name().contains("journal")));
    }

    #[test]
    fn test_journal_match_is_case_sensitive() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("app.db-JOURNAL")).unwrap();

        let files = list_source_files(dir.path());
        assert_eq!(names(&files), vec!["app.db-JOURNAL"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let files = list_source_files(&dir.path().join("does-not-exist"));
        assert!(files.is_empty());
    }

    #[test]
    fn test_file_instead_of_directory_is_empty() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.db");
        File::create(&file).unwrap();

        assert!(list_source_files(&file).is_empty());
    }

    #[test]
    fn test_no_recursion() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        File::create(nested.join("inner.db")).unwrap();
        File::create(dir.path().join("outer.db")).unwrap();

        let files = list_source_files(dir.path());
        assert_eq!(names(&files), vec!["nested", "outer.db"]);
    }

    #[test]
    fn test_listing_does_not_touch_source() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("app.db")).unwrap();
        File::create(dir.path().join("app.db-journal")).unwrap();

        list_source_files(dir.path());
        assert!(dir.path().join("app.db-journal").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_is_journal() {
        assert!(is_journal(OsStr::new("app.db-journal")));
        assert!(is_journal(OsStr::new("journal.db")));
        assert!(!is_journal(OsStr::new("app.db-wal")));
    }
}

use crate::cleanup::CleanupRegistry;
use crate::error::ExportError;
use crate::naming::backup_path;
use crate::notify::Reporter;
use crate::request::{BatchPolicy, ExportRequest};
use crate::scan::{list_source_files, SourceFile};
use crate::utils::{ensure_directory, format_size, remove_stale};
use crate::Result;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span};

/// Terminal result of one export invocation.
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    Success,
    Failure(Arc<ExportError>),
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Success)
    }
}

/// One successfully copied file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub bytes: u64,
}

/// A copy the orchestrator would perform, without touching the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub file: SourceFile,
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug)]
pub struct ExportReport {
    pub source_directory: PathBuf,
    pub destination_directory: PathBuf,
    pub exported: Vec<ExportedFile>,
    pub failures: Vec<Arc<ExportError>>,
    pub files_attempted: usize,
    pub files_total: usize,
    pub total_bytes: u64,
    pub duration: Duration,
}

impl ExportReport {
    fn new(request: &ExportRequest, files_total: usize) -> Self {
        Self {
            source_directory: request.source_directory.clone(),
            destination_directory: request.destination_directory.clone(),
            exported: Vec::new(),
            failures: Vec::new(),
            files_attempted: 0,
            files_total,
            total_bytes: 0,
            duration: Duration::from_secs(0),
        }
    }

    pub fn outcome(&self) -> ExportOutcome {
        match self.failures.first() {
            None => ExportOutcome::Success,
            Some(error) => ExportOutcome::Failure(Arc::clone(error)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Destination of the last file copied successfully
    pub fn last_exported(&self) -> Option<&Path> {
        self.exported.last().map(|file| file.destination.as_path())
    }

    pub fn summary(&self) -> String {
        if self.is_success() {
            format!(
                "Exported {} file(s) to {} ({})",
                self.exported.len(),
                self.destination_directory.display(),
                format_size(self.total_bytes)
            )
        } else {
            format!(
                "Export failed: {} of {} file(s) exported, {} failed",
                self.exported.len(),
                self.files_total,
                self.failures.len()
            )
        }
    }
}

/// Resolve source and destination for every exportable file, in listing order
pub fn plan_export(request: &ExportRequest) -> Vec<PlannedCopy> {
    list_source_files(&request.source_directory)
        .into_iter()
        .map(|file| PlannedCopy {
            source: request.source_directory.join(file.name()),
            destination: backup_path(
                &request.destination_directory,
                &request.backup_prefix,
                file.name(),
            ),
            file,
        })
        .collect()
}

/// Run a whole export on the current thread, reporting through `reporter`
pub fn run_export(request: &ExportRequest, reporter: &Reporter) -> ExportReport {
    run_export_tracked(request, reporter, &CleanupRegistry::new())
}

/// Like [`run_export`], registering in-flight destinations with `registry`
pub fn run_export_tracked(
    request: &ExportRequest,
    reporter: &Reporter,
    registry: &CleanupRegistry,
) -> ExportReport {
    let start_time = Instant::now();
    let span = info_span!(
        "export",
        source = %request.source_directory.display(),
        destination = %request.destination_directory.display()
    );
    let _enter = span.enter();

    let files = list_source_files(&request.source_directory);
    info!(files = files.len(), policy = ?request.policy, "Export started");

    let mut report = ExportReport::new(request, files.len());
    for file in &files {
        report.files_attempted += 1;

        match export_file(request, file, registry) {
            Ok(exported) => {
                debug!(
                    file = %file.display_name(),
                    bytes = exported.bytes,
                    destination = %exported.destination.display(),
                    "File exported"
                );
                report.total_bytes += exported.bytes;
                report.exported.push(exported);
            }
            Err(e) => {
                error!(file = %file.display_name(), error = %e, "File export failed");
                let e = Arc::new(e);
                reporter.failure(Arc::clone(&e));
                report.failures.push(e);

                if request.policy == BatchPolicy::FailFast {
                    break;
                }
            }
        }
    }

    report.duration = start_time.elapsed();

    if report.is_success() {
        info!(
            files = report.exported.len(),
            bytes = report.total_bytes,
            "Backup created successfully"
        );
        reporter.exported();
    } else {
        info!(
            exported = report.exported.len(),
            failed = report.failures.len(),
            "Export finished with failures"
        );
    }

    report
}

/// Export a single source file into the destination directory.
///
/// Steps run in order and stop at the first failure: source existence,
/// destination directory creation, stale backup removal, byte copy.
pub fn export_file(
    request: &ExportRequest,
    file: &SourceFile,
    registry: &CleanupRegistry,
) -> Result<ExportedFile> {
    let source = request.source_directory.join(file.name());
    let destination = backup_path(
        &request.destination_directory,
        &request.backup_prefix,
        file.name(),
    );

    if !source.exists() {
        return Err(ExportError::SourceMissing { path: source });
    }

    if let Err(e) = ensure_directory(&request.destination_directory) {
        return Err(ExportError::DestinationUncreatable {
            path: request.destination_directory.clone(),
            source: e,
        });
    }

    match remove_stale(&destination) {
        Ok(true) => debug!(path = %destination.display(), "Removed previous backup"),
        Ok(false) => {}
        Err(e) => {
            return Err(ExportError::DestinationNotRemovable {
                path: destination,
                source: e,
            });
        }
    }

    let bytes = match copy_bytes(&source, &destination, registry) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Err(ExportError::CopyFailed {
                source_path: source,
                destination,
                source: e,
            });
        }
    };

    Ok(ExportedFile {
        source,
        destination,
        bytes,
    })
}

/// Writer a backup is copied into. `finish` runs once every byte is written.
trait BackupSink: Write {
    fn finish(self) -> io::Result<()>;
}

impl BackupSink for File {
    fn finish(self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Copy exactly the bytes the source held when it was opened.
///
/// Both handles are closed before returning. A failed copy leaves no file
/// behind at `destination`.
fn copy_bytes(source: &Path, destination: &Path, registry: &CleanupRegistry) -> io::Result<u64> {
    copy_into(source, destination, registry, |path| File::create(path))
}

fn copy_into<W, F>(
    source: &Path,
    destination: &Path,
    registry: &CleanupRegistry,
    create: F,
) -> io::Result<u64>
where
    W: BackupSink,
    F: FnOnce(&Path) -> io::Result<W>,
{
    let input = File::open(source)?;
    let metadata = input.metadata()?;
    if metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} is a directory", source.display()),
        ));
    }
    let expected = metadata.len();

    let guard = registry.register(destination.to_path_buf());
    let mut output = create(destination)?;
    let copied = io::copy(&mut input.take(expected), &mut output)?;
    if copied != expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("copied {copied} of {expected} bytes"),
        ));
    }
    output.finish()?;

    guard.complete();
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::notify::{ExportCallback, Reporter};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ExportCallback for Arc<Recorder> {
        fn on_exported(&self) {
            self.events.lock().unwrap().push("exported".to_string());
        }

        fn on_failure(&self, error: &ExportError) {
            self.events
                .lock()
                .unwrap()
                .push(format!("failure:{:?}", error.kind()));
        }
    }

    fn recorder() -> (Arc<Recorder>, Reporter) {
        let recorder = Arc::new(Recorder::default());
        let reporter = Reporter::inline(Arc::clone(&recorder));
        (recorder, reporter)
    }

    fn events(recorder: &Recorder) -> Vec<String> {
        recorder.events.lock().unwrap().clone()
    }

    #[test]
    fn test_export_skips_journal_and_copies_bytes() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("databases");
        let dest = dir.path().join("backup");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("app.db"), b"SQLite format 3\0payload").unwrap();
        fs::write(source.join("app.db-journal"), b"transient").unwrap();

        let (recorder, reporter) = recorder();
        let request = ExportRequest::new(&source, &dest, "prefix");
        let report = run_export(&request, &reporter);

        assert!(report.is_success());
        assert_eq!(events(&recorder), vec!["exported"]);
        assert_eq!(
            fs::read(dest.join("prefix_app.db")).unwrap(),
            b"SQLite format 3\0payload"
        );
        assert!(!dest.join("prefix_app.db-journal").exists());
        assert_eq!(report.exported.len(), 1);
        assert_eq!(report.total_bytes, 23);
        assert_eq!(
            report.last_exported(),
            Some(dest.join("prefix_app.db").as_path())
        );
    }

    #[test]
    fn test_export_file_missing_source() {
        let dir = tempdir().unwrap();
        let request = ExportRequest::new(dir.path(), dir.path().join("backup"), "p");

        let result = export_file(&request, &SourceFile::new("gone.db"), &CleanupRegistry::new());
        match result {
            Err(ExportError::SourceMissing { path }) => {
                assert_eq!(path, dir.path().join("gone.db"))
            }
            other => panic!("Expected SourceMissing, got {other:?}"),
        }
        assert!(!dir.path().join("backup").exists());
    }

    #[test]
    fn test_export_file_destination_is_a_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app.db"), b"x").unwrap();
        let occupied = dir.path().join("occupied");
        fs::write(&occupied, b"not a dir").unwrap();

        let request = ExportRequest::new(dir.path(), &occupied, "p");
        let result = export_file(&request, &SourceFile::new("app.db"), &CleanupRegistry::new());
        assert!(matches!(
            result,
            Err(ExportError::DestinationUncreatable { .. })
        ));
    }

    #[test]
    fn test_export_file_stale_directory_not_removable() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("backup");
        fs::write(dir.path().join("app.db"), b"x").unwrap();
        fs::create_dir_all(dest.join("p_app.db")).unwrap();

        let request = ExportRequest::new(dir.path(), &dest, "p");
        let result = export_file(&request, &SourceFile::new("app.db"), &CleanupRegistry::new());
        assert!(matches!(
            result,
            Err(ExportError::DestinationNotRemovable { .. })
        ));
    }

    #[test]
    fn test_export_file_directory_source_is_copy_failure() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("databases");
        let dest = dir.path().join("backup");
        fs::create_dir_all(source.join("nested")).unwrap();

        let request = ExportRequest::new(&source, &dest, "p");
        let result = export_file(&request, &SourceFile::new("nested"), &CleanupRegistry::new());
        assert!(matches!(result, Err(ExportError::CopyFailed { .. })));
        assert!(!dest.join("p_nested").exists());
    }

    struct FailingSink {
        file: File,
        budget: usize,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left"));
            }
            let n = buf.len().min(self.budget);
            let written = self.file.write(&buf[..n])?;
            self.budget -= written;
            Ok(written)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.file.flush()
        }
    }

    impl BackupSink for FailingSink {
        fn finish(self) -> io::Result<()> {
            self.file.sync_all()
        }
    }

    #[test]
    fn test_failed_write_removes_partial_backup() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("app.db");
        let destination = dir.path().join("p_app.db");
        fs::write(&source, vec![7u8; 64 * 1024]).unwrap();
        let registry = CleanupRegistry::new();

        let result = copy_into(&source, &destination, &registry, |path| {
            Ok(FailingSink {
                file: File::create(path)?,
                budget: 1024,
            })
        });

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::Other);
        assert!(!destination.exists());
        assert!(registry.active().is_empty());
    }

    #[test]
    fn test_source_shrinking_mid_copy_is_short_copy() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("app.db");
        let destination = dir.path().join("p_app.db");
        fs::write(&source, vec![1u8; 4096]).unwrap();
        let registry = CleanupRegistry::new();

        // Truncated after its length was taken, before any byte is read
        let result = copy_into(&source, &destination, &registry, |path| {
            fs::OpenOptions::new()
                .write(true)
                .open(&source)?
                .set_len(100)?;
            File::create(path)
        });

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
        assert!(!destination.exists());
        assert!(registry.active().is_empty());
    }

    #[test]
    fn test_export_replaces_stale_backup() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("databases");
        let dest = dir.path().join("backup");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(source.join("app.db"), b"new").unwrap();
        fs::write(dest.join("prefix_app.db"), b"older and longer content").unwrap();

        let (_recorder, reporter) = recorder();
        let report = run_export(&ExportRequest::new(&source, &dest, "prefix"), &reporter);

        assert!(report.is_success());
        assert_eq!(fs::read(dest.join("prefix_app.db")).unwrap(), b"new");
    }

    #[test]
    fn test_empty_batch_is_success() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("databases");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("only-journal"), b"j").unwrap();

        let (recorder, reporter) = recorder();
        let dest = dir.path().join("backup");
        let report = run_export(&ExportRequest::new(&source, &dest, "p"), &reporter);

        assert!(report.outcome().is_success());
        assert_eq!(report.files_total, 0);
        assert_eq!(events(&recorder), vec!["exported"]);
        // Nothing to copy, so the destination is never created
        assert!(!dest.exists());
    }

    #[test]
    fn test_unlistable_source_is_success() {
        let dir = tempdir().unwrap();
        let (recorder, reporter) = recorder();
        let request = ExportRequest::new(dir.path().join("missing"), dir.path().join("b"), "p");

        let report = run_export(&request, &reporter);
        assert!(report.is_success());
        assert_eq!(events(&recorder), vec!["exported"]);
    }

    #[test]
    fn test_fail_fast_stops_batch() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("databases");
        let dest = dir.path().join("backup");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&dest).unwrap();
        for name in ["a.db", "b.db", "c.db"] {
            fs::write(source.join(name), name).unwrap();
            // Every destination is blocked by a directory
            fs::create_dir(dest.join(format!("p_{name}"))).unwrap();
        }

        let (recorder, reporter) = recorder();
        let report = run_export(&ExportRequest::new(&source, &dest, "p"), &reporter);

        assert!(!report.is_success());
        assert_eq!(report.files_attempted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(events(&recorder), vec!["failure:DestinationNotRemovable"]);
        let error = match report.outcome() {
            ExportOutcome::Failure(error) => error,
            ExportOutcome::Success => panic!("Expected failure outcome"),
        };
        assert_eq!(error.kind(), ErrorKind::DestinationNotRemovable);
    }

    #[test]
    fn test_continue_on_error_attempts_every_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("databases");
        let dest = dir.path().join("backup");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(source.join("good.db"), b"good").unwrap();
        fs::write(source.join("bad.db"), b"bad").unwrap();
        fs::create_dir(dest.join("p_bad.db")).unwrap();

        let (recorder, reporter) = recorder();
        let request =
            ExportRequest::new(&source, &dest, "p").with_policy(BatchPolicy::ContinueOnError);
        let report = run_export(&request, &reporter);

        assert!(!report.is_success());
        assert_eq!(report.files_attempted, 2);
        assert_eq!(report.exported.len(), 1);
        assert_eq!(fs::read(dest.join("p_good.db")).unwrap(), b"good");
        assert_eq!(events(&recorder), vec!["failure:DestinationNotRemovable"]);
        assert!(report.summary().contains("1 failed"));
    }

    #[test]
    fn test_plan_export() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app.db"), b"x").unwrap();
        fs::write(dir.path().join("app.db-journal"), b"x").unwrap();

        let request = ExportRequest::new(dir.path(), "/backup", "db-App");
        let plan = plan_export(&request);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].source, dir.path().join("app.db"));
        assert_eq!(plan[0].destination, PathBuf::from("/backup/db-App_app.db"));
        assert_eq!(plan[0].file.name(), "app.db");
    }

    #[test]
    fn test_summary_success() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("databases");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.db"), vec![0u8; 2048]).unwrap();

        let (_recorder, reporter) = recorder();
        let report = run_export(
            &ExportRequest::new(&source, dir.path().join("backup"), "p"),
            &reporter,
        );

        let summary = report.summary();
        assert!(summary.contains("Exported 1 file(s)"));
        assert!(summary.contains("2.0 KB"));
    }
}

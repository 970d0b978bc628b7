pub mod cleanup;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod naming;
pub mod notify;
pub mod paths;
pub mod progress;
pub mod request;
pub mod scan;
pub mod utils;
pub mod worker;

pub use cleanup::{CleanupRegistry, PartialFileGuard};
pub use config::{default_config, dump_config, load_config, load_config_from, Config};
pub use error::{ErrorKind, ExportError};
pub use export::{
    export_file, plan_export, run_export, run_export_tracked, ExportOutcome, ExportReport,
    ExportedFile, PlannedCopy,
};
pub use naming::{backup_file_name, backup_path, validate_backup_name, validate_prefix};
pub use notify::{
    reporting_queue, Dispatcher, ExportCallback, FnCallback, Inline, QueueDispatcher, Reporter,
    ReportingQueue,
};
pub use paths::{DefaultPaths, StorageLayout};
pub use progress::{create_progress_hook, ProgressConfig, ProgressHook};
pub use request::{BatchPolicy, ExportRequest};
pub use scan::{list_source_files, SourceFile};
pub use worker::{ExportHandle, Exporter};

/// Main library result type
pub type Result<T> = std::result::Result<T, ExportError>;

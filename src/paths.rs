//! Default source and destination locations for an Android application.
//!
//! These are resolved once by the front end and handed to the exporter as
//! plain paths; the export itself never looks at the platform.

use crate::request::ExportRequest;
use std::path::PathBuf;

/// Label placed before the application name in the default backup prefix
pub const DEFAULT_PREFIX_LABEL: &str = "db";

/// Facts about the device storage, gathered by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    /// Root of private application data (`/data` on a device)
    pub data_root: PathBuf,
    pub package_name: String,
    pub app_name: String,
    /// App-specific external documents directory, when the platform offers one
    pub scoped_documents_dir: Option<PathBuf>,
    /// Shared external storage root, used when no scoped directory exists
    pub legacy_external_root: PathBuf,
}

impl StorageLayout {
    /// Build a layout from the standard Android environment variables.
    ///
    /// `ANDROID_DATA` defaults to `/data` and `EXTERNAL_STORAGE` to `/sdcard`.
    /// The scoped documents directory is used when the external root carries
    /// the `Android/data` tree.
    pub fn from_env(package_name: impl Into<String>, app_name: impl Into<String>) -> Self {
        let package_name = package_name.into();
        let data_root = std::env::var_os("ANDROID_DATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/data"));
        let legacy_external_root = std::env::var_os("EXTERNAL_STORAGE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/sdcard"));

        let app_data = legacy_external_root.join("Android").join("data");
        let scoped_documents_dir = if app_data.is_dir() {
            let files = app_data.join(&package_name).join("files");
            Some(files.join("Documents"))
        } else {
            None
        };

        Self {
            data_root,
            package_name,
            app_name: app_name.into(),
            scoped_documents_dir,
            legacy_external_root,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPaths {
    pub source_directory: PathBuf,
    pub destination_directory: PathBuf,
    pub backup_prefix: String,
}

impl DefaultPaths {
    pub fn resolve(layout: &StorageLayout) -> Self {
        let app_dir = compact_name(&layout.app_name);

        let source_directory = layout
            .data_root
            .join("data")
            .join(&layout.package_name)
            .join("databases");

        let destination_directory = match &layout.scoped_documents_dir {
            Some(scoped) => scoped.join(&app_dir),
            None => layout.legacy_external_root.join(&app_dir),
        };

        Self {
            source_directory,
            destination_directory,
            backup_prefix: default_prefix(&layout.app_name),
        }
    }

    pub fn into_request(self) -> ExportRequest {
        ExportRequest::new(
            self.source_directory,
            self.destination_directory,
            self.backup_prefix,
        )
    }
}

/// `db-<AppName>` with every space removed
pub fn default_prefix(app_name: &str) -> String {
    compact_name(&format!("{DEFAULT_PREFIX_LABEL}-{app_name}"))
}

fn compact_name(name: &str) -> String {
    name.replace(' ', "")
}

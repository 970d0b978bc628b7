use crate::error::ExportError;
use crate::request::BatchPolicy;
use crate::Result;
use configparser::ini::Ini;
use std::path::{Path, PathBuf};

const SECTION: &str = "dbexport";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_directory: Option<PathBuf>,
    pub destination_directory: Option<PathBuf>,
    pub backup_prefix: Option<String>,
    pub continue_on_error: bool,
    pub show_progress: bool,
    pub max_filename_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_directory: None,
            destination_directory: None,
            backup_prefix: None,
            continue_on_error: false,
            show_progress: true,
            max_filename_length: 255,
        }
    }
}

impl Config {
    pub fn batch_policy(&self) -> BatchPolicy {
        if self.continue_on_error {
            BatchPolicy::ContinueOnError
        } else {
            BatchPolicy::FailFast
        }
    }
}

/// Get default configuration
pub fn default_config() -> Config {
    Config::default()
}

/// Load configuration from the platform config file, falling back to defaults
pub fn load_config() -> Result<Config> {
    let config_path = get_config_path()?;
    load_config_from(&config_path)
}

/// Load configuration from a specific INI file. A missing file yields defaults.
pub fn load_config_from(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        return Ok(default_config());
    }

    let mut conf = Ini::new();
    conf.load(config_path)
        .map_err(|e| ExportError::config(format!("Failed to parse config file: {e}")))?;

    let mut config = default_config();

    // Paths and strings; empty values mean "not set"
    if let Some(value) = non_empty(conf.get(SECTION, "source_directory")) {
        config.source_directory = Some(PathBuf::from(value));
    }
    if let Some(value) = non_empty(conf.get(SECTION, "destination_directory")) {
        config.destination_directory = Some(PathBuf::from(value));
    }
    if let Some(value) = non_empty(conf.get(SECTION, "backup_prefix")) {
        config.backup_prefix = Some(value);
    }

    if let Some(value) = conf.get(SECTION, "continue_on_error") {
        config.continue_on_error = parse_bool(&value)
            .ok_or_else(|| ExportError::config(format!("Invalid continue_on_error: {value}")))?;
    }
    if let Some(value) = conf.get(SECTION, "show_progress") {
        config.show_progress = parse_bool(&value)
            .ok_or_else(|| ExportError::config(format!("Invalid show_progress: {value}")))?;
    }

    if let Some(value) = conf.get(SECTION, "max_filename_length") {
        config.max_filename_length = value
            .parse()
            .map_err(|_| ExportError::config(format!("Invalid max_filename_length: {value}")))?;
    }

    Ok(config)
}

/// Get the configuration file path for the current platform
pub fn get_config_path() -> Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Ok(PathBuf::from(appdata).join("dbexport").join("config.ini"));
        }
    }

    let config_home = if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(config_dir)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        return Err(ExportError::config("Could not determine config directory"));
    };

    Ok(config_home.join("dbexport").join("config.ini"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a boolean value from INI string
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Create a sample configuration file
pub fn create_sample_config() -> String {
    r#"[dbexport]
# Directory holding the application's database files
source_directory = /data/data/com.example.app/databases

# Directory receiving the backups (created if missing)
destination_directory = /sdcard/ExampleApp

# Prepended to every backup name: <prefix>_<file>
backup_prefix = db-ExampleApp

# Keep copying remaining files after a failure (true/false)
continue_on_error = false

# Show a spinner while exporting (true/false)
show_progress = true

# Maximum backup filename length accepted by --dry-run checks
max_filename_length = 255
"#
    .to_string()
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}

/// Display the current configuration in a user-friendly format
pub fn dump_config(config: &Config) -> Result<()> {
    let config_path = get_config_path()?;

    println!("dbexport Configuration");
    println!("======================");
    println!();

    if config_path.exists() {
        println!("Config file: {} (found)", config_path.display());
    } else {
        println!(
            "Config file: {} (not found, using defaults)",
            config_path.display()
        );
    }
    println!();

    println!("Current Settings:");
    println!("----------------");
    println!(
        "source_directory      = {}",
        display_opt(config.source_directory.as_ref().map(|p| p.display()))
    );
    println!(
        "destination_directory = {}",
        display_opt(config.destination_directory.as_ref().map(|p| p.display()))
    );
    println!(
        "backup_prefix         = {}",
        display_opt(config.backup_prefix.as_deref())
    );
    println!("continue_on_error     = {}", config.continue_on_error);
    println!("show_progress         = {}", config.show_progress);
    println!("max_filename_length   = {}", config.max_filename_length);
    println!();

    if let Some(prefix) = &config.backup_prefix {
        println!("Example backup names with current settings:");
        println!("------------------------------------------");
        println!("app.db     → {prefix}_app.db");
        println!("app.db-wal → {prefix}_app.db-wal");
        println!();
    }

    if !config_path.exists() {
        println!("To create a configuration file:");
        println!("------------------------------");
        if let Some(parent) = config_path.parent() {
            println!("1. Create directory: mkdir -p {}", parent.display());
        }
        println!("2. Create config file with your preferred settings");
        println!("3. Use 'dbexport --dump-config' again to verify");
    }

    Ok(())
}

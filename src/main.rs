use clap::{Arg, ArgAction, ArgMatches, Command};
use dbexport::logging::{self, LogConfig};
use dbexport::{
    create_progress_hook, default_config, dump_config, load_config, plan_export, reporting_queue,
    validate_backup_name, validate_prefix, BatchPolicy, CleanupRegistry, Config, DefaultPaths, ExportError,
    ExportRequest, Exporter, ProgressConfig, StorageLayout,
};
use std::path::PathBuf;
use std::process;
use tracing::warn;

fn main() {
    let result = run();
    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(error) => {
            eprintln!("Error: {error}");

            // Show suggestions if available
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  - {suggestion}");
                }
            }

            process::exit(error.exit_code());
        }
    }
}

fn build_cli() -> Command {
    Command::new("dbexport")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Copies an application's database files to an external backup directory")
        .long_about(
            "dbexport copies every database file of an application into a backup folder.\n\
             Journal files are skipped. Example: app.db → <destination>/db-MyApp_app.db",
        )
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .help("Directory holding the database files")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("destination")
                .short('d')
                .long("destination")
                .help("Backup directory (created if missing)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("prefix")
                .short('p')
                .long("prefix")
                .help("Prefix prepended to each backup name")
                .value_name("PREFIX"),
        )
        .arg(
            Arg::new("package")
                .long("package")
                .help("Application package name, used to derive default paths")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("app-name")
                .long("app-name")
                .help("Application display name, used for the default folder and prefix")
                .value_name("NAME")
                .requires("package"),
        )
        .arg(
            Arg::new("data-root")
                .long("data-root")
                .help("Root of private application data (default: $ANDROID_DATA or /data)")
                .value_name("DIR")
                .requires("package"),
        )
        .arg(
            Arg::new("continue-on-error")
                .long("continue-on-error")
                .help("Keep exporting remaining files after a failure")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Show what would be exported without doing it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show detailed progress information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with_all(["verbose", "progress"]),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Emit logs as JSON on stderr")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("progress")
                .long("progress")
                .help("Force the progress spinner even when stderr is not a terminal")
                .action(ArgAction::SetTrue)
                .conflicts_with("no-progress"),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .help("Disable the progress spinner")
                .action(ArgAction::SetTrue)
                .conflicts_with("progress"),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .help("Display current configuration settings and exit")
                .action(ArgAction::SetTrue),
        )
}

fn run() -> Result<i32, ExportError> {
    let matches = build_cli().get_matches();

    let dump_config_flag = matches.get_flag("dump-config");
    let dry_run = matches.get_flag("dry-run");
    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");
    let force_progress = matches.get_flag("progress");
    let no_progress = matches.get_flag("no-progress");

    logging::init(LogConfig {
        json: matches.get_flag("json-logs"),
        verbose,
        quiet,
    });

    let config = load_config()
        .map_err(|e| {
            warn!(error = %e, "Could not load config, using defaults");
            e
        })
        .unwrap_or_else(|_| default_config());

    if dump_config_flag {
        dump_config(&config)?;
        return Ok(0);
    }

    let request = resolve_request(&matches, &config)?;
    validate_prefix(&request.backup_prefix)?;

    if dry_run {
        return dry_run_export(&request, &config);
    }

    let (dispatcher, queue) = reporting_queue();
    let mut exporter = Exporter::new().with_dispatcher(dispatcher);
    setup_signal_handler(exporter.registry().clone());

    if !quiet && !no_progress && (config.show_progress || force_progress) {
        if let Some(hook) = create_progress_hook(&ProgressConfig::auto_detect(), force_progress) {
            exporter = exporter.with_progress(hook);
        }
    }

    let continuing = request.policy == BatchPolicy::ContinueOnError;
    let destination = request.destination_directory.clone();
    let handle = exporter.export(
        request,
        move || {
            if !quiet {
                println!("Database exported to {}", destination.display());
            }
        },
        move |error: &ExportError| {
            for line in failure_message(error, verbose, continuing) {
                eprintln!("{line}");
            }
        },
    )?;

    // The queue closes once the worker and this exporter drop their dispatchers
    drop(exporter);
    queue.run_until_closed();
    let report = handle.join()?;

    if verbose {
        for file in &report.exported {
            println!("Exported: {}", file.source.display());
            println!("  → {}", file.destination.display());
        }
        println!("  Duration: {:.2}s", report.duration.as_secs_f64());
    }
    if !quiet {
        println!("{}", report.summary());
    }

    let exit_code = match report.failures.first() {
        Some(error) => error.exit_code(),
        None => 0,
    };
    Ok(exit_code)
}

/// Lines printed for one failed file
fn failure_message(error: &ExportError, verbose: bool, continuing: bool) -> Vec<String> {
    let mut lines = vec![format!("Error: {error}")];
    if verbose {
        if let Some(cause) = std::error::Error::source(error) {
            lines.push(format!("  Cause: {cause}"));
        }
        lines.extend(error.suggestions().into_iter().map(|s| format!("  - {s}")));
    }
    // Only per-file failures let the rest of the batch go on
    if continuing && error.is_recoverable() {
        lines.push("  Continuing with the remaining files".to_string());
    }
    lines
}

/// Combine CLI flags, config file and platform defaults, in that priority
fn resolve_request(matches: &ArgMatches, config: &Config) -> Result<ExportRequest, ExportError> {
    let defaults = matches.get_one::<String>("package").map(|package| {
        let app_name = matches
            .get_one::<String>("app-name")
            .cloned()
            .unwrap_or_else(|| package.rsplit('.').next().unwrap_or(package).to_string());
        let mut layout = StorageLayout::from_env(package.clone(), app_name);
        if let Some(data_root) = matches.get_one::<String>("data-root") {
            layout.data_root = PathBuf::from(data_root);
        }
        DefaultPaths::resolve(&layout)
    });

    let source_directory = matches
        .get_one::<String>("source")
        .map(PathBuf::from)
        .or_else(|| config.source_directory.clone())
        .or_else(|| defaults.as_ref().map(|d| d.source_directory.clone()))
        .ok_or_else(|| ExportError::validation("No source directory. Use --source or --package"))?;

    let destination_directory = matches
        .get_one::<String>("destination")
        .map(PathBuf::from)
        .or_else(|| config.destination_directory.clone())
        .or_else(|| defaults.as_ref().map(|d| d.destination_directory.clone()))
        .ok_or_else(|| {
            ExportError::validation("No destination directory. Use --destination or --package")
        })?;

    let backup_prefix = matches
        .get_one::<String>("prefix")
        .cloned()
        .or_else(|| config.backup_prefix.clone())
        .or_else(|| defaults.as_ref().map(|d| d.backup_prefix.clone()))
        .ok_or_else(|| ExportError::validation("No backup prefix. Use --prefix or --package"))?;

    let policy = if matches.get_flag("continue-on-error") {
        BatchPolicy::ContinueOnError
    } else {
        config.batch_policy()
    };

    let request = ExportRequest::new(source_directory, destination_directory, backup_prefix);
    Ok(request.with_policy(policy))
}

fn dry_run_export(request: &ExportRequest, config: &Config) -> Result<i32, ExportError> {
    let plan = plan_export(request);

    for copy in &plan {
        if let Some(name) = copy.destination.file_name() {
            validate_backup_name(name, config.max_filename_length)?;
        }
        println!(
            "Would export: {} → {}",
            copy.source.display(),
            copy.destination.display()
        );
    }
    println!("{} file(s) would be exported", plan.len());

    Ok(0)
}

fn setup_signal_handler(registry: CleanupRegistry) {
    let installed = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Cleaning up...");
        let removed = registry.cleanup();
        if removed > 0 {
            eprintln!("Removed {removed} incomplete backup file(s)");
        }
        process::exit(ExportError::Interrupted.exit_code());
    });

    if let Err(e) = installed {
        warn!(error = %e, "Could not install interrupt handler");
    }
}

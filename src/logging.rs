//! Tracing subscriber setup for the command-line front end.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary so embedders keep control of their own logging.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Output logs as JSON (for machine parsing)
    pub json: bool,
    /// Default level DEBUG instead of WARN
    pub verbose: bool,
    /// Only errors
    pub quiet: bool,
}

impl LogConfig {
    fn default_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else if self.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        }
    }

    /// Filter directive used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        format!("dbexport={}", self.default_level().as_str().to_lowercase())
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for summaries and `--dump-config`.
///
/// `RUST_LOG` overrides the level chosen from `config`. Once a global
/// subscriber is installed, later calls leave it in place and print nothing.
pub fn init(config: LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_names(config.verbose)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    // Err only when a subscriber is already set
    let _ = installed;
}

use std::io::IsTerminal;

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "progress")]
use std::sync::Mutex;
#[cfg(feature = "progress")]
use std::time::Duration;

/// Presentation hooks around an export: shown before the worker starts,
/// dismissed on the reporting context once the batch has ended.
pub trait ProgressHook: Send + Sync {
    fn show(&self);
    fn dismiss(&self);
}

#[derive(Debug, Clone)]
pub struct ProgressConfig {
    pub enabled: bool,
    pub force_enabled: bool,
    pub is_interactive: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            force_enabled: false,
            is_interactive: std::io::stderr().is_terminal(),
        }
    }
}

impl ProgressConfig {
    pub fn auto_detect() -> Self {
        // Disable in CI environments
        if is_ci_environment() {
            Self {
                enabled: false,
                is_interactive: false,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    pub fn should_show_progress(&self, force_progress: bool) -> bool {
        if !self.enabled {
            return false;
        }

        if force_progress || self.force_enabled {
            return true;
        }

        self.is_interactive
    }
}

/// Spinner shown while an export is running.
#[cfg(feature = "progress")]
pub struct SpinnerProgress {
    message: String,
    bar: Mutex<Option<ProgressBar>>,
}

#[cfg(feature = "progress")]
impl SpinnerProgress {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            bar: Mutex::new(None),
        }
    }
}

#[cfg(feature = "progress")]
impl ProgressHook for SpinnerProgress {
    fn show(&self) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(self.message.clone());
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(pb);
        }
    }

    fn dismiss(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.finish_and_clear();
            }
        }
    }
}

/// Build the progress indicator for an export, if one should be shown
pub fn create_progress_hook(
    config: &ProgressConfig,
    force_progress: bool,
) -> Option<Box<dyn ProgressHook>> {
    if !config.should_show_progress(force_progress) {
        return None;
    }
    spinner()
}

#[cfg(feature = "progress")]
fn spinner() -> Option<Box<dyn ProgressHook>> {
    Some(Box::new(SpinnerProgress::new("Exporting database...")))
}

#[cfg(not(feature = "progress"))]
fn spinner() -> Option<Box<dyn ProgressHook>> {
    None
}

/// Check if we're running in a CI environment
fn is_ci_environment() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
        || std::env::var("BUILDKITE").is_ok()
}

//! Verbosity control for the process logger.
//!
//! The `tracing` subscriber installed by [`crate::trace::init_tracing`]
//! filters through a reloadable [`EnvFilter`]. [`Logger`] owns the handle
//! to that filter and remembers the directives currently applied, so tests
//! can silence logging for a while and put the previous configuration back
//! afterwards.

use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, reload};

/// Logger configuration captured by [`LevelControl::save_log_levels`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLogLevels(String);

pub trait LevelControl: Send + Sync {
    fn save_log_levels(&self) -> SavedLogLevels;

    /// Applies `level` to every target.
    fn set_log_levels(&self, level: LevelFilter);

    fn restore_log_levels(&self, saved: SavedLogLevels);
}

fn level_directive(level: LevelFilter) -> &'static str {
    if level == LevelFilter::OFF {
        "off"
    } else if level == LevelFilter::ERROR {
        "error"
    } else if level == LevelFilter::WARN {
        "warn"
    } else if level == LevelFilter::INFO {
        "info"
    } else if level == LevelFilter::DEBUG {
        "debug"
    } else {
        "trace"
    }
}

pub struct Logger {
    directives: Mutex<String>,
    reload: Option<reload::Handle<EnvFilter, Registry>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("directives", &self.directives())
            .field("attached", &self.reload.is_some())
            .finish()
    }
}

impl Logger {
    /// A logger that only tracks directives, with no subscriber behind it.
    pub fn new(directives: impl Into<String>) -> Self {
        Self {
            directives: Mutex::new(directives.into()),
            reload: None,
        }
    }

    /// A logger driving the filter behind `handle`. `directives` must be
    /// the ones the filter was built from.
    pub fn with_reload_handle(
        directives: impl Into<String>,
        handle: reload::Handle<EnvFilter, Registry>,
    ) -> anyhow::Result<Self> {
        let directives = directives.into();
        EnvFilter::try_new(&directives)?;
        Ok(Self {
            directives: Mutex::new(directives),
            reload: Some(handle),
        })
    }

    pub fn directives(&self) -> String {
        self.directives
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Replaces the filter with `directives` (`EnvFilter` syntax, e.g.
    /// `"info,memberd::service=debug"`).
    ///
    /// The stored directives only change once the filter has been
    /// reloaded, so they always describe the filter in effect.
    pub fn set_directives(&self, directives: &str) -> anyhow::Result<()> {
        let filter = EnvFilter::try_new(directives)?;
        let mut current = self
            .directives
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(handle) = &self.reload {
            handle.reload(filter)?;
        }
        *current = directives.to_string();
        Ok(())
    }

    fn apply(&self, directives: &str) {
        if let Err(e) = self.set_directives(directives) {
            tracing::warn!(
                directives,
                error = %e,
                "Failed to apply log directives"
            );
        }
    }
}

impl LevelControl for Logger {
    fn save_log_levels(&self) -> SavedLogLevels {
        SavedLogLevels(self.directives())
    }

    fn set_log_levels(&self, level: LevelFilter) {
        self.apply(level_directive(level));
    }

    fn restore_log_levels(&self, saved: SavedLogLevels) {
        self.apply(&saved.0);
    }
}

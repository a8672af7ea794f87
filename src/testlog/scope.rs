use super::{Predicate, TestLog};
use crate::logger::{LevelControl, SavedLogLevels};
use tracing_subscriber::filter::LevelFilter;

/// Enables a [`TestLog`] and silences the regular logger until dropped.
///
/// Dropping the scope disables the test log (clearing its buffer and
/// predicate) and puts back the logger levels that were in effect when the
/// scope was created. This also happens when the enclosing test panics.
///
/// Scopes do not nest: a second live scope over the same log and logger
/// overwrites the first one's predicate, and whichever is dropped first
/// disables the log for both.
#[must_use = "the test log is disabled again when the scope is dropped"]
pub struct LogScope<'a> {
    log: &'a TestLog,
    levels: &'a dyn LevelControl,
    saved: Option<SavedLogLevels>,
}

impl<'a> LogScope<'a> {
    pub fn new(log: &'a TestLog, levels: &'a dyn LevelControl) -> Self {
        let saved = levels.save_log_levels();
        levels.set_log_levels(LevelFilter::OFF);
        log.enable();
        Self {
            log,
            levels,
            saved: Some(saved),
        }
    }

    /// Like [`LogScope::new`], keeping only entries accepted by `predicate`.
    pub fn with_predicate<P: Predicate + 'static>(
        log: &'a TestLog,
        levels: &'a dyn LevelControl,
        predicate: P,
    ) -> Self {
        let saved = levels.save_log_levels();
        levels.set_log_levels(LevelFilter::OFF);
        log.set_predicate(predicate);
        log.enable();
        Self {
            log,
            levels,
            saved: Some(saved),
        }
    }

    pub fn log(&self) -> &'a TestLog {
        self.log
    }
}

impl Drop for LogScope<'_> {
    fn drop(&mut self) {
        self.log.disable();
        if let Some(saved) = self.saved.take() {
            self.levels.restore_log_levels(saved);
        }
    }
}

/// Runs `body` inside a [`LogScope`].
pub fn with_log_scope<R>(
    log: &TestLog,
    levels: &dyn LevelControl,
    body: impl FnOnce(&TestLog) -> R,
) -> R {
    let scope = LogScope::new(log, levels);
    body(scope.log())
}

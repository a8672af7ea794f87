//! In-memory log for observing internal events from tests.
//!
//! Code under test records entries with [`test_log!`](crate::test_log);
//! tests enable the log (usually through a [`LogScope`]), exercise the
//! code, and compare [`TestLog::get`] against the expected entries. Entries
//! are joined with `" | "` and each one is prefixed with the name of the
//! function that recorded it:
//!
//! ```text
//! update_server_list: received version 3 with 2 servers, now at version 3
//! ```
//!
//! Every operation takes the same lock, so entries from concurrent threads
//! never interleave below whole-entry granularity.

mod predicate;
mod scope;

pub use predicate::{And, Not, Only, Or, Predicate, PredicateExt, except, only};
pub use scope::{LogScope, with_log_scope};

use std::fmt::{self, Write as _};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Source position of a log call, produced by [`here!`](crate::here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLocation {
    pub file: &'static str,
    pub line: u32,
    pub qualified_function: &'static str,
}

impl CodeLocation {
    pub fn new(
        file: &'static str,
        line: u32,
        qualified_function: &'static str,
    ) -> Self {
        Self {
            file,
            line,
            qualified_function,
        }
    }

    /// Unqualified name of the enclosing function.
    pub fn function(&self) -> &'static str {
        self.qualified_function
            .rsplit("::")
            .next()
            .unwrap_or(self.qualified_function)
    }
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} in {}", self.file, self.line, self.function())
    }
}

/// Turns the type name of a marker fn declared inside a function into the
/// path of that function, skipping any closures in between.
#[doc(hidden)]
pub fn function_path(marker: &'static str) -> &'static str {
    let mut path = marker.strip_suffix("::f").unwrap_or(marker);
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    path
}

/// Expands to the [`CodeLocation`] of the invocation site.
#[macro_export]
macro_rules! here {
    () => {
        $crate::testlog::CodeLocation::new(::std::file!(), ::std::line!(), {
            fn f() {}
            $crate::testlog::function_path(::std::any::type_name_of_val(&f))
        })
    };
}

/// Records an entry in a [`TestLog`](crate::testlog::TestLog).
///
/// `test_log!(log, "format", args...)` where `log` is anything that
/// derefs to a `TestLog`.
#[macro_export]
macro_rules! test_log {
    ($log:expr, $($arg:tt)+) => {
        $log.log(&$crate::here!(), ::std::format_args!($($arg)+))
    };
}

#[derive(Default)]
struct LogState {
    enabled: bool,
    predicate: Option<Box<dyn Predicate>>,
    buffer: String,
}

/// Buffered, lock-protected test log.
///
/// Starts disabled. While disabled the buffer is empty and `log` calls are
/// dropped.
#[derive(Default)]
pub struct TestLog {
    state: Mutex<LogState>,
}

impl fmt::Debug for TestLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TestLog")
            .field("enabled", &state.enabled)
            .field("has_predicate", &state.predicate.is_some())
            .field("buffer", &state.buffer)
            .finish()
    }
}

impl TestLog {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking predicate poisons the mutex; the state is still
    // consistent, so keep going rather than failing every later caller.
    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the buffer and starts recording.
    pub fn enable(&self) {
        let mut state = self.lock();
        state.buffer.clear();
        state.enabled = true;
    }

    /// Clears the buffer, removes the predicate and stops recording.
    pub fn disable(&self) {
        let mut state = self.lock();
        state.buffer.clear();
        state.enabled = false;
        state.predicate = None;
    }

    /// Clears the buffer only.
    pub fn reset(&self) {
        self.lock().buffer.clear();
    }

    /// Installs `predicate`, replacing any previous one. It receives the
    /// unqualified name of the recording function and decides whether the
    /// entry is kept.
    pub fn set_predicate<P: Predicate + 'static>(&self, predicate: P) {
        self.lock().predicate = Some(Box::new(predicate));
    }

    pub fn clear_predicate(&self) {
        self.lock().predicate = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Snapshot of the recorded entries.
    pub fn get(&self) -> String {
        self.lock().buffer.clone()
    }

    /// Use [`test_log!`](crate::test_log) instead of calling this directly.
    pub fn log(&self, location: &CodeLocation, message: fmt::Arguments<'_>) {
        let mut state = self.lock();

        if !state.enabled {
            return;
        }
        if let Some(predicate) = &state.predicate
            && !predicate.accepts(location.function())
        {
            return;
        }

        if !state.buffer.is_empty() {
            state.buffer.push_str(" | ");
        }
        // Writing into a String cannot fail.
        let _ = write!(state.buffer, "{}: {}", location.function(), message);
    }
}

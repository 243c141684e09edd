//! Failure reports.
//!
//! A [`FailureReport`] is the diagnostic produced when a monitored call
//! fails: who failed and how, followed by where every recently active thread
//! was when it last entered a monitored call. The text rendering is stable
//! enough to grep; [`FailureReport::to_json`] is the machine-readable form.

use std::fmt;

use serde::Serialize;
use sharewatch_types::{SubjectId, ThreadLabel};

/// First line of every rendered report.
pub const FAILURE_HEADER: &str = "exception occurred:";

/// Introduces the recent-caller section.
pub const RECENT_CALLERS_HEADER: &str =
    "the following threads were recently operating on the object:";

/// Marks each recent-caller entry.
pub const CALLER_MARKER: &str = "caller...";

/// Where one thread was when it last entered a monitored call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentCaller {
    pub thread: ThreadLabel,
    /// Operation the thread entered, e.g. `List::push(T)`.
    pub operation: String,
    /// Capture order across all threads.
    pub sequence: u64,
    /// Whether the thread was still running when the report was built.
    pub alive: bool,
    pub stack: Vec<String>,
}

/// Diagnostic report for one failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// Thread whose call failed.
    pub thread: ThreadLabel,
    /// Fully qualified type name of the error, or `panic`.
    pub error_type: String,
    pub message: String,
    /// Source chain of the error, outermost first.
    pub causes: Vec<String>,
    pub operation: String,
    pub subject: SubjectId,
    /// Stack of the failing thread at the time of the failure.
    pub stack: Vec<String>,
    /// Recent callers, oldest capture first.
    pub recent: Vec<RecentCaller>,
}

impl FailureReport {
    /// Human-readable text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; not expected for this type.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Whether any recorded caller entered `operation` (rendered form, e.g.
    /// `List::push(T)`), either directly or somewhere in its stack.
    #[must_use]
    pub fn mentions_caller(&self, needle: &str) -> bool {
        self.recent.iter().any(|caller| {
            caller.operation.contains(needle) || caller.stack.iter().any(|frame| frame.contains(needle))
        })
    }

    fn write_to(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out, "{FAILURE_HEADER}")?;
        writeln!(out, "{} - {}: {}", self.thread, self.error_type, self.message)?;
        for cause in &self.causes {
            writeln!(out, "\tcaused by: {cause}")?;
        }
        for frame in &self.stack {
            writeln!(out, "\tat {frame}")?;
        }
        writeln!(out)?;
        writeln!(out, "{RECENT_CALLERS_HEADER}")?;
        for caller in &self.recent {
            write!(out, "{} - {CALLER_MARKER} {}", caller.thread, caller.operation)?;
            if !caller.alive {
                out.write_str(" (terminated)")?;
            }
            writeln!(out)?;
            for frame in &caller.stack {
                writeln!(out, "\tat {frame}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

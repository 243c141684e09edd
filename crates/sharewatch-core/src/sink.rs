//! Destinations for rendered failure reports.

use std::io::{self, Write};

use parking_lot::Mutex;

/// Receives rendered failure reports.
///
/// Sinks must not panic; a panicking sink is caught and logged by the
/// harness and the original failure still reaches the caller.
pub trait ReportSink: Send + Sync {
    fn write(&self, report: &str);
}

impl<F> ReportSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write(&self, report: &str) {
        self(report);
    }
}

/// Emits each report as a `tracing` error event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn write(&self, report: &str) {
        tracing::error!(report, "sharewatch::report");
    }
}

/// Writes each report, followed by a newline, to an [`io::Write`].
///
/// I/O errors are logged and otherwise ignored.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl WriterSink<io::Stderr> {
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> ReportSink for WriterSink<W> {
    fn write(&self, report: &str) {
        let mut writer = self.writer.lock();
        if let Err(error) = writeln!(writer, "{report}").and_then(|()| writer.flush()) {
            tracing::warn!(%error, "sharewatch::sink_write_failed");
        }
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<String>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of all reports received so far, oldest first.
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().clone()
    }

    /// All reports joined by newlines.
    pub fn contents(&self) -> String {
        self.reports.lock().join("\n")
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl ReportSink for MemorySink {
    fn write(&self, report: &str) {
        self.reports.lock().push(report.to_owned());
    }
}

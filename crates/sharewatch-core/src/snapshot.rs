//! Call-stack snapshots.
//!
//! Captured unresolved at call entry (cheap), symbolized only when a report
//! renders them. Frames that belong to the capture machinery itself, to the
//! recorder, to the harness plumbing or to unwinding glue are trimmed from
//! the top so that the first real frame is the forwarding method of the
//! capability, followed by the caller's own code.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use serde::Serialize;

/// Symbol prefixes of the capture machinery: backtrace creation, the
/// recorder, observer dispatch and the harness plumbing. Decorator methods
/// (`<sharewatch_core::monitor::Monitored<..> as ..>::op`) are not listed and
/// stay visible.
const MACHINERY_PREFIXES: &[&str] = &[
    "std::backtrace",
    "<std::backtrace",
    "sharewatch_core::snapshot::StackSnapshot",
    "sharewatch_core::recorder",
    "<sharewatch_core::recorder",
    "sharewatch_core::observer",
    "<sharewatch_core::observer",
    "sharewatch_core::monitor::",
];

/// Symbol prefixes of language runtime frames: closures, unwinding glue,
/// combinators.
const RUNTIME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rust",
];

/// One rendered stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub symbol: String,
    pub location: Option<String>,
}

impl Frame {
    fn is_machinery(&self) -> bool {
        MACHINERY_PREFIXES
            .iter()
            .any(|prefix| self.symbol.starts_with(prefix))
    }

    fn is_runtime(&self) -> bool {
        RUNTIME_PREFIXES
            .iter()
            .any(|prefix| self.symbol.starts_with(prefix))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({location})", self.symbol),
            None => f.write_str(&self.symbol),
        }
    }
}

/// Where a thread was when it entered an intercepted call.
#[derive(Debug)]
pub struct StackSnapshot {
    backtrace: Option<Backtrace>,
}

impl StackSnapshot {
    /// Capture the current stack, or record an empty snapshot when capture
    /// is disabled.
    #[must_use]
    pub fn capture(enabled: bool) -> Self {
        let backtrace = if enabled {
            Some(Backtrace::force_capture())
        } else {
            None
        };
        Self { backtrace }
    }

    /// An empty snapshot.
    #[must_use]
    pub const fn empty() -> Self {
        Self { backtrace: None }
    }

    /// Whether frames were actually captured. Platforms without unwinding
    /// support report `false` even when capture was requested.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.backtrace
            .as_ref()
            .is_some_and(|backtrace| backtrace.status() == BacktraceStatus::Captured)
    }

    /// Up to `max_frames` frames, with internal frames trimmed from the top.
    #[must_use]
    pub fn frames(&self, max_frames: usize) -> Vec<Frame> {
        let Some(backtrace) = self.backtrace.as_ref() else {
            return Vec::new();
        };
        if backtrace.status() != BacktraceStatus::Captured {
            return Vec::new();
        }
        trim(parse_frames(&backtrace.to_string()), max_frames)
    }
}

/// Cut everything up to the last machinery frame of the leading block, then
/// any runtime glue right below it. The leading block ends at the first frame
/// that is neither machinery nor runtime, so machinery frames of a nested
/// intercepted call further down the stack are kept.
fn trim(frames: Vec<Frame>, max_frames: usize) -> Vec<Frame> {
    let leading = frames
        .iter()
        .position(|frame| !frame.is_machinery() && !frame.is_runtime())
        .unwrap_or(frames.len());
    let start = frames[..leading]
        .iter()
        .rposition(Frame::is_machinery)
        .map_or(0, |last| last + 1);
    frames
        .into_iter()
        .skip(start)
        .skip_while(Frame::is_runtime)
        .take(max_frames)
        .collect()
}

/// Parse the text rendering of a [`Backtrace`]:
///
/// ```text
///    3: my_crate::worker::run
///              at ./src/worker.rs:42:9
/// ```
fn parse_frames(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.location.is_none() {
                    frame.location = Some(location.to_owned());
                }
            }
            continue;
        }
        let Some((index, symbol)) = line.split_once(": ") else {
            continue;
        };
        if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
            frames.push(Frame {
                symbol: symbol.to_owned(),
                location: None,
            });
        }
    }
    frames
}

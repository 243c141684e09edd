//! Caller context recorder.
//!
//! The recorder is the [`CallObserver`] that turns interception events into
//! diagnostics. On every call entry it stores, per thread, where that thread
//! is (a [`CallContext`]); when a call fails it renders a [`FailureReport`]
//! from the failing call plus every stored context and hands it to a
//! [`ReportSink`].
//!
//! # Thread association
//!
//! Contexts are keyed by [`ThreadId`] and carry only a `Weak` reference to a
//! token owned by the recorded thread's thread-local storage. When the thread
//! exits, its token is dropped and the context becomes evictable; the
//! recorder never keeps anything belonging to a terminated thread alive.
//! Eviction happens in [`sweep`](CallerContextRecorder::sweep), which runs
//! every `sweep_interval` captures, so the store is bounded by the number of
//! live threads plus one sweep interval. Reports do not sweep; a thread that
//! exited shortly before a failure is listed as terminated until the next
//! periodic sweep.
//!
//! # Locking
//!
//! One `parking_lot::Mutex` guards the store. Writers hold it for one map
//! insert; reports hold it only long enough to copy the contexts and render
//! outside it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use sharewatch_error::Result;
use sharewatch_types::{Operation, ThreadLabel};

use crate::config::RecorderConfig;
use crate::observer::{CallObserver, Failure, Invocation};
use crate::report::{FailureReport, RecentCaller};
use crate::sink::{ReportSink, TracingSink};
use crate::snapshot::StackSnapshot;

/// Liveness token owned by each thread that has entered a recorded call.
#[derive(Debug)]
pub struct ThreadToken {
    label: ThreadLabel,
}

impl ThreadToken {
    #[must_use]
    pub const fn label(&self) -> &ThreadLabel {
        &self.label
    }
}

thread_local! {
    static THREAD_TOKEN: Arc<ThreadToken> = Arc::new(ThreadToken {
        label: ThreadLabel::current(),
    });
}

/// Weak handle to the calling thread's token. Dangling when called during
/// thread teardown.
fn current_token() -> Weak<ThreadToken> {
    THREAD_TOKEN.try_with(Arc::downgrade).unwrap_or_default()
}

/// The most recent call entry of one thread.
#[derive(Clone)]
pub struct CallContext {
    thread: ThreadLabel,
    operation: Operation,
    sequence: u64,
    stack: Arc<StackSnapshot>,
    liveness: Weak<ThreadToken>,
}

impl CallContext {
    #[must_use]
    pub const fn thread(&self) -> &ThreadLabel {
        &self.thread
    }

    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Capture order across all threads of one recorder.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn stack(&self) -> &StackSnapshot {
        &self.stack
    }

    /// Whether the recorded thread is still running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.liveness.strong_count() > 0
    }

    fn recent_caller(&self, max_frames: usize) -> RecentCaller {
        RecentCaller {
            thread: self.thread.clone(),
            operation: self.operation.to_string(),
            sequence: self.sequence,
            alive: self.is_alive(),
            stack: render_stack(&self.operation, &self.stack, max_frames),
        }
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("thread", &self.thread)
            .field("operation", &format_args!("{}", self.operation))
            .field("sequence", &self.sequence)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

/// The synthetic operation frame followed by up to `max_frames - 1` real
/// frames.
fn render_stack(operation: &Operation, stack: &StackSnapshot, max_frames: usize) -> Vec<String> {
    std::iter::once(operation.to_string())
        .chain(
            stack
                .frames(max_frames.saturating_sub(1))
                .iter()
                .map(ToString::to_string),
        )
        .collect()
}

/// Records per-thread call contexts and reports failures.
pub struct CallerContextRecorder {
    config: RecorderConfig,
    sink: Arc<dyn ReportSink>,
    contexts: Mutex<HashMap<ThreadId, CallContext>>,
    sequence: AtomicU64,
    reports: AtomicU64,
}

impl CallerContextRecorder {
    /// Recorder with the default configuration.
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self::build(RecorderConfig::default(), sink)
    }

    /// Recorder with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidConfig`](sharewatch_error::UsageError::InvalidConfig)
    /// if `config` does not validate.
    pub fn with_config(config: RecorderConfig, sink: Arc<dyn ReportSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, sink))
    }

    /// Recorder configured from the environment, reporting through
    /// `tracing`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::build(RecorderConfig::from_env(), Arc::new(TracingSink))
    }

    fn build(config: RecorderConfig, sink: Arc<dyn ReportSink>) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(error) => {
                tracing::error!(%error, "sharewatch::config_rejected");
                RecorderConfig::default()
            }
        };
        Self {
            config,
            sink,
            contexts: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            reports: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Number of stored contexts, including not yet evicted ones of
    /// terminated threads.
    #[must_use]
    pub fn stored_contexts(&self) -> usize {
        self.contexts.lock().len()
    }

    /// Copies of the stored contexts, oldest capture first.
    #[must_use]
    pub fn contexts(&self) -> Vec<CallContext> {
        let mut contexts: Vec<CallContext> = self.contexts.lock().values().cloned().collect();
        contexts.sort_by_key(CallContext::sequence);
        contexts
    }

    /// The liveness handle stored for `thread`, if it has a context.
    #[must_use]
    pub fn liveness_of(&self, thread: ThreadId) -> Option<Weak<ThreadToken>> {
        self.contexts
            .lock()
            .get(&thread)
            .map(|context| Weak::clone(&context.liveness))
    }

    /// Evict contexts of terminated threads. Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let mut contexts = self.contexts.lock();
        let before = contexts.len();
        contexts.retain(|_, context| context.is_alive());
        let evicted = before - contexts.len();
        drop(contexts);
        if evicted > 0 {
            tracing::debug!(evicted, "sharewatch::sweep");
        }
        evicted
    }

    /// Drop every stored context.
    pub fn clear(&self) {
        self.contexts.lock().clear();
    }

    /// Reports handed to the sink so far.
    #[must_use]
    pub fn reports_emitted(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    /// Build the report for a failed call from the current thread, without
    /// emitting it.
    #[must_use]
    pub fn report_for(&self, failure: &Failure<'_>, invocation: &Invocation<'_>) -> FailureReport {
        let stack = StackSnapshot::capture(self.config.capture_backtraces);
        let recent = self
            .contexts()
            .iter()
            .map(|context| context.recent_caller(self.config.max_frames))
            .collect();
        FailureReport {
            thread: ThreadLabel::current(),
            error_type: failure.type_name().to_owned(),
            message: failure.message(),
            causes: failure.causes(),
            operation: invocation.operation().to_string(),
            subject: invocation.subject(),
            stack: render_stack(invocation.operation(), &stack, self.config.max_frames),
            recent,
        }
    }

    fn capture(&self, operation: Operation) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let thread = thread::current();
        let context = CallContext {
            thread: ThreadLabel::of(&thread),
            operation,
            sequence,
            stack: Arc::new(StackSnapshot::capture(self.config.capture_backtraces)),
            liveness: current_token(),
        };
        self.contexts.lock().insert(thread.id(), context);
        tracing::trace!(operation = %operation, sequence, "sharewatch::capture");
        if sequence % self.config.sweep_interval == 0 {
            self.sweep();
        }
    }
}

impl Default for CallerContextRecorder {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl fmt::Debug for CallerContextRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerContextRecorder")
            .field("config", &self.config)
            .field("stored_contexts", &self.stored_contexts())
            .field("reports", &self.reports_emitted())
            .finish_non_exhaustive()
    }
}

impl CallObserver for CallerContextRecorder {
    fn before_invoke(&self, invocation: &Invocation<'_>) {
        self.capture(*invocation.operation());
    }

    fn on_failure(&self, failure: &Failure<'_>, invocation: &Invocation<'_>) {
        let report = self.report_for(failure, invocation);
        self.reports.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            operation = %report.operation,
            error_type = %report.error_type,
            message = %report.message,
            recent_callers = report.recent.len(),
            "sharewatch::failure"
        );
        self.sink.write(&report.render());
    }
}

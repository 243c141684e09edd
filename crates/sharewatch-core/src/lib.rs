//! Interception core for sharewatch.
//!
//! A monitored object is a [`Monitored`] stand-in that forwards every
//! operation of one capability surface to the real target and reports each
//! call to a [`CallObserver`]. The usual observer is the
//! [`CallerContextRecorder`], which remembers where every thread last entered
//! a monitored call and, when a call fails, renders a [`FailureReport`]
//! showing the failing thread next to the threads that were recently
//! operating on the same object.
//!
//! How an object is monitored is captured by a [`Description`]: its
//! [`EqualityPolicy`] and the operations whose results must be monitored as
//! well.

pub mod capability;
pub mod config;
pub mod description;
pub mod equality;
pub mod monitor;
pub mod observer;
pub mod recorder;
pub mod report;
pub mod sink;
pub mod snapshot;

#[cfg(test)]
mod testkit;

pub use capability::{Capability, Subject};
pub use config::RecorderConfig;
pub use description::{Description, DescriptionBuilder};
pub use equality::{EqualityPolicy, FnPolicy, ReferenceIdentity};
pub use monitor::{Monitored, Propagate, monitor};
pub use observer::{CallObserver, Failure, Invocation, NoopObserver, Opaque, SharedObserver};
pub use recorder::{CallContext, CallerContextRecorder, ThreadToken};
pub use report::{CALLER_MARKER, FAILURE_HEADER, FailureReport, RECENT_CALLERS_HEADER, RecentCaller};
pub use sink::{MemorySink, ReportSink, TracingSink, WriterSink};
pub use snapshot::{Frame, StackSnapshot};

pub use sharewatch_error::UsageError;
pub use sharewatch_types::{Operation, SubjectId, ThreadLabel};

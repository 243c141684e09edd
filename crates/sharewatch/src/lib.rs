//! Diagnose objects shared between threads without adequate
//! synchronization.
//!
//! Wrap a suspect object in a monitored stand-in. Every call on the stand-in
//! is recorded per thread; when a call fails, a report shows the failing
//! thread next to every thread that was recently operating on the same
//! object, with the operation each of them was in and where it came from.
//!
//! ```
//! use std::sync::Arc;
//!
//! use sharewatch::{CallerContextRecorder, FailFastList, List, MemorySink, monitor_list};
//!
//! let sink = Arc::new(MemorySink::new());
//! let recorder = Arc::new(CallerContextRecorder::new(sink.clone()));
//! let list = monitor_list(Arc::new(FailFastList::from_vec(vec![1, 2, 3])), recorder);
//!
//! let cursor = list.iter();
//! assert_eq!(cursor.next(), Ok(Some(1)));
//! list.push(4).unwrap();
//! assert!(cursor.next().is_err());
//!
//! let report = sink.contents();
//! assert!(report.contains(sharewatch::FAILURE_HEADER));
//! assert!(report.contains("CollectionError"));
//! ```
//!
//! Container surfaces ship with default descriptions (see
//! [`catalog`](sharewatch_collections::catalog)); other surfaces implement
//! [`Capability`] and a forwarding decorator, then describe themselves with
//! [`Description::builder`].

pub mod logging;

pub use sharewatch_core::{
    CALLER_MARKER, CallContext, CallObserver, CallerContextRecorder, Capability, Description,
    DescriptionBuilder, EqualityPolicy, FAILURE_HEADER, Failure, FailureReport, FnPolicy, Frame,
    Invocation, MemorySink, Monitored, NoopObserver, Opaque, Propagate, RECENT_CALLERS_HEADER,
    RecentCaller, RecorderConfig, ReferenceIdentity, ReportSink, SharedObserver, StackSnapshot,
    Subject, ThreadToken, TracingSink, WriterSink, monitor,
};

pub use sharewatch_collections::{
    Collection, CollectionError, Cursor, Element, Elements, FailFastList, FailFastMap, FailFastSet,
    List, ListEquality, Map, MapEntries, MapEquality, MapKeys, MapValues, Set, SetEquality,
    collection_description, collection_ops, cursor_description, cursor_ops, drain, elements,
    list_description, list_ops, map_description, map_ops, monitor_collection, monitor_list,
    monitor_map, monitor_set, set_description, set_ops,
};

pub use sharewatch_error::UsageError;
pub use sharewatch_types::{Operation, SubjectId, ThreadLabel};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn facade_exposes_a_working_pipeline() {
        let sink = Arc::new(MemorySink::new());
        let recorder = Arc::new(CallerContextRecorder::new(sink.clone()));
        let set = monitor_set(Arc::new(FailFastSet::from_vec(vec!["a"])), recorder.clone());

        let cursor = set.iter();
        assert_eq!(cursor.next(), Ok(Some("a")));
        assert_eq!(set.insert("b"), Ok(true));
        let err = cursor.next().unwrap_err();
        assert!(err.is_concurrent_modification());

        assert_eq!(recorder.reports_emitted(), 1);
        let text = sink.contents();
        assert!(text.starts_with(FAILURE_HEADER), "{text}");
        assert!(text.contains(RECENT_CALLERS_HEADER));
        assert!(text.contains("CollectionError"));
        assert!(text.contains("Cursor::next()"));
    }

    #[test]
    fn usage_errors_surface_through_the_facade() {
        let err = Description::<dyn List<u8>>::builder()
            .register_dependent(list_ops::GET, cursor_description::<u8>())
            .err()
            .unwrap();
        assert!(err.is_description_error());
        assert!(matches!(err, UsageError::NotDependent { .. }));
    }
}

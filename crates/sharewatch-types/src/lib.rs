//! Identifiers shared by every sharewatch crate.
//!
//! - [`Operation`]: the stable identity of one interceptable operation of a
//!   capability surface (capability, name and signature).
//! - [`SubjectId`]: the identity of the object that ultimately performs the
//!   work behind a (possibly monitored) reference.
//! - [`ThreadLabel`]: a printable, owned copy of a thread's identity used in
//!   diagnostic reports.

use std::fmt;
use std::thread;

use serde::{Deserialize, Serialize};

/// Identity of one interceptable operation.
///
/// Operations are declared as constants next to the capability trait that
/// exposes them. Two operations are the same operation iff capability, name
/// and signature match; `returns` is derived data and only records which
/// capability surface the result has when that result may be declared
/// dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Operation {
    capability: &'static str,
    name: &'static str,
    signature: &'static str,
    returns: Option<&'static str>,
}

impl Operation {
    /// Declare an operation whose result is never wrapped.
    #[must_use]
    pub const fn new(capability: &'static str, name: &'static str, signature: &'static str) -> Self {
        Self {
            capability,
            name,
            signature,
            returns: None,
        }
    }

    /// Mark the result of this operation as an instance of `capability`,
    /// making it eligible for dependent registration.
    #[must_use]
    pub const fn returning(self, capability: &'static str) -> Self {
        Self {
            returns: Some(capability),
            ..self
        }
    }

    /// Name of the capability surface that declares this operation.
    #[inline]
    #[must_use]
    pub const fn capability(&self) -> &'static str {
        self.capability
    }

    /// Operation name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Parameter signature, e.g. `(usize, usize)`.
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> &'static str {
        self.signature
    }

    /// Capability surface of the result, if the result may be dependent.
    #[inline]
    #[must_use]
    pub const fn returns(&self) -> Option<&'static str> {
        self.returns
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}{}", self.capability, self.name, self.signature)
    }
}

/// Identity of the object that performs the work behind a reference.
///
/// Derived from the object's address, so it is only meaningful while the
/// object is alive. A monitored stand-in reports the identity of its target,
/// which is what makes a stand-in and its target compare as the same
/// underlying object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SubjectId(usize);

impl SubjectId {
    /// Identity of the value behind `value`.
    ///
    /// Zero-sized values may share an address; capabilities whose targets
    /// can be zero-sized should not rely on identity equality.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(std::ptr::from_ref(value).cast::<()>() as usize)
    }

    /// Raw address value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subject@{:#x}", self.0)
    }
}

/// Owned, printable identity of a thread.
///
/// Holds copies of the name and id only; it never keeps the thread (or its
/// handle) alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadLabel {
    name: Option<String>,
    id: String,
}

impl ThreadLabel {
    /// Label for the calling thread.
    #[must_use]
    pub fn current() -> Self {
        Self::of(&thread::current())
    }

    /// Label for `thread`.
    #[must_use]
    pub fn of(thread: &thread::Thread) -> Self {
        Self {
            name: thread.name().map(ToOwned::to_owned),
            id: format!("{:?}", thread.id()),
        }
    }

    /// Thread name, if the thread was named.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rendered thread id, e.g. `ThreadId(7)`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ThreadLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Thread[{},{}]",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUSH: Operation = Operation::new("List", "push", "(T)");
    const SUB_LIST: Operation = Operation::new("List", "sub_list", "(usize, usize)").returning("List");

    #[test]
    fn operation_display_names_capability_and_signature() {
        assert_eq!(PUSH.to_string(), "List::push(T)");
        assert_eq!(SUB_LIST.to_string(), "List::sub_list(usize, usize)");
    }

    #[test]
    fn operation_returning_keeps_identity_fields() {
        assert_eq!(SUB_LIST.capability(), "List");
        assert_eq!(SUB_LIST.name(), "sub_list");
        assert_eq!(SUB_LIST.returns(), Some("List"));
        assert_eq!(PUSH.returns(), None);
    }

    #[test]
    fn operation_serializes_to_json() {
        let json = serde_json::to_string(&SUB_LIST).unwrap();
        assert!(json.contains("\"name\":\"sub_list\""), "json={json}");
        assert!(json.contains("\"returns\":\"List\""), "json={json}");
    }

    #[test]
    fn subject_id_is_address_identity() {
        let a = String::from("a");
        let b = String::from("a");
        assert_eq!(SubjectId::of(&a), SubjectId::of(&a));
        assert_ne!(SubjectId::of(&a), SubjectId::of(&b));

        let boxed: Box<dyn fmt::Debug> = Box::new(7_u32);
        let thin = SubjectId::of(&*boxed);
        assert_eq!(thin, SubjectId::of(&*boxed));
    }

    #[test]
    fn thread_label_carries_name() {
        let label = thread::Builder::new()
            .name("label-probe".to_owned())
            .spawn(ThreadLabel::current)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(label.name(), Some("label-probe"));
        assert!(label.to_string().starts_with("Thread[label-probe,ThreadId("));
    }

    #[test]
    fn unnamed_thread_label_renders_placeholder() {
        let label = thread::spawn(ThreadLabel::current).join().unwrap();
        assert_eq!(label.name(), None);
        assert!(label.to_string().contains("<unnamed>"));
    }
}

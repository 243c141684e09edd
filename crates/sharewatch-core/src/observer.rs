//! Invocation observers.
//!
//! The harness reports each intercepted call to a [`CallObserver`]: once
//! before the target runs, once afterwards whatever the outcome, and once in
//! between if the target failed. Observers are shared between every stand-in
//! derived from one root, so they must be thread-safe.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use sharewatch_types::{Operation, SubjectId};

/// One intercepted call.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    subject: SubjectId,
    operation: &'a Operation,
    args: &'a dyn fmt::Debug,
}

impl<'a> Invocation<'a> {
    #[must_use]
    pub const fn new(subject: SubjectId, operation: &'a Operation, args: &'a dyn fmt::Debug) -> Self {
        Self {
            subject,
            operation,
            args,
        }
    }

    /// Identity of the target being called.
    #[must_use]
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }

    #[must_use]
    pub const fn operation(&self) -> &'a Operation {
        self.operation
    }

    /// Name of the capability surface the operation belongs to.
    #[must_use]
    pub const fn capability(&self) -> &'static str {
        self.operation.capability()
    }

    /// Arguments of the call, for display only.
    #[must_use]
    pub const fn args(&self) -> &'a dyn fmt::Debug {
        self.args
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("subject", &self.subject)
            .field("operation", &format_args!("{}", self.operation))
            .field("args", self.args)
            .finish()
    }
}

impl fmt::Display for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} on {}", self.operation, self.args, self.subject)
    }
}

/// Placeholder for arguments the harness cannot show because the call
/// consumes them before the observer runs.
#[derive(Clone, Copy)]
pub struct Opaque(pub &'static str);

impl Opaque {
    /// Placeholder naming the type of a moved argument.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>())
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// How an intercepted call failed.
#[derive(Clone, Copy)]
pub enum Failure<'a> {
    /// The target returned an error value.
    Error {
        /// Type name of the error.
        type_name: &'static str,
        error: &'a (dyn Error + 'static),
    },
    /// The target panicked. The panic resumes after observers have run.
    Panic { message: &'a str },
}

impl Failure<'_> {
    /// Type name of the error, or `panic`.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Error { type_name, .. } => *type_name,
            Self::Panic { .. } => "panic",
        }
    }

    /// Short type name: the last path segment outside any generic
    /// arguments.
    #[must_use]
    pub fn short_type_name(&self) -> &'static str {
        short_type_name(self.type_name())
    }

    /// Primary failure message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Error { error, .. } => error.to_string(),
            Self::Panic { message } => (*message).to_owned(),
        }
    }

    /// Messages of the error's source chain, outermost first, excluding the
    /// error itself.
    #[must_use]
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        if let Self::Error { error, .. } = self {
            let mut source = error.source();
            while let Some(cause) = source {
                causes.push(cause.to_string());
                source = cause.source();
            }
        }
        causes
    }

    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panic { .. })
    }
}

impl fmt::Debug for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error { type_name, error } => f
                .debug_struct("Error")
                .field("type_name", type_name)
                .field("error", error)
                .finish(),
            Self::Panic { message } => f.debug_struct("Panic").field("message", message).finish(),
        }
    }
}

impl fmt::Display for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.short_type_name(), self.message())
    }
}

pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    let start = head.rfind("::").map_or(0, |idx| idx + 2);
    &full[start..]
}

/// Receives the lifecycle of every intercepted call.
///
/// Observer methods run on the calling thread, inside the call. A panicking
/// observer is logged and otherwise ignored; it never replaces the target's
/// outcome.
pub trait CallObserver: Send + Sync {
    /// Before the target runs.
    fn before_invoke(&self, invocation: &Invocation<'_>);

    /// After the target ran, whatever the outcome, and after
    /// [`on_failure`](Self::on_failure) if the target failed.
    fn after_invoke(&self, _invocation: &Invocation<'_>) {}

    /// The target failed.
    fn on_failure(&self, failure: &Failure<'_>, invocation: &Invocation<'_>);
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CallObserver for NoopObserver {
    fn before_invoke(&self, _invocation: &Invocation<'_>) {}

    fn on_failure(&self, _failure: &Failure<'_>, _invocation: &Invocation<'_>) {}
}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn CallObserver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disk on fire")
        }
    }

    impl Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("write failed")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    const WRITE: Operation = Operation::new("Store", "write", "(u32)");

    #[test]
    fn error_failure_exposes_chain() {
        let error = Outer(Inner);
        let failure = Failure::Error {
            type_name: std::any::type_name::<Outer>(),
            error: &error,
        };
        assert_eq!(failure.short_type_name(), "Outer");
        assert_eq!(failure.message(), "write failed");
        assert_eq!(failure.causes(), vec!["disk on fire".to_owned()]);
        assert_eq!(failure.to_string(), "Outer: write failed");
        assert!(!failure.is_panic());
    }

    #[test]
    fn panic_failure() {
        let failure = Failure::Panic { message: "boom" };
        assert_eq!(failure.type_name(), "panic");
        assert_eq!(failure.message(), "boom");
        assert!(failure.causes().is_empty());
        assert!(failure.is_panic());
    }

    #[test]
    fn short_type_name_ignores_generic_arguments() {
        assert_eq!(short_type_name("a::b::Error"), "Error");
        assert_eq!(
            short_type_name("a::Wrapper<b::c::Inner>"),
            "Wrapper<b::c::Inner>"
        );
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn invocation_renders_operation_and_args() {
        let args = (7_u32,);
        let invocation = Invocation::new(SubjectId::of(&args), &WRITE, &args);
        let rendered = invocation.to_string();
        assert!(rendered.starts_with("Store::write(u32) (7,) on subject@"), "{rendered}");
        assert_eq!(invocation.capability(), "Store");
    }

    #[test]
    fn opaque_names_type() {
        assert_eq!(format!("{:?}", Opaque::of::<Vec<u8>>()), "<alloc::vec::Vec<u8>>");
    }
}

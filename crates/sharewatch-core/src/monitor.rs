//! The interception harness.
//!
//! [`Monitored`] is the stand-in that sits between a caller and the real
//! target. A capability surface gets interception by implementing its trait
//! for `Monitored<dyn Surface>` and forwarding every method through one of
//! the helpers below:
//!
//! ```ignore
//! impl Gauge for Monitored<dyn Gauge> {
//!     fn read(&self) -> i64 {
//!         self.call(gauge_ops::READ, &(), |gauge| gauge.read())
//!     }
//!
//!     fn snapshot(&self) -> Box<dyn Reading> {
//!         self.call_dependent(gauge_ops::SNAPSHOT, &(), |gauge| gauge.snapshot())
//!     }
//! }
//! ```
//!
//! Each helper runs the same protocol: `before_invoke`, the target call,
//! `on_failure` if the target returned an error or panicked, dependent
//! propagation of a successful result, and `after_invoke` whatever happened.
//! Errors are handed back unchanged and panics resume with their original
//! payload.

use std::any::Any;
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use sharewatch_error::UsageError;
use sharewatch_types::{Operation, SubjectId};

use crate::capability::{Capability, Subject};
use crate::description::Description;
use crate::observer::{Failure, Invocation, SharedObserver};

/// Wrap `target` so that every operation on the returned stand-in is
/// reported to `observer`.
#[must_use]
pub fn monitor<C: ?Sized + Capability>(
    target: Arc<C>,
    description: Arc<Description<C>>,
    observer: SharedObserver,
) -> Monitored<C> {
    Monitored::new(target, description, observer)
}

/// Interception stand-in for a target of capability `C`.
///
/// Holds nothing but its three shared references, so it is as thread-safe as
/// the target itself and cloning it is cheap. It never owns the target's
/// lifecycle beyond keeping it alive.
pub struct Monitored<C: ?Sized + Capability> {
    target: Arc<C>,
    description: Arc<Description<C>>,
    observer: SharedObserver,
}

impl<C: ?Sized + Capability> Monitored<C> {
    pub fn new(target: Arc<C>, description: Arc<Description<C>>, observer: SharedObserver) -> Self {
        tracing::debug!(
            capability = C::NAME,
            subject = %target.subject_id(),
            policy = description.equality_policy().name(),
            "sharewatch::monitor"
        );
        Self {
            target,
            description,
            observer,
        }
    }

    #[inline]
    #[must_use]
    pub const fn target(&self) -> &Arc<C> {
        &self.target
    }

    #[inline]
    #[must_use]
    pub const fn description(&self) -> &Arc<Description<C>> {
        &self.description
    }

    #[inline]
    #[must_use]
    pub const fn observer(&self) -> &SharedObserver {
        &self.observer
    }

    /// This stand-in as the capability surface.
    #[must_use]
    pub fn as_capability(&self) -> &C {
        C::view(self)
    }

    #[must_use]
    pub fn into_boxed(self) -> Box<C> {
        C::into_boxed(self)
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<C> {
        C::into_shared(self)
    }

    // === Forwarding ===

    /// Forward an infallible operation.
    pub fn call<R>(&self, operation: Operation, args: &dyn fmt::Debug, body: impl FnOnce(&C) -> R) -> R {
        self.intercept(operation, args, |target| Returned(body(target)), |outcome| outcome)
            .0
    }

    /// Forward a fallible operation. An `Err` is reported to the observer
    /// and returned unchanged.
    pub fn try_call<T, E>(
        &self,
        operation: Operation,
        args: &dyn fmt::Debug,
        body: impl FnOnce(&C) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: Error + 'static,
    {
        self.intercept(operation, args, body, |outcome| outcome)
    }

    /// Forward an infallible operation whose result may be dependent.
    pub fn call_dependent<P: Propagate>(
        &self,
        operation: Operation,
        args: &dyn fmt::Debug,
        body: impl FnOnce(&C) -> P,
    ) -> P {
        self.intercept(
            operation,
            args,
            |target| Returned(body(target)),
            |Returned(result)| Returned(self.propagate(&operation, result)),
        )
        .0
    }

    /// Forward a fallible operation whose successful result may be
    /// dependent.
    pub fn try_call_dependent<P, E>(
        &self,
        operation: Operation,
        args: &dyn fmt::Debug,
        body: impl FnOnce(&C) -> Result<P, E>,
    ) -> Result<P, E>
    where
        P: Propagate,
        E: Error + 'static,
    {
        self.intercept(operation, args, body, |outcome| {
            outcome.map(|result| self.propagate(&operation, result))
        })
    }

    fn intercept<O: Outcome>(
        &self,
        operation: Operation,
        args: &dyn fmt::Debug,
        body: impl FnOnce(&C) -> O,
        finish: impl FnOnce(O) -> O,
    ) -> O {
        let invocation = Invocation::new(self.target.subject_id(), &operation, args);
        notify("before_invoke", || self.observer.before_invoke(&invocation));

        match panic::catch_unwind(AssertUnwindSafe(|| body(&*self.target))) {
            Ok(outcome) => {
                if let Some(failure) = outcome.failure() {
                    notify("on_failure", || self.observer.on_failure(&failure, &invocation));
                }
                let outcome = finish(outcome);
                notify("after_invoke", || self.observer.after_invoke(&invocation));
                outcome
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                let failure = Failure::Panic { message: &message };
                notify("on_failure", || self.observer.on_failure(&failure, &invocation));
                notify("after_invoke", || self.observer.after_invoke(&invocation));
                panic::resume_unwind(payload)
            }
        }
    }

    fn propagate<P: Propagate>(&self, operation: &Operation, result: P) -> P {
        match Description::dependent_for::<P::Surface>(&self.description, operation) {
            Some(child) => {
                tracing::debug!(
                    operation = %operation,
                    child = <P::Surface as Capability>::NAME,
                    "sharewatch::propagate"
                );
                result.wrap(child, &self.observer)
            }
            None => result,
        }
    }

    // === Identity ===

    /// Equality against any instance of the surface, wrapped or not.
    ///
    /// True when `other` is this stand-in, when it is (or stands in for) the
    /// same target, or when the description's equality policy says so.
    ///
    /// # Panics
    ///
    /// Panics with [`UsageError::ReentrantEquality`] when the equality
    /// policy calls back into the equality test of this stand-in.
    #[must_use]
    pub fn equals(&self, other: &C) -> bool {
        if SubjectId::of(other) == SubjectId::of(self) {
            return true;
        }
        if other.subject_id() == self.target.subject_id() {
            return true;
        }
        let policy = self.description.equality_policy();
        let _guard = EqualityGuard::enter(SubjectId::of(self), C::NAME, policy.name());
        policy.equals(C::view(self), other)
    }
}

impl<C: ?Sized + Capability> Clone for Monitored<C> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            description: Arc::clone(&self.description),
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<C: ?Sized + Capability> Subject for Monitored<C> {
    fn subject_id(&self) -> SubjectId {
        self.target.subject_id()
    }

    fn is_monitored(&self) -> bool {
        true
    }
}

impl<C: ?Sized + Capability> PartialEq for Monitored<C> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(C::view(other))
    }
}

impl<C: ?Sized + Capability> Eq for Monitored<C> {}

impl<C: ?Sized + Capability + Hash> Hash for Monitored<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target.hash(state);
    }
}

impl<C: ?Sized + Capability + fmt::Display> fmt::Display for Monitored<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{monitored:{}}}", self.target)
    }
}

impl<C: ?Sized + Capability> fmt::Debug for Monitored<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitored")
            .field("capability", &C::NAME)
            .field("subject", &self.target.subject_id())
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

// === Dependent propagation ===

/// Results that can be wrapped when an operation is declared dependent.
///
/// Implemented for owned and shared capability instances and for optional
/// ones; the capability is fixed by the result type, so a registration for
/// a different surface can never be applied.
pub trait Propagate: Sized {
    /// Capability surface of the result.
    type Surface: ?Sized + Capability;

    /// Wrap the result with `description`, reporting to `observer`.
    fn wrap(self, description: Arc<Description<Self::Surface>>, observer: &SharedObserver) -> Self;
}

impl<D: ?Sized + Capability> Propagate for Box<D> {
    type Surface = D;

    fn wrap(self, description: Arc<Description<D>>, observer: &SharedObserver) -> Self {
        D::into_boxed(Monitored::new(Arc::from(self), description, Arc::clone(observer)))
    }
}

impl<D: ?Sized + Capability> Propagate for Arc<D> {
    type Surface = D;

    fn wrap(self, description: Arc<Description<D>>, observer: &SharedObserver) -> Self {
        D::into_shared(Monitored::new(self, description, Arc::clone(observer)))
    }
}

impl<P: Propagate> Propagate for Option<P> {
    type Surface = P::Surface;

    fn wrap(self, description: Arc<Description<P::Surface>>, observer: &SharedObserver) -> Self {
        self.map(|result| result.wrap(description, observer))
    }
}

// === Outcomes ===

trait Outcome {
    fn failure(&self) -> Option<Failure<'_>>;
}

struct Returned<R>(R);

impl<R> Outcome for Returned<R> {
    fn failure(&self) -> Option<Failure<'_>> {
        None
    }
}

impl<T, E: Error + 'static> Outcome for Result<T, E> {
    fn failure(&self) -> Option<Failure<'_>> {
        self.as_ref().err().map(|error| Failure::Error {
            type_name: std::any::type_name::<E>(),
            error,
        })
    }
}

fn notify(event: &'static str, callback: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        tracing::error!(
            event,
            panic = %panic_message(&*payload),
            "sharewatch::observer_panicked"
        );
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

// === Equality re-entrancy ===

thread_local! {
    static COMPARING: RefCell<Vec<SubjectId>> = const { RefCell::new(Vec::new()) };
}

struct EqualityGuard {
    key: SubjectId,
}

impl EqualityGuard {
    fn enter(key: SubjectId, capability: &'static str, policy: &'static str) -> Self {
        let reentered = COMPARING.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&key) {
                true
            } else {
                active.push(key);
                false
            }
        });
        if reentered {
            let violation = UsageError::ReentrantEquality { capability, policy };
            tracing::error!(error = %violation, "sharewatch::usage_violation");
            panic!("{violation}");
        }
        Self { key }
    }
}

impl Drop for EqualityGuard {
    fn drop(&mut self) {
        let _ = COMPARING.try_with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|key| *key == self.key) {
                active.remove(pos);
            }
        });
    }
}

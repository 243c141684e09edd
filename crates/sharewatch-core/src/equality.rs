//! Pluggable equality for capability instances.
//!
//! Once objects are wrapped, address identity no longer tells whether two
//! references denote "the same" value, so every description carries an
//! [`EqualityPolicy`].
//!
//! **Invariant:** a policy never calls `==` on its two arguments. The first
//! argument may be a monitored stand-in, and its equality test is the very
//! code that invoked the policy. Policies compare by projecting to
//! capability operations (sizes, elements, fields) instead.

use std::fmt;
use std::marker::PhantomData;

use crate::capability::Subject;

/// Decides when two instances of capability `C` are equal.
///
/// Implementations must be an equivalence relation (reflexive, symmetric,
/// transitive) and must be consistent across repeated calls while neither
/// argument changes.
pub trait EqualityPolicy<C: ?Sized>: Send + Sync + 'static {
    /// Whether `a` and `b` are equal under this policy.
    fn equals(&self, a: &C, b: &C) -> bool;

    /// Stable policy name. Two descriptions only compare equal when their
    /// policies share a name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Identity of the underlying object.
///
/// The default policy: a stand-in equals its own target and any other
/// stand-in of the same target, and nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReferenceIdentity;

impl<C: ?Sized + Subject> EqualityPolicy<C> for ReferenceIdentity {
    fn equals(&self, a: &C, b: &C) -> bool {
        a.subject_id() == b.subject_id()
    }

    fn name(&self) -> &'static str {
        "reference-identity"
    }
}

/// A custom policy backed by a closure.
///
/// ```ignore
/// let by_value = FnPolicy::<dyn Gauge, _>::new("gauge-by-value", |a, b| a.read() == b.read());
/// ```
pub struct FnPolicy<C: ?Sized, F> {
    name: &'static str,
    compare: F,
    _surface: PhantomData<fn(&C)>,
}

impl<C: ?Sized, F> FnPolicy<C, F>
where
    F: Fn(&C, &C) -> bool,
{
    /// Name the policy and supply its comparison.
    #[must_use]
    pub const fn new(name: &'static str, compare: F) -> Self {
        Self {
            name,
            compare,
            _surface: PhantomData,
        }
    }
}

impl<C: ?Sized, F> fmt::Debug for FnPolicy<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy").field("name", &self.name).finish()
    }
}

impl<C, F> EqualityPolicy<C> for FnPolicy<C, F>
where
    C: ?Sized + 'static,
    F: Fn(&C, &C) -> bool + Send + Sync + 'static,
{
    fn equals(&self, a: &C, b: &C) -> bool {
        (self.compare)(a, b)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

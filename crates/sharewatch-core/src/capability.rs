//! Capability surfaces.
//!
//! A capability surface is an ordinary trait whose supertrait is [`Subject`].
//! Its trait-object type (`dyn Surface`) implements [`Capability`], which
//! names the surface, lists its interceptable operations and knows how to
//! present a [`Monitored`] stand-in as the surface again.

use std::sync::Arc;

use sharewatch_types::{Operation, SubjectId};

use crate::monitor::Monitored;

/// Identity of whatever performs the work behind a reference.
///
/// Every capability surface extends this trait. The defaults are correct
/// for real targets; [`Monitored`] overrides both so that a stand-in
/// reports the identity of its target.
pub trait Subject: Send + Sync {
    /// Identity of the underlying object.
    fn subject_id(&self) -> SubjectId {
        SubjectId::of(self)
    }

    /// Whether this reference is an interception stand-in.
    fn is_monitored(&self) -> bool {
        false
    }
}

/// Implemented by the trait-object type of a capability surface.
///
/// ```ignore
/// impl Capability for dyn Gauge {
///     const NAME: &'static str = "Gauge";
///     const OPERATIONS: &'static [Operation] = &[gauge_ops::READ, gauge_ops::ADD];
///
///     fn view(monitored: &Monitored<Self>) -> &Self { monitored }
///     fn into_boxed(monitored: Monitored<Self>) -> Box<Self> { Box::new(monitored) }
///     fn into_shared(monitored: Monitored<Self>) -> Arc<Self> { Arc::new(monitored) }
/// }
/// ```
///
/// The three conversions only type-check once `Monitored<dyn Gauge>`
/// implements `Gauge`, i.e. once the forwarding decorator exists.
pub trait Capability: Subject + 'static {
    /// Capability-surface identifier.
    const NAME: &'static str;

    /// Every operation the surface exposes for interception.
    const OPERATIONS: &'static [Operation];

    /// Present a stand-in as the surface.
    fn view(monitored: &Monitored<Self>) -> &Self;

    /// Box a stand-in as the surface.
    fn into_boxed(monitored: Monitored<Self>) -> Box<Self>;

    /// Share a stand-in as the surface.
    fn into_shared(monitored: Monitored<Self>) -> Arc<Self>;

    /// Whether `operation` belongs to this surface.
    fn declares(operation: &Operation) -> bool {
        operation.capability() == Self::NAME && Self::OPERATIONS.contains(operation)
    }
}

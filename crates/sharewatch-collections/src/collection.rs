//! The plain collection surface: a bag of elements that can be counted,
//! searched and traversed.

use std::fmt;
use std::sync::Arc;

use sharewatch_core::{Capability, Monitored, Operation, Subject};

use crate::Element;
use crate::cursor::Cursor;

pub trait Collection<T: Element>: Subject {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, value: &T) -> bool;

    fn iter(&self) -> Box<dyn Cursor<T>>;

    /// Copy of the current elements in traversal order.
    fn to_vec(&self) -> Vec<T>;

    /// Equality as decided by a monitored stand-in; `None` for plain collections.
    #[doc(hidden)]
    fn monitored_eq(&self, _other: &(dyn Collection<T> + 'static)) -> Option<bool> {
        None
    }

    /// Rendering of a monitored stand-in; `None` for plain collections.
    #[doc(hidden)]
    fn monitored_fmt(&self, _f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        None
    }
}

pub mod ops {
    use sharewatch_core::Operation;

    pub const LEN: Operation = Operation::new("Collection", "len", "()");
    pub const IS_EMPTY: Operation = Operation::new("Collection", "is_empty", "()");
    pub const CONTAINS: Operation = Operation::new("Collection", "contains", "(&T)");
    pub const ITER: Operation = Operation::new("Collection", "iter", "()").returning("Cursor");
    pub const TO_VEC: Operation = Operation::new("Collection", "to_vec", "()");
}

impl<T: Element> Capability for dyn Collection<T> {
    const NAME: &'static str = "Collection";
    const OPERATIONS: &'static [Operation] =
        &[ops::LEN, ops::IS_EMPTY, ops::CONTAINS, ops::ITER, ops::TO_VEC];

    fn view(monitored: &Monitored<Self>) -> &Self {
        monitored
    }

    fn into_boxed(monitored: Monitored<Self>) -> Box<Self> {
        Box::new(monitored)
    }

    fn into_shared(monitored: Monitored<Self>) -> Arc<Self> {
        Arc::new(monitored)
    }
}

impl<T: Element> Collection<T> for Monitored<dyn Collection<T>> {
    fn len(&self) -> usize {
        self.call(ops::LEN, &(), |collection| collection.len())
    }

    fn is_empty(&self) -> bool {
        self.call(ops::IS_EMPTY, &(), |collection| collection.is_empty())
    }

    fn contains(&self, value: &T) -> bool {
        self.call(ops::CONTAINS, &value, |collection| collection.contains(value))
    }

    fn iter(&self) -> Box<dyn Cursor<T>> {
        self.call_dependent(ops::ITER, &(), |collection| collection.iter())
    }

    fn to_vec(&self) -> Vec<T> {
        self.call(ops::TO_VEC, &(), |collection| collection.to_vec())
    }

    fn monitored_eq(&self, other: &(dyn Collection<T> + 'static)) -> Option<bool> {
        Some(self.equals(other))
    }

    fn monitored_fmt(&self, f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        Some(fmt::Display::fmt(self, f))
    }
}

// Like a bag without defined equality, collections compare by identity.
impl<T: Element> PartialEq for dyn Collection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.monitored_eq(other)
            .or_else(|| other.monitored_eq(self))
            .unwrap_or_else(|| self.subject_id() == other.subject_id())
    }
}

impl<T: Element> Eq for dyn Collection<T> {}

impl<T: Element> fmt::Display for dyn Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rendered) = self.monitored_fmt(f) {
            return rendered;
        }
        f.debug_list().entries(self.to_vec()).finish()
    }
}

impl<T: Element> fmt::Debug for dyn Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

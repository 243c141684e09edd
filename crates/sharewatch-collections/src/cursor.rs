//! The cursor surface: a forward traversal that can remove the element it
//! last returned.

use std::fmt;
use std::sync::Arc;

use sharewatch_core::{Capability, Monitored, Operation, Subject};

use crate::Element;
use crate::error::Result;

pub trait Cursor<T: Element>: Subject {
    /// Whether another element is available. Never fails, even when the
    /// underlying storage changed.
    fn has_next(&self) -> bool;

    /// The next element, or `None` at the end.
    fn next(&self) -> Result<Option<T>>;

    /// Remove the element returned by the last `next`.
    fn remove(&self) -> Result<()>;

    /// Equality as decided by a monitored stand-in; `None` for plain cursors.
    #[doc(hidden)]
    fn monitored_eq(&self, _other: &(dyn Cursor<T> + 'static)) -> Option<bool> {
        None
    }
}

pub mod ops {
    use sharewatch_core::Operation;

    pub const HAS_NEXT: Operation = Operation::new("Cursor", "has_next", "()");
    pub const NEXT: Operation = Operation::new("Cursor", "next", "()");
    pub const REMOVE: Operation = Operation::new("Cursor", "remove", "()");
}

impl<T: Element> Capability for dyn Cursor<T> {
    const NAME: &'static str = "Cursor";
    const OPERATIONS: &'static [Operation] = &[ops::HAS_NEXT, ops::NEXT, ops::REMOVE];

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

impl<T: Element> Cursor<T> for Monitored<dyn Cursor<T>> {
    fn has_next(&self) -> bool {
        self.call(ops::HAS_NEXT, &(), |cursor| cursor.has_next())
    }

    fn next(&self) -> Result<Option<T>> {
        self.try_call(ops::NEXT, &(), |cursor| cursor.next())
    }

    fn remove(&self) -> Result<()> {
        self.try_call(ops::REMOVE, &(), |cursor| cursor.remove())
    }

    fn monitored_eq(&self, other: &(dyn Cursor<T> + 'static)) -> Option<bool> {
        Some(self.equals(other))
    }
}

// Cursors have no value semantics: two cursors are equal only if they are
// the same cursor.
impl<T: Element> PartialEq for dyn Cursor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.monitored_eq(other)
            .or_else(|| other.monitored_eq(self))
            .unwrap_or_else(|| self.subject_id() == other.subject_id())
    }
}

impl<T: Element> Eq for dyn Cursor<T> {}

impl<T: Element> fmt::Debug for dyn Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("subject", &self.subject_id())
            .field("monitored", &self.is_monitored())
            .finish()
    }
}

/// Adapts a cursor to [`Iterator`]. Yields the first error and then stops.
pub struct Elements<'a, T: Element> {
    cursor: &'a dyn Cursor<T>,
    done: bool,
}

impl<T: Element> Iterator for Elements<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Iterate the remaining elements of `cursor`.
pub fn elements<T: Element>(cursor: &dyn Cursor<T>) -> Elements<'_, T> {
    Elements {
        cursor,
        done: false,
    }
}

/// Collect the remaining elements of `cursor`.
///
/// # Errors
///
/// Returns the first error raised by the cursor.
pub fn drain<T: Element>(cursor: &dyn Cursor<T>) -> Result<Vec<T>> {
    elements(cursor).collect()
}

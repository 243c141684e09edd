//! The set surface: unordered, duplicate-free membership.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use sharewatch_core::{Capability, EqualityPolicy, Monitored, Opaque, Operation, Subject};

use crate::Element;
use crate::cursor::Cursor;
use crate::equality::SetEquality;
use crate::error::Result;

pub trait Set<T: Element>: Subject {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, value: &T) -> bool;

    /// Add `value`; `false` if it was already present.
    fn insert(&self, value: T) -> Result<bool>;

    /// Remove `value`; `false` if it was absent.
    fn remove(&self, value: &T) -> Result<bool>;

    fn clear(&self) -> Result<()>;

    fn iter(&self) -> Box<dyn Cursor<T>>;

    fn to_vec(&self) -> Vec<T>;

    /// Equality as decided by a monitored stand-in; `None` for plain sets.
    #[doc(hidden)]
    fn monitored_eq(&self, _other: &(dyn Set<T> + 'static)) -> Option<bool> {
        None
    }

    /// Rendering of a monitored stand-in; `None` for plain sets.
    #[doc(hidden)]
    fn monitored_fmt(&self, _f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        None
    }
}

pub mod ops {
    use sharewatch_core::Operation;

    pub const LEN: Operation = Operation::new("Set", "len", "()");
    pub const IS_EMPTY: Operation = Operation::new("Set", "is_empty", "()");
    pub const CONTAINS: Operation = Operation::new("Set", "contains", "(&T)");
    pub const INSERT: Operation = Operation::new("Set", "insert", "(T)");
    pub const REMOVE: Operation = Operation::new("Set", "remove", "(&T)");
    pub const CLEAR: Operation = Operation::new("Set", "clear", "()");
    pub const ITER: Operation = Operation::new("Set", "iter", "()").returning("Cursor");
    pub const TO_VEC: Operation = Operation::new("Set", "to_vec", "()");
}

impl<T: Element> Capability for dyn Set<T> {
    const NAME: &'static str = "Set";
    const OPERATIONS: &'static [Operation] = &[
        ops::LEN,
        ops::IS_EMPTY,
        ops::CONTAINS,
        ops::INSERT,
        ops::REMOVE,
        ops::CLEAR,
        ops::ITER,
        ops::TO_VEC,
    ];

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

impl<T: Element> Set<T> for Monitored<dyn Set<T>> {
    fn len(&self) -> usize {
        self.call(ops::LEN, &(), |set| set.len())
    }

    fn is_empty(&self) -> bool {
        self.call(ops::IS_EMPTY, &(), |set| set.is_empty())
    }

    fn contains(&self, value: &T) -> bool {
        self.call(ops::CONTAINS, &value, |set| set.contains(value))
    }

    fn insert(&self, value: T) -> Result<bool> {
        self.try_call(ops::INSERT, &Opaque::of::<T>(), |set| set.insert(value))
    }

    fn remove(&self, value: &T) -> Result<bool> {
        self.try_call(ops::REMOVE, &value, |set| set.remove(value))
    }

    fn clear(&self) -> Result<()> {
        self.try_call(ops::CLEAR, &(), |set| set.clear())
    }

    fn iter(&self) -> Box<dyn Cursor<T>> {
        self.call_dependent(ops::ITER, &(), |set| set.iter())
    }

    fn to_vec(&self) -> Vec<T> {
        self.call(ops::TO_VEC, &(), |set| set.to_vec())
    }

    fn monitored_eq(&self, other: &(dyn Set<T> + 'static)) -> Option<bool> {
        Some(self.equals(other))
    }

    fn monitored_fmt(&self, f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        Some(fmt::Display::fmt(self, f))
    }
}

impl<T: Element> PartialEq for dyn Set<T> {
    fn eq(&self, other: &Self) -> bool {
        self.monitored_eq(other)
            .or_else(|| other.monitored_eq(self))
            .unwrap_or_else(|| {
                self.subject_id() == other.subject_id() || SetEquality.equals(self, other)
            })
    }
}

impl<T: Element> Eq for dyn Set<T> {}

/// Order independent: the sum of the element hashes.
impl<T: Element + Hash> Hash for dyn Set<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let sum = self
            .to_vec()
            .iter()
            .map(|item| {
                let mut hasher = DefaultHasher::new();
                item.hash(&mut hasher);
                hasher.finish()
            })
            .fold(0_u64, u64::wrapping_add);
        state.write_u64(sum);
    }
}

impl<T: Element> fmt::Display for dyn Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rendered) = self.monitored_fmt(f) {
            return rendered;
        }
        f.debug_set().entries(self.to_vec()).finish()
    }
}

impl<T: Element> fmt::Debug for dyn Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

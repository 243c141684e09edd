//! The list surface: positional access over an ordered sequence.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use sharewatch_core::{Capability, EqualityPolicy, Monitored, Opaque, Operation, Subject};

use crate::Element;
use crate::cursor::Cursor;
use crate::equality::ListEquality;
use crate::error::Result;

pub trait List<T: Element>: Subject {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<T>;

    fn contains(&self, value: &T) -> bool;

    fn index_of(&self, value: &T) -> Option<usize>;

    fn push(&self, value: T) -> Result<()>;

    fn insert(&self, index: usize, value: T) -> Result<()>;

    /// Replace the element at `index`, returning the previous one.
    fn set(&self, index: usize, value: T) -> Result<T>;

    fn remove(&self, index: usize) -> Result<T>;

    fn clear(&self) -> Result<()>;

    fn iter(&self) -> Box<dyn Cursor<T>>;

    /// Cursor positioned before the element at `index`.
    fn cursor_from(&self, index: usize) -> Result<Box<dyn Cursor<T>>>;

    /// Live view of `from..to`. Changes through the view are visible in the
    /// list and vice versa; structural changes that bypass the view
    /// invalidate it.
    fn sub_list(&self, from: usize, to: usize) -> Result<Arc<dyn List<T>>>;

    fn to_vec(&self) -> Result<Vec<T>>;

    /// Equality as decided by a monitored stand-in; `None` for plain lists.
    #[doc(hidden)]
    fn monitored_eq(&self, _other: &(dyn List<T> + 'static)) -> Option<bool> {
        None
    }

    /// Rendering of a monitored stand-in; `None` for plain lists.
    #[doc(hidden)]
    fn monitored_fmt(&self, _f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        None
    }
}

pub mod ops {
    use sharewatch_core::Operation;

    pub const LEN: Operation = Operation::new("List", "len", "()");
    pub const IS_EMPTY: Operation = Operation::new("List", "is_empty", "()");
    pub const GET: Operation = Operation::new("List", "get", "(usize)");
    pub const CONTAINS: Operation = Operation::new("List", "contains", "(&T)");
    pub const INDEX_OF: Operation = Operation::new("List", "index_of", "(&T)");
    pub const PUSH: Operation = Operation::new("List", "push", "(T)");
    pub const INSERT: Operation = Operation::new("List", "insert", "(usize, T)");
    pub const SET: Operation = Operation::new("List", "set", "(usize, T)");
    pub const REMOVE: Operation = Operation::new("List", "remove", "(usize)");
    pub const CLEAR: Operation = Operation::new("List", "clear", "()");
    pub const ITER: Operation = Operation::new("List", "iter", "()").returning("Cursor");
    pub const CURSOR_FROM: Operation =
        Operation::new("List", "cursor_from", "(usize)").returning("Cursor");
    pub const SUB_LIST: Operation =
        Operation::new("List", "sub_list", "(usize, usize)").returning("List");
    pub const TO_VEC: Operation = Operation::new("List", "to_vec", "()");
}

impl<T: Element> Capability for dyn List<T> {
    const NAME: &'static str = "List";
    const OPERATIONS: &'static [Operation] = &[
        ops::LEN,
        ops::IS_EMPTY,
        ops::GET,
        ops::CONTAINS,
        ops::INDEX_OF,
        ops::PUSH,
        ops::INSERT,
        ops::SET,
        ops::REMOVE,
        ops::CLEAR,
        ops::ITER,
        ops::CURSOR_FROM,
        ops::SUB_LIST,
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

impl<T: Element> List<T> for Monitored<dyn List<T>> {
    fn len(&self) -> usize {
        self.call(ops::LEN, &(), |list| list.len())
    }

    fn is_empty(&self) -> bool {
        self.call(ops::IS_EMPTY, &(), |list| list.is_empty())
    }

    fn get(&self, index: usize) -> Result<T> {
        self.try_call(ops::GET, &index, |list| list.get(index))
    }

    fn contains(&self, value: &T) -> bool {
        self.call(ops::CONTAINS, &value, |list| list.contains(value))
    }

    fn index_of(&self, value: &T) -> Option<usize> {
        self.call(ops::INDEX_OF, &value, |list| list.index_of(value))
    }

    fn push(&self, value: T) -> Result<()> {
        self.try_call(ops::PUSH, &Opaque::of::<T>(), |list| list.push(value))
    }

    fn insert(&self, index: usize, value: T) -> Result<()> {
        self.try_call(ops::INSERT, &(index, Opaque::of::<T>()), |list| {
            list.insert(index, value)
        })
    }

    fn set(&self, index: usize, value: T) -> Result<T> {
        self.try_call(ops::SET, &(index, Opaque::of::<T>()), |list| list.set(index, value))
    }

    fn remove(&self, index: usize) -> Result<T> {
        self.try_call(ops::REMOVE, &index, |list| list.remove(index))
    }

    fn clear(&self) -> Result<()> {
        self.try_call(ops::CLEAR, &(), |list| list.clear())
    }

    fn iter(&self) -> Box<dyn Cursor<T>> {
        self.call_dependent(ops::ITER, &(), |list| list.iter())
    }

    fn cursor_from(&self, index: usize) -> Result<Box<dyn Cursor<T>>> {
        self.try_call_dependent(ops::CURSOR_FROM, &index, |list| list.cursor_from(index))
    }

    fn sub_list(&self, from: usize, to: usize) -> Result<Arc<dyn List<T>>> {
        self.try_call_dependent(ops::SUB_LIST, &(from, to), |list| list.sub_list(from, to))
    }

    fn to_vec(&self) -> Result<Vec<T>> {
        self.try_call(ops::TO_VEC, &(), |list| list.to_vec())
    }

    fn monitored_eq(&self, other: &(dyn List<T> + 'static)) -> Option<bool> {
        Some(self.equals(other))
    }

    fn monitored_fmt(&self, f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        Some(fmt::Display::fmt(self, f))
    }
}

impl<T: Element> PartialEq for dyn List<T> {
    fn eq(&self, other: &Self) -> bool {
        self.monitored_eq(other)
            .or_else(|| other.monitored_eq(self))
            .unwrap_or_else(|| {
                self.subject_id() == other.subject_id() || ListEquality.equals(self, other)
            })
    }
}

impl<T: Element> Eq for dyn List<T> {}

/// Positional: equal lists hash equally. Hashing stops at the first
/// element that can no longer be read.
impl<T: Element + Hash> Hash for dyn List<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let len = self.len();
        len.hash(state);
        for index in 0..len {
            match self.get(index) {
                Ok(item) => item.hash(state),
                Err(_) => break,
            }
        }
    }
}

impl<T: Element> fmt::Display for dyn List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rendered) = self.monitored_fmt(f) {
            return rendered;
        }
        match self.to_vec() {
            Ok(items) => f.debug_list().entries(items).finish(),
            Err(err) => write!(f, "[<{err}>]"),
        }
    }
}

impl<T: Element> fmt::Debug for dyn List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

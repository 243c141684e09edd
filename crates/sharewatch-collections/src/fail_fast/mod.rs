//! Fail-fast reference containers.
//!
//! Every operation is individually atomic (one `RwLock` around the
//! storage), but nothing makes a *sequence* of operations atomic. Each
//! storage carries a structural modification count; cursors and sub-list
//! views remember the count they were created with and fail with
//! [`CollectionError::ConcurrentModification`] once the storage was
//! structurally changed by anyone else. This reproduces the classic
//! "iterating while another thread adds" failure that monitoring is meant to
//! diagnose.

mod list;
mod map;
mod set;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use sharewatch_core::Subject;

pub use list::FailFastList;
pub use map::{FailFastMap, MapEntries, MapKeys, MapValues};
pub use set::FailFastSet;

use crate::Element;
use crate::cursor::Cursor;
use crate::error::{CollectionError, Result};

struct Inner<S> {
    items: Vec<S>,
    mod_count: u64,
}

impl<S> Inner<S> {
    /// Record a structural modification and return the new count.
    fn bump(&mut self) -> u64 {
        self.mod_count += 1;
        self.mod_count
    }

    fn check(&self, expected: u64) -> Result<()> {
        if self.mod_count == expected {
            Ok(())
        } else {
            Err(CollectionError::ConcurrentModification {
                expected,
                actual: self.mod_count,
            })
        }
    }
}

struct Storage<S> {
    inner: RwLock<Inner<S>>,
}

impl<S> Storage<S> {
    fn new(items: Vec<S>) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner {
                items,
                mod_count: 0,
            }),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<S>> {
        self.inner.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<S>> {
        self.inner.write()
    }

    fn mod_count(&self) -> u64 {
        self.read().mod_count
    }
}

/// Bounds of a sub-list view inside its root storage.
///
/// `len` and `expected` only change while the storage write lock is held.
struct Window {
    offset: usize,
    len: AtomicUsize,
    expected: AtomicU64,
    parent: Option<Arc<Window>>,
}

impl Window {
    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    fn expected(&self) -> u64 {
        self.expected.load(Ordering::Relaxed)
    }
}

/// Apply a structural change of `delta` elements, made through a view, to
/// the view and all of its ancestors.
fn adjust(window: Option<&Arc<Window>>, delta: isize, mod_count: u64) {
    let mut current = window;
    while let Some(window) = current {
        let len = window.len();
        let len = len.checked_add_signed(delta).unwrap_or(0);
        window.len.store(len, Ordering::Relaxed);
        window.expected.store(mod_count, Ordering::Relaxed);
        current = window.parent.as_ref();
    }
}

/// `(offset, len)` of the region a view covers, after checking that the
/// view is still valid.
fn region<S>(inner: &Inner<S>, window: Option<&Arc<Window>>) -> Result<(usize, usize)> {
    match window {
        None => Ok((0, inner.items.len())),
        Some(window) => {
            inner.check(window.expected())?;
            Ok((window.offset, window.len()))
        }
    }
}

struct CursorState {
    position: usize,
    last: Option<usize>,
    expected: u64,
}

/// Cursor over a storage region, projecting each stored item to the
/// element type of the surface it serves (e.g. only the key of a map
/// entry).
struct FailFastCursor<S, T> {
    storage: Arc<Storage<S>>,
    window: Option<Arc<Window>>,
    project: fn(&S) -> T,
    state: Mutex<CursorState>,
}

impl<S, T> FailFastCursor<S, T>
where
    S: Send + Sync + 'static,
    T: Element,
{
    fn boxed(
        storage: &Arc<Storage<S>>,
        window: Option<&Arc<Window>>,
        project: fn(&S) -> T,
        start: usize,
        expected: u64,
    ) -> Box<dyn Cursor<T>> {
        Box::new(Self {
            storage: Arc::clone(storage),
            window: window.cloned(),
            project,
            state: Mutex::new(CursorState {
                position: start,
                last: None,
                expected,
            }),
        })
    }

    fn bounds(&self, inner: &Inner<S>) -> (usize, usize) {
        match &self.window {
            None => (0, inner.items.len()),
            Some(window) => (window.offset, window.len()),
        }
    }
}

impl<S, T> Subject for FailFastCursor<S, T>
where
    S: Send + Sync,
    T: Send + Sync,
{
}

impl<S, T> Cursor<T> for FailFastCursor<S, T>
where
    S: Send + Sync + 'static,
    T: Element,
{
    fn has_next(&self) -> bool {
        let inner = self.storage.read();
        let (_, len) = self.bounds(&inner);
        self.state.lock().position < len
    }

    fn next(&self) -> Result<Option<T>> {
        let inner = self.storage.read();
        let mut state = self.state.lock();
        inner.check(state.expected)?;
        let (offset, len) = self.bounds(&inner);
        if state.position >= len {
            return Ok(None);
        }
        let item = (self.project)(&inner.items[offset + state.position]);
        state.last = Some(state.position);
        state.position += 1;
        Ok(Some(item))
    }

    fn remove(&self) -> Result<()> {
        let mut inner = self.storage.write();
        let mut state = self.state.lock();
        inner.check(state.expected)?;
        let last = state.last.take().ok_or(CollectionError::IllegalState {
            detail: "remove without a preceding next",
        })?;
        let (offset, _) = self.bounds(&inner);
        inner.items.remove(offset + last);
        let mod_count = inner.bump();
        adjust(self.window.as_ref(), -1, mod_count);
        state.expected = mod_count;
        state.position = last;
        Ok(())
    }
}

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize};

use sharewatch_core::Subject;

use super::{FailFastCursor, Storage, Window, adjust, region};
use crate::Element;
use crate::cursor::Cursor;
use crate::error::{CollectionError, Result};
use crate::list::List;

/// Growable list with fail-fast cursors and live sub-list views.
pub struct FailFastList<T> {
    storage: Arc<Storage<T>>,
    window: Option<Arc<Window>>,
}

impl<T: Element> FailFastList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            storage: Storage::new(items),
            window: None,
        }
    }

    /// Structural modifications made to the underlying storage so far.
    pub fn modification_count(&self) -> u64 {
        self.storage.mod_count()
    }

    fn cursor_at(&self, start: usize, expected: u64) -> Box<dyn Cursor<T>> {
        FailFastCursor::boxed(
            &self.storage,
            self.window.as_ref(),
            Clone::clone,
            start,
            expected,
        )
    }

    fn out_of_bounds(index: usize, len: usize) -> CollectionError {
        CollectionError::IndexOutOfBounds { index, len }
    }
}

impl<T: Element> Default for FailFastList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> FromIterator<T> for FailFastList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Element> fmt::Debug for FailFastList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.storage.read();
        match region(&inner, self.window.as_ref()) {
            Ok((offset, len)) => f.debug_list().entries(&inner.items[offset..offset + len]).finish(),
            Err(err) => write!(f, "[<{err}>]"),
        }
    }
}

impl<T: Element> Subject for FailFastList<T> {}

impl<T: Element> List<T> for FailFastList<T> {
    fn len(&self) -> usize {
        match &self.window {
            None => self.storage.read().items.len(),
            Some(window) => window.len(),
        }
    }

    fn get(&self, index: usize) -> Result<T> {
        let inner = self.storage.read();
        let (offset, len) = region(&inner, self.window.as_ref())?;
        if index >= len {
            return Err(Self::out_of_bounds(index, len));
        }
        Ok(inner.items[offset + index].clone())
    }

    fn contains(&self, value: &T) -> bool {
        self.index_of(value).is_some()
    }

    fn index_of(&self, value: &T) -> Option<usize> {
        let inner = self.storage.read();
        let (offset, len) = region(&inner, self.window.as_ref()).ok()?;
        inner.items[offset..offset + len]
            .iter()
            .position(|item| item == value)
    }

    fn push(&self, value: T) -> Result<()> {
        let mut inner = self.storage.write();
        let (offset, len) = region(&inner, self.window.as_ref())?;
        inner.items.insert(offset + len, value);
        let mod_count = inner.bump();
        adjust(self.window.as_ref(), 1, mod_count);
        Ok(())
    }

    fn insert(&self, index: usize, value: T) -> Result<()> {
        let mut inner = self.storage.write();
        let (offset, len) = region(&inner, self.window.as_ref())?;
        if index > len {
            return Err(Self::out_of_bounds(index, len));
        }
        inner.items.insert(offset + index, value);
        let mod_count = inner.bump();
        adjust(self.window.as_ref(), 1, mod_count);
        Ok(())
    }

    fn set(&self, index: usize, value: T) -> Result<T> {
        let mut inner = self.storage.write();
        let (offset, len) = region(&inner, self.window.as_ref())?;
        if index >= len {
            return Err(Self::out_of_bounds(index, len));
        }
        Ok(std::mem::replace(&mut inner.items[offset + index], value))
    }

    fn remove(&self, index: usize) -> Result<T> {
        let mut inner = self.storage.write();
        let (offset, len) = region(&inner, self.window.as_ref())?;
        if index >= len {
            return Err(Self::out_of_bounds(index, len));
        }
        let removed = inner.items.remove(offset + index);
        let mod_count = inner.bump();
        adjust(self.window.as_ref(), -1, mod_count);
        Ok(removed)
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.storage.write();
        let (offset, len) = region(&inner, self.window.as_ref())?;
        inner.items.drain(offset..offset + len);
        let mod_count = inner.bump();
        adjust(
            self.window.as_ref(),
            -isize::try_from(len).unwrap_or(isize::MAX),
            mod_count,
        );
        Ok(())
    }

    fn iter(&self) -> Box<dyn Cursor<T>> {
        let expected = match &self.window {
            None => self.storage.mod_count(),
            Some(window) => window.expected(),
        };
        self.cursor_at(0, expected)
    }

    fn cursor_from(&self, index: usize) -> Result<Box<dyn Cursor<T>>> {
        let inner = self.storage.read();
        let (_, len) = region(&inner, self.window.as_ref())?;
        if index > len {
            return Err(Self::out_of_bounds(index, len));
        }
        Ok(self.cursor_at(index, inner.mod_count))
    }

    fn sub_list(&self, from: usize, to: usize) -> Result<Arc<dyn List<T>>> {
        let inner = self.storage.read();
        let (offset, len) = region(&inner, self.window.as_ref())?;
        if from > to || to > len {
            return Err(CollectionError::InvalidRange { from, to, len });
        }
        let window = Window {
            offset: offset + from,
            len: AtomicUsize::new(to - from),
            expected: AtomicU64::new(inner.mod_count),
            parent: self.window.clone(),
        };
        Ok(Arc::new(Self {
            storage: Arc::clone(&self.storage),
            window: Some(Arc::new(window)),
        }))
    }

    fn to_vec(&self) -> Result<Vec<T>> {
        let inner = self.storage.read();
        let (offset, len) = region(&inner, self.window.as_ref())?;
        Ok(inner.items[offset..offset + len].to_vec())
    }
}

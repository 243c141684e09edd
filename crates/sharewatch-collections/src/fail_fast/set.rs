use std::fmt;
use std::sync::Arc;

use sharewatch_core::Subject;

use super::{FailFastCursor, Storage};
use crate::Element;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::set::Set;

/// Insertion-ordered set backed by a vector; membership is linear.
pub struct FailFastSet<T> {
    storage: Arc<Storage<T>>,
}

impl<T: Element> FailFastSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Later duplicates are dropped.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        let mut unique: Vec<T> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Self {
            storage: Storage::new(unique),
        }
    }

    pub fn modification_count(&self) -> u64 {
        self.storage.mod_count()
    }
}

impl<T: Element> Default for FailFastSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> FromIterator<T> for FailFastSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Element> fmt::Debug for FailFastSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.storage.read().items.iter()).finish()
    }
}

impl<T: Element> Subject for FailFastSet<T> {}

impl<T: Element> Set<T> for FailFastSet<T> {
    fn len(&self) -> usize {
        self.storage.read().items.len()
    }

    fn contains(&self, value: &T) -> bool {
        self.storage.read().items.contains(value)
    }

    fn insert(&self, value: T) -> Result<bool> {
        let mut inner = self.storage.write();
        if inner.items.contains(&value) {
            return Ok(false);
        }
        inner.items.push(value);
        inner.bump();
        Ok(true)
    }

    fn remove(&self, value: &T) -> Result<bool> {
        let mut inner = self.storage.write();
        let Some(index) = inner.items.iter().position(|item| item == value) else {
            return Ok(false);
        };
        inner.items.remove(index);
        inner.bump();
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.storage.write();
        inner.items.clear();
        inner.bump();
        Ok(())
    }

    fn iter(&self) -> Box<dyn Cursor<T>> {
        FailFastCursor::boxed(
            &self.storage,
            None,
            Clone::clone,
            0,
            self.storage.mod_count(),
        )
    }

    fn to_vec(&self) -> Vec<T> {
        self.storage.read().items.clone()
    }
}

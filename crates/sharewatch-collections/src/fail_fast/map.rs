use std::fmt;
use std::sync::Arc;

use sharewatch_core::Subject;

use super::{FailFastCursor, Inner, Storage};
use crate::Element;
use crate::collection::Collection;
use crate::cursor::Cursor;
use crate::error::{CollectionError, Result};
use crate::map::Map;
use crate::set::Set;

/// Insertion-ordered association list.
///
/// Replacing the value of an existing key is not a structural
/// modification; adding or removing a key is. The entry, key and value
/// views share the map's storage, so their cursors fail fast on the same
/// modifications.
pub struct FailFastMap<K, V> {
    storage: Arc<Storage<(K, V)>>,
}

fn position<K: PartialEq, V>(inner: &Inner<(K, V)>, key: &K) -> Option<usize> {
    inner.items.iter().position(|(candidate, _)| candidate == key)
}

fn key_of<K: Clone, V>(entry: &(K, V)) -> K {
    entry.0.clone()
}

fn value_of<K, V: Clone>(entry: &(K, V)) -> V {
    entry.1.clone()
}

fn remove_at<S>(inner: &mut Inner<S>, index: usize) -> S {
    let removed = inner.items.remove(index);
    inner.bump();
    removed
}

fn clear<S>(inner: &mut Inner<S>) {
    inner.items.clear();
    inner.bump();
}

impl<K: Element, V: Element> FailFastMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_entries(Vec::new())
    }

    /// A repeated key keeps its first position and its last value.
    #[must_use]
    pub fn from_entries(entries: Vec<(K, V)>) -> Self {
        let mut unique: Vec<(K, V)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match unique.iter_mut().find(|(candidate, _)| *candidate == key) {
                Some(slot) => slot.1 = value,
                None => unique.push((key, value)),
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

impl<K: Element, V: Element> Default for FailFastMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Element, V: Element> FromIterator<(K, V)> for FailFastMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(iter.into_iter().collect())
    }
}

impl<K: Element, V: Element> fmt::Debug for FailFastMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.storage.read();
        f.debug_map()
            .entries(inner.items.iter().map(|(key, value)| (key, value)))
            .finish()
    }
}

impl<K: Element, V: Element> Subject for FailFastMap<K, V> {}

impl<K: Element, V: Element> Map<K, V> for FailFastMap<K, V> {
    fn len(&self) -> usize {
        self.storage.read().items.len()
    }

    fn get(&self, key: &K) -> Option<V> {
        let inner = self.storage.read();
        position(&inner, key).map(|index| inner.items[index].1.clone())
    }

    fn contains_key(&self, key: &K) -> bool {
        position(&self.storage.read(), key).is_some()
    }

    fn insert(&self, key: K, value: V) -> Option<V> {
        let mut inner = self.storage.write();
        if let Some(index) = position(&inner, &key) {
            return Some(std::mem::replace(&mut inner.items[index].1, value));
        }
        inner.items.push((key, value));
        inner.bump();
        None
    }

    fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.storage.write();
        let index = position(&inner, key)?;
        Some(remove_at(&mut inner, index).1)
    }

    fn clear(&self) {
        clear(&mut self.storage.write());
    }

    fn entries(&self) -> Arc<dyn Set<(K, V)>> {
        Arc::new(MapEntries {
            storage: Arc::clone(&self.storage),
        })
    }

    fn keys(&self) -> Arc<dyn Set<K>> {
        Arc::new(MapKeys {
            storage: Arc::clone(&self.storage),
        })
    }

    fn values(&self) -> Arc<dyn Collection<V>> {
        Arc::new(MapValues {
            storage: Arc::clone(&self.storage),
        })
    }
}

/// Live `(key, value)` view of a [`FailFastMap`]. Removal writes through;
/// insertion is unsupported.
pub struct MapEntries<K, V> {
    storage: Arc<Storage<(K, V)>>,
}

impl<K: Element, V: Element> Subject for MapEntries<K, V> {}

impl<K: Element, V: Element> Set<(K, V)> for MapEntries<K, V> {
    fn len(&self) -> usize {
        self.storage.read().items.len()
    }

    fn contains(&self, entry: &(K, V)) -> bool {
        self.storage.read().items.contains(entry)
    }

    fn insert(&self, _entry: (K, V)) -> Result<bool> {
        Err(CollectionError::Unsupported {
            operation: "Set::insert",
        })
    }

    fn remove(&self, entry: &(K, V)) -> Result<bool> {
        let mut inner = self.storage.write();
        let Some(index) = inner.items.iter().position(|item| item == entry) else {
            return Ok(false);
        };
        remove_at(&mut inner, index);
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        clear(&mut self.storage.write());
        Ok(())
    }

    fn iter(&self) -> Box<dyn Cursor<(K, V)>> {
        FailFastCursor::boxed(
            &self.storage,
            None,
            Clone::clone,
            0,
            self.storage.mod_count(),
        )
    }

    fn to_vec(&self) -> Vec<(K, V)> {
        self.storage.read().items.clone()
    }
}

/// Live key view of a [`FailFastMap`].
pub struct MapKeys<K, V> {
    storage: Arc<Storage<(K, V)>>,
}

impl<K: Element, V: Element> Subject for MapKeys<K, V> {}

impl<K: Element, V: Element> Set<K> for MapKeys<K, V> {
    fn len(&self) -> usize {
        self.storage.read().items.len()
    }

    fn contains(&self, key: &K) -> bool {
        position(&self.storage.read(), key).is_some()
    }

    fn insert(&self, _key: K) -> Result<bool> {
        Err(CollectionError::Unsupported {
            operation: "Set::insert",
        })
    }

    fn remove(&self, key: &K) -> Result<bool> {
        let mut inner = self.storage.write();
        let Some(index) = position(&inner, key) else {
            return Ok(false);
        };
        remove_at(&mut inner, index);
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        clear(&mut self.storage.write());
        Ok(())
    }

    fn iter(&self) -> Box<dyn Cursor<K>> {
        FailFastCursor::boxed(&self.storage, None, key_of, 0, self.storage.mod_count())
    }

    fn to_vec(&self) -> Vec<K> {
        self.storage.read().items.iter().map(key_of).collect()
    }
}

/// Live value view of a [`FailFastMap`].
pub struct MapValues<K, V> {
    storage: Arc<Storage<(K, V)>>,
}

impl<K: Element, V: Element> Subject for MapValues<K, V> {}

impl<K: Element, V: Element> Collection<V> for MapValues<K, V> {
    fn len(&self) -> usize {
        self.storage.read().items.len()
    }

    fn contains(&self, value: &V) -> bool {
        self.storage
            .read()
            .items
            .iter()
            .any(|(_, candidate)| candidate == value)
    }

    fn iter(&self) -> Box<dyn Cursor<V>> {
        FailFastCursor::boxed(&self.storage, None, value_of, 0, self.storage.mod_count())
    }

    fn to_vec(&self) -> Vec<V> {
        self.storage.read().items.iter().map(value_of).collect()
    }
}

//! The map surface: key to value associations with live entry, key and
//! value views.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use sharewatch_core::{Capability, EqualityPolicy, Monitored, Opaque, Operation, Subject};

use crate::Element;
use crate::collection::Collection;
use crate::equality::MapEquality;
use crate::set::Set;

pub trait Map<K: Element, V: Element>: Subject {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &K) -> Option<V>;

    fn contains_key(&self, key: &K) -> bool;

    /// Associate `value` with `key`, returning the previous value.
    fn insert(&self, key: K, value: V) -> Option<V>;

    fn remove(&self, key: &K) -> Option<V>;

    fn clear(&self);

    /// Live view of the `(key, value)` entries.
    fn entries(&self) -> Arc<dyn Set<(K, V)>>;

    /// Live view of the keys.
    fn keys(&self) -> Arc<dyn Set<K>>;

    /// Live view of the values.
    fn values(&self) -> Arc<dyn Collection<V>>;

    /// Equality as decided by a monitored stand-in; `None` for plain maps.
    #[doc(hidden)]
    fn monitored_eq(&self, _other: &(dyn Map<K, V> + 'static)) -> Option<bool> {
        None
    }

    /// Rendering of a monitored stand-in; `None` for plain maps.
    #[doc(hidden)]
    fn monitored_fmt(&self, _f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        None
    }
}

pub mod ops {
    use sharewatch_core::Operation;

    pub const LEN: Operation = Operation::new("Map", "len", "()");
    pub const IS_EMPTY: Operation = Operation::new("Map", "is_empty", "()");
    pub const GET: Operation = Operation::new("Map", "get", "(&K)");
    pub const CONTAINS_KEY: Operation = Operation::new("Map", "contains_key", "(&K)");
    pub const INSERT: Operation = Operation::new("Map", "insert", "(K, V)");
    pub const REMOVE: Operation = Operation::new("Map", "remove", "(&K)");
    pub const CLEAR: Operation = Operation::new("Map", "clear", "()");
    pub const ENTRIES: Operation = Operation::new("Map", "entries", "()").returning("Set");
    pub const KEYS: Operation = Operation::new("Map", "keys", "()").returning("Set");
    pub const VALUES: Operation = Operation::new("Map", "values", "()").returning("Collection");
}

impl<K: Element, V: Element> Capability for dyn Map<K, V> {
    const NAME: &'static str = "Map";
    const OPERATIONS: &'static [Operation] = &[
        ops::LEN,
        ops::IS_EMPTY,
        ops::GET,
        ops::CONTAINS_KEY,
        ops::INSERT,
        ops::REMOVE,
        ops::CLEAR,
        ops::ENTRIES,
        ops::KEYS,
        ops::VALUES,
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

impl<K: Element, V: Element> Map<K, V> for Monitored<dyn Map<K, V>> {
    fn len(&self) -> usize {
        self.call(ops::LEN, &(), |map| map.len())
    }

    fn is_empty(&self) -> bool {
        self.call(ops::IS_EMPTY, &(), |map| map.is_empty())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.call(ops::GET, &key, |map| map.get(key))
    }

    fn contains_key(&self, key: &K) -> bool {
        self.call(ops::CONTAINS_KEY, &key, |map| map.contains_key(key))
    }

    fn insert(&self, key: K, value: V) -> Option<V> {
        self.call(
            ops::INSERT,
            &(Opaque::of::<K>(), Opaque::of::<V>()),
            |map| map.insert(key, value),
        )
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.call(ops::REMOVE, &key, |map| map.remove(key))
    }

    fn clear(&self) {
        self.call(ops::CLEAR, &(), |map| map.clear());
    }

    fn entries(&self) -> Arc<dyn Set<(K, V)>> {
        self.call_dependent(ops::ENTRIES, &(), |map| map.entries())
    }

    fn keys(&self) -> Arc<dyn Set<K>> {
        self.call_dependent(ops::KEYS, &(), |map| map.keys())
    }

    fn values(&self) -> Arc<dyn Collection<V>> {
        self.call_dependent(ops::VALUES, &(), |map| map.values())
    }

    fn monitored_eq(&self, other: &(dyn Map<K, V> + 'static)) -> Option<bool> {
        Some(self.equals(other))
    }

    fn monitored_fmt(&self, f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        Some(fmt::Display::fmt(self, f))
    }
}

impl<K: Element, V: Element> PartialEq for dyn Map<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.monitored_eq(other)
            .or_else(|| other.monitored_eq(self))
            .unwrap_or_else(|| {
                self.subject_id() == other.subject_id() || MapEquality.equals(self, other)
            })
    }
}

impl<K: Element, V: Element> Eq for dyn Map<K, V> {}

/// Order independent: the sum of the entry hashes.
impl<K: Element + Hash, V: Element + Hash> Hash for dyn Map<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let sum = self
            .entries()
            .to_vec()
            .iter()
            .map(|entry| {
                let mut hasher = DefaultHasher::new();
                entry.hash(&mut hasher);
                hasher.finish()
            })
            .fold(0_u64, u64::wrapping_add);
        state.write_u64(sum);
    }
}

impl<K: Element, V: Element> fmt::Display for dyn Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rendered) = self.monitored_fmt(f) {
            return rendered;
        }
        f.debug_map().entries(self.entries().to_vec()).finish()
    }
}

impl<K: Element, V: Element> fmt::Debug for dyn Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

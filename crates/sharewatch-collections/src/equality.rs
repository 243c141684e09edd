//! Equality policies for the container surfaces.
//!
//! Each policy short-circuits on a size mismatch and then compares through
//! the surface's own operations, never through `==` on the containers, so
//! either argument may be a monitored stand-in. Elements are compared with
//! their own `PartialEq`; an absent element (`None` in an `Option` element
//! type) compares equal only to another absent element.

use sharewatch_core::EqualityPolicy;

use crate::Element;
use crate::list::List;
use crate::map::Map;
use crate::set::Set;

/// Same length and pairwise equal elements in order.
///
/// Lists whose elements cannot be read (e.g. a stale sub-list view) are
/// unequal to everything but themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListEquality;

impl<T: Element> EqualityPolicy<dyn List<T>> for ListEquality {
    fn equals(&self, a: &dyn List<T>, b: &dyn List<T>) -> bool {
        let len = a.len();
        if len != b.len() {
            return false;
        }
        (0..len).all(|index| match (a.get(index), b.get(index)) {
            (Ok(left), Ok(right)) => left == right,
            _ => false,
        })
    }

    fn name(&self) -> &'static str {
        "list-equality"
    }
}

/// Same size and every element of `b` contained in `a`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SetEquality;

impl<T: Element> EqualityPolicy<dyn Set<T>> for SetEquality {
    fn equals(&self, a: &dyn Set<T>, b: &dyn Set<T>) -> bool {
        if a.len() != b.len() {
            return false;
        }
        b.to_vec().iter().all(|item| a.contains(item))
    }

    fn name(&self) -> &'static str {
        "set-equality"
    }
}

/// Same size and the same value for every key of `a` in `b`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MapEquality;

impl<K: Element, V: Element> EqualityPolicy<dyn Map<K, V>> for MapEquality {
    fn equals(&self, a: &dyn Map<K, V>, b: &dyn Map<K, V>) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.entries()
            .to_vec()
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| other == *value))
    }

    fn name(&self) -> &'static str {
        "map-equality"
    }
}

//! Default descriptions for the container surfaces.
//!
//! Descriptions are built on first use per element type and then shared
//! process-wide; every later call for the same surface returns the same
//! `Arc`. They are read-only once built.
//!
//! | surface | equality | dependents |
//! |---|---|---|
//! | cursor | reference identity | none |
//! | collection | reference identity | `iter` → cursor |
//! | list | [`ListEquality`] | `iter`, `cursor_from` → cursor; `sub_list` → list |
//! | set | [`SetEquality`] | `iter` → cursor |
//! | map | [`MapEquality`] | `entries` → set of pairs; `keys` → set; `values` → collection |
//!
//! # Panics
//!
//! The builders below only register operations their surfaces declare, so
//! they cannot fail. Should a surface's operation table ever disagree with
//! this catalog, the first lookup panics with the [`UsageError`] message.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use sharewatch_core::{Capability, Description, DescriptionBuilder, SharedObserver, monitor};
use sharewatch_error::UsageError;

use crate::Element;
use crate::collection::{self, Collection};
use crate::cursor::Cursor;
use crate::equality::{ListEquality, MapEquality, SetEquality};
use crate::list::{self, List};
use crate::map::{self, Map};
use crate::set::{self, Set};

type Registry = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Look up the description of `C`, building it on a miss.
///
/// `build` runs without the registry lock held, since it usually resolves
/// the descriptions of dependent surfaces first. When two threads race, the
/// first insertion wins and both get it.
fn cached<C: ?Sized + Capability>(build: impl FnOnce() -> Arc<Description<C>>) -> Arc<Description<C>> {
    let key = TypeId::of::<C>();
    if let Some(found) = lookup::<C>(registry().read().get(&key)) {
        return found;
    }
    let built = build();
    let mut entries = registry().write();
    let stored = entries
        .entry(key)
        .or_insert_with(|| Arc::clone(&built) as Arc<dyn Any + Send + Sync>);
    lookup::<C>(Some(&*stored)).unwrap_or(built)
}

fn lookup<C: ?Sized + Capability>(
    entry: Option<&Arc<dyn Any + Send + Sync>>,
) -> Option<Arc<Description<C>>> {
    Arc::clone(entry?).downcast::<Description<C>>().ok()
}

fn finish<C: ?Sized + Capability>(
    builder: Result<DescriptionBuilder<C>, UsageError>,
) -> Arc<Description<C>> {
    match builder {
        Ok(builder) => {
            let description = builder.build();
            tracing::debug!(
                capability = C::NAME,
                surface = std::any::type_name::<C>(),
                "sharewatch::catalog_built"
            );
            description
        }
        Err(err) => panic!("default {} description is invalid: {err}", C::NAME),
    }
}

/// Cursors: identity equality, nothing dependent.
#[must_use]
pub fn cursor_description<T: Element>() -> Arc<Description<dyn Cursor<T>>> {
    cached(|| finish(Ok(Description::<dyn Cursor<T>>::builder())))
}

#[must_use]
pub fn collection_description<T: Element>() -> Arc<Description<dyn Collection<T>>> {
    cached(|| {
        finish(
            Description::<dyn Collection<T>>::builder()
                .register_dependent(collection::ops::ITER, cursor_description::<T>()),
        )
    })
}

/// # Panics
///
/// See the [module documentation](self).
#[must_use]
pub fn list_description<T: Element>() -> Arc<Description<dyn List<T>>> {
    cached(|| {
        finish(
            Description::<dyn List<T>>::builder()
                .equality(ListEquality)
                .register_dependent(list::ops::ITER, cursor_description::<T>())
                .and_then(|builder| {
                    builder.register_dependent(list::ops::CURSOR_FROM, cursor_description::<T>())
                })
                .and_then(|builder| builder.register_self_dependent(list::ops::SUB_LIST)),
        )
    })
}

#[must_use]
pub fn set_description<T: Element>() -> Arc<Description<dyn Set<T>>> {
    cached(|| {
        finish(
            Description::<dyn Set<T>>::builder()
                .equality(SetEquality)
                .register_dependent(set::ops::ITER, cursor_description::<T>()),
        )
    })
}

#[must_use]
pub fn map_description<K: Element, V: Element>() -> Arc<Description<dyn Map<K, V>>> {
    cached(|| {
        finish(
            Description::<dyn Map<K, V>>::builder()
                .equality(MapEquality)
                .register_dependent(map::ops::ENTRIES, set_description::<(K, V)>())
                .and_then(|builder| builder.register_dependent(map::ops::KEYS, set_description::<K>()))
                .and_then(|builder| {
                    builder.register_dependent(map::ops::VALUES, collection_description::<V>())
                }),
        )
    })
}

/// Monitor `target` with the default list description.
#[must_use]
pub fn monitor_list<T: Element>(target: Arc<dyn List<T>>, observer: SharedObserver) -> Arc<dyn List<T>> {
    monitor(target, list_description(), observer).into_shared()
}

/// Monitor `target` with the default set description.
#[must_use]
pub fn monitor_set<T: Element>(target: Arc<dyn Set<T>>, observer: SharedObserver) -> Arc<dyn Set<T>> {
    monitor(target, set_description(), observer).into_shared()
}

/// Monitor `target` with the default map description.
#[must_use]
pub fn monitor_map<K: Element, V: Element>(
    target: Arc<dyn Map<K, V>>,
    observer: SharedObserver,
) -> Arc<dyn Map<K, V>> {
    monitor(target, map_description(), observer).into_shared()
}

/// Monitor `target` with the default collection description.
#[must_use]
pub fn monitor_collection<T: Element>(
    target: Arc<dyn Collection<T>>,
    observer: SharedObserver,
) -> Arc<dyn Collection<T>> {
    monitor(target, collection_description(), observer).into_shared()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use sharewatch_core::{CallObserver, Failure, Invocation, NoopObserver};

    use super::*;
    use crate::cursor::drain;
    use crate::fail_fast::{FailFastList, FailFastMap, FailFastSet};

    #[derive(Default)]
    struct Operations(parking_lot::Mutex<Vec<String>>);

    impl CallObserver for Operations {
        fn before_invoke(&self, invocation: &Invocation<'_>) {
            self.0.lock().push(invocation.operation().to_string());
        }

        fn on_failure(&self, _failure: &Failure<'_>, _invocation: &Invocation<'_>) {}
    }

    impl Operations {
        fn names(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    #[test]
    fn descriptions_are_shared() {
        assert!(Arc::ptr_eq(&list_description::<u16>(), &list_description::<u16>()));
        assert!(Arc::ptr_eq(&map_description::<u16, u8>(), &map_description::<u16, u8>()));
        assert!(Arc::ptr_eq(
            &cursor_description::<u16>(),
            &Description::dependent_for::<dyn Cursor<u16>>(&list_description::<u16>(), &list::ops::ITER)
                .unwrap()
        ));
    }

    #[test]
    fn list_description_layout() {
        let description = list_description::<u32>();
        assert_eq!(description.capability(), "List");
        assert_eq!(description.equality_policy().name(), "list-equality");
        assert_eq!(description.dependent_capability(&list::ops::ITER), Some("Cursor"));
        assert_eq!(description.dependent_capability(&list::ops::CURSOR_FROM), Some("Cursor"));
        assert_eq!(description.dependent_capability(&list::ops::SUB_LIST), Some("List"));
        assert_eq!(description.dependent_capability(&list::ops::GET), None);
        assert_eq!(description.dependent_operations().count(), 3);

        let sub = Description::dependent_for::<dyn List<u32>>(&description, &list::ops::SUB_LIST).unwrap();
        assert!(Arc::ptr_eq(&sub, &description));
    }

    #[test]
    fn map_description_layout() {
        let description = map_description::<String, i64>();
        assert_eq!(description.equality_policy().name(), "map-equality");
        let entries =
            Description::dependent_for::<dyn Set<(String, i64)>>(&description, &map::ops::ENTRIES).unwrap();
        assert_eq!(entries, set_description::<(String, i64)>());
        assert_eq!(entries.equality_policy().name(), "set-equality");
        let values =
            Description::dependent_for::<dyn Collection<i64>>(&description, &map::ops::VALUES).unwrap();
        assert_eq!(values.dependent_capability(&collection::ops::ITER), Some("Cursor"));
        assert!(Description::dependent_for::<dyn Set<i64>>(&description, &map::ops::KEYS).is_none());
    }

    #[test]
    fn descriptions_compare_structurally() {
        let rebuilt = Description::<dyn Set<u8>>::builder()
            .equality(SetEquality)
            .register_dependent(set::ops::ITER, Description::<dyn Cursor<u8>>::plain())
            .unwrap()
            .build();
        assert_eq!(rebuilt, set_description::<u8>());

        let other = Description::<dyn Set<u8>>::builder().equality(SetEquality).build();
        assert_ne!(other, set_description::<u8>());

        let mut keys = HashSet::new();
        keys.insert(set_description::<u8>());
        assert!(keys.contains(&rebuilt));
    }

    #[test]
    fn monitored_list_propagates_to_cursors_and_views() {
        let observer = Arc::new(Operations::default());
        let list = monitor_list(
            Arc::new(FailFastList::from_vec(vec![1, 2, 3, 4])),
            Arc::clone(&observer) as SharedObserver,
        );
        assert!(list.is_monitored());

        let cursor = list.iter();
        assert!(cursor.is_monitored());
        assert_eq!(drain(&*cursor), Ok(vec![1, 2, 3, 4]));

        let view = list.sub_list(1, 3).unwrap();
        assert!(view.is_monitored());
        assert!(view.cursor_from(1).unwrap().is_monitored());
        assert_eq!(view.get(0), Ok(2));

        let names = observer.names();
        assert_eq!(names[0], "List::iter()");
        assert!(names.contains(&"Cursor::next()".to_owned()));
        assert!(names.contains(&"List::sub_list(usize, usize)".to_owned()));
        assert!(names.contains(&"List::get(usize)".to_owned()));
    }

    #[test]
    fn monitored_map_views_are_monitored() {
        let map = monitor_map(
            Arc::new(FailFastMap::from_entries(vec![("a", 1), ("b", 2)])),
            Arc::new(NoopObserver),
        );
        let keys = map.keys();
        assert!(keys.is_monitored());
        assert!(keys.iter().is_monitored());
        assert!(map.entries().is_monitored());
        let values = map.values();
        assert!(values.is_monitored());
        assert_eq!(drain(&*values.iter()), Ok(vec![1, 2]));
    }

    #[test]
    fn monitored_set_equals_its_target() {
        let target: Arc<dyn Set<u8>> = Arc::new(FailFastSet::from_vec(vec![1, 2]));
        let set = monitor_set(Arc::clone(&target), Arc::new(NoopObserver));
        let same: Arc<dyn Set<u8>> = Arc::new(FailFastSet::from_vec(vec![2, 1]));
        assert!(*set == *target);
        assert!(*target == *set);
        assert!(*set == *same);
        assert!(set.iter().is_monitored());
    }

    #[test]
    fn monitored_collection_iterates() {
        let map: Arc<dyn Map<u8, u8>> = Arc::new(FailFastMap::from_entries(vec![(1, 10)]));
        let values = monitor_collection(map.values(), Arc::new(NoopObserver));
        assert!(values.iter().is_monitored());
        assert_eq!(values.to_vec(), vec![10]);
    }
}

//! Container capability surfaces for sharewatch.
//!
//! Each surface ([`Collection`], [`List`], [`Set`], [`Map`], [`Cursor`]) is a
//! trait whose methods all take `&self`, together with its operation
//! constants, its `Capability` declaration and the decorator that lets a
//! `Monitored<dyn Surface>` stand in for any implementation. The
//! [`catalog`] module holds the default descriptions that keep iterators and
//! views of a monitored container monitored as well; [`fail_fast`] holds
//! reference containers that detect structural modification during
//! iteration.

use std::fmt::Debug;

pub mod catalog;
pub mod collection;
pub mod cursor;
pub mod equality;
pub mod error;
pub mod fail_fast;
pub mod list;
pub mod map;
pub mod set;

pub use catalog::{
    collection_description, cursor_description, list_description, map_description,
    monitor_collection, monitor_list, monitor_map, monitor_set, set_description,
};
pub use collection::{Collection, ops as collection_ops};
pub use cursor::{Cursor, Elements, drain, elements, ops as cursor_ops};
pub use equality::{ListEquality, MapEquality, SetEquality};
pub use error::{CollectionError, Result};
pub use fail_fast::{FailFastList, FailFastMap, FailFastSet, MapEntries, MapKeys, MapValues};
pub use list::{List, ops as list_ops};
pub use map::{Map, ops as map_ops};
pub use set::{Set, ops as set_ops};

/// Anything that can be stored in a container surface.
pub trait Element: Clone + Debug + PartialEq + Send + Sync + 'static {}

impl<T: Clone + Debug + PartialEq + Send + Sync + 'static> Element for T {}

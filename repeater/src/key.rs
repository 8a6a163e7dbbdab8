#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
pub(crate) type Map<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type Map<K, V> = BTreeMap<K, V>;

/// Bound for stable item keys used by the unique-id reset pool.
///
/// With `std` this is `Hash + Eq + Clone`; without it keys must be `Ord + Clone`.
#[cfg(feature = "std")]
pub trait UniqueKey: core::hash::Hash + Eq + Clone {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq + Clone> UniqueKey for K {}

#[cfg(not(feature = "std"))]
pub trait UniqueKey: Ord + Clone {}
#[cfg(not(feature = "std"))]
impl<K: Ord + Clone> UniqueKey for K {}

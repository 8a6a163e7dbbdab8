use alloc::sync::Arc;
use alloc::vec::Vec;

/// A structural change in the data source, delivered synchronously to the repeater.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollectionChange {
    Insert {
        index: usize,
        count: usize,
    },
    Remove {
        index: usize,
        count: usize,
    },
    Replace {
        index: usize,
        old_count: usize,
        new_count: usize,
    },
    Reset,
}

impl CollectionChange {
    /// Elements cleared while processing this change bypass the pinned pool.
    pub fn forces_clear(&self) -> bool {
        !matches!(self, Self::Insert { .. })
    }
}

type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// The items shown by a repeater, plus an optional stable key per item.
///
/// A key function turns on stable resets: elements cleared by a reset are parked by key and
/// handed back to the same item afterwards.
pub struct ItemsSourceView<T, K> {
    items: Vec<T>,
    key_fn: Option<KeyFn<T, K>>,
}

impl<T, K> ItemsSourceView<T, K> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            key_fn: None,
        }
    }

    pub fn with_keys(items: Vec<T>, key_fn: impl Fn(&T) -> K + Send + Sync + 'static) -> Self {
        Self {
            items,
            key_fn: Some(Arc::new(key_fn)),
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn has_key_index_mapping(&self) -> bool {
        self.key_fn.is_some()
    }

    pub fn key_from_index(&self, index: usize) -> Option<K> {
        let f = self.key_fn.as_ref()?;
        self.items.get(index).map(|item| f(item))
    }

    pub fn index_from_key(&self, key: &K) -> Option<usize>
    where
        K: PartialEq,
    {
        let f = self.key_fn.as_ref()?;
        self.items.iter().position(|item| f(item) == *key)
    }

    pub(crate) fn insert(&mut self, index: usize, new_items: Vec<T>) -> CollectionChange {
        let count = new_items.len();
        let index = index.min(self.items.len());
        self.items.splice(index..index, new_items);
        CollectionChange::Insert { index, count }
    }

    pub(crate) fn remove(&mut self, index: usize, count: usize) -> CollectionChange {
        let index = index.min(self.items.len());
        let end = index.saturating_add(count).min(self.items.len());
        self.items.drain(index..end);
        CollectionChange::Remove {
            index,
            count: end - index,
        }
    }

    pub(crate) fn replace(&mut self, index: usize, old_count: usize, new_items: Vec<T>) -> CollectionChange {
        let index = index.min(self.items.len());
        let end = index.saturating_add(old_count).min(self.items.len());
        let new_count = new_items.len();
        self.items.splice(index..end, new_items);
        CollectionChange::Replace {
            index,
            old_count: end - index,
            new_count,
        }
    }

    pub(crate) fn reset(&mut self, items: Vec<T>) -> CollectionChange {
        self.items = items;
        CollectionChange::Reset
    }
}

impl<T: core::fmt::Debug, K> core::fmt::Debug for ItemsSourceView<T, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ItemsSourceView")
            .field("items", &self.items)
            .field("has_key_index_mapping", &self.key_fn.is_some())
            .finish()
    }
}

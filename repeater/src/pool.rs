use alloc::vec::Vec;

use crate::ElementId;
use crate::key::{Map, UniqueKey};

/// Elements kept alive outside the realized range because something pinned them.
#[derive(Clone, Debug, Default)]
pub struct PinnedPool {
    elements: Vec<ElementId>,
}

impl PinnedPool {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.elements.contains(&element)
    }

    pub fn as_slice(&self) -> &[ElementId] {
        &self.elements
    }

    pub(crate) fn push(&mut self, element: ElementId) {
        debug_assert!(!self.contains(element), "element pinned twice");
        self.elements.push(element);
    }

    pub(crate) fn remove(&mut self, element: ElementId) -> bool {
        match self.elements.iter().position(|&e| e == element) {
            Some(pos) => {
                self.elements.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Removes and returns the first pooled element matching `f`.
    pub(crate) fn take_first(&mut self, mut f: impl FnMut(ElementId) -> bool) -> Option<ElementId> {
        let pos = self.elements.iter().position(|&e| f(e))?;
        Some(self.elements.remove(pos))
    }
}

/// Elements parked across a stable reset, keyed by the unique id of the item they showed.
#[derive(Clone, Debug)]
pub struct UniqueIdElementPool<K> {
    elements: Map<K, ElementId>,
}

impl<K> Default for UniqueIdElementPool<K> {
    fn default() -> Self {
        Self {
            elements: Map::new(),
        }
    }
}

impl<K: UniqueKey> UniqueIdElementPool<K> {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.elements.contains_key(key)
    }

    /// Parks `element` under `key`, returning any element previously parked under the same key.
    pub(crate) fn add(&mut self, key: K, element: ElementId) -> Option<ElementId> {
        self.elements.insert(key, element)
    }

    pub(crate) fn dequeue_element_by_unique_id(&mut self, key: &K) -> Option<ElementId> {
        self.elements.remove(key)
    }

    pub(crate) fn drain(&mut self) -> Vec<ElementId> {
        let mut out: Vec<ElementId> = self.elements.values().copied().collect();
        self.elements.clear();
        out.sort_unstable();
        out
    }
}

use alloc::sync::Arc;

use crate::ElementId;

/// Fired after an element is realized for a data index. Arguments are `(element, index)`.
pub type ElementPreparedCallback = Arc<dyn Fn(ElementId, usize) + Send + Sync>;

/// Fired right before an element is handed back to the element factory.
pub type ElementClearingCallback = Arc<dyn Fn(ElementId) + Send + Sync>;

/// Fired when a realized element keeps its item but the item moved.
///
/// Arguments are `(element, old_index, new_index)`.
pub type ElementIndexChangedCallback = Arc<dyn Fn(ElementId, usize, usize) + Send + Sync>;

/// Observer hooks for the element lifecycle of an [`crate::ItemsRepeater`].
///
/// Cheap to clone: callbacks are stored in `Arc`s.
#[derive(Clone, Default)]
pub struct RepeaterEvents {
    element_prepared: Option<ElementPreparedCallback>,
    element_clearing: Option<ElementClearingCallback>,
    element_index_changed: Option<ElementIndexChangedCallback>,
}

impl RepeaterEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element_prepared(mut self, f: impl Fn(ElementId, usize) + Send + Sync + 'static) -> Self {
        self.element_prepared = Some(Arc::new(f));
        self
    }

    pub fn with_element_clearing(mut self, f: impl Fn(ElementId) + Send + Sync + 'static) -> Self {
        self.element_clearing = Some(Arc::new(f));
        self
    }

    pub fn with_element_index_changed(
        mut self,
        f: impl Fn(ElementId, usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.element_index_changed = Some(Arc::new(f));
        self
    }

    pub(crate) fn element_prepared(&self, element: ElementId, index: usize) {
        if let Some(f) = &self.element_prepared {
            f(element, index);
        }
    }

    pub(crate) fn element_clearing(&self, element: ElementId) {
        if let Some(f) = &self.element_clearing {
            f(element);
        }
    }

    pub(crate) fn element_index_changed(&self, element: ElementId, old_index: usize, new_index: usize) {
        if let Some(f) = &self.element_index_changed {
            f(element, old_index, new_index);
        }
    }
}

impl core::fmt::Debug for RepeaterEvents {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RepeaterEvents")
            .field("element_prepared", &self.element_prepared.is_some())
            .field("element_clearing", &self.element_clearing.is_some())
            .field("element_index_changed", &self.element_index_changed.is_some())
            .finish()
    }
}

use crate::items::CollectionChange;
use crate::key::UniqueKey;
use crate::stack_layout::{StackLayout, StackLayoutState};
use crate::view_manager::{ViewContext, ViewManager};
use crate::{ElementId, Rect, Result, Size};

/// How a layout wants an element realized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElementRealizationOptions {
    /// Skip the "already held by the layout" lookup.
    pub force_create: bool,
    /// The layout manages the element itself; the repeater must not auto-recycle it.
    pub suppress_auto_recycle: bool,
}

impl ElementRealizationOptions {
    /// What the built-in flow layouts use for every element they own.
    pub const FORCE_CREATE_SUPPRESS_AUTO_RECYCLE: Self = Self {
        force_create: true,
        suppress_auto_recycle: true,
    };
}

/// Capability set of a virtualizing layout.
///
/// Per-repeater data lives in `State`, owned by the repeater and handed back on every call.
pub trait VirtualizingLayout {
    type State;

    /// Creates the per-repeater state, or reuses `state` if one is already there.
    fn initialize_for_context<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut Option<Self::State>,
    );

    fn uninitialize_for_context<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut Self::State,
    );

    fn measure<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut Self::State,
        available: Size,
    ) -> Size;

    fn arrange<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut Self::State,
        final_size: Size,
    ) -> Size;

    fn on_items_changed<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut Self::State,
        change: CollectionChange,
    );
}

/// The layouts a repeater can host, selected by value.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layout {
    Stack(StackLayout),
}

impl From<StackLayout> for Layout {
    fn from(layout: StackLayout) -> Self {
        Self::Stack(layout)
    }
}

#[derive(Debug)]
pub enum LayoutState {
    Stack(StackLayoutState),
}

impl VirtualizingLayout for Layout {
    type State = LayoutState;

    fn initialize_for_context<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut Option<LayoutState>,
    ) {
        match self {
            Self::Stack(layout) => {
                let mut inner = match state.take() {
                    Some(LayoutState::Stack(s)) => Some(s),
                    None => None,
                };
                layout.initialize_for_context(context, &mut inner);
                *state = inner.map(LayoutState::Stack);
            }
        }
    }

    fn uninitialize_for_context<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut LayoutState,
    ) {
        match (self, state) {
            (Self::Stack(layout), LayoutState::Stack(s)) => {
                layout.uninitialize_for_context(context, s)
            }
        }
    }

    fn measure<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut LayoutState,
        available: Size,
    ) -> Size {
        match (self, state) {
            (Self::Stack(layout), LayoutState::Stack(s)) => layout.measure(context, s, available),
        }
    }

    fn arrange<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut LayoutState,
        final_size: Size,
    ) -> Size {
        match (self, state) {
            (Self::Stack(layout), LayoutState::Stack(s)) => layout.arrange(context, s, final_size),
        }
    }

    fn on_items_changed<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut LayoutState,
        change: CollectionChange,
    ) {
        match (self, state) {
            (Self::Stack(layout), LayoutState::Stack(s)) => {
                layout.on_items_changed(context, s, change)
            }
        }
    }
}

/// What a layout sees of its repeater during a pass.
pub struct RepeaterLayoutContext<'a, T, K> {
    pub(crate) view_manager: &'a mut ViewManager<K>,
    pub(crate) view: ViewContext<'a, T, K>,
    pub(crate) visible_rect: Rect,
    pub(crate) realization_rect: Rect,
}

impl<T, K: UniqueKey> RepeaterLayoutContext<'_, T, K> {
    pub fn item_count(&self) -> usize {
        self.view.items.count()
    }

    pub fn get_item_at(&self, index: usize) -> Option<&T> {
        self.view.items.get_at(index)
    }

    /// Window the layout must cover with realized elements. Infinite means "realize everything".
    pub fn realization_rect(&self) -> Rect {
        self.realization_rect
    }

    pub fn visible_rect(&self) -> Rect {
        self.visible_rect
    }

    /// Index of the element made by `get_or_create_element`, if the layout should start there.
    pub fn recommended_anchor_index(&self) -> Option<usize> {
        let anchor = (*self.view.made_anchor)?;
        self.view_manager.info(anchor).and_then(|info| info.index())
    }

    pub fn made_anchor(&self) -> Option<ElementId> {
        *self.view.made_anchor
    }

    pub fn get_or_create_element_at(
        &mut self,
        index: usize,
        options: ElementRealizationOptions,
    ) -> Result<ElementId> {
        self.view_manager.get_element(
            index,
            options.force_create,
            options.suppress_auto_recycle,
            &mut self.view,
        )
    }

    /// Hands an element back. Elements the layout no longer holds are ignored.
    pub fn recycle_element(&mut self, element: ElementId) -> Result<()> {
        let held = self
            .view_manager
            .info(element)
            .is_some_and(|info| info.is_held_by_layout());
        if !held {
            vtrace!(element = element.0, "recycle skipped; element not held by layout");
            return Ok(());
        }
        self.view_manager.clear_element_impl(element, &mut self.view)
    }

    pub fn element_index(&self, element: ElementId) -> Option<usize> {
        self.view_manager.info(element).and_then(|info| info.index())
    }

    pub fn measure_element(&mut self, element: ElementId, available: Size) -> Size {
        self.view.host.measure(element, available)
    }

    pub fn arrange_element(&mut self, element: ElementId, bounds: Rect) {
        self.view.host.arrange(element, bounds);
        self.view_manager.set_arrange_bounds(element, bounds);
    }

    pub fn invalidate_measure(&mut self) {
        *self.view.measure_invalidated = true;
    }
}

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::host::{ElementAnimator, ElementFactory, VisualHost};
use crate::items::{CollectionChange, ItemsSourceView};
use crate::key::UniqueKey;
use crate::layout::{Layout, LayoutState, RepeaterLayoutContext, VirtualizingLayout};
use crate::options::RepeaterEvents;
use crate::view_manager::{ViewContext, ViewManager};
use crate::{ElementId, ItemKey, Rect, RepeaterError, Result, Size};

/// Where pinned-pool elements are parked during arrange.
const PINNED_ELEMENT_BOUNDS: Rect = Rect {
    x: -10000.0,
    y: -10000.0,
    width: 0.0,
    height: 0.0,
};

/// Disjoint borrows of a repeater, split so the view manager and the layout can run side by side.
struct Parts<'a, T, K> {
    view_manager: &'a mut ViewManager<K>,
    view: ViewContext<'a, T, K>,
    layout: Option<&'a Layout>,
    layout_state: &'a mut Option<LayoutState>,
    visible_window: Rect,
    realization_window: Rect,
}

/// Displays a collection through a small, recycled set of elements.
///
/// The repeater owns the realized children, drives measure and arrange through its layout, and
/// forwards collection changes to the [`ViewManager`] first and the layout second.
///
/// Everything runs on the caller's thread. There are no locks; a pass never re-enters another.
pub struct ItemsRepeater<T, K = ItemKey> {
    id: ElementId,
    items: ItemsSourceView<T, K>,
    factory: Box<dyn ElementFactory<T>>,
    host: Box<dyn VisualHost>,
    animator: Option<Box<dyn ElementAnimator>>,
    view_manager: ViewManager<K>,
    visible_window: Rect,
    realization_window: Rect,
    made_anchor: Option<ElementId>,
    layout: Option<Layout>,
    layout_state: Option<LayoutState>,
    children: Vec<ElementId>,
    pub(crate) is_layout_in_progress: bool,
    processing_change: Option<CollectionChange>,
    measure_invalidated: bool,
    arrange_invalidated: bool,
    desired_size: Size,
    events: RepeaterEvents,
}

impl<T, K: UniqueKey> ItemsRepeater<T, K> {
    /// Creates a repeater with no layout. `id` is the repeater's own element in the visual tree.
    pub fn new(
        id: ElementId,
        items: ItemsSourceView<T, K>,
        factory: impl ElementFactory<T> + 'static,
        host: impl VisualHost + 'static,
    ) -> Self {
        Self {
            id,
            items,
            factory: Box::new(factory),
            host: Box::new(host),
            animator: None,
            view_manager: ViewManager::default(),
            visible_window: Rect::INFINITE,
            realization_window: Rect::INFINITE,
            made_anchor: None,
            layout: None,
            layout_state: None,
            children: Vec::new(),
            is_layout_in_progress: false,
            processing_change: None,
            measure_invalidated: true,
            arrange_invalidated: true,
            desired_size: Size::ZERO,
            events: RepeaterEvents::default(),
        }
    }

    pub fn with_events(mut self, events: RepeaterEvents) -> Self {
        self.events = events;
        self
    }

    pub fn with_animator(mut self, animator: impl ElementAnimator + 'static) -> Self {
        self.animator = Some(Box::new(animator));
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn items(&self) -> &ItemsSourceView<T, K> {
        &self.items
    }

    /// Elements currently attached to the repeater, in attach order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn view_manager(&self) -> &ViewManager<K> {
        &self.view_manager
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn layout_state(&self) -> Option<&LayoutState> {
        self.layout_state.as_ref()
    }

    pub fn made_anchor(&self) -> Option<ElementId> {
        self.made_anchor
    }

    pub fn desired_size(&self) -> Size {
        self.desired_size
    }

    pub fn visible_window(&self) -> Rect {
        self.visible_window
    }

    pub fn realization_window(&self) -> Rect {
        self.realization_window
    }

    pub fn needs_measure(&self) -> bool {
        self.measure_invalidated
    }

    pub fn needs_arrange(&self) -> bool {
        self.arrange_invalidated
    }

    pub fn invalidate_measure(&mut self) {
        self.measure_invalidated = true;
        self.arrange_invalidated = true;
    }

    /// Sets the windows the next pass lays out against. An infinite realization window turns
    /// virtualization off.
    pub fn set_viewport(&mut self, visible: Rect, realization: Rect) {
        if self.visible_window != visible || self.realization_window != realization {
            self.visible_window = visible;
            self.realization_window = realization;
            self.invalidate_measure();
        }
    }

    /// Swaps the layout. Every realized element of the old layout is cleared first.
    pub fn set_layout(&mut self, layout: Option<Layout>) -> Result<()> {
        if self.is_layout_in_progress {
            return Err(RepeaterError::LayoutChangeDuringLayout);
        }

        {
            let Parts {
                view_manager, view, ..
            } = self.parts();
            view_manager.on_layout_changing(&view);
        }

        if let Some(old) = self.layout.take() {
            vdebug!("detaching layout");
            let parts = self.parts();
            let mut cx = RepeaterLayoutContext {
                view_manager: parts.view_manager,
                view: parts.view,
                visible_rect: parts.visible_window,
                realization_rect: parts.realization_window,
            };
            if let Some(state) = parts.layout_state.as_mut() {
                old.uninitialize_for_context(&mut cx, state);
            }
            let children = cx.view.children.clone();
            for element in children {
                let realized = cx
                    .view_manager
                    .info(element)
                    .is_some_and(|info| info.is_realized());
                if realized {
                    cx.view_manager.clear_element_impl(element, &mut cx.view)?;
                }
            }
            *parts.layout_state = None;
        }

        if let Some(new) = layout.as_ref() {
            vdebug!("attaching layout");
            let parts = self.parts();
            let mut cx = RepeaterLayoutContext {
                view_manager: parts.view_manager,
                view: parts.view,
                visible_rect: parts.visible_window,
                realization_rect: parts.realization_window,
            };
            new.initialize_for_context(&mut cx, parts.layout_state);
        }

        self.layout = layout;
        self.invalidate_measure();
        Ok(())
    }

    /// Runs the layout's measure, then recycles auto-recycle candidates it did not ask for.
    pub fn measure(&mut self, available: Size) -> Result<Size> {
        if self.is_layout_in_progress {
            return Err(RepeaterError::LayoutReentrancy);
        }
        self.is_layout_in_progress = true;
        self.measure_invalidated = false;
        let result = self.measure_core(available);
        self.is_layout_in_progress = false;
        result
    }

    fn measure_core(&mut self, available: Size) -> Result<Size> {
        let parts = self.parts();
        let mut cx = RepeaterLayoutContext {
            view_manager: parts.view_manager,
            view: parts.view,
            visible_rect: parts.visible_window,
            realization_rect: parts.realization_window,
        };
        let desired = match (parts.layout, parts.layout_state.as_mut()) {
            (Some(layout), Some(state)) => layout.measure(&mut cx, state, available),
            _ => Size::ZERO,
        };
        cx.view_manager.clear_auto_recycle_candidates(&mut cx.view)?;

        vtrace!(width = desired.width, height = desired.height, "repeater measured");
        self.desired_size = desired;
        self.arrange_invalidated = true;
        Ok(desired)
    }

    /// Arranges realized elements, finishes any stable reset and prunes unpinned elements.
    pub fn arrange(&mut self, final_size: Size) -> Result<Size> {
        if self.is_layout_in_progress {
            return Err(RepeaterError::LayoutReentrancy);
        }
        self.is_layout_in_progress = true;
        let result = self.arrange_core(final_size);
        self.is_layout_in_progress = false;
        self.arrange_invalidated = false;
        result
    }

    fn arrange_core(&mut self, final_size: Size) -> Result<Size> {
        let parts = self.parts();
        let mut cx = RepeaterLayoutContext {
            view_manager: parts.view_manager,
            view: parts.view,
            visible_rect: parts.visible_window,
            realization_rect: parts.realization_window,
        };
        let arranged = match (parts.layout, parts.layout_state.as_mut()) {
            (Some(layout), Some(state)) => layout.arrange(&mut cx, state, final_size),
            _ => final_size,
        };

        cx.view_manager.on_owner_arranged(&mut cx.view)?;
        cx.view_manager.reset_keep_alive();
        for &element in cx.view_manager.pinned_elements() {
            cx.view.host.arrange(element, PINNED_ELEMENT_BOUNDS);
        }
        cx.view_manager.prune_pinned_elements(&mut cx.view)?;
        *cx.view.made_anchor = None;
        Ok(arranged)
    }

    pub fn insert_items(&mut self, index: usize, items: Vec<T>) -> Result<()> {
        self.ensure_items_mutable()?;
        let change = self.items.insert(index, items);
        self.on_items_source_changed(change)
    }

    pub fn remove_items(&mut self, index: usize, count: usize) -> Result<()> {
        self.ensure_items_mutable()?;
        let change = self.items.remove(index, count);
        self.on_items_source_changed(change)
    }

    pub fn replace_items(&mut self, index: usize, old_count: usize, items: Vec<T>) -> Result<()> {
        self.ensure_items_mutable()?;
        let change = self.items.replace(index, old_count, items);
        self.on_items_source_changed(change)
    }

    pub fn reset_items(&mut self, items: Vec<T>) -> Result<()> {
        self.ensure_items_mutable()?;
        let change = self.items.reset(items);
        self.on_items_source_changed(change)
    }

    /// Realizes `index` outside of a layout pass and makes it the anchor of the next measure.
    pub fn get_or_create_element(&mut self, index: usize) -> Result<ElementId> {
        let count = self.items.count();
        if index >= count {
            return Err(RepeaterError::IndexOutOfRange { index, count });
        }
        if self.is_layout_in_progress {
            return Err(RepeaterError::GetOrCreateDuringLayout);
        }

        if let Some(element) = self.try_get_element(index) {
            self.made_anchor = Some(element);
            self.invalidate_measure();
            return Ok(element);
        }
        if self.layout.is_none() {
            return Err(RepeaterError::NoLayout);
        }

        let element = {
            let Parts {
                view_manager,
                mut view,
                ..
            } = self.parts();
            view_manager.get_element(index, false, false, &mut view)?
        };
        self.host.measure(element, Size::INFINITE);
        vdebug!(index, element = element.0, "anchor made");
        self.made_anchor = Some(element);
        self.invalidate_measure();
        Ok(element)
    }

    /// The element the layout holds for `index`, if any.
    pub fn try_get_element(&self, index: usize) -> Option<ElementId> {
        self.children.iter().copied().find(|&element| {
            self.view_manager
                .info(element)
                .is_some_and(|info| info.is_held_by_layout() && info.index() == Some(index))
        })
    }

    /// Data index of a realized element. `Ok(None)` for elements that are not realized.
    pub fn get_element_index(&self, element: ElementId) -> Result<Option<usize>> {
        let info = self
            .view_manager
            .info(element)
            .ok_or(RepeaterError::UnknownElement(element))?;
        Ok(if info.is_realized() { info.index() } else { None })
    }

    /// Pins (or unpins) the realized child containing `element`.
    pub fn update_pin(&mut self, element: ElementId, add_pin: bool) -> Result<()> {
        let Parts {
            view_manager,
            mut view,
            ..
        } = self.parts();
        view_manager.update_pin(element, add_pin, &mut view)
    }

    /// Reports the element that now has focus, or `None` when focus left the repeater.
    pub fn on_focus_changed(&mut self, focused: Option<ElementId>) -> Result<()> {
        let Parts {
            view_manager,
            mut view,
            ..
        } = self.parts();
        view_manager.on_focus_changed(focused, &mut view)
    }

    pub fn on_hide_animation_complete(&mut self, element: ElementId) -> Result<()> {
        let Parts {
            view_manager,
            mut view,
            ..
        } = self.parts();
        view_manager.on_hide_animation_complete(element, &mut view)
    }

    fn ensure_items_mutable(&self) -> Result<()> {
        if self.is_layout_in_progress {
            return Err(RepeaterError::ItemsChangedDuringLayout);
        }
        Ok(())
    }

    fn on_items_source_changed(&mut self, change: CollectionChange) -> Result<()> {
        self.processing_change = Some(change);
        let result = self.dispatch_items_change(change);
        self.processing_change = None;
        self.invalidate_measure();
        result
    }

    fn dispatch_items_change(&mut self, change: CollectionChange) -> Result<()> {
        let parts = self.parts();
        let mut view = parts.view;
        parts.view_manager.on_items_source_changed(change, &mut view)?;

        if let (Some(layout), Some(state)) = (parts.layout, parts.layout_state.as_mut()) {
            let mut cx = RepeaterLayoutContext {
                view_manager: parts.view_manager,
                view,
                visible_rect: parts.visible_window,
                realization_rect: parts.realization_window,
            };
            layout.on_items_changed(&mut cx, state, change);
        }
        Ok(())
    }

    fn parts(&mut self) -> Parts<'_, T, K> {
        let Self {
            id,
            items,
            factory,
            host,
            animator,
            view_manager,
            visible_window,
            realization_window,
            made_anchor,
            layout,
            layout_state,
            children,
            processing_change,
            measure_invalidated,
            events,
            ..
        } = self;
        Parts {
            view_manager,
            view: ViewContext {
                owner: *id,
                items,
                factory: &mut **factory,
                host: &mut **host,
                animator,
                children,
                events,
                made_anchor,
                processing_change: *processing_change,
                measure_invalidated,
            },
            layout: layout.as_ref(),
            layout_state,
            visible_window: *visible_window,
            realization_window: *realization_window,
        }
    }
}

impl<T: core::fmt::Debug, K: core::fmt::Debug> core::fmt::Debug for ItemsRepeater<T, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ItemsRepeater")
            .field("id", &self.id)
            .field("items", &self.items)
            .field("layout", &self.layout)
            .field("children", &self.children)
            .field("view_manager", &self.view_manager)
            .field("visible_window", &self.visible_window)
            .field("realization_window", &self.realization_window)
            .field("made_anchor", &self.made_anchor)
            .field("desired_size", &self.desired_size)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

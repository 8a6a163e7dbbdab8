use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::host::{
    ElementAnimator, ElementFactory, ElementFactoryGetArgs, ElementFactoryRecycleArgs, VisualHost,
};
use crate::info::{ElementOwner, VirtualizationInfo};
use crate::items::{CollectionChange, ItemsSourceView};
use crate::key::{Map, UniqueKey};
use crate::options::RepeaterEvents;
use crate::pool::{PinnedPool, UniqueIdElementPool};
use crate::{ElementId, RepeaterError, Result};

/// Borrowed view of everything the view manager touches outside its own bookkeeping.
///
/// Built fresh by the repeater for every call so the view manager never stores references into
/// its owner.
pub(crate) struct ViewContext<'a, T, K> {
    pub(crate) owner: ElementId,
    pub(crate) items: &'a ItemsSourceView<T, K>,
    pub(crate) factory: &'a mut dyn ElementFactory<T>,
    pub(crate) host: &'a mut dyn VisualHost,
    pub(crate) animator: &'a mut Option<Box<dyn ElementAnimator>>,
    pub(crate) children: &'a mut Vec<ElementId>,
    pub(crate) events: &'a RepeaterEvents,
    pub(crate) made_anchor: &'a mut Option<ElementId>,
    pub(crate) processing_change: Option<CollectionChange>,
    pub(crate) measure_invalidated: &'a mut bool,
}

impl<T, K> ViewContext<'_, T, K> {
    /// Clears caused by remove, replace or reset bypass the pinned pool.
    pub(crate) fn is_cleared_due_to_collection_change(&self) -> bool {
        self.processing_change
            .is_some_and(|change| change.forces_clear())
    }
}

/// Owns the virtualization records and decides where every element lives.
///
/// Elements move between the element factory, the layout, the pinned pool, the unique-id reset
/// pool and the animator. Every element with a record has exactly one of those owners.
#[derive(Debug)]
pub struct ViewManager<K> {
    records: Map<ElementId, VirtualizationInfo<K>>,
    pinned_pool: PinnedPool,
    reset_pool: UniqueIdElementPool<K>,
    is_data_source_stable_reset_pending: bool,
    first_realized_index: Option<usize>,
    last_realized_index: Option<usize>,
    last_focused_element: Option<ElementId>,
}

impl<K> Default for ViewManager<K> {
    fn default() -> Self {
        Self {
            records: Map::new(),
            pinned_pool: PinnedPool::default(),
            reset_pool: UniqueIdElementPool::default(),
            is_data_source_stable_reset_pending: false,
            first_realized_index: None,
            last_realized_index: None,
            last_focused_element: None,
        }
    }
}

impl<K: UniqueKey> ViewManager<K> {
    pub fn info(&self, element: ElementId) -> Option<&VirtualizationInfo<K>> {
        self.records.get(&element)
    }

    /// Every element the repeater has ever seen, with its record.
    pub fn records(&self) -> impl Iterator<Item = (ElementId, &VirtualizationInfo<K>)> + '_ {
        self.records.iter().map(|(&element, info)| (element, info))
    }

    /// Data index of `element`; fails for elements that never came from this repeater.
    pub fn element_index(&self, element: ElementId) -> Result<Option<usize>> {
        self.records
            .get(&element)
            .map(|info| info.index())
            .ok_or(RepeaterError::UnknownElement(element))
    }

    pub fn first_realized_index(&self) -> Option<usize> {
        self.first_realized_index
    }

    pub fn last_realized_index(&self) -> Option<usize> {
        self.last_realized_index
    }

    /// Inclusive index span currently held by the layout, if known.
    pub fn realized_range(&self) -> Option<(usize, usize)> {
        match (self.first_realized_index, self.last_realized_index) {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        }
    }

    pub fn pinned_elements(&self) -> &[ElementId] {
        self.pinned_pool.as_slice()
    }

    pub fn reset_pool_len(&self) -> usize {
        self.reset_pool.len()
    }

    pub fn is_stable_reset_pending(&self) -> bool {
        self.is_data_source_stable_reset_pending
    }

    pub fn last_focused_element(&self) -> Option<ElementId> {
        self.last_focused_element
    }

    pub(crate) fn get_element<T>(
        &mut self,
        index: usize,
        force_create: bool,
        suppress_auto_recycle: bool,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<ElementId> {
        let mut element = if force_create {
            None
        } else {
            self.get_element_if_already_held_by_layout(index, cx)
        };
        if element.is_none() {
            element = self.get_element_from_made_anchor(index, cx);
        }
        if element.is_none() {
            element = self.get_element_from_unique_id_reset_pool(index, cx);
        }
        if element.is_none() {
            element = self.get_element_from_pinned_elements(index);
        }
        let element = match element {
            Some(element) => element,
            None => self.get_element_from_element_factory(index, cx)?,
        };

        let info = self
            .records
            .get_mut(&element)
            .ok_or(RepeaterError::UnknownElement(element))?;
        if suppress_auto_recycle {
            info.set_auto_recycle_candidate(false);
        } else {
            info.set_auto_recycle_candidate(true);
            info.set_keep_alive(true);
        }

        self.first_realized_index = Some(self.first_realized_index.map_or(index, |f| f.min(index)));
        self.last_realized_index = Some(self.last_realized_index.map_or(index, |l| l.max(index)));
        vtrace!(index, element = element.0, "element realized");
        Ok(element)
    }

    /// Clears an element the way the current change requires.
    pub(crate) fn clear_element_impl<T>(
        &mut self,
        element: ElementId,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        let due = cx.is_cleared_due_to_collection_change();
        self.clear_element(element, due, cx)
    }

    pub(crate) fn clear_element<T>(
        &mut self,
        element: ElementId,
        is_cleared_due_to_collection_change: bool,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        let index = self
            .records
            .get(&element)
            .ok_or(RepeaterError::UnknownElement(element))?
            .index();
        if *cx.made_anchor == Some(element) {
            *cx.made_anchor = None;
        }

        // A pin outlives a pending reset unless the item itself changed structurally.
        let pinned_first = !is_cleared_due_to_collection_change
            && self.records.get(&element).is_some_and(|info| info.is_pinned());
        let cleared = (pinned_first && self.clear_element_to_pinned_pool(element, false))
            || self.clear_element_to_unique_id_reset_pool(element, cx)?
            || self.clear_element_to_animator(element, is_cleared_due_to_collection_change, cx)
            || self.clear_element_to_pinned_pool(element, is_cleared_due_to_collection_change);
        if !cleared {
            self.clear_element_to_element_factory(element, cx)?;
        }

        self.check_realized_range();
        if let Some(index) = index {
            match (self.first_realized_index, self.last_realized_index) {
                (Some(first), Some(last)) if first == index && last == index => {
                    self.invalidate_realized_indices();
                }
                (Some(first), Some(_)) if first == index => {
                    self.first_realized_index = Some(index + 1);
                    self.repair_realized_range(cx);
                }
                (Some(_), Some(last)) if last == index => match index.checked_sub(1) {
                    Some(last) => {
                        self.last_realized_index = Some(last);
                        self.repair_realized_range(cx);
                    }
                    None => self.invalidate_realized_indices(),
                },
                // Outside or strictly inside the range. A structural change invalidates it later.
                _ => {}
            }
        }
        Ok(())
    }

    /// A far anchor can leave a gap in the run, so a shrunk bound may land on an index nobody
    /// holds. Recompute the markers from the held elements in that case.
    fn repair_realized_range<T>(&mut self, cx: &ViewContext<'_, T, K>) {
        let Some((first, last)) = self.realized_range() else {
            return;
        };
        if self.is_held_by_layout_at(first, cx) && self.is_held_by_layout_at(last, cx) {
            return;
        }
        vtrace!(first, last, "realized range has a gap; recomputing");
        self.invalidate_realized_indices();
        self.ensure_first_last_realized_indices(cx);
    }

    fn is_held_by_layout_at<T>(&self, index: usize, cx: &ViewContext<'_, T, K>) -> bool {
        cx.children.iter().any(|child| {
            self.records
                .get(child)
                .is_some_and(|info| info.is_held_by_layout() && info.index() == Some(index))
        })
    }

    /// Terminal recycle path: the element goes back to the factory and is detached.
    pub(crate) fn clear_element_to_element_factory<T>(
        &mut self,
        element: ElementId,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        let cleared_index = self
            .records
            .get(&element)
            .ok_or(RepeaterError::UnknownElement(element))?
            .index();

        cx.events.element_clearing(element);
        cx.factory.recycle_element(ElementFactoryRecycleArgs {
            element,
            parent: cx.owner,
        });
        self.pinned_pool.remove(element);
        if let Some(info) = self.records.get_mut(&element) {
            info.move_ownership_to_element_factory();
        }
        if *cx.made_anchor == Some(element) {
            *cx.made_anchor = None;
        }

        if self.last_focused_element == Some(element) {
            self.move_focus_from_cleared_index(cleared_index, cx);
        }

        cx.host.detach_child(cx.owner, element);
        cx.children.retain(|&child| child != element);
        vtrace!(element = element.0, index = ?cleared_index, "element recycled to factory");
        Ok(())
    }

    /// Recycles every pinned-pool element whose last pin was released.
    pub(crate) fn prune_pinned_elements<T>(&mut self, cx: &mut ViewContext<'_, T, K>) -> Result<()> {
        let unpinned: Vec<ElementId> = self
            .pinned_pool
            .as_slice()
            .iter()
            .copied()
            .filter(|e| self.records.get(e).is_none_or(|info| !info.is_pinned()))
            .collect();

        for element in unpinned {
            vtrace!(element = element.0, "pruning unpinned element");
            self.pinned_pool.remove(element);
            self.clear_element_to_element_factory(element, cx)?;
        }
        Ok(())
    }

    /// Adds or removes a pin on the realized child that contains `element`.
    ///
    /// Releasing the last pin never recycles here; it schedules a measure so the next pass does.
    pub(crate) fn update_pin<T>(
        &mut self,
        element: ElementId,
        add_pin: bool,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        let Some(child) = Self::child_of_owner(element, cx) else {
            return Ok(());
        };
        let info = self
            .records
            .get_mut(&child)
            .ok_or(RepeaterError::UnknownElement(child))?;

        if add_pin {
            if info.is_realized() {
                info.add_pin();
                vtrace!(element = child.0, count = info.pin_count(), "pin added");
            }
        } else if info.is_pinned() {
            let count = info.remove_pin();
            vtrace!(element = child.0, count, "pin removed");
            if count == 0 {
                *cx.measure_invalidated = true;
            }
        }
        Ok(())
    }

    /// Tracks the focused child. The new one is pinned, the previous one released.
    pub(crate) fn on_focus_changed<T>(
        &mut self,
        focused: Option<ElementId>,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        let child = focused.and_then(|element| Self::child_of_owner(element, cx));
        if child == self.last_focused_element {
            return Ok(());
        }
        if let Some(previous) = self.last_focused_element.take() {
            self.update_pin(previous, false, cx)?;
        }
        if let Some(child) = child {
            self.update_pin(child, true, cx)?;
        }
        self.last_focused_element = child;
        Ok(())
    }

    pub(crate) fn on_layout_changing<T>(&mut self, cx: &ViewContext<'_, T, K>) {
        if cx.items.has_key_index_mapping() {
            vdebug!("stable reset pending (layout changing)");
            self.is_data_source_stable_reset_pending = true;
        }
    }

    /// Structural pass over the realized elements. Runs before the layout sees the change.
    pub(crate) fn on_items_source_changed<T>(
        &mut self,
        change: CollectionChange,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        vdebug!(?change, "items source changed");
        match change {
            CollectionChange::Insert { index, count } => {
                self.ensure_first_last_realized_indices(cx);
                if let Some((first, last)) = self.realized_range() {
                    if index <= last {
                        self.last_realized_index = Some(last + count);
                        if index <= first {
                            self.first_realized_index = Some(first + count);
                        }
                    }
                }
                self.shift_indices(index, count as isize, cx);
            }
            CollectionChange::Remove { index, count } => {
                self.clear_realized_in(index, index + count, cx)?;
                self.shift_indices(index + count, -(count as isize), cx);
                self.invalidate_realized_indices();
            }
            CollectionChange::Replace {
                index,
                old_count,
                new_count,
            } => {
                self.clear_realized_in(index, index + old_count, cx)?;
                if old_count != new_count {
                    self.shift_indices(index + old_count, new_count as isize - old_count as isize, cx);
                }
                self.invalidate_realized_indices();
            }
            CollectionChange::Reset => {
                // Back to back resets before a layout pass share one pending reset.
                if !self.is_data_source_stable_reset_pending {
                    debug_assert!(self.reset_pool.is_empty());
                    if cx.items.has_key_index_mapping() {
                        vdebug!("stable reset pending");
                        self.is_data_source_stable_reset_pending = true;
                    }
                }
                let children = cx.children.clone();
                for element in children {
                    // Layout-managed elements are cleared by the layout itself.
                    let stale = self.records.get(&element).is_some_and(|info| {
                        info.owner() == ElementOwner::PinnedPool
                            || (info.is_held_by_layout() && info.auto_recycle_candidate())
                    });
                    if stale {
                        self.clear_element(element, true, cx)?;
                    }
                }
                self.invalidate_realized_indices();
            }
        }
        Ok(())
    }

    /// End of a layout pass: anything left in the reset pool had no matching item.
    pub(crate) fn on_owner_arranged<T>(&mut self, cx: &mut ViewContext<'_, T, K>) -> Result<()> {
        if self.is_data_source_stable_reset_pending {
            self.is_data_source_stable_reset_pending = false;
            let leftovers = self.reset_pool.drain();
            vdebug!(count = leftovers.len(), "stable reset complete");
            for element in leftovers {
                self.clear_element_to_element_factory(element, cx)?;
            }
            self.invalidate_realized_indices();
        }
        Ok(())
    }

    /// Auto-recycle candidates the layout did not ask for during this measure.
    pub(crate) fn clear_auto_recycle_candidates<T>(
        &mut self,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        let children = cx.children.clone();
        for element in children {
            let stale = self.records.get(&element).is_some_and(|info| {
                info.is_held_by_layout() && info.auto_recycle_candidate() && !info.keep_alive()
            });
            if stale {
                vtrace!(element = element.0, "auto-recycling element");
                self.clear_element_impl(element, cx)?;
            }
        }
        Ok(())
    }

    /// Drops the one-pass keep-alive on every element.
    pub(crate) fn reset_keep_alive(&mut self) {
        for info in self.records.values_mut() {
            info.set_keep_alive(false);
        }
    }

    pub(crate) fn on_hide_animation_complete<T>(
        &mut self,
        element: ElementId,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        let owner = self
            .records
            .get(&element)
            .ok_or(RepeaterError::UnknownElement(element))?
            .owner();
        if owner == ElementOwner::Animator {
            self.clear_element_to_element_factory(element, cx)?;
        } else {
            vwarn!(element = element.0, ?owner, "hide animation completed for element not owned by the animator");
        }
        Ok(())
    }

    pub(crate) fn set_arrange_bounds(&mut self, element: ElementId, bounds: crate::Rect) {
        if let Some(info) = self.records.get_mut(&element) {
            info.set_arrange_bounds(bounds);
        }
    }

    fn get_element_if_already_held_by_layout<T>(
        &mut self,
        index: usize,
        cx: &ViewContext<'_, T, K>,
    ) -> Option<ElementId> {
        let invalid = self.realized_range().is_none();
        let in_range = self
            .realized_range()
            .is_some_and(|(first, last)| first <= index && index <= last);
        if !invalid && !in_range {
            return None;
        }

        let mut found = None;
        let mut first: Option<usize> = None;
        let mut last: Option<usize> = None;
        for &child in cx.children.iter() {
            let Some(info) = self.records.get(&child) else {
                continue;
            };
            if !info.is_held_by_layout() {
                continue;
            }
            let Some(child_index) = info.index() else {
                continue;
            };
            if invalid {
                first = Some(first.map_or(child_index, |f| f.min(child_index)));
                last = Some(last.map_or(child_index, |l| l.max(child_index)));
            }
            if child_index == index {
                found = Some(child);
                if !invalid {
                    break;
                }
            }
        }
        if invalid {
            self.first_realized_index = first;
            self.last_realized_index = last;
        }
        found
    }

    fn get_element_from_made_anchor<T>(
        &self,
        index: usize,
        cx: &ViewContext<'_, T, K>,
    ) -> Option<ElementId> {
        let anchor = (*cx.made_anchor)?;
        let info = self.records.get(&anchor)?;
        (info.is_held_by_layout() && info.index() == Some(index)).then_some(anchor)
    }

    fn get_element_from_unique_id_reset_pool<T>(
        &mut self,
        index: usize,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Option<ElementId> {
        if !self.is_data_source_stable_reset_pending {
            return None;
        }
        let key = cx.items.key_from_index(index)?;
        let element = self.reset_pool.dequeue_element_by_unique_id(&key)?;
        let Some(info) = self.records.get_mut(&element) else {
            vwarn!(element = element.0, "reset pool held an element without a record");
            return None;
        };
        info.move_ownership_to_layout_from_unique_id_reset_pool();
        vtrace!(index, element = element.0, "element recovered from reset pool");
        self.update_element_index(element, index, cx);
        Some(element)
    }

    fn get_element_from_pinned_elements(&mut self, index: usize) -> Option<ElementId> {
        let records = &self.records;
        let element = self
            .pinned_pool
            .take_first(|e| records.get(&e).is_some_and(|info| info.index() == Some(index)))?;
        if let Some(info) = self.records.get_mut(&element) {
            info.move_ownership_to_layout_from_pinned_pool();
        }
        vtrace!(index, element = element.0, "element recovered from pinned pool");
        Some(element)
    }

    fn get_element_from_element_factory<T>(
        &mut self,
        index: usize,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<ElementId> {
        let count = cx.items.count();
        let data = cx
            .items
            .get_at(index)
            .ok_or(RepeaterError::IndexOutOfRange { index, count })?;
        let Some(element) = cx.factory.get_element(ElementFactoryGetArgs {
            index,
            data,
            parent: cx.owner,
        }) else {
            vwarn!(index, "element factory produced no element");
            return Err(RepeaterError::ElementFactoryFailed { index });
        };

        let info = self
            .records
            .entry(element)
            .or_insert_with(VirtualizationInfo::new);
        if info.owner() != ElementOwner::ElementFactory {
            vwarn!(element = element.0, owner = ?info.owner(), "element factory returned an element it does not own");
            return Err(RepeaterError::ElementFactoryFailed { index });
        }
        info.move_ownership_to_layout_from_element_factory(index, cx.items.key_from_index(index));

        if !cx.children.contains(&element) {
            cx.host.attach_child(cx.owner, element);
            cx.children.push(element);
        }
        cx.events.element_prepared(element, index);
        Ok(element)
    }

    fn clear_element_to_unique_id_reset_pool<T>(
        &mut self,
        element: ElementId,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<bool> {
        if !self.is_data_source_stable_reset_pending {
            return Ok(false);
        }
        let Some(info) = self.records.get_mut(&element) else {
            return Ok(false);
        };
        let Some(key) = info.unique_id().cloned() else {
            return Ok(false);
        };
        info.move_ownership_to_unique_id_reset_pool();
        self.pinned_pool.remove(element);
        vtrace!(element = element.0, "element parked in reset pool");

        if let Some(displaced) = self.reset_pool.add(key, element) {
            vwarn!(element = displaced.0, "duplicate unique id in reset pool");
            self.clear_element_to_element_factory(displaced, cx)?;
        }
        Ok(true)
    }

    fn clear_element_to_animator<T>(
        &mut self,
        element: ElementId,
        is_cleared_due_to_collection_change: bool,
        cx: &mut ViewContext<'_, T, K>,
    ) -> bool {
        if !is_cleared_due_to_collection_change {
            return false;
        }
        let Some(animator) = cx.animator.as_mut() else {
            return false;
        };
        let Some(info) = self.records.get_mut(&element) else {
            return false;
        };
        if !info.is_realized() || !animator.start_hide_animation(element) {
            return false;
        }

        let cleared_index = info.index();
        info.move_ownership_to_animator();
        self.pinned_pool.remove(element);
        vtrace!(element = element.0, "element handed to animator");
        if self.last_focused_element == Some(element) {
            self.move_focus_from_cleared_index(cleared_index, cx);
        }
        true
    }

    fn clear_element_to_pinned_pool(
        &mut self,
        element: ElementId,
        is_cleared_due_to_collection_change: bool,
    ) -> bool {
        let Some(info) = self.records.get_mut(&element) else {
            return false;
        };
        if !info.is_pinned() || is_cleared_due_to_collection_change {
            return false;
        }
        if info.owner() == ElementOwner::PinnedPool {
            return true;
        }
        info.move_ownership_to_pinned_pool();
        self.pinned_pool.push(element);
        vtrace!(element = element.0, "element moved to pinned pool");
        true
    }

    /// Hands focus to the nearest layout-held element, preferring the next index.
    fn move_focus_from_cleared_index<T>(
        &mut self,
        cleared_index: Option<usize>,
        cx: &mut ViewContext<'_, T, K>,
    ) {
        self.last_focused_element = None;
        let Some(cleared) = cleared_index else {
            return;
        };

        let mut next: Option<(usize, ElementId)> = None;
        let mut previous: Option<(usize, ElementId)> = None;
        for &child in cx.children.iter() {
            let Some(info) = self.records.get(&child) else {
                continue;
            };
            if !info.is_held_by_layout() {
                continue;
            }
            let Some(index) = info.index() else {
                continue;
            };
            if index >= cleared {
                if next.is_none_or(|(n, _)| index < n) {
                    next = Some((index, child));
                }
            } else if previous.is_none_or(|(p, _)| index > p) {
                previous = Some((index, child));
            }
        }

        let candidate = match (next, previous) {
            (Some((_, child)), _) => {
                let target = if cx.host.is_focusable(child) {
                    Some(child)
                } else {
                    cx.host.find_first_focusable(child)
                };
                target.map(|target| (child, target))
            }
            (None, Some((_, child))) => {
                let target = if cx.host.is_focusable(child) {
                    Some(child)
                } else {
                    cx.host.find_last_focusable(child)
                };
                target.map(|target| (child, target))
            }
            (None, None) => None,
        };

        if let Some((child, target)) = candidate {
            if cx.host.focus(target) {
                vtrace!(cleared, element = child.0, "focus moved off cleared element");
                self.last_focused_element = Some(child);
                if let Some(info) = self.records.get_mut(&child) {
                    info.add_pin();
                }
            }
        }
    }

    fn update_element_index<T>(
        &mut self,
        element: ElementId,
        new_index: usize,
        cx: &ViewContext<'_, T, K>,
    ) {
        let Some(info) = self.records.get_mut(&element) else {
            return;
        };
        let old_index = info.index();
        if old_index == Some(new_index) {
            return;
        }
        info.update_index(new_index);
        if let Some(old_index) = old_index {
            cx.events.element_index_changed(element, old_index, new_index);
        }
    }

    /// Moves every realized index at or after `from` by `delta`.
    fn shift_indices<T>(&mut self, from: usize, delta: isize, cx: &ViewContext<'_, T, K>) {
        if delta == 0 {
            return;
        }
        let children = cx.children.clone();
        for element in children {
            let Some(info) = self.records.get(&element) else {
                continue;
            };
            if !info.is_realized() {
                continue;
            }
            let Some(index) = info.index() else {
                continue;
            };
            if index >= from {
                let new_index = index.saturating_add_signed(delta);
                self.update_element_index(element, new_index, cx);
            }
        }
    }

    /// Forcibly clears realized elements showing items in `start..end`.
    fn clear_realized_in<T>(
        &mut self,
        start: usize,
        end: usize,
        cx: &mut ViewContext<'_, T, K>,
    ) -> Result<()> {
        let children = cx.children.clone();
        for element in children {
            let hit = self.records.get(&element).is_some_and(|info| {
                info.is_realized() && info.index().is_some_and(|i| start <= i && i < end)
            });
            if hit {
                self.clear_element(element, true, cx)?;
            }
        }
        Ok(())
    }

    fn ensure_first_last_realized_indices<T>(&mut self, cx: &ViewContext<'_, T, K>) {
        if self.realized_range().is_some() {
            return;
        }
        let mut first: Option<usize> = None;
        let mut last: Option<usize> = None;
        for child in cx.children.iter() {
            let index = self
                .records
                .get(child)
                .filter(|info| info.is_held_by_layout())
                .and_then(|info| info.index());
            if let Some(index) = index {
                first = Some(first.map_or(index, |f| f.min(index)));
                last = Some(last.map_or(index, |l| l.max(index)));
            }
        }
        self.first_realized_index = first;
        self.last_realized_index = last;
    }

    /// Both markers are set or both unset. Anything else is a bug; recover by unsetting both.
    fn check_realized_range(&mut self) {
        let consistent =
            self.first_realized_index.is_some() == self.last_realized_index.is_some();
        if !consistent {
            vwarn!(
                first = ?self.first_realized_index,
                last = ?self.last_realized_index,
                "realized range half set; resetting"
            );
            debug_assert!(consistent, "realized range half set");
            self.invalidate_realized_indices();
        }
    }

    fn invalidate_realized_indices(&mut self) {
        self.first_realized_index = None;
        self.last_realized_index = None;
    }

    fn child_of_owner<T>(element: ElementId, cx: &ViewContext<'_, T, K>) -> Option<ElementId> {
        let mut child = element;
        loop {
            let parent = cx.host.parent(child)?;
            if parent == cx.owner {
                return Some(child);
            }
            child = parent;
        }
    }
}

use alloc::vec::Vec;
use core::iter;

use crate::items::CollectionChange;
use crate::key::UniqueKey;
use crate::layout::{ElementRealizationOptions, RepeaterLayoutContext};
use crate::{ElementId, Orientation, Rect, Size};

/// Callbacks a concrete flow layout supplies to the shared algorithm.
pub(crate) trait FlowLayoutAlgorithmDelegates {
    fn on_element_measured(&mut self, index: usize, major_size: f64, minor_size: f64);

    /// Average major-axis size of one element, spacing excluded.
    fn average_element_size<T, K: UniqueKey>(
        &mut self,
        available: Size,
        orientation: Orientation,
        context: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> f64;

    /// Largest minor-axis size seen since the last arrange.
    fn max_arrange_bounds(&self) -> f64;
}

/// Elements are measured unconstrained along the flow.
pub(crate) fn measure_size(orientation: Orientation, available: Size) -> Size {
    orientation.size(f64::INFINITY, orientation.minor(available))
}

/// A contiguous run of realized data indices and their layout bounds.
///
/// `None` slots are placeholders left by an insert inside the run; they are filled on the next
/// pass that reaches them.
#[derive(Debug, Default)]
pub(crate) struct ElementManager {
    realized_elements: Vec<Option<ElementId>>,
    realized_bounds: Vec<Option<Rect>>,
    first_realized_data_index: usize,
}

impl ElementManager {
    pub(crate) fn realized_range_size(&self) -> usize {
        self.realized_elements.len()
    }

    pub(crate) fn first_realized_data_index(&self) -> Option<usize> {
        (!self.realized_elements.is_empty()).then_some(self.first_realized_data_index)
    }

    pub(crate) fn last_realized_data_index(&self) -> Option<usize> {
        let len = self.realized_range_size();
        (len > 0).then(|| self.first_realized_data_index + len - 1)
    }

    fn range_index(&self, data_index: usize) -> Option<usize> {
        data_index
            .checked_sub(self.first_realized_data_index)
            .filter(|&i| i < self.realized_range_size())
    }

    pub(crate) fn is_data_index_realized(&self, data_index: usize) -> bool {
        self.get_realized_element(data_index).is_some()
    }

    pub(crate) fn get_realized_element(&self, data_index: usize) -> Option<ElementId> {
        self.range_index(data_index)
            .and_then(|i| self.realized_elements[i])
    }

    pub(crate) fn layout_bounds(&self, data_index: usize) -> Option<Rect> {
        self.range_index(data_index)
            .and_then(|i| self.realized_bounds[i])
    }

    pub(crate) fn set_layout_bounds(&mut self, data_index: usize, bounds: Rect) {
        if let Some(i) = self.range_index(data_index) {
            self.realized_bounds[i] = Some(bounds);
        }
    }

    /// Realized `(data index, element, bounds)` triples in index order, placeholders skipped.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, ElementId, Option<Rect>)> + '_ {
        let first = self.first_realized_data_index;
        self.realized_elements
            .iter()
            .zip(self.realized_bounds.iter())
            .enumerate()
            .filter_map(move |(i, (element, bounds))| element.map(|e| (first + i, e, *bounds)))
    }

    /// Makes sure `data_index` holds an element, growing the run at the front or back.
    pub(crate) fn ensure_element_realized<T, K: UniqueKey>(
        &mut self,
        forward: bool,
        data_index: usize,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> crate::Result<ElementId> {
        if let Some(element) = self.get_realized_element(data_index) {
            return Ok(element);
        }

        let element = cx.get_or_create_element_at(
            data_index,
            ElementRealizationOptions::FORCE_CREATE_SUPPRESS_AUTO_RECYCLE,
        )?;

        if let Some(i) = self.range_index(data_index) {
            self.realized_elements[i] = Some(element);
            self.realized_bounds[i] = None;
            return Ok(element);
        }

        let contiguous = match (forward, self.first_realized_data_index(), self.last_realized_data_index()) {
            (_, None, _) => true,
            (true, _, Some(last)) => data_index == last + 1,
            (false, Some(first), _) => data_index + 1 == first,
            _ => false,
        };
        if !contiguous {
            vwarn!(data_index, "non-contiguous realization; restarting run");
            self.clear_realized_range(cx);
        }

        if self.realized_elements.is_empty() {
            self.first_realized_data_index = data_index;
            self.realized_elements.push(Some(element));
            self.realized_bounds.push(None);
        } else if forward {
            self.realized_elements.push(Some(element));
            self.realized_bounds.push(None);
        } else {
            self.realized_elements.insert(0, Some(element));
            self.realized_bounds.insert(0, None);
            self.first_realized_data_index = data_index;
        }
        Ok(element)
    }

    pub(crate) fn clear_realized_range<T, K: UniqueKey>(
        &mut self,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        let len = self.realized_elements.len();
        self.clear_realized_range_at(0, len, cx);
        self.first_realized_data_index = 0;
    }

    /// Recycles `count` slots starting at run position `realized_index`.
    ///
    /// Front clears recycle front to back and back clears recycle back to front, so the
    /// repeater's realized markers shrink one step at a time.
    pub(crate) fn clear_realized_range_at<T, K: UniqueKey>(
        &mut self,
        realized_index: usize,
        count: usize,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        let end = realized_index
            .saturating_add(count)
            .min(self.realized_elements.len());
        if realized_index >= end {
            return;
        }

        for offset in 0..end - realized_index {
            let i = if realized_index == 0 {
                offset
            } else {
                end - 1 - offset
            };
            if let Some(element) = self.realized_elements[i] {
                if cx.recycle_element(element).is_err() {
                    vwarn!(element = element.0, "failed to recycle realized element");
                }
            }
        }

        self.realized_elements.drain(realized_index..end);
        self.realized_bounds.drain(realized_index..end);
        if realized_index == 0 {
            self.first_realized_data_index += end;
        }
    }

    /// Drops realized slots at either end that no longer touch `window` along the major axis.
    pub(crate) fn discard_elements_outside_window<T, K: UniqueKey>(
        &mut self,
        window: Rect,
        orientation: Orientation,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        let intersects =
            |bounds: &Option<Rect>| bounds.is_some_and(|b| orientation.intersects_major(window, b));
        let size = self.realized_bounds.len();
        let front = self
            .realized_bounds
            .iter()
            .take_while(|b| !intersects(b))
            .count();
        if front == size {
            self.clear_realized_range(cx);
            return;
        }
        let back = self
            .realized_bounds
            .iter()
            .rev()
            .take_while(|b| !intersects(b))
            .count();

        if back > 0 {
            self.clear_realized_range_at(size - back, back, cx);
        }
        if front > 0 {
            self.clear_realized_range_at(0, front, cx);
        }
    }

    /// Drops everything from `data_index` onward (forward) or up to and including it (backward).
    pub(crate) fn discard_elements_from<T, K: UniqueKey>(
        &mut self,
        forward: bool,
        data_index: usize,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        let Some(i) = self.range_index(data_index) else {
            return;
        };
        if forward {
            let len = self.realized_elements.len();
            self.clear_realized_range_at(i, len - i, cx);
        } else {
            self.clear_realized_range_at(0, i + 1, cx);
        }
    }

    pub(crate) fn data_source_changed<T, K: UniqueKey>(
        &mut self,
        change: CollectionChange,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        match change {
            CollectionChange::Insert { index, count } => self.on_items_added(index, count),
            CollectionChange::Remove { index, count } => self.on_items_removed(index, count, cx),
            CollectionChange::Replace {
                index,
                old_count,
                new_count,
            } => {
                self.on_items_removed(index, old_count, cx);
                self.on_items_added(index, new_count);
            }
            CollectionChange::Reset => self.clear_realized_range(cx),
        }
    }

    fn on_items_added(&mut self, index: usize, count: usize) {
        let Some(last) = self.last_realized_data_index() else {
            return;
        };
        let first = self.first_realized_data_index;
        if index > first && index <= last {
            // Keep the run contiguous without creating elements the next pass may not need.
            let at = index - first;
            self.realized_elements
                .splice(at..at, iter::repeat_n(None, count));
            self.realized_bounds
                .splice(at..at, iter::repeat_n(None, count));
        } else if index <= first {
            self.first_realized_data_index += count;
        }
    }

    fn on_items_removed<T, K: UniqueKey>(
        &mut self,
        index: usize,
        count: usize,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        let Some(last) = self.last_realized_data_index() else {
            return;
        };
        let first = self.first_realized_data_index;
        let start = index.max(first);
        let end = index.saturating_add(count).min(last + 1);
        if end > start {
            self.clear_realized_range_at(start - first, end - start, cx);
        }
        if index <= first && !self.realized_elements.is_empty() {
            self.first_realized_data_index = self.first_realized_data_index.saturating_sub(count);
        }
    }
}

/// Measure and arrange for a single-line flow of items.
#[derive(Debug, Default)]
pub(crate) struct FlowLayoutAlgorithm {
    element_manager: ElementManager,
    last_extent: Rect,
}

impl FlowLayoutAlgorithm {
    pub(crate) fn last_extent(&self) -> Rect {
        self.last_extent
    }

    pub(crate) fn element_manager(&self) -> &ElementManager {
        &self.element_manager
    }

    pub(crate) fn uninitialize_for_context<T, K: UniqueKey>(
        &mut self,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        self.element_manager.clear_realized_range(cx);
    }

    pub(crate) fn on_items_source_changed<T, K: UniqueKey>(
        &mut self,
        change: CollectionChange,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        self.element_manager.data_source_changed(change, cx);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn measure<T, K: UniqueKey, D: FlowLayoutAlgorithmDelegates>(
        &mut self,
        available: Size,
        orientation: Orientation,
        spacing: f64,
        delegates: &mut D,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> Size {
        let count = cx.item_count();
        if count == 0 {
            self.element_manager.clear_realized_range(cx);
            self.last_extent = Rect::default();
            return Size::ZERO;
        }

        let window = cx.realization_rect();
        let virtualizing = !window.is_infinite();
        if virtualizing {
            self.element_manager
                .discard_elements_outside_window(window, orientation, cx);
        }

        match self.anchor(available, orientation, spacing, virtualizing, count, delegates, cx) {
            Some((index, offset)) => {
                self.generate(index, offset, available, orientation, spacing, delegates, cx)
            }
            None => self.element_manager.clear_realized_range(cx),
        }

        let extent = self.compute_extent(available, orientation, spacing, count, delegates, cx);
        vtrace!(
            realized = self.element_manager.realized_range_size(),
            extent = orientation.major_size(extent),
            "flow measured"
        );
        self.last_extent = extent;
        orientation.size(
            orientation.major_size(extent),
            orientation.minor_size(extent),
        )
    }

    pub(crate) fn arrange<T, K: UniqueKey>(
        &mut self,
        final_size: Size,
        orientation: Orientation,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> Size {
        let minor_final = orientation.minor(final_size);
        for (_, element, bounds) in self.element_manager.iter() {
            let Some(bounds) = bounds else {
                continue;
            };
            let arranged = orientation.rect(
                orientation.major_start(bounds),
                orientation.minor_start(bounds),
                orientation.major_size(bounds),
                orientation.minor_size(bounds).max(minor_final),
            );
            cx.arrange_element(element, arranged);
        }
        final_size
    }

    /// Picks the element generation starts from, with its major-axis offset when it has to be
    /// (re)positioned. `None` means the window does not touch the items at all.
    #[allow(clippy::too_many_arguments)]
    fn anchor<T, K: UniqueKey, D: FlowLayoutAlgorithmDelegates>(
        &self,
        available: Size,
        orientation: Orientation,
        spacing: f64,
        virtualizing: bool,
        count: usize,
        delegates: &mut D,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> Option<(usize, Option<f64>)> {
        if !virtualizing {
            return Some((0, Some(0.0)));
        }

        if let Some(index) = cx.recommended_anchor_index().filter(|&i| i < count) {
            if self.element_manager.layout_bounds(index).is_some()
                && self.element_manager.is_data_index_realized(index)
            {
                return Some((index, None));
            }
            let average = delegates.average_element_size(available, orientation, cx) + spacing;
            let offset = index as f64 * average + orientation.major_start(self.last_extent);
            return Some((index, Some(offset)));
        }

        let window = cx.realization_rect();
        let realized = self
            .element_manager
            .iter()
            .find(|(_, _, bounds)| bounds.is_some_and(|b| orientation.intersects_major(window, b)));
        if let Some((index, _, _)) = realized {
            return Some((index, None));
        }

        self.anchor_for_realization_rect(available, orientation, spacing, count, delegates, cx)
    }

    fn anchor_for_realization_rect<T, K: UniqueKey, D: FlowLayoutAlgorithmDelegates>(
        &self,
        available: Size,
        orientation: Orientation,
        spacing: f64,
        count: usize,
        delegates: &mut D,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> Option<(usize, Option<f64>)> {
        let window = cx.realization_rect();
        let average = delegates.average_element_size(available, orientation, cx) + spacing;
        let extent_start = orientation.major_start(self.last_extent);
        let offset_in_extent = orientation.major_start(window) - extent_start;
        let window_major = orientation.major_size(window);
        let major_size = match orientation.major_size(self.last_extent) {
            size if size == 0.0 => (average * count as f64 - spacing).max(0.0),
            size => size,
        };

        if window_major < 0.0 || offset_in_extent + window_major < 0.0 || offset_in_extent > major_size {
            return None;
        }
        if average <= 0.0 {
            return Some((0, Some(extent_start)));
        }

        // Float to int casts saturate, so a window starting above the extent lands on 0.
        let index = ((offset_in_extent / average) as usize).min(count - 1);
        Some((index, Some(index as f64 * average + extent_start)))
    }

    #[allow(clippy::too_many_arguments)]
    fn generate<T, K: UniqueKey, D: FlowLayoutAlgorithmDelegates>(
        &mut self,
        anchor_index: usize,
        anchor_offset: Option<f64>,
        available: Size,
        orientation: Orientation,
        spacing: f64,
        delegates: &mut D,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) {
        let count = cx.item_count();
        let window = cx.realization_rect();
        let virtualizing = !window.is_infinite();

        if !self.element_manager.is_data_index_realized(anchor_index) {
            self.element_manager.clear_realized_range(cx);
        }
        let previous_start = self
            .element_manager
            .layout_bounds(anchor_index)
            .map(|b| orientation.major_start(b));
        let anchor = match self.element_manager.ensure_element_realized(true, anchor_index, cx) {
            Ok(element) => element,
            Err(_) => {
                vwarn!(index = anchor_index, "anchor could not be realized");
                self.element_manager.clear_realized_range(cx);
                return;
            }
        };
        let start = anchor_offset.or(previous_start).unwrap_or(0.0);
        let desired = Self::measure_element(anchor_index, anchor, available, orientation, delegates, cx);
        let anchor_bounds = orientation.rect(
            start,
            0.0,
            orientation.major(desired),
            orientation.minor(desired),
        );
        self.element_manager.set_layout_bounds(anchor_index, anchor_bounds);

        // Forward.
        let mut previous = anchor_bounds;
        let mut index = anchor_index + 1;
        while index < count
            && (!virtualizing || orientation.major_end(previous) < orientation.major_end(window))
        {
            let element = match self.element_manager.ensure_element_realized(true, index, cx) {
                Ok(element) => element,
                Err(_) => {
                    vwarn!(index, "stopping forward generation; element unavailable");
                    break;
                }
            };
            let desired = Self::measure_element(index, element, available, orientation, delegates, cx);
            previous = orientation.rect(
                orientation.major_end(previous) + spacing,
                0.0,
                orientation.major(desired),
                orientation.minor(desired),
            );
            self.element_manager.set_layout_bounds(index, previous);
            index += 1;
        }
        self.element_manager.discard_elements_from(true, index, cx);

        // Backward.
        let mut next = anchor_bounds;
        let mut index = anchor_index;
        while index > 0
            && (!virtualizing || orientation.major_start(next) > orientation.major_start(window))
        {
            let candidate = index - 1;
            let element = match self.element_manager.ensure_element_realized(false, candidate, cx) {
                Ok(element) => element,
                Err(_) => {
                    vwarn!(index = candidate, "stopping backward generation; element unavailable");
                    break;
                }
            };
            let desired =
                Self::measure_element(candidate, element, available, orientation, delegates, cx);
            let major = orientation.major(desired);
            next = orientation.rect(
                orientation.major_start(next) - spacing - major,
                0.0,
                major,
                orientation.minor(desired),
            );
            self.element_manager.set_layout_bounds(candidate, next);
            index = candidate;
        }
        if let Some(before) = index.checked_sub(1) {
            self.element_manager.discard_elements_from(false, before, cx);
        }
    }

    fn measure_element<T, K: UniqueKey, D: FlowLayoutAlgorithmDelegates>(
        index: usize,
        element: ElementId,
        available: Size,
        orientation: Orientation,
        delegates: &mut D,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> Size {
        let desired = cx.measure_element(element, measure_size(orientation, available));
        delegates.on_element_measured(index, orientation.major(desired), orientation.minor(desired));
        desired
    }

    /// Realized span plus the estimated size of everything outside it.
    fn compute_extent<T, K: UniqueKey, D: FlowLayoutAlgorithmDelegates>(
        &self,
        available: Size,
        orientation: Orientation,
        spacing: f64,
        count: usize,
        delegates: &mut D,
        cx: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> Rect {
        let average = delegates.average_element_size(available, orientation, cx) + spacing;
        let minor = delegates.max_arrange_bounds();
        let em = &self.element_manager;

        let first = em
            .first_realized_data_index()
            .and_then(|i| em.layout_bounds(i).map(|b| (i, b)));
        let last = em
            .last_realized_data_index()
            .and_then(|i| em.layout_bounds(i).map(|b| (i, b)));

        match (first, last) {
            (Some((first_index, first_bounds)), Some((last_index, last_bounds))) => {
                let major_start = orientation.major_start(first_bounds) - first_index as f64 * average;
                let remaining = count.saturating_sub(last_index + 1);
                let major_size = orientation.major_end(last_bounds) - major_start + remaining as f64 * average;
                orientation.rect(major_start, 0.0, major_size, minor)
            }
            _ => orientation.rect(0.0, 0.0, (count as f64 * average - spacing).max(0.0), minor),
        }
    }
}

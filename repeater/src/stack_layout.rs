use alloc::vec;
use alloc::vec::Vec;

use crate::flow::{FlowLayoutAlgorithm, FlowLayoutAlgorithmDelegates, measure_size};
use crate::items::CollectionChange;
use crate::key::UniqueKey;
use crate::layout::{ElementRealizationOptions, RepeaterLayoutContext, VirtualizingLayout};
use crate::{Orientation, Rect, Size};

/// Number of samples kept for the average element size.
pub const ESTIMATION_BUFFER_SIZE: usize = 100;

/// Lays items out one after another along a single axis.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackLayout {
    orientation: Orientation,
    spacing: f64,
}

impl StackLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Gap between consecutive items along the major axis.
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing.max(0.0);
        self
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }
}

/// Per-repeater state of a [`StackLayout`]: the realized run plus a rolling size estimate.
///
/// Major-axis sizes are sampled into a fixed ring keyed by `index % ESTIMATION_BUFFER_SIZE`, so
/// memory stays bounded no matter how many items the source has.
#[derive(Debug)]
pub struct StackLayoutState {
    flow_algorithm: FlowLayoutAlgorithm,
    estimation_buffer: Vec<f64>,
    total_element_size: f64,
    total_elements_measured: usize,
    max_arrange_bounds: f64,
}

impl Default for StackLayoutState {
    fn default() -> Self {
        Self::new()
    }
}

impl StackLayoutState {
    pub fn new() -> Self {
        Self {
            flow_algorithm: FlowLayoutAlgorithm::default(),
            estimation_buffer: vec![0.0; ESTIMATION_BUFFER_SIZE],
            total_element_size: 0.0,
            total_elements_measured: 0,
            max_arrange_bounds: 0.0,
        }
    }

    /// Records a measured element. A slot that already holds a sample is overwritten without
    /// counting a new distinct element.
    ///
    /// An empty slot is recognised by its zero value, so an item that legitimately measures
    /// zero along the major axis counts as a new distinct sample every time it is measured.
    pub fn on_element_measured(&mut self, index: usize, major_size: f64, minor_size: f64) {
        let slot = index % self.estimation_buffer.len();
        let previous = self.estimation_buffer[slot];
        if previous == 0.0 {
            self.total_elements_measured += 1;
        }
        self.total_element_size += major_size - previous;
        self.estimation_buffer[slot] = major_size;
        self.max_arrange_bounds = self.max_arrange_bounds.max(minor_size);
    }

    /// Called once per arrange pass after every element has been arranged.
    pub fn on_arrange_layout_end(&mut self) {
        self.max_arrange_bounds = 0.0;
    }

    pub fn total_element_size(&self) -> f64 {
        self.total_element_size
    }

    pub fn total_elements_measured(&self) -> usize {
        self.total_elements_measured
    }

    pub fn max_arrange_bounds(&self) -> f64 {
        self.max_arrange_bounds
    }

    /// Mean of the sampled major-axis sizes, or zero before anything was measured.
    pub fn average_element_size(&self) -> f64 {
        if self.total_elements_measured == 0 {
            0.0
        } else {
            self.total_element_size / self.total_elements_measured as f64
        }
    }

    /// Inclusive data-index span of the realized run.
    pub fn realized_range(&self) -> Option<(usize, usize)> {
        let em = self.flow_algorithm.element_manager();
        em.first_realized_data_index()
            .zip(em.last_realized_data_index())
    }

    /// Extent computed by the most recent measure pass.
    pub fn last_extent(&self) -> Rect {
        self.flow_algorithm.last_extent()
    }
}

impl FlowLayoutAlgorithmDelegates for StackLayoutState {
    fn on_element_measured(&mut self, index: usize, major_size: f64, minor_size: f64) {
        StackLayoutState::on_element_measured(self, index, major_size, minor_size);
    }

    fn average_element_size<T, K: UniqueKey>(
        &mut self,
        available: Size,
        orientation: Orientation,
        context: &mut RepeaterLayoutContext<'_, T, K>,
    ) -> f64 {
        if context.item_count() == 0 {
            return 0.0;
        }
        if self.total_elements_measured == 0 {
            // Borrow item 0 just long enough to get a first sample.
            match context.get_or_create_element_at(
                0,
                ElementRealizationOptions::FORCE_CREATE_SUPPRESS_AUTO_RECYCLE,
            ) {
                Ok(element) => {
                    let desired = context.measure_element(element, measure_size(orientation, available));
                    self.on_element_measured(0, orientation.major(desired), orientation.minor(desired));
                    if context.made_anchor() != Some(element) && context.recycle_element(element).is_err() {
                        vwarn!(element = element.0, "failed to recycle sizing element");
                    }
                }
                Err(_) => {
                    vwarn!("no element available to estimate the average size");
                }
            }
        }
        StackLayoutState::average_element_size(self)
    }

    fn max_arrange_bounds(&self) -> f64 {
        self.max_arrange_bounds
    }
}

impl VirtualizingLayout for StackLayout {
    type State = StackLayoutState;

    fn initialize_for_context<T, K: UniqueKey>(
        &self,
        _context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut Option<StackLayoutState>,
    ) {
        vdebug!(orientation = ?self.orientation, spacing = self.spacing, "stack layout attached");
        state.get_or_insert_with(StackLayoutState::new);
    }

    fn uninitialize_for_context<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut StackLayoutState,
    ) {
        vdebug!("stack layout detached");
        state.flow_algorithm.uninitialize_for_context(context);
    }

    fn measure<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut StackLayoutState,
        available: Size,
    ) -> Size {
        let mut flow = core::mem::take(&mut state.flow_algorithm);
        let desired = flow.measure(available, self.orientation, self.spacing, state, context);
        state.flow_algorithm = flow;
        desired
    }

    fn arrange<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut StackLayoutState,
        final_size: Size,
    ) -> Size {
        let arranged = state
            .flow_algorithm
            .arrange(final_size, self.orientation, context);
        state.on_arrange_layout_end();
        arranged
    }

    fn on_items_changed<T, K: UniqueKey>(
        &self,
        context: &mut RepeaterLayoutContext<'_, T, K>,
        state: &mut StackLayoutState,
        change: CollectionChange,
    ) {
        state.flow_algorithm.on_items_source_changed(change, context);
    }
}

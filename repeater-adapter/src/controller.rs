use repeater::{
    ItemKey, ItemsRepeater, Layout, LayoutState, Orientation, RepeaterError, Result, Size,
    UniqueKey,
};

use crate::{Easing, Tween, ViewportManager};

/// Distance below which a settled bring-into-view does not adjust the offset again.
const SNAP_EPSILON: f64 = 0.5;

/// A framework-neutral controller that owns an [`ItemsRepeater`] and keeps its windows in sync
/// with a scroll position.
///
/// This type does not hold any UI objects. Adapters drive it by calling:
/// - `on_viewport_size` / `on_scroll` when UI events occur
/// - `tick(now_ms)` each frame, which advances tween scrolling and runs a layout pass when the
///   repeater asks for one
///
/// The scroll axis follows the repeater's layout orientation.
#[derive(Debug)]
pub struct Controller<T, K = ItemKey> {
    repeater: ItemsRepeater<T, K>,
    viewport: ViewportManager,
    tween: Option<Tween>,
    pending_bring_into_view: Option<usize>,
}

impl<T, K: UniqueKey> Controller<T, K> {
    pub fn new(repeater: ItemsRepeater<T, K>, viewport: ViewportManager) -> Self {
        let mut controller = Self {
            repeater,
            viewport,
            tween: None,
            pending_bring_into_view: None,
        };
        controller.push_windows();
        controller
    }

    pub fn repeater(&self) -> &ItemsRepeater<T, K> {
        &self.repeater
    }

    /// Direct access for item mutations, pins and focus. Call [`Self::tick`] afterwards.
    pub fn repeater_mut(&mut self) -> &mut ItemsRepeater<T, K> {
        &mut self.repeater
    }

    pub fn into_repeater(self) -> ItemsRepeater<T, K> {
        self.repeater
    }

    pub fn viewport(&self) -> &ViewportManager {
        &self.viewport
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    pub fn cancel_animation(&mut self) {
        self.tween = None;
        self.pending_bring_into_view = None;
    }

    pub fn on_viewport_size(&mut self, size: Size) {
        self.viewport.set_viewport_size(size);
        self.push_windows();
    }

    /// Call this when the UI reports a scroll offset change (e.g. user wheel/drag).
    ///
    /// This cancels any active tween.
    pub fn on_scroll(&mut self, offset: f64) {
        self.cancel_animation();
        self.set_scroll_offset(offset);
    }

    /// Offset along the scroll axis.
    pub fn scroll_offset(&self) -> f64 {
        let (x, y) = self.viewport.scroll_offset();
        match self.axis() {
            Orientation::Vertical => y,
            Orientation::Horizontal => x,
        }
    }

    /// Largest offset that still fills the viewport, based on the last measured extent.
    pub fn max_scroll_offset(&self) -> f64 {
        let axis = self.axis();
        let extent = axis.major(self.repeater.desired_size());
        let viewport = axis.major(self.viewport.viewport_size());
        (extent - viewport).max(0.0)
    }

    /// Advances the controller.
    ///
    /// - If a tween is active, moves the windows and returns the new offset.
    /// - Runs a layout pass whenever the repeater needs one.
    pub fn tick(&mut self, now_ms: u64) -> Result<Option<f64>> {
        let Some(tween) = self.tween else {
            if self.repeater.needs_measure() || self.repeater.needs_arrange() {
                self.layout_pass()?;
            }
            return Ok(None);
        };

        let offset = tween.sample(now_ms).clamp(0.0, self.max_scroll_offset());
        self.set_scroll_offset(offset);
        vtrace!(now_ms, offset, "tween tick");

        if tween.is_done(now_ms) {
            self.tween = None;
            if let Some(index) = self.pending_bring_into_view.take() {
                self.settle_bring_into_view(index)?;
                return Ok(Some(self.scroll_offset()));
            }
        }
        self.layout_pass()?;
        Ok(Some(self.scroll_offset()))
    }

    /// Measures and arranges the repeater against the current viewport.
    pub fn layout_pass(&mut self) -> Result<Size> {
        let axis = self.axis();
        let viewport = self.viewport.viewport_size();
        let available = axis.size(f64::INFINITY, axis.minor(viewport));
        let desired = self.repeater.measure(available)?;
        let minor = axis.minor(desired).max(axis.minor(viewport));
        self.repeater.arrange(axis.size(axis.major(desired), minor))?;
        Ok(desired)
    }

    /// Scrolls `index` to the start of the viewport.
    ///
    /// The target comes from the realized position when there is one and from the layout's size
    /// estimate otherwise. With a zero duration the jump happens now. Otherwise a tween runs
    /// and the item is realized as the anchor once it finishes, correcting the offset if the
    /// estimate was off. Returns the (clamped) target offset.
    pub fn bring_into_view(
        &mut self,
        index: usize,
        now_ms: u64,
        duration_ms: u64,
        easing: Easing,
    ) -> Result<f64> {
        let count = self.repeater.items().count();
        if index >= count {
            return Err(RepeaterError::IndexOutOfRange { index, count });
        }
        if self.repeater.layout().is_none() {
            return Err(RepeaterError::NoLayout);
        }
        if self.repeater.needs_measure() {
            self.layout_pass()?;
        }

        let target = self
            .estimated_offset(index)
            .clamp(0.0, self.max_scroll_offset());
        vdebug!(index, target, duration_ms, "bring into view");

        if duration_ms == 0 {
            self.cancel_animation();
            self.set_scroll_offset(target);
            self.settle_bring_into_view(index)?;
            return Ok(self.scroll_offset());
        }

        let from = self.scroll_offset();
        self.tween = Some(Tween::new(from, target, now_ms, duration_ms, easing));
        self.pending_bring_into_view = Some(index);
        Ok(target)
    }

    fn settle_bring_into_view(&mut self, index: usize) -> Result<()> {
        let element = self.repeater.get_or_create_element(index)?;
        self.layout_pass()?;

        let axis = self.axis();
        let start = self
            .repeater
            .view_manager()
            .info(element)
            .and_then(|info| info.arrange_bounds())
            .map(|bounds| axis.major_start(bounds));
        if let Some(start) = start {
            let target = start.clamp(0.0, self.max_scroll_offset());
            let delta = target - self.scroll_offset();
            if !(-SNAP_EPSILON..=SNAP_EPSILON).contains(&delta) {
                vtrace!(index, target, "bring into view corrected");
                self.set_scroll_offset(target);
                self.layout_pass()?;
            }
        }
        Ok(())
    }

    fn estimated_offset(&self, index: usize) -> f64 {
        let axis = self.axis();
        let realized = self
            .repeater
            .try_get_element(index)
            .and_then(|element| self.repeater.view_manager().info(element))
            .and_then(|info| info.arrange_bounds());
        if let Some(bounds) = realized {
            return axis.major_start(bounds);
        }
        match (self.repeater.layout(), self.repeater.layout_state()) {
            (Some(Layout::Stack(layout)), Some(LayoutState::Stack(state))) => {
                let average = state.average_element_size() + layout.spacing();
                index as f64 * average + axis.major_start(state.last_extent())
            }
            _ => 0.0,
        }
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        let (x, y) = self.viewport.scroll_offset();
        match self.axis() {
            Orientation::Vertical => self.viewport.set_scroll_offset(x, offset),
            Orientation::Horizontal => self.viewport.set_scroll_offset(offset, y),
        }
        self.push_windows();
    }

    fn push_windows(&mut self) {
        self.repeater.set_viewport(
            self.viewport.visible_window(),
            self.viewport.realization_window(),
        );
    }

    fn axis(&self) -> Orientation {
        match self.repeater.layout() {
            Some(Layout::Stack(layout)) => layout.orientation(),
            None => Orientation::Vertical,
        }
    }
}

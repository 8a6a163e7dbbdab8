use repeater::{Rect, Size};

/// Turns a scroll position into the two windows an [`repeater::ItemsRepeater`] lays out against.
///
/// The realization window extends the visible window by `cache_length * viewport / 2` on each
/// side of an axis, so a cache length of 2.0 realizes one extra viewport before and after.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportManager {
    horizontal_cache_length: f64,
    vertical_cache_length: f64,
    viewport_size: Size,
    scroll_x: f64,
    scroll_y: f64,
}

impl Default for ViewportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportManager {
    pub const DEFAULT_CACHE_LENGTH: f64 = 2.0;

    pub fn new() -> Self {
        Self {
            horizontal_cache_length: Self::DEFAULT_CACHE_LENGTH,
            vertical_cache_length: Self::DEFAULT_CACHE_LENGTH,
            viewport_size: Size::ZERO,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    pub fn with_horizontal_cache_length(mut self, length: f64) -> Self {
        self.horizontal_cache_length = length.max(0.0);
        self
    }

    pub fn with_vertical_cache_length(mut self, length: f64) -> Self {
        self.vertical_cache_length = length.max(0.0);
        self
    }

    pub fn horizontal_cache_length(&self) -> f64 {
        self.horizontal_cache_length
    }

    pub fn vertical_cache_length(&self) -> f64 {
        self.vertical_cache_length
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = Size::new(size.width.max(0.0), size.height.max(0.0));
    }

    pub fn scroll_offset(&self) -> (f64, f64) {
        (self.scroll_x, self.scroll_y)
    }

    /// Offsets are measured from the start of the content and never go negative.
    pub fn set_scroll_offset(&mut self, x: f64, y: f64) {
        self.scroll_x = x.max(0.0);
        self.scroll_y = y.max(0.0);
    }

    pub fn visible_window(&self) -> Rect {
        Rect::new(
            self.scroll_x,
            self.scroll_y,
            self.viewport_size.width,
            self.viewport_size.height,
        )
    }

    /// An unbounded viewport yields an infinite window, which turns virtualization off.
    pub fn realization_window(&self) -> Rect {
        let visible = self.visible_window();
        if visible.is_infinite() {
            return Rect::INFINITE;
        }
        let dx = self.horizontal_cache_length * visible.width / 2.0;
        let dy = self.vertical_cache_length * visible.height / 2.0;
        Rect::new(
            visible.x - dx,
            visible.y - dy,
            visible.width + 2.0 * dx,
            visible.height + 2.0 * dy,
        )
    }
}

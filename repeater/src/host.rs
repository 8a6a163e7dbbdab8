//! Capabilities the repeater consumes from the surrounding UI framework.

use crate::{ElementId, Rect, Size};

#[derive(Debug)]
pub struct ElementFactoryGetArgs<'a, T> {
    pub index: usize,
    pub data: &'a T,
    pub parent: ElementId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementFactoryRecycleArgs {
    pub element: ElementId,
    pub parent: ElementId,
}

/// Produces elements for data items and takes them back for reuse.
///
/// Recycling an element the repeater does not currently own is a contract violation; the
/// repeater only hands back elements it received from this factory.
pub trait ElementFactory<T> {
    /// Returns `None` when no element can be produced. The index stays unrealized for this pass.
    fn get_element(&mut self, args: ElementFactoryGetArgs<'_, T>) -> Option<ElementId>;

    fn recycle_element(&mut self, args: ElementFactoryRecycleArgs);
}

/// The visual tree and focus subsystem, as far as the repeater needs them.
pub trait VisualHost {
    fn attach_child(&mut self, parent: ElementId, child: ElementId);

    fn detach_child(&mut self, parent: ElementId, child: ElementId);

    /// Visual parent of `element`, used to walk from a nested element up to the realized child.
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Measures `element` against `available` and returns its desired size.
    fn measure(&mut self, element: ElementId, available: Size) -> Size;

    fn arrange(&mut self, element: ElementId, bounds: Rect);

    fn is_focusable(&self, element: ElementId) -> bool;

    fn find_first_focusable(&self, subtree: ElementId) -> Option<ElementId>;

    fn find_last_focusable(&self, subtree: ElementId) -> Option<ElementId>;

    fn focus(&mut self, element: ElementId) -> bool;
}

/// Runs hide animations for elements removed by a collection change.
pub trait ElementAnimator {
    /// Returns `true` if an animation started. The element stays detached from the factory until
    /// the host reports completion.
    fn start_hide_animation(&mut self, element: ElementId) -> bool;
}

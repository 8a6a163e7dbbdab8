use crate::Rect;

/// Who currently holds an element. Exactly one owner at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementOwner {
    /// All elements are originally owned by the element factory.
    ElementFactory,
    /// Ownership moves to the layout when it asks for the element.
    Layout,
    /// Cleared while pinned (outside of a structural collection change).
    PinnedPool,
    /// Cleared while a stable reset is pending and the source has unique keys.
    UniqueIdResetPool,
    /// Cleared by a remove-like collection change and handed to a hide animation.
    Animator,
}

/// Per-element bookkeeping, kept in a side table keyed by [`crate::ElementId`].
#[derive(Clone, Debug)]
pub struct VirtualizationInfo<K> {
    owner: ElementOwner,
    index: Option<usize>,
    unique_id: Option<K>,
    pin_counter: u32,
    auto_recycle_candidate: bool,
    keep_alive: bool,
    phase: Option<i32>,
    arrange_bounds: Option<Rect>,
}

impl<K> VirtualizationInfo<K> {
    pub(crate) fn new() -> Self {
        Self {
            owner: ElementOwner::ElementFactory,
            index: None,
            unique_id: None,
            pin_counter: 0,
            auto_recycle_candidate: false,
            keep_alive: false,
            phase: None,
            arrange_bounds: None,
        }
    }

    pub fn owner(&self) -> ElementOwner {
        self.owner
    }

    /// Data index, or `None` while the element sits with the factory.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn unique_id(&self) -> Option<&K> {
        self.unique_id.as_ref()
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_counter
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_counter > 0
    }

    pub fn is_held_by_layout(&self) -> bool {
        self.owner == ElementOwner::Layout
    }

    pub fn is_realized(&self) -> bool {
        matches!(self.owner, ElementOwner::Layout | ElementOwner::PinnedPool)
    }

    pub fn is_in_unique_id_reset_pool(&self) -> bool {
        self.owner == ElementOwner::UniqueIdResetPool
    }

    pub fn auto_recycle_candidate(&self) -> bool {
        self.auto_recycle_candidate
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn phase(&self) -> Option<i32> {
        self.phase
    }

    pub fn arrange_bounds(&self) -> Option<Rect> {
        self.arrange_bounds
    }

    pub fn set_phase(&mut self, phase: Option<i32>) {
        self.phase = phase;
    }

    pub(crate) fn set_auto_recycle_candidate(&mut self, value: bool) {
        self.auto_recycle_candidate = value;
    }

    pub(crate) fn set_keep_alive(&mut self, value: bool) {
        self.keep_alive = value;
    }

    pub(crate) fn set_arrange_bounds(&mut self, bounds: Rect) {
        self.arrange_bounds = Some(bounds);
    }

    pub(crate) fn add_pin(&mut self) -> u32 {
        debug_assert!(self.is_realized(), "only realized elements can be pinned");
        self.pin_counter = self.pin_counter.saturating_add(1);
        self.pin_counter
    }

    /// Drops one pin and returns the remaining count. Never goes below zero.
    pub(crate) fn remove_pin(&mut self) -> u32 {
        debug_assert!(self.pin_counter > 0, "pin counter underflow");
        self.pin_counter = self.pin_counter.saturating_sub(1);
        self.pin_counter
    }

    pub(crate) fn update_index(&mut self, index: usize) {
        debug_assert!(
            self.owner != ElementOwner::ElementFactory,
            "factory-owned elements carry no index"
        );
        self.index = Some(index);
    }

    pub(crate) fn move_ownership_to_layout_from_element_factory(
        &mut self,
        index: usize,
        unique_id: Option<K>,
    ) {
        self.expect_owner(&[ElementOwner::ElementFactory]);
        self.owner = ElementOwner::Layout;
        self.index = Some(index);
        self.unique_id = unique_id;
    }

    pub(crate) fn move_ownership_to_layout_from_unique_id_reset_pool(&mut self) {
        self.expect_owner(&[ElementOwner::UniqueIdResetPool]);
        self.owner = ElementOwner::Layout;
    }

    pub(crate) fn move_ownership_to_layout_from_pinned_pool(&mut self) {
        self.expect_owner(&[ElementOwner::PinnedPool]);
        self.owner = ElementOwner::Layout;
    }

    pub(crate) fn move_ownership_to_unique_id_reset_pool(&mut self) {
        self.expect_owner(&[ElementOwner::Layout, ElementOwner::PinnedPool]);
        self.owner = ElementOwner::UniqueIdResetPool;
    }

    pub(crate) fn move_ownership_to_pinned_pool(&mut self) {
        self.expect_owner(&[ElementOwner::Layout]);
        self.owner = ElementOwner::PinnedPool;
    }

    pub(crate) fn move_ownership_to_animator(&mut self) {
        self.expect_owner(&[ElementOwner::Layout, ElementOwner::PinnedPool]);
        self.owner = ElementOwner::Animator;
    }

    /// Returns the element to the factory and forgets everything tied to its last index.
    pub(crate) fn move_ownership_to_element_factory(&mut self) {
        debug_assert!(
            self.owner != ElementOwner::ElementFactory,
            "element is already owned by the element factory"
        );
        self.owner = ElementOwner::ElementFactory;
        self.pin_counter = 0;
        self.index = None;
        self.unique_id = None;
        self.auto_recycle_candidate = false;
        self.keep_alive = false;
        self.phase = None;
        self.arrange_bounds = None;
    }

    fn expect_owner(&self, allowed: &[ElementOwner]) {
        if !allowed.contains(&self.owner) {
            vwarn!(owner = ?self.owner, "unexpected ownership transition");
            debug_assert!(
                allowed.contains(&self.owner),
                "unexpected ownership transition from {:?}",
                self.owner
            );
        }
    }
}

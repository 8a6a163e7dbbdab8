//! A headless element-recycling engine for virtualized item repeaters.
//!
//! For viewport windows, scrolling and animated bring-into-view, see the `repeater-adapter`
//! crate.
//!
//! Instead of one visual element per data item, an [`ItemsRepeater`] keeps a small set of
//! realized elements covering the realization window and recycles them as the window moves or
//! the collection changes. The hard parts live here:
//! - element ownership across the factory, the layout, the pinned pool, the unique-id reset pool
//!   and hide animations ([`ViewManager`])
//! - incremental extent estimation for a one-dimensional flow ([`StackLayout`])
//! - focus hand-off when the focused element is recycled
//!
//! It is UI-agnostic. A UI layer is expected to provide:
//! - an [`ElementFactory`] that creates and reuses elements
//! - a [`VisualHost`] for parenting, measuring, arranging and focus
//! - the visible and realization windows for each pass
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod error;
mod flow;
mod host;
mod info;
mod items;
mod key;
mod layout;
mod options;
mod pool;
mod repeater;
mod stack_layout;
mod types;
mod view_manager;

#[cfg(test)]
mod tests;

pub use error::{RepeaterError, Result};
pub use host::{
    ElementAnimator, ElementFactory, ElementFactoryGetArgs, ElementFactoryRecycleArgs, VisualHost,
};
pub use info::{ElementOwner, VirtualizationInfo};
pub use items::{CollectionChange, ItemsSourceView};
pub use key::UniqueKey;
pub use layout::{
    ElementRealizationOptions, Layout, LayoutState, RepeaterLayoutContext, VirtualizingLayout,
};
pub use options::{
    ElementClearingCallback, ElementIndexChangedCallback, ElementPreparedCallback, RepeaterEvents,
};
pub use pool::{PinnedPool, UniqueIdElementPool};
pub use repeater::ItemsRepeater;
pub use stack_layout::{ESTIMATION_BUFFER_SIZE, StackLayout, StackLayoutState};
pub use types::{ElementId, ItemKey, Orientation, Rect, Size};
pub use view_manager::ViewManager;

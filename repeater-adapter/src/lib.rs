//! Adapter utilities for the `repeater` crate.
//!
//! The `repeater` crate needs a visible window and a realization window for every layout pass
//! but never computes them. This crate fills that gap with small, framework-neutral helpers:
//!
//! - [`ViewportManager`]: windows from a scroll offset, a viewport size and cache lengths
//! - [`Controller`]: scrolling, frame ticks and animated bring-into-view around an
//!   [`repeater::ItemsRepeater`]
//! - [`Tween`] / [`Easing`]: adapter-driven smooth scrolling
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod controller;
mod tween;
mod viewport;


pub use controller::Controller;
pub use tween::{Easing, Tween};
pub use viewport::ViewportManager;

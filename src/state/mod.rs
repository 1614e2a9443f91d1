// src/state/mod.rs

//! Device lifecycle states and their aggregation.
//!
//! - [`lifecycle`] defines the per-device lifecycle states, the single-step
//!   transitions between them, and the multi-step lifecycle commands
//!   (`Configure`, `Start`, ...) built on top of those transitions.
//! - [`aggregate`] reduces a set of device states into one
//!   [`AggregatedState`]. It is pure and deterministic.
//! - [`selector`] decides which devices a request applies to.

pub mod aggregate;
pub mod lifecycle;
pub mod selector;

pub use aggregate::{aggregate, AggregatedState, DeviceState};
pub use lifecycle::{DeviceLifecycle, LifecycleCommand, Transition};
pub use selector::DeviceSelector;

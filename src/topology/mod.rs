// src/topology/mod.rs

//! Topology descriptions: what gets deployed for a partition.
//!
//! - [`model`] is the TOML-backed description plus its validation.
//! - [`source`] resolves a request's path/content/script triple into a
//!   parsed [`Topology`].
//! - [`diff`] computes the instance-level delta used by elastic updates.

pub mod diff;
pub mod model;
pub mod source;

pub use diff::{compute_diff, InstanceRef, TopologyDiff};
pub use model::{CollectionSpec, Topology, MAX_DEVICES};
pub use source::TopologySource;

// src/session/mod.rs

//! Per-partition session state and request serialisation.
//!
//! - [`store`] holds one [`Session`] record per live partition.
//! - [`locks`] hands out one async mutex per partition id, created on first
//!   use and never removed.
//!
//! The engine only mutates a partition's store entry while holding that
//! partition's lock.

pub mod locks;
pub mod store;

pub use locks::PartitionLocks;
pub use store::{Session, SessionStore};

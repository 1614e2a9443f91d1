// src/runtime/mod.rs

//! Pluggable process runtime abstraction.
//!
//! The engine never hosts devices itself. It talks to a [`DeviceRuntime`]:
//! the distributed execution substrate that owns sessions, deploys
//! topologies, applies state transitions and reports per-device states.
//!
//! - [`LocalRuntime`] is the in-process implementation used by the
//!   `topoctl` binary.
//! - Tests provide their own `DeviceRuntime` that scripts device failures or
//!   blocks calls to observe locking behaviour.

use std::future::Future;
use std::pin::Pin;

use crate::state::{DeviceSelector, DeviceState, Transition};
use crate::topology::{Topology, TopologyDiff};
use crate::types::{Property, SessionId};

pub mod local;

pub use local::LocalRuntime;

/// Boxed future returned by every runtime call.
pub type RuntimeFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// A device that did not accept a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    pub task_id: u64,
    pub path: String,
    pub reason: String,
}

/// Per-device result of a fan-out command.
///
/// `devices` holds the state of every selected device after the command;
/// `failures` lists the devices that rejected it. A rejected device keeps
/// its previous state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionReport {
    pub devices: Vec<DeviceState>,
    pub failures: Vec<DeviceFailure>,
}

/// Trait abstracting the external distributed-process runtime.
///
/// `Err` means the call itself could not be carried out (unknown session,
/// runtime unreachable, deployment refused). Individual devices refusing a
/// transition are reported through [`TransitionReport::failures`] instead.
pub trait DeviceRuntime: Send + Sync {
    /// Request a brand new session.
    fn create_session(&self) -> RuntimeFuture<'_, SessionId>;

    /// Attach to an existing session, returning its deployed topology (if
    /// one is active).
    fn attach_session<'a>(&'a self, session_id: &'a str) -> RuntimeFuture<'a, Option<Topology>>;

    /// Tear the session down together with any deployed devices.
    fn shutdown_session<'a>(&'a self, session_id: &'a str) -> RuntimeFuture<'a, ()>;

    /// Deploy `topology`, replacing whatever the session was running.
    /// Returns the state of every deployed device.
    fn activate<'a>(
        &'a self,
        session_id: &'a str,
        topology: &'a Topology,
    ) -> RuntimeFuture<'a, Vec<DeviceState>>;

    /// Apply an instance-level diff. Returns the newly added devices.
    fn update<'a>(
        &'a self,
        session_id: &'a str,
        diff: &'a TopologyDiff,
    ) -> RuntimeFuture<'a, Vec<DeviceState>>;

    /// Send one transition to every selected device.
    fn change_state<'a>(
        &'a self,
        session_id: &'a str,
        selector: &'a DeviceSelector,
        transition: Transition,
    ) -> RuntimeFuture<'a, TransitionReport>;

    /// Current state of every selected device.
    fn get_state<'a>(
        &'a self,
        session_id: &'a str,
        selector: &'a DeviceSelector,
    ) -> RuntimeFuture<'a, Vec<DeviceState>>;

    /// Push key/value configuration without changing lifecycle state.
    fn set_properties<'a>(
        &'a self,
        session_id: &'a str,
        selector: &'a DeviceSelector,
        properties: &'a [Property],
    ) -> RuntimeFuture<'a, TransitionReport>;
}

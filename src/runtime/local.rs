// src/runtime/local.rs

//! In-process device runtime.
//!
//! Devices are plain records held in memory. Every transition is applied
//! immediately and checked against the lifecycle table; an illegal transition
//! leaves the device untouched and is reported as a per-device failure.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail};
use tracing::{debug, info};
use uuid::Uuid;

use crate::runtime::{DeviceFailure, DeviceRuntime, RuntimeFuture, TransitionReport};
use crate::state::{DeviceLifecycle, DeviceSelector, DeviceState, Transition};
use crate::topology::{Topology, TopologyDiff};
use crate::types::{Property, SessionId};

#[derive(Debug)]
struct LocalDevice {
    task_id: u64,
    path: String,
    state: DeviceLifecycle,
    properties: HashMap<String, String>,
}

impl LocalDevice {
    fn snapshot(&self) -> DeviceState {
        DeviceState::new(self.task_id, self.path.clone(), self.state)
    }
}

#[derive(Debug, Default)]
struct LocalSession {
    topology: Option<Topology>,
    /// Keyed by path so reports come back in a stable order.
    devices: BTreeMap<String, LocalDevice>,
}

#[derive(Debug)]
pub struct LocalRuntime {
    sessions: Mutex<HashMap<SessionId, LocalSession>>,
    next_task_id: AtomicU64,
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_task_id: AtomicU64::new(1),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, LocalSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_device(&self, path: String) -> LocalDevice {
        LocalDevice {
            task_id: self.next_task_id.fetch_add(1, Ordering::Relaxed),
            path,
            state: DeviceLifecycle::Idle,
            properties: HashMap::new(),
        }
    }

    /// Current property values of one device (for diagnostics).
    pub fn device_properties(
        &self,
        session_id: &str,
        path: &str,
    ) -> Option<HashMap<String, String>> {
        let sessions = self.sessions();
        let device = sessions.get(session_id)?.devices.get(path)?;
        Some(device.properties.clone())
    }
}

fn unknown_session(session_id: &str) -> anyhow::Error {
    anyhow!("session '{session_id}' not found")
}

impl DeviceRuntime for LocalRuntime {
    fn create_session(&self) -> RuntimeFuture<'_, SessionId> {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            self.sessions().insert(id.clone(), LocalSession::default());
            info!(session = %id, "local session created");
            Ok(id)
        })
    }

    fn attach_session<'a>(&'a self, session_id: &'a str) -> RuntimeFuture<'a, Option<Topology>> {
        Box::pin(async move {
            let sessions = self.sessions();
            let session = sessions
                .get(session_id)
                .ok_or_else(|| unknown_session(session_id))?;
            debug!(session = %session_id, "attached to local session");
            Ok(session.topology.clone())
        })
    }

    fn shutdown_session<'a>(&'a self, session_id: &'a str) -> RuntimeFuture<'a, ()> {
        Box::pin(async move {
            let removed = self.sessions().remove(session_id);
            match removed {
                Some(session) => {
                    info!(
                        session = %session_id,
                        devices = session.devices.len(),
                        "local session shut down"
                    );
                    Ok(())
                }
                None => Err(unknown_session(session_id)),
            }
        })
    }

    fn activate<'a>(
        &'a self,
        session_id: &'a str,
        topology: &'a Topology,
    ) -> RuntimeFuture<'a, Vec<DeviceState>> {
        Box::pin(async move {
            let mut sessions = self.sessions();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| unknown_session(session_id))?;

            session.devices.clear();
            for path in topology.device_paths() {
                let device = self.spawn_device(path.clone());
                session.devices.insert(path, device);
            }
            session.topology = Some(topology.clone());

            info!(
                session = %session_id,
                topology = %topology.name,
                devices = session.devices.len(),
                "topology deployed"
            );
            Ok(session.devices.values().map(LocalDevice::snapshot).collect())
        })
    }

    fn update<'a>(
        &'a self,
        session_id: &'a str,
        diff: &'a TopologyDiff,
    ) -> RuntimeFuture<'a, Vec<DeviceState>> {
        Box::pin(async move {
            let mut sessions = self.sessions();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| unknown_session(session_id))?;
            if session.topology.is_none() {
                bail!("session '{session_id}' has no deployed topology");
            }

            for path in diff.removed_paths() {
                session.devices.remove(path);
            }

            let mut added = Vec::new();
            for path in diff.added_paths() {
                let device = self.spawn_device(path.to_string());
                added.push(device.snapshot());
                session.devices.insert(path.to_string(), device);
            }
            session.topology = Some(diff.result.clone());

            info!(
                session = %session_id,
                added = added.len(),
                removed = diff.removed_paths().count(),
                "topology updated"
            );
            Ok(added)
        })
    }

    fn change_state<'a>(
        &'a self,
        session_id: &'a str,
        selector: &'a DeviceSelector,
        transition: Transition,
    ) -> RuntimeFuture<'a, TransitionReport> {
        Box::pin(async move {
            let mut sessions = self.sessions();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| unknown_session(session_id))?;

            let mut report = TransitionReport::default();
            for device in session.devices.values_mut() {
                if !selector.matches(&device.path) {
                    continue;
                }
                match transition.apply(device.state) {
                    Some(next) => device.state = next,
                    None => report.failures.push(DeviceFailure {
                        task_id: device.task_id,
                        path: device.path.clone(),
                        reason: format!(
                            "transition {} not allowed in state {}",
                            transition, device.state
                        ),
                    }),
                }
                report.devices.push(device.snapshot());
            }

            debug!(
                session = %session_id,
                %transition,
                devices = report.devices.len(),
                failures = report.failures.len(),
                "transition applied"
            );
            Ok(report)
        })
    }

    fn get_state<'a>(
        &'a self,
        session_id: &'a str,
        selector: &'a DeviceSelector,
    ) -> RuntimeFuture<'a, Vec<DeviceState>> {
        Box::pin(async move {
            let sessions = self.sessions();
            let session = sessions
                .get(session_id)
                .ok_or_else(|| unknown_session(session_id))?;
            Ok(session
                .devices
                .values()
                .filter(|d| selector.matches(&d.path))
                .map(LocalDevice::snapshot)
                .collect())
        })
    }

    fn set_properties<'a>(
        &'a self,
        session_id: &'a str,
        selector: &'a DeviceSelector,
        properties: &'a [Property],
    ) -> RuntimeFuture<'a, TransitionReport> {
        Box::pin(async move {
            let mut sessions = self.sessions();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| unknown_session(session_id))?;

            let mut report = TransitionReport::default();
            for device in session.devices.values_mut() {
                if !selector.matches(&device.path) {
                    continue;
                }
                if matches!(device.state, DeviceLifecycle::Error | DeviceLifecycle::Exiting) {
                    report.failures.push(DeviceFailure {
                        task_id: device.task_id,
                        path: device.path.clone(),
                        reason: format!("cannot set properties in state {}", device.state),
                    });
                } else {
                    for (key, value) in properties {
                        device.properties.insert(key.clone(), value.clone());
                    }
                }
                report.devices.push(device.snapshot());
            }
            Ok(report)
        })
    }
}

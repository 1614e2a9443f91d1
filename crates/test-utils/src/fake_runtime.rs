use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use tokio::sync::Notify;
use topoctl::runtime::{DeviceFailure, DeviceRuntime, RuntimeFuture, TransitionReport};
use topoctl::state::{DeviceLifecycle, DeviceSelector, DeviceState, Transition};
use topoctl::topology::{Topology, TopologyDiff};
use topoctl::types::{Property, SessionId};

#[derive(Debug, Default)]
struct FakeSession {
    topology: Option<Topology>,
    devices: BTreeMap<String, DeviceState>,
    properties: BTreeMap<String, Vec<Property>>,
}

/// An in-memory device runtime for tests that:
/// - records every call as a short string (`"activate:<topology>"`, ...)
/// - deploys devices in a scripted initial state (default `Idle`)
/// - can reject session creation, attach, activation or shutdown
/// - can block activation of a named topology until released
/// - makes devices matching a pattern reject every transition
/// - can delay every transition step.
#[derive(Default)]
pub struct FakeRuntime {
    sessions: Mutex<HashMap<SessionId, FakeSession>>,
    next_session: AtomicU64,
    next_task: AtomicU64,
    initial_states: Mutex<Vec<(String, DeviceLifecycle)>>,
    broken_devices: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    fail_create: AtomicBool,
    fail_activate: AtomicBool,
    fail_shutdown: AtomicBool,
    transition_delay: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Devices whose path contains `pattern` start in `state`.
    pub fn initial_state(&self, pattern: &str, state: DeviceLifecycle) {
        self.initial_states
            .lock()
            .unwrap()
            .push((pattern.to_string(), state));
    }

    /// Devices whose path contains `pattern` reject every transition.
    pub fn break_devices(&self, pattern: &str) {
        self.broken_devices.lock().unwrap().push(pattern.to_string());
    }

    /// Activation of topology `name` waits until the returned handle is
    /// notified.
    pub fn gate_activation(&self, name: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::clone(&notify));
        notify
    }

    /// Every `change_state` call sleeps for `delay` before applying.
    pub fn slow_transitions(&self, delay: Duration) {
        *self.transition_delay.lock().unwrap() = delay;
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_activate(&self, fail: bool) {
        self.fail_activate.store(fail, Ordering::SeqCst);
    }

    pub fn fail_shutdown(&self, fail: bool) {
        self.fail_shutdown.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Every device of `session_id`, sorted by path.
    pub fn devices(&self, session_id: &str) -> Vec<DeviceState> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|s| s.devices.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn properties(&self, session_id: &str, path: &str) -> Vec<Property> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .and_then(|s| s.properties.get(path).cloned())
            .unwrap_or_default()
    }

    /// Force a device into `state`.
    pub fn set_device_state(&self, session_id: &str, path: &str, state: DeviceLifecycle) {
        if let Some(device) = self
            .sessions
            .lock()
            .unwrap()
            .get_mut(session_id)
            .and_then(|s| s.devices.get_mut(path))
        {
            device.state = state;
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn new_device(&self, path: &str) -> DeviceState {
        let state = self
            .initial_states
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| path.contains(pattern.as_str()))
            .map(|(_, state)| *state)
            .unwrap_or(DeviceLifecycle::Idle);
        let task_id = self.next_task.fetch_add(1, Ordering::SeqCst) + 1;
        DeviceState::new(task_id, path, state)
    }

    fn is_broken(&self, path: &str) -> bool {
        self.broken_devices
            .lock()
            .unwrap()
            .iter()
            .any(|pattern| path.contains(pattern.as_str()))
    }
}

impl DeviceRuntime for FakeRuntime {
    fn create_session(&self) -> RuntimeFuture<'_, SessionId> {
        Box::pin(async move {
            self.record("create_session".to_string());
            if self.fail_create.load(Ordering::SeqCst) {
                bail!("no free session slots");
            }
            let id = format!("session-{}", self.next_session.fetch_add(1, Ordering::SeqCst) + 1);
            self.sessions
                .lock()
                .unwrap()
                .insert(id.clone(), FakeSession::default());
            Ok(id)
        })
    }

    fn attach_session<'a>(&'a self, session_id: &'a str) -> RuntimeFuture<'a, Option<Topology>> {
        Box::pin(async move {
            self.record(format!("attach:{session_id}"));
            self.sessions
                .lock()
                .unwrap()
                .get(session_id)
                .map(|s| s.topology.clone())
                .ok_or_else(|| anyhow!("unknown session {session_id}"))
        })
    }

    fn shutdown_session<'a>(&'a self, session_id: &'a str) -> RuntimeFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("shutdown:{session_id}"));
            if self.fail_shutdown.load(Ordering::SeqCst) {
                bail!("runtime refused shutdown");
            }
            self.sessions
                .lock()
                .unwrap()
                .remove(session_id)
                .map(|_| ())
                .ok_or_else(|| anyhow!("unknown session {session_id}"))
        })
    }

    fn activate<'a>(
        &'a self,
        session_id: &'a str,
        topology: &'a Topology,
    ) -> RuntimeFuture<'a, Vec<DeviceState>> {
        Box::pin(async move {
            self.record(format!("activate:{}", topology.name));

            let gate = self.gates.lock().unwrap().get(&topology.name).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.fail_activate.load(Ordering::SeqCst) {
                bail!("deployment of '{}' rejected", topology.name);
            }

            let devices: BTreeMap<String, DeviceState> = topology
                .device_paths()
                .into_iter()
                .map(|path| {
                    let device = self.new_device(&path);
                    (path, device)
                })
                .collect();

            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| anyhow!("unknown session {session_id}"))?;
            session.topology = Some(topology.clone());
            session.devices = devices;
            Ok(session.devices.values().cloned().collect())
        })
    }

    fn update<'a>(
        &'a self,
        session_id: &'a str,
        diff: &'a TopologyDiff,
    ) -> RuntimeFuture<'a, Vec<DeviceState>> {
        Box::pin(async move {
            self.record(format!(
                "update:+{}-{}",
                diff.added_paths().count(),
                diff.removed_paths().count()
            ));

            let added: Vec<DeviceState> = diff.added_paths().map(|p| self.new_device(p)).collect();

            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| anyhow!("unknown session {session_id}"))?;
            for path in diff.removed_paths() {
                session.devices.remove(path);
            }
            for device in &added {
                session.devices.insert(device.path.clone(), device.clone());
            }
            session.topology = Some(diff.result.clone());
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
            self.record(format!("change_state:{transition}"));
            let delay = *self.transition_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let broken: Vec<String> = self.broken_devices.lock().unwrap().clone();
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| anyhow!("unknown session {session_id}"))?;

            let mut report = TransitionReport::default();
            for device in session.devices.values_mut() {
                if !selector.matches(&device.path) {
                    continue;
                }
                let is_broken = broken.iter().any(|p| device.path.contains(p.as_str()));
                match transition.apply(device.state) {
                    Some(next) if !is_broken => device.state = next,
                    _ => {
                        if is_broken {
                            device.state = DeviceLifecycle::Error;
                        }
                        report.failures.push(DeviceFailure {
                            task_id: device.task_id,
                            path: device.path.clone(),
                            reason: format!("{transition} rejected in {}", device.state),
                        });
                    }
                }
                report.devices.push(device.clone());
            }
            Ok(report)
        })
    }

    fn get_state<'a>(
        &'a self,
        session_id: &'a str,
        selector: &'a DeviceSelector,
    ) -> RuntimeFuture<'a, Vec<DeviceState>> {
        Box::pin(async move {
            self.record("get_state".to_string());
            let sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get(session_id)
                .ok_or_else(|| anyhow!("unknown session {session_id}"))?;
            Ok(session
                .devices
                .values()
                .filter(|d| selector.matches(&d.path))
                .cloned()
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
            self.record("set_properties".to_string());
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| anyhow!("unknown session {session_id}"))?;

            let mut report = TransitionReport::default();
            let paths: Vec<String> = session
                .devices
                .keys()
                .filter(|p| selector.matches(p))
                .cloned()
                .collect();
            for path in paths {
                if self.is_broken(&path) {
                    if let Some(device) = session.devices.get(&path) {
                        report.failures.push(DeviceFailure {
                            task_id: device.task_id,
                            path: path.clone(),
                            reason: "device unreachable".to_string(),
                        });
                    }
                } else {
                    session
                        .properties
                        .entry(path.clone())
                        .or_default()
                        .extend(properties.iter().cloned());
                }
                if let Some(device) = session.devices.get(&path) {
                    report.devices.push(device.clone());
                }
            }
            Ok(report)
        })
    }
}

// src/engine/mod.rs

//! The partition lifecycle engine.
//!
//! [`Engine`] composes:
//! - the per-partition lock map and session store ([`crate::session`])
//! - the resource plugin dispatcher and request triggers ([`crate::plugins`])
//! - an external process runtime ([`crate::runtime::DeviceRuntime`])
//!
//! Every partition-scoped operation takes the partition lock for its full
//! duration (lock wait, runtime calls, trigger), runs, and folds the result
//! into an [`Outcome`]. Operations never return `Err`; failures are
//! classified into [`EngineError`]s carried by the outcome.
//!
//! The operations themselves are split by concern:
//! - [`session_ops`]: Initialize, Submit, Run, Shutdown, Status
//! - [`topology_ops`]: Activate, Update
//! - [`device_ops`]: lifecycle commands, GetState, SetProperties

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, info_span, Instrument};

use crate::errors::{EngineError, ErrorCode};
use crate::plugins::{PluginDispatcher, RequestTriggers, ResourcePlugin};
use crate::runtime::DeviceRuntime;
use crate::session::{PartitionLocks, Session, SessionStore};
use crate::state::{AggregatedState, DeviceState};
use crate::types::{CommonParams, RequestKind, SessionId};

mod device_ops;
mod outcome;
mod session_ops;
mod topology_ops;

pub use outcome::{Outcome, PartitionStatus, SessionStatus, StatusCode, StatusOutcome};

/// Request timeout used when a request does not carry one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What a successful step hands back to [`Engine::finish`].
#[derive(Debug, Clone, Default)]
struct Completed {
    message: String,
    state: AggregatedState,
    devices: Vec<DeviceState>,
    /// Reported session id when it is no longer in the store (Shutdown).
    session_id: Option<SessionId>,
}

impl Completed {
    fn new(message: impl Into<String>, state: AggregatedState) -> Self {
        Self {
            message: message.into(),
            state,
            ..Self::default()
        }
    }

    fn with_devices(mut self, devices: Vec<DeviceState>) -> Self {
        self.devices = devices;
        self
    }
}

type StepResult = Result<Completed, EngineError>;

/// Point in time by which a request must be done with the runtime and the
/// backends. Set once the partition lock is held.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: tokio::time::Instant,
    budget: Duration,
}

impl Deadline {
    fn after(budget: Duration) -> Self {
        Self {
            at: tokio::time::Instant::now() + budget,
            budget,
        }
    }
}

pub struct Engine {
    runtime: Arc<dyn DeviceRuntime>,
    plugins: PluginDispatcher,
    triggers: RequestTriggers,
    sessions: SessionStore,
    locks: PartitionLocks,
    default_timeout: Duration,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("plugins", &self.plugins)
            .field("sessions", &self.sessions.len())
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

/// Startup-time wiring of an [`Engine`].
///
/// Plugins and triggers can only be registered here; once built, the engine
/// treats both registries as immutable.
pub struct EngineBuilder {
    runtime: Arc<dyn DeviceRuntime>,
    plugins: PluginDispatcher,
    triggers: RequestTriggers,
    default_timeout: Duration,
}

impl EngineBuilder {
    pub fn plugin(mut self, name: impl Into<String>, backend: Arc<dyn ResourcePlugin>) -> Self {
        self.plugins.register_plugin(name, backend);
        self
    }

    pub fn plugins(mut self, plugins: PluginDispatcher) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn triggers(mut self, triggers: RequestTriggers) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            runtime: self.runtime,
            plugins: self.plugins,
            triggers: self.triggers,
            sessions: SessionStore::new(),
            locks: PartitionLocks::new(),
            default_timeout: self.default_timeout,
        }
    }
}

impl Engine {
    pub fn builder(runtime: Arc<dyn DeviceRuntime>) -> EngineBuilder {
        EngineBuilder {
            runtime,
            plugins: PluginDispatcher::new(),
            triggers: RequestTriggers::new(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Snapshot of the session record of `partition_id` (for inspection).
    pub fn session(&self, partition_id: &str) -> Option<Session> {
        self.sessions.get(partition_id)
    }

    /// Number of partitions with a live session.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.names()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn timeout_for(&self, common: &CommonParams) -> Duration {
        if common.timeout.is_zero() {
            self.default_timeout
        } else {
            common.timeout
        }
    }

    /// Bound `fut` by the request deadline shared by every step of a request.
    async fn bounded<T, F>(&self, deadline: Deadline, what: &str, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        match tokio::time::timeout_at(deadline.at, fut).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::new(
                ErrorCode::Timeout,
                format!(
                    "{what} did not complete within {} ms",
                    deadline.budget.as_millis()
                ),
            )),
        }
    }

    fn require_session(&self, partition_id: &str) -> Result<Session, EngineError> {
        self.sessions.get(partition_id).ok_or_else(|| {
            EngineError::new(
                ErrorCode::PartitionNotFound,
                format!("partition '{partition_id}' has no live session"),
            )
        })
    }

    /// Run `op` while holding the lock of `common.partition_id`.
    ///
    /// `op` is built only once the lock is held and receives the request
    /// deadline; time spent waiting for the lock is not charged to it.
    async fn serialized<O, F>(
        &self,
        kind: RequestKind,
        common: &CommonParams,
        detailed: bool,
        op: O,
    ) -> Outcome
    where
        O: FnOnce(Deadline) -> F,
        F: Future<Output = StepResult>,
    {
        let span = info_span!(
            "request",
            partition = %common.partition_id,
            run = common.run_nr,
            request = %kind
        );

        async {
            let started = Instant::now();
            info!("request received");
            let _guard = self.locks.acquire(&common.partition_id).await;
            let deadline = Deadline::after(self.timeout_for(common));
            let result = op(deadline).await;
            self.finish(kind, common, started, result, detailed).await
        }
        .instrument(span)
        .await
    }

    /// Build the outcome, log it and run the request trigger.
    ///
    /// Called with the partition lock still held.
    async fn finish(
        &self,
        kind: RequestKind,
        common: &CommonParams,
        started: Instant,
        result: StepResult,
        detailed: bool,
    ) -> Outcome {
        let mut stored = self.sessions.get(&common.partition_id);
        if let Some(session) = stored.as_mut().filter(|_| result.is_ok()) {
            if common.run_nr != 0 && session.run_nr != common.run_nr {
                session.run_nr = common.run_nr;
                self.sessions.put(session.clone());
            }
        }
        let run_nr = match (&stored, common.run_nr) {
            (Some(session), 0) => session.run_nr,
            _ => common.run_nr,
        };
        let stored_session_id = stored
            .as_ref()
            .map(|s| s.session_id.clone())
            .unwrap_or_default();

        let mut outcome = match result {
            Ok(done) => Outcome {
                status: StatusCode::Ok,
                message: done.message,
                error: None,
                partition_id: common.partition_id.clone(),
                session_id: done.session_id.unwrap_or(stored_session_id),
                run_nr,
                aggregated_state: done.state,
                details: detailed.then_some(done.devices),
                exec_time: Duration::ZERO,
            },
            Err(err) => Outcome {
                status: StatusCode::Error,
                message: err.to_string(),
                partition_id: common.partition_id.clone(),
                session_id: stored_session_id,
                run_nr,
                aggregated_state: stored.map(|s| s.last_state).unwrap_or_default(),
                details: None,
                error: Some(err),
                exec_time: Duration::ZERO,
            },
        };

        self.triggers
            .fire(kind, &common.partition_id, outcome.is_ok(), self.timeout_for(common))
            .await;

        outcome.exec_time = started.elapsed();
        let elapsed_ms = outcome.exec_time.as_millis() as u64;
        match &outcome.error {
            None => info!(
                state = %outcome.aggregated_state,
                elapsed_ms,
                "{}",
                outcome.message
            ),
            Some(err) => error!(
                code = err.code.code(),
                state = %outcome.aggregated_state,
                elapsed_ms,
                "{}",
                err
            ),
        }
        outcome
    }
}

/// Classify a runtime/backend failure under `code`, keeping its text.
async fn classify<T, F>(code: ErrorCode, fut: F) -> Result<T, EngineError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    fut.await
        .map_err(|e| EngineError::new(code, format!("{e:#}")))
}

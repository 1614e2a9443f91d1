// src/engine/session_ops.rs

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::{info, warn};

use crate::engine::{
    classify, Completed, Deadline, Engine, Outcome, PartitionStatus, SessionStatus, StatusCode,
    StatusOutcome, StepResult,
};
use crate::errors::{EngineError, ErrorCode};
use crate::session::Session;
use crate::state::{aggregate, AggregatedState, DeviceSelector};
use crate::types::{
    ActivateParams, CommonParams, InitializeParams, RequestKind, StatusParams, SubmitParams,
};

impl Engine {
    /// Create a new session, or attach to the one named in `params`.
    pub async fn initialize(&self, common: &CommonParams, params: &InitializeParams) -> Outcome {
        self.serialized(
            RequestKind::Initialize,
            common,
            false,
            |deadline| self.exec_initialize(common, deadline, params),
        )
        .await
    }

    /// Submit resources through a registered plugin.
    pub async fn submit(&self, common: &CommonParams, params: &SubmitParams) -> Outcome {
        self.serialized(
            RequestKind::Submit,
            common,
            false,
            |deadline| self.exec_submit(common, deadline, params),
        )
        .await
    }

    /// Initialize, Submit and Activate under one partition lock.
    ///
    /// Stops at the first failing step and reports it. Steps that already
    /// succeeded are not rolled back.
    pub async fn run(
        &self,
        common: &CommonParams,
        initialize: &InitializeParams,
        submit: &SubmitParams,
        activate: &ActivateParams,
    ) -> Outcome {
        let op = |deadline: Deadline| async move {
            self.exec_initialize(common, deadline, initialize).await?;
            self.exec_submit(common, deadline, submit).await?;
            self.exec_activate(common, deadline, activate).await
        };
        self.serialized(RequestKind::Run, common, false, op).await
    }

    /// Tear down the partition's session. Succeeds if there is none.
    pub async fn shutdown(&self, common: &CommonParams) -> Outcome {
        self.serialized(
            RequestKind::Shutdown,
            common,
            false,
            |deadline| self.exec_shutdown(common, deadline),
        )
        .await
    }

    /// Snapshot of every partition seen so far. Takes no partition lock.
    pub async fn status(&self, params: &StatusParams) -> StatusOutcome {
        let started = Instant::now();

        let sessions = self.sessions.snapshot();
        let mut ids: BTreeSet<String> = self.locks.known_partitions().into_iter().collect();
        ids.extend(sessions.iter().map(|s| s.partition_id.clone()));

        let partitions: Vec<PartitionStatus> = ids
            .into_iter()
            .map(|partition_id| {
                match sessions.iter().find(|s| s.partition_id == partition_id) {
                    Some(session) => PartitionStatus {
                        partition_id,
                        session_id: session.session_id.clone(),
                        session_status: SessionStatus::Running,
                        aggregated_state: session.last_state,
                    },
                    None => PartitionStatus {
                        partition_id,
                        session_id: String::new(),
                        session_status: SessionStatus::Stopped,
                        aggregated_state: AggregatedState::Undefined,
                    },
                }
            })
            .filter(|p| !params.running || p.session_status == SessionStatus::Running)
            .collect();

        let outcome = StatusOutcome {
            status: StatusCode::Ok,
            message: format!("{} partition(s)", partitions.len()),
            error: None,
            partitions,
            exec_time: started.elapsed(),
        };
        info!(
            request = %RequestKind::Status,
            partitions = outcome.partitions.len(),
            elapsed_ms = outcome.exec_time.as_millis() as u64,
            "status reported"
        );
        outcome
    }

    pub(super) async fn exec_initialize(
        &self,
        common: &CommonParams,
        deadline: Deadline,
        params: &InitializeParams,
    ) -> StepResult {
        let partition_id = &common.partition_id;
        let hint = params.session_id.trim();
        let existing = self.sessions.get(partition_id);

        if hint.is_empty() {
            if let Some(old) = existing {
                self.bounded(
                    deadline,
                    "shutdown of previous session",
                    classify(
                        ErrorCode::RuntimeFailure,
                        self.runtime.shutdown_session(&old.session_id),
                    ),
                )
                .await?;
                self.sessions.remove(partition_id);
                info!(session = %old.session_id, "previous session shut down");
            }

            let session_id = self
                .bounded(
                    deadline,
                    "session creation",
                    classify(ErrorCode::SessionCreationFailed, self.runtime.create_session()),
                )
                .await?;

            let mut session = Session::new(partition_id.clone(), session_id.clone());
            session.run_nr = common.run_nr;
            self.sessions.put(session);
            return Ok(Completed::new(
                format!("Session {session_id} created"),
                AggregatedState::Undefined,
            ));
        }

        if let Some(old) = existing.filter(|s| s.session_id != hint) {
            warn!(
                previous = %old.session_id,
                session = %hint,
                "replacing session record without shutting the previous session down"
            );
        }

        let topology = self
            .bounded(
                deadline,
                "session attach",
                classify(
                    ErrorCode::SessionCreationFailed,
                    self.runtime.attach_session(hint),
                ),
            )
            .await?;

        let devices = match &topology {
            Some(_) => {
                self.bounded(
                    deadline,
                    "state query",
                    classify(
                        ErrorCode::RuntimeFailure,
                        self.runtime.get_state(hint, &DeviceSelector::All),
                    ),
                )
                .await?
            }
            None => Vec::new(),
        };
        let state = aggregate(&devices);

        let mut session = Session::new(partition_id.clone(), hint);
        session.run_nr = common.run_nr;
        session.topology = topology;
        session.last_state = state;
        self.sessions.put(session);

        Ok(Completed::new(format!("Attached to session {hint}"), state).with_devices(devices))
    }

    pub(super) async fn exec_submit(
        &self,
        common: &CommonParams,
        deadline: Deadline,
        params: &SubmitParams,
    ) -> StepResult {
        let plugin = params.plugin.trim();
        if !self.plugins.contains(plugin) {
            return Err(EngineError::new(
                ErrorCode::PluginNotFound,
                format!("plugin '{plugin}' is not registered"),
            ));
        }

        let mut session = self.require_session(&common.partition_id)?;
        let submission = self
            .bounded(
                deadline,
                "resource submission",
                self.plugins
                    .submit(plugin, &common.partition_id, &params.resources),
            )
            .await?;

        let mut message = format!("Resources submitted via plugin '{plugin}'");
        if !submission.description.is_empty() {
            message.push_str(": ");
            message.push_str(&submission.description);
        }
        session.submissions.push(submission);
        let state = session.last_state;
        self.sessions.put(session);

        Ok(Completed::new(message, state))
    }

    async fn exec_shutdown(&self, common: &CommonParams, deadline: Deadline) -> StepResult {
        let Some(session) = self.sessions.get(&common.partition_id) else {
            return Ok(Completed::new(
                "No live session; nothing to shut down",
                AggregatedState::Undefined,
            ));
        };

        self.bounded(
            deadline,
            "session shutdown",
            classify(
                ErrorCode::RuntimeFailure,
                self.runtime.shutdown_session(&session.session_id),
            ),
        )
        .await?;
        self.sessions.remove(&common.partition_id);

        let mut done = Completed::new(
            format!("Session {} shut down", session.session_id),
            AggregatedState::Undefined,
        );
        done.session_id = Some(session.session_id);
        Ok(done)
    }
}

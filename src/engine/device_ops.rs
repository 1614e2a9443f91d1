// src/engine/device_ops.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::engine::{classify, Completed, Deadline, Engine, Outcome, StepResult};
use crate::errors::{EngineError, ErrorCode};
use crate::runtime::DeviceFailure;
use crate::session::Session;
use crate::state::{aggregate, AggregatedState, DeviceSelector, DeviceState, LifecycleCommand};
use crate::types::{CommonParams, DeviceParams, RequestKind, SetPropertiesParams};

fn parse_selector(path: &str) -> Result<DeviceSelector, EngineError> {
    DeviceSelector::from_path(path).map_err(|e| {
        EngineError::new(
            ErrorCode::InvalidDeviceSelector,
            format!("bad device path regex '{path}': {e}"),
        )
    })
}

fn empty_selection(path: &str) -> EngineError {
    EngineError::new(
        ErrorCode::InvalidDeviceSelector,
        format!("device path '{path}' matches no device"),
    )
}

impl Engine {
    pub async fn configure(&self, common: &CommonParams, params: &DeviceParams) -> Outcome {
        self.lifecycle(RequestKind::Configure, LifecycleCommand::Configure, common, params)
            .await
    }

    pub async fn start(&self, common: &CommonParams, params: &DeviceParams) -> Outcome {
        self.lifecycle(RequestKind::Start, LifecycleCommand::Start, common, params)
            .await
    }

    pub async fn stop(&self, common: &CommonParams, params: &DeviceParams) -> Outcome {
        self.lifecycle(RequestKind::Stop, LifecycleCommand::Stop, common, params)
            .await
    }

    pub async fn reset(&self, common: &CommonParams, params: &DeviceParams) -> Outcome {
        self.lifecycle(RequestKind::Reset, LifecycleCommand::Reset, common, params)
            .await
    }

    pub async fn terminate(&self, common: &CommonParams, params: &DeviceParams) -> Outcome {
        self.lifecycle(RequestKind::Terminate, LifecycleCommand::Terminate, common, params)
            .await
    }

    /// Current aggregated state of the selected devices.
    pub async fn get_state(&self, common: &CommonParams, params: &DeviceParams) -> Outcome {
        self.serialized(
            RequestKind::GetState,
            common,
            params.detailed,
            |deadline| self.exec_get_state(common, deadline, params),
        )
        .await
    }

    /// Push key/value properties to the selected devices.
    pub async fn set_properties(
        &self,
        common: &CommonParams,
        params: &SetPropertiesParams,
    ) -> Outcome {
        self.serialized(
            RequestKind::SetProperties,
            common,
            false,
            |deadline| self.exec_set_properties(common, deadline, params),
        )
        .await
    }

    async fn lifecycle(
        &self,
        kind: RequestKind,
        command: LifecycleCommand,
        common: &CommonParams,
        params: &DeviceParams,
    ) -> Outcome {
        self.serialized(
            kind,
            common,
            params.detailed,
            |deadline| self.exec_lifecycle(command, common, deadline, params),
        )
        .await
    }

    /// Session plus proof that it has a deployed topology.
    fn require_topology(&self, partition_id: &str) -> Result<Session, EngineError> {
        let session = self.require_session(partition_id)?;
        if session.topology.is_none() {
            return Err(EngineError::new(
                ErrorCode::NoActiveTopology,
                format!("partition '{partition_id}' has no activated topology"),
            ));
        }
        Ok(session)
    }

    async fn query_state(
        &self,
        deadline: Deadline,
        session_id: &str,
        selector: &DeviceSelector,
    ) -> Result<Vec<DeviceState>, EngineError> {
        self.bounded(
            deadline,
            "state query",
            classify(
                ErrorCode::RuntimeFailure,
                self.runtime.get_state(session_id, selector),
            ),
        )
        .await
    }

    /// Recompute and store the partition-wide aggregated state.
    async fn refresh_state(
        &self,
        deadline: Deadline,
        mut session: Session,
    ) -> Result<AggregatedState, EngineError> {
        let devices = self
            .query_state(deadline, &session.session_id, &DeviceSelector::All)
            .await?;
        session.last_state = aggregate(&devices);
        let state = session.last_state;
        self.sessions.put(session);
        Ok(state)
    }

    /// Send every transition of `command` to the selected devices.
    ///
    /// A device that rejects a step is left out of the remaining steps.
    /// Returns the final state of every initially selected device and the
    /// rejections collected on the way.
    pub(super) async fn drive(
        &self,
        deadline: Deadline,
        session_id: &str,
        selector: &DeviceSelector,
        command: LifecycleCommand,
    ) -> Result<(Vec<DeviceState>, Vec<DeviceFailure>), EngineError> {
        let mut selector = selector.clone();
        let mut last: BTreeMap<String, DeviceState> = BTreeMap::new();
        let mut failures = Vec::new();

        for transition in command.transitions() {
            let report = self
                .bounded(
                    deadline,
                    &format!("{transition} transition"),
                    classify(
                        ErrorCode::RuntimeFailure,
                        self.runtime.change_state(session_id, &selector, *transition),
                    ),
                )
                .await?;
            debug!(
                %transition,
                devices = report.devices.len(),
                failures = report.failures.len(),
                "transition step done"
            );

            let rejected: BTreeSet<&str> =
                report.failures.iter().map(|f| f.path.as_str()).collect();
            let accepted: Vec<String> = report
                .devices
                .iter()
                .filter(|d| !rejected.contains(d.path.as_str()))
                .map(|d| d.path.clone())
                .collect();

            let narrowed = !rejected.is_empty();
            for device in report.devices {
                last.insert(device.path.clone(), device);
            }
            failures.extend(report.failures);

            if accepted.is_empty() {
                break;
            }
            if narrowed {
                selector = DeviceSelector::paths(accepted);
            }
        }

        Ok((last.into_values().collect(), failures))
    }

    async fn exec_lifecycle(
        &self,
        command: LifecycleCommand,
        common: &CommonParams,
        deadline: Deadline,
        params: &DeviceParams,
    ) -> StepResult {
        let session = self.require_topology(&common.partition_id)?;
        let selector = parse_selector(&params.path)?;
        let session_id = session.session_id.clone();

        let selected = self.query_state(deadline, &session_id, &selector).await?;
        if selected.is_empty() {
            return Err(empty_selection(&params.path));
        }

        let (devices, failures) = self.drive(deadline, &session_id, &selector, command).await?;
        for failure in &failures {
            warn!(
                device = %failure.path,
                task = failure.task_id,
                reason = %failure.reason,
                "device rejected {}",
                command.name()
            );
        }

        let state = aggregate(&devices);
        if selector.is_all() {
            let mut session = session;
            session.last_state = state;
            self.sessions.put(session);
        } else {
            self.refresh_state(deadline, session).await?;
        }

        let target = command.target();
        let missed = devices.iter().filter(|d| d.state != target).count();
        let message = if missed == 0 {
            format!("{} done: {} devices {target}", command.name(), devices.len())
        } else {
            format!(
                "{} done: {missed} of {} devices did not reach {target}",
                command.name(),
                devices.len()
            )
        };
        Ok(Completed::new(message, state).with_devices(devices))
    }

    async fn exec_get_state(
        &self,
        common: &CommonParams,
        deadline: Deadline,
        params: &DeviceParams,
    ) -> StepResult {
        let session = self.require_session(&common.partition_id)?;
        let selector = parse_selector(&params.path)?;
        if session.topology.is_none() {
            return Ok(Completed::new(
                "No topology activated",
                AggregatedState::Undefined,
            ));
        }

        let session_id = session.session_id.clone();
        let devices = self.query_state(deadline, &session_id, &selector).await?;
        if devices.is_empty() && !selector.is_all() {
            return Err(empty_selection(&params.path));
        }

        let state = aggregate(&devices);
        if selector.is_all() {
            let mut session = session;
            session.last_state = state;
            self.sessions.put(session);
        } else {
            self.refresh_state(deadline, session).await?;
        }

        Ok(Completed::new(format!("{} devices", devices.len()), state).with_devices(devices))
    }

    async fn exec_set_properties(
        &self,
        common: &CommonParams,
        deadline: Deadline,
        params: &SetPropertiesParams,
    ) -> StepResult {
        let session = self.require_topology(&common.partition_id)?;
        let selector = parse_selector(&params.path)?;
        let session_id = session.session_id.clone();

        let selected = self.query_state(deadline, &session_id, &selector).await?;
        if selected.is_empty() {
            return Err(empty_selection(&params.path));
        }

        let report = self
            .bounded(
                deadline,
                "property update",
                classify(
                    ErrorCode::RuntimeFailure,
                    self.runtime
                        .set_properties(&session_id, &selector, &params.properties),
                ),
            )
            .await?;
        for failure in &report.failures {
            warn!(
                device = %failure.path,
                reason = %failure.reason,
                "device rejected properties"
            );
        }

        let state = aggregate(&report.devices);
        self.refresh_state(deadline, session).await?;

        let rejected = report.failures.len();
        let message = if rejected == 0 {
            format!(
                "{} properties set on {} devices",
                params.properties.len(),
                report.devices.len()
            )
        } else {
            format!(
                "{} properties set: {rejected} of {} devices rejected them",
                params.properties.len(),
                report.devices.len()
            )
        };
        Ok(Completed::new(message, state).with_devices(report.devices))
    }
}

// src/engine/topology_ops.rs

use tracing::{debug, warn};

use crate::engine::{classify, Completed, Deadline, Engine, Outcome, StepResult};
use crate::errors::{EngineError, ErrorCode};
use crate::state::{aggregate, DeviceLifecycle, DeviceSelector, LifecycleCommand};
use crate::topology::{compute_diff, Topology, TopologySource};
use crate::types::{ActivateParams, CommonParams, RequestKind, TopologyParams, UpdateParams};

fn invalid_topology(details: impl Into<String>) -> EngineError {
    EngineError::new(ErrorCode::InvalidTopology, details)
}

impl Engine {
    /// Deploy a topology to the partition's session.
    pub async fn activate(&self, common: &CommonParams, params: &ActivateParams) -> Outcome {
        self.serialized(
            RequestKind::Activate,
            common,
            false,
            |deadline| self.exec_activate(common, deadline, params),
        )
        .await
    }

    /// Grow or shrink the active topology towards the target in `params`.
    pub async fn update(&self, common: &CommonParams, params: &UpdateParams) -> Outcome {
        self.serialized(
            RequestKind::Update,
            common,
            false,
            |deadline| self.exec_update(common, deadline, params),
        )
        .await
    }

    /// Resolve, parse and validate a topology description.
    async fn load_topology(
        &self,
        deadline: Deadline,
        params: &TopologyParams,
        allow_empty_collections: bool,
    ) -> Result<Topology, EngineError> {
        let source = TopologySource::from_params(params).map_err(invalid_topology)?;
        let load = async { source.load().await.map_err(invalid_topology) };
        let topology = self.bounded(deadline, "topology loading", load).await?;
        topology
            .validate(allow_empty_collections)
            .map_err(invalid_topology)?;
        debug!(
            topology = %topology.name,
            devices = topology.device_count(),
            "topology loaded"
        );
        Ok(topology)
    }

    pub(super) async fn exec_activate(
        &self,
        common: &CommonParams,
        deadline: Deadline,
        params: &ActivateParams,
    ) -> StepResult {
        let mut session = self.require_session(&common.partition_id)?;
        let topology = self.load_topology(deadline, params, false).await?;

        let devices = self
            .bounded(
                deadline,
                "topology activation",
                classify(
                    ErrorCode::TopologyActivationFailed,
                    self.runtime.activate(&session.session_id, &topology),
                ),
            )
            .await?;

        let state = aggregate(&devices);
        let failed = devices
            .iter()
            .filter(|d| d.state == DeviceLifecycle::Error)
            .count();
        let name = topology.name.clone();
        session.topology = Some(topology);
        session.last_state = state;
        self.sessions.put(session);

        if failed > 0 && failed == devices.len() {
            return Err(EngineError::new(
                ErrorCode::TopologyActivationFailed,
                format!("none of the {failed} devices of topology '{name}' started"),
            ));
        }

        let message = if failed == 0 {
            format!("Topology '{name}' activated with {} devices", devices.len())
        } else {
            warn!(failed, total = devices.len(), "topology partially activated");
            format!(
                "Topology '{name}' activated: {failed} of {} devices failed",
                devices.len()
            )
        };
        Ok(Completed::new(message, state).with_devices(devices))
    }

    async fn exec_update(
        &self,
        common: &CommonParams,
        deadline: Deadline,
        params: &UpdateParams,
    ) -> StepResult {
        let mut session = self.require_session(&common.partition_id)?;
        let current = session.topology.clone().ok_or_else(|| {
            EngineError::new(
                ErrorCode::NoActiveTopology,
                format!("partition '{}' has no activated topology", common.partition_id),
            )
        })?;

        let target = self.load_topology(deadline, params, true).await?;
        let diff = compute_diff(&current, &target).map_err(invalid_topology)?;
        let session_id = session.session_id.clone();

        let before = self
            .bounded(
                deadline,
                "state query",
                classify(
                    ErrorCode::RuntimeFailure,
                    self.runtime.get_state(&session_id, &DeviceSelector::All),
                ),
            )
            .await?;
        if diff.is_empty() {
            let state = aggregate(&before);
            session.last_state = state;
            self.sessions.put(session);
            return Ok(Completed::new("Topology unchanged", state).with_devices(before));
        }
        let prior = aggregate(&before);

        let added = self
            .bounded(
                deadline,
                "topology update",
                classify(
                    ErrorCode::RuntimeFailure,
                    self.runtime.update(&session_id, &diff),
                ),
            )
            .await?;
        let removed = diff.removed_paths().count();
        session.topology = Some(diff.result.clone());
        self.sessions.put(session.clone());

        // New devices start idle; bring them to where the survivors are.
        let catch_up: &[LifecycleCommand] = match prior.uniform() {
            Some(DeviceLifecycle::Ready) => &[LifecycleCommand::Configure],
            Some(DeviceLifecycle::Running) => {
                &[LifecycleCommand::Configure, LifecycleCommand::Start]
            }
            _ => &[],
        };
        if !added.is_empty() && !catch_up.is_empty() {
            let selector = DeviceSelector::paths(added.iter().map(|d| d.path.clone()));
            for command in catch_up {
                let (_, failures) = self.drive(deadline, &session_id, &selector, *command).await?;
                for failure in &failures {
                    warn!(
                        device = %failure.path,
                        command = command.name(),
                        reason = %failure.reason,
                        "added device did not follow"
                    );
                }
            }
        }

        let devices = self
            .bounded(
                deadline,
                "state query",
                classify(
                    ErrorCode::RuntimeFailure,
                    self.runtime.get_state(&session_id, &DeviceSelector::All),
                ),
            )
            .await?;
        let state = aggregate(&devices);
        session.last_state = state;
        self.sessions.put(session);

        Ok(Completed::new(
            format!(
                "Topology updated: +{} / -{} devices ({} total)",
                added.len(),
                removed,
                devices.len()
            ),
            state,
        )
        .with_devices(devices))
    }
}

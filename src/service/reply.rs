// src/service/reply.rs

//! Typed reply messages.
//!
//! Field names follow the remote-procedure reply contract (`partitionid`,
//! `sessionid`, `exectime`, ...). [`Reply`] displays as pretty JSON.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::{Engine, Outcome, StatusOutcome};
use crate::errors::EngineError;
use crate::service::ControlService;
use crate::types::{
    ActivateParams, CommonParams, DeviceParams, InitializeParams, SetPropertiesParams,
    StatusParams, SubmitParams, UpdateParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplyStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    pub code: i32,
    pub msg: String,
}

impl From<&EngineError> for ReplyError {
    fn from(err: &EngineError) -> Self {
        Self {
            code: err.code.code(),
            msg: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralReply {
    pub status: ReplyStatus,
    /// Only filled on success.
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
    pub partitionid: String,
    pub runnr: u64,
    pub sessionid: String,
    /// Milliseconds.
    pub exectime: u64,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReply {
    pub path: String,
    pub id: u64,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReply {
    pub reply: GeneralReply,
    pub devices: Vec<DeviceReply>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionReply {
    pub partitionid: String,
    pub sessionid: String,
    pub status: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: ReplyStatus,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
    pub exectime: u64,
    pub partitions: Vec<PartitionReply>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    General(GeneralReply),
    State(StateReply),
    Status(StatusReply),
}

impl Reply {
    /// The general part of a partition-scoped reply.
    pub fn general(&self) -> Option<&GeneralReply> {
        match self {
            Reply::General(reply) => Some(reply),
            Reply::State(state) => Some(&state.reply),
            Reply::Status(_) => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<&Outcome> for GeneralReply {
    fn from(outcome: &Outcome) -> Self {
        let (status, msg) = match outcome.error {
            None => (ReplyStatus::Success, outcome.message.clone()),
            Some(_) => (ReplyStatus::Error, String::new()),
        };
        Self {
            status,
            msg,
            error: outcome.error.as_ref().map(ReplyError::from),
            partitionid: outcome.partition_id.clone(),
            runnr: outcome.run_nr,
            sessionid: outcome.session_id.clone(),
            exectime: outcome.exec_time.as_millis() as u64,
            state: outcome.aggregated_state.to_string(),
        }
    }
}

impl From<&Outcome> for StateReply {
    fn from(outcome: &Outcome) -> Self {
        let devices = outcome
            .details
            .iter()
            .flatten()
            .map(|d| DeviceReply {
                path: d.path.clone(),
                id: d.task_id,
                state: d.state.to_string(),
            })
            .collect();
        Self {
            reply: GeneralReply::from(outcome),
            devices,
        }
    }
}

impl From<&StatusOutcome> for StatusReply {
    fn from(outcome: &StatusOutcome) -> Self {
        let (status, msg) = match outcome.error {
            None => (ReplyStatus::Success, outcome.message.clone()),
            Some(_) => (ReplyStatus::Error, String::new()),
        };
        Self {
            status,
            msg,
            error: outcome.error.as_ref().map(ReplyError::from),
            exectime: outcome.exec_time.as_millis() as u64,
            partitions: outcome
                .partitions
                .iter()
                .map(|p| PartitionReply {
                    partitionid: p.partition_id.clone(),
                    sessionid: p.session_id.clone(),
                    status: p.session_status.to_string(),
                    state: p.aggregated_state.to_string(),
                })
                .collect(),
        }
    }
}

fn general(outcome: Outcome) -> Reply {
    Reply::General(GeneralReply::from(&outcome))
}

fn state(outcome: Outcome) -> Reply {
    Reply::State(StateReply::from(&outcome))
}

/// Adapter producing typed [`Reply`] messages.
#[derive(Debug, Clone)]
pub struct ReplyControlService {
    engine: Arc<Engine>,
}

impl ReplyControlService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}

impl ControlService for ReplyControlService {
    type Reply = Reply;

    async fn initialize(&self, common: &CommonParams, params: &InitializeParams) -> Reply {
        general(self.engine.initialize(common, params).await)
    }

    async fn submit(&self, common: &CommonParams, params: &SubmitParams) -> Reply {
        general(self.engine.submit(common, params).await)
    }

    async fn activate(&self, common: &CommonParams, params: &ActivateParams) -> Reply {
        general(self.engine.activate(common, params).await)
    }

    async fn run(
        &self,
        common: &CommonParams,
        initialize: &InitializeParams,
        submit: &SubmitParams,
        activate: &ActivateParams,
    ) -> Reply {
        general(self.engine.run(common, initialize, submit, activate).await)
    }

    async fn upscale(&self, common: &CommonParams, params: &UpdateParams) -> Reply {
        general(self.engine.update(common, params).await)
    }

    async fn downscale(&self, common: &CommonParams, params: &UpdateParams) -> Reply {
        general(self.engine.update(common, params).await)
    }

    async fn get_state(&self, common: &CommonParams, params: &DeviceParams) -> Reply {
        state(self.engine.get_state(common, params).await)
    }

    async fn set_properties(&self, common: &CommonParams, params: &SetPropertiesParams) -> Reply {
        general(self.engine.set_properties(common, params).await)
    }

    async fn configure(&self, common: &CommonParams, params: &DeviceParams) -> Reply {
        state(self.engine.configure(common, params).await)
    }

    async fn start(&self, common: &CommonParams, params: &DeviceParams) -> Reply {
        state(self.engine.start(common, params).await)
    }

    async fn stop(&self, common: &CommonParams, params: &DeviceParams) -> Reply {
        state(self.engine.stop(common, params).await)
    }

    async fn reset(&self, common: &CommonParams, params: &DeviceParams) -> Reply {
        state(self.engine.reset(common, params).await)
    }

    async fn terminate(&self, common: &CommonParams, params: &DeviceParams) -> Reply {
        state(self.engine.terminate(common, params).await)
    }

    async fn shutdown(&self, common: &CommonParams) -> Reply {
        general(self.engine.shutdown(common).await)
    }

    async fn status(&self, params: &StatusParams) -> Reply {
        Reply::Status(StatusReply::from(&self.engine.status(params).await))
    }
}

// src/engine/outcome.rs

//! Structured results returned by every engine operation.

use std::fmt;
use std::time::Duration;

use crate::errors::{EngineError, ErrorCode};
use crate::state::{AggregatedState, DeviceState};
use crate::types::{PartitionId, RunNr, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Error,
}

impl StatusCode {
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "SUCCESS",
            StatusCode::Error => "ERROR",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one partition-scoped request.
///
/// `status` is `Error` exactly when `error` is set. A partially failed
/// fan-out is still `Ok`; it shows up as a `Mixed` aggregated state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusCode,
    pub message: String,
    pub error: Option<EngineError>,
    pub partition_id: PartitionId,
    pub session_id: SessionId,
    pub run_nr: RunNr,
    /// On success, the state observed by the request. On failure, the last
    /// state the partition recorded; the runtime is not queried again, so
    /// after a timeout it may lag behind the devices.
    pub aggregated_state: AggregatedState,
    /// Per-device states, only when the request asked for detail.
    pub details: Option<Vec<DeviceState>>,
    /// Wall-clock time of the whole request, lock wait included.
    pub exec_time: Duration,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::Ok
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Stopped,
}

impl SessionStatus {
    pub fn name(self) -> &'static str {
        match self {
            SessionStatus::Running => "RUNNING",
            SessionStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of a `Status` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionStatus {
    pub partition_id: PartitionId,
    pub session_id: SessionId,
    pub session_status: SessionStatus,
    pub aggregated_state: AggregatedState,
}

/// Result of the lock-free `Status` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOutcome {
    pub status: StatusCode,
    pub message: String,
    pub error: Option<EngineError>,
    pub partitions: Vec<PartitionStatus>,
    pub exec_time: Duration,
}

// src/types.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Caller-supplied partition identifier. Never generated by the engine.
pub type PartitionId = String;

/// External session identifier handed out by the process runtime.
pub type SessionId = String;

/// Run number of one execution attempt within a partition (0 = unset).
pub type RunNr = u64;

/// Parameters carried on every partition-scoped request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonParams {
    pub partition_id: PartitionId,
    pub run_nr: RunNr,
    /// Upper bound for waiting on the runtime/backend. Zero means "use the
    /// engine default".
    pub timeout: Duration,
}

impl CommonParams {
    pub fn new(partition_id: impl Into<PartitionId>, run_nr: RunNr, timeout: Duration) -> Self {
        Self {
            partition_id: partition_id.into(),
            run_nr,
            timeout,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializeParams {
    /// Existing external session to attach to; empty requests a new one.
    pub session_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitParams {
    pub plugin: String,
    pub resources: String,
}

/// Where a topology description comes from. Exactly one field may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyParams {
    /// Path to a topology file.
    pub topology: String,
    /// Inline topology content.
    pub content: String,
    /// Shell command printing the topology on stdout.
    pub script: String,
}

pub type ActivateParams = TopologyParams;
pub type UpdateParams = TopologyParams;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceParams {
    /// Device path regex; empty selects every device.
    pub path: String,
    /// Include the per-device state list in the outcome.
    pub detailed: bool,
}

impl DeviceParams {
    pub fn all(detailed: bool) -> Self {
        Self {
            path: String::new(),
            detailed,
        }
    }
}

pub type Property = (String, String);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetPropertiesParams {
    pub properties: Vec<Property>,
    pub path: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusParams {
    /// Only report partitions with a live session.
    pub running: bool,
}

/// The request kinds understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    Initialize,
    Submit,
    Activate,
    Run,
    Update,
    GetState,
    SetProperties,
    Configure,
    Start,
    Stop,
    Reset,
    Terminate,
    Shutdown,
    Status,
}

impl RequestKind {
    pub const ALL: [RequestKind; 14] = [
        RequestKind::Initialize,
        RequestKind::Submit,
        RequestKind::Activate,
        RequestKind::Run,
        RequestKind::Update,
        RequestKind::GetState,
        RequestKind::SetProperties,
        RequestKind::Configure,
        RequestKind::Start,
        RequestKind::Stop,
        RequestKind::Reset,
        RequestKind::Terminate,
        RequestKind::Shutdown,
        RequestKind::Status,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RequestKind::Initialize => "Initialize",
            RequestKind::Submit => "Submit",
            RequestKind::Activate => "Activate",
            RequestKind::Run => "Run",
            RequestKind::Update => "Update",
            RequestKind::GetState => "GetState",
            RequestKind::SetProperties => "SetProperties",
            RequestKind::Configure => "Configure",
            RequestKind::Start => "Start",
            RequestKind::Stop => "Stop",
            RequestKind::Reset => "Reset",
            RequestKind::Terminate => "Terminate",
            RequestKind::Shutdown => "Shutdown",
            RequestKind::Status => "Status",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept `GetState`, `getstate`, `get_state` and `get-state`.
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        RequestKind::ALL
            .into_iter()
            .find(|kind| kind.name().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown request name: {s}"))
    }
}

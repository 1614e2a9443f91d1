// src/state/aggregate.rs

//! Reduction of per-device states into one reportable state.

use std::fmt;

use crate::state::lifecycle::DeviceLifecycle;

/// One running device instance as reported by the process runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub task_id: u64,
    pub path: String,
    pub state: DeviceLifecycle,
}

impl DeviceState {
    pub fn new(task_id: u64, path: impl Into<String>, state: DeviceLifecycle) -> Self {
        Self {
            task_id,
            path: path.into(),
            state,
        }
    }
}

/// Single-value summary of a set of device states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AggregatedState {
    /// No devices to summarise.
    #[default]
    Undefined,
    /// Devices disagree. Never collapsed into a majority or first-seen value.
    Mixed,
    /// Every device reports this state.
    Uniform(DeviceLifecycle),
}

impl AggregatedState {
    pub fn name(self) -> &'static str {
        match self {
            AggregatedState::Undefined => "UNDEFINED",
            AggregatedState::Mixed => "MIXED",
            AggregatedState::Uniform(state) => state.name(),
        }
    }

    /// The shared device state, if all devices agree.
    pub fn uniform(self) -> Option<DeviceLifecycle> {
        match self {
            AggregatedState::Uniform(state) => Some(state),
            AggregatedState::Undefined | AggregatedState::Mixed => None,
        }
    }
}

impl fmt::Display for AggregatedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate device states.
///
/// - empty input -> `Undefined`
/// - all equal -> that state
/// - anything else -> `Mixed`
///
/// The result does not depend on input order.
pub fn aggregate<'a, I>(devices: I) -> AggregatedState
where
    I: IntoIterator<Item = &'a DeviceState>,
{
    let mut states = devices.into_iter().map(|d| d.state);

    let Some(first) = states.next() else {
        return AggregatedState::Undefined;
    };

    if states.all(|s| s == first) {
        AggregatedState::Uniform(first)
    } else {
        AggregatedState::Mixed
    }
}

// src/session/store.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::plugins::SubmissionResult;
use crate::state::AggregatedState;
use crate::topology::Topology;
use crate::types::{PartitionId, RunNr, SessionId};

/// Record of one live partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub partition_id: PartitionId,
    pub session_id: SessionId,
    /// Topology deployed by the last Activate (and adjusted by updates).
    pub topology: Option<Topology>,
    /// Aggregated state as of the last state-affecting request. Only a
    /// cache: every request that needs the state asks the runtime again.
    pub last_state: AggregatedState,
    /// Resources submitted to plugins during this session.
    pub submissions: Vec<SubmissionResult>,
    pub run_nr: RunNr,
}

impl Session {
    pub fn new(partition_id: impl Into<PartitionId>, session_id: impl Into<SessionId>) -> Self {
        Self {
            partition_id: partition_id.into(),
            session_id: session_id.into(),
            topology: None,
            last_state: AggregatedState::Undefined,
            submissions: Vec::new(),
            run_nr: 0,
        }
    }
}

/// Map of partition id to live session.
///
/// The inner mutex only protects the map itself; entries are read and
/// replaced as whole clones.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<PartitionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<PartitionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, partition_id: &str) -> Option<Session> {
        self.map().get(partition_id).cloned()
    }

    pub fn put(&self, session: Session) {
        self.map().insert(session.partition_id.clone(), session);
    }

    pub fn remove(&self, partition_id: &str) -> Option<Session> {
        self.map().remove(partition_id)
    }

    pub fn contains(&self, partition_id: &str) -> bool {
        self.map().contains_key(partition_id)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Copy of every record, sorted by partition id.
    pub fn snapshot(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.map().values().cloned().collect();
        sessions.sort_by(|a, b| a.partition_id.cmp(&b.partition_id));
        sessions
    }
}

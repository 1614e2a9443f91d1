// src/plugins/triggers.rs

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::exec::run_shell;
use crate::types::RequestKind;

/// Executables run after a request of a given kind completes.
///
/// Invoked as `<cmd> --id <partition> --request <name> --status
/// <SUCCESS|ERROR>`. Trigger failures are only logged.
#[derive(Debug, Clone, Default)]
pub struct RequestTriggers {
    triggers: HashMap<RequestKind, String>,
}

impl RequestTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_trigger(&mut self, kind: RequestKind, cmd: impl Into<String>) {
        self.triggers.insert(kind, cmd.into());
    }

    pub fn get(&self, kind: RequestKind) -> Option<&str> {
        self.triggers.get(&kind).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Run the trigger registered for `kind`, if any, bounded by `timeout`.
    pub async fn fire(&self, kind: RequestKind, partition_id: &str, ok: bool, timeout: Duration) {
        let Some(cmd) = self.get(kind) else {
            return;
        };
        let status = if ok { "SUCCESS" } else { "ERROR" };
        debug!(partition = %partition_id, request = %kind, %status, "running request trigger");

        let args = ["--id", partition_id, "--request", kind.name(), "--status", status];
        match tokio::time::timeout(timeout, run_shell(cmd, &args)).await {
            Ok(Ok(output)) if output.success() => {}
            Ok(Ok(output)) => warn!(
                partition = %partition_id,
                request = %kind,
                exit_code = output.code,
                stderr = %output.stderr.trim(),
                "request trigger failed"
            ),
            Ok(Err(err)) => warn!(
                partition = %partition_id,
                request = %kind,
                error = %format!("{err:#}"),
                "request trigger could not be run"
            ),
            Err(_) => warn!(
                partition = %partition_id,
                request = %kind,
                timeout_ms = timeout.as_millis() as u64,
                "request trigger timed out"
            ),
        }
    }
}

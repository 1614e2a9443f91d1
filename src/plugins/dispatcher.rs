// src/plugins/dispatcher.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::{EngineError, ErrorCode};
use crate::plugins::{ResourcePlugin, SubmissionResult};

/// Registry of resource plugins by name.
///
/// Filled once at startup and treated as immutable afterwards, so lookups
/// need no locking.
#[derive(Clone, Default)]
pub struct PluginDispatcher {
    plugins: HashMap<String, Arc<dyn ResourcePlugin>>,
}

impl std::fmt::Debug for PluginDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDispatcher")
            .field("plugins", &self.names())
            .finish()
    }
}

impl PluginDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under `name`, replacing any previous registration.
    pub fn register_plugin(&mut self, name: impl Into<String>, backend: Arc<dyn ResourcePlugin>) {
        let name = name.into();
        if self.plugins.insert(name.clone(), backend).is_some() {
            warn!(plugin = %name, "resource plugin registered twice; keeping the last one");
        } else {
            info!(plugin = %name, "resource plugin registered");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Submit `resources` through plugin `name`. No retries.
    pub async fn submit(
        &self,
        name: &str,
        partition_id: &str,
        resources: &str,
    ) -> Result<SubmissionResult, EngineError> {
        let plugin = self.plugins.get(name).ok_or_else(|| {
            EngineError::new(
                ErrorCode::PluginNotFound,
                format!("plugin '{name}' is not registered"),
            )
        })?;

        plugin
            .submit(partition_id, resources)
            .await
            .map_err(|e| EngineError::new(ErrorCode::BackendSubmissionFailed, format!("{e:#}")))
    }
}

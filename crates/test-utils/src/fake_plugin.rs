use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use topoctl::plugins::{ResourcePlugin, SubmissionResult, SubmitFuture};

/// A resource plugin that:
/// - records every `(partition, resources)` it was called with
/// - either accepts with a fixed description or fails with a fixed message.
#[derive(Clone, Default)]
pub struct FakePlugin {
    name: String,
    failure: Option<String>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakePlugin {
    pub fn accepting(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ResourcePlugin for FakePlugin {
    fn submit<'a>(&'a self, partition_id: &'a str, resources: &'a str) -> SubmitFuture<'a> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((partition_id.to_string(), resources.to_string()));

            match &self.failure {
                Some(message) => Err(anyhow!("{message}")),
                None => Ok(SubmissionResult {
                    plugin: self.name.clone(),
                    resources: resources.to_string(),
                    description: format!("allocated for {partition_id}"),
                }),
            }
        })
    }
}

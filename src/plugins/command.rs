// src/plugins/command.rs

use anyhow::bail;
use tracing::debug;

use crate::exec::run_shell;
use crate::plugins::{ResourcePlugin, SubmissionResult, SubmitFuture};

/// Resource plugin backed by an external executable.
///
/// The executable is invoked as `<cmd> --res <resources> --id <partition>`.
/// A zero exit code means the submission was accepted and stdout describes
/// the allocated resources; anything else is a failed submission and stderr
/// becomes the error detail.
#[derive(Debug, Clone)]
pub struct CommandPlugin {
    name: String,
    cmd: String,
}

impl CommandPlugin {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl ResourcePlugin for CommandPlugin {
    fn submit<'a>(&'a self, partition_id: &'a str, resources: &'a str) -> SubmitFuture<'a> {
        Box::pin(async move {
            debug!(plugin = %self.name, partition = %partition_id, "running resource plugin");

            let output = run_shell(&self.cmd, &["--res", resources, "--id", partition_id]).await?;
            if !output.success() {
                let stderr = output.stderr.trim();
                if stderr.is_empty() {
                    bail!("plugin '{}' exited with code {}", self.name, output.code);
                }
                bail!(
                    "plugin '{}' exited with code {}: {}",
                    self.name,
                    output.code,
                    stderr
                );
            }

            Ok(SubmissionResult {
                plugin: self.name.clone(),
                resources: resources.to_string(),
                description: output.stdout.trim().to_string(),
            })
        })
    }
}

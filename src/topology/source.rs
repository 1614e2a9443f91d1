// src/topology/source.rs

use std::path::PathBuf;

use tracing::debug;

use crate::exec::shell::run_shell;
use crate::topology::model::Topology;
use crate::types::TopologyParams;

/// Resolved origin of a topology description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologySource {
    Path(PathBuf),
    Content(String),
    Script(String),
}

impl TopologySource {
    /// Pick the single populated field of `params`.
    pub fn from_params(params: &TopologyParams) -> Result<Self, String> {
        let candidates = [
            (!params.topology.trim().is_empty())
                .then(|| TopologySource::Path(PathBuf::from(params.topology.trim()))),
            (!params.content.trim().is_empty())
                .then(|| TopologySource::Content(params.content.clone())),
            (!params.script.trim().is_empty())
                .then(|| TopologySource::Script(params.script.clone())),
        ];

        let mut set = candidates.into_iter().flatten();
        match (set.next(), set.next()) {
            (Some(source), None) => Ok(source),
            (None, _) => Err(
                "no topology given: set exactly one of topology, content or script".to_string(),
            ),
            (Some(_), Some(_)) => Err(
                "ambiguous topology: set exactly one of topology, content or script".to_string(),
            ),
        }
    }

    /// Read and parse the topology. Scripts run through the shell.
    pub async fn load(&self) -> Result<Topology, String> {
        let content = match self {
            TopologySource::Path(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("reading topology file {:?}: {e}", path))?,
            TopologySource::Content(content) => content.clone(),
            TopologySource::Script(script) => {
                debug!(script = %script, "generating topology from script");
                let output = run_shell(script, &[])
                    .await
                    .map_err(|e| format!("{e:#}"))?;
                if !output.success() {
                    return Err(format!(
                        "topology script exited with code {}: {}",
                        output.code,
                        output.stderr.trim()
                    ));
                }
                output.stdout
            }
        };

        Topology::from_toml(&content)
    }
}

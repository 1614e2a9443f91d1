// src/config/model.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::plugins::{CommandPlugin, PluginDispatcher, RequestTriggers};
use crate::service::CommandParams;
use crate::types::{
    InitializeParams, RequestKind, SetPropertiesParams, SubmitParams, TopologyParams,
};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// timeout = "30s"
///
/// [plugin.slurm]
/// cmd = "/usr/bin/topoctl-rp-slurm"
///
/// [trigger.activate]
/// cmd = "/usr/local/bin/notify-activate"
///
/// [selector.reco]
/// path = ".*/reco_\\d+/.*"
///
/// [request.submit]
/// plugin = "slurm"
/// resources = "{ \"agents\": 2 }"
///
/// [request.activate]
/// topology = "topo.toml"
///
/// [cli]
/// partitions = ["a", "b"]
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: GlobalSection,

    /// Resource plugins from `[plugin.<name>]`.
    #[serde(default)]
    pub plugin: BTreeMap<String, CommandSection>,

    /// Request triggers from `[trigger.<request>]`.
    #[serde(default)]
    pub trigger: BTreeMap<String, CommandSection>,

    /// Named device selectors from `[selector.<name>]`.
    #[serde(default)]
    pub selector: BTreeMap<String, SelectorSection>,

    #[serde(default)]
    pub request: RequestSection,

    #[serde(default)]
    pub cli: CliSection,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalSection {
    /// Default request timeout, e.g. `"30s"`.
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

fn default_timeout() -> String {
    "30s".to_string()
}

impl Default for GlobalSection {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

/// An external executable (`[plugin.*]`, `[trigger.*]`).
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSection {
    pub cmd: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorSection {
    /// Device path regex.
    pub path: String,
}

/// `[request.*]` sections: parameters used by the command loop.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestSection {
    #[serde(default)]
    pub initialize: InitializeSection,
    #[serde(default)]
    pub submit: SubmitSection,
    #[serde(default)]
    pub activate: TopologySection,
    #[serde(default)]
    pub upscale: TopologySection,
    #[serde(default)]
    pub downscale: TopologySection,
    #[serde(default)]
    pub properties: PropertiesSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitializeSection {
    /// Session to attach to; empty creates a new one.
    #[serde(default)]
    pub session: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitSection {
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub resources: String,
}

/// A topology given by file path, inline content or generating script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopologySection {
    #[serde(default)]
    pub topology: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub script: String,
}

impl TopologySection {
    /// Number of populated source fields.
    pub fn sources_set(&self) -> usize {
        [&self.topology, &self.content, &self.script]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .count()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertiesSection {
    /// Device path regex; empty targets every device.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// `[cli]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CliSection {
    #[serde(default = "default_partitions")]
    pub partitions: Vec<String>,

    /// Batch commands; empty means interactive.
    #[serde(default)]
    pub commands: Vec<String>,

    /// Delay between batch commands, e.g. `"1s"`.
    #[serde(default = "default_delay")]
    pub delay: String,

    /// Request per-device detail on device commands.
    #[serde(default)]
    pub detailed: bool,

    #[serde(default)]
    pub run_nr: u64,
}

fn default_partitions() -> Vec<String> {
    vec!["default".to_string()]
}

fn default_delay() -> String {
    "1s".to_string()
}

impl Default for CliSection {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            commands: Vec::new(),
            delay: default_delay(),
            detailed: false,
            run_nr: 0,
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so every plugin,
/// trigger, selector and duration in it is known to be usable.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub plugin: BTreeMap<String, CommandSection>,
    pub trigger: BTreeMap<RequestKind, CommandSection>,
    pub selector: BTreeMap<String, SelectorSection>,
    pub request: RequestSection,
    pub cli: CliSection,
    timeout: Duration,
    delay: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        trigger: BTreeMap<RequestKind, CommandSection>,
        timeout: Duration,
        delay: Duration,
    ) -> Self {
        Self {
            plugin: raw.plugin,
            trigger,
            selector: raw.selector,
            request: raw.request,
            cli: raw.cli,
            timeout,
            delay,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// One [`CommandPlugin`] per `[plugin.*]` section.
    pub fn plugin_dispatcher(&self) -> PluginDispatcher {
        let mut dispatcher = PluginDispatcher::new();
        for (name, section) in &self.plugin {
            dispatcher.register_plugin(
                name.clone(),
                Arc::new(CommandPlugin::new(name.clone(), section.cmd.clone())),
            );
        }
        dispatcher
    }

    pub fn request_triggers(&self) -> RequestTriggers {
        let mut triggers = RequestTriggers::new();
        for (kind, section) in &self.trigger {
            triggers.register_trigger(*kind, section.cmd.clone());
        }
        triggers
    }

    /// Parameters for the command loop.
    pub fn command_params(&self) -> CommandParams {
        let topology = |s: &TopologySection| TopologyParams {
            topology: s.topology.clone(),
            content: s.content.clone(),
            script: s.script.clone(),
        };
        let req = &self.request;

        CommandParams {
            initialize: InitializeParams {
                session_id: req.initialize.session.clone(),
            },
            submit: SubmitParams {
                plugin: req.submit.plugin.clone(),
                resources: req.submit.resources.clone(),
            },
            activate: topology(&req.activate),
            upscale: topology(&req.upscale),
            downscale: topology(&req.downscale),
            properties: SetPropertiesParams {
                properties: req
                    .properties
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                path: req.properties.path.clone(),
            },
            selectors: self
                .selector
                .iter()
                .map(|(name, s)| (name.clone(), s.path.clone()))
                .collect(),
            detailed: self.cli.detailed,
            run_nr: self.cli.run_nr,
            timeout: self.timeout,
        }
    }
}

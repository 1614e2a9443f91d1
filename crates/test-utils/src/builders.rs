use std::sync::Arc;
use std::time::Duration;

use topoctl::config::{ConfigFile, RawConfigFile, SelectorSection, TopologySection};
use topoctl::engine::Engine;
use topoctl::plugins::ResourcePlugin;
use topoctl::runtime::DeviceRuntime;
use topoctl::types::{CommonParams, TopologyParams};

/// Builder for topology TOML documents.
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    name: String,
    collections: Vec<(String, usize, Vec<String>)>,
}

impl TopologyBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: Vec::new(),
        }
    }

    pub fn collection(mut self, name: &str, count: usize, devices: &[&str]) -> Self {
        self.collections.push((
            name.to_string(),
            count,
            devices.iter().map(|d| d.to_string()).collect(),
        ));
        self
    }

    pub fn toml(&self) -> String {
        let mut out = format!("name = \"{}\"\n", self.name);
        for (name, count, devices) in &self.collections {
            let devices: Vec<String> = devices.iter().map(|d| format!("\"{d}\"")).collect();
            out.push_str(&format!(
                "\n[[collection]]\nname = \"{name}\"\ncount = {count}\ndevices = [{}]\n",
                devices.join(", ")
            ));
        }
        out
    }

    /// Request params carrying the topology inline.
    pub fn params(&self) -> TopologyParams {
        TopologyParams {
            content: self.toml(),
            ..TopologyParams::default()
        }
    }
}

/// Engine wired to the given runtime and plugins, with a short default
/// timeout.
pub fn engine_with(
    runtime: Arc<dyn DeviceRuntime>,
    plugins: Vec<(&str, Arc<dyn ResourcePlugin>)>,
) -> Arc<Engine> {
    let mut builder = Engine::builder(runtime).default_timeout(Duration::from_secs(2));
    for (name, plugin) in plugins {
        builder = builder.plugin(name, plugin);
    }
    Arc::new(builder.build())
}

/// Common params with the engine default timeout.
pub fn common(partition_id: &str) -> CommonParams {
    CommonParams::new(partition_id, 0, Duration::ZERO)
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_selector(mut self, name: &str, path: &str) -> Self {
        self.config.selector.insert(
            name.to_string(),
            SelectorSection {
                path: path.to_string(),
            },
        );
        self
    }

    pub fn with_activate_content(mut self, content: &str) -> Self {
        self.config.request.activate = TopologySection {
            content: content.to_string(),
            ..TopologySection::default()
        };
        self
    }

    pub fn with_partitions(mut self, partitions: &[&str]) -> Self {
        self.config.cli.partitions = partitions.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn detailed(mut self) -> Self {
        self.config.cli.detailed = true;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

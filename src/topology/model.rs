// src/topology/model.rs

use std::collections::HashSet;

use serde::Deserialize;

/// Declarative description of the devices to deploy.
///
/// ```toml
/// name = "example"
///
/// [[collection]]
/// name = "reco"
/// count = 3
/// devices = ["sampler", "processor", "sink"]
///
/// [[collection]]
/// name = "qc"
/// devices = ["qc-task"]
/// ```
///
/// Instance `i` of collection `c` contributes one device per entry in
/// `devices`, with path `<name>/<c>_<i>/<device>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Topology {
    pub name: String,

    #[serde(default, rename = "collection")]
    pub collections: Vec<CollectionSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionSpec {
    pub name: String,

    /// Number of instances of this collection.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Device names contained in every instance.
    pub devices: Vec<String>,
}

fn default_count() -> usize {
    1
}

/// Upper bound on the number of devices a single topology may deploy.
pub const MAX_DEVICES: usize = 100_000;

impl Topology {
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("malformed topology: {e}"))
    }

    /// Check structural sanity.
    ///
    /// `allow_empty_collections` permits `count = 0`, which an update uses to
    /// remove a collection entirely.
    pub fn validate(&self, allow_empty_collections: bool) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("topology name must not be empty".to_string());
        }
        if self.collections.is_empty() {
            return Err(format!(
                "topology '{}' must contain at least one [[collection]]",
                self.name
            ));
        }

        let mut seen = HashSet::new();
        let mut total: usize = 0;
        for c in &self.collections {
            if c.name.trim().is_empty() || c.name.contains('/') {
                return Err(format!("invalid collection name '{}'", c.name));
            }
            if !seen.insert(c.name.as_str()) {
                return Err(format!("duplicate collection '{}'", c.name));
            }
            if c.devices.is_empty() {
                return Err(format!("collection '{}' has no devices", c.name));
            }
            if c.count == 0 && !allow_empty_collections {
                return Err(format!("collection '{}' must have count >= 1", c.name));
            }
            let mut names = HashSet::new();
            for d in &c.devices {
                if d.trim().is_empty() || d.contains('/') {
                    return Err(format!("invalid device name '{}' in '{}'", d, c.name));
                }
                if !names.insert(d.as_str()) {
                    return Err(format!("duplicate device '{}' in '{}'", d, c.name));
                }
            }
            total = c
                .count
                .checked_mul(c.devices.len())
                .and_then(|n| n.checked_add(total))
                .filter(|n| *n <= MAX_DEVICES)
                .ok_or_else(|| {
                    format!(
                        "collection '{}' (count = {}) exceeds the limit of {MAX_DEVICES} devices",
                        c.name, c.count
                    )
                })?;
        }

        Ok(())
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Total number of devices across all instances (saturating).
    pub fn device_count(&self) -> usize {
        self.collections.iter().fold(0usize, |acc, c| {
            acc.saturating_add(c.count.saturating_mul(c.devices.len()))
        })
    }

    /// Device paths of one collection instance.
    pub fn instance_paths(&self, collection: &CollectionSpec, index: usize) -> Vec<String> {
        collection
            .devices
            .iter()
            .map(|device| format!("{}/{}_{}/{}", self.name, collection.name, index, device))
            .collect()
    }

    /// Every device path in deployment order.
    pub fn device_paths(&self) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.device_count().min(MAX_DEVICES));
        for c in &self.collections {
            for i in 0..c.count {
                paths.extend(self.instance_paths(c, i));
            }
        }
        paths
    }
}

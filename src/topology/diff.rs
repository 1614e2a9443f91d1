// src/topology/diff.rs

//! Instance-level delta between the active topology and an update target.
//!
//! Instances of a collection are always numbered `0..count`: upscale appends
//! the next indices and downscale removes the highest ones, so survivors keep
//! their paths and their state.

use crate::topology::model::Topology;

/// One collection instance and the device paths it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub collection: String,
    pub index: usize,
    pub device_paths: Vec<String>,
}

/// Result of diffing the active topology against an update target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyDiff {
    pub added: Vec<InstanceRef>,
    pub removed: Vec<InstanceRef>,
    /// The topology that is active once the diff has been applied.
    pub result: Topology,
}

impl TopologyDiff {
    pub fn added_paths(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .flat_map(|i| i.device_paths.iter().map(String::as_str))
    }

    pub fn removed_paths(&self) -> impl Iterator<Item = &str> {
        self.removed
            .iter()
            .flat_map(|i| i.device_paths.iter().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Net change in device count (positive = upscale).
    pub fn net_devices(&self) -> i64 {
        self.added_paths().count() as i64 - self.removed_paths().count() as i64
    }
}

/// Diff `current` against `target`.
///
/// The active topology keeps its name (device paths are derived from it).
/// Collections missing from `target` are removed; a collection whose device
/// list differs between the two is rejected.
pub fn compute_diff(current: &Topology, target: &Topology) -> Result<TopologyDiff, String> {
    let mut result = target.clone();
    result.name = current.name.clone();
    result.collections.retain(|c| c.count > 0);

    let mut added = Vec::new();
    let mut removed = Vec::new();

    for wanted in &target.collections {
        match current.collection(&wanted.name) {
            Some(active) => {
                if active.devices != wanted.devices {
                    return Err(format!(
                        "device list of collection '{}' changed; re-activate to change composition",
                        wanted.name
                    ));
                }
                for index in wanted.count..active.count {
                    removed.push(InstanceRef {
                        collection: active.name.clone(),
                        index,
                        device_paths: current.instance_paths(active, index),
                    });
                }
                for index in active.count..wanted.count {
                    added.push(InstanceRef {
                        collection: wanted.name.clone(),
                        index,
                        device_paths: current.instance_paths(wanted, index),
                    });
                }
            }
            None => {
                for index in 0..wanted.count {
                    added.push(InstanceRef {
                        collection: wanted.name.clone(),
                        index,
                        device_paths: current.instance_paths(wanted, index),
                    });
                }
            }
        }
    }

    for active in &current.collections {
        if target.collection(&active.name).is_none() {
            for index in 0..active.count {
                removed.push(InstanceRef {
                    collection: active.name.clone(),
                    index,
                    device_paths: current.instance_paths(active, index),
                });
            }
        }
    }

    if result.collections.is_empty() {
        return Err("update would remove every device; use Shutdown instead".to_string());
    }

    Ok(TopologyDiff {
        added,
        removed,
        result,
    })
}

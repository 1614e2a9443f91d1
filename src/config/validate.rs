// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;

use crate::config::duration::parse_duration;
use crate::config::model::{CommandSection, ConfigFile, RawConfigFile, TopologySection};
use crate::errors::{Result, TopoctlError};
use crate::types::RequestKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TopoctlError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let (timeout, delay) = validate_durations(&raw)?;
        let triggers = validate_triggers(&raw)?;
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, triggers, timeout, delay))
    }
}

fn config_error(msg: impl Into<String>) -> TopoctlError {
    TopoctlError::ConfigError(msg.into())
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_plugins(cfg)?;
    validate_selectors(cfg)?;
    validate_requests(cfg)?;
    validate_partitions(cfg)?;
    Ok(())
}

fn validate_durations(cfg: &RawConfigFile) -> Result<(Duration, Duration)> {
    let timeout = parse_duration(&cfg.config.timeout)
        .map_err(|e| config_error(format!("[config].timeout: {e}")))?;
    if timeout.is_zero() {
        return Err(config_error("[config].timeout must be greater than zero"));
    }
    let delay =
        parse_duration(&cfg.cli.delay).map_err(|e| config_error(format!("[cli].delay: {e}")))?;
    Ok((timeout, delay))
}

fn validate_plugins(cfg: &RawConfigFile) -> Result<()> {
    for (name, plugin) in &cfg.plugin {
        if plugin.cmd.trim().is_empty() {
            return Err(config_error(format!("[plugin.{name}].cmd must not be empty")));
        }
    }
    Ok(())
}

fn validate_triggers(cfg: &RawConfigFile) -> Result<BTreeMap<RequestKind, CommandSection>> {
    let mut triggers = BTreeMap::new();
    for (name, trigger) in &cfg.trigger {
        let kind: RequestKind = name
            .parse()
            .map_err(|e: String| config_error(format!("[trigger.{name}]: {e}")))?;
        if kind == RequestKind::Status {
            return Err(config_error(format!(
                "[trigger.{name}]: status requests do not run triggers"
            )));
        }
        if trigger.cmd.trim().is_empty() {
            return Err(config_error(format!("[trigger.{name}].cmd must not be empty")));
        }
        if triggers.insert(kind, trigger.clone()).is_some() {
            return Err(config_error(format!(
                "[trigger.{name}]: more than one trigger for request {kind}"
            )));
        }
    }
    Ok(triggers)
}

fn validate_selectors(cfg: &RawConfigFile) -> Result<()> {
    for (name, selector) in &cfg.selector {
        if name == "all" {
            return Err(config_error(
                "[selector.all]: 'all' is reserved for selecting every device",
            ));
        }
        check_regex(&format!("[selector.{name}].path"), &selector.path)?;
    }
    Ok(())
}

fn check_regex(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Ok(());
    }
    Regex::new(path)
        .map(|_| ())
        .map_err(|e| config_error(format!("{field}: invalid regex: {e}")))
}

fn check_topology(section: &str, topology: &TopologySection) -> Result<()> {
    if topology.sources_set() > 1 {
        return Err(config_error(format!(
            "[request.{section}]: set at most one of topology, content or script"
        )));
    }
    Ok(())
}

fn validate_requests(cfg: &RawConfigFile) -> Result<()> {
    let req = &cfg.request;

    let plugin = req.submit.plugin.trim();
    if !plugin.is_empty() && !cfg.plugin.contains_key(plugin) {
        return Err(config_error(format!(
            "[request.submit].plugin '{plugin}' has no [plugin.{plugin}] section"
        )));
    }

    check_topology("activate", &req.activate)?;
    check_topology("upscale", &req.upscale)?;
    check_topology("downscale", &req.downscale)?;
    check_regex("[request.properties].path", &req.properties.path)?;
    Ok(())
}

fn validate_partitions(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cli.partitions.is_empty() {
        return Err(config_error("[cli].partitions must list at least one partition id"));
    }
    if cfg.cli.partitions.iter().any(|p| p.trim().is_empty()) {
        return Err(config_error("[cli].partitions must not contain empty ids"));
    }
    Ok(())
}

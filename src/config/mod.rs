// src/config/mod.rs

//! Configuration loading and validation for topoctl.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate plugins, triggers, selectors and request sections
//!   (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    CliSection, CommandSection, ConfigFile, GlobalSection, InitializeSection, PropertiesSection,
    RawConfigFile, RequestSection, SelectorSection, SubmitSection, TopologySection,
};

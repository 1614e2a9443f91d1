// src/exec/mod.rs

//! Process execution layer.
//!
//! Resource plugins, request triggers and topology scripts are all external
//! executables. This module runs them through the platform shell using
//! `tokio::process::Command` and hands back their captured output.
//!
//! - [`shell`] spawns one command, waits for it and collects stdout/stderr.

pub mod shell;

pub use shell::{run_shell, ShellOutput};

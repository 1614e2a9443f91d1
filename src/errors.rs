// src/errors.rs

//! Crate-wide error aliases and the engine error taxonomy.
//!
//! Two layers live here:
//! - [`TopoctlError`] covers setup failures (config, IO, TOML) and is what
//!   `main.rs` reports before exiting.
//! - [`EngineError`] is the classified failure of a single lifecycle request.
//!   It is never returned as `Err` from the engine's public API; it is folded
//!   into the request's [`Outcome`](crate::engine::Outcome) instead.

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopoctlError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TopoctlError>;

/// Stable classification of a failed request.
///
/// The numeric values are part of the reply contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PartitionNotFound,
    SessionCreationFailed,
    PluginNotFound,
    BackendSubmissionFailed,
    TopologyActivationFailed,
    NoActiveTopology,
    Timeout,
    InvalidDeviceSelector,
    InvalidTopology,
    RuntimeFailure,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            ErrorCode::PartitionNotFound => 100,
            ErrorCode::SessionCreationFailed => 101,
            ErrorCode::PluginNotFound => 102,
            ErrorCode::BackendSubmissionFailed => 103,
            ErrorCode::TopologyActivationFailed => 104,
            ErrorCode::NoActiveTopology => 105,
            ErrorCode::Timeout => 106,
            ErrorCode::InvalidDeviceSelector => 107,
            ErrorCode::InvalidTopology => 108,
            ErrorCode::RuntimeFailure => 109,
        }
    }

    /// Fixed human-readable description of the code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::PartitionNotFound => "No live session for partition",
            ErrorCode::SessionCreationFailed => "Failed to create or attach session",
            ErrorCode::PluginNotFound => "Resource plugin not found",
            ErrorCode::BackendSubmissionFailed => "Resource submission failed",
            ErrorCode::TopologyActivationFailed => "Topology activation failed",
            ErrorCode::NoActiveTopology => "No active topology",
            ErrorCode::Timeout => "Request timed out",
            ErrorCode::InvalidDeviceSelector => "Invalid device selector",
            ErrorCode::InvalidTopology => "Invalid topology",
            ErrorCode::RuntimeFailure => "Process runtime request failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// A classified request failure: code plus the verbatim backend/runtime text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} ({})", .code.message(), .details)]
pub struct EngineError {
    pub code: ErrorCode,
    pub details: String,
}

impl EngineError {
    pub fn new(code: ErrorCode, details: impl Into<String>) -> Self {
        Self {
            code,
            details: details.into(),
        }
    }
}

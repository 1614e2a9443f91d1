// src/plugins/mod.rs

//! Resource plugins and request triggers.
//!
//! A resource plugin turns a resource specification into a deployment
//! request against some external provisioning system. The engine only sees
//! the [`ResourcePlugin`] trait; which system sits behind it is a startup
//! configuration choice.
//!
//! - [`CommandPlugin`] runs an external executable (the production backend).
//! - [`PluginDispatcher`] maps plugin names to backends.
//! - [`RequestTriggers`] are per-request executables run after a request
//!   completes.

use std::future::Future;
use std::pin::Pin;

pub mod command;
pub mod dispatcher;
pub mod triggers;

pub use command::CommandPlugin;
pub use dispatcher::PluginDispatcher;
pub use triggers::RequestTriggers;

/// Boxed future returned by [`ResourcePlugin::submit`].
pub type SubmitFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<SubmissionResult>> + Send + 'a>>;

/// What a backend reported for one accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub plugin: String,
    /// The resource specification as submitted.
    pub resources: String,
    /// Backend-provided description of the allocated resources.
    pub description: String,
}

/// Trait abstracting a resource provisioning backend.
pub trait ResourcePlugin: Send + Sync {
    /// Submit `resources` on behalf of `partition_id`.
    ///
    /// `Err` carries the backend's own failure text; the dispatcher wraps it
    /// without rewording.
    fn submit<'a>(&'a self, partition_id: &'a str, resources: &'a str) -> SubmitFuture<'a>;
}

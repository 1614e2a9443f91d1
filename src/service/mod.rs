// src/service/mod.rs

//! Transport adapters over the shared [`Engine`](crate::engine::Engine).
//!
//! [`ControlService`] is the operation set every front end offers. Each
//! adapter implements it by forwarding to the engine and rendering the
//! outcome in its own reply format:
//! - [`TextControlService`]: the structured text shown by the CLI
//! - [`ReplyControlService`]: typed reply messages, printed as JSON
//!
//! [`CommandLoop`] drives any `ControlService` from interactive or batch
//! commands.

use std::fmt;
use std::future::Future;

use crate::types::{
    ActivateParams, CommonParams, DeviceParams, InitializeParams, SetPropertiesParams,
    StatusParams, SubmitParams, UpdateParams,
};

pub mod command_loop;
pub mod reply;
pub mod text;

pub use command_loop::{Command, CommandLoop, CommandParams, Flow};
pub use reply::{Reply, ReplyControlService};
pub use text::TextControlService;

/// The request set shared by every transport.
///
/// Adapters must not reinterpret engine errors: error code, error message
/// and aggregated state are rendered verbatim.
pub trait ControlService: Send + Sync {
    type Reply: fmt::Display + Send;

    fn initialize(
        &self,
        common: &CommonParams,
        params: &InitializeParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn submit(
        &self,
        common: &CommonParams,
        params: &SubmitParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn activate(
        &self,
        common: &CommonParams,
        params: &ActivateParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn run(
        &self,
        common: &CommonParams,
        initialize: &InitializeParams,
        submit: &SubmitParams,
        activate: &ActivateParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn upscale(
        &self,
        common: &CommonParams,
        params: &UpdateParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn downscale(
        &self,
        common: &CommonParams,
        params: &UpdateParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn get_state(
        &self,
        common: &CommonParams,
        params: &DeviceParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn set_properties(
        &self,
        common: &CommonParams,
        params: &SetPropertiesParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn configure(
        &self,
        common: &CommonParams,
        params: &DeviceParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn start(
        &self,
        common: &CommonParams,
        params: &DeviceParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn stop(
        &self,
        common: &CommonParams,
        params: &DeviceParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn reset(
        &self,
        common: &CommonParams,
        params: &DeviceParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn terminate(
        &self,
        common: &CommonParams,
        params: &DeviceParams,
    ) -> impl Future<Output = Self::Reply> + Send;

    fn shutdown(&self, common: &CommonParams) -> impl Future<Output = Self::Reply> + Send;

    fn status(&self, params: &StatusParams) -> impl Future<Output = Self::Reply> + Send;
}

// src/service/text.rs

use std::fmt::Write as _;
use std::sync::Arc;

use crate::engine::{Engine, Outcome, StatusOutcome};
use crate::service::ControlService;
use crate::types::{
    ActivateParams, CommonParams, DeviceParams, InitializeParams, SetPropertiesParams,
    StatusParams, SubmitParams, UpdateParams,
};

/// Adapter rendering outcomes as indented `key: value` text.
#[derive(Debug, Clone)]
pub struct TextControlService {
    engine: Arc<Engine>,
}

impl TextControlService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}

fn status_lines(out: &mut String, message: &str, error: Option<&crate::errors::EngineError>) {
    match error {
        None => {
            let _ = writeln!(out, "  Status code: SUCCESS");
            let _ = writeln!(out, "  Message: {message}");
        }
        Some(err) => {
            let _ = writeln!(out, "  Status code: ERROR");
            let _ = writeln!(out, "  Error code: {}", err.code.code());
            let _ = writeln!(out, "  Error message: {err}");
        }
    }
}

/// Render a partition-scoped outcome.
pub fn render_outcome(outcome: &Outcome) -> String {
    let mut out = String::new();
    status_lines(&mut out, &outcome.message, outcome.error.as_ref());

    let _ = writeln!(out, "  Aggregated state: {}", outcome.aggregated_state);
    let _ = writeln!(out, "  Partition ID: {}", outcome.partition_id);
    let _ = writeln!(out, "  Run Nr: {}", outcome.run_nr);
    let _ = writeln!(out, "  Session ID: {}", outcome.session_id);

    if let Some(devices) = &outcome.details {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Devices:");
        for device in devices {
            let _ = writeln!(
                out,
                "    {{ id: {}; path: {}; state: {} }}",
                device.task_id, device.path, device.state
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "  Execution time: {} msec", outcome.exec_time.as_millis());
    out
}

/// Render a `Status` report.
pub fn render_status(outcome: &StatusOutcome) -> String {
    let mut out = String::new();
    status_lines(&mut out, &outcome.message, outcome.error.as_ref());

    if !outcome.partitions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Partitions:");
        for p in &outcome.partitions {
            let _ = writeln!(
                out,
                "    {{ id: {}; session: {}; status: {}; state: {} }}",
                p.partition_id, p.session_id, p.session_status, p.aggregated_state
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "  Execution time: {} msec", outcome.exec_time.as_millis());
    out
}

impl ControlService for TextControlService {
    type Reply = String;

    async fn initialize(&self, common: &CommonParams, params: &InitializeParams) -> String {
        render_outcome(&self.engine.initialize(common, params).await)
    }

    async fn submit(&self, common: &CommonParams, params: &SubmitParams) -> String {
        render_outcome(&self.engine.submit(common, params).await)
    }

    async fn activate(&self, common: &CommonParams, params: &ActivateParams) -> String {
        render_outcome(&self.engine.activate(common, params).await)
    }

    async fn run(
        &self,
        common: &CommonParams,
        initialize: &InitializeParams,
        submit: &SubmitParams,
        activate: &ActivateParams,
    ) -> String {
        render_outcome(&self.engine.run(common, initialize, submit, activate).await)
    }

    async fn upscale(&self, common: &CommonParams, params: &UpdateParams) -> String {
        render_outcome(&self.engine.update(common, params).await)
    }

    async fn downscale(&self, common: &CommonParams, params: &UpdateParams) -> String {
        render_outcome(&self.engine.update(common, params).await)
    }

    async fn get_state(&self, common: &CommonParams, params: &DeviceParams) -> String {
        render_outcome(&self.engine.get_state(common, params).await)
    }

    async fn set_properties(&self, common: &CommonParams, params: &SetPropertiesParams) -> String {
        render_outcome(&self.engine.set_properties(common, params).await)
    }

    async fn configure(&self, common: &CommonParams, params: &DeviceParams) -> String {
        render_outcome(&self.engine.configure(common, params).await)
    }

    async fn start(&self, common: &CommonParams, params: &DeviceParams) -> String {
        render_outcome(&self.engine.start(common, params).await)
    }

    async fn stop(&self, common: &CommonParams, params: &DeviceParams) -> String {
        render_outcome(&self.engine.stop(common, params).await)
    }

    async fn reset(&self, common: &CommonParams, params: &DeviceParams) -> String {
        render_outcome(&self.engine.reset(common, params).await)
    }

    async fn terminate(&self, common: &CommonParams, params: &DeviceParams) -> String {
        render_outcome(&self.engine.terminate(common, params).await)
    }

    async fn shutdown(&self, common: &CommonParams) -> String {
        render_outcome(&self.engine.shutdown(common).await)
    }

    async fn status(&self, params: &StatusParams) -> String {
        render_status(&self.engine.status(params).await)
    }
}

// tests/plugins.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use crate::common::{new_session, workers, TestResult};
use topoctl::engine::Engine;
use topoctl::errors::ErrorCode;
use topoctl::plugins::{CommandPlugin, PluginDispatcher, RequestTriggers, ResourcePlugin};
use topoctl::runtime::DeviceRuntime;
use topoctl::types::RequestKind;
use topoctl_test_utils::builders::common as params_for;
use topoctl_test_utils::fake_plugin::FakePlugin;
use topoctl_test_utils::fake_runtime::FakeRuntime;

#[tokio::test]
async fn dispatcher_routes_by_name() -> TestResult {
    let alpha = FakePlugin::accepting("alpha");
    let beta = FakePlugin::accepting("beta");
    let mut dispatcher = PluginDispatcher::new();
    dispatcher.register_plugin("alpha", Arc::new(alpha.clone()));
    dispatcher.register_plugin("beta", Arc::new(beta.clone()));

    let result = dispatcher.submit("beta", "P", "4 cores").await?;

    assert_eq!(result.plugin, "beta");
    assert_eq!(result.resources, "4 cores");
    assert!(alpha.calls().is_empty());
    assert_eq!(beta.calls().len(), 1);
    assert_eq!(dispatcher.names(), vec!["alpha", "beta"]);
    Ok(())
}

#[tokio::test]
async fn dispatcher_reports_unknown_plugin() -> TestResult {
    let dispatcher = PluginDispatcher::new();

    let err = dispatcher.submit("nope", "P", "").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::PluginNotFound);
    assert!(!dispatcher.contains("nope"));
    Ok(())
}

#[tokio::test]
async fn dispatcher_classifies_backend_failures() -> TestResult {
    let mut dispatcher = PluginDispatcher::new();
    dispatcher.register_plugin("slurm", Arc::new(FakePlugin::failing("slurm", "no nodes")));

    let err = dispatcher.submit("slurm", "P", "").await.unwrap_err();

    assert_eq!(err.code, ErrorCode::BackendSubmissionFailed);
    assert_eq!(err.details, "no nodes");
    Ok(())
}

#[test]
fn later_registration_wins() {
    let mut dispatcher = PluginDispatcher::new();
    dispatcher.register_plugin("p", Arc::new(FakePlugin::accepting("first")));
    dispatcher.register_plugin("p", Arc::new(FakePlugin::accepting("second")));
    assert_eq!(dispatcher.names(), vec!["p"]);
}

#[cfg(unix)]
#[tokio::test]
async fn command_plugin_passes_resources_and_partition() -> TestResult {
    let plugin = CommandPlugin::new("local", "printf '%s,'");

    let result = plugin.submit("P7", "{ n: 2 }").await?;

    assert_eq!(result.plugin, "local");
    assert_eq!(result.description, "--res,{ n: 2 },--id,P7,");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn command_plugin_failure_carries_stderr() -> TestResult {
    let plugin = CommandPlugin::new("local", "f() { echo 'quota exceeded' >&2; return 2; }; f");

    let err = plugin.submit("P7", "{}").await.unwrap_err();
    let msg = format!("{err:#}");

    assert!(msg.contains("exited with code 2"), "{msg}");
    assert!(msg.contains("quota exceeded"), "{msg}");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn trigger_receives_request_and_status() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("trigger.log");
    let mut triggers = RequestTriggers::new();
    triggers.register_trigger(
        RequestKind::Activate,
        format!("printf '%s ' >> '{}'", log.display()),
    );

    triggers
        .fire(RequestKind::Activate, "P", true, Duration::from_secs(5))
        .await;
    triggers
        .fire(RequestKind::Activate, "P", false, Duration::from_secs(5))
        .await;
    // No trigger registered for Start.
    triggers
        .fire(RequestKind::Start, "P", true, Duration::from_secs(5))
        .await;

    let written = std::fs::read_to_string(&log)?;
    assert_eq!(
        written,
        "--id P --request Activate --status SUCCESS --id P --request Activate --status ERROR "
    );
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn engine_fires_triggers_after_requests() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("trigger.log");
    let mut triggers = RequestTriggers::new();
    triggers.register_trigger(
        RequestKind::Activate,
        format!("printf '%s ' >> '{}'", log.display()),
    );
    triggers.register_trigger(RequestKind::Shutdown, "exit 1");

    let runtime = FakeRuntime::new();
    let plugin: Arc<dyn ResourcePlugin> = Arc::new(FakePlugin::accepting("fake"));
    let engine = Engine::builder(runtime as Arc<dyn DeviceRuntime>)
        .plugin("fake", plugin)
        .triggers(triggers)
        .default_timeout(Duration::from_secs(5))
        .build();

    let params = params_for("P");
    engine.initialize(&params, &new_session()).await;
    let activated = engine.activate(&params, &workers(1).params()).await;
    assert!(activated.is_ok());

    // A failing trigger does not change the request outcome.
    let shutdown = engine.shutdown(&params).await;
    assert!(shutdown.is_ok());

    let written = std::fs::read_to_string(&log)?;
    assert_eq!(written, "--id P --request Activate --status SUCCESS ");
    Ok(())
}

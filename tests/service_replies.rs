// tests/service_replies.rs

mod common;

use std::time::Duration;

use crate::common::{activated, setup, workers, TestResult};
use topoctl::engine::{Outcome, StatusCode};
use topoctl::errors::{EngineError, ErrorCode};
use topoctl::service::text::render_outcome;
use topoctl::service::{
    Command, CommandLoop, CommandParams, ControlService, Flow, Reply, ReplyControlService,
    TextControlService,
};
use topoctl::state::{AggregatedState, DeviceLifecycle, DeviceState};
use topoctl::types::DeviceParams;
use topoctl_test_utils::builders::common as params_for;

fn sample_outcome() -> Outcome {
    Outcome {
        status: StatusCode::Ok,
        message: "Start done: 2 devices RUNNING".to_string(),
        error: None,
        partition_id: "physics".to_string(),
        session_id: "s-1".to_string(),
        run_nr: 7,
        aggregated_state: AggregatedState::Uniform(DeviceLifecycle::Running),
        details: Some(vec![
            DeviceState::new(1, "topo/flp_0/worker", DeviceLifecycle::Running),
            DeviceState::new(2, "topo/flp_1/worker", DeviceLifecycle::Running),
        ]),
        exec_time: Duration::from_millis(12),
    }
}

fn loop_params() -> CommandParams {
    let mut params = CommandParams::default();
    params.submit.plugin = "fake".to_string();
    params.activate = workers(2).params();
    params.upscale = workers(3).params();
    params.downscale = workers(1).params();
    params
        .selectors
        .insert("first".to_string(), "topo/flp_0/.*".to_string());
    params
}

#[test]
fn text_rendering_lists_every_field() {
    let text = render_outcome(&sample_outcome());

    assert_eq!(
        text,
        "  Status code: SUCCESS\n\
         \x20 Message: Start done: 2 devices RUNNING\n\
         \x20 Aggregated state: RUNNING\n\
         \x20 Partition ID: physics\n\
         \x20 Run Nr: 7\n\
         \x20 Session ID: s-1\n\
         \n\
         \x20 Devices:\n\
         \x20   { id: 1; path: topo/flp_0/worker; state: RUNNING }\n\
         \x20   { id: 2; path: topo/flp_1/worker; state: RUNNING }\n\
         \n\
         \x20 Execution time: 12 msec\n"
    );
}

#[test]
fn text_rendering_of_errors_shows_code_and_details() {
    let mut outcome = sample_outcome();
    outcome.status = StatusCode::Error;
    outcome.error = Some(EngineError::new(ErrorCode::NoActiveTopology, "nothing deployed"));
    outcome.details = None;

    let text = render_outcome(&outcome);

    assert!(text.starts_with("  Status code: ERROR\n  Error code: 105\n"));
    assert!(text.contains("  Error message: No active topology (nothing deployed)\n"));
    assert!(!text.contains("Devices:"));
}

#[tokio::test]
async fn json_state_reply_carries_devices() -> TestResult {
    let (_runtime, engine) = setup();
    let params = activated(&engine, "P", &workers(2)).await;
    let service = ReplyControlService::new(engine);

    let reply = service.get_state(&params, &DeviceParams::all(true)).await;

    let Reply::State(state) = &reply else {
        panic!("expected a state reply, got {reply:?}");
    };
    assert_eq!(state.devices.len(), 2);
    assert_eq!(state.devices[0].path, "topo/flp_0/worker");
    assert_eq!(state.devices[0].state, "IDLE");
    assert_eq!(state.reply.state, "IDLE");

    let json: serde_json::Value = serde_json::from_str(&reply.to_string())?;
    assert_eq!(json["reply"]["status"], "SUCCESS");
    assert_eq!(json["reply"]["partitionid"], "P");
    assert!(json["reply"].get("error").is_none());
    assert_eq!(json["devices"][1]["id"], state.devices[1].id);
    Ok(())
}

#[tokio::test]
async fn json_error_reply_has_code_and_empty_msg() -> TestResult {
    let (_runtime, engine) = setup();
    let service = ReplyControlService::new(engine);

    let reply = service.shutdown(&params_for("P")).await;
    assert_eq!(reply.general().unwrap().msg, "No live session; nothing to shut down");

    let reply = service
        .configure(&params_for("P"), &DeviceParams::all(false))
        .await;
    let general = reply.general().unwrap();
    assert_eq!(general.msg, "");
    assert_eq!(general.error.as_ref().unwrap().code, 100);

    let json: serde_json::Value = serde_json::from_str(&reply.to_string())?;
    assert_eq!(json["reply"]["status"], "ERROR");
    assert_eq!(json["reply"]["error"]["code"], 100);
    Ok(())
}

#[tokio::test]
async fn json_status_reply_lists_partitions() -> TestResult {
    let (_runtime, engine) = setup();
    activated(&engine, "A", &workers(1)).await;
    let service = ReplyControlService::new(engine);

    let reply = service.status(&Default::default()).await;

    let Reply::Status(status) = &reply else {
        panic!("expected a status reply, got {reply:?}");
    };
    assert_eq!(status.partitions.len(), 1);
    assert_eq!(status.partitions[0].status, "RUNNING");
    assert!(reply.general().is_none());
    Ok(())
}

#[test]
fn command_lines_parse() {
    assert_eq!(Command::parse("  "), Ok(None));
    assert_eq!(Command::parse(".quit"), Ok(Some(Command::Quit)));
    assert_eq!(
        Command::parse(".config first"),
        Ok(Some(Command::Configure(Some("first".to_string()))))
    );
    assert_eq!(Command::parse(".state"), Ok(Some(Command::GetState(None))));
    assert_eq!(
        Command::parse(".fly"),
        Err("Unknown command .fly".to_string())
    );
}

#[tokio::test]
async fn command_loop_runs_a_batch_for_every_partition() -> TestResult {
    let (_runtime, engine) = setup();
    let service = TextControlService::new(engine.clone());
    let command_loop = CommandLoop::new(
        service,
        vec!["a".to_string(), "b".to_string()],
        loop_params(),
    );
    let cmds: Vec<String> = [".run", ".config", ".start first", ".upscale", ".status"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut out = Vec::new();

    command_loop
        .run_batch(&cmds, Duration::ZERO, &mut out)
        .await?;

    let text = String::from_utf8(out)?;
    assert!(text.contains("Executing command \".run\""));
    assert_eq!(text.matches("Requests for partition ID <a>").count(), 4);
    assert_eq!(text.matches("Requests for partition ID <b>").count(), 4);
    assert!(!text.contains("Status code: ERROR"), "{text}");
    assert!(text.contains("Start done: 1 devices RUNNING"));
    assert!(text.contains("{ id: a; session: session-"));
    assert!(text.contains("Topology updated: +1 / -0 devices (3 total)"));

    // Only the first instance was started, so the upscale left a mixed set.
    let a = engine.session("a").unwrap();
    assert_eq!(a.last_state, AggregatedState::Mixed);
    Ok(())
}

#[tokio::test]
async fn command_loop_stops_at_quit_and_reports_unknown_commands() -> TestResult {
    let (_runtime, engine) = setup();
    let command_loop = CommandLoop::new(
        TextControlService::new(engine.clone()),
        vec!["a".to_string()],
        loop_params(),
    );
    let mut out = Vec::new();

    let flow = command_loop.process(".bogus", &mut out).await?;
    assert_eq!(flow, Flow::Continue);
    let flow = command_loop.process(".quit", &mut out).await?;
    assert_eq!(flow, Flow::Quit);

    let cmds = vec![".init".to_string(), ".quit".to_string(), ".down".to_string()];
    command_loop
        .run_batch(&cmds, Duration::ZERO, &mut out)
        .await?;

    let text = String::from_utf8(out)?;
    assert!(text.starts_with("Unknown command .bogus\n"));
    assert!(!text.contains("Executing command \".down\""));
    // `.down` never ran, so the session is still there.
    assert!(engine.session("a").is_some());
    Ok(())
}

#[tokio::test]
async fn dispatch_resolves_named_selectors() -> TestResult {
    let (runtime, engine) = setup();
    activated(&engine, "a", &workers(2)).await;
    let command_loop = CommandLoop::new(
        ReplyControlService::new(engine),
        vec!["a".to_string()],
        CommandParams {
            detailed: true,
            ..loop_params()
        },
    );

    let reply = command_loop
        .dispatch("a", &Command::Configure(Some("first".to_string())))
        .await
        .unwrap();

    let Reply::State(state) = reply else {
        panic!("expected a state reply");
    };
    assert_eq!(state.devices.len(), 1);
    assert_eq!(state.devices[0].state, "READY");
    assert!(command_loop.dispatch("a", &Command::Status).await.is_none());
    assert!(runtime.calls().iter().any(|c| c == "change_state:INIT TASK"));
    Ok(())
}

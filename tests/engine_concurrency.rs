// tests/engine_concurrency.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use crate::common::{
    activated, assert_error, new_session, setup, with_timeout, workers, TestResult,
};
use topoctl::errors::ErrorCode;
use topoctl::state::{AggregatedState, DeviceLifecycle};
use topoctl::types::{CommonParams, DeviceParams};
use topoctl_test_utils::builders::{common as params_for, TopologyBuilder};
use topoctl_test_utils::fake_runtime::FakeRuntime;

fn slow_topology() -> TopologyBuilder {
    TopologyBuilder::new("slow").collection("flp", 2, &["worker"])
}

/// Wait until the runtime has seen `call`.
async fn wait_for_call(runtime: &FakeRuntime, call: &str) {
    with_timeout(async {
        while !runtime.calls().iter().any(|c| c == call) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocked_partition_does_not_block_others() -> TestResult {
    let (runtime, engine) = setup();
    let gate = runtime.gate_activation("slow");
    let a = params_for("A");
    engine.initialize(&a, &new_session()).await;

    let blocked = {
        let engine = Arc::clone(&engine);
        let a = a.clone();
        tokio::spawn(async move { engine.activate(&a, &slow_topology().params()).await })
    };
    wait_for_call(&runtime, "activate:slow").await;

    // Partition B proceeds while A holds its lock.
    let b = params_for("B");
    let init_b = with_timeout(engine.initialize(&b, &new_session())).await;
    assert!(init_b.is_ok());
    let status = with_timeout(engine.status(&Default::default())).await;
    assert_eq!(status.partitions.len(), 2);
    assert!(!blocked.is_finished());

    gate.notify_one();
    let outcome = with_timeout(blocked).await?;
    assert!(outcome.is_ok(), "{outcome:?}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn requests_on_one_partition_run_in_order() -> TestResult {
    let (runtime, engine) = setup();
    let gate = runtime.gate_activation("slow");
    let a = params_for("A");
    engine.initialize(&a, &new_session()).await;

    let activation = {
        let engine = Arc::clone(&engine);
        let a = a.clone();
        tokio::spawn(async move { engine.activate(&a, &slow_topology().params()).await })
    };
    wait_for_call(&runtime, "activate:slow").await;

    let query = {
        let engine = Arc::clone(&engine);
        let a = a.clone();
        tokio::spawn(async move { engine.get_state(&a, &DeviceParams::all(true)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!query.is_finished(), "state query overtook the activation");
    assert!(!runtime.calls().iter().any(|c| c == "get_state"));

    gate.notify_one();
    let activated = with_timeout(activation).await?;
    let state = with_timeout(query).await?;

    assert!(activated.is_ok());
    assert!(state.is_ok(), "{state:?}");
    assert_eq!(
        state.aggregated_state,
        AggregatedState::Uniform(DeviceLifecycle::Idle)
    );
    assert_eq!(state.details.map(|d| d.len()), Some(2));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_runtime_call_times_out_and_frees_the_partition() -> TestResult {
    let (runtime, engine) = setup();
    let _gate = runtime.gate_activation("slow");
    let a = params_for("A");
    engine.initialize(&a, &new_session()).await;

    let short = CommonParams::new("A", 0, Duration::from_millis(100));
    let outcome = with_timeout(engine.activate(&short, &slow_topology().params())).await;

    assert_error(&outcome, ErrorCode::Timeout);
    assert!(
        outcome
            .message
            .contains("topology activation did not complete within 100 ms"),
        "{}",
        outcome.message
    );
    assert!(engine.session("A").unwrap().topology.is_none());

    let next = with_timeout(engine.get_state(&a, &DeviceParams::all(false))).await;
    assert!(next.is_ok());
    assert_eq!(next.message, "No topology activated");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_partitions_run_side_by_side() -> TestResult {
    let (_runtime, engine) = setup();
    let topology = TopologyBuilder::new("topo").collection("flp", 2, &["worker"]);

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = Arc::clone(&engine);
        let topology = topology.clone();
        handles.push(tokio::spawn(async move {
            let params = params_for(&format!("p{i}"));
            engine.initialize(&params, &new_session()).await;
            engine.activate(&params, &topology.params()).await;
            engine.configure(&params, &DeviceParams::all(false)).await
        }));
    }
    for handle in handles {
        let outcome = with_timeout(handle).await?;
        assert!(outcome.is_ok(), "{outcome:?}");
        assert_eq!(
            outcome.aggregated_state,
            AggregatedState::Uniform(DeviceLifecycle::Ready)
        );
    }

    assert_eq!(engine.session_count(), 8);
    let mut ids: Vec<String> = (0..8)
        .map(|i| engine.session(&format!("p{i}")).unwrap().session_id)
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_covers_every_step_of_a_request() -> TestResult {
    let (runtime, engine) = setup();
    let a = activated(&engine, "A", &workers(2)).await;
    // Configure sends five transitions; each fits the timeout on its own.
    runtime.slow_transitions(Duration::from_millis(60));

    let short = CommonParams::new("A", 0, Duration::from_millis(150));
    let outcome = with_timeout(engine.configure(&short, &DeviceParams::all(false))).await;

    assert_error(&outcome, ErrorCode::Timeout);
    assert!(
        outcome.message.contains("did not complete within 150 ms"),
        "{}",
        outcome.message
    );
    assert!(outcome.exec_time < Duration::from_millis(300), "{:?}", outcome.exec_time);
    // Failed requests report the recorded state, not a fresh query.
    assert_eq!(
        outcome.aggregated_state,
        AggregatedState::Uniform(DeviceLifecycle::Idle)
    );
    let session_id = engine.session("A").unwrap().session_id;
    assert!(runtime
        .devices(&session_id)
        .iter()
        .all(|d| d.state != DeviceLifecycle::Idle));

    runtime.slow_transitions(Duration::ZERO);
    let next = with_timeout(engine.get_state(&a, &DeviceParams::all(false))).await;
    assert!(next.is_ok(), "{next:?}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lock_wait_is_not_charged_to_the_timeout() -> TestResult {
    let (runtime, engine) = setup();
    let gate = runtime.gate_activation("slow");
    let a = params_for("A");
    engine.initialize(&a, &new_session()).await;

    let blocked = {
        let engine = Arc::clone(&engine);
        let a = a.clone();
        tokio::spawn(async move { engine.activate(&a, &slow_topology().params()).await })
    };
    wait_for_call(&runtime, "activate:slow").await;

    let short = CommonParams::new("A", 0, Duration::from_millis(150));
    let queued = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.get_state(&short, &DeviceParams::all(false)).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    gate.notify_one();

    assert!(with_timeout(blocked).await?.is_ok());
    let state = with_timeout(queued).await?;
    assert!(state.is_ok(), "{state:?}");
    assert!(state.exec_time >= Duration::from_millis(300));
    Ok(())
}

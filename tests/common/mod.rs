#![allow(dead_code)]

use std::sync::Arc;

use topoctl::engine::{Engine, Outcome};
use topoctl::plugins::ResourcePlugin;
use topoctl::runtime::DeviceRuntime;
use topoctl::types::{CommonParams, InitializeParams};
use topoctl_test_utils::builders::{common, engine_with, TopologyBuilder};
use topoctl_test_utils::fake_plugin::FakePlugin;
use topoctl_test_utils::fake_runtime::FakeRuntime;

pub use topoctl_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Fake runtime plus an engine with one accepting plugin named `fake`.
pub fn setup() -> (Arc<FakeRuntime>, Arc<Engine>) {
    init_tracing();
    let runtime = FakeRuntime::new();
    let plugin: Arc<dyn ResourcePlugin> = Arc::new(FakePlugin::accepting("fake"));
    let engine = engine_with(runtime.clone() as Arc<dyn DeviceRuntime>, vec![("fake", plugin)]);
    (runtime, engine)
}

/// `flp` collection with `count` instances of one `worker` device each.
pub fn workers(count: usize) -> TopologyBuilder {
    TopologyBuilder::new("topo").collection("flp", count, &["worker"])
}

pub fn new_session() -> InitializeParams {
    InitializeParams::default()
}

/// Initialize `partition` and activate `topology` on it.
pub async fn activated(engine: &Engine, partition: &str, topology: &TopologyBuilder) -> CommonParams {
    let params = common(partition);
    let init = engine.initialize(&params, &new_session()).await;
    assert!(init.is_ok(), "initialize failed: {init:?}");
    let act = engine.activate(&params, &topology.params()).await;
    assert!(act.is_ok(), "activate failed: {act:?}");
    params
}

pub fn assert_error(outcome: &Outcome, code: topoctl::errors::ErrorCode) {
    assert_eq!(
        outcome.error_code(),
        Some(code),
        "expected {code:?}, got {outcome:?}"
    );
    assert!(!outcome.is_ok());
}

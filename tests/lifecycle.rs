// tests/lifecycle.rs

use topoctl::state::{DeviceLifecycle, DeviceSelector, LifecycleCommand, Transition};

/// Walk `from` through every transition of `command`.
fn run(command: LifecycleCommand, from: DeviceLifecycle) -> Option<DeviceLifecycle> {
    command
        .transitions()
        .iter()
        .try_fold(from, |state, t| t.apply(state))
}

#[test]
fn commands_reach_their_target_from_the_expected_state() {
    assert_eq!(
        run(LifecycleCommand::Configure, DeviceLifecycle::Idle),
        Some(DeviceLifecycle::Ready)
    );
    assert_eq!(
        run(LifecycleCommand::Start, DeviceLifecycle::Ready),
        Some(DeviceLifecycle::Running)
    );
    assert_eq!(
        run(LifecycleCommand::Stop, DeviceLifecycle::Running),
        Some(DeviceLifecycle::Ready)
    );
    assert_eq!(
        run(LifecycleCommand::Reset, DeviceLifecycle::Ready),
        Some(DeviceLifecycle::Idle)
    );
    assert_eq!(
        run(LifecycleCommand::Terminate, DeviceLifecycle::Idle),
        Some(DeviceLifecycle::Exiting)
    );

    for command in [
        LifecycleCommand::Configure,
        LifecycleCommand::Start,
        LifecycleCommand::Stop,
        LifecycleCommand::Reset,
        LifecycleCommand::Terminate,
    ] {
        let last = command.transitions().last().copied().unwrap();
        assert_eq!(last.to(), command.target(), "{}", command.name());
    }
}

#[test]
fn illegal_transition_is_rejected() {
    assert_eq!(Transition::Run.apply(DeviceLifecycle::Idle), None);
    assert_eq!(Transition::End.apply(DeviceLifecycle::Running), None);
    assert_eq!(run(LifecycleCommand::Start, DeviceLifecycle::Idle), None);
    assert_eq!(run(LifecycleCommand::Configure, DeviceLifecycle::Error), None);
}

#[test]
fn state_names_are_upper_case() {
    assert_eq!(DeviceLifecycle::DeviceReady.to_string(), "DEVICE READY");
    assert_eq!(DeviceLifecycle::Running.to_string(), "RUNNING");
    assert_eq!(Transition::InitTask.to_string(), "INIT TASK");
}

#[test]
fn selector_from_empty_path_selects_everything() {
    let selector = DeviceSelector::from_path("  ").unwrap();
    assert!(selector.is_all());
    assert!(selector.matches("anything/at/all"));
}

#[test]
fn selector_regex_must_match_the_whole_path() {
    let selector = DeviceSelector::from_path("topo/reco_\\d+/.*").unwrap();
    assert!(selector.matches("topo/reco_0/sampler"));
    assert!(selector.matches("topo/reco_12/sink"));
    assert!(!selector.matches("topo/qc_0/sampler"));
    assert!(!selector.matches("prefix/topo/reco_0/sampler"));

    let sink = DeviceSelector::from_path("sink").unwrap();
    assert!(!sink.matches("topo/reco_0/sink"));
}

#[test]
fn selector_rejects_bad_regex() {
    assert!(DeviceSelector::from_path("topo/(unclosed").is_err());
}

#[test]
fn path_selector_matches_exact_paths_only() {
    let selector = DeviceSelector::paths(["a/b_0/c", "a/b_1/c"]);
    assert!(selector.matches("a/b_0/c"));
    assert!(!selector.matches("a/b_2/c"));
    assert!(!selector.is_all());
}

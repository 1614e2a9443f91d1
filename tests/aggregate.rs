// tests/aggregate.rs

use proptest::prelude::*;
use topoctl::state::{aggregate, AggregatedState, DeviceLifecycle, DeviceState};

const STATES: [DeviceLifecycle; 13] = [
    DeviceLifecycle::Undefined,
    DeviceLifecycle::Ok,
    DeviceLifecycle::Error,
    DeviceLifecycle::Idle,
    DeviceLifecycle::InitializingDevice,
    DeviceLifecycle::Initialized,
    DeviceLifecycle::Bound,
    DeviceLifecycle::DeviceReady,
    DeviceLifecycle::Ready,
    DeviceLifecycle::Running,
    DeviceLifecycle::ResettingTask,
    DeviceLifecycle::ResettingDevice,
    DeviceLifecycle::Exiting,
];

fn devices(states: &[DeviceLifecycle]) -> Vec<DeviceState> {
    states
        .iter()
        .enumerate()
        .map(|(i, s)| DeviceState::new(i as u64, format!("topo/c_{i}/d"), *s))
        .collect()
}

#[test]
fn empty_set_is_undefined() {
    assert_eq!(aggregate(&Vec::<DeviceState>::new()), AggregatedState::Undefined);
}

#[test]
fn uniform_set_reports_the_shared_state() {
    let set = devices(&[DeviceLifecycle::Running; 4]);
    assert_eq!(
        aggregate(&set),
        AggregatedState::Uniform(DeviceLifecycle::Running)
    );
    assert_eq!(aggregate(&set).name(), "RUNNING");
}

#[test]
fn single_outlier_makes_the_set_mixed() {
    let set = devices(&[
        DeviceLifecycle::Running,
        DeviceLifecycle::Running,
        DeviceLifecycle::Error,
    ]);
    let state = aggregate(&set);
    assert_eq!(state, AggregatedState::Mixed);
    assert_eq!(state.uniform(), None);
    assert_eq!(state.to_string(), "MIXED");
}

#[test]
fn majority_is_never_picked() {
    let mut states = vec![DeviceLifecycle::Ready; 99];
    states.push(DeviceLifecycle::Idle);
    assert_eq!(aggregate(&devices(&states)), AggregatedState::Mixed);
}

fn state_strategy() -> impl Strategy<Value = DeviceLifecycle> {
    proptest::sample::select(STATES.to_vec())
}

proptest! {
    #[test]
    fn aggregation_ignores_order(
        (original, shuffled) in proptest::collection::vec(state_strategy(), 0..24)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        prop_assert_eq!(aggregate(&devices(&original)), aggregate(&devices(&shuffled)));
    }

    #[test]
    fn aggregation_is_idempotent(states in proptest::collection::vec(state_strategy(), 0..24)) {
        let set = devices(&states);
        let first = aggregate(&set);
        let second = aggregate(&set);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn uniform_iff_all_states_equal(states in proptest::collection::vec(state_strategy(), 1..24)) {
        let all_equal = states.iter().all(|s| *s == states[0]);
        let result = aggregate(&devices(&states));
        prop_assert_eq!(result.uniform().is_some(), all_equal);
        if all_equal {
            prop_assert_eq!(result, AggregatedState::Uniform(states[0]));
        } else {
            prop_assert_eq!(result, AggregatedState::Mixed);
        }
    }
}

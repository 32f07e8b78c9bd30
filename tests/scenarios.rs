use std::time::Duration;

use rcbox::harness::{self, HarnessError, Tracked, SCENARIO_COUNT};

#[test]
fn every_scenario_passes()
{
    for n in 1..=SCENARIO_COUNT {
        if let Err(e) = harness::run(n) {
            panic!("scenario {}: {:#}", n, e);
        }
    }
    assert_eq!(Tracked::live(), 0);
}

#[test]
fn scenarios_pass_under_a_deadline()
{
    for n in [1, 6, 21, 22, 23, 26, 27] {
        harness::run_with_timeout(n, Duration::from_secs(3)).unwrap();
    }
}

#[test]
fn unknown_scenarios_are_rejected()
{
    assert!(harness::run(SCENARIO_COUNT + 1).is_err());
    assert!(matches!(
        harness::run_with_timeout(99, Duration::from_secs(1)),
        Err(HarnessError::Unknown(99))
    ));
}

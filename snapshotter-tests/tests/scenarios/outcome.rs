//! Outcome classification and the event each outcome maps to

use rstest::rstest;
use test_utils::{EventKind, Outcome};

#[rstest]
#[case(0, 0, None)]
#[case(3, 0, Some(Outcome::AllSucceeded))]
#[case(2, 1, Some(Outcome::PartialFailure))]
#[case(1, 5, Some(Outcome::PartialFailure))]
#[case(0, 3, Some(Outcome::AllFailed))]
fn test_classify(#[case] succeeded: usize, #[case] failed: usize, #[case] expected: Option<Outcome>) {
    assert_eq!(Outcome::classify(succeeded, failed), expected);
}

#[rstest]
#[case(Outcome::AllSucceeded, "backup_success")]
#[case(Outcome::PartialFailure, "backup_partial_failure")]
#[case(Outcome::AllFailed, "backup_critical_failure")]
fn test_event_names(#[case] outcome: Outcome, #[case] event: &str) {
    assert_eq!(EventKind::from(outcome).as_str(), event);
}

//! Scalar property behavior: state derivation, snapshot commit,
//! notification batching and serialized asynchronous runs.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;

use veris_constraint::constraints::{between, not_blank};
use veris_constraint::{Diagnostic, ValidationResult, from_async, from_fn};
use veris_property::{ChangeKind, ConstrainedProperty, ValidationState, shared};

fn percent() -> ConstrainedProperty<i32> {
    ConstrainedProperty::new(50, vec![shared(between(0, 101))])
}

#[derive(Clone, Default)]
struct EventLog(Rc<RefCell<Vec<(ChangeKind, bool)>>>);

impl EventLog {
    fn attach<T: Clone + PartialEq + 'static>(&self, property: &mut ConstrainedProperty<T>) {
        let log = Rc::clone(&self.0);
        property.on_change(move |kind, value| log.borrow_mut().push((kind, value)));
    }

    fn take(&self) -> Vec<(ChangeKind, bool)> {
        std::mem::take(&mut self.0.borrow_mut())
    }
}

#[test]
fn valid_initial_value_settles_valid() {
    let property = percent();
    assert_eq!(property.state(), ValidationState::Valid);
    assert!(property.is_valid() && !property.is_invalid() && !property.is_validating());
    assert_eq!(*property.constrained_value(), 50);
    assert!(property.diagnostics().is_empty());
}

#[test]
fn invalid_value_keeps_the_snapshot() {
    let mut property = percent();
    property.set(180);

    assert_eq!(*property.get(), 180);
    assert_eq!(property.state(), ValidationState::Invalid);
    // the snapshot still holds the last valid value
    assert_eq!(*property.constrained_value(), 50);

    let diagnostics: Vec<&Diagnostic> = property.diagnostics().invalid().collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), "between");

    property.set(75);
    assert_eq!(property.state(), ValidationState::Valid);
    assert_eq!(*property.constrained_value(), 75);
    assert!(property.diagnostics().is_empty());
}

#[test]
fn zero_constraints_track_the_live_value() {
    let mut property: ConstrainedProperty<String> =
        ConstrainedProperty::new("a".to_owned(), Vec::new());
    assert!(property.is_valid());

    property.set("b".to_owned());
    assert!(property.is_valid());
    assert_eq!(property.constrained_value(), "b");
}

#[test]
fn setting_an_equal_value_is_a_no_op() {
    let mut property = percent();
    let events = EventLog::default();
    events.attach(&mut property);
    let commits = Rc::new(RefCell::new(0u32));
    let seen = Rc::clone(&commits);
    property.on_constrained_value(move |_| *seen.borrow_mut() += 1);

    property.set(50);
    assert!(events.take().is_empty());
    assert_eq!(*commits.borrow(), 0);
}

#[rstest]
#[case(ValidationState::Valid, true, false)]
#[case(ValidationState::Invalid, false, true)]
fn asserted_initial_state_defers_validation(
    #[case] state: ValidationState,
    #[case] valid: bool,
    #[case] invalid: bool,
) {
    // 999 violates the constraint, but the caller's assertion wins until
    // the first mutation.
    let mut property = ConstrainedProperty::with_state(999, state, vec![shared(between(0, 101))]);
    assert_eq!(property.is_valid(), valid);
    assert_eq!(property.is_invalid(), invalid);
    assert!(property.diagnostics().is_empty());

    property.set(40);
    assert_eq!(property.state(), ValidationState::Valid);
    assert_eq!(*property.constrained_value(), 40);
}

#[test]
fn one_notification_per_facet_per_batch() {
    // Two constraints that both fail must not produce two Invalid events.
    let mut property = ConstrainedProperty::new(
        "ok".to_owned(),
        vec![
            shared(not_blank()),
            shared(from_fn(|s: &String| {
                if s.len() < 10 {
                    ValidationResult::valid()
                } else {
                    ValidationResult::invalid_with(Diagnostic::new("short", "too long"))
                }
            })),
        ],
    );
    let events = EventLog::default();
    events.attach(&mut property);

    property.set("   ".to_owned());
    assert_eq!(
        events.take(),
        vec![(ChangeKind::Valid, false), (ChangeKind::Invalid, true)],
    );

    property.set("fine".to_owned());
    assert_eq!(
        events.take(),
        vec![(ChangeKind::Valid, true), (ChangeKind::Invalid, false)],
    );
}

#[test]
fn snapshot_listener_fires_on_commit_only() {
    let mut property = percent();
    let committed: Rc<RefCell<Vec<i32>>> = Rc::default();
    let log = Rc::clone(&committed);
    property.on_constrained_value(move |value| log.borrow_mut().push(*value));

    property.set(700); // invalid, no commit
    property.set(30);
    property.set(31);
    assert_eq!(*committed.borrow(), vec![30, 31]);
}

#[test]
fn removed_listener_stays_silent() {
    let mut property = percent();
    let events = EventLog::default();
    let log = Rc::clone(&events.0);
    let id = property.on_change(move |kind, value| log.borrow_mut().push((kind, value)));

    assert!(property.remove_listener(id));
    assert!(!property.remove_listener(id));

    property.set(500);
    assert!(events.take().is_empty());
}

#[test]
fn revalidate_reflects_external_state() {
    let accept = Rc::new(RefCell::new(true));
    let gate = Rc::clone(&accept);
    let mut property = ConstrainedProperty::new(
        1,
        vec![shared(from_fn(move |_: &i32| {
            if *gate.borrow() {
                ValidationResult::<Diagnostic>::valid()
            } else {
                ValidationResult::invalid()
            }
        }))],
    );
    assert!(property.is_valid());

    *accept.borrow_mut() = false;
    // nothing re-runs on its own
    assert!(property.is_valid());
    property.revalidate();
    assert!(property.is_invalid());
}

#[tokio::test]
async fn deferred_run_toggles_validating_and_commits() {
    let mut property = ConstrainedProperty::new(
        4,
        vec![shared(from_async(|n: i32| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if n % 2 == 0 {
                ValidationResult::<Diagnostic>::valid()
            } else {
                ValidationResult::invalid()
            }
        }))],
    );
    assert!(property.is_validating());
    assert_eq!(property.state(), ValidationState::Unknown);

    property.settle().await;
    assert!(!property.is_validating());
    assert!(property.is_valid());
    assert_eq!(*property.constrained_value(), 4);
}

#[tokio::test]
async fn superseded_values_are_never_validated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut property = ConstrainedProperty::with_state(
        0,
        ValidationState::Valid,
        vec![shared(from_async(move |n: i32| {
            // counts runs actually started, parked values excluded
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if n >= 0 {
                    ValidationResult::<Diagnostic>::valid()
                } else {
                    ValidationResult::invalid()
                }
            }
        }))],
    );

    property.set(1);
    property.set(2); // parked, then superseded
    property.set(3); // parked; the only follow-up that runs
    property.settle().await;

    assert!(property.is_valid());
    assert_eq!(*property.constrained_value(), 3);
    // value 1 started, value 3 ran as the follow-up; value 2 was dropped
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn intermediate_invalid_value_never_commits() {
    let mut property = ConstrainedProperty::with_state(
        1,
        ValidationState::Valid,
        vec![shared(from_async(|n: i32| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if n > 0 {
                ValidationResult::<Diagnostic>::valid()
            } else {
                ValidationResult::invalid()
            }
        }))],
    );

    property.set(-5);
    property.set(9);
    property.settle().await;

    assert!(property.is_valid());
    assert_eq!(*property.constrained_value(), 9);
}

#[tokio::test]
async fn cancelling_result_leaves_the_state_unknown() {
    let mut property = ConstrainedProperty::new(
        1,
        vec![shared(from_async(|_: i32| async {
            ValidationResult::<Diagnostic>::none()
        }))],
    );
    property.settle().await;

    assert_eq!(property.state(), ValidationState::Unknown);
    assert!(!property.is_validating());
}

#[tokio::test]
async fn panicking_constraint_counts_as_cancelled() {
    let mut property = ConstrainedProperty::new(
        1,
        vec![shared(from_async(|n: i32| async move {
            assert!(n > 100, "boom");
            ValidationResult::<Diagnostic>::valid()
        }))],
    );
    property.settle().await;

    assert_eq!(property.state(), ValidationState::Unknown);
    assert!(!property.is_validating());

    property.set(200);
    property.settle().await;
    assert!(property.is_valid());
    assert_eq!(*property.constrained_value(), 200);
}

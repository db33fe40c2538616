//! List property behavior: element records, combined state and change
//! aggregation into the snapshot.

use std::time::Duration;

use pretty_assertions::assert_eq;

use veris_constraint::constraints::{between, max_size};
use veris_constraint::{Diagnostic, ValidationResult, from_async};
use veris_property::{ConstrainedListProperty, ValidationState, shared};

/// Scores between 0 and 100, at most three of them.
fn scores(initial: Vec<i32>) -> ConstrainedListProperty<i32> {
    ConstrainedListProperty::new(
        initial,
        vec![shared(max_size(3))],
        vec![shared(between(0, 101))],
    )
}

#[test]
fn initial_items_are_validated_immediately() {
    let list = scores(vec![10, 20]);
    assert_eq!(list.state(), ValidationState::Valid);
    assert_eq!(list.constrained_value(), &[10, 20]);
    assert_eq!(list.elements().len(), 2);
    assert!(list.elements().iter().all(|e| e.is_valid()));
}

#[test]
fn invalid_element_blocks_the_commit() {
    let mut list = scores(vec![10]);
    list.push(400);

    assert_eq!(list.state(), ValidationState::Invalid);
    assert_eq!(list.items(), &[10, 400]);
    // the snapshot excludes the invalid addition
    assert_eq!(list.constrained_value(), &[10]);

    let element = &list.elements()[1];
    assert!(element.is_invalid());
    let codes: Vec<&str> = element.diagnostics().invalid().map(Diagnostic::code).collect();
    assert_eq!(codes, vec!["between"]);
    // the list-level diagnostics only reflect the list constraints
    assert!(list.diagnostics().is_empty());
}

#[test]
fn removing_the_invalid_element_restores_validity() {
    let mut list = scores(vec![10]);
    list.push(400);
    list.remove(1);

    assert_eq!(list.state(), ValidationState::Valid);
    // added and removed while unsettled: the element never surfaced
    assert_eq!(list.constrained_value(), &[10]);
    assert_eq!(list.elements().len(), 1);
}

#[test]
fn several_changes_merge_into_one_commit() {
    let mut list = scores(vec![10]);
    let mut commits: Vec<Vec<i32>> = Vec::new();
    {
        // listener scope: collect each committed snapshot
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&log);
        list.on_constrained_value(move |value: &Vec<i32>| sink.borrow_mut().push(value.clone()));

        list.push(999); // invalid, property unsettles
        list.set(1, 20); // replace the bad element
        list.push(30);

        commits.append(&mut log.borrow_mut());
    }

    assert_eq!(list.state(), ValidationState::Valid);
    assert_eq!(list.constrained_value(), &[10, 20, 30]);
    // the 999 interlude is invisible: one commit per settling mutation
    assert_eq!(commits, vec![vec![10, 20], vec![10, 20, 30]]);
}

#[test]
fn list_constraints_validate_the_whole_list() {
    let mut list = scores(vec![1, 2, 3]);
    assert!(list.is_valid());

    list.push(4); // all elements valid, but the list is too long
    assert!(list.is_invalid());
    let codes: Vec<&str> = list.diagnostics().invalid().map(Diagnostic::code).collect();
    assert_eq!(codes, vec!["max_size"]);
    assert_eq!(list.constrained_value(), &[1, 2, 3]);

    list.remove(0);
    assert!(list.is_valid());
    assert_eq!(list.constrained_value(), &[2, 3, 4]);
}

#[test]
fn replace_all_swaps_the_records() {
    let mut list = scores(vec![1, 2]);
    list.replace_all(vec![5, 6, 7]);

    assert_eq!(list.state(), ValidationState::Valid);
    assert_eq!(list.constrained_value(), &[5, 6, 7]);
    assert_eq!(list.elements().len(), 3);

    list.clear();
    assert!(list.is_empty());
    assert_eq!(list.constrained_value(), &[] as &[i32]);
    assert!(list.elements().is_empty());
}

#[test]
fn asserted_valid_state_defers_element_validation() {
    let mut list = ConstrainedListProperty::with_state(
        vec![500, 600], // out of range, taken on faith
        ValidationState::Valid,
        Vec::new(),
        vec![shared(between(0, 101))],
    );
    assert!(list.is_valid());
    assert_eq!(list.constrained_value(), &[500, 600]);
    // records exist but were never run
    assert_eq!(list.elements().len(), 2);
    assert!(list.elements().iter().all(|e| e.is_valid()));

    // later mutations validate normally, the old items stay on faith
    list.push(50);
    assert!(list.is_valid());
    assert_eq!(list.constrained_value(), &[500, 600, 50]);
}

#[tokio::test]
async fn deferred_element_constraints_settle_through_the_pump() {
    let mut list = ConstrainedListProperty::new(
        Vec::new(),
        Vec::new(),
        vec![shared(from_async(|n: i32| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if n < 100 {
                ValidationResult::<Diagnostic>::valid()
            } else {
                ValidationResult::invalid()
            }
        }))],
    );

    list.push(1);
    list.push(2);
    assert!(list.is_validating());
    assert_eq!(list.state(), ValidationState::Unknown);

    list.settle().await;
    assert!(list.is_valid());
    assert_eq!(list.constrained_value(), &[1, 2]);

    list.push(100);
    list.settle().await;
    assert!(list.is_invalid());
    assert_eq!(list.constrained_value(), &[1, 2]);
}

#[tokio::test]
async fn disposing_an_element_discards_its_run() {
    let mut list = ConstrainedListProperty::new(
        Vec::new(),
        Vec::new(),
        vec![shared(from_async(|n: i32| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if n < 100 {
                ValidationResult::<Diagnostic>::valid()
            } else {
                ValidationResult::invalid()
            }
        }))],
    );

    list.push(1);
    list.settle().await;
    assert!(list.is_valid());

    list.push(500);
    // gone before its run completes; the late completion is dropped
    list.remove(1);
    list.settle().await;

    assert!(list.is_valid());
    assert_eq!(list.constrained_value(), &[1]);
    assert_eq!(list.elements().len(), 1);
}

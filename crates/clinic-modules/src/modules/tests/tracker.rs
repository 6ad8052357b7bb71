use super::common::*;
use crate::modules::tracker::{diff, has_changes, revert};
use proptest::prelude::*;

#[test]
fn identical_sets_have_no_changes() {
    assert!(!has_changes(&core_set(), &core_set()));
}

#[test]
fn order_of_construction_does_not_matter() {
    let working = set(&["clinical", "patients", "appointments"]);
    assert!(!has_changes(&working, &core_set()));
}

#[test]
fn added_module_is_a_change() {
    let working = core_set().with(id("financial"));
    assert!(has_changes(&working, &core_set()));

    let summary = diff(&working, &core_set());
    assert_eq!(summary.enabled, vec![id("financial")]);
    assert!(summary.disabled.is_empty());
}

#[test]
fn diff_lists_both_directions_sorted() {
    let persisted = set(&["patients", "appointments", "clinical", "financial", "stock"]);
    let working = set(&["patients", "appointments", "clinical", "bi", "patient_portal"]);

    let summary = diff(&working, &persisted);
    assert_eq!(summary.enabled, vec![id("bi"), id("patient_portal")]);
    assert_eq!(summary.disabled, vec![id("financial"), id("stock")]);
    assert!(!summary.is_empty());
    assert!(diff(&persisted, &persisted).is_empty());
}

#[test]
fn revert_returns_an_independent_copy() {
    let persisted = core_set();
    let reverted = revert(&persisted);
    let edited = reverted.with(id("financial"));

    assert_eq!(reverted, persisted);
    assert!(has_changes(&edited, &persisted));
    assert!(!has_changes(&reverted, &persisted));
}

proptest! {
    #[test]
    fn a_set_never_differs_from_itself(
        modules in proptest::collection::btree_set("[a-z]{1,8}", 0..10)
    ) {
        let current = modules.iter().map(String::as_str).collect::<Vec<_>>();
        let current = set(&current);
        prop_assert!(!has_changes(&current, &current));
    }

    #[test]
    fn adding_a_new_module_is_detected(
        modules in proptest::collection::btree_set("[a-z]{1,8}", 0..10),
        extra in "[A-Z]{1,8}"
    ) {
        let current = modules.iter().map(String::as_str).collect::<Vec<_>>();
        let current = set(&current);
        let working = current.with(id(&extra));
        prop_assert!(has_changes(&working, &current));
    }
}

use super::common::*;
use crate::modules::{
    GatewayError, ModuleEditingSession, SaveOutcome, SessionError, ToggleRefusal, Violation,
};
use std::sync::Arc;

fn open_session(gateway: Arc<MemoryGateway>) -> ModuleEditingSession<MemoryGateway> {
    ModuleEditingSession::open(tenant(), Arc::new(engine()), gateway).expect("session opens")
}

#[test]
fn open_initializes_working_from_persisted() {
    let gateway = Arc::new(MemoryGateway::seeded(&tenant(), core_set()));
    let session = open_session(gateway);

    assert_eq!(session.working(), &core_set());
    assert_eq!(session.persisted(), &core_set());
    assert!(!session.has_changes());
    assert!(session.violations().is_empty());
}

#[test]
fn open_propagates_gateway_failure() {
    let result =
        ModuleEditingSession::open(tenant(), Arc::new(engine()), Arc::new(UnavailableGateway));
    match result {
        Err(SessionError::Persistence(GatewayError::Unavailable(_))) => {}
        Err(other) => panic!("expected gateway failure, got {other:?}"),
        Ok(_) => panic!("expected gateway failure"),
    }
}

#[test]
fn unknown_tenant_starts_empty_with_warnings() {
    let gateway = Arc::new(MemoryGateway::default());
    let session = open_session(gateway);

    assert!(session.working().is_empty());
    assert_eq!(
        session.violations(),
        &[
            Violation::MissingRequired {
                module: id("patients")
            },
            Violation::MissingRequired {
                module: id("appointments")
            },
            Violation::MissingRequired {
                module: id("clinical")
            },
        ]
    );
}

#[test]
fn save_persists_sorted_ids_and_resets_baseline() {
    let gateway = Arc::new(MemoryGateway::seeded(&tenant(), core_set()));
    let mut session = open_session(gateway.clone());

    session.toggle(&id("bi"), true);
    assert!(session.has_changes());

    let outcome = session.save().expect("save succeeds");
    match outcome {
        SaveOutcome::Saved(changes) => {
            assert_eq!(changes.enabled, vec![id("bi"), id("financial")]);
            assert!(changes.disabled.is_empty());
        }
        other => panic!("expected saved outcome, got {other:?}"),
    }

    assert!(!session.has_changes());
    assert_eq!(session.persisted(), session.working());
    assert_eq!(
        gateway.saves(),
        vec![(
            tenant(),
            vec![
                id("appointments"),
                id("bi"),
                id("clinical"),
                id("financial"),
                id("patients"),
            ]
        )]
    );
}

#[test]
fn save_without_changes_skips_gateway() {
    let gateway = Arc::new(MemoryGateway::seeded(&tenant(), core_set()));
    let mut session = open_session(gateway.clone());

    assert_eq!(session.save().expect("no-op save"), SaveOutcome::Unchanged);
    assert!(gateway.saves().is_empty());
}

#[test]
fn invalid_working_set_is_never_persisted() {
    let gateway = Arc::new(MemoryGateway::seeded(
        &tenant(),
        set(&["patients", "procedures"]),
    ));
    let mut session = open_session(gateway.clone());
    assert_eq!(session.violations().len(), 3);

    session.toggle(&id("bi"), true);

    match session.save() {
        Err(SessionError::Invalid(validation)) => {
            assert_eq!(
                validation.messages(),
                vec!["module 'procedures' requires inactive modules: stock".to_string()]
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(gateway.saves().is_empty());
    assert!(session.has_changes());
    assert_eq!(session.violations().len(), 1);
}

#[test]
fn refused_toggle_leaves_working_set_untouched() {
    let gateway = Arc::new(MemoryGateway::seeded(&tenant(), core_set()));
    let mut session = open_session(gateway);

    let outcome = session.toggle(&id("clinical"), false);
    assert!(matches!(
        outcome.refusal,
        Some(ToggleRefusal::RequiredModule { .. })
    ));
    assert_eq!(session.working(), &core_set());
    assert!(!session.has_changes());
}

#[test]
fn persistence_failure_keeps_working_set() {
    let gateway = Arc::new(FailingSaveGateway::seeded(&tenant(), core_set()));
    let mut session =
        ModuleEditingSession::open(tenant(), Arc::new(engine()), gateway.clone()).expect("opens");

    session.toggle(&id("financial"), true);
    let edited = session.working().clone();

    match session.save() {
        Err(SessionError::Persistence(GatewayError::Unavailable(reason))) => {
            assert_eq!(reason, "network timeout");
        }
        other => panic!("expected persistence failure, got {other:?}"),
    }
    assert_eq!(session.working(), &edited);
    assert_eq!(session.persisted(), &core_set());

    gateway.recover();
    assert!(matches!(session.save(), Ok(SaveOutcome::Saved(_))));
    assert_eq!(gateway.saves().len(), 1);
}

#[test]
fn cancel_reverts_to_persisted() {
    let gateway = Arc::new(MemoryGateway::seeded(&tenant(), core_set()));
    let mut session = open_session(gateway);

    session.toggle(&id("procedures"), true);
    assert!(session.has_changes());

    session.cancel();
    assert_eq!(session.working(), &core_set());
    assert!(!session.has_changes());
}

#[test]
fn reload_replaces_both_sets_from_gateway() {
    let gateway = Arc::new(MemoryGateway::seeded(&tenant(), core_set()));
    let mut session = open_session(gateway.clone());
    session.toggle(&id("stock"), true);

    let server_side = core_set().with(id("financial"));
    gateway.overwrite(&tenant(), server_side.clone());
    session.reload().expect("reload succeeds");

    assert_eq!(session.persisted(), &server_side);
    assert_eq!(session.working(), &server_side);
    assert!(!session.has_changes());
}

#[test]
fn snapshot_exposes_pending_changes() {
    let gateway = Arc::new(MemoryGateway::seeded(&tenant(), core_set()));
    let mut session = open_session(gateway);
    session.toggle(&id("stock"), true);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.tenant, tenant());
    assert!(snapshot.has_changes);
    assert_eq!(snapshot.changes.enabled, vec![id("financial"), id("stock")]);
    assert_eq!(snapshot.modules.len(), 7);
    assert!(snapshot.saved_at.is_none());
    assert!(snapshot.violations.is_empty());
}

#[test]
fn retired_module_can_be_removed_and_saved() {
    let stored = core_set().with(id("telemedicine"));
    let gateway = Arc::new(MemoryGateway::seeded(&tenant(), stored));
    let mut session = open_session(gateway.clone());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.retired, vec![id("telemedicine")]);
    assert_eq!(
        snapshot.violations,
        vec!["module 'telemedicine' is not part of the catalog".to_string()]
    );

    session.toggle(&id("financial"), true);
    assert!(matches!(session.save(), Err(SessionError::Invalid(_))));

    let outcome = session.toggle(&id("telemedicine"), false);
    assert!(outcome.refusal.is_none());
    assert_eq!(outcome.disabled, vec![id("telemedicine")]);
    assert!(session.violations().is_empty());

    match session.save().expect("save succeeds") {
        SaveOutcome::Saved(summary) => {
            assert_eq!(summary.enabled, vec![id("financial")]);
            assert_eq!(summary.disabled, vec![id("telemedicine")]);
        }
        other => panic!("expected saved outcome, got {other:?}"),
    }
    assert!(session.snapshot().retired.is_empty());
    assert_eq!(
        gateway.saves()[0].1,
        vec![
            id("appointments"),
            id("clinical"),
            id("financial"),
            id("patients")
        ]
    );
}

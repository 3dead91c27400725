//! Store behavior under user actions and racing responses.

mod common;

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use common::{empresa, fixture, server_fixture, valid_input};
use padron_core::error::{DataError, FieldError};
use padron_core::record::FilterValue;
use padron_events::EventKind;
use padron_store::EditingDraft;

fn seed_three() -> Vec<padron_core::empresa::Empresa> {
    vec![
        empresa("e1", "Acme", "900111", false),
        empresa("e2", "Beta", "900222", true),
        empresa("e3", "Zeta", "900333", false),
    ]
}

fn seed_many(n: usize) -> Vec<padron_core::empresa::Empresa> {
    (0..n)
        .map(|i| empresa(&format!("e{i}"), &format!("Empresa {i:02}"), "900000", false))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn init_loads_the_first_page() {
    let (store, _gateway, strategy) = fixture(seed_three());

    store.init(None).await;
    // Let the spawned resolve task run to completion.
    tokio::time::sleep(Duration::from_millis(1)).await;

    let snap = store.snapshot().await;
    assert_eq!(snap.last_result.items.len(), 3);
    assert_eq!(snap.last_result.total_count, 3);
    assert!(!snap.initializing);
    assert!(!snap.is_loading);
    assert_eq!(strategy.resolve_calls.load(Ordering::SeqCst), 1);

    store.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn first_load_window_gives_way_on_timeout() {
    let (store, _gateway, strategy) = fixture(seed_three());
    strategy.script_delays(&[Duration::from_secs(10)]);

    store.init(None).await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    // The window closed but the slow first resolve is still in flight.
    let snap = store.snapshot().await;
    assert!(!snap.initializing);
    assert!(snap.last_result.items.is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snap = store.snapshot().await;
    assert_eq!(snap.last_result.items.len(), 3);

    store.dispose().await;
}

#[tokio::test]
async fn typing_does_not_resolve_until_commit() {
    let (store, _gateway, strategy) = fixture(seed_three());
    store.resolve().await.unwrap();
    let baseline = strategy.resolve_calls.load(Ordering::SeqCst);

    store.stage_search_term("ac").await;
    store.stage_search_term("acm").await;
    store.stage_search_term("acme").await;

    let snap = store.snapshot().await;
    assert!(snap.query.search_term.is_none());
    assert_eq!(strategy.resolve_calls.load(Ordering::SeqCst), baseline);

    store.commit_search().await.unwrap();
    let snap = store.snapshot().await;
    assert_eq!(snap.query.search_term.as_deref(), Some("acme"));
    assert_eq!(snap.last_result.items.len(), 1);
    assert_eq!(snap.last_result.items[0].id, "e1");
    assert_eq!(strategy.resolve_calls.load(Ordering::SeqCst), baseline + 1);
}

#[tokio::test]
async fn committing_a_search_returns_to_page_one() {
    let (store, _gateway, _strategy) = fixture(seed_many(25));
    store.resolve().await.unwrap();
    store.set_page(3).await.unwrap();
    assert_eq!(store.snapshot().await.query.page, 3);

    store.stage_search_term("empresa").await;
    store.commit_search().await.unwrap();

    let snap = store.snapshot().await;
    assert_eq!(snap.query.page, 1);
    assert_eq!(snap.last_result.current_page, 1);
}

#[tokio::test]
async fn setting_the_current_page_issues_no_request() {
    let (store, _gateway, strategy) = fixture(seed_many(25));
    store.resolve().await.unwrap();
    let baseline = strategy.resolve_calls.load(Ordering::SeqCst);

    store.set_page(1).await.unwrap();
    assert_eq!(strategy.resolve_calls.load(Ordering::SeqCst), baseline);

    store.set_page(2).await.unwrap();
    assert_eq!(strategy.resolve_calls.load(Ordering::SeqCst), baseline + 1);
}

#[tokio::test]
async fn requested_page_is_clamped_to_the_page_count() {
    let (store, _gateway, strategy) = fixture(seed_many(15));
    store.resolve().await.unwrap();

    store.set_page(2).await.unwrap();
    let baseline = strategy.resolve_calls.load(Ordering::SeqCst);

    // Past the end clamps to the last page, which is already shown, so
    // no request is issued.
    store.set_page(3).await.unwrap();
    let snap = store.snapshot().await;
    assert_eq!(snap.query.page, 2);
    assert_eq!(snap.last_result.current_page, 2);
    assert_eq!(snap.last_result.items.len(), 5);
    assert_eq!(strategy.resolve_calls.load(Ordering::SeqCst), baseline);
}

#[tokio::test]
async fn set_filters_replaces_every_dimension() {
    let (store, _gateway, _strategy) = fixture(seed_three());
    store
        .set_filter("requiere_osi", BTreeSet::from([FilterValue::Bool(true)]))
        .await
        .unwrap();
    assert_eq!(store.snapshot().await.last_result.total_count, 1);

    // A full replacement drops the previously active dimension.
    let mut filters = std::collections::BTreeMap::new();
    filters.insert(
        "paga_recargos".to_string(),
        BTreeSet::from([FilterValue::Bool(false)]),
    );
    store.set_filters(filters).await.unwrap();

    let snap = store.snapshot().await;
    assert_eq!(snap.query.page, 1);
    assert_eq!(snap.query.active_filters().count(), 1);
    assert_eq!(snap.last_result.total_count, 3);
}

#[tokio::test]
async fn reset_is_idempotent() {
    let (store, _gateway, _strategy) = fixture(seed_many(25));
    store.resolve().await.unwrap();

    store.stage_search_term("empresa 1").await;
    store.commit_search().await.unwrap();
    store
        .set_filter(
            "requiere_osi",
            BTreeSet::from([FilterValue::Bool(false)]),
        )
        .await
        .unwrap();

    store.reset_query().await.unwrap();
    let once = store.snapshot().await;
    store.reset_query().await.unwrap();
    let twice = store.snapshot().await;

    assert_eq!(once.query, twice.query);
    assert_eq!(once.last_result, twice.last_result);
    assert_eq!(once.query.page, 1);
    assert!(once.query.search_term.is_none());
    assert_eq!(once.query.active_filters().count(), 0);
    assert_eq!(once.last_result.total_count, 25);
}

#[tokio::test(start_paused = true)]
async fn stale_response_never_overwrites_a_newer_one() {
    let (store, _gateway, strategy) = fixture(seed_three());
    // First resolve is slow, second is fast: the second finishes (and is
    // applied) first, the first arrives stale.
    strategy.script_delays(&[Duration::from_millis(500), Duration::from_millis(10)]);

    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.resolve().await })
    };
    tokio::task::yield_now().await;

    store.stage_search_term("acme").await;
    store.commit_search().await.unwrap();

    let snap = store.snapshot().await;
    assert_eq!(snap.last_result.items.len(), 1);
    assert_eq!(snap.last_result.items[0].id, "e1");

    // The slow unfiltered response lands now and must be discarded.
    slow.await.unwrap().unwrap();
    let snap = store.snapshot().await;
    assert_eq!(snap.last_result.items.len(), 1);
    assert_eq!(snap.last_result.items[0].id, "e1");
    assert!(!snap.is_loading);
}

#[tokio::test(start_paused = true)]
async fn earlier_response_is_discarded_while_a_newer_request_is_in_flight() {
    let (store, _gateway, strategy) = fixture(seed_three());
    // First resolve is fast, the superseding search is slow: the first
    // response lands while the search is still in flight and must not be
    // applied against the newer query.
    strategy.script_delays(&[Duration::from_millis(100), Duration::from_millis(500)]);

    let unfiltered = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.resolve().await })
    };
    tokio::task::yield_now().await;

    store.stage_search_term("acme").await;
    let search = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.commit_search().await })
    };
    tokio::task::yield_now().await;

    // The unfiltered response has settled; the query already says "acme",
    // so the page stays untouched and loading stays on.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let snap = store.snapshot().await;
    assert_eq!(snap.query.search_term.as_deref(), Some("acme"));
    assert!(snap.last_result.items.is_empty());
    assert!(snap.is_loading);

    unfiltered.await.unwrap().unwrap();
    search.await.unwrap().unwrap();
    let snap = store.snapshot().await;
    assert_eq!(snap.last_result.items.len(), 1);
    assert_eq!(snap.last_result.items[0].id, "e1");
    assert!(!snap.is_loading);
}

#[tokio::test]
async fn create_then_refresh_shows_server_truth() {
    let (store, _gateway, _strategy) = fixture(seed_three());
    store.resolve().await.unwrap();
    let mut events = store.bus().subscribe();

    store.open_editor(None).await;
    let created = store
        .create_record(&valid_input("Delta", "900444"))
        .await
        .unwrap();
    assert_eq!(created.nombre, "Delta");
    assert!(!created.id.is_empty());

    let snap = store.snapshot().await;
    assert!(snap.draft.is_none());
    assert!(snap.last_error.is_none());
    assert_eq!(snap.last_result.total_count, 4);
    assert!(snap.last_result.items.iter().any(|r| r.id == created.id));

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, EventKind::RecordCreated);
    assert_eq!(event.record_id.as_deref(), Some(created.id.as_str()));
}

#[tokio::test]
async fn invalid_input_never_reaches_the_gateway() {
    let (store, gateway, _strategy) = fixture(seed_three());
    store.resolve().await.unwrap();

    store.open_editor(None).await;
    let err = store
        .create_record(&valid_input("", "900444"))
        .await
        .unwrap_err();

    assert_matches!(err, DataError::ValidationFailed(ref fields) => {
        assert_eq!(fields[0].field, "nombre");
    });
    assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);

    // The editing surface stays open with the error available.
    let snap = store.snapshot().await;
    assert_eq!(snap.draft, Some(EditingDraft::Create));
    assert_matches!(snap.last_error, Some(DataError::ValidationFailed(_)));
}

#[tokio::test]
async fn server_rejection_keeps_the_draft_open() {
    let (store, gateway, _strategy) = fixture(seed_three());
    store.resolve().await.unwrap();
    gateway.fail_next(DataError::Conflict {
        field: Some("nit".into()),
        message: "nit must be unique".into(),
    });

    store.open_editor(None).await;
    let err = store
        .create_record(&valid_input("Delta", "900111"))
        .await
        .unwrap_err();

    assert_matches!(err, DataError::Conflict { .. });
    let snap = store.snapshot().await;
    assert_eq!(snap.draft, Some(EditingDraft::Create));
    assert_matches!(snap.last_error, Some(DataError::Conflict { .. }));
}

#[tokio::test]
async fn server_side_field_errors_are_republished() {
    let (store, gateway, _strategy) = fixture(seed_three());
    let mut events = store.bus().subscribe();
    gateway.fail_next(DataError::ValidationFailed(vec![FieldError {
        field: "nit".into(),
        message: "nit inválido".into(),
    }]));

    let _ = store
        .create_record(&valid_input("Delta", "900444"))
        .await
        .unwrap_err();

    let event = events.recv().await.unwrap();
    assert_matches!(event.kind, EventKind::ValidationFailed { errors } => {
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "nit");
    });
}

#[tokio::test]
async fn update_refreshes_the_list_and_the_detail_slot() {
    let (store, _gateway, _strategy) = fixture(seed_three());
    store.resolve().await.unwrap();
    store.fetch_record("e1").await.unwrap();

    let mut input = valid_input("Acme Renovada", "900111");
    input.requiere_osi = true;
    let updated = store.update_record("e1", &input).await.unwrap();
    assert_eq!(updated.nombre, "Acme Renovada");

    let snap = store.snapshot().await;
    assert_eq!(snap.current.as_ref().unwrap().nombre, "Acme Renovada");
    assert!(snap
        .last_result
        .items
        .iter()
        .any(|r| r.id == "e1" && r.nombre == "Acme Renovada"));
}

#[tokio::test]
async fn delete_drops_the_record_from_list_and_selection() {
    let (store, _gateway, _strategy) = fixture(seed_three());
    store.resolve().await.unwrap();

    store.toggle_selection("e1").await;
    store.toggle_selection("e2").await;
    store.delete_record("e1").await.unwrap();

    let snap = store.snapshot().await;
    assert!(!snap.selection.contains("e1"));
    assert!(snap.selection.contains("e2"));
    assert_eq!(snap.last_result.total_count, 2);
    assert!(snap.last_result.items.iter().all(|r| r.id != "e1"));
}

#[tokio::test]
async fn selection_persists_across_query_changes() {
    let (store, _gateway, _strategy) = fixture(seed_many(25));
    store.resolve().await.unwrap();

    store.toggle_selection("e3").await;
    store.set_page(2).await.unwrap();
    store.stage_search_term("empresa 1").await;
    store.commit_search().await.unwrap();

    assert!(store.snapshot().await.selection.contains("e3"));
}

#[tokio::test]
async fn read_failure_keeps_the_last_good_data() {
    let (store, _gateway, strategy) = fixture(seed_three());
    store.resolve().await.unwrap();

    strategy.fail_next(DataError::Network("connection refused".into()));
    let err = store.resolve().await.unwrap_err();
    assert_matches!(err, DataError::Network(_));

    let snap = store.snapshot().await;
    assert_eq!(snap.last_result.items.len(), 3);
    assert_matches!(snap.last_error, Some(DataError::Network(_)));
    assert!(!snap.is_loading);

    store.clear_error().await;
    assert!(store.snapshot().await.last_error.is_none());
}

#[tokio::test]
async fn server_paginated_strategy_round_trips_the_wire_params() {
    let (store, gateway) = server_fixture(seed_many(25));

    store.stage_search_term("empresa").await;
    store.commit_search().await.unwrap();
    store.set_page(3).await.unwrap();

    let snap = store.snapshot().await;
    assert_eq!(snap.last_result.current_page, 3);
    assert_eq!(snap.last_result.total_count, 25);
    assert_eq!(snap.last_result.items.len(), 5);
    assert!(gateway.list_calls.load(Ordering::SeqCst) >= 2);
}

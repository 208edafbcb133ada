//! Filtered reads and round-trips against `PostgreSQL`.

use crate::postgres::helpers::{
    CleanupGuard, FrozenClock, add_talent, add_task, assign, ensure_template, epoch, setup_store,
    stored_assignment, stored_task, test_runtime, vector,
};
use chrono::Duration;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use std::collections::BTreeSet;
use talentflow::matching::{
    domain::{Assignment, Talent, Task},
    ports::{ChangeSet, MatchingStore, StoreError},
};

#[rstest]
fn records_round_trip_through_jsonb(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_round_trip_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let rt = test_runtime();

    let task = add_task(&rt, &store, &[0.25, -0.5, 1.0]);
    let talent = Talent::new("Ada", vector(&[0.125, 0.75, -1.0]), &FrozenClock).expect("talent");
    rt.block_on(store.insert_talent(&talent)).expect("store talent");

    assert_eq!(stored_task(&rt, &store, &task), task);
    let talents = rt.block_on(store.list_talents()).expect("list");
    assert_eq!(talents, vec![talent]);
    assert_eq!(rt.block_on(store.count_talents()).expect("count"), 1);
}

#[rstest]
fn duplicate_task_is_rejected(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_dup_task_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let rt = test_runtime();

    let task = add_task(&rt, &store, &[1.0, 0.0]);
    let result = rt.block_on(store.insert_task(&task));

    assert!(
        matches!(result, Err(StoreError::DuplicateTask(id)) if id == task.id()),
        "Expected DuplicateTask, got: {result:?}"
    );
}

#[rstest]
fn open_and_expired_filters_select_by_state(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_filters_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let rt = test_runtime();

    let ada = add_talent(&rt, &store, "Ada");
    let open = add_task(&rt, &store, &[1.0, 0.0]);
    let lapsed = add_task(&rt, &store, &[1.0, 0.0]);
    let due_now = add_task(&rt, &store, &[1.0, 0.0]);
    let running = add_task(&rt, &store, &[1.0, 0.0]);
    let finished = add_task(&rt, &store, &[1.0, 0.0]);
    assign(&rt, &store, &lapsed, &ada, -Duration::hours(1));
    assign(&rt, &store, &due_now, &ada, Duration::zero());
    assign(&rt, &store, &running, &ada, Duration::hours(1));
    let (mut done, _) = assign(&rt, &store, &finished, &ada, -Duration::hours(1));
    done.complete(epoch()).expect("not completed");
    let mut changes = ChangeSet::new();
    changes.update_task(done);
    rt.block_on(store.commit(changes)).expect("completion commit");

    let open_ids: Vec<_> = rt
        .block_on(store.open_tasks())
        .expect("open tasks")
        .iter()
        .map(Task::id)
        .collect();
    assert_eq!(open_ids, vec![open.id()]);

    let expired_ids: Vec<_> = rt
        .block_on(store.expired_tasks(epoch()))
        .expect("expired tasks")
        .iter()
        .map(Task::id)
        .collect();
    assert_eq!(expired_ids, vec![lapsed.id()]);
}

#[rstest]
fn pending_requests_and_failures_are_listed(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_pending_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let rt = test_runtime();

    let ada = add_talent(&rt, &store, "Ada");
    let grace = add_talent(&rt, &store, "Grace");
    let requested = add_task(&rt, &store, &[1.0, 0.0]);
    let lapsed = add_task(&rt, &store, &[0.0, 1.0]);
    let (_, extension) = assign(&rt, &store, &requested, &ada, Duration::hours(24));
    let (mut released, mut failed) = assign(&rt, &store, &lapsed, &grace, -Duration::hours(1));

    let mut pending = extension.clone();
    pending
        .request_extension("hospitalized, need 2 more days", epoch())
        .expect("active");
    failed.fail(epoch()).expect("active");
    released.release(epoch()).expect("assigned");
    let mut changes = ChangeSet::new();
    changes.update_assignment(pending);
    changes.update_assignment(failed);
    changes.update_task(released);
    rt.block_on(store.commit(changes)).expect("commit");

    let listed = rt.block_on(store.pending_extensions()).expect("pending");
    assert_eq!(listed, vec![stored_assignment(&rt, &store, &extension)]);
    assert_eq!(
        listed.first().map(Assignment::extension_reason),
        Some("hospitalized, need 2 more days")
    );

    let exclusions = rt
        .block_on(store.failed_talents_by_task())
        .expect("exclusions");
    assert_eq!(exclusions.get(&lapsed.id()), Some(&BTreeSet::from([grace.id()])));
    assert!(!exclusions.contains_key(&requested.id()));
}

#[rstest]
fn applying_schema_twice_is_harmless(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_schema_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = setup_store(shared_test_cluster, &db_name).expect("store setup");
    let rt = test_runtime();

    rt.block_on(store.apply_schema()).expect("first apply");
    rt.block_on(store.apply_schema()).expect("second apply");
    let task = add_task(&rt, &store, &[1.0, 0.0]);
    assert_eq!(stored_task(&rt, &store, &task), task);
}

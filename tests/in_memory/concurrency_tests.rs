//! Jobs racing on one store must never break the one-active rule.

use super::helpers::{FixedClock, active_counts, add_talent, add_task, clock, store};
use chrono::Duration;
use mockable::Clock;
use rstest::rstest;
use std::sync::Arc;
use talentflow::config::{EngineConfig, ExtensionRejectPolicy};
use talentflow::matching::{
    adapters::{StaticOracle, memory::InMemoryMatchingStore},
    ports::{ChangeSet, MatchingStore},
    services::{ExpirationReaper, ExtensionArbiter, MatchingEngine},
};
use tokio::task::JoinSet;

const ENGINES: usize = 8;

async fn populate(store: &InMemoryMatchingStore, clock: &FixedClock, tasks: usize) {
    for (index, name) in ["Ada", "Grace", "Edsger"].into_iter().enumerate() {
        let mut components = [0.1; 3];
        if let Some(slot) = components.get_mut(index) {
            *slot = 1.0;
        }
        add_talent(store, clock, name, &components).await;
    }
    let axes = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    for components in axes.iter().cycle().take(tasks) {
        add_task(store, clock, components).await;
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_engines_assign_each_task_once(
    store: Arc<InMemoryMatchingStore>,
    clock: Arc<FixedClock>,
) {
    populate(&store, &clock, 30).await;
    let config = EngineConfig::default();

    let mut engines = JoinSet::new();
    for _ in 0..ENGINES {
        let engine = MatchingEngine::new(Arc::clone(&store), Arc::clone(&clock), &config);
        engines.spawn(async move { engine.run_cycle().await });
    }
    let mut assigned = 0;
    while let Some(joined) = engines.join_next().await {
        let report = joined.expect("engine task").expect("matching cycle");
        assigned += report.assigned.len();
    }

    let counts = active_counts(&store).await;
    assert_eq!(counts.len(), 30);
    assert!(counts.values().all(|count| *count == 1));
    assert_eq!(assigned, 30);
    assert_eq!(store.list_assignments().await.expect("list").len(), 30);
}

async fn request_extensions(store: &InMemoryMatchingStore, clock: &FixedClock) {
    let mut changes = ChangeSet::new();
    for mut assignment in store.list_assignments().await.expect("list") {
        if assignment.is_active() {
            assignment
                .request_extension("need more time", clock.utc())
                .expect("active assignment");
            changes.update_assignment(assignment);
        }
    }
    store.commit(changes).await.expect("commit extension requests");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn all_jobs_racing_keep_at_most_one_active_assignment(
    store: Arc<InMemoryMatchingStore>,
    clock: Arc<FixedClock>,
) {
    populate(&store, &clock, 12).await;
    let config = EngineConfig::default().with_reject_policy(ExtensionRejectPolicy::Reclaim);
    let engine = MatchingEngine::new(Arc::clone(&store), Arc::clone(&clock), &config);
    let arbiter = ExtensionArbiter::new(
        Arc::clone(&store),
        Arc::new(StaticOracle::rejecting()),
        Arc::clone(&clock),
        &config,
    );
    let reaper = ExpirationReaper::new(Arc::clone(&store), Arc::clone(&clock));

    for (round, with_requests) in [false, true, false, true].into_iter().enumerate() {
        if with_requests {
            request_extensions(&store, &clock).await;
        }

        let mut jobs = JoinSet::new();
        for _ in 0..2 {
            let matching = engine.clone();
            jobs.spawn(async move { matching.run_cycle().await.map(drop) });
            let extension = arbiter.clone();
            jobs.spawn(async move { extension.run_cycle().await.map(drop) });
            let expiry = reaper.clone();
            jobs.spawn(async move { expiry.run_cycle().await.map(drop) });
        }
        while let Some(joined) = jobs.join_next().await {
            joined.expect("job task").expect("cycle");
        }

        let counts = active_counts(&store).await;
        assert!(
            counts.values().all(|count| *count <= 1),
            "round {round}: {counts:?}"
        );
        clock.advance(Duration::hours(25));
    }
}

//! The periodic driver running real jobs against one store.

use super::helpers::{FixedClock, add_talent, add_task, assign, clock, epoch, store};
use chrono::Duration;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use talentflow::config::EngineConfig;
use talentflow::driver::{CycleJob, PeriodicDriver};
use talentflow::matching::{
    adapters::{StaticOracle, memory::InMemoryMatchingStore},
    domain::AssignmentStatus,
    ports::MatchingStore,
    services::{ExpirationReaper, ExtensionArbiter, MatchingEngine},
};
use tokio_util::sync::CancellationToken;

const TICK: StdDuration = StdDuration::from_millis(10);

fn driver(store: &Arc<InMemoryMatchingStore>, clock: &Arc<FixedClock>) -> PeriodicDriver {
    let config = EngineConfig::default();
    let engine: Arc<dyn CycleJob> = Arc::new(MatchingEngine::new(
        Arc::clone(store),
        Arc::clone(clock),
        &config,
    ));
    let arbiter: Arc<dyn CycleJob> = Arc::new(ExtensionArbiter::new(
        Arc::clone(store),
        Arc::new(StaticOracle::rejecting()),
        Arc::clone(clock),
        &config,
    ));
    let reaper: Arc<dyn CycleJob> =
        Arc::new(ExpirationReaper::new(Arc::clone(store), Arc::clone(clock)));
    PeriodicDriver::new()
        .with_job(engine, TICK)
        .with_job(arbiter, TICK)
        .with_job(reaper, TICK)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn driver_reclaims_and_rematches_until_shutdown(
    store: Arc<InMemoryMatchingStore>,
    clock: Arc<FixedClock>,
) {
    let lapsed = add_talent(&store, &clock, "Ada", &[1.0, 0.0]).await;
    let replacement = add_talent(&store, &clock, "Grace", &[0.9, 0.1]).await;
    let task = add_task(&store, &clock, &[1.0, 0.0]).await;
    let overdue = assign(&store, task.id(), &lapsed, epoch(), Duration::hours(-1)).await;

    let driver = driver(&store, &clock);
    assert_eq!(driver.job_count(), 3);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(driver.run(shutdown.clone()));

    let rematched = tokio::time::timeout(StdDuration::from_secs(5), async {
        loop {
            let active = store
                .active_assignments_for_task(task.id())
                .await
                .expect("active assignments");
            if let Some(assignment) = active
                .into_iter()
                .find(|assignment| assignment.id() != overdue.id())
            {
                break assignment;
            }
            tokio::time::sleep(TICK).await;
        }
    })
    .await
    .expect("task rematched before timeout");

    shutdown.cancel();
    handle.await.expect("driver should stop cleanly");

    assert_eq!(rematched.talent_id(), replacement.id());
    let failed = store
        .find_assignment(overdue.id())
        .await
        .expect("lookup")
        .expect("assignment exists");
    assert_eq!(failed.status(), AssignmentStatus::Failed);
}

//! End-to-end flows from intake through every periodic job.

use super::helpers::{FixedClock, clock, epoch, store};
use chrono::Duration;
use rstest::rstest;
use std::sync::Arc;
use talentflow::config::{EngineConfig, ExtensionRejectPolicy};
use talentflow::matching::{
    adapters::{HashEmbedder, StaticOracle, memory::InMemoryMatchingStore},
    domain::AssignmentStatus,
    ports::MatchingStore,
    services::{ExpirationReaper, ExtensionArbiter, IntakeService, MatchingEngine},
};

fn intake(
    store: &Arc<InMemoryMatchingStore>,
    clock: &Arc<FixedClock>,
) -> IntakeService<InMemoryMatchingStore, HashEmbedder, FixedClock> {
    IntakeService::new(
        Arc::clone(store),
        Arc::new(HashEmbedder::new(64)),
        Arc::clone(clock),
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn identical_text_is_matched_extended_and_submitted(
    store: Arc<InMemoryMatchingStore>,
    clock: Arc<FixedClock>,
) {
    let intake = intake(&store, &clock);
    let config = EngineConfig::default();
    let talent = intake
        .register_talent("Rust backend engineer")
        .await
        .expect("talent");
    let task = intake
        .create_task("Rust backend engineer")
        .await
        .expect("task");

    let engine = MatchingEngine::new(Arc::clone(&store), Arc::clone(&clock), &config);
    let report = engine.run_cycle().await.expect("matching cycle");
    let outcome = report.assigned.first().expect("task matched");
    assert_eq!(outcome.talent_id, talent.id());
    assert_eq!(outcome.deadline, epoch() + Duration::hours(24));

    intake
        .request_extension(outcome.assignment_id, "hospitalized, need 2 more days")
        .await
        .expect("extension request");
    let arbiter = ExtensionArbiter::new(
        Arc::clone(&store),
        Arc::new(StaticOracle::approving()),
        Arc::clone(&clock),
        &config,
    );
    let extensions = arbiter.run_cycle().await.expect("extension cycle");
    assert_eq!(extensions.approved(), 1);

    clock.advance(Duration::hours(36));
    let reaper = ExpirationReaper::new(Arc::clone(&store), Arc::clone(&clock));
    let expiry = reaper.run_cycle().await.expect("expiry cycle");
    assert!(expiry.reclaimed.is_empty());

    let submitted = intake.submit_task(task.id()).await.expect("submission");
    assert!(submitted.is_completed());
    let assignment = intake
        .find_assignment(outcome.assignment_id)
        .await
        .expect("lookup")
        .expect("assignment exists");
    assert_eq!(assignment.status(), AssignmentStatus::Completed);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn overdue_demo_assignment_is_reclaimed_and_rematched(
    store: Arc<InMemoryMatchingStore>,
    clock: Arc<FixedClock>,
) {
    let intake = intake(&store, &clock);
    let config = EngineConfig::default();
    let seeded = intake.seed_demo_data().await.expect("seed");
    let first = seeded.talents.first().expect("seeded talent");
    let (task, assignment) = intake
        .create_overdue_assignment("Talent 2", first, Duration::hours(1))
        .await
        .expect("overdue assignment");

    let reaper = ExpirationReaper::new(Arc::clone(&store), Arc::clone(&clock));
    let expiry = reaper.run_cycle().await.expect("expiry cycle");
    assert_eq!(
        expiry
            .reclaimed
            .iter()
            .map(|reclaimed| reclaimed.assignment_id)
            .collect::<Vec<_>>(),
        vec![assignment.id()]
    );

    let engine = MatchingEngine::new(Arc::clone(&store), Arc::clone(&clock), &config);
    engine.run_cycle().await.expect("matching cycle");
    let active = store
        .active_assignments_for_task(task.id())
        .await
        .expect("active assignments");
    let rematched = active.first().expect("task rematched");
    assert_ne!(rematched.talent_id(), first.id());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_extension_under_reclaim_policy_frees_task(
    store: Arc<InMemoryMatchingStore>,
    clock: Arc<FixedClock>,
) {
    let intake = intake(&store, &clock);
    let config = EngineConfig::default().with_reject_policy(ExtensionRejectPolicy::Reclaim);
    intake.register_talent("Release manager").await.expect("talent");
    let task = intake.create_task("Release manager").await.expect("task");
    let engine = MatchingEngine::new(Arc::clone(&store), Arc::clone(&clock), &config);
    let matched = engine.run_cycle().await.expect("matching cycle");
    let assignment_id = matched.assigned.first().expect("task matched").assignment_id;
    intake
        .request_extension(assignment_id, "bored")
        .await
        .expect("extension request");

    let arbiter = ExtensionArbiter::new(
        Arc::clone(&store),
        Arc::new(StaticOracle::rejecting()),
        Arc::clone(&clock),
        &config,
    );
    let report = arbiter.run_cycle().await.expect("extension cycle");

    assert_eq!(report.rejected(), 1);
    let stored = store
        .find_task(task.id())
        .await
        .expect("lookup")
        .expect("task exists");
    assert!(stored.is_open());
    let failed = store
        .find_assignment(assignment_id)
        .await
        .expect("lookup")
        .expect("assignment exists");
    assert_eq!(failed.status(), AssignmentStatus::Failed);
    assert!(!failed.extension_requested());
}

//! Shared test helpers for in-memory integration tests.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use talentflow::matching::{
    adapters::memory::InMemoryMatchingStore,
    domain::{Assignment, Embedding, Talent, Task, TaskId},
    ports::{ChangeSet, MatchingStore},
};

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock frozen at `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed starting instant for every test.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Provides a fresh in-memory store for each test.
#[fixture]
pub fn store() -> Arc<InMemoryMatchingStore> {
    Arc::new(InMemoryMatchingStore::new())
}

/// Provides a clock frozen at [`epoch`].
#[fixture]
pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at(epoch()))
}

/// Builds an embedding from literal components.
pub fn vector(components: &[f64]) -> Embedding {
    Embedding::new(components.to_vec()).expect("valid embedding")
}

/// Stores an open task with the given embedding.
pub async fn add_task(store: &InMemoryMatchingStore, clock: &FixedClock, components: &[f64]) -> Task {
    let task = Task::new("Triage incident", vector(components), clock).expect("valid task");
    store.insert_task(&task).await.expect("store task");
    task
}

/// Stores talent with the given embedding.
pub async fn add_talent(
    store: &InMemoryMatchingStore,
    clock: &FixedClock,
    name: &str,
    components: &[f64],
) -> Talent {
    let talent = Talent::new(name, vector(components), clock).expect("valid talent");
    store.insert_talent(&talent).await.expect("store talent");
    talent
}

/// Assigns a stored task to `talent` with the deadline `offset` from `at`.
pub async fn assign(
    store: &InMemoryMatchingStore,
    task_id: TaskId,
    talent: &Talent,
    at: DateTime<Utc>,
    offset: Duration,
) -> Assignment {
    let mut task = store
        .find_task(task_id)
        .await
        .expect("load task")
        .expect("task exists");
    task.assign(at, offset).expect("task is open");
    let assignment = Assignment::assigned_at(task_id, talent.id(), at);
    let mut changes = ChangeSet::new();
    changes.update_task(task);
    changes.insert_assignment(assignment.clone());
    store.commit(changes).await.expect("commit assignment");
    assignment
}

/// Counts active assignments per task across the whole store.
pub async fn active_counts(store: &InMemoryMatchingStore) -> HashMap<TaskId, usize> {
    let mut counts = HashMap::new();
    for assignment in store.list_assignments().await.expect("list assignments") {
        if assignment.is_active() {
            *counts.entry(assignment.task_id()).or_insert(0) += 1;
        }
    }
    counts
}

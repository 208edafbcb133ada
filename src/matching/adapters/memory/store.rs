//! In-memory record store for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::matching::{
    domain::{
        Assignment, AssignmentId, AssignmentStatus, PersistedAssignmentData, PersistedTaskData,
        Talent, TalentId, Task, TaskId,
    },
    ports::{ChangeSet, EntityKind, ExclusionSets, MatchingStore, StoreError, StoreResult},
};

/// Thread-safe in-memory matching store.
///
/// Commits take the write lock for their whole duration, which serialises
/// writers; version checks catch writers that read before a competing commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMatchingStore {
    state: Arc<RwLock<InMemoryMatchingState>>,
}

#[derive(Debug, Default)]
struct InMemoryMatchingState {
    tasks: HashMap<TaskId, Task>,
    talents: BTreeMap<TalentId, Talent>,
    assignments: HashMap<AssignmentId, Assignment>,
}

impl InMemoryMatchingStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, InMemoryMatchingState>> {
        self.state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, InMemoryMatchingState>> {
        self.state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

fn by_creation<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| created_at(item));
    items
}

fn bump_task(task: &Task) -> Task {
    Task::from_persisted(PersistedTaskData {
        id: task.id(),
        description: task.description().to_owned(),
        embedding: task.embedding().clone(),
        assigned: task.is_assigned(),
        deadline: task.deadline(),
        completed: task.is_completed(),
        version: task.version() + 1,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

fn bump_assignment(assignment: &Assignment) -> Assignment {
    Assignment::from_persisted(PersistedAssignmentData {
        id: assignment.id(),
        task_id: assignment.task_id(),
        talent_id: assignment.talent_id(),
        status: assignment.status(),
        extension_requested: assignment.extension_requested(),
        extension_reason: assignment.extension_reason().to_owned(),
        version: assignment.version() + 1,
        created_at: assignment.created_at(),
        updated_at: assignment.updated_at(),
    })
}

/// Checks every staged write against current state without mutating it.
fn validate(state: &InMemoryMatchingState, changes: &ChangeSet) -> StoreResult<()> {
    for task in changes.task_updates() {
        let stored = state
            .tasks
            .get(&task.id())
            .ok_or(StoreError::TaskNotFound(task.id()))?;
        if stored.version() != task.version() {
            return Err(StoreError::VersionConflict {
                kind: EntityKind::Task,
                id: task.id().to_string(),
                expected: task.version(),
            });
        }
    }

    for assignment in changes.assignment_updates() {
        let stored = state
            .assignments
            .get(&assignment.id())
            .ok_or(StoreError::AssignmentNotFound(assignment.id()))?;
        if stored.version() != assignment.version() {
            return Err(StoreError::VersionConflict {
                kind: EntityKind::Assignment,
                id: assignment.id().to_string(),
                expected: assignment.version(),
            });
        }
    }

    let mut inserted = HashSet::new();
    for assignment in changes.assignment_inserts() {
        if state.assignments.contains_key(&assignment.id()) || !inserted.insert(assignment.id()) {
            return Err(StoreError::DuplicateAssignment(assignment.id()));
        }
        if !state.tasks.contains_key(&assignment.task_id()) {
            return Err(StoreError::TaskNotFound(assignment.task_id()));
        }
        if !state.talents.contains_key(&assignment.talent_id()) {
            return Err(StoreError::TalentNotFound(assignment.talent_id()));
        }
    }

    ensure_single_active_assignment(state, changes)
}

/// Rejects commits that would leave any touched task with two active
/// assignments.
fn ensure_single_active_assignment(
    state: &InMemoryMatchingState,
    changes: &ChangeSet,
) -> StoreResult<()> {
    let touched: HashSet<TaskId> = changes
        .assignment_inserts()
        .iter()
        .chain(changes.assignment_updates())
        .map(Assignment::task_id)
        .collect();

    for task_id in touched {
        let staged_updates: HashMap<AssignmentId, &Assignment> = changes
            .assignment_updates()
            .iter()
            .filter(|assignment| assignment.task_id() == task_id)
            .map(|assignment| (assignment.id(), assignment))
            .collect();

        let existing_active = state
            .assignments
            .values()
            .filter(|stored| stored.task_id() == task_id)
            .map(|stored| staged_updates.get(&stored.id()).copied().unwrap_or(stored))
            .filter(|assignment| assignment.is_active())
            .count();
        let inserted_active = changes
            .assignment_inserts()
            .iter()
            .filter(|assignment| assignment.task_id() == task_id && assignment.is_active())
            .count();

        if existing_active + inserted_active > 1 {
            return Err(StoreError::ActiveAssignmentExists(task_id));
        }
    }
    Ok(())
}

#[async_trait]
impl MatchingStore for InMemoryMatchingStore {
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(&task.id()) {
            return Err(StoreError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn insert_talent(&self, talent: &Talent) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.talents.contains_key(&talent.id()) {
            return Err(StoreError::DuplicateTalent(talent.id()));
        }
        state.talents.insert(talent.id(), talent.clone());
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn find_assignment(&self, id: AssignmentId) -> StoreResult<Option<Assignment>> {
        Ok(self.read()?.assignments.get(&id).cloned())
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        let tasks: Vec<Task> = self.read()?.tasks.values().cloned().collect();
        Ok(by_creation(tasks, Task::created_at))
    }

    async fn list_talents(&self) -> StoreResult<Vec<Talent>> {
        Ok(self.read()?.talents.values().cloned().collect())
    }

    async fn list_assignments(&self) -> StoreResult<Vec<Assignment>> {
        let assignments: Vec<Assignment> = self.read()?.assignments.values().cloned().collect();
        Ok(by_creation(assignments, Assignment::created_at))
    }

    async fn count_talents(&self) -> StoreResult<usize> {
        Ok(self.read()?.talents.len())
    }

    async fn open_tasks(&self) -> StoreResult<Vec<Task>> {
        let tasks: Vec<Task> = self
            .read()?
            .tasks
            .values()
            .filter(|task| task.is_open())
            .cloned()
            .collect();
        Ok(by_creation(tasks, Task::created_at))
    }

    async fn expired_tasks(&self, now: DateTime<Utc>) -> StoreResult<Vec<Task>> {
        let tasks: Vec<Task> = self
            .read()?
            .tasks
            .values()
            .filter(|task| task.is_expired(now))
            .cloned()
            .collect();
        Ok(by_creation(tasks, Task::created_at))
    }

    async fn failed_talents_by_task(&self) -> StoreResult<ExclusionSets> {
        let state = self.read()?;
        let mut exclusions = ExclusionSets::new();
        for assignment in state
            .assignments
            .values()
            .filter(|assignment| assignment.status() == AssignmentStatus::Failed)
        {
            exclusions
                .entry(assignment.task_id())
                .or_default()
                .insert(assignment.talent_id());
        }
        Ok(exclusions)
    }

    async fn pending_extensions(&self) -> StoreResult<Vec<Assignment>> {
        let assignments: Vec<Assignment> = self
            .read()?
            .assignments
            .values()
            .filter(|assignment| assignment.extension_requested())
            .cloned()
            .collect();
        Ok(by_creation(assignments, Assignment::created_at))
    }

    async fn active_assignments_for_task(&self, task_id: TaskId) -> StoreResult<Vec<Assignment>> {
        let assignments: Vec<Assignment> = self
            .read()?
            .assignments
            .values()
            .filter(|assignment| assignment.task_id() == task_id && assignment.is_active())
            .cloned()
            .collect();
        Ok(by_creation(assignments, Assignment::created_at))
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut state = self.write()?;
        validate(&state, &changes)?;

        for task in changes.task_updates() {
            state.tasks.insert(task.id(), bump_task(task));
        }
        for assignment in changes.assignment_updates() {
            state
                .assignments
                .insert(assignment.id(), bump_assignment(assignment));
        }
        for assignment in changes.assignment_inserts() {
            state.assignments.insert(assignment.id(), assignment.clone());
        }
        Ok(())
    }
}

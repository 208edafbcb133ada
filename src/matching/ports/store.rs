//! Record store port: queries and atomic unit-of-work commits.

use crate::matching::domain::{Assignment, AssignmentId, Talent, TalentId, Task, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Talent identifiers that already failed a task, keyed by task.
pub type ExclusionSets = HashMap<TaskId, BTreeSet<TalentId>>;

/// Staged writes applied by [`MatchingStore::commit`] as a single unit.
///
/// Updates carry the version they were read at. A commit succeeds only if
/// every staged entity is still at that version, so concurrent jobs touching
/// the same task serialise through the store rather than through job logic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    task_updates: Vec<Task>,
    assignment_inserts: Vec<Assignment>,
    assignment_updates: Vec<Assignment>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an update to an existing task, replacing any earlier staged
    /// update for the same task.
    pub fn update_task(&mut self, task: Task) {
        self.task_updates.retain(|staged| staged.id() != task.id());
        self.task_updates.push(task);
    }

    /// Stages a new assignment.
    pub fn insert_assignment(&mut self, assignment: Assignment) {
        self.assignment_inserts.push(assignment);
    }

    /// Stages an update to an existing assignment, replacing any earlier
    /// staged update for the same assignment.
    pub fn update_assignment(&mut self, assignment: Assignment) {
        self.assignment_updates
            .retain(|staged| staged.id() != assignment.id());
        self.assignment_updates.push(assignment);
    }

    /// Returns the staged task updates.
    #[must_use]
    pub fn task_updates(&self) -> &[Task] {
        &self.task_updates
    }

    /// Returns the staged assignment inserts.
    #[must_use]
    pub fn assignment_inserts(&self) -> &[Assignment] {
        &self.assignment_inserts
    }

    /// Returns the staged assignment updates.
    #[must_use]
    pub fn assignment_updates(&self) -> &[Assignment] {
        &self.assignment_updates
    }

    /// Returns `true` when nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.task_updates.is_empty()
            && self.assignment_inserts.is_empty()
            && self.assignment_updates.is_empty()
    }
}

/// Entity kinds referenced by version conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A task record.
    Task,
    /// An assignment record.
    Assignment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => f.write_str("task"),
            Self::Assignment => f.write_str("assignment"),
        }
    }
}

/// Persistence contract for tasks, talent, and assignments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchingStore: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateTask`] when the identifier exists.
    async fn insert_task(&self, task: &Task) -> StoreResult<()>;

    /// Stores a new talent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateTalent`] when the identifier exists.
    async fn insert_talent(&self, talent: &Talent) -> StoreResult<()>;

    /// Finds a task by identifier.
    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Finds an assignment by identifier.
    async fn find_assignment(&self, id: AssignmentId) -> StoreResult<Option<Assignment>>;

    /// Returns every task, oldest first.
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;

    /// Returns every talent in ascending identifier order.
    async fn list_talents(&self) -> StoreResult<Vec<Talent>>;

    /// Returns every assignment, oldest first.
    async fn list_assignments(&self) -> StoreResult<Vec<Assignment>>;

    /// Returns the number of registered talents.
    async fn count_talents(&self) -> StoreResult<usize>;

    /// Returns tasks that are neither assigned nor completed.
    async fn open_tasks(&self) -> StoreResult<Vec<Task>>;

    /// Returns assigned, incomplete tasks whose deadline is strictly before
    /// `now`.
    async fn expired_tasks(&self, now: DateTime<Utc>) -> StoreResult<Vec<Task>>;

    /// Returns, per task, the talents whose assignment to it has failed.
    async fn failed_talents_by_task(&self) -> StoreResult<ExclusionSets>;

    /// Returns assignments with a pending extension request.
    async fn pending_extensions(&self) -> StoreResult<Vec<Assignment>>;

    /// Returns assignments of `task_id` with status `assigned`.
    async fn active_assignments_for_task(&self, task_id: TaskId) -> StoreResult<Vec<Assignment>>;

    /// Applies every staged write in `changes` atomically.
    ///
    /// Either all writes are applied, each bumping the entity version, or
    /// none are.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] when an updated entity changed
    /// since it was read, [`StoreError::ActiveAssignmentExists`] when the
    /// commit would leave a task with more than one active assignment, and
    /// not-found or duplicate errors for dangling or repeated identifiers.
    async fn commit(&self, changes: ChangeSet) -> StoreResult<()>;
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// A talent with the same identifier already exists.
    #[error("duplicate talent identifier: {0}")]
    DuplicateTalent(TalentId),

    /// An assignment with the same identifier already exists.
    #[error("duplicate assignment identifier: {0}")]
    DuplicateAssignment(AssignmentId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The talent was not found.
    #[error("talent not found: {0}")]
    TalentNotFound(TalentId),

    /// The assignment was not found.
    #[error("assignment not found: {0}")]
    AssignmentNotFound(AssignmentId),

    /// The entity changed since it was read.
    #[error("{kind} {id} was modified concurrently (expected version {expected})")]
    VersionConflict {
        /// Kind of the conflicting entity.
        kind: EntityKind,
        /// Identifier of the conflicting entity in display form.
        id: String,
        /// Version the writer read.
        expected: u64,
    },

    /// The commit would create a second active assignment for a task.
    #[error("task {0} already has an active assignment")]
    ActiveAssignmentExists(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
